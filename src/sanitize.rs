//! File name, directory and link-target sanitizing.
//!
//! All three `sanitize_for_*` helpers share one shape: drop non-ASCII
//! characters, replace anything outside an allowed set with a substitute,
//! then collapse runs of the substitute into a single one.

/// Character set accepted by one of the sanitizers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    /// `[A-Za-z0-9_.-]`, substitute `_`.
    FileName,
    /// `[A-Za-z0-9_]`, substitute `_`.
    Directory,
    /// `[A-Za-z0-9-]`, substitute `-`.
    Link,
}

impl CharClass {
    pub fn allows(self, ch: char) -> bool {
        if ch.is_ascii_alphanumeric() {
            return true;
        }
        match self {
            CharClass::FileName => matches!(ch, '-' | '_' | '.'),
            CharClass::Directory => ch == '_',
            CharClass::Link => ch == '-',
        }
    }

    pub fn substitute(self) -> char {
        match self {
            CharClass::FileName | CharClass::Directory => '_',
            CharClass::Link => '-',
        }
    }
}

/// Prefix put in front of link targets that would otherwise start with a digit.
pub const LINK_PREFIX: char = 'C';

/// Removes every character above U+007F, keeping the rest in order.
pub fn strip_non_ascii(text: &str) -> String {
    text.chars().filter(|ch| ch.is_ascii()).collect()
}

pub fn sanitize_with(text: &str, class: CharClass) -> String {
    let substitute = class.substitute();
    let mut out = String::with_capacity(text.len());
    let mut prev_substitute = false;
    for ch in text.chars().filter(char::is_ascii) {
        let mapped = if class.allows(ch) { ch } else { substitute };
        if mapped == substitute {
            if !prev_substitute {
                out.push(substitute);
            }
            prev_substitute = true;
        } else {
            out.push(mapped);
            prev_substitute = false;
        }
    }
    out
}

pub fn sanitize_for_file_name(text: &str) -> String {
    sanitize_with(text, CharClass::FileName)
}

pub fn sanitize_for_directory(text: &str) -> String {
    sanitize_with(text, CharClass::Directory)
}

pub fn sanitize_for_link(text: &str) -> String {
    sanitize_with(text, CharClass::Link)
}

/// Turns an href into an identifier usable as an in-document link target.
///
/// `chapter1.xhtml#note3` resolves to its fragment (`note3`). Without a
/// fragment the last path segment is used (`Text/ch1.xhtml` gives
/// `ch1-xhtml`), prefixed with [`LINK_PREFIX`] when it starts with a digit.
/// Any `#` selects the fragment branch, so `a.xhtml#` resolves to `""`.
pub fn resolve_link_target(href: &str) -> String {
    if let Some((_, fragment)) = href.rsplit_once('#') {
        return sanitize_for_link(fragment);
    }

    let segment = href.rsplit(['/', '\\']).next().unwrap_or(href);
    let target = sanitize_for_link(segment);
    if target.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("{LINK_PREFIX}{target}")
    } else {
        target
    }
}
