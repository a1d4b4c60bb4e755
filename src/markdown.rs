//! HTML to Markdown conversion.
//!
//! `html2md` does the heavy lifting. Class attributes are stripped
//! beforehand since they leak into the output, and inline links are moved
//! into numbered reference definitions afterwards.

use kuchiki::NodeRef;
use kuchiki::traits::*;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CLASS_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"class="[^"]*""#).expect("static regex"));

static TAG_TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(<\w+) >").expect("static regex"));

static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+[^`]*`+").expect("static regex"));

static INLINE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(!?)\[([^\[\]]*)\]\(([^()\s]+)(?:\s+"([^"]*)")?\)"#).expect("static regex")
});

/// Converts an HTML fragment to GitHub-flavored Markdown with reference-style links.
pub fn html_to_markdown(html: &str) -> String {
    let cleaned = strip_class_attributes(html);
    let md = html2md::parse_html(&cleaned);
    to_reference_links(md.trim())
}

/// Converts a whole XHTML document, keeping only what sits inside `<body>`.
pub fn document_to_markdown(html: &str) -> String {
    let document = kuchiki::parse_html().one(html);
    let inner = match document.select_first("body") {
        Ok(body) => serialize_children(body.as_node()),
        Err(()) => html.to_string(),
    };
    html_to_markdown(&inner)
}

fn strip_class_attributes(html: &str) -> String {
    let without_class = CLASS_ATTR.replace_all(html, "");
    TAG_TRAILING_SPACE
        .replace_all(&without_class, "$1>")
        .into_owned()
}

/// Rewrites inline links outside fenced blocks and code spans.
fn to_reference_links(md: &str) -> String {
    let mut definitions: Vec<String> = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in md.lines() {
        let marker = line.trim_start();
        match fence {
            Some(open) => {
                if marker.starts_with(open) {
                    fence = None;
                }
                lines.push(line.to_string());
            }
            None if marker.starts_with("```") || marker.starts_with("~~~") => {
                fence = Some(&marker[..3]);
                lines.push(line.to_string());
            }
            None => lines.push(rewrite_outside_code_spans(line, &mut definitions)),
        }
    }

    let body = lines.join("\n");
    if definitions.is_empty() {
        return body;
    }
    format!("{}\n\n{}", body.trim_end(), definitions.join("\n"))
}

fn rewrite_outside_code_spans(line: &str, definitions: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for span in CODE_SPAN.find_iter(line) {
        out.push_str(&rewrite_links(&line[last..span.start()], definitions));
        out.push_str(span.as_str());
        last = span.end();
    }
    out.push_str(&rewrite_links(&line[last..], definitions));
    out
}

fn rewrite_links(text: &str, definitions: &mut Vec<String>) -> String {
    INLINE_LINK
        .replace_all(text, |caps: &Captures| {
            if &caps[1] == "!" {
                return caps[0].to_string();
            }
            let index = definitions.len() + 1;
            let definition = match caps.get(4) {
                Some(title) => format!("[{index}]: {} \"{}\"", &caps[3], title.as_str()),
                None => format!("[{index}]: {}", &caps[3]),
            };
            definitions.push(definition);
            format!("[{}][{index}]", &caps[2])
        })
        .into_owned()
}

fn serialize_node(node: &NodeRef) -> String {
    let mut bytes = Vec::new();
    node.serialize(&mut bytes).ok();
    String::from_utf8_lossy(&bytes).to_string()
}

fn serialize_children(node: &NodeRef) -> String {
    let mut out = String::new();
    for child in node.children() {
        out.push_str(&serialize_node(&child));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_class_and_leftover_space() {
        assert_eq!(
            strip_class_attributes(r#"<p class="calibre1">text</p>"#),
            "<p>text</p>"
        );
        assert_eq!(
            strip_class_attributes(r#"<span class="a" id="x">y</span>"#),
            r#"<span  id="x">y</span>"#
        );
    }

    #[test]
    fn moves_links_to_references() {
        let md = "See [the site](http://a.example) and [docs](http://b.example \"Docs\").";
        assert_eq!(
            to_reference_links(md),
            "See [the site][1] and [docs][2].\n\n[1]: http://a.example\n[2]: http://b.example \"Docs\""
        );
    }

    #[test]
    fn leaves_images_inline() {
        let md = "![cover](images/cover.jpg)";
        assert_eq!(to_reference_links(md), md);
    }

    #[test]
    fn links_in_code_spans_stay_inline() {
        let md = "Use `[x](http://code.example)` or [site](http://a.example).";
        assert_eq!(
            to_reference_links(md),
            "Use `[x](http://code.example)` or [site][1].\n\n[1]: http://a.example"
        );
    }

    #[test]
    fn links_in_fenced_blocks_stay_inline() {
        let md = "```\n[x](http://code.example)\n```\n\n~~~md\n[y](http://y.example)\n~~~\n[z](http://z.example)";
        assert_eq!(
            to_reference_links(md),
            "```\n[x](http://code.example)\n```\n\n~~~md\n[y](http://y.example)\n~~~\n[z][1]\n\n[1]: http://z.example"
        );
    }

    #[test]
    fn numbering_continues_across_lines() {
        let md = "[a](http://a.example)\n\n[b](http://b.example)";
        assert_eq!(
            to_reference_links(md),
            "[a][1]\n\n[b][2]\n\n[1]: http://a.example\n[2]: http://b.example"
        );
    }

    #[test]
    fn no_links_is_untouched() {
        assert_eq!(to_reference_links("plain *text*"), "plain *text*");
    }

    #[test]
    fn converts_fragment_with_classes() {
        let md = html_to_markdown(
            r#"<p class="indent">Hello <a class="link" href="http://a.example">there</a></p>"#,
        );
        assert!(md.contains("Hello [there][1]"), "{md}");
        assert!(md.ends_with("[1]: http://a.example"), "{md}");
        assert!(!md.contains("class"));
    }

    #[test]
    fn document_keeps_body_only() {
        let html = r#"<?xml version="1.0"?><html><head><title>Ignored</title></head>
            <body><p>Body text</p></body></html>"#;
        let md = document_to_markdown(html);
        assert!(md.contains("Body text"), "{md}");
        assert!(!md.contains("Ignored"), "{md}");
    }
}
