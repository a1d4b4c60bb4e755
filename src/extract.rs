//! Writing archive entries to disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::archive::{AssetMeta, AssetSource};

pub const DEFAULT_FONT_SCALE: f64 = 1.0;

static FONT_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"font-size: ?([0-9]*\.?[0-9]+)([A-Za-z]+|%)").expect("static regex"));

/// Maps an href onto a file path under `root`, creating its directory.
///
/// Segments are split on `/` and `\` and percent-decoded. Empty and `.`
/// segments are skipped, `..` pops the previous segment but never climbs
/// above `root`. Any `#fragment` is ignored.
pub fn resolve_destination_path(href: &str, root: &Path) -> Result<PathBuf> {
    let path_part = href.split('#').next().unwrap_or(href);
    let mut segments: Vec<String> = Vec::new();
    for segment in path_part.split(['/', '\\']).map(decode_segment) {
        match segment.as_str() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    let file_name = segments
        .pop()
        .with_context(|| format!("Href {href:?} has no file name"))?;

    let mut dir = std::path::absolute(root)
        .with_context(|| format!("Failed to resolve {}", root.display()))?;
    dir.extend(segments);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir.join(file_name))
}

/// Copies one archive entry to disk and returns where it was written.
///
/// Stylesheets (`.css`) have every `font-size` coefficient multiplied by
/// `font_scale`; everything else is written byte for byte. A failed write is
/// not cleaned up.
pub fn extract_asset<S>(meta: &AssetMeta, source: &S, root: &Path, font_scale: f64) -> Result<PathBuf>
where
    S: AssetSource + ?Sized,
{
    let file_path = resolve_destination_path(&meta.href, root)?;
    let data = source
        .read_asset(&meta.id)
        .with_context(|| format!("Failed to read asset {} ({})", meta.id, meta.href))?;

    if is_stylesheet(&meta.href) {
        let css = String::from_utf8_lossy(&data.bytes);
        let rescaled = rescale_font_sizes(&css, font_scale);
        fs::write(&file_path, rescaled)
            .with_context(|| format!("Failed to write {}", file_path.display()))?;
    } else {
        fs::write(&file_path, &data.bytes)
            .with_context(|| format!("Failed to write {}", file_path.display()))?;
    }
    debug!(id = %meta.id, media_type = %data.media_type, path = %file_path.display(), "extracted asset");
    Ok(file_path)
}

/// Extracts assets in order, stopping at the first failure.
pub fn extract_all<S>(source: &S, assets: &[AssetMeta], root: &Path, font_scale: f64) -> Result<Vec<PathBuf>>
where
    S: AssetSource + ?Sized,
{
    assets
        .iter()
        .map(|meta| extract_asset(meta, source, root, font_scale))
        .collect()
}

/// Multiplies every `font-size: <number><unit>` coefficient by `scale`.
///
/// Only letter units and `%` count; unitless values and malformed numbers
/// (`1.2.3px`) are left alone.
pub fn rescale_font_sizes(css: &str, scale: f64) -> String {
    FONT_SIZE
        .replace_all(css, |caps: &Captures| match caps[1].parse::<f64>() {
            Ok(value) => format!("font-size: {}{}", value * scale, &caps[2]),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}

fn is_stylesheet(href: &str) -> bool {
    let path_part = href.split('#').next().unwrap_or(href);
    path_part.to_ascii_lowercase().ends_with(".css")
}

fn decode_segment(segment: &str) -> String {
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    decoded.replace(['/', '\\'], "_")
}
