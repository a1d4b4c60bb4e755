//! Access to the files packed inside an ebook.

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{Context, Result};
use rbook::{Ebook, Epub};
use rbook::ebook::manifest::Manifest;
use rbook::prelude::*;
use serde::{Deserialize, Serialize};

/// Descriptor of one file inside the archive, as listed by the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMeta {
    pub id: String,
    pub media_type: String,
    pub href: String,
}

impl AssetMeta {
    pub fn new(id: impl Into<String>, media_type: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            media_type: media_type.into(),
            href: href.into(),
        }
    }

    pub fn is_readable(&self) -> bool {
        READABLE_MIME
            .iter()
            .any(|mime| mime.eq_ignore_ascii_case(&self.media_type))
    }
}

/// Raw content of an archive entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetData {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// Anything that can hand out archive entries by manifest id.
pub trait AssetSource {
    fn read_asset(&self, id: &str) -> Result<AssetData>;
}

const READABLE_MIME: &[&str] = &["application/xhtml+xml", "text/html"];

impl AssetSource for Epub {
    fn read_asset(&self, id: &str) -> Result<AssetData> {
        let manifest = self.manifest();
        let entry = manifest
            .by_id(id)
            .with_context(|| format!("No manifest entry with id {id}"))?;
        let href = entry.href().as_str().to_string();
        let bytes = self
            .read_resource_bytes(href.as_str())
            .with_context(|| format!("Failed to read {href}"))?;
        Ok(AssetData {
            bytes,
            media_type: entry.media_type().to_string(),
        })
    }
}

/// Every manifest entry of the book, in manifest order.
pub fn list_assets(epub: &Epub) -> Vec<AssetMeta> {
    epub.manifest()
        .entries()
        .map(|entry| {
            AssetMeta::new(
                entry.id().to_string(),
                entry.media_type().to_string(),
                entry.href().as_str().to_string(),
            )
        })
        .collect()
}

/// Builds a comparator that orders by `first`, then breaks ties with `second`.
pub fn order_by<T, A, B>(
    first: impl Fn(&T) -> A,
    second: impl Fn(&T) -> B,
) -> impl Fn(&T, &T) -> Ordering
where
    A: Ord,
    B: Ord,
{
    move |a, b| {
        first(a)
            .cmp(&first(b))
            .then_with(|| second(a).cmp(&second(b)))
    }
}

/// Sorts assets by media type, then href.
pub fn sort_assets(assets: &mut [AssetMeta]) {
    assets.sort_by(order_by(
        |a: &AssetMeta| a.media_type.clone(),
        |a: &AssetMeta| a.href.clone(),
    ));
}

/// An archive held in memory, keyed by manifest id.
#[derive(Clone, Debug, Default)]
pub struct MemoryArchive {
    entries: HashMap<String, AssetData>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(
            id.into(),
            AssetData {
                bytes: bytes.into(),
                media_type: media_type.into(),
            },
        );
    }
}

impl AssetSource for MemoryArchive {
    fn read_asset(&self, id: &str) -> Result<AssetData> {
        self.entries
            .get(id)
            .cloned()
            .with_context(|| format!("No archive entry with id {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_two_keys() {
        let mut assets = vec![
            AssetMeta::new("b", "text/css", "Styles/b.css"),
            AssetMeta::new("c", "image/png", "Images/z.png"),
            AssetMeta::new("a", "text/css", "Styles/a.css"),
            AssetMeta::new("d", "image/png", "Images/a.png"),
        ];
        sort_assets(&mut assets);
        let ids: Vec<&str> = assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["d", "c", "a", "b"]);
    }

    #[test]
    fn comparator_is_generic() {
        let mut pairs = vec![(2, 'b'), (1, 'z'), (2, 'a')];
        pairs.sort_by(order_by(|p: &(i32, char)| p.0, |p: &(i32, char)| p.1));
        assert_eq!(pairs, [(1, 'z'), (2, 'a'), (2, 'b')]);
    }

    #[test]
    fn readable_media_types() {
        assert!(AssetMeta::new("x", "application/xhtml+xml", "a.xhtml").is_readable());
        assert!(AssetMeta::new("x", "TEXT/HTML", "a.html").is_readable());
        assert!(!AssetMeta::new("x", "image/jpeg", "a.jpg").is_readable());
    }

    #[test]
    fn memory_archive_reports_missing_ids() {
        let mut archive = MemoryArchive::new();
        archive.insert("img", "image/png", vec![1, 2, 3]);
        assert_eq!(archive.read_asset("img").unwrap().bytes, vec![1, 2, 3]);
        let err = archive.read_asset("nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
