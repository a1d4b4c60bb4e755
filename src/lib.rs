use anyhow::{Context, Result};
use rbook::prelude::{MetaEntry, Metadata};
use rbook::{Ebook, Epub};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub mod archive;
pub mod extract;
pub mod logging;
pub mod markdown;
pub mod pdf;
pub mod sanitize;
pub mod text;

pub use archive::{AssetData, AssetMeta, AssetSource, MemoryArchive, list_assets, order_by, sort_assets};
pub use extract::{
    DEFAULT_FONT_SCALE, extract_all, extract_asset, rescale_font_sizes, resolve_destination_path,
};
pub use markdown::{document_to_markdown, html_to_markdown};
pub use pdf::{ChromeBackend, PdfBackend, PdfError, PdfReport, PdfSession, render_pdf, render_pdf_with};
pub use sanitize::{
    resolve_link_target, sanitize_for_directory, sanitize_for_file_name, sanitize_for_link,
    strip_non_ascii,
};
pub use text::{ProfanityFilter, normalize_text, remove_profanity};

#[derive(Clone, Debug)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub font_scale: f64,
    pub markdown: bool,
    pub normalize: bool,
    pub clean: bool,
}

impl ConvertOptions {
    pub fn new(input: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            input,
            output_dir,
            font_scale: DEFAULT_FONT_SCALE,
            markdown: false,
            normalize: false,
            clean: false,
        }
    }
}

/// Outcome of converting one book.
#[derive(Clone, Debug, Serialize)]
pub struct BookReport {
    pub book: PathBuf,
    pub title: String,
    pub output_dir: PathBuf,
    pub assets: usize,
    pub markdown_files: Vec<PathBuf>,
}

/// Converts `input` if it is an EPUB, or every EPUB found below it.
pub fn convert_all(options: &ConvertOptions) -> Result<Vec<BookReport>> {
    let epub_paths = find_epubs(&options.input);
    if epub_paths.is_empty() {
        anyhow::bail!("No EPUB files found under {}", options.input.display());
    }

    let mut reports = Vec::new();
    let mut failures = 0;
    for epub_path in epub_paths {
        match convert_epub(&epub_path, options) {
            Ok(report) => reports.push(report),
            Err(err) => {
                failures += 1;
                warn!("Failed to convert {}: {err:#}", epub_path.display());
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} EPUB(s) failed to convert");
    }

    Ok(reports)
}

/// Extracts every manifest asset of one book under `output_dir/<title>`,
/// writing a Markdown sibling next to each readable document when asked.
pub fn convert_epub(epub_path: &Path, options: &ConvertOptions) -> Result<BookReport> {
    let epub = Epub::open(epub_path)
        .with_context(|| format!("Failed to open epub {}", epub_path.display()))?;

    let title = epub
        .metadata()
        .title()
        .map(|t| t.value().to_string())
        .unwrap_or_else(|| {
            epub_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("book")
                .to_string()
        });
    let book_dir = options.output_dir.join(book_dir_name(&title));

    let mut assets = list_assets(&epub);
    sort_assets(&mut assets);
    let written = extract_all(&epub, &assets, &book_dir, options.font_scale)?;

    let mut markdown_files = Vec::new();
    if options.markdown {
        for (meta, path) in assets.iter().zip(&written) {
            if !meta.is_readable() {
                continue;
            }
            markdown_files.push(write_markdown(path, options)?);
        }
    }

    info!(
        assets = written.len(),
        markdown = markdown_files.len(),
        "Converted {title} into {}",
        book_dir.display()
    );

    Ok(BookReport {
        book: epub_path.to_path_buf(),
        title,
        output_dir: book_dir,
        assets: written.len(),
        markdown_files,
    })
}

/// Runs the document-to-Markdown pipeline on HTML text.
pub fn render_markdown(html: &str, options: &ConvertOptions) -> String {
    let mut md = document_to_markdown(html);
    if options.normalize {
        md = normalize_text(&md);
    }
    if options.clean {
        md = remove_profanity(&md);
    }
    md
}

fn write_markdown(html_path: &Path, options: &ConvertOptions) -> Result<PathBuf> {
    let bytes = fs::read(html_path)
        .with_context(|| format!("Failed to read {}", html_path.display()))?;
    let md = render_markdown(&String::from_utf8_lossy(&bytes), options);

    let stem = html_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let md_path = html_path.with_file_name(format!("{}.md", sanitize_for_file_name(stem)));
    fs::write(&md_path, md.trim().to_string() + "\n")
        .with_context(|| format!("Failed to write {}", md_path.display()))?;
    Ok(md_path)
}

fn find_epubs(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    let mut epub_paths = Vec::new();
    for entry in WalkDir::new(input)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if entry.file_type().is_file() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("epub") {
                epub_paths.push(path.to_path_buf());
            }
        }
    }
    epub_paths.sort();
    epub_paths
}

fn book_dir_name(title: &str) -> String {
    let name = sanitize_for_directory(title);
    let trimmed = name.trim_matches('_');
    if trimmed.is_empty() {
        "book".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn book_dir_names() {
        assert_eq!(book_dir_name("The Book: Part 2"), "The_Book_Part_2");
        assert_eq!(book_dir_name("  Déjà vu  "), "Dj_vu");
        assert_eq!(book_dir_name("日本語"), "book");
    }

    #[test]
    fn finds_epubs_recursively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.epub"), b"").unwrap();
        fs::write(dir.path().join("nested").join("b.epub"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = find_epubs(dir.path());
        assert_eq!(found, [dir.path().join("a.epub"), dir.path().join("nested").join("b.epub")]);
        assert_eq!(find_epubs(&dir.path().join("a.epub")), [dir.path().join("a.epub")]);
    }

    #[test]
    fn convert_all_without_books_fails() {
        let dir = TempDir::new().unwrap();
        let options = ConvertOptions::new(dir.path().to_path_buf(), dir.path().join("out"));
        assert!(convert_all(&options).is_err());
    }

    #[test]
    fn render_markdown_applies_cleanups() {
        let mut options = ConvertOptions::new(PathBuf::new(), PathBuf::new());
        options.normalize = true;
        options.clean = true;
        let md = render_markdown(
            "<html><body><p>\u{201C}Damn,\u{201D} he said \u{2014} twice.</p></body></html>",
            &options,
        );
        assert!(md.contains("\", he said - twice."), "{md}");
        assert!(!md.to_lowercase().contains("damn"), "{md}");
    }
}
