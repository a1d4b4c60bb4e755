//! Printing local HTML files to PDF through a headless browser.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

/// A4 in inches.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("cannot open {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} cannot be expressed as a file URL", .0.display())]
    InvalidUrl(PathBuf),

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigate { url: String, message: String },

    #[error("PDF export failed: {0}")]
    Export(String),

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a successful render produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfReport {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Starts browser sessions.
pub trait PdfBackend {
    type Session: PdfSession;

    fn launch(&self) -> anyhow::Result<Self::Session>;
}

/// One live browser. Dropping it shuts the browser down.
pub trait PdfSession {
    fn navigate(&mut self, url: &Url) -> anyhow::Result<()>;

    /// Prints the current page as A4 with backgrounds.
    fn export_pdf(&mut self) -> anyhow::Result<Vec<u8>>;
}

/// Headless Chrome/Chromium found on the system.
#[derive(Clone, Debug)]
pub struct ChromeBackend {
    pub headless: bool,
    pub sandbox: bool,
}

impl Default for ChromeBackend {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
        }
    }
}

impl PdfBackend for ChromeBackend {
    type Session = ChromeSession;

    fn launch(&self) -> anyhow::Result<ChromeSession> {
        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(self.sandbox)
            .build()
            .map_err(|err| anyhow::anyhow!("invalid launch options: {err}"))?;
        let browser = Browser::new(options)?;
        let tab = browser.new_tab()?;
        debug!("browser launched");
        Ok(ChromeSession {
            tab,
            _browser: browser,
        })
    }
}

/// Dropping the session drops its [`Browser`], which kills the process.
pub struct ChromeSession {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl PdfSession for ChromeSession {
    fn navigate(&mut self, url: &Url) -> anyhow::Result<()> {
        self.tab.navigate_to(url.as_str())?.wait_until_navigated()?;
        Ok(())
    }

    fn export_pdf(&mut self) -> anyhow::Result<Vec<u8>> {
        self.tab.print_to_pdf(Some(PrintToPdfOptions {
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            print_background: Some(true),
            ..Default::default()
        }))
    }
}

/// Renders `html_path` to `pdf_path` with the system's headless Chrome.
///
/// Unlike extraction, failures here never abort the caller: they are logged
/// and handed back as a [`PdfError`] for the caller to inspect.
pub fn render_pdf(html_path: &Path, pdf_path: &Path) -> Result<PdfReport, PdfError> {
    render_pdf_with(&ChromeBackend::default(), html_path, pdf_path)
}

pub fn render_pdf_with<B: PdfBackend>(
    backend: &B,
    html_path: &Path,
    pdf_path: &Path,
) -> Result<PdfReport, PdfError> {
    let result = render(backend, html_path, pdf_path);
    match &result {
        Ok(report) => {
            let name = report
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!(bytes = report.bytes, "{name} PDF generated successfully");
        }
        Err(err) => error!("Error generating PDF: {err}"),
    }
    result
}

fn render<B: PdfBackend>(backend: &B, html_path: &Path, pdf_path: &Path) -> Result<PdfReport, PdfError> {
    let absolute = fs::canonicalize(html_path).map_err(|source| PdfError::Input {
        path: html_path.to_path_buf(),
        source,
    })?;
    let url = Url::from_file_path(&absolute).map_err(|()| PdfError::InvalidUrl(absolute.clone()))?;

    let bytes = {
        let mut session = backend
            .launch()
            .map_err(|err| PdfError::Launch(format!("{err:#}")))?;
        session.navigate(&url).map_err(|err| PdfError::Navigate {
            url: url.to_string(),
            message: format!("{err:#}"),
        })?;
        session
            .export_pdf()
            .map_err(|err| PdfError::Export(format!("{err:#}")))?
    };
    debug!("browser session released");

    fs::write(pdf_path, &bytes).map_err(|source| PdfError::Write {
        path: pdf_path.to_path_buf(),
        source,
    })?;
    Ok(PdfReport {
        path: pdf_path.to_path_buf(),
        bytes: bytes.len(),
    })
}
