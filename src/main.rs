use std::path::PathBuf;

use clap::Parser;
use epub_helpers::logging::init_logging;
use epub_helpers::{ConvertOptions, DEFAULT_FONT_SCALE, convert_all, render_pdf};

#[derive(Parser, Debug)]
#[command(name = "epub-helpers")]
#[command(about = "Extract, clean up and convert EPUB contents")]
struct Cli {
    /// An .epub file, or a directory searched recursively for them
    #[arg(long)]
    input: Option<PathBuf>,
    /// Directory that receives one folder per book
    #[arg(long, default_value = "results")]
    output: PathBuf,
    /// Multiplier applied to every font-size in extracted stylesheets
    #[arg(long, default_value_t = DEFAULT_FONT_SCALE)]
    font_scale: f64,
    /// Write a Markdown file next to each extracted XHTML document
    #[arg(long)]
    markdown: bool,
    /// Straighten quotes and dashes in the Markdown output
    #[arg(long, requires = "markdown")]
    normalize: bool,
    /// Strip profanity from the Markdown output
    #[arg(long, requires = "markdown")]
    clean: bool,
    /// HTML file to print as PDF
    #[arg(long, requires = "pdf_to")]
    pdf_from: Option<PathBuf>,
    #[arg(long, requires = "pdf_from")]
    pdf_to: Option<PathBuf>,
    /// Print summary as JSON on stdout
    #[arg(long)]
    json: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.verbose) {
        eprintln!("{err:#}");
    }

    if cli.input.is_none() && cli.pdf_from.is_none() {
        anyhow::bail!("Nothing to do: pass --input and/or --pdf-from/--pdf-to");
    }

    if let Some(input) = cli.input {
        let mut options = ConvertOptions::new(input, cli.output);
        options.font_scale = cli.font_scale;
        options.markdown = cli.markdown;
        options.normalize = cli.normalize;
        options.clean = cli.clean;

        let reports = convert_all(&options)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    if let (Some(html), Some(pdf)) = (cli.pdf_from, cli.pdf_to) {
        render_pdf(&html, &pdf)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn output_flag_sets_the_directory() {
        let cli = Cli::try_parse_from(["epub-helpers", "--input", "books", "--output", "out"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("out"));

        let cli = Cli::try_parse_from(["epub-helpers", "--input", "books"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("results"));

        assert!(Cli::try_parse_from(["epub-helpers", "--output-dir", "out"]).is_err());
    }
}
