use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use essaymark::config::{load_config, Config};
use essaymark::core::model::{AnnotationInput, PageTokens};
use essaymark::document::PdfDocument;
use essaymark::matching::{KeywordLocateEngine, LocateEngine};
use essaymark::nlp::normalize_response;
use essaymark::pipeline::{default_output_path, Pipeline, PipelineConfig};
use essaymark::render::Annotator;

#[derive(Parser, Debug)]
#[command(name = "essaymark")]
#[command(version, about = "Mark language errors on scanned handwritten essays", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// OCR an essay, ask the language model for errors and write an annotated copy
    Annotate {
        /// Input PDF file path
        input: PathBuf,

        /// Output PDF (default: <input_stem>_annotated.pdf next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Raster pixels per document unit for the OCR track
        #[arg(long)]
        zoom: Option<f32>,

        /// Language model name
        #[arg(long)]
        model: Option<String>,

        /// Language model endpoint (Ollama-compatible)
        #[arg(long)]
        endpoint: Option<String>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write a JSON report of counts, markers and unmatched phrases
        #[arg(long)]
        report: Option<PathBuf>,

        /// Run OCR on the CPU even if the config enables the GPU
        #[arg(long)]
        cpu: bool,
    },

    /// Draw a saved annotation list onto a PDF
    Render {
        /// Input PDF file path
        input: PathBuf,

        /// Markers or flat `{page, box, type}` records as JSON
        #[arg(long)]
        annotations: PathBuf,

        /// Output PDF (default: <input_stem>_annotated.pdf next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Raster pixels per document unit the boxes were measured in
        #[arg(long)]
        zoom: Option<f32>,

        /// TOML configuration file (styles)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Locate saved language-model errors among saved OCR tokens
    Locate {
        /// Recognized pages as JSON (`[{page_idx, tokens: [...]}]`)
        #[arg(long)]
        tokens: PathBuf,

        /// Raw language-model response
        #[arg(long)]
        errors: PathBuf,

        /// Marker list output (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show information about a PDF file
    Info {
        /// Input PDF file path
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Annotate {
            input,
            output,
            zoom,
            model,
            endpoint,
            config,
            report,
            cpu,
        } => {
            let mut settings = read_config(config.as_deref())?;
            let lm = settings.language_model.get_or_insert_with(Default::default);
            if model.is_some() {
                lm.model = model;
            }
            if endpoint.is_some() {
                lm.endpoint = endpoint;
            }
            if cpu {
                settings.ocr.get_or_insert_with(Default::default).gpu = Some(false);
            }
            annotate(input, output, zoom, report, &settings)
        }
        Commands::Render {
            input,
            annotations,
            output,
            zoom,
            config,
        } => render(input, annotations, output, zoom, config.as_deref()),
        Commands::Locate {
            tokens,
            errors,
            output,
        } => locate(&tokens, &errors, output.as_deref()),
        Commands::Info { input } => show_info(input),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn read_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

fn check_input(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }
    Ok(())
}

fn annotate(
    input: PathBuf,
    output: Option<PathBuf>,
    zoom: Option<f32>,
    report: Option<PathBuf>,
    settings: &Config,
) -> Result<()> {
    check_input(&input)?;

    let zoom = zoom.filter(|z| *z > 0.0).unwrap_or_else(|| settings.zoom());
    let config = PipelineConfig::new(input, output)
        .with_zoom(zoom)
        .with_report(report);

    println!("[*] Processing: {}", config.input.display());
    println!("[*] Output: {}", config.output.display());
    println!("[*] Model: {}", settings.model());

    let pipeline = Pipeline::from_config(&config, settings)?;
    let summary = pipeline.run(&config)?;

    println!("\n[+] Pages: {}", summary.pages);
    println!("[+] Errors detected: {}", summary.errors_detected);
    println!("[+] Markers drawn: {}", summary.markers);
    for (category, count) in summary.counts.iter() {
        println!("    {}: {}", category.title(), count);
    }
    if !summary.unmatched.is_empty() {
        println!("[!] {} error(s) could not be located", summary.unmatched.len());
    }
    println!("[✓] Saved: {}", summary.output.display());
    Ok(())
}

fn render(
    input: PathBuf,
    annotations: PathBuf,
    output: Option<PathBuf>,
    zoom: Option<f32>,
    config: Option<&Path>,
) -> Result<()> {
    check_input(&input)?;
    let settings = read_config(config)?;

    let data = fs::read_to_string(&annotations)
        .with_context(|| format!("Failed to read annotations: {}", annotations.display()))?;
    let records: AnnotationInput = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse annotations: {}", annotations.display()))?;

    let output = output.unwrap_or_else(|| default_output_path(&input));
    let zoom = zoom.filter(|z| *z > 0.0).unwrap_or_else(|| settings.zoom());
    let annotator = Annotator::new(settings.style_sheet(), zoom);
    let summary = annotator.annotate_file(&input, &output, records)?;

    println!("[+] Markers drawn: {}", summary.counts.total());
    if summary.skipped > 0 {
        println!("[!] Skipped {} annotation(s)", summary.skipped);
    }
    println!("[✓] Saved: {}", output.display());
    Ok(())
}

fn locate(tokens: &Path, errors: &Path, output: Option<&Path>) -> Result<()> {
    let data = fs::read_to_string(tokens)
        .with_context(|| format!("Failed to read tokens: {}", tokens.display()))?;
    let pages: Vec<PageTokens> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse tokens: {}", tokens.display()))?;
    let raw = fs::read_to_string(errors)
        .with_context(|| format!("Failed to read errors: {}", errors.display()))?;

    let detected = normalize_response(&raw);
    let located = KeywordLocateEngine::new().locate(&detected, &pages);
    let markers = serde_json::to_string_pretty(&located.markers.into_markers())?;

    match output {
        Some(path) => {
            fs::write(path, markers)
                .with_context(|| format!("Failed to write markers: {}", path.display()))?;
            eprintln!("[✓] Saved: {}", path.display());
        }
        None => println!("{markers}"),
    }
    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    check_input(&input)?;

    let pdf = PdfDocument::open(&input)
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {}", pdf.page_count());
    for idx in 0..pdf.page_count() {
        let geometry = pdf.page_geometry(idx);
        println!(
            "  Page {}: {:.1} x {:.1} pt",
            idx + 1,
            geometry.width(),
            geometry.height()
        );
    }

    Ok(())
}
