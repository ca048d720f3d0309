use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use overlay_protocol::{AnnotatedDocument, DocumentId};
use overlay_session::{decode_document, encode_document, OverlayConfig, OverlaySession};
use overlay_view::{write_html, write_plain, RenderedUnit};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tokenizes, compiles and renders annotated documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Splits a plain-text file into an annotated document with no spans.
    Tokenize {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Defaults to stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = 1)]
        document_id: u32,
    },
    /// Compiles a JSON document into a validated rkyv archive.
    Compile {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Renders the overlay of a document (JSON or .rkyv archive).
    Render {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// JSON overlay configuration.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 0.0)]
        scroll: f64,

        #[arg(long, default_value_t = 800.0)]
        height: f64,

        /// Renders a page of the paged view instead of the scroll window.
        #[arg(long)]
        page: Option<usize>,

        #[arg(long, value_enum, default_value_t = Format::Html)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Text,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Tokenize { input, output, document_id } => tokenize(&input, output.as_deref(), document_id),
        Command::Compile { input, output } => compile(&input, &output),
        Command::Render { input, config, scroll, height, page, format } => {
            let config = match config {
                Some(path) => read_config(&path)?,
                None => OverlayConfig::default(),
            };
            let output = render(&input, config, scroll, height, page, format)?;
            println!("{output}");
            Ok(())
        }
    }
}

fn tokenize(input: &Path, output: Option<&Path>, document_id: u32) -> anyhow::Result<()> {
    let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let tokenization = overlay_tokenizer::tokenize(&text);
    info!(tokens = tokenization.len(), sentences = tokenization.sentence_token_ranges.len(), "tokenized");

    let document = tokenization.into_document(DocumentId(document_id), &text);
    let json = serde_json::to_string_pretty(&document)?;
    match output {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn compile(input: &Path, output: &Path) -> anyhow::Result<()> {
    let document = read_json_document(input)?;

    // Reject documents the engine cannot load before they are archived.
    let mut session = OverlaySession::new(OverlayConfig::default())?;
    let issues = session.load_document(&document)?;
    for issue in issues {
        warn!(%issue, "span will be skipped when rendered");
    }

    let bytes = encode_document(&document)?;
    fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    info!(bytes = bytes.len(), spans = document.spans.len(), output = %output.display(), "archive written");
    Ok(())
}

fn render(
    input: &Path,
    config: OverlayConfig,
    scroll: f64,
    height: f64,
    page: Option<usize>,
    format: Format,
) -> anyhow::Result<String> {
    let document = read_document(input)?;
    let mut session = OverlaySession::new(config)?;
    for issue in session.load_document(&document)? {
        warn!(%issue, "span skipped");
    }

    let units = match page {
        Some(page) => {
            let count = session.pager().page_count();
            if page >= count.max(1) {
                anyhow::bail!("page {page} is out of range, the document has {count} pages");
            }
            session.render_page(page)
        }
        None => {
            session.resize(height);
            session.scroll_to(scroll);
            session.render_visible()
        }
    };
    Ok(format_units(&units, format))
}

fn format_units(units: &[RenderedUnit], format: Format) -> String {
    let write = match format {
        Format::Html => write_html,
        Format::Text => write_plain,
    };
    units.iter().map(write).collect::<Vec<_>>().join("\n")
}

fn read_config(path: &Path) -> anyhow::Result<OverlayConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn read_json_document(path: &Path) -> anyhow::Result<AnnotatedDocument> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing document {}", path.display()))
}

fn read_document(path: &Path) -> anyhow::Result<AnnotatedDocument> {
    if path.extension().is_some_and(|ext| ext == "rkyv") {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(decode_document(&bytes)?)
    } else {
        read_json_document(path)
    }
}
