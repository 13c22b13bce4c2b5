use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::DocPoint;
use pdf_editor_core::{apply_edit, EditRequest};
use pdf_editor_render::PageRasterizer;
use pdf_engine::PdfDocument;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "pdf-editor-cli")]
#[command(about = "Headless PDF Editor tools")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Insert a line of text and save the result.
    InsertText {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = doc_model::DEFAULT_FONT_SIZE)]
        size: u32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Cover a rectangle with opaque white and save the result.
    Whiteout {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Render a page to PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    width: f32,
    height: f32,
    rotation: u16,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::InsertText { file, page, x, y, text, size, output } => {
            let page_index = page_index(page)?;
            let request =
                EditRequest::InsertText { page_index, at: DocPoint::new(x, y), text, font_size: size };
            run_edit(&file, &request, &output)
        }
        Commands::Whiteout { file, page, x, y, width, height, output } => {
            let page_index = page_index(page)?;
            let request = EditRequest::Whiteout { page_index, at: DocPoint::new(x, y), width, height };
            run_edit(&file, &request, &output)
        }
        Commands::Render { file, page, scale, output } => {
            run_render(&file, page, scale, output.as_deref())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    let document = open_document(file)?;

    let pages = (0..document.page_count())
        .map(|index| {
            let geometry = document.page_geometry(index)?;
            let (width, height) = geometry.display_size();
            Ok(PageOutput { width, height, rotation: geometry.rotation })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload =
        InfoOutput { path: file.display().to_string(), page_count: document.page_count(), pages };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_edit(file: &Path, request: &EditRequest, output: &Path) -> Result<()> {
    let mut document = open_document(file)?;

    apply_edit(&mut document, request).context("failed to apply edit")?;
    document
        .save_as(output)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;

    println!("{}", request.status_message());
    println!("{}", output.display());

    Ok(())
}

fn run_render(file: &Path, page: u32, scale: f32, output: Option<&Path>) -> Result<()> {
    let page_index = page_index(page)?;
    let mut document = open_document(file)?;

    let mut rasterizer = PageRasterizer::new().context("failed to initialize renderer")?;
    let rendered = rasterizer
        .render_page(&mut document, page_index, doc_model::clamp_zoom(scale), 1.0)
        .context("failed to render page")?;

    let image = image::RgbaImage::from_raw(rendered.width, rendered.height, rendered.rgba)
        .context("renderer returned a truncated bitmap")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn open_document(file: &Path) -> Result<PdfDocument> {
    ensure_pdf_exists(file)?;

    PdfDocument::open(file).context("failed to open PDF")
}

fn page_index(page: u32) -> Result<u32> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    Ok(page - 1)
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
