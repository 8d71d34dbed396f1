use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use oxidize_media::params::{self, ResizeParams, DEFAULT_MAX_DIMENSION};
use oxidize_media::{execute, TempConfig, TempStore, TransformRequest, TransformResult, UploadedFile};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "oxidize-media",
    about = "Image and PDF transformations from the command line",
    version,
    author
)]
struct Cli {
    /// Directory used to stage temporary files
    #[arg(long, global = true, env = "OXIDIZE_MEDIA_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Log pipeline steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompress an image, optionally changing its format
    Compress {
        /// Input image
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// png, jpg, jpeg, webp, tiff or ico
        #[arg(short, long)]
        format: Option<String>,

        /// 1-100, clamped (default 80)
        #[arg(short, long)]
        quality: Option<String>,
    },

    /// Convert an image to another format
    Convert {
        /// Input image
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// png, jpg, webp, tiff or ico
        #[arg(short, long)]
        format: Option<String>,

        /// 1-100, clamped (default 90)
        #[arg(short, long)]
        quality: Option<String>,
    },

    /// Resize an image into a box
    Resize {
        /// Input image
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Target width in pixels
        #[arg(long)]
        width: Option<String>,

        /// Target height in pixels
        #[arg(long)]
        height: Option<String>,

        /// contain, cover, inside, outside or fill
        #[arg(long)]
        fit: Option<String>,

        /// png, jpg, jpeg, webp or tiff
        #[arg(short, long)]
        format: Option<String>,

        /// 1-100, clamped (default 90)
        #[arg(short, long)]
        quality: Option<String>,
    },

    /// Cut a rectangle out of an image (written as PNG)
    Crop {
        /// Input image
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "0")]
        left: String,

        #[arg(long, default_value = "0")]
        top: String,

        #[arg(long)]
        width: String,

        #[arg(long)]
        height: String,
    },

    /// Render a 256x256 icon
    Ico {
        /// Input image
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge multiple PDFs into one
    Merge {
        /// Input PDF files, in output order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract pages into a new PDF
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// 1-based pages, e.g. "3,1" or "[3,1]". Missing pages are skipped.
        #[arg(short, long)]
        pages: String,
    },

    /// Rebuild a PDF in a new page order
    Organize {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// 1-based page sequence; repeats and omissions allowed
        #[arg(long)]
        order: String,
    },

    /// Rotate every page of a PDF
    Rotate {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Rotation angle (90, 180, 270)
        #[arg(short, long, default_value = "90")]
        angle: String,
    },

    /// Remove stale files from the staging directory
    Sweep {
        /// Age in seconds after which a file is removed
        #[arg(long, default_value_t = 3600)]
        max_age_secs: u64,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "oxidize_media=debug,oxidize_media_cli=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_upload(name: &str, path: &Path) -> Result<UploadedFile> {
    let data = std::fs::read(path)
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    let mut file = UploadedFile::new(name, data);
    if let Some(file_name) = path.file_name() {
        file = file.with_file_name(file_name.to_string_lossy());
    }
    Ok(file)
}

/// Accept both `3,1` and `[3,1]`.
fn page_list(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        trimmed.to_string()
    } else {
        format!("[{trimmed}]")
    }
}

fn run(request: TransformRequest, store: &TempStore, output: &Path) -> Result<TransformResult> {
    let operation = request.operation();
    let result =
        execute(request, store).map_err(|e| anyhow!("Failed to {}: {}", operation, e))?;
    std::fs::write(output, &result.data)
        .map_err(|e| anyhow!("Failed to write {}: {}", output.display(), e))?;
    debug!(operation, bytes = result.byte_len, "Output written");
    Ok(result)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = TempConfig::default();
    if let Some(directory) = cli.temp_dir {
        config.directory = directory;
    }

    match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            quality,
        } => {
            let file = read_upload("file", &input)?;
            let request = params::compress_request(file, format.as_deref(), quality.as_deref())?;
            let result = run(request, &TempStore::new(config), &output)?;
            println!(
                "✓ Compressed to {} ({}, {} bytes)",
                output.display(),
                result.mime_type,
                result.byte_len
            );
        }

        Commands::Convert {
            input,
            output,
            format,
            quality,
        } => {
            let file = read_upload("file", &input)?;
            let request = params::convert_request(file, format.as_deref(), quality.as_deref())?;
            let result = run(request, &TempStore::new(config), &output)?;
            println!(
                "✓ Converted to {} ({}, {} bytes)",
                output.display(),
                result.mime_type,
                result.byte_len
            );
        }

        Commands::Resize {
            input,
            output,
            width,
            height,
            fit,
            format,
            quality,
        } => {
            let file = read_upload("file", &input)?;
            let raw = ResizeParams {
                format: format.as_deref(),
                width: width.as_deref(),
                height: height.as_deref(),
                fit: fit.as_deref(),
                quality: quality.as_deref(),
            };
            let request = params::resize_request(file, raw, DEFAULT_MAX_DIMENSION)?;
            let result = run(request, &TempStore::new(config), &output)?;
            println!(
                "✓ Resized to {} ({} bytes)",
                output.display(),
                result.byte_len
            );
        }

        Commands::Crop {
            input,
            output,
            left,
            top,
            width,
            height,
        } => {
            let file = read_upload("file", &input)?;
            let request = params::crop_request(
                file,
                Some(left.as_str()),
                Some(top.as_str()),
                Some(width.as_str()),
                Some(height.as_str()),
            )?;
            run(request, &TempStore::new(config), &output)?;
            println!("✓ Cropped {}x{} to {}", width, height, output.display());
        }

        Commands::Ico { input, output } => {
            let file = read_upload("file", &input)?;
            let request = TransformRequest::IcoConvert { file };
            run(request, &TempStore::new(config), &output)?;
            println!("✓ Icon written to {}", output.display());
        }

        Commands::Merge { files, output } => {
            let uploads = files
                .iter()
                .map(|path| read_upload("files", path))
                .collect::<Result<Vec<_>>>()?;
            let request = params::merge_request(uploads)?;
            run(request, &TempStore::new(config), &output)?;
            println!(
                "✓ Merged {} files into {}",
                files.len(),
                output.display()
            );
        }

        Commands::Split {
            input,
            output,
            pages,
        } => {
            let file = read_upload("file", &input)?;
            let request = params::split_request(file, &page_list(&pages))?;
            run(request, &TempStore::new(config), &output)?;
            println!("✓ Extracted pages {} to {}", pages, output.display());
        }

        Commands::Organize {
            input,
            output,
            order,
        } => {
            let file = read_upload("file", &input)?;
            let request = params::reorder_request(file, &page_list(&order))?;
            run(request, &TempStore::new(config), &output)?;
            println!("✓ Reordered pages into {}", output.display());
        }

        Commands::Rotate {
            input,
            output,
            angle,
        } => {
            let file = read_upload("file", &input)?;
            let request = params::rotate_request(file, Some(angle.as_str()))?;
            let result = run(request, &TempStore::new(config), &output)?;
            if let Some(summary) = result.rotation {
                println!(
                    "✓ Successfully rotated {} pages {} degrees in {}",
                    summary.pages,
                    summary.angle,
                    output.display()
                );
            }
        }

        Commands::Sweep { max_age_secs } => {
            config.max_age = Duration::from_secs(max_age_secs);
            let store = TempStore::new(config);
            let report = store.sweep_expired();
            println!(
                "✓ Swept {}: {} scanned, {} removed, {} failed",
                store.directory().display(),
                report.scanned,
                report.removed,
                report.failed
            );
        }
    }

    Ok(())
}
