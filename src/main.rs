//! ndsfs CLI - extract and rebuild cartridge images

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ndsfs::ops::{build, extract, info, list, resolve_layout, ExtractOptions};

#[derive(Parser)]
#[command(name = "ndsfs")]
#[command(about = "extract and rebuild cartridge images and their packed filesystem")]
#[command(version)]
struct Cli {
    /// log placements and per-file writes
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// build an image from an extracted directory
    Build {
        /// extracted directory with sys/, files/ and optionally overlay/
        source: PathBuf,

        /// image to write
        output: PathBuf,

        /// layout file overriding <source>/layout.toml
        #[arg(short, long, env = "NDSFS_LAYOUT")]
        layout: Option<PathBuf>,
    },

    /// extract an image into a directory
    Extract {
        /// image to read
        image: PathBuf,

        /// destination directory
        destination: PathBuf,

        /// extract into a non-empty directory
        #[arg(short, long)]
        force: bool,
    },

    /// list overlays and files with their byte ranges
    List {
        /// image to read
        image: PathBuf,
    },

    /// show header fields and table statistics
    Info {
        /// image to read
        image: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> ndsfs::Result<()> {
    match cli.command {
        Commands::Build {
            source,
            output,
            layout,
        } => {
            let layout = resolve_layout(&source, layout.as_deref())?;
            let stats = build(&source, &output, &layout)?;
            println!(
                "built {}: {} directories, {} files, {} overlays, {:#x} bytes",
                output.display(),
                stats.directories,
                stats.files,
                stats.overlays,
                stats.image_size
            );
        }

        Commands::Extract {
            image,
            destination,
            force,
        } => {
            let stats = extract(&image, &destination, &ExtractOptions { force })?;
            println!(
                "extracted {} to {}: {} directories, {} files, {} overlays, {} bytes",
                image.display(),
                destination.display(),
                stats.directories,
                stats.files,
                stats.overlays,
                stats.bytes_written
            );
        }

        Commands::List { image } => {
            for entry in list(&image)? {
                println!("{}", entry);
            }
        }

        Commands::Info { image } => {
            println!("{}", info(&image)?);
        }
    }

    Ok(())
}
