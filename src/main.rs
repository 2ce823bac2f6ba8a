use clap::{Parser, Subcommand};
use herbarium::diagnostics::Diagnostics;
use herbarium::imaging::MagickTool;
use herbarium::process::AssetEvent;
use herbarium::{config, indexes, output, pipeline, process};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that convert images.
#[derive(clap::Args, Clone)]
struct ProcessArgs {
    /// Delete derived images no species refers to
    #[arg(long)]
    remove_unused: bool,
}

#[derive(Parser)]
#[command(name = "herbarium")]
#[command(about = "Catalog builder for a hand-curated species photo collection")]
#[command(long_about = "\
Catalog builder for a hand-curated species photo collection

Every directory with an index.txt is a group or a species. Groups collect
the species below them; species list their photos in session documents.

Source structure:

  source/
  ├── config.toml                  # Build config (optional)
  ├── index.txt                    # Root document, listdir fixes top-level order
  ├── static/                      # Skipped by the traversal
  └── plants/
      ├── index.txt                # group_title: Plants
      └── blue/
          ├── index.txt            # group_title: Blue flowers, next_group: ...
          └── viola/
              ├── index.txt        # genus: Viola, species: odorata
              │                    # ---
              │                    # images: [1.jpg, 2.jpg]
              ├── 1.jpg
              └── 2.jpg

Output:
  docs/images/viola-odorata-1.jpg  # full copy
  docs/thumbs/viola-odorata-1.jpg  # thumbnail
  docs/site.json                   # groups, species, indexes, diagnostics

Set RUST_LOG=debug for traversal and conversion tracing.
Run 'herbarium gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Source directory
    #[arg(long, default_value = "source", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "docs", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the source tree and print the linked catalog
    Check,
    /// Convert full images and thumbnails
    Process(ProcessArgs),
    /// Print index summaries
    Index,
    /// Run the full pipeline and write site.json
    Build(ProcessArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let site_config = config::load_config(&cli.source)?;
            let mut diags = Diagnostics::new();
            let catalog = pipeline::load_catalog(&cli.source, &site_config, &mut diags)?;
            output::print_catalog(&catalog);
            output::print_diagnostics(&diags);
        }
        Command::Process(args) => {
            let site_config = load_with_overrides(&cli.source, &args)?;
            init_thread_pool(&site_config.processing);
            let mut diags = Diagnostics::new();
            let mut catalog = pipeline::load_catalog(&cli.source, &site_config, &mut diags)?;
            let (tx, printer) = spawn_printer(&cli.output);
            let report = process::process(
                &mut catalog,
                &cli.source,
                &cli.output,
                &site_config,
                &mut diags,
                Some(tx),
            )?;
            printer.join().map_err(|_| "event printer panicked")?;
            println!("Images: {}", report.stats);
            output::print_diagnostics(&diags);
        }
        Command::Index => {
            let site_config = config::load_config(&cli.source)?;
            let mut diags = Diagnostics::new();
            let catalog = pipeline::load_catalog(&cli.source, &site_config, &mut diags)?;
            let built = indexes::build_all(&catalog, &site_config.indexes, &mut diags);
            output::print_indexes(&built);
            output::print_diagnostics(&diags);
        }
        Command::Build(args) => {
            let site_config = load_with_overrides(&cli.source, &args)?;
            init_thread_pool(&site_config.processing);

            println!(
                "==> Building {} → {}",
                cli.source.display(),
                cli.output.display()
            );
            let tool = MagickTool::from_config(&site_config.images);
            let (tx, printer) = spawn_printer(&cli.output);
            let site =
                pipeline::build_site(&tool, &cli.source, &cli.output, &site_config, Some(tx))?;
            printer.join().map_err(|_| "event printer panicked")?;
            println!("Images: {}", site.assets.stats);

            output::print_indexes(&site.indexes);
            pipeline::write_site(&site, &cli.output)?;
            output::print_diagnostics(&site.diagnostics);
            println!("==> Build complete: {}", cli.output.join("site.json").display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `config.toml` and apply command-line overrides.
fn load_with_overrides(
    source: &Path,
    args: &ProcessArgs,
) -> Result<config::SiteConfig, config::ConfigError> {
    let mut site_config = config::load_config(source)?;
    if args.remove_unused {
        site_config.assets.remove_unused = true;
    }
    Ok(site_config)
}

/// Print asset events from a background thread as they arrive. The thread
/// ends when the returned sender and every clone of it are dropped.
fn spawn_printer(output_root: &Path) -> (Sender<AssetEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let root = output_root.to_path_buf();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_asset_event(&event, &root) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
