use clap::{Parser, Subcommand};
use layoutsmith::{config, output, pipeline, source};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("LAYOUTSMITH_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("LAYOUTSMITH_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "layoutsmith")]
#[command(about = "Compose page templates with shared layouts")]
#[command(long_about = "\
Compose page templates with shared layouts

Pages are rendered through the layout they name in front matter, or through
the default layout. Layout files are removed from the output.

Project structure:

  layoutsmith.toml                 # Config (optional)
  src/
  ├── index.twig                   # Page → index.html
  ├── pages/
  │   └── about.twig               # Page → pages/about.html
  ├── partials/
  │   └── nav.twig                 # Reachable by include, not a page if
  │                                # excluded from `pages`
  └── layouts/
      ├── default-layout.twig      # Extended by every page by default
      ├── static-layout.twig       # Wrapper for `static: true` pages
      └── post.twig                # Selected with `layout: post`

Front matter keys understood on pages:
  layout:      layout name, or \"none\" for no layout
  static:      true renders the page, then passes it to the static layout
               as `contents`
  layoutName:  (on layouts) register under this name instead of the file stem

Run 'layoutsmith gen-config' to generate a documented layoutsmith.toml.
Set RUST_LOG=layoutsmith=debug to trace layout decisions and template lookups.")]
#[command(version = version_string())]
struct Cli {
    /// Project root: config, relative roots and packages resolve from here
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file, relative to the project root
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every page and write the site to the destination
    Build,
    /// Classify and validate without rendering
    Check,
    /// Print a stock layoutsmith.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Build => {
            let config = config::load_config(&cli.root.join(&cli.config))?;
            let source_dir = cli.root.join(&config.source);
            let destination = cli.root.join(&config.destination);
            let clean = config.clean;

            println!("==> Reading {}", source_dir.display());
            let mut files = source::read_source(&source_dir)?;

            println!("==> Rendering {} files", files.len());
            let options = pipeline::BuildOptions::new(config, &cli.root);
            let report = pipeline::run(&mut files, &options)?;
            output::print_build_output(&report);

            println!("==> Writing {}", destination.display());
            source::write_output(&files, &destination, clean)?;
            println!("==> Build complete: {}", destination.display());
        }
        Command::Check => {
            let config = config::load_config(&cli.root.join(&cli.config))?;
            let source_dir = cli.root.join(&config.source);
            println!("==> Checking {}", source_dir.display());
            let files = source::read_source(&source_dir)?;
            let report = pipeline::check_plan(&files, &config)?;
            output::print_check_output(&report);
            println!("==> Layouts are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the `RUST_LOG`-driven subscriber. Diagnostics go to stderr so
/// stdout stays the build report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("layoutsmith=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

