use clap::{Parser, Subcommand};
use simple_docs::config::{self, CliOverrides};
use simple_docs::output;
use simple_docs::pipeline::{self, BuildError, BuildOptions, CancelFlag};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simple-docs")]
#[command(about = "Static documentation site builder for multi-locale Markdown")]
#[command(long_about = "\
Static documentation site builder for multi-locale Markdown

Every locale serves the full page set: pages a locale has not translated
are served from the default locale and flagged as untranslated. Every
internal link and anchor is checked before anything is written.

Content structure:

  content/
  ├── config.toml                  # Site config (optional)
  ├── docs/                        # Default-locale pages
  │   ├── index.md                 # Landing page
  │   ├── 010-intro.md             # NNN- prefix = sidebar position
  │   └── 020-guide/
  │       ├── _category_.yml       # Group label and position
  │       ├── index.md             # The group's own page
  │       └── setup.md
  ├── blog/
  │   └── 2024-03-01-release.md    # Dated post → /blog/release/
  ├── static/                      # Copied verbatim to the output root
  └── i18n/
      └── pt-BR/docs/010-intro.md  # Translation → /pt-BR/intro/

Front matter (YAML between --- or TOML between +++):
  title, position, slug, tags, sidebar_label, description, draft, date

Run 'simple-docs gen-config' to generate a documented config.toml.")]
#[command(version = env!("SIMPLE_DOCS_VERSION"))]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Locale to build (repeatable); replaces the locales declared in config.toml
    #[arg(long = "locale", value_name = "CODE", global = true)]
    locales: Vec<String>,

    /// Locale served at the output root
    #[arg(long, value_name = "CODE", global = true)]
    default_locale: Option<String>,

    /// Validate and emit a single locale (the default locale is still loaded)
    #[arg(long, value_name = "CODE", global = true)]
    only_locale: Option<String>,

    /// Include pages marked `draft: true`
    #[arg(long, global = true)]
    drafts: bool,

    /// Log pipeline progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Validate, render and write the site
    Build,
    /// Validate content and links without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BuildError> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut site_config = config::load_config(&cli.source)?;
    site_config.apply_overrides(&CliOverrides {
        locales: cli.locales.clone(),
        default_locale: cli.default_locale.clone(),
        include_drafts: cli.drafts,
    })?;
    init_thread_pool(&site_config.build);

    let options = BuildOptions {
        only_locale: cli.only_locale.clone(),
        cancel: CancelFlag::new(),
    };
    match cli.command {
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let report = pipeline::check(&cli.source, &site_config, &options)?;
            output::print_check_report(&report);
            println!("==> Content is valid");
        }
        Command::Build => {
            install_ctrl_c(options.cancel.clone());
            println!(
                "==> Building {} → {}",
                cli.source.display(),
                cli.output.display()
            );
            let report = pipeline::build(&cli.source, &cli.output, &site_config, &options)?;
            output::print_build_report(&report);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::GenConfig => {}
    }
    Ok(())
}

/// `--verbose` shows progress; otherwise `RUST_LOG` decides, warnings by default.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on build config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(build: &config::BuildConfig) {
    let threads = config::effective_threads(build);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Turn Ctrl-C into a cancellation: pages already committed stay, locales
/// still staging are discarded.
fn install_ctrl_c(cancel: CancelFlag) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "Ctrl-C handling unavailable");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, discarding unfinished locales");
                cancel.cancel();
            }
        });
    });
}
