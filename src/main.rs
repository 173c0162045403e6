use clap::{Parser, Subcommand};
use lumio::app::{App, AppOptions, check_site};
use lumio::assets::DirSource;
use lumio::catalog::{Catalog, FILTER_ALL, build_cards};
use lumio::config::{self, SiteConfig};
use lumio::events::Events;
use lumio::output;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "lumio")]
#[command(about = "Run a storefront's client-side behaviour without a browser")]
#[command(long_about = "\
Run a storefront's client-side behaviour without a browser

The site directory holds the shell and every fragment the storefront fetches:

  site/
  ├── lumio.toml                   # Config (optional, overrides stock defaults)
  ├── index.html                   # Shell with the component placeholders
  ├── components/                  # Shell components and home sections
  │   ├── header.html              # → #header-placeholder
  │   ├── product-modal.html       # → #product-modal-placeholder
  │   ├── footer.html              # → #footer-placeholder
  │   └── hero.html ...            # → #hero-placeholder (home page only)
  ├── pages/                       # One fragment per route
  │   ├── home.html
  │   └── produtos.html
  └── data/products.json           # Product feed

Run 'lumio gen-config' to generate a documented lumio.toml.")]
#[command(version)]
struct Cli {
    /// Site directory
    #[arg(long, default_value = ".", global = true)]
    site: PathBuf,

    /// Config file (defaults to lumio.toml inside the site directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Boot the site on a route and report what the page shows
    Navigate {
        /// Route key, with or without the leading '#'
        #[arg(default_value = "")]
        route: String,
        /// Apply a category filter once the page is loaded
        #[arg(long)]
        filter: Option<String>,
    },
    /// List the product cards the feed produces
    Catalog {
        /// Only products flagged as featured
        #[arg(long)]
        featured: bool,
    },
    /// Check that every page, component and the feed can be fetched
    Check,
    /// Print a stock lumio.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_site_config(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    match &cli.config {
        Some(path) => config::load_config_file(path),
        None => config::load_config(&cli.site),
    }
}

fn read_shell(site: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(site.join("index.html"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = load_site_config(&cli)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(&cli, site_config))
}

async fn run(cli: &Cli, site_config: SiteConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = Arc::new(DirSource::new(&cli.site));

    match &cli.command {
        Command::Navigate { route, filter } => {
            let shell = read_shell(&cli.site)?;
            let (events, mut rx) = Events::channel();
            let options = AppOptions {
                events,
                initial_hash: route.clone(),
                ..AppOptions::default()
            };
            let app = App::with_options(site_config, source, &shell, options);
            let load = app.boot().await;
            if let Some(category) = filter.as_deref().filter(|c| *c != FILTER_ALL) {
                app.catalog().apply_filter(category).await;
            }
            if cli.verbose > 0 {
                while let Ok(event) = rx.try_recv() {
                    eprintln!("{}", output::format_event(&event));
                }
            }
            output::print_page_summary(&load, &app.summary());
            app.countdown().stop();
        }
        Command::Catalog { featured } => {
            let dom = lumio::dom::Dom::default();
            let site_config = Arc::new(site_config);
            let loader = lumio::assets::FragmentLoader::new(
                source,
                dom.clone(),
                site_config.timing.fragment_pause(),
            );
            let catalog = Catalog::new(loader, dom, Arc::clone(&site_config), Events::disabled());
            let products = catalog.fetch_products().await?;
            let selected: Vec<_> = products
                .iter()
                .filter(|p| !featured || p.featured)
                .collect();
            let cards = build_cards(&selected, &site_config)?;
            output::print_cards(&cards);
        }
        Command::Check => {
            println!("==> Checking {}", cli.site.display());
            let check = check_site(&site_config, source.as_ref()).await;
            output::print_site_check(&check);
            if !check.is_ok() {
                return Err(format!("{} asset(s) unavailable", check.problems().count()).into());
            }
            println!("==> Site is valid");
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}
