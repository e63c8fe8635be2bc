//! CMS client router (v1)
//!
//! Resolves, matches and renders CMS-published pages against a headless
//! document.
//!
//! # Architecture Overview
//!
//! ```text
//!   page URL
//!      │
//!      ▼
//!  ┌─────────┐   ┌──────────┐   ┌──────────────┐   ┌──────────┐
//!  │ routing │──▶│ redirect │──▶│   content    │──▶│  render  │──▶ document
//!  │ router  │   │ matcher  │   │ resolve+fetch│   │ live DOM │
//!  └────┬────┘   └──────────┘   └──────────────┘   └──────────┘
//!       │
//!       ├──▶ host (navigate, history, frame messages)
//!       └──▶ hooks (client callbacks)
//!
//!  Cross-cutting: config (TOML), observability (tracing + metrics)
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use tokio::task::LocalSet;
use url::Url;

use cms_router::config::{load_config, validation::validate_config, ClientConfig};
use cms_router::content::{ContentLoader, HttpFetcher};
use cms_router::observability::logging;
use cms_router::resolve::{PathResolver, ResolutionOptions};
use cms_router::routing::{DefaultHooks, Redirect, RedirectMatcher, RouteOptions, Router};
use cms_router::{Document, HeadlessHost, Host};

#[derive(Parser)]
#[command(name = "cms-router")]
#[command(about = "Resolve, match and render CMS-published pages", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content path of a page URL
    Resolve {
        url: String,
        #[arg(long, default_value_t = 1)]
        variation: u32,
        #[arg(long)]
        strict: bool,
    },
    /// Print the first redirect rule matching a page URL
    Match {
        url: String,
        /// Redirect listing JSON file (defaults to the configured listing)
        #[arg(long)]
        redirects: Option<PathBuf>,
    },
    /// Fetch and print the page data of a page URL
    Fetch {
        url: String,
        #[arg(long)]
        origin: Option<String>,
    },
    /// Route a page URL into a headless document and print the result
    Route {
        url: String,
        #[arg(long)]
        origin: Option<String>,
        /// Current location (defaults to the origin)
        #[arg(long)]
        current: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("Invalid configuration: {error}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }
    logging::init(&config.observability);

    tracing::info!(
        page_files_path = %config.page_files_path,
        origin = %config.fetch.origin,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Resolve { url, variation, strict } => {
            let location = Url::parse(&config.fetch.origin)?;
            let resolver = PathResolver::from_config(&config);
            let mut options = ResolutionOptions {
                strict: strict || config.strict_url_resolution,
                variation,
            };
            println!("{}", resolver.resolve(&url, &location, &mut options)?);
        }
        Commands::Match { url, redirects } => {
            let location = Url::parse(&config.fetch.origin)?;
            let redirects: Vec<Redirect> = match redirects {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                None => {
                    let loader = ContentLoader::new(HttpFetcher::new(&config.fetch)?, &config);
                    loader.redirects().await?
                }
            };
            match RedirectMatcher::new(&redirects).find(&url, &location)? {
                Some(found) => println!("{} {}", found.http_code, found.destination),
                None => println!("no match"),
            }
        }
        Commands::Fetch { url, origin } => {
            if let Some(origin) = origin {
                config.fetch.origin = origin;
            }
            let location = Url::parse(&config.fetch.origin)?;
            let loader = ContentLoader::new(HttpFetcher::new(&config.fetch)?, &config);
            let page = loader.page_data(&url, &location).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Route { url, origin, current } => {
            if let Some(origin) = origin {
                config.fetch.origin = origin;
            }
            let location = Url::parse(current.as_deref().unwrap_or(&config.fetch.origin))?;
            let fetcher = HttpFetcher::new(&config.fetch)?;
            LocalSet::new()
                .run_until(route(fetcher, config, location, url))
                .await?;
        }
    }

    Ok(())
}

async fn route(
    fetcher: HttpFetcher,
    config: ClientConfig,
    location: Url,
    url: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = Rc::new(HeadlessHost::new(location));
    let document = Rc::new(RefCell::new(Document::new()));
    let router = Router::new(fetcher, config, host.clone(), Rc::new(DefaultHooks), document.clone());

    let outcome = router.route(&url, RouteOptions::default()).await?;
    println!("outcome: {}", outcome.label());
    println!("title: {}", document.borrow().title());
    for (entry, title) in host.history() {
        println!("history: {entry} ({title})");
    }
    for target in host.navigations() {
        println!("navigate: {target}");
    }
    println!("location: {}", host.current_url());

    let doc = document.borrow();
    println!("<html>{}</html>", doc.inner_html(doc.root()));
    Ok(())
}
