use anyhow::{Context, Result};
use blogfeed::api::ApiClient;
use blogfeed::blog::{BlogService, SearchCriteria, ServiceOptions};
use blogfeed::config::Config;
use blogfeed::present::decorate;
use blogfeed::transfer::TransferState;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Get the config directory path (~/.config/blogfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("blogfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "blogfeed", about = "Browse and search a blog API from the terminal")]
struct Args {
    /// Config file (default: ~/.config/blogfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API root URL, overrides the config file
    #[arg(long, value_name = "URL")]
    api: Option<String>,

    /// Articles per page, overrides the config file
    #[arg(long)]
    page_size: Option<u32>,

    /// Transfer-state payload: adopted at startup if present, written on exit
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Browse the article feed
    List {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Search articles by title and/or category
    Search {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Suggest article titles
    Suggest { text: String },
    /// Print the category list
    Categories,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => match get_config_dir() {
            Ok(dir) => Config::load(&dir.join("config.toml")).context("Failed to load config")?,
            Err(e) => {
                tracing::debug!(error = %e, "No config directory, using defaults");
                Config::default()
            }
        },
    };

    if let Some(api) = &args.api {
        config.api_base_url = api.clone();
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_feed(service: &BlogService, palette: &[String]) {
    let feed = decorate(&service.feed().get(), palette);
    if feed.is_empty() {
        println!("No articles.");
    }
    for (i, article) in feed.iter().enumerate() {
        println!(
            "{:>3}. [{}] {}",
            i + 1,
            article.color.as_deref().unwrap_or("-"),
            article.title
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let transfer = match &args.state {
        Some(path) => TransferState::load(path)
            .with_context(|| format!("Failed to read transfer state '{}'", path.display()))?,
        None => TransferState::new(),
    };

    let client = ApiClient::from_config(&config).context("Failed to create API client")?;
    let service = BlogService::new(client, transfer, ServiceOptions::from(&config));

    match &args.command {
        Command::List { pages } => {
            for _ in 0..*pages {
                service.request_list(None).await;
                if service.exhausted().get() {
                    break;
                }
            }
            print_feed(&service, &config.palette);
            let cursor = service.cursor();
            println!(
                "-- {} articles, next window {}{}",
                service.feed().get().len(),
                cursor.window(),
                if service.exhausted().get() {
                    " (no more articles)"
                } else {
                    ""
                }
            );
        }
        Command::Search { title, category } => {
            let criteria = SearchCriteria {
                title: title.clone(),
                category: category.clone(),
            };
            if !criteria.is_active() {
                anyhow::bail!("search needs a non-empty --title or --category");
            }
            service.update_criteria(criteria.clone());
            service.request_list(Some(criteria)).await;
            print_feed(&service, &config.palette);
        }
        Command::Suggest { text } => {
            for suggestion in service.title_query(text).await {
                println!("{}", suggestion.title);
            }
        }
        Command::Categories => {
            for category in service.wait_for_categories().await.iter() {
                println!("{:>4}  {}", category.id_text(), category.name);
            }
        }
    }

    if let Some(path) = &args.state {
        // The payload must carry the categories for the next process.
        service.wait_for_categories().await;
        service
            .transfer_state()
            .save(path)
            .with_context(|| format!("Failed to write transfer state '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "Transfer state written");
    }

    Ok(())
}
