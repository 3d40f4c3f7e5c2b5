use anyhow::Context;
use bv_core::{Article, ArticleStorage, Citation, InferenceModel, Result};
use bv_inference::embeddings::EmbeddingGenerator;
use bv_inference::generator::ArticleGenerator;
use bv_inference::{Config, Provider};
use bv_scrappers::{handle_command, Pipeline, ScraperArgs, ScraperCommands, ScraperConfig, WebScraper};
use bv_storage::{HybridSearch, StorageKind};
use bv_web::{AppState, ServerConfig};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "bv", author, version, about = "BharatVerse content pipeline", long_about = None)]
pub struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, env = "BV_STORAGE", default_value = "sqlite", global = true)]
    storage: StorageKind,
    /// SQLite URL, e.g. sqlite://bharatverse.db
    #[arg(long, env = "BV_DATABASE_URL", global = true)]
    database_url: Option<String>,
    /// LLM provider: gemini, anthropic, openai, groq or dummy
    #[arg(long, env = "LLM_PROVIDER", default_value = "gemini", global = true)]
    provider: Provider,
    /// Overrides the provider's default model
    #[arg(long, env = "LLM_MODEL", global = true)]
    model: Option<String>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    gemini_api_key: Option<String>,
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, global = true)]
    anthropic_api_key: Option<String>,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, global = true)]
    groq_api_key: Option<String>,
    /// Seconds between scraper requests
    #[arg(long, env = "SCRAPING_RATE_LIMIT_SECONDS", default_value_t = 2.0, global = true)]
    rate_limit_seconds: f64,
    #[arg(long, env = "MAX_SCRAPING_RETRIES", default_value_t = 3, global = true)]
    max_retries: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the REST API
    Serve {
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "API_PORT", default_value_t = 8000)]
        port: u16,
        #[arg(long, env = "API_PREFIX", default_value = "/api/v1")]
        prefix: String,
        /// Add vector similarity to search (needs an embedding-capable provider)
        #[arg(long)]
        semantic: bool,
    },
    /// Scrape sources and generate articles
    Scrape(ScraperArgs),
    /// Search stored articles
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        semantic: bool,
    },
    /// Check that the storage backend can write, read and delete
    Check,
}

impl Cli {
    fn inference_config(&self) -> Config {
        let api_key = match self.provider {
            Provider::Gemini => self.gemini_api_key.clone(),
            Provider::Anthropic => self.anthropic_api_key.clone(),
            Provider::OpenAI => self.openai_api_key.clone(),
            Provider::Groq => self.groq_api_key.clone(),
            Provider::Dummy => None,
        };
        Config {
            provider: self.provider,
            model_name: self.model.clone(),
            api_key,
            embedding_api_key: self.openai_api_key.clone(),
            retry: bv_core::RetryPolicy {
                max_retries: self.max_retries,
                ..Default::default()
            },
            ..Config::default()
        }
    }

    fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig::from_settings(self.rate_limit_seconds, self.max_retries)
    }
}

/// Outside the `art_` namespace, so it never collides with a real article.
fn scratch_article() -> Article {
    let now = Utc::now();
    let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    Article {
        id: format!("check_{}", Uuid::new_v4().simple()),
        title: "Storage check".to_string(),
        summary: "Written and removed by bv check.".to_string(),
        content: "Check content.".to_string(),
        sections: Vec::new(),
        citations: vec![Citation {
            text: "check".to_string(),
            source_url: "https://example.com/check".to_string(),
            source_name: "check".to_string(),
            accessed_date: now,
        }],
        publication_date: date,
        reading_time_minutes: 1,
        author: bv_core::DEFAULT_AUTHOR.to_string(),
        tags: vec!["check".to_string()],
        image_url: None,
        created_at: now,
        updated_at: now,
    }
}

async fn check_storage(storage: &Arc<dyn ArticleStorage>, storage_type: StorageKind) -> Result<()> {
    let scratch = scratch_article();
    if storage.get_article(&scratch.id).await?.is_some() {
        return Err(bv_core::Error::Conflict(format!("scratch id {} is taken", scratch.id)));
    }
    storage.store_article(&scratch).await?;

    let stored = storage.get_article(&scratch.id).await?;
    if stored.as_ref().map(|a| a.title.as_str()) != Some(scratch.title.as_str()) {
        return Err(bv_core::Error::Storage("Failed to read back scratch article".to_string()));
    }

    storage.delete_article(&scratch.id).await?;
    if storage.get_article(&scratch.id).await?.is_some() {
        return Err(bv_core::Error::Storage("Scratch article survived deletion".to_string()));
    }
    info!("🏦 Storage backend healthy (using {})", storage_type);
    Ok(())
}

async fn check_storage_with_retry(
    storage: &Arc<dyn ArticleStorage>,
    storage_type: StorageKind,
    max_retries: u32,
    timeout: Duration,
) -> Result<()> {
    let mut last_error = None;
    for attempt in 1..=max_retries.max(1) {
        match tokio::time::timeout(timeout, check_storage(storage, storage_type)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = Some(e),
            Err(elapsed) => {
                last_error = Some(bv_core::Error::Storage(format!(
                    "Storage health check timed out: {}",
                    elapsed
                )))
            }
        }
        if attempt < max_retries {
            warn!("Storage health check failed, retrying {}/{}...", attempt, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
    Err(last_error.unwrap_or_else(|| {
        bv_core::Error::Storage("Storage health check failed after all retries".to_string())
    }))
}

fn embedder(cli: &Cli, semantic: bool) -> Result<Option<Arc<dyn InferenceModel>>> {
    if !semantic {
        return Ok(None);
    }
    let model = bv_inference::create_model(&cli.inference_config())?;
    info!("🧠 Semantic search enabled (using {})", model.name());
    Ok(Some(model))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let storage = bv_storage::create_storage(cli.storage, cli.database_url.as_deref())
        .await
        .with_context(|| format!("failed to open {} storage", cli.storage))?;

    match &cli.command {
        Commands::Check => {
            info!("💾 Checking storage connection...");
            check_storage_with_retry(&storage, cli.storage, 3, Duration::from_secs(10)).await?;
        }
        Commands::Serve {
            host,
            port,
            prefix,
            semantic,
        } => {
            let mut state = AppState::new(storage.clone());
            if let Some(model) = embedder(&cli, *semantic)? {
                state = state.with_embedder(model);
            }
            let config = ServerConfig {
                host: host.clone(),
                port: *port,
                prefix: prefix.clone(),
            };
            bv_web::serve(state, &config).await?;
        }
        Commands::Search {
            query,
            limit,
            semantic,
        } => {
            let mut search = HybridSearch::new(storage.clone());
            if let Some(model) = embedder(&cli, *semantic)? {
                search = search.with_embedder(model);
            }
            let results = search.search(query, *limit).await?;
            if results.is_empty() {
                println!("No articles match '{}'", query);
            }
            for result in results {
                println!(
                    "{:>2}. {} [{}] ({:?})\n    {}",
                    result.rank, result.title, result.article_id, result.matched_by, result.summary
                );
            }
        }
        Commands::Scrape(args) => {
            // Only generation talks to the model; listing and scraping work without a key.
            let inference = match args.command {
                ScraperCommands::Generate { .. } => cli.inference_config(),
                _ => Config::dummy(),
            };
            let model = bv_inference::create_model(&inference)?;
            info!("🧠 Inference model ready (using {})", model.name());

            let scraper = Arc::new(WebScraper::with_defaults(&cli.scraper_config())?);
            info!("🦗 Sources: {}", scraper.list_sources().join(", "));

            let pipeline = Pipeline::new(
                scraper,
                ArticleGenerator::new(model.clone(), &inference),
                storage.clone(),
            )
            .with_embeddings(EmbeddingGenerator::new(model));
            handle_command(args.clone(), &pipeline).await?;
        }
    }

    Ok(())
}
