use bv_core::{Error, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};
use crate::manager::Pipeline;

/// Interval such as `30m`, `1d` or `1h15m30s`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_number = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| "Invalid number in duration".to_string())?;
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|seconds| total_seconds.checked_add(seconds))
                    .ok_or_else(|| format!("Duration too long: {}", s))?;
                current_number.clear();
                has_number = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            let seconds = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(seconds)
                .ok_or_else(|| format!("Duration too long: {}", s))?;
            has_number = true;
        }

        if !has_number {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// List registered content sources
    Sources,
    /// Scrape a topic and print what was found, without generating anything
    Scrape {
        topic: String,
        /// Sources to use (default: all), e.g. --source wikipedia,archive_org
        #[arg(long = "source", value_delimiter = ',')]
        sources: Vec<String>,
        #[arg(long, default_value_t = 3)]
        max_pages: usize,
        #[arg(long)]
        respect_robots: bool,
    },
    /// Scrape, generate, validate and store an article for a topic
    Generate {
        topic: String,
        /// Publication date (YYYY-MM-DD), today in UTC by default
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Make it the daily article for its date
        #[arg(long)]
        featured: bool,
        /// Rerun periodically (e.g. 1h, 30m, 1d)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
}

pub async fn handle_command(args: ScraperArgs, pipeline: &Pipeline) -> Result<()> {
    match args.command {
        ScraperCommands::Sources => {
            println!("Available sources:");
            for name in pipeline.scraper().list_sources() {
                println!("  {}", name);
            }
        }
        ScraperCommands::Scrape {
            topic,
            sources,
            max_pages,
            respect_robots,
        } => {
            let selected = (!sources.is_empty()).then_some(sources.as_slice());
            let contents = pipeline
                .scraper()
                .scrape_all(&topic, max_pages, respect_robots, false, selected)
                .await?;
            if contents.is_empty() {
                return Err(Error::Scraping(format!("No content found for '{}'", topic)));
            }
            for content in &contents {
                println!(
                    "📄 [{}] {} - {} ({} words, {} images)",
                    content.source_name(),
                    content.title,
                    content.source_url,
                    content.raw_text.split_whitespace().count(),
                    content.images.len()
                );
            }
        }
        ScraperCommands::Generate {
            topic,
            date,
            featured,
            interval: Some(interval),
        } => {
            info!("Running in periodic mode every {}s", interval.0.as_secs());
            loop {
                if let Err(e) = generate(pipeline, &topic, date, featured).await {
                    error!("Generation cycle failed: {}", e);
                }
                info!("Waiting {}s before the next cycle", interval.0.as_secs());
                tokio::time::sleep(interval.0).await;
            }
        }
        ScraperCommands::Generate {
            topic,
            date,
            featured,
            interval: None,
        } => {
            generate(pipeline, &topic, date, featured).await?;
        }
    }
    Ok(())
}

async fn generate(pipeline: &Pipeline, topic: &str, date: Option<NaiveDate>, featured: bool) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let report = pipeline.run(topic, date, featured).await?;
    println!(
        "🆕 {} - {} ({} words, {} min read, {} sources{})",
        report.article_id,
        report.title,
        report.word_count,
        report.reading_time_minutes,
        report.sources_used,
        if report.featured { ", featured" } else { "" }
    );
    Ok(())
}
