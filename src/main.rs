//! lexilens CLI
//!
//! Thin stand-in for the HTTP layer: runs one analysis against the
//! configured model service and prints the JSON envelope to stdout. Logs go
//! to stderr so the envelope stays pipeable.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use lexilens::config::Config;
use lexilens::glossary::fallback::PageKind;
use lexilens::pipeline::{Analyzer, DEFAULT_MAX_ENTRIES};
use lexilens::prompt::PageContext;

#[derive(Parser, Debug)]
#[command(
    name = "lexilens",
    about = "Resilient AI glossary extraction for illustrated reading pages",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a glossary for one book page
    Analyze {
        /// URL of the page image
        #[arg(long)]
        image_url: String,

        /// Inline page text
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,

        /// Read page text from a file
        #[arg(long)]
        text_file: Option<PathBuf>,

        #[arg(long, default_value = "Untitled")]
        title: String,

        /// Book difficulty level shown to the model
        #[arg(long, default_value = "beginner")]
        difficulty: String,

        #[arg(long, default_value_t = 5)]
        age_min: u32,

        #[arg(long, default_value_t = 9)]
        age_max: u32,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES)]
        max_entries: usize,
    },
    /// Describe the page image in learner-friendly language
    Describe {
        /// URL of the page image
        #[arg(long)]
        image_url: String,

        #[arg(long, default_value = "Untitled")]
        title: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 5)]
        age_min: u32,

        #[arg(long, default_value_t = 9)]
        age_max: u32,

        /// Page kind for the offline fallback: cover, story, educational
        #[arg(long)]
        kind: Option<String>,
    },
    /// Store the model API key in the config file
    Setup {
        #[arg(long)]
        api_key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexilens=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Analyze {
            image_url,
            text,
            text_file,
            title,
            difficulty,
            age_min,
            age_max,
            page,
            max_entries,
        } => {
            let text_content = match (text, text_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => String::new(),
            };
            let page = PageContext {
                title,
                difficulty_level: difficulty,
                target_age_min: age_min,
                target_age_max: age_max,
                page_number: page,
                image_url,
                text_content,
            };
            let analyzer = Analyzer::new(Config::load());
            let result = analyzer.extract_glossary(&page, max_entries).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Describe {
            image_url,
            title,
            page,
            age_min,
            age_max,
            kind,
        } => {
            let page = PageContext {
                title,
                difficulty_level: String::new(),
                target_age_min: age_min,
                target_age_max: age_max,
                page_number: page,
                image_url,
                text_content: String::new(),
            };
            let kind = kind.as_deref().and_then(PageKind::from_loose);
            let analyzer = Analyzer::new(Config::load());
            let result = analyzer.describe_image(&page, kind).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Setup { api_key } => {
            let mut config = Config::load();
            config.api_key = Some(api_key);
            config.save()?;
            println!("API key saved to {}", Config::config_location());
        }
    }
    Ok(())
}
