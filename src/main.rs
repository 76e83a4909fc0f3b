use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use agri_advisor::advisor::AdvisorBot;
use agri_advisor::config;
use agri_advisor::intent::{self, QueryClassifier};
use agri_advisor::logging;
use agri_advisor::pipeline::PipelineClient;
use agri_advisor::repl;
use agri_advisor::sql_cli;
use agri_advisor::store::Database;

#[derive(Parser)]
#[command(name = "agri-advisor", version)]
#[command(about = "Agricultural advisory chatbot — intent routing, mandi prices, weather-aware advice")]
struct Cli {
    /// Preseed the session city
    #[arg(long, global = true)]
    city: Option<String>,

    /// Preseed the session crop
    #[arg(long, global = true)]
    crop: Option<String>,

    /// Response language (default English)
    #[arg(long, global = true)]
    language: Option<String>,

    /// Override the database path
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive advisor chat (default)
    Chat,

    /// Ask a single question (non-interactive)
    Ask { question: String },

    /// Classify a query without answering it
    Classify {
        text: String,
        /// Show per-category fallback scores and the pipeline result
        #[arg(long)]
        details: bool,
    },

    /// One-shot CSV import into the local store (wholesale replace)
    ImportData {
        /// Mandi price CSV (data.gov.in export)
        #[arg(long)]
        prices: Option<PathBuf>,
        /// Soil health CSV
        #[arg(long)]
        soil: Option<PathBuf>,
    },

    /// Interactive SQLite REPL over the local store
    Sql,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let Cli { city, crop, language, db, command } = Cli::parse();

    let mut cfg = config::load_config().unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        config::default_config()
    });
    if let Some(db) = &db {
        cfg.database.path = db.clone();
    }

    match command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let mut bot = AdvisorBot::new(&cfg)?;
            preseed_session(&mut bot, &city, &crop, &language);
            repl::run_chat(&mut bot).await?;
        }

        Command::Ask { question } => {
            let mut bot = AdvisorBot::new(&cfg)?;
            preseed_session(&mut bot, &city, &crop, &language);
            println!("🌾 Query: {}", question);
            let response = bot.process_query(&question).await;
            println!("🤖 Advisor: {}", response);
        }

        Command::Classify { text, details } => {
            let pipeline = cfg
                .pipeline
                .base_url
                .as_ref()
                .filter(|u| !u.is_empty())
                .map(|u| PipelineClient::new(u));
            let classifier = QueryClassifier::new(pipeline);

            let routed = classifier.classify(&text).await;
            println!("Intent: {} ({})", routed, routed.label());

            if details {
                println!("\nKeyword fallback scores (priority order):");
                for (category, score) in intent::keyword_scores(&text) {
                    println!("  {:<12} {}", category.as_str(), score);
                }
                if let Some(pipeline) = classifier.pipeline() {
                    match pipeline.classify(&text).await {
                        Ok(result) => {
                            println!(
                                "\nPipeline: {} (confidence {:.3}, language {})",
                                result.primary_intent,
                                result.confidence,
                                result.language.as_deref().unwrap_or("unknown"),
                            );
                        }
                        Err(e) => println!("\nPipeline: unavailable ({})", e),
                    }
                }
            }
        }

        Command::ImportData { prices, soil } => {
            if prices.is_none() && soil.is_none() {
                anyhow::bail!("nothing to import — pass --prices and/or --soil");
            }
            let mut db = Database::open(&cfg.database.path)?;
            if let Some(path) = prices {
                let count = db.import_prices_csv(&path)?;
                println!("✅ Imported {} mandi price rows from {}", count, path.display());
            }
            if let Some(path) = soil {
                let count = db.import_soil_csv(&path)?;
                println!("✅ Imported {} soil health rows from {}", count, path.display());
            }
        }

        Command::Sql => {
            let db = Database::open(&cfg.database.path)?;
            sql_cli::run_sql_repl(&db)?;
        }
    }

    Ok(())
}

fn preseed_session(
    bot: &mut AdvisorBot,
    city: &Option<String>,
    crop: &Option<String>,
    language: &Option<String>,
) {
    if let Some(city) = city {
        println!("{}", bot.session.set_city(city));
    }
    if let Some(crop) = crop {
        println!("{}", bot.session.set_crop(crop));
    }
    if let Some(language) = language {
        println!("{}", bot.session.set_language(language));
    }
}
