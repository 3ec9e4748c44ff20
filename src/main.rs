//! Aisle CLI - schema-typed LLM flows for product support

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::Path;

use aisle::error::{AisleError, FixSuggestion};
use aisle::flow::{
    answer_question, assess_popularity, check_availability, AnswerQuestionInput,
    AssessPopularityInput, CheckAvailabilityInput, FlowRunner,
};
use aisle::provider::create_provider;
use aisle::{AisleConfig, EventLog};

#[derive(Parser)]
#[command(name = "aisle")]
#[command(about = "Aisle - schema-typed LLM flows for product support")]
#[command(version)]
struct Cli {
    /// Override default provider (claude, openai, ollama, mock)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Override default model
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "aisle.yaml")]
    config: String,

    /// Print the raw JSON result instead of formatted output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question about a product
    Ask {
        /// Product name
        #[arg(long)]
        product: String,

        /// The question to answer
        question: String,
    },

    /// Assess product popularity from recent purchase data
    Popularity {
        /// Product name
        #[arg(long)]
        product: String,

        /// Recent purchase data (timestamps, quantities)
        #[arg(long)]
        data: String,
    },

    /// Check product availability and restock estimate
    Availability {
        /// Product name
        #[arg(long)]
        product: String,
    },

    /// List providers and whether they are usable
    Providers,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AisleError> {
    if let Commands::Providers = cli.command {
        return list_providers();
    }

    let config = AisleConfig::load_or_default(Path::new(&cli.config))?;
    let provider = cli.provider.unwrap_or(config.provider);
    let model = cli.model.or(config.model);

    let runner = FlowRunner::new(&provider, model.as_deref(), EventLog::new());

    match cli.command {
        Commands::Ask { product, question } => {
            let output = answer_question(
                &runner,
                AnswerQuestionInput {
                    product_name: product,
                    question,
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{} {}", "Answer:".cyan().bold(), output.answer);
            }
        }

        Commands::Popularity { product, data } => {
            let output = assess_popularity(
                &runner,
                AssessPopularityInput {
                    product_name: product.clone(),
                    recent_purchase_data: data,
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!(
                    "{} {}/100",
                    format!("Popularity of {}:", product).cyan().bold(),
                    output.popularity_score
                );
                println!("{}", output.analysis);
            }
        }

        Commands::Availability { product } => {
            let output = check_availability(
                &runner,
                CheckAvailabilityInput {
                    product_name: product.clone(),
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                if output.is_available {
                    println!("{} {}", product.cyan().bold(), "In stock".green());
                } else {
                    println!("{} {}", product.cyan().bold(), "Out of stock".red());
                    match output.estimated_restock_date {
                        Some(date) => println!("  Estimated restock: {}", date),
                        None => println!("  No restock expected"),
                    }
                }
                if let Some(alternatives) = output.alternative_products {
                    if !alternatives.is_empty() {
                        println!("  Alternatives: {}", alternatives.join(", "));
                    }
                }
            }
        }

        Commands::Providers => unreachable!("handled above"),
    }

    Ok(())
}

fn list_providers() -> Result<(), AisleError> {
    for name in ["claude", "openai", "ollama", "mock"] {
        match create_provider(name) {
            Ok(provider) if provider.is_available() => {
                println!("{} {} ({})", "✓".green(), name, provider.default_model());
            }
            Ok(_) => {
                println!("{} {} (not available)", "✗".red(), name);
            }
            Err(e) => {
                println!("{} {} ({})", "✗".red(), name, e);
            }
        }
    }
    Ok(())
}
