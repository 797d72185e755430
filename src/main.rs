use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, info};

use manqa::{
    load_config, load_manual_page, JsonlVectorIndex, OpenAiClient, QaConfig, QaService,
};

#[derive(Parser)]
#[command(name = "manqa", version, about = "Ask questions about a man page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question by prompting with the entire manual page
    Ask {
        /// The question to ask about the documented tool
        question: String,
    },
    /// Answer a question using chunks retrieved from the vector index,
    /// building the index first if it does not exist yet
    Rag {
        /// The question to ask about the documented tool
        question: String,
    },
    /// Rebuild the vector index from the manual page
    Index,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger to write to stderr so stdout stays clean for answers
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();
    let config = load_config()?;
    debug!("Loaded config: {:?}", config);

    match cli.command {
        Commands::Ask { question } => {
            let service = build_service(&config, index_for_build(&config))?;
            let document = load_manual_page(&config.document.path)?;
            let answer = service.answer_full_document(&document, &question).await?;
            println!("{}", answer);
        }
        Commands::Rag { question } => {
            let index_path = &config.retrieval.index_path;
            if JsonlVectorIndex::exists(index_path) {
                info!("Loading existing vector index from {:?}", index_path);
                let index = JsonlVectorIndex::load(
                    index_path.clone(),
                    config.openai.embedding_dimensions,
                )?;
                let service = build_service(&config, index)?;
                let answer = service.answer_with_retrieval(&question).await?;
                println!("{}", answer);
            } else {
                info!("No vector index at {:?}, building one", index_path);
                let service = build_service(&config, index_for_build(&config))?;
                let document = load_manual_page(&config.document.path)?;
                let count = service.index_document(&document).await?;
                info!("Saved vector index with {} chunks", count);
                let answer = service.answer_with_retrieval(&question).await?;
                println!("{}", answer);
            }
        }
        Commands::Index => {
            let index = index_for_build(&config);
            index.clear()?;
            let service = build_service(&config, index)?;
            let document = load_manual_page(&config.document.path)?;
            let count = service.index_document(&document).await?;
            println!(
                "Indexed {} chunks into {:?}",
                count, config.retrieval.index_path
            );
        }
    }

    Ok(())
}

fn index_for_build(config: &QaConfig) -> JsonlVectorIndex {
    JsonlVectorIndex::create(
        config.retrieval.index_path.clone(),
        config.openai.embedding_dimensions,
    )
}

fn build_service(config: &QaConfig, index: JsonlVectorIndex) -> Result<QaService> {
    let client = Arc::new(OpenAiClient::from_env(&config.openai)?);
    Ok(QaService::new(
        client.clone(),
        client,
        Arc::new(index),
        config.clone(),
    ))
}
