//! ragbot: chat with the contents of a JSON record source.
//!
//! Usage: ragbot --source-url https://example.com/wp-json/wp/v2/posts --text-field content.rendered

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ragbot_retrieval::{
    EmbeddingProviderType, GeneratorType, HttpSource, IngestionPipeline, RagConfig, RagEngine,
    Session, shared_store,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Retrieval-augmented chat over a JSON record source
#[derive(Parser, Debug)]
#[command(name = "ragbot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// URL returning JSON records (overrides config file)
    #[arg(long = "source-url", value_name = "URL", env = "RAGBOT_SOURCE_URL")]
    source_url: Option<String>,

    /// Dotted path of the text field in each record (overrides config file)
    #[arg(long = "text-field", value_name = "FIELD")]
    text_field: Option<String>,

    /// Passages retrieved per question (overrides config file)
    #[arg(long = "top-k", value_name = "K")]
    top_k: Option<NonZeroUsize>,

    /// Use local hashing embeddings and extractive answers, no API calls
    #[arg(long = "offline")]
    offline: bool,
}

impl Cli {
    fn apply(&self, config: &mut RagConfig) {
        if let Some(url) = &self.source_url {
            config.source.url = Some(url.clone());
        }
        if let Some(field) = &self.text_field {
            config.source.text_field = field.clone();
        }
        if let Some(top_k) = self.top_k {
            config.query.top_k = top_k.get();
        }

        let has_key = std::env::var_os("OPENAI_API_KEY").is_some();
        if !self.offline && has_key {
            return;
        }
        if !self.offline {
            warn!("OPENAI_API_KEY is not set, running offline");
        }
        if config.embedding.provider == EmbeddingProviderType::OpenAI {
            config.embedding.provider = EmbeddingProviderType::Hashing;
            config.embedding.model = None;
        }
        if config.generation.provider == GeneratorType::OpenAI {
            config.generation.provider = GeneratorType::Extractive;
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = RagConfig::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let url = config
        .source
        .url
        .clone()
        .context("no source URL: pass --source-url or set `url` under [source]")?;

    let embedder = config.embedding.build_provider();
    let generator = config.generation.build_generator();
    info!(
        "Using {} embeddings and {} generation",
        embedder.name(),
        generator.name()
    );

    let (index, passages) = shared_store();
    let mut pipeline = IngestionPipeline::new(
        Arc::new(HttpSource::new(url).with_text_field(&config.source.text_field)),
        embedder.clone(),
        index.clone(),
        passages.clone(),
    )
    .with_text_field(&config.source.text_field);
    if let Some(model) = &config.embedding.model {
        pipeline = pipeline.with_model(model);
    }
    let count = pipeline.run().await.context("ingestion failed")?;
    println!("Loaded {count} passages.");

    let mut engine = RagEngine::new(index, passages, embedder, generator)
        .with_query_config(config.query.clone());
    if let Some(model) = &config.embedding.model {
        engine = engine.with_model(model);
    }

    let mut session = Session::new(engine);
    let result = chat(&mut session).await;
    session.close();
    result
}

async fn chat(session: &mut Session) -> anyhow::Result<()> {
    println!("Chatbot: Hi! How can I assist you today?");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("User: ");
        std::io::stdout().flush()?;

        // EOF ends the chat like `exit`.
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.eq_ignore_ascii_case("history") {
            let chain = session.chain_of_thought();
            if chain.is_empty() {
                println!("No questions asked yet.");
            } else {
                print!("{chain}");
            }
            continue;
        }

        match session.ask(input).await {
            Ok(answer) => println!("Chatbot: {answer}"),
            Err(err) => println!("Chatbot: Sorry, I couldn't answer that ({err})."),
        }
    }

    Ok(())
}
