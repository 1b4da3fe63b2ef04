use corretor_ai::api;
use corretor_ai::commands::CommandHandler;
use corretor_ai::config::AppConfig;
use corretor_ai::database::{Database, VectorDB};
use corretor_ai::ocr::VisionOcr;
use corretor_ai::providers::deepseek::deepseek::DeepSeekProvider;
use corretor_ai::providers::gemini::gemini::GeminiProvider;
use corretor_ai::providers::openai::openai::OpenAIProvider;
use corretor_ai::providers::traits::CompletionProvider;
use corretor_ai::rag::RagEngine;

use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the HTTP API server instead of the interactive console
    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "3000")]
    port: u16,

    /// Grading provider for the console: gemini, openai or deepseek
    #[arg(long)]
    provider: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    if args.api {
        run_api_server(args).await
    } else {
        run_cli_mode(&args).await
    }
}

struct Services {
    gemini: GeminiProvider,
    ocr: VisionOcr,
    db: Database,
    rag: RagEngine,
    config: AppConfig,
}

/// Wires up everything both modes need: providers, OCR, SQLite and the
/// Qdrant-backed RAG engine.
async fn init_services() -> Result<Services, Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::from_env();

    let gemini = GeminiProvider::from_env()?;
    let ocr = VisionOcr::from_env()?;

    let db = Database::new(&config.sqlite_path).await?;
    let vector_db = VectorDB::new(&config.qdrant_url).await?;

    // Embeddings must stay consistent with the stored vectors, so the RAG
    // engine is pinned to Gemini regardless of the grading provider.
    let rag = RagEngine::new(gemini.clone_box(), vector_db, &config).await?;

    Ok(Services {
        gemini,
        ocr,
        db,
        rag,
        config,
    })
}

async fn run_api_server(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;

    println!("Starting API server on {}", addr);

    let services = init_services().await?;

    let app = api::create_api(
        services.gemini,
        services.ocr,
        services.db,
        services.rag,
        &services.config,
    );

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    println!("Server successfully bound to {}", addr);
    println!("Ready to accept connections!");

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}

async fn run_cli_mode(args: &Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let services = init_services().await?;

    let provider = select_cli_provider(args.provider.as_deref(), &services.gemini)?;

    println!("{}", "📝 Corretor de Redação + Tutor RAG".bold());
    println!(
        "Modelo de correção: {}",
        provider.model_info().await.unwrap_or_default().cyan()
    );

    let mut command_handler = CommandHandler::new(
        provider,
        services.ocr,
        Arc::new(services.rag),
        Arc::new(services.db),
        &services.config,
    );

    // Show the help menu on entry.
    command_handler.handle_command("ajuda").await.ok();

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let input = line.trim();
                rl.add_history_entry(input)?;

                if let Err(e) = command_handler.handle_command(input).await {
                    println!("{}", e.red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

fn select_cli_provider(
    name: Option<&str>,
    gemini: &GeminiProvider,
) -> Result<Box<dyn CompletionProvider + Send + Sync>, String> {
    match name.unwrap_or("gemini").to_lowercase().as_str() {
        "gemini" => Ok(gemini.clone_box()),
        "openai" => {
            let key = env::var("OPENAI_API_KEY")
                .map_err(|_| "OPENAI_API_KEY not set".to_string())?;
            Ok(Box::new(OpenAIProvider::new(key)))
        }
        "deepseek" => {
            let key = env::var("DEEPSEEK_API_KEY")
                .map_err(|_| "DEEPSEEK_API_KEY not set".to_string())?;
            Ok(Box::new(DeepSeekProvider::new(key)))
        }
        other => Err(format!(
            "Unknown provider: {}. Available providers: gemini, openai, deepseek",
            other
        )),
    }
}
