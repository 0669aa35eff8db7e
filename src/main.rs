use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;
use genai_bots::api::{self, AppState};
use genai_bots::commands;
use genai_bots::config::AppConfig;
use genai_bots::employees::generator::{DEFAULT_RECORDS, MAX_RECORDS, MIN_RECORDS};
use genai_bots::llm::SessionStore;
use genai_bots::RecordCount;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with the HR policy bot
    Chat,
    /// Extract invoice fields from PDF files
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Generate synthetic employee records as CSV
    Generate {
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_RECORDS,
            value_parser = clap::value_parser!(u32).range(MIN_RECORDS as i64..=MAX_RECORDS as i64)
        )]
        count: u32,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add PDF, text or markdown files to the HR policy index
    Index {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::from_env();

    match args.command {
        Command::Chat => {
            let chain = commands::build_chatbot(&config).await?;
            commands::chat::run(chain).await
        }
        Command::Extract { files, json } => {
            let extractor = commands::build_invoice_extractor(&config)?;
            commands::invoice::run(&extractor, &files, json).await
        }
        Command::Generate { count, output } => {
            let generator = commands::build_employee_generator(&config)?;
            let output = output.unwrap_or_else(|| config.employee_csv_path.clone());
            commands::employees::run(&generator, RecordCount::try_from(count)?, &output).await
        }
        Command::Index { files } => commands::index::run(&config, &files).await,
        Command::Serve { port } => run_api_server(&config, port).await,
    }
}

async fn run_api_server(config: &AppConfig, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let chatbot = match commands::build_chatbot(config).await {
        Ok(chain) => Some(Arc::new(chain)),
        Err(e) => {
            log::warn!("HR chatbot disabled: {:#}", e);
            None
        }
    };
    let invoices = match commands::build_invoice_extractor(config) {
        Ok(extractor) => Some(Arc::new(extractor)),
        Err(e) => {
            log::warn!("Invoice extraction disabled: {:#}", e);
            None
        }
    };
    let employees = match commands::build_employee_generator(config) {
        Ok(generator) => Some(Arc::new(generator)),
        Err(e) => {
            log::warn!("Employee data generation disabled: {:#}", e);
            None
        }
    };

    let state = AppState {
        chatbot,
        invoices,
        employees,
        sessions: SessionStore::new(),
        employee_csv_path: config.employee_csv_path.clone(),
    };
    let app = api::create_api(state);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;
    println!("Server listening on {}", addr.to_string().bright_green());

    axum::serve(listener, app).await?;
    Ok(())
}
