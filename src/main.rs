use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diagnostic_advisor::{
    cli::{Cli, ConsolePrompter},
    config::{Config, LogFormat},
    diagnostics::{Callbacks, DiagnosticEngine},
    knowledge::KnowledgeBase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Diagnostic advisor starting..."
    );

    let Some(path) = cli
        .knowledge_base
        .clone()
        .or_else(|| config.knowledge_base_path.clone())
    else {
        eprintln!("No knowledge base given: pass --knowledge-base or set KNOWLEDGE_BASE_PATH");
        std::process::exit(2);
    };

    let knowledge = match KnowledgeBase::load(&path) {
        Ok(kb) => {
            info!(path = %path.display(), "Knowledge base loaded");
            kb
        }
        Err(e) => {
            error!(error = %e, path = %path.display(), "Failed to load knowledge base");
            return Err(e.into());
        }
    };

    let prompter = Arc::new(ConsolePrompter::new());
    let mut engine = DiagnosticEngine::new(config.engine.clone());
    engine.initialize(knowledge, Callbacks::new(prompter.clone(), prompter))?;

    for (fact_id, answer) in &cli.answers {
        engine.set_fact(fact_id, answer.to_value())?;
    }

    let outcome = match engine.run(cli.symptoms.as_slice(), cli.system_types.as_slice()).await {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "Diagnosis failed");
            return Err(e.into());
        }
    };

    if outcome.is_empty() {
        info!("No applicable solution or root cause found");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
