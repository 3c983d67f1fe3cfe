use anyhow::{Context, Result};
use caption_forge::{
    logging, server, CaptionOrchestrator, CaptionRequest, ChatCompletionClient, ConfigManager,
    HttpContextEnricher, SeedPool, Strategy,
};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Serve,
    /// Generate captions for stdin lines.
    Preview,
    /// Print prompts for stdin lines without calling the completion backend.
    Prompts,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = if args.iter().any(|arg| arg == "--prompts") {
        Mode::Prompts
    } else if args.iter().any(|arg| arg == "--preview") {
        Mode::Preview
    } else {
        Mode::Serve
    };

    let config_manager = ConfigManager::load()?;
    config_manager.start_watching();
    let config = config_manager.get();
    info!("✅ Configuration loaded");
    info!("   Bind address: {}", config.server.bind_addr);
    info!("   Data dir: {:?}", config.data_dir);
    info!("   Model: {}", config.completion.model);

    let orchestrator = Arc::new(build_orchestrator(config_manager)?);

    match mode {
        Mode::Serve => run_server(orchestrator, &config.server.bind_addr).await,
        Mode::Preview | Mode::Prompts => run_preview_mode(orchestrator, mode).await,
    }
}

fn build_orchestrator(config_manager: ConfigManager) -> Result<CaptionOrchestrator> {
    let config = config_manager.get();
    let seeds = SeedPool::load(&config.data_dir);
    let enricher = HttpContextEnricher::from_config(&config.context)?;
    let completion = ChatCompletionClient::from_config(&config.completion)?;

    Ok(CaptionOrchestrator::new(
        seeds,
        Arc::new(enricher),
        Arc::new(completion),
        config_manager,
    ))
}

async fn run_server(orchestrator: Arc<CaptionOrchestrator>, bind_addr: &str) -> Result<()> {
    info!("🚀 caption-forge starting up!");
    info!("{}", "=".repeat(50));

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    server::serve(listener, orchestrator, shutdown_signal()).await?;

    info!("🛑 Shutting down caption-forge...");
    info!("✅ Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                warn!("Failed to set up SIGTERM handler: {err}");
                let _ = signal::ctrl_c().await;
                info!("Received SIGINT (Ctrl+C)");
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received SIGINT (Ctrl+C)");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received SIGINT (Ctrl+C)");
    }
}

async fn run_preview_mode(orchestrator: Arc<CaptionOrchestrator>, mode: Mode) -> Result<()> {
    info!("🧪 Preview Mode - one request per line, Ctrl+D to quit");
    info!("{}", "=".repeat(50));
    info!("   Format: location | description [| baity|opinion|event]");

    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = reader.next_line() => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => preview_line(&orchestrator, &line, mode).await,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Error reading input: {}", e);
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("✅ Preview finished");
    Ok(())
}

async fn preview_line(orchestrator: &CaptionOrchestrator, line: &str, mode: Mode) {
    let mut parts = line.splitn(3, '|').map(str::trim);
    let request = CaptionRequest::new(
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
    );
    let forced = match parts.next().filter(|raw| !raw.is_empty()) {
        Some(raw) => match Strategy::parse(raw) {
            Some(strategy) => Some(strategy),
            None => {
                warn!("Unknown strategy '{raw}', picking one at random");
                None
            }
        },
        None => None,
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if mode == Mode::Prompts {
        let strategy = forced.unwrap_or(Strategy::Baity);
        table.set_header(vec![
            Cell::new("Strategy").add_attribute(Attribute::Bold),
            Cell::new("System").add_attribute(Attribute::Bold),
            Cell::new("User").add_attribute(Attribute::Bold),
        ]);
        match orchestrator.preview_prompt(&request, strategy).await {
            Ok(prompt) => {
                table.add_row(vec![
                    Cell::new(strategy),
                    Cell::new(prompt.system),
                    Cell::new(prompt.user),
                ]);
            }
            Err(err) => {
                warn!("Prompt preview failed: {err}");
                return;
            }
        }
    } else {
        table.set_header(vec![
            Cell::new("Location").add_attribute(Attribute::Bold),
            Cell::new("Persona").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Caption").add_attribute(Attribute::Bold),
        ]);
        let result = match forced {
            Some(strategy) => orchestrator.generate_with(&request, strategy).await,
            None => orchestrator.generate(&request).await,
        };
        match result {
            Ok(result) => {
                table.add_row(vec![
                    Cell::new(request.location.trim()),
                    Cell::new(request.description.trim()),
                    Cell::new(result.caption_type),
                    Cell::new(result.caption),
                ]);
            }
            Err(err) => {
                warn!("Caption generation failed: {err}");
                return;
            }
        }
    }

    println!("{table}");
}
