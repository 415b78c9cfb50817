use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use techtalk_analysis::{ContentClassifier, FetchSettings, UrlAnalyzer};
use techtalk_common::observability::{LogConfig, LogFormat, init_logging};
use techtalk_config::{TechTalkConfig, TechTalkConfigLoader};
use techtalk_llm::build_llm_client;
use techtalk_mail::DigestService;
use techtalk_runtime::Scheduler;
use techtalk_server::jobs::register_jobs;
use techtalk_server::{AppState, build_app};
use techtalk_store::PostStore;

const DEFAULT_CONFIG_FILE: &str = "techtalk.yaml";

/// Tech Talk board API server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// YAML config file. Without it `techtalk.yaml` is used when present.
    #[arg(long, env = "TECHTALK_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let loader = match &cli.config {
        Some(path) => TechTalkConfigLoader::new().with_file(path),
        None => TechTalkConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg: TechTalkConfig = loader.load().context("failed to load configuration")?;

    // 2) Logging
    let format: LogFormat = cfg
        .logging
        .format
        .parse()
        .map_err(anyhow::Error::msg)?;
    let log_path = init_logging(LogConfig {
        app_name: "techtalk",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(log_path = %log_path.display(), "server.logging.ready");

    // 3) Services
    let store = PostStore::connect(&cfg.database.url)
        .await
        .with_context(|| format!("failed to open database {}", cfg.database.url))?;

    let (analyzer, classifier) = match build_llm_client(&cfg.llm) {
        Ok(llm) => {
            let analyzer = UrlAnalyzer::new(llm.clone(), FetchSettings::from(&cfg.fetch))?;
            (Some(analyzer), Some(ContentClassifier::new(llm)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "server.llm.disabled");
            (None, None)
        }
    };

    let digest = Arc::new(DigestService::from_config(store.clone(), cfg.email.clone())?);
    if !digest.is_configured() {
        tracing::warn!("server.email.not_configured");
    }

    let scheduler = Arc::new(Scheduler::new());
    register_jobs(&scheduler, digest.clone(), &cfg.scheduler)?;
    if cfg.scheduler.enabled {
        scheduler.start();
    }

    let state = AppState {
        store,
        analyzer,
        classifier,
        digest,
        scheduler: scheduler.clone(),
    };
    let app = build_app(state, &cfg.server.cors_origins);

    // 4) Serve until ctrl-c
    let bind = cli.bind.unwrap_or(cfg.server.bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(%bind, "server.listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    tracing::info!("server.stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "server.signal.failed");
    }
}
