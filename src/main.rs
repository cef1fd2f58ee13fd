use anyhow::{Context, Result};
use axum::Router;
use std::{fs, io::ErrorKind, path::Path};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod session;
mod state;

use config::Command;
use models::transformation::{PREVIEW_BOX, TransformationChain};
use services::media_service::MediaService;
use session::orchestrator::{DeleteEndpointClient, Orchestrator};
use session::state::ViewState;
use session::store::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Environment + logging setup ---
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + command ---
    let (cfg, command) = config::AppConfig::from_env_and_args()?;

    match command {
        Command::Serve => serve(cfg).await,
        command => run_client(cfg, command).await,
    }
}

/// Run the HTTP API server.
async fn serve(cfg: config::AppConfig) -> Result<()> {
    tracing::info!("Starting imageflux with config: {:?}", cfg);

    // --- Ensure state directory exists ---
    if !Path::new(&cfg.state_dir).exists() {
        fs::create_dir_all(&cfg.state_dir)?;
        tracing::info!("Created state directory at {}", cfg.state_dir);
    }

    // --- Initialize media host client ---
    let api_key = cfg
        .api_key
        .clone()
        .context("CLOUDINARY_API_KEY must be set to serve")?;
    let api_secret = cfg
        .api_secret
        .clone()
        .context("CLOUDINARY_API_SECRET must be set to serve")?;
    let media = MediaService::new(
        reqwest::Client::new(),
        cfg.api_base.clone(),
        cfg.cloud_name.clone(),
        api_key,
        api_secret,
    );

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state::AppState {
        media,
        state_dir: cfg.state_dir.clone().into(),
    });

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run one client-side operation against the stored page state.
async fn run_client(cfg: config::AppConfig, command: Command) -> Result<()> {
    let chain = TransformationChain::new(PREVIEW_BOX, cfg.effects.clone());
    let remover = DeleteEndpointClient::new(reqwest::Client::new(), cfg.base_url.clone());
    let mut orch = Orchestrator::new(
        SessionStore::new(&cfg.state_dir),
        remover,
        cfg.delivery_base.clone(),
        cfg.cloud_name.clone(),
        chain,
        cfg.fallback,
    );

    // Rehydrate first: every command starts from what the page would show.
    orch.restore().await?;

    match command {
        Command::Serve => unreachable!("serve is dispatched before client commands"),
        Command::Record { secure_url } => {
            orch.upload_succeeded(secure_url).await?;
            print_state(orch.state());
        }
        Command::Show => print_state(orch.state()),
        Command::Remove => {
            orch.remove().await?;
            if matches!(orch.state(), ViewState::Empty) {
                println!("asset removed");
            } else {
                println!("removal did not complete; state kept (see logs)");
            }
        }
        Command::Download { output } => {
            orch.download(Path::new(&output)).await?;
            println!("saved enhanced image to {}", output);
        }
    }

    Ok(())
}

fn print_state(state: &ViewState) {
    match state {
        ViewState::Empty => println!("no image uploaded"),
        ViewState::Deriving { original } => {
            println!("original: {}", original);
            println!("enhanced: (pending)");
        }
        ViewState::Ready { original, enhanced } => {
            println!("original: {}", original);
            match enhanced {
                Some(url) => println!("enhanced: {}", url),
                None => println!("enhanced: (unavailable)"),
            }
        }
    }
}
