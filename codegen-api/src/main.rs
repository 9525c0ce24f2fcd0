use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use codegen_api::config::ApiConfig;
use codegen_api::helpers::agents::build_app_state;
use codegen_api::state::join_sweepers;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override [server].host
    #[arg(long)]
    host: Option<String>,

    /// Override [server].port
    #[arg(long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (mut config, config_path) = ApiConfig::load(args.config.as_deref())?;
    info!("Loaded config from {}", config_path.display());

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = web::Data::new(build_app_state(&config)?);

    let shutdown = CancellationToken::new();
    let sweepers = if config.sessions.eviction_enabled() {
        state.spawn_sweepers(config.sessions.sweep_interval(), &shutdown)
    } else {
        Vec::new()
    };

    let allowed_origins = config
        .cors
        .as_ref()
        .map(|cors| cors.allowed_origins.clone())
        .unwrap_or_default();

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting codegen-api server at http://{}", bind_addr);

    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(codegen_api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    shutdown.cancel();
    join_sweepers(sweepers).await;
    Ok(())
}
