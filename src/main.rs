use clap::Parser;
use cv_intake::config::IntakeConfig;
use cv_intake::infrastructure::{dispatcher, storage};
use cv_intake::{AppState, create_app};
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "CV ingestion server", long_about = None)]
struct Args {
    /// Address to bind the API server to
    #[arg(long, default_value = "127.0.0.1")]
    host: std::net::IpAddr,

    /// Port for the API server
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cv_intake=info,worker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting CV intake server...");

    // 2. Infrastructure
    let config = IntakeConfig::from_env();
    info!(
        "🛡️  Upload policy: PDF/DOCX only, Max Size={}MB",
        config.max_file_size / 1024 / 1024
    );

    let storage_service = storage::setup_storage(&config).await?;
    let dispatcher_service = dispatcher::setup_dispatcher(&config);

    let state = AppState {
        storage: storage_service,
        dispatcher: dispatcher_service,
        config,
    };

    // 3. API Server
    let app = create_app(state);
    let addr = SocketAddr::new(args.host, args.port);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            error!("❌ Port {} is already in use.", args.port);
            error!(
                "Free it or pick another with --port. To find the process: lsof -i :{}",
                args.port
            );
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    info!("✅ Server running on http://{}", addr);
    info!("📖 Swagger UI documentation: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dispatched workers run in their own process groups and outlive this point
    info!("👋 Server exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
