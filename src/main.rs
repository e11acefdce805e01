use anyhow::Context;
use clap::Parser;
use paypal_withdrawals::api::{create_router, AppState};
use paypal_withdrawals::auth::{AdminKey, JwtVerifier};
use paypal_withdrawals::config::{load_config, LoggingConfig, Secrets};
use paypal_withdrawals::db::{DBClient, PgWithdrawalStore, WithdrawalStore};
use paypal_withdrawals::payout::PayPalClient;
use paypal_withdrawals::service::{WithdrawalPolicy, WithdrawalService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "paypal-withdrawals", about = "Withdrawal requests with admin-approved PayPal payouts")]
struct Cli {
    /// Optional TOML config file; environment variables override it
    #[arg(short, long, env = "WITHDRAWALS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    init_tracing(&config.logging);
    info!("Starting withdrawal service");

    // Refuse to run with missing secrets instead of falling back to defaults
    let secrets = Secrets::from_env().context("required secret missing")?;

    let db = DBClient::connect(&secrets.database_url, config.database.max_connections).await?;
    info!("Running database migrations");
    db.run_migrations().await?;

    let store: Arc<dyn WithdrawalStore> = Arc::new(PgWithdrawalStore::new(db.pool.clone()));
    let gateway = Arc::new(PayPalClient::from_config(&config.paypal)?);
    let service = WithdrawalService::new(
        store.clone(),
        gateway,
        WithdrawalPolicy::from(&config.withdrawals),
    );

    let state = Arc::new(AppState {
        service,
        verifier: Arc::new(JwtVerifier::new(&secrets.jwt_secret)),
        admin_key: AdminKey::new(secrets.admin_api_key.clone()),
    });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down withdrawal service");
        })
        .await?;

    store.close().await;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
