//! Admin web server for the BargainB WhatsApp assistant.

use admin_web::auth::AuthClient;
use admin_web::config::Config;
use admin_web::state::AppState;
use database::Database;
use langgraph::LangGraphClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wasender::WaSenderClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting admin web server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let auth = AuthClient::new(&config.auth_url, &config.auth_anon_key)?;

    // External integrations are optional
    let wasender = match WaSenderClient::from_env() {
        Ok(client) => Some(client),
        Err(err) => {
            warn!(error = %err, "WASender disabled");
            None
        }
    };
    let agent = match LangGraphClient::from_env() {
        Ok(client) => Some(client),
        Err(err) => {
            warn!(error = %err, "AI agent disabled");
            None
        }
    };

    let addr = config.addr;
    let state = AppState::new(db, auth, wasender, agent, config);
    let app = admin_web::app(state);

    // Start server
    info!(%addr, "Admin web server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
