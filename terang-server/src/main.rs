use std::sync::Arc;
use terang_backend::RestConnector;
use terang_config::{ConfigError, TerangConfig, load_dotenv};
use terang_log::LogConfig;
use terang_server::{AppState, Application};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();
    let _guard = LogConfig::from_env().init()?;

    let config = TerangConfig::load()?;
    if !config.backend.has_backend() {
        warn!("{}", ConfigError::BackendMissing);
    }

    let connector = Arc::new(RestConnector::new(config.backend.clone()));
    let state = AppState::new(connector).with_cookie_name(config.server.session_cookie.clone());
    let app = Application::new(state)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting terang");
    app.listen(&config.server.addr()).await?;
    info!("stopped");
    Ok(())
}
