use mock_server::{MockConfig, MockState, SEND_PATH};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let secret = std::env::var("ROBOT_SECRET").ok().filter(|s| !s.is_empty());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(signed = secret.is_some(), "listening on http://{addr}{SEND_PATH}");

    let state = MockState::new(MockConfig {
        secret,
        ..MockConfig::default()
    });
    mock_server::run(listener, state).await
}
