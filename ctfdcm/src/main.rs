use ctfdcm::CtfdcmProvider;
use std::env;
use std::path::PathBuf;
use tfplug::ServerConfig;

const LOG_ENV: &str = "CTFDCM_LOG";
const TLS_CERT_ENV: &str = "CTFDCM_TLS_CERT";
const TLS_KEY_ENV: &str = "CTFDCM_TLS_KEY";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ServerConfig::new();
    match (env::var_os(TLS_CERT_ENV), env::var_os(TLS_KEY_ENV)) {
        (Some(cert), Some(key)) => {
            config = config.with_tls(PathBuf::from(cert), PathBuf::from(key));
        }
        (None, None) => {}
        _ => tracing::warn!(
            "Both {} and {} are needed to serve over TLS, serving plaintext",
            TLS_CERT_ENV,
            TLS_KEY_ENV
        ),
    }

    tfplug::serve(CtfdcmProvider::new(), config).await?;

    Ok(())
}
