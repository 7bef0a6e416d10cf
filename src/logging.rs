use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is true but LOKI_URL is not set")]
    MissingLokiUrl,
    #[error("invalid LOKI_URL: {0}")]
    InvalidLokiUrl(String),
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Where log events end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Console,
    /// Console plus a Loki push endpoint.
    Loki(String),
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub sink: LogSink,
    pub service_name: String,
    pub environment: String,
    pub filter: String,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki_enabled = lookup("LOKI_ENABLED")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let sink = match (loki_enabled, lookup("LOKI_URL")) {
            (true, Some(url)) => LogSink::Loki(url),
            (true, None) => return Err(LoggingError::MissingLokiUrl),
            (false, _) => LogSink::Console,
        };

        Ok(Self {
            sink,
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "tagfolio".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    match &config.sink {
        #[cfg(feature = "loki")]
        LogSink::Loki(url) => init_with_loki(&config, url),
        #[cfg(not(feature = "loki"))]
        LogSink::Loki(_) => {
            init_console(&config)?;
            tracing::warn!("Built without the loki feature, logging to console only");
            Ok(())
        }
        LogSink::Console => init_console(&config),
    }
}

fn init_console(config: &LoggingConfig) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!(
        "📊 Logging to console (service={}, env={})",
        config.service_name,
        config.environment
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, loki_url: &str) -> Result<(), LoggingError> {
    let url = url::Url::parse(loki_url).map_err(|e| LoggingError::InvalidLokiUrl(e.to_string()))?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .and_then(|b| b.label("environment", &config.environment))
        .and_then(|b| b.build_url(url))
        .map_err(|e| LoggingError::InvalidLokiUrl(e.to_string()))?;

    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.filter))
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!("✅ Shipping logs to Loki at {}", loki_url);
    Ok(())
}
