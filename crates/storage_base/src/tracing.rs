use crate::error::{StorageError, StorageResult};
pub use tracing::instrument;
pub use tracing::{debug, error, info, trace, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "STORAGE_LOG";

pub fn init_tracing() -> StorageResult<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| {
            Box::new(StorageError::configuration(format!(
                "failed to install tracing subscriber: {}",
                e
            )))
        })
}
