use std::str::FromStr;

use tracing::Level;

use crate::config::LoggingConfig;
use crate::error::{SdkError, SdkResult};

/// Install a fmt subscriber at the configured level.
///
/// A second call, or a call after the host installed its own subscriber,
/// leaves the existing subscriber in place.
pub fn init(config: &LoggingConfig) -> SdkResult<()> {
    let level = Level::from_str(config.level.trim())
        .map_err(|_| SdkError::InvalidLogLevel(config.level.clone()))?;
    if tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
