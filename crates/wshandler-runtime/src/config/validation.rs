//! Configuration validation utilities.

use wshandler_core::{DispatchConfig, Level};

use super::error::{ConfigError, ConfigResult};
use super::schema::{HubConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HubConfig) -> ConfigResult<()> {
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_dispatch_config(config: &DispatchConfig) -> ConfigResult<()> {
    if let Err(err) = Level::parse(&config.log_level) {
        return Err(ConfigError::validation(format!(
            "dispatch.log_level: {err}. Valid values are: {:?}",
            Level::ALL.map(|level| level.as_str())
        )));
    }

    if config.step_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "dispatch.step_timeout_ms must be greater than 0",
        ));
    }

    if config.pipeline_buffer == 0 {
        return Err(ConfigError::validation(
            "dispatch.pipeline_buffer must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> ConfigResult<()> {
    if config.output == LogOutput::File && config.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(target) = config.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "logging.filters contains an empty target: {target:?}"
        )));
    }

    Ok(())
}
