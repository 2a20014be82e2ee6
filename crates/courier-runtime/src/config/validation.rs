//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, DispatchConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_dispatch_config(config: &DispatchConfig) -> ConfigResult<()> {
    if config.poll_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Poll timeout must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> ConfigResult<()> {
    if config.output == LogOutput::File && config.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if config.max_files == 0 {
        return Err(ConfigError::validation("max_files must be at least 1"));
    }

    for target in config.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid filter target: {target:?}"
            )));
        }
    }

    Ok(())
}
