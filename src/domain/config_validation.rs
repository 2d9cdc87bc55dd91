//! Configuration validation.
//!
//! Checks every key the binary reads before an oracle or store is built.

use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_oracle_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_api_keys(config)?;
    validate_cooldown(config)?;
    validate_timeout(config)?;
    validate_base_url(config)?;
    Ok(())
}

pub fn validate_storage_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("storage", "root") {
        Some(root) if root.trim().is_empty() => Err(TraderError::ConfigInvalid {
            section: "storage".to_string(),
            key: "root".to_string(),
            reason: "root must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_api_keys(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_list("oracle", "api_keys").is_empty() {
        return Err(TraderError::ConfigMissing {
            section: "oracle".to_string(),
            key: "api_keys".to_string(),
        });
    }
    Ok(())
}

/// An absent key is fine (its default applies); a present one must be an
/// integer of at least `min`.
fn validate_integer(config: &dyn ConfigPort, key: &str, min: i64) -> Result<(), TraderError> {
    let Some(raw) = config.get_string("oracle", key) else {
        return Ok(());
    };
    let invalid = |reason: String| TraderError::ConfigInvalid {
        section: "oracle".to_string(),
        key: key.to_string(),
        reason,
    };
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(format!("'{}' is not an integer", raw)))?;
    if value < min {
        return Err(invalid(format!("{} must be at least {}", key, min)));
    }
    Ok(())
}

fn validate_cooldown(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_integer(config, "cooldown_secs", 0)
}

fn validate_timeout(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_integer(config, "timeout_secs", 1)
}

fn validate_base_url(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("oracle", "base_url") {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            Err(TraderError::ConfigInvalid {
                section: "oracle".to_string(),
                key: "base_url".to_string(),
                reason: "base_url must be an http(s) URL".to_string(),
            })
        }
        _ => Ok(()),
    }
}
