use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Worker pools are not empty
/// - Timeouts are not 0
/// - At least one view is rendered per object
/// - Checkpoint interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.manifest.checkpoint_every == 0 {
        return Err(ConfigError::ValidationError(
            "manifest.checkpoint_every cannot be 0".to_string(),
        ));
    }

    if config.download.workers == 0 {
        return Err(ConfigError::ValidationError(
            "download.workers cannot be 0".to_string(),
        ));
    }

    if config.download.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "download.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.render.workers == 0 {
        return Err(ConfigError::ValidationError(
            "render.workers cannot be 0".to_string(),
        ));
    }

    if config.render.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "render.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.render.view_count == 0 {
        return Err(ConfigError::ValidationError(
            "render.view_count cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = Config::default();
        config.render.workers = 0;
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.download.timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_zero_views_fails() {
        let mut config = Config::default();
        config.render.view_count = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_checkpoint_fails() {
        let mut config = Config::default();
        config.manifest.checkpoint_every = 0;
        assert!(validate_config(&config).is_err());
    }
}
