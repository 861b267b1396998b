use eyre::Result;

use crate::config::models::{ConfigMode, GatewayConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, Vec<ValidationError>>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required value: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid value for {field}: {message}")]
    InvalidField { field: &'static str, message: String },
}

/// Gateway configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Check the configuration and collect every problem found.
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        match config.erp_url.as_deref() {
            None => errors.push(ValidationError::MissingField { field: "ERP_URL" }),
            Some(url) => {
                if let Err(message) = Self::validate_upstream_url(url) {
                    errors.push(ValidationError::InvalidField {
                        field: "ERP_URL",
                        message,
                    });
                }
            }
        }

        if config.api_key.is_none() {
            errors.push(ValidationError::MissingField { field: "API_KEY" });
        }
        if config.api_secret.is_none() {
            errors.push(ValidationError::MissingField {
                field: "API_SECRET",
            });
        }

        if config.upstream_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "UPSTREAM_TIMEOUT_SECS",
                message: "must be greater than zero".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_upstream_url(url: &str) -> std::result::Result<(), String> {
        let parsed = url::Url::parse(url).map_err(|e| e.to_string())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme '{}'", parsed.scheme()));
        }
        if parsed.host_str().is_none() {
            return Err("missing host".to_string());
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err("must not carry a query or fragment".to_string());
        }
        Ok(())
    }

    /// Apply the configured startup policy. Strict mode turns any problem into
    /// a fatal error; permissive mode logs and carries on.
    pub fn enforce(config: &GatewayConfig) -> Result<()> {
        let Err(errors) = Self::validate(config) else {
            return Ok(());
        };

        match config.config_mode {
            ConfigMode::Strict => {
                for error in &errors {
                    tracing::error!("{}", error);
                }
                let summary = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(eyre::eyre!("Invalid gateway configuration: {summary}"))
            }
            ConfigMode::Permissive => {
                for error in &errors {
                    tracing::warn!("{} (permissive mode, starting anyway)", error);
                }
                Ok(())
            }
        }
    }
}
