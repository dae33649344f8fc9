use std::io::IsTerminal;

use health_common::backend::BackendConfig;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// Endpoint addresses live in [`BackendConfig`]; this struct adds what the
/// front end itself needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential forwarded with analysis, chat and reset requests.
    pub api_key: String,
    /// Emit ANSI styling when rendering segments.
    pub color: bool,
    pub backend: BackendConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `HEALTH_API_KEY`: credential for the analysis and chat services
    ///
    /// Optional:
    /// - `HEALTH_ASSISTANT_COLOR`: `0`/`false`/`off` disables styling
    ///   (defaults to on when stdout is a terminal)
    /// - the endpoint variables read by [`BackendConfig::from_env`]
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("HEALTH_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("HEALTH_API_KEY environment variable is required".to_string())
            })?;

        let color = match std::env::var("HEALTH_ASSISTANT_COLOR") {
            Ok(value) => parse_flag(&value).ok_or_else(|| {
                AppError::Config(format!("HEALTH_ASSISTANT_COLOR has invalid value {value:?}"))
            })?,
            Err(_) => std::io::stdout().is_terminal(),
        };

        Ok(Self {
            api_key,
            color,
            backend: BackendConfig::from_env(),
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
