use std::env;

use crate::error::{DirectoryError, Result};

/// Runtime settings, read from the environment (a `.env` file is loaded by
/// `main` before this runs).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Shared secret expected in the `X-API-Key` header.
    pub api_key: String,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("API_KEY")
            .map_err(|_| DirectoryError::Config("API_KEY environment variable not set".to_string()))?;

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| DirectoryError::Config(format!("Invalid PORT value '{raw}': {e}")))?,
            Err(_) => 8080,
        };

        Ok(Self { api_key, port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_config_error() {
        env::remove_var("API_KEY");
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));
    }
}
