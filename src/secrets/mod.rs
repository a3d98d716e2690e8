//! Credential loading as an injected capability. Consumers ask for a key;
//! where the value lives (environment, TOML secrets file) is decided once at
//! startup and never leaks into the components that use the secrets.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::SecretError;

pub trait SecretProvider: Send + Sync {
    fn get(&self, key: &str) -> Result<String, SecretError>;
}

/// Reads secrets from environment variables: key `sms_gateway_url` with
/// prefix `SMOKEWATCH` becomes `SMOKEWATCH_SMS_GATEWAY_URL`.
pub struct EnvSecrets {
    prefix: String,
}

impl EnvSecrets {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key.to_uppercase())
    }
}

impl SecretProvider for EnvSecrets {
    fn get(&self, key: &str) -> Result<String, SecretError> {
        std::env::var(self.var_name(key)).map_err(|_| SecretError::NotFound {
            key: key.to_string(),
        })
    }
}

/// Loads a flat TOML secrets file (the `.env.toml` shape) once at startup.
pub struct FileSecrets {
    values: HashMap<String, String>,
}

impl FileSecrets {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SecretError> {
        let path = path.as_ref();
        let load_err = |message: String| SecretError::Load {
            path: path.display().to_string(),
            message,
        };
        let values = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| load_err(e.to_string()))?
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| load_err(e.to_string()))?;
        Ok(Self { values })
    }

    pub fn from_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl SecretProvider for FileSecrets {
    fn get(&self, key: &str) -> Result<String, SecretError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                key: key.to_string(),
            })
    }
}
