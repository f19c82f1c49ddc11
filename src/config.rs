use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MagikError, Result};
use crate::transport::DEFAULT_USER_AGENT;

/// Values shipped in `magik.toml.example`. A consumer still holding any of
/// them was never registered.
pub const PLACEHOLDERS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub consumer: ConsumerSection,
    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConsumerSection {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientSection {
    pub user_agent: Option<String>,
}

/// OAuth consumer and access token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl Credentials {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_secret: access_secret.into(),
        }
    }

    fn values(&self) -> [&str; 4] {
        [
            self.consumer_key.as_str(),
            self.consumer_secret.as_str(),
            self.access_token.as_str(),
            self.access_secret.as_str(),
        ]
    }

    pub fn has_placeholder(&self) -> bool {
        self.values().iter().any(|v| PLACEHOLDERS.contains(v))
    }

    pub fn validate(&self) -> Result<()> {
        if self.has_placeholder() {
            return Err(MagikError::PlaceholderCredentials);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load the first config file found. An explicit path must exist;
    /// otherwise a missing file yields an empty config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        for path in config_paths() {
            if path.exists() {
                return Self::from_path(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MagikError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| MagikError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    /// Resolve credentials, letting `env` override the file values.
    pub fn credentials_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let c = &self.consumer;
        let fields = [
            ("consumer_key", "MAGIK_CONSUMER_KEY", &c.consumer_key),
            ("consumer_secret", "MAGIK_CONSUMER_SECRET", &c.consumer_secret),
            ("access_token", "MAGIK_ACCESS_TOKEN", &c.access_token),
            ("access_secret", "MAGIK_ACCESS_SECRET", &c.access_secret),
        ];

        let mut values = Vec::with_capacity(fields.len());
        let mut missing = Vec::new();
        for (name, var, from_file) in fields {
            match env(var).or_else(|| from_file.clone()).filter(|v| !v.is_empty()) {
                Some(value) => values.push(value),
                None => missing.push(name),
            }
        }

        if !missing.is_empty() {
            return Err(MagikError::NotConfigured {
                missing: missing.join(", "),
            });
        }

        let [consumer_key, consumer_secret, access_token, access_secret]: [String; 4] = values
            .try_into()
            .map_err(|_| MagikError::NotConfigured { missing: "consumer".to_string() })?;
        let credentials = Credentials::new(consumer_key, consumer_secret, access_token, access_secret);
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn user_agent(&self) -> String {
        std::env::var("MAGIK_USER_AGENT")
            .ok()
            .or_else(|| self.client.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".magik.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("magik").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".magik.toml"));
    }

    paths
}
