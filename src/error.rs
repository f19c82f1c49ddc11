use std::path::PathBuf;

use thiserror::Error;

pub const REGISTRATION_URL: &str = "https://meta.wikimedia.org/wiki/Special:OAuthConsumerRegistration";

#[derive(Error, Debug)]
pub enum MagikError {
    #[error("You are not currently configured: missing {missing}. Copy magik.toml.example to ~/.magik.toml and fill in your consumer.")]
    NotConfigured { missing: String },

    #[error("It seems like maybe you haven't configured your consumer information. See {url}", url = REGISTRATION_URL)]
    PlaceholderCredentials,

    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I don't know how to '{0}'")]
    UnknownAction(String),

    #[error("'{action}' is not {expected}")]
    WrongFamily {
        action: String,
        expected: &'static str,
    },

    #[error("Mass actions are not supported yet. Use one target at a time (repeat -t for several).")]
    MassUnsupported,

    #[error("{family} require {required}. Missing: {missing}")]
    MissingFields {
        family: &'static str,
        required: &'static str,
        missing: String,
    },

    #[error("Error processing {0}. Try things like 'enwiki' or 'meta'.")]
    UnresolvableProject(String),

    #[error("Could not get a {token_type} token: {detail}")]
    Token { token_type: String, detail: String },

    #[error("Unexpected API response: {0}")]
    MalformedResponse(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} answered HTTP {status}")]
    HttpStatus { status: u16, url: String },

    #[error("Response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MagikError>;
