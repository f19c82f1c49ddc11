use std::fmt;

use serde_json::Value;

use crate::error::{MagikError, Result};
use crate::project::Endpoint;
use crate::request::Params;
use crate::transport::{Mode, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Csrf,
    SetGlobalAccountStatus,
}

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Csrf => "csrf",
            TokenType::SetGlobalAccountStatus => "setglobalaccountstatus",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-use token for one endpoint. Never reused across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Stand-in shown in dry-run output, where no token is fetched.
    pub fn dry_run() -> Self {
        Self("<token>".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn query_params(token_type: TokenType) -> Params {
    Params::from([
        ("action", "query"),
        ("meta", "tokens"),
        ("format", "json"),
        ("type", token_type.as_str()),
    ])
}

/// Ask `endpoint` for a fresh token of `token_type`.
pub fn fetch<T: Transport + ?Sized>(transport: &T, endpoint: &Endpoint, token_type: TokenType) -> Result<Token> {
    crate::status!("Fetching {} token from {}...", token_type, endpoint);
    let response = transport.send(endpoint.as_str(), &query_params(token_type), Mode::AuthenticatedGet)?;
    extract(&response, token_type)
}

pub fn extract(response: &Value, token_type: TokenType) -> Result<Token> {
    if let Some(error) = response.get("error") {
        let text = |key: &str| error.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        let detail = match (text("code"), text("info")) {
            (code, info) if code.is_empty() => info,
            (code, info) if info.is_empty() => code,
            (code, info) => format!("{code}: {info}"),
        };
        return Err(MagikError::Token {
            token_type: token_type.to_string(),
            detail,
        });
    }

    let key = format!("{}token", token_type.as_str());
    response
        .pointer(&format!("/query/tokens/{key}"))
        .and_then(Value::as_str)
        .map(Token::new)
        .ok_or_else(|| MagikError::MalformedResponse(format!("no {key} in token response: {response}")))
}
