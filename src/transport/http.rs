use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use super::oauth::{self, Nonce};
use super::{Mode, Transport};
use crate::config::Credentials;
use crate::error::{MagikError, Result};
use crate::request::Params;

pub const DEFAULT_USER_AGENT: &str =
    concat!("magik/", env!("CARGO_PKG_VERSION"), " (steward moderation client)");

/// Blocking reqwest client that signs requests with the user's OAuth consumer.
pub struct HttpTransport {
    client: Client,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(credentials: Credentials, user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client, credentials })
    }

    fn sign(&self, builder: RequestBuilder, method: &str, url: &str, params: &Params) -> RequestBuilder {
        let header = oauth::authorization_header(
            &self.credentials,
            method,
            url,
            params.as_pairs(),
            &Nonce::generate(),
        );
        builder.header(AUTHORIZATION, header)
    }
}

impl Transport for HttpTransport {
    fn send(&self, url: &str, params: &Params, mode: Mode) -> Result<Value> {
        let pairs = params.as_pairs();
        let (method, builder) = match mode {
            Mode::Post => ("POST", self.client.post(url).form(pairs)),
            Mode::AuthenticatedGet | Mode::AnonymousGet => ("GET", self.client.get(url).query(pairs)),
        };
        let request = if mode.is_signed() {
            self.sign(builder, method, url, params)
        } else {
            builder
        };

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MagikError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}
