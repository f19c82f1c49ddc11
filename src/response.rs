use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::command::{Action, Command, Family};
use crate::reason;

const GLOBAL_ALREADY_BLOCKED: &str = "globalblocking-block-alreadyblocked";

/// The documented shapes of an Action API reply to a mutating call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    BlockSuccess {
        user: String,
        expiry: String,
        reason: String,
    },
    UnblockSuccess {
        user: String,
        reason: String,
    },
    GlobalBlockSuccess {
        user: String,
        expiry: Option<String>,
    },
    GlobalUnblockSuccess {
        user: String,
    },
    AccountStatusSuccess {
        user: String,
    },
    ApiError(ApiError),
    /// A body that matches none of the above. Kept verbatim for display.
    Unrecognized(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiError {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub info: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub project: Option<String>,
    /// Global blocking reports its failures as a list of messages.
    #[serde(default, deserialize_with = "lenient")]
    pub globalblock: Vec<GlobalBlockFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlobalBlockFailure {
    #[serde(default, deserialize_with = "lenient")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(default, deserialize_with = "lenient")]
    user: String,
    #[serde(default, deserialize_with = "lenient")]
    expiry: String,
    #[serde(default, deserialize_with = "lenient")]
    reason: String,
}

#[derive(Deserialize)]
struct RawGlobalBlock {
    #[serde(default, deserialize_with = "lenient")]
    user: String,
    #[serde(default, deserialize_with = "lenient")]
    expiry: Option<String>,
    #[serde(default)]
    unblocked: Option<Value>,
}

/// A null or mistyped field reads as absent instead of rejecting the reply.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode the object under `key`, if there is one.
fn section<T: DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    value.get(key).and_then(|v| T::deserialize(v).ok())
}

impl ApiResponse {
    /// Decode a reply. Never fails: unknown shapes become `Unrecognized`.
    pub fn decode(value: Value) -> Self {
        if let Some(error) = value.get("error") {
            let error = ApiError::deserialize(error).unwrap_or_else(|_| ApiError {
                info: Some(error.to_string()),
                ..ApiError::default()
            });
            return ApiResponse::ApiError(error);
        }
        if let Some(b) = section::<RawBlock>(&value, "block") {
            return ApiResponse::BlockSuccess {
                user: b.user,
                expiry: b.expiry,
                reason: b.reason,
            };
        }
        if let Some(b) = section::<RawBlock>(&value, "unblock") {
            return ApiResponse::UnblockSuccess {
                user: b.user,
                reason: b.reason,
            };
        }
        if let Some(g) = section::<RawGlobalBlock>(&value, "globalblock") {
            return match (g.expiry, g.unblocked) {
                (Some(expiry), _) => ApiResponse::GlobalBlockSuccess {
                    user: g.user,
                    expiry: Some(expiry),
                },
                (None, Some(_)) => ApiResponse::GlobalUnblockSuccess { user: g.user },
                (None, None) => ApiResponse::GlobalBlockSuccess {
                    user: g.user,
                    expiry: None,
                },
            };
        }
        if let Some(s) = section::<RawBlock>(&value, "setglobalaccountstatus") {
            return ApiResponse::AccountStatusSuccess { user: s.user };
        }

        ApiResponse::Unrecognized(value)
    }

    /// The server rejected the token; a fresh one may succeed.
    pub fn is_stale_token(&self) -> bool {
        matches!(self, ApiResponse::ApiError(e) if e.code.as_deref() == Some("badtoken"))
    }
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
    /// Dry run: the request that would have been sent.
    Preview(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(m) | Outcome::Failure(m) | Outcome::Preview(m) => m,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Render a decoded reply for the user.
pub fn interpret(response: &ApiResponse, command: &Command) -> Outcome {
    match response {
        ApiResponse::BlockSuccess { user, expiry, reason } => Outcome::Success(format!(
            "{user} was blocked until {expiry} with reason: {reason}"
        )),
        ApiResponse::UnblockSuccess { user, reason } => Outcome::Success(format!(
            "{user} was unblocked with reason: {}",
            reason::expand(reason)
        )),
        ApiResponse::GlobalBlockSuccess {
            expiry: Some(expiry),
            ..
        } => {
            let text = if command.is_modify() {
                format!("Global block was modified! New expiry: {expiry}")
            } else if command.flags.anononly {
                format!("Anon-only global block succeeded. Expiry: {expiry}")
            } else {
                format!("Global block succeeded. Expiry: {expiry}")
            };
            Outcome::Success(text)
        }
        ApiResponse::GlobalBlockSuccess { user, expiry: None } => {
            Outcome::Success(format!("Global block of {} succeeded.", or_target(user)))
        }
        ApiResponse::GlobalUnblockSuccess { user } => {
            Outcome::Success(format!("{} was globally unblocked.", or_target(user)))
        }
        ApiResponse::AccountStatusSuccess { user } => {
            let verb = if command.action == Action::Unlock { "unlocked" } else { "locked" };
            Outcome::Success(format!("{} {verb}.", or_target(user)))
        }
        ApiResponse::ApiError(error) => Outcome::Failure(describe_error(error, command)),
        ApiResponse::Unrecognized(value) => Outcome::Failure(format!("Unexpected response: {value}")),
    }
}

fn or_target(user: &str) -> &str {
    if user.is_empty() {
        "The account"
    } else {
        user
    }
}

fn describe_error(error: &ApiError, command: &Command) -> String {
    if let Some(failure) = error.globalblock.first() {
        return if failure.code == GLOBAL_ALREADY_BLOCKED {
            "The target is already blocked.".to_string()
        } else {
            let message = failure.message.as_deref().unwrap_or(&failure.code);
            format!("Block failed! {message}")
        };
    }

    let code = error.code.as_deref().unwrap_or("unknown");
    let info = error.info.as_deref().unwrap_or_default();
    match code {
        "badtoken" => "Received CSRF token error. Try again...".to_string(),
        "alreadyblocked" => {
            format!("{info} Use reblock or --force to change the current block.")
                .trim_start()
                .to_string()
        }
        "permissiondenied" => {
            let project = error
                .project
                .as_deref()
                .or(match command.action.family() {
                    Family::Local => command.project.as_deref(),
                    _ => None,
                })
                .unwrap_or("meta");
            format!("Received permission denied error. Are you a sysop on {project}?")
        }
        "invalidexpiry" => "The expiration time isn't valid. I understand things like \
             31hours, 1week, 6months, infinite, indefinite."
            .to_string(),
        _ => format!("Unhandled error: {code} {info}").trim_end().to_string(),
    }
}
