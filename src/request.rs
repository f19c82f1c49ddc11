use std::fmt;

use comfy_table::{presets::UTF8_FULL, Table};

use crate::command::{Action, Command, Family};
use crate::project::Endpoint;
use crate::reason;
use crate::token::Token;

/// Ordered API parameters. Flags are present with an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value in place.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
        self
    }

    pub fn flag(&mut self, key: &str) -> &mut Self {
        self.set(key, "")
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Params {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut params = Params::new();
        for (k, v) in pairs {
            params.set(k, v);
        }
        params
    }
}

/// One mutating call, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub params: Params,
}

impl Request {
    /// Endpoint on one line, then the parameters as a table.
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Parameter", "Value"]);
        for (k, v) in self.params.iter() {
            table.add_row(vec![k, v]);
        }
        format!("{}\n{table}", self.endpoint)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Build the parameter set for one target. Pure: nothing is sent here.
pub fn build(command: &Command, target: &str, endpoint: &Endpoint, token: &Token) -> Request {
    let params = match command.action.family() {
        Family::Local if command.action == Action::Unblock => unblock(command, target, token),
        Family::Local => block(command, target, token),
        Family::Global if command.action == Action::UnGBlock => global_unblock(command, target, token),
        Family::Global => global_block(command, target, token),
        Family::Lock => account_status(command, target, token),
        Family::Test | Family::Mass => Params::new(),
    };

    Request {
        endpoint: endpoint.clone(),
        params,
    }
}

fn block(command: &Command, target: &str, token: &Token) -> Params {
    let mut p = Params::new();
    p.set("action", "block")
        .set("user", target)
        .set("expiry", command.duration_text())
        .set("reason", reason::expand(command.reason_text()))
        .set("token", token.as_str())
        .flag("allowusertalk")
        .flag("nocreate")
        .flag("autoblock")
        .set("format", "json");

    if command.is_modify() {
        p.flag("reblock");
    }
    if command.flags.softblock {
        p.remove("autoblock");
    }
    if command.flags.revoketpa {
        p.remove("allowusertalk");
    }
    if command.flags.allowcreate {
        p.remove("nocreate");
    }
    p
}

fn unblock(command: &Command, target: &str, token: &Token) -> Params {
    let mut p = Params::new();
    p.set("action", "unblock")
        .set("user", target)
        .set("reason", reason::expand(command.reason_text()))
        .set("token", token.as_str())
        .set("format", "json");
    p
}

fn global_block(command: &Command, target: &str, token: &Token) -> Params {
    let mut p = Params::new();
    p.set("action", "globalblock")
        .set("target", target)
        .set("expiry", command.duration_text())
        .set("reason", reason::expand(command.reason_text()))
        .set("alsolocal", "true")
        .set("token", token.as_str())
        .set("format", "json");

    if command.flags.anononly {
        p.set("anononly", "true").set("localanononly", "true");
    }
    if command.is_modify() {
        p.set("modify", "true");
    }
    p
}

fn global_unblock(command: &Command, target: &str, token: &Token) -> Params {
    let mut p = Params::new();
    p.set("action", "globalblock")
        .set("target", target)
        .set("token", token.as_str())
        .set("reason", reason::expand(command.reason_text()))
        .flag("unblock")
        .set("format", "json");
    p
}

fn account_status(command: &Command, target: &str, token: &Token) -> Params {
    let mut p = Params::new();
    p.set("action", "setglobalaccountstatus")
        .set("user", target)
        .set("locked", command.action.name())
        .set("reason", reason::expand(command.reason_text()))
        .set("token", token.as_str())
        .set("format", "json");

    if command.action == Action::Lock {
        if let Some(hidden) = command.flags.hidden() {
            p.set("hidden", hidden.as_str());
        }
    }
    p
}
