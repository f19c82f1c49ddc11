use std::fmt;
use std::str::FromStr;

use crate::error::{MagikError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Block,
    Unblock,
    Reblock,
    GBlock,
    UnGBlock,
    ReGBlock,
    Lock,
    Unlock,
    Test,
    /// Bulk targets from a file. Recognised but not supported.
    Mass,
}

/// Which API family an action talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Local,
    Global,
    Lock,
    Test,
    Mass,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Block,
        Action::Unblock,
        Action::Reblock,
        Action::GBlock,
        Action::UnGBlock,
        Action::ReGBlock,
        Action::Lock,
        Action::Unlock,
        Action::Test,
        Action::Mass,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Block => "block",
            Action::Unblock => "unblock",
            Action::Reblock => "reblock",
            Action::GBlock => "gblock",
            Action::UnGBlock => "ungblock",
            Action::ReGBlock => "regblock",
            Action::Lock => "lock",
            Action::Unlock => "unlock",
            Action::Test => "test",
            Action::Mass => "mass",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Action::Block | Action::Unblock | Action::Reblock => Family::Local,
            Action::GBlock | Action::UnGBlock | Action::ReGBlock => Family::Global,
            Action::Lock | Action::Unlock => Family::Lock,
            Action::Test => Family::Test,
            Action::Mass => Family::Mass,
        }
    }

    /// Actions that place or change a block and therefore carry an expiry.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            Action::Block | Action::Reblock | Action::GBlock | Action::ReGBlock
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = MagikError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_lowercase();
        Action::ALL
            .into_iter()
            .find(|a| a.name() == lowered)
            .ok_or_else(|| MagikError::UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub force: bool,
    pub softblock: bool,
    pub revoketpa: bool,
    pub allowcreate: bool,
    pub anononly: bool,
    pub test: bool,
    pub hide: bool,
    pub suppress: bool,
}

/// How far a locked account is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hidden {
    Lists,
    Suppressed,
}

impl Hidden {
    pub fn as_str(self) -> &'static str {
        match self {
            Hidden::Lists => "lists",
            Hidden::Suppressed => "suppressed",
        }
    }
}

impl Flags {
    /// Suppression is the stronger of the two and wins when both are given.
    pub fn hidden(&self) -> Option<Hidden> {
        if self.suppress {
            Some(Hidden::Suppressed)
        } else if self.hide {
            Some(Hidden::Lists)
        } else {
            None
        }
    }
}

/// A validated request from the user. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub targets: Vec<String>,
    pub project: Option<String>,
    pub duration: Option<String>,
    pub reason: Option<String>,
    pub flags: Flags,
}

impl Command {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            targets: Vec::new(),
            project: None,
            duration: None,
            reason: None,
            flags: Flags::default(),
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = normalize_duration(self.action, &[duration.into()]);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// `reblock`/`regblock` always amend; plain blocks amend with `--force`.
    pub fn is_modify(&self) -> bool {
        matches!(self.action, Action::Reblock | Action::ReGBlock) || self.flags.force
    }

    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }

    pub fn duration_text(&self) -> &str {
        self.duration.as_deref().unwrap_or_default()
    }

    /// Check that every field the action's family needs is present.
    pub fn validate(&self) -> Result<()> {
        let (family, required, needs_project, needs_duration, needs_reason) =
            match self.action.family() {
                Family::Mass => return Err(MagikError::MassUnsupported),
                Family::Test => ("Tests", "target", false, false, false),
                Family::Local if self.action.is_blocking() => (
                    "Blocks",
                    "target, reason, project, and duration",
                    true,
                    true,
                    true,
                ),
                Family::Local => ("Unblocks", "target, reason, and project", true, false, true),
                Family::Global if self.action.is_blocking() => (
                    "Global blocks",
                    "target, reason, and duration",
                    false,
                    true,
                    true,
                ),
                Family::Global => ("Global unblocks", "target and reason", false, false, true),
                Family::Lock => ("Locks", "target and reason", false, false, true),
            };

        let mut missing = Vec::new();
        if self.targets.iter().all(|t| t.trim().is_empty()) {
            missing.push("target");
        }
        if needs_project && is_blank(&self.project) {
            missing.push("project");
        }
        if needs_duration && is_blank(&self.duration) {
            missing.push("duration");
        }
        if needs_reason && is_blank(&self.reason) {
            missing.push("reason");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MagikError::MissingFields {
                family,
                required,
                missing: missing.join(", "),
            })
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Join the duration words the way they were typed (`31 hours` → `31hours`).
/// A `forever` anywhere in a blocking action's duration means `indefinite`;
/// unblocking actions carry no duration at all.
pub fn normalize_duration(action: Action, words: &[String]) -> Option<String> {
    if !action.is_blocking() || words.is_empty() {
        return None;
    }
    if words.iter().any(|w| w == "forever") {
        return Some("indefinite".to_string());
    }
    Some(words.concat())
}

/// Multi-word targets are joined with underscores (`John Doe` → `John_Doe`).
pub fn join_target(words: &[String]) -> String {
    words.join("_")
}

pub fn join_reason(words: &[String]) -> Option<String> {
    (!words.is_empty()).then(|| words.join(" "))
}
