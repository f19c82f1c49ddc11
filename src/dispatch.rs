use crate::command::{Command, Family};
use crate::error::{MagikError, Result};
use crate::project::{self, Endpoint};
use crate::reason;
use crate::request;
use crate::response::{interpret, ApiResponse, Outcome};
use crate::status;
use crate::token::{self, Token, TokenType};
use crate::transport::{Mode, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: String,
    pub outcome: Outcome,
}

/// Per-target results of one invocation, in the order the targets were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub targets: Vec<TargetReport>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.targets.iter().filter(|t| t.outcome.is_failure()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

pub struct Dispatcher<T> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Run `command` once per target. A failing target is recorded and the
    /// next one still runs; only an invalid command fails the whole call.
    pub fn run(&self, command: &Command) -> Result<Report> {
        run_each(command, |target| self.run_target(command, target))
    }

    fn run_target(&self, command: &Command, target: &str) -> Result<Outcome> {
        match command.action.family() {
            Family::Test => Ok(echo(command, target)),
            Family::Mass => Err(MagikError::MassUnsupported),
            Family::Local | Family::Global | Family::Lock => self.mutate(command, target),
        }
    }

    fn mutate(&self, command: &Command, target: &str) -> Result<Outcome> {
        let (endpoint, token_type) = route(command)?;

        if command.flags.test {
            let preview = request::build(command, target, &endpoint, &Token::dry_run());
            return Ok(Outcome::Preview(preview.render()));
        }

        let mut retried = false;
        loop {
            let token = token::fetch(&self.transport, &endpoint, token_type)?;
            let request = request::build(command, target, &endpoint, &token);
            let body = self
                .transport
                .send(request.endpoint.as_str(), &request.params, Mode::Post)?;
            let response = ApiResponse::decode(body);

            if response.is_stale_token() && !retried {
                status!("Token for {} was rejected, retrying once with a fresh one...", target);
                retried = true;
                continue;
            }
            return Ok(interpret(&response, command));
        }
    }
}

fn run_each(command: &Command, mut op: impl FnMut(&str) -> Result<Outcome>) -> Result<Report> {
    command.validate()?;

    let targets = command
        .targets
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|target| {
            let outcome = op(target.as_str()).unwrap_or_else(|e| Outcome::Failure(e.to_string()));
            TargetReport {
                target: target.clone(),
                outcome,
            }
        })
        .collect();

    Ok(Report { targets })
}

/// Run an action that never touches the network (`test`) without a transport.
pub fn run_offline(command: &Command) -> Result<Report> {
    if command.action.family() != Family::Test {
        return Err(MagikError::WrongFamily {
            action: command.action.to_string(),
            expected: "an offline action",
        });
    }
    run_each(command, |target| Ok(echo(command, target)))
}

/// Endpoint and token type for a mutating action.
pub fn route(command: &Command) -> Result<(Endpoint, TokenType)> {
    match command.action.family() {
        Family::Local => {
            let code = command.project.as_deref().unwrap_or_default();
            Ok((project::resolve(code)?, TokenType::Csrf))
        }
        Family::Global => Ok((Endpoint::meta(), TokenType::Csrf)),
        Family::Lock => Ok((Endpoint::meta(), TokenType::SetGlobalAccountStatus)),
        Family::Test | Family::Mass => Err(MagikError::WrongFamily {
            action: command.action.to_string(),
            expected: "a mutating action",
        }),
    }
}

/// `test` action: list each comma-separated nick with the reason it would get.
pub fn echo(command: &Command, target: &str) -> Outcome {
    let reason = reason::expand(command.reason_text());
    let lines: Vec<String> = target
        .split(',')
        .map(str::trim)
        .filter(|nick| !nick.is_empty())
        .map(|nick| format!("{nick}: {reason}"))
        .collect();
    Outcome::Success(lines.join("\n"))
}
