use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::command::{join_reason, join_target, normalize_duration, Action, Command, Flags};
use crate::config::Config;
use crate::dispatch::{self, Dispatcher};
use crate::output;
use crate::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "magik")]
#[command(about = "Steward toolkit: (re/un)block, (re/un)gblock and (un)lock accounts over the MediaWiki API")]
#[command(version)]
pub struct Cli {
    /// What to do: block, unblock, reblock, gblock, ungblock, regblock, lock, unlock, test
    pub action: String,

    /// Target of the action. Repeat for several targets with the same settings
    #[arg(short, long, num_args = 1.., value_name = "TARGET")]
    pub target: Vec<String>,

    /// One entry per `--target` occurrence, its words joined with `_`.
    #[arg(skip)]
    pub targets: Vec<String>,

    /// Project for local actions (enwiki, commons, meta, enwikt, ...)
    #[arg(short, long)]
    pub project: Option<String>,

    /// How long a block is for (31hours, 1week, indefinite, forever)
    #[arg(short, long, visible_alias = "until", num_args = 1..)]
    pub duration: Vec<String>,

    /// Reason for the action. Shorthands: proxy, webhost <note>, lta, spam, spambot
    #[arg(short, long, num_args = 1..)]
    pub reason: Vec<String>,

    /// Revoke talk page access
    #[arg(long, visible_alias = "tpa")]
    pub revoketpa: bool,

    /// Allow account creation
    #[arg(long)]
    pub allowcreate: bool,

    /// Do not autoblock the IPs the account uses (softblock)
    #[arg(long, visible_alias = "noautoblock")]
    pub softblock: bool,

    /// Change an existing (global) block
    #[arg(short, long, visible_alias = "reblock")]
    pub force: bool,

    /// Only block anonymous users
    #[arg(long, visible_alias = "anon")]
    pub anononly: bool,

    /// Show the request that would be sent instead of sending it
    #[arg(long, visible_alias = "dryrun")]
    pub test: bool,

    /// Hide the locked account from global user lists
    #[arg(long, visible_alias = "hidden")]
    pub hide: bool,

    /// Suppress the locked account name (takes precedence over --hide)
    #[arg(long, visible_alias = "suppressed")]
    pub suppress: bool,

    /// Config file (defaults to ./.magik.toml, ~/.config/magik/config.toml, ~/.magik.toml)
    #[arg(long, env = "MAGIK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Only print results, no progress messages
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        let matches = Cli::command().get_matches();
        Self::from_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let mut cli = Cli::from_arg_matches(matches)?;
        cli.targets = matches
            .get_occurrences::<String>("target")
            .map(|occurrences| {
                occurrences
                    .map(|words| join_target(&words.cloned().collect::<Vec<_>>()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(cli)
    }

    pub fn to_command(&self) -> crate::Result<Command> {
        let action: Action = self.action.parse()?;

        Ok(Command {
            action,
            targets: self.targets.clone(),
            project: self.project.clone(),
            duration: normalize_duration(action, &self.duration),
            reason: join_reason(&self.reason),
            flags: Flags {
                force: self.force,
                softblock: self.softblock,
                revoketpa: self.revoketpa,
                allowcreate: self.allowcreate,
                anononly: self.anononly,
                test: self.test,
                hide: self.hide,
                suppress: self.suppress,
            },
        })
    }
}

/// Exit status for an invocation rejected before any target ran. Matches
/// clap's own usage-error status.
pub const FATAL_EXIT: u8 = 2;

pub fn run(cli: Cli) -> Result<ExitCode> {
    let command = cli.to_command()?;

    let report = if command.action == Action::Test {
        dispatch::run_offline(&command)?
    } else {
        command.validate()?;
        let config = Config::load(cli.config.as_deref())?;
        let credentials = config.credentials()?;
        let transport = HttpTransport::new(credentials, &config.user_agent())
            .context("Failed to set up the HTTP client")?;
        Dispatcher::new(transport).run(&command)?
    };

    output::print_report(&report);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
