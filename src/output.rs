use std::sync::atomic::{AtomicBool, Ordering};

use crate::dispatch::Report;
use crate::response::Outcome;

static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Progress message on stderr, silenced by `--quiet`.
#[macro_export]
macro_rules! status {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            eprintln!($($arg)*);
        }
    };
}

/// Outcomes go to stdout, failures to stderr prefixed with their target.
/// Never silenced: these are the results the user asked for.
pub fn print_report(report: &Report) {
    for entry in &report.targets {
        match &entry.outcome {
            Outcome::Success(msg) | Outcome::Preview(msg) => println!("{msg}"),
            Outcome::Failure(msg) => eprintln!("{}: {}", entry.target, msg),
        }
    }

    let total = report.targets.len();
    if total > 1 {
        let failed = report.failures();
        status!("\n{} of {} targets succeeded", total - failed, total);
    }
}
