use std::process::ExitCode;

use magik::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    magik::output::set_quiet(cli.quiet);

    match magik::cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(magik::cli::FATAL_EXIT)
        }
    }
}
