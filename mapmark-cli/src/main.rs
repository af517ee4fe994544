//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use mapmark_cli::CliError;

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on stderr"
)]
fn main() {
    env_logger::init();
    match mapmark_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("mapmark: {err}");
            std::process::exit(1);
        }
    }
}
