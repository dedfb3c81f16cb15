//! Entry point for the `housing` command.
#![forbid(unsafe_code)]

use env_logger::Env;

#[expect(
    clippy::print_stderr,
    reason = "The binary reports fatal errors on stderr before exiting"
)]
fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    if let Err(err) = housing_cli::run() {
        eprintln!("housing: {err}");
        std::process::exit(1);
    }
}
