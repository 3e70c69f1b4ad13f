/// concord-script CLI
///
/// Generates stress documents, validates definitions and runs them with the
/// reference runner.

use concord_script::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
