use std::process::ExitCode;

fn main() -> ExitCode {
    flavour_cli::run()
}
