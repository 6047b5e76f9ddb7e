fn main() {
    if let Err(error) = prosthetic_cli::run() {
        // Tracing is initialized inside run() after argument parsing.
        tracing::error!("CLI execution failed: {error:#}");
        std::process::exit(1);
    }
}
