fn main() {
    if let Err(error) = uiaquery_cli::run() {
        tracing::error!(%error, "CLI execution failed");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
