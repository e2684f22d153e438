fn main() {
    if let Err(err) = property_report::cli::run() {
        eprintln!("application error: {err}");
        std::process::exit(err.exit_code());
    }
}
