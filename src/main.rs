fn main() {
    if let Err(err) = csv_redact::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
