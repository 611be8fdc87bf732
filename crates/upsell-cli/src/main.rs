fn main() {
    if let Err(error) = upsell_cli::run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
