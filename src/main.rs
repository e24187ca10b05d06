fn main() {
    if let Err(err) = csv_rewrite::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
