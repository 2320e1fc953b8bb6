fn main() {
    if let Err(err) = csv_query::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
