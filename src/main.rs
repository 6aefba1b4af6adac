//! grec binary entry point.

fn main() {
    if let Err(err) = gitrecords::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
