fn main() {
    if let Err(err) = loan_intake::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
