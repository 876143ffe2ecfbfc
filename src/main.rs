fn main() {
    if let Err(err) = bitemporal::run() {
        bitemporal::report_error(&err);
        std::process::exit(1);
    }
}
