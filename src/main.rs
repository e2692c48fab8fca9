fn main() {
    if let Err(code) = warden::cli::run() {
        std::process::exit(code.as_i32());
    }
}
