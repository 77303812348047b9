fn main() {
    if let Err(err) = securecheck::cli::run() {
        securecheck::ui::eprintln_error(&err);
        std::process::exit(securecheck::exit::exit_code(&err));
    }
}
