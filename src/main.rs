fn main() {
    std::process::exit(goldcheck::cli::run());
}
