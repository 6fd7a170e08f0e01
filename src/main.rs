fn main() {
    skewness_balance::cli::run();
}
