//! Entry point for the `foodpoi` command-line interface.
#![forbid(unsafe_code)]

use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = foodpoi_cli::run() {
        eprintln!("foodpoi: {err}");
        std::process::exit(1);
    }
}
