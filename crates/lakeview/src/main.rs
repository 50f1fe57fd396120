use clap::Parser;
use lakeview::Args;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = lakeview::run(Args::parse()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
