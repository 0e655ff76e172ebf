#[macro_use]
extern crate log;
extern crate clap;
extern crate env_logger;
extern crate wetwire_cli;

use clap::Parser;
use wetwire_cli::{run, Cli};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
