mod args;
mod election;

use clap::Parser;
use log::error;
use snafu::ErrorCompat;

use crate::args::Args;

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match election::run_elector(&args) {
        Ok(response) => println!("{}", response),
        Err(e) => {
            error!("Error occured {:?}", e);
            eprintln!("An error occured: {}", e);
            for cause in ErrorCompat::iter_chain(&e).skip(1) {
                eprintln!("  caused by: {}", cause);
            }
            std::process::exit(1);
        }
    }
}
