use std::error::Error;

use clap::Parser;
use lucidmq_client::cli::{Cli, execute};

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let out = execute(&cli.command, &cli.config())?;
    print!("{out}");
    Ok(())
}
