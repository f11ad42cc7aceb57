use color_eyre::Result;

use tether::cli::{parse_args, run_cli_command, USAGE};
use tether::logging;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::init();

    let command = match parse_args(std::env::args()) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    run_cli_command(command).await
}
