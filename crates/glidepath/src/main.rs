use clap::Parser;
use glidepath::cli::{Cli, Command};
use glidepath::{commands, init_logging};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), &cli.log_level)?;

    match &cli.command {
        Command::Run(args) => println!("{}", commands::run(args)?),
        Command::Validate { params } => println!("{}", commands::validate(params)?),
        Command::Worker { workers } => {
            let stdin = std::io::stdin();
            commands::serve(stdin.lock(), std::io::stdout().lock(), *workers)?;
        }
    }

    Ok(())
}
