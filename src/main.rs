use clap::Parser;

use doclinks::cli::Cli;
use doclinks::config::Settings;
use doclinks::{link_repair, logging};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::new(&cli.target)?;
    cli.apply(&mut settings);

    logging::init(
        cli.verbose,
        settings.keep_logs.then_some(settings.log_file.as_path()),
    )?;

    let report = link_repair(&settings)?;
    println!("{report}");

    Ok(())
}
