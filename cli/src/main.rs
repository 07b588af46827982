mod cli;

use std::io::{BufWriter, Write};

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use lrgtf::io::{open_file_for_write, Compression};
use lrgtf::GtfUpdater;

use cli::{Cli, Command, UpdateGtfArgs};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    let start = std::time::Instant::now();
    let result = match cli.command {
        Command::UpdateGtf(args) => update_gtf(args),
    };
    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
    info!("Elapsed time: {:?}", start.elapsed());
}

fn update_gtf(args: UpdateGtfArgs) -> Result<()> {
    args.check()?;
    let params = args.params()?;

    let mut full_gtf = args
        .full_gtf
        .as_ref()
        .map(|path| open_file_for_write(path, Compression::try_from(path).ok()))
        .transpose()?;
    let output = BufWriter::new(std::io::stdout().lock());

    let mut updater = GtfUpdater::new(params);
    updater.run(
        &args.alignments,
        &args.annotation,
        output,
        full_gtf.as_deref_mut().map(|w| w as &mut dyn Write),
    )?;
    info!("Run metrics:\n{}", updater.metrics());
    Ok(())
}
