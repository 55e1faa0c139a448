use coalescent::Coalescent;
use mscompat::{RunSummary, SimulationRunner};
use mspms_cli::CliError;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
#[macro_use]
extern crate log;

fn main() -> ExitCode {
    let matches = mspms_cli::mspms_commands::mspms_parser().get_matches();
    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    match run(&matches) {
        Ok(summary) => {
            debug!("END\t{} replicates\t{}", summary.replicates, summary.seeds);
            ExitCode::SUCCESS
        }
        Err(why) => {
            error!("{}", why);
            match why {
                CliError::Usage(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(matches: &clap::ArgMatches) -> Result<RunSummary, CliError> {
    let params = mspms_cli::profile::parameters(matches)?;
    match serde_json::to_string(&params) {
        Ok(json) => debug!("PARAMS\t{}", json),
        Err(why) => warn!("PARAMS\t{}", why),
    }
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    // Both validate before anything is written.
    let engine = Coalescent::new(&params)?;
    let mut runner = SimulationRunner::new(params, &command_line, engine)?;
    let mut entropy = rand::thread_rng();
    let summary = match matches.get_one::<PathBuf>("output") {
        Some(path) => {
            debug!("Writing to {}", path.display());
            let mut wtr = std::fs::File::create(path).map(BufWriter::new)?;
            runner.run(&mut wtr, &mut entropy)?
        }
        None => {
            let stdout = std::io::stdout();
            let mut wtr = BufWriter::new(stdout.lock());
            runner.run(&mut wtr, &mut entropy)?
        }
    };
    Ok(summary)
}
