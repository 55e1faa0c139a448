//! Profile -- the parameters of a run, from the ms-style command line or a TOML profile.
//!
//! A profile uses the field names of [SimulationParameters] directly:
//! ```toml
//! sample_size = 10
//! num_replicates = 3
//! num_loci = 100
//! recombination_rate = 0.01
//! print_trees = true
//! random_seeds = [1, 2, 3]
//! [[population_models]]
//! type = "exponential"
//! start_time = 0.0
//! alpha = 1.5
//! ```
use crate::CliError;
use clap::ArgMatches;
use definitions::{ConfigError, PopulationModel, SimulationParameters};
use std::io::Read;
use std::path::{Path, PathBuf};

pub fn parameters(matches: &ArgMatches) -> Result<SimulationParameters, CliError> {
    match matches.get_one::<PathBuf>("profile") {
        Some(path) => load_profile(path),
        None => from_command_line(matches),
    }
}

pub fn load_profile<P: AsRef<Path>>(path: P) -> Result<SimulationParameters, CliError> {
    debug!("Opening {}", path.as_ref().display());
    let mut rdr = std::fs::File::open(path).map(std::io::BufReader::new)?;
    let mut file = String::new();
    rdr.read_to_string(&mut file)?;
    Ok(toml::from_str(&file)?)
}

fn usage(msg: &str) -> CliError {
    CliError::Usage(msg.to_string())
}

pub fn from_command_line(matches: &ArgMatches) -> Result<SimulationParameters, CliError> {
    let sample_size = matches
        .get_one::<usize>("sample_size")
        .copied()
        .ok_or_else(|| usage("SAMPLE_SIZE is missing"))?;
    let num_replicates = matches
        .get_one::<usize>("num_replicates")
        .copied()
        .ok_or_else(|| usage("NUM_REPLICATES is missing"))?;
    let mut params = SimulationParameters::new(sample_size, num_replicates);
    params.print_trees = matches.get_flag("trees");
    match matches.get_one::<f64>("mutation_rate") {
        Some(&theta) => params.mutation_rate = theta,
        None if !params.print_trees => return Err(usage("either -t or -T must be given")),
        None => {}
    }
    if let Some(values) = matches.get_many::<String>("recombination") {
        let (rho, num_loci) = match values.collect::<Vec<_>>()[..] {
            [rho, num_loci] => (rho, num_loci),
            _ => return Err(usage("-r takes RHO and NUM_LOCI")),
        };
        let rho: f64 = rho.parse().map_err(|_| usage("RHO must be a number"))?;
        let num_loci: usize = num_loci
            .parse()
            .map_err(|_| usage("NUM_LOCI must be a non-negative integer"))?;
        if !(rho.is_finite() && 0f64 <= rho) {
            let reason = format!("rho {} is not a non-negative number", rho);
            let name = "recombination_rate";
            return Err(ConfigError::InvalidParameter { name, reason }.into());
        }
        // ms takes the rate over the whole sequence; the engine wants it per link.
        params.num_loci = num_loci;
        params.recombination_rate = match num_loci {
            0 | 1 => 0f64,
            _ => rho / (num_loci - 1) as f64,
        };
    }
    if let Some(&precision) = matches.get_one::<usize>("precision") {
        params.precision = precision;
    }
    if let Some(seeds) = matches.get_many::<i64>("seeds") {
        params.random_seeds = Some(seeds.copied().collect());
    }
    params.population_models = population_models(matches);
    Ok(params)
}

/// `-G`, `--eN` and `--eG`, in order of start time.
fn population_models(matches: &ArgMatches) -> Vec<PopulationModel> {
    let mut models = vec![];
    if let Some(&alpha) = matches.get_one::<f64>("growth") {
        models.push(PopulationModel::Exponential {
            start_time: 0f64,
            alpha,
        });
    }
    if let Some(occurrences) = matches.get_occurrences::<f64>("size_change") {
        for values in occurrences {
            if let [start_time, size] = values.copied().collect::<Vec<_>>()[..] {
                models.push(PopulationModel::Constant { start_time, size });
            }
        }
    }
    if let Some(occurrences) = matches.get_occurrences::<f64>("growth_change") {
        for values in occurrences {
            if let [start_time, alpha] = values.copied().collect::<Vec<_>>()[..] {
                models.push(PopulationModel::Exponential { start_time, alpha });
            }
        }
    }
    models.sort_by(|x, y| {
        x.start_time()
            .partial_cmp(&y.start_time())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    models
}
