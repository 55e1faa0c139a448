use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

const SIMULATION_ARGS: [&str; 10] = [
    "sample_size",
    "num_replicates",
    "mutation_rate",
    "recombination",
    "trees",
    "precision",
    "seeds",
    "growth",
    "size_change",
    "growth_change",
];

pub fn mspms_parser() -> Command {
    Command::new("mspms")
        .version("0.1")
        .author("Bansho Masutani")
        .about("ms-compatible coalescent simulator.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Debug mode"),
        )
        .arg(
            Arg::new("sample_size")
                .value_name("SAMPLE_SIZE")
                .value_parser(value_parser!(usize))
                .required_unless_present("profile")
                .help("Number of sampled chromosomes."),
        )
        .arg(
            Arg::new("num_replicates")
                .value_name("NUM_REPLICATES")
                .value_parser(value_parser!(usize))
                .required_unless_present("profile")
                .help("Number of independent samples."),
        )
        .arg(
            Arg::new("mutation_rate")
                .short('t')
                .value_name("THETA")
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .help("Mutation rate 4N0*mu over the whole locus."),
        )
        .arg(
            Arg::new("recombination")
                .short('r')
                .num_args(2)
                .value_names(["RHO", "NUM_LOCI"])
                .allow_negative_numbers(true)
                .help("Recombination rate 4N0*r*(NUM_LOCI-1) and the number of loci."),
        )
        .arg(
            Arg::new("trees")
                .short('T')
                .action(ArgAction::SetTrue)
                .help("Print the genealogy of each replicate in Newick format."),
        )
        .arg(
            Arg::new("precision")
                .short('p')
                .value_name("PRECISION")
                .value_parser(value_parser!(usize))
                .help("Decimal digits of positions and branch lengths [default: 3]"),
        )
        .arg(
            Arg::new("seeds")
                .short('s')
                .long("seeds")
                .num_args(3)
                .value_names(["S1", "S2", "S3"])
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true)
                .help("Random seeds, each in [1, 65535]. Drawn if omitted."),
        )
        .arg(
            Arg::new("growth")
                .short('G')
                .value_name("ALPHA")
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .help("Exponential growth rate from time zero."),
        )
        .arg(
            Arg::new("size_change")
                .long("eN")
                .num_args(2)
                .value_names(["T", "X"])
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .action(ArgAction::Append)
                .help("Set the population size to X*N0 and stop growth at time T."),
        )
        .arg(
            Arg::new("growth_change")
                .long("eG")
                .num_args(2)
                .value_names(["T", "ALPHA"])
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .action(ArgAction::Append)
                .help("Set the growth rate to ALPHA at time T."),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Write the output to PATH instead of the standard output."),
        )
        .arg(
            Arg::new("profile")
                .long("profile")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .conflicts_with_all(SIMULATION_ARGS)
                .help("TOML profile holding every simulation parameter."),
        )
}
