mod allocator;
mod error;
mod models;
mod reader;
mod writer;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use error::Error;
use models::{AssignmentSummary, Config};
use std::path::Path;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("paper-allocator")
        .version("0.1.0")
        .about("Assigns papers to students from their ranked preferences")
        .arg(
            Arg::new("studentprefs_file")
                .required(true)
                .value_name("STUDENT_PREFS")
                .help("Path to csv file containing student IDs and preferences"),
        )
        .arg(
            Arg::new("papers_file")
                .required(true)
                .value_name("PAPERS")
                .help("Path to csv file containing the paper IDs"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path to the output file. Default is assignment_result.csv"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Get a verbose output"),
        )
        .arg(
            Arg::new("enforce")
                .short('e')
                .long("enforce")
                .action(ArgAction::SetTrue)
                .help("Enforce output file overwrite"),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .value_parser(clap::value_parser!(u64))
                .help("Seed for a reproducible assignment"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
}

fn init_logging(verbose: bool) {
    let directive = if verbose {
        "paper_allocator=debug"
    } else {
        "paper_allocator=info"
    };
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads the config named on the command line, writing defaults if it is missing.
fn load_config(matches: &ArgMatches) -> Result<Config> {
    let Some(config_file) = matches.get_one::<String>("config") else {
        return Ok(Config::default());
    };

    if Path::new(config_file).exists() {
        tracing::info!("Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration from {}", config_file))
    } else {
        tracing::info!("Creating default configuration file: {}", config_file);
        let config = Config::default();
        config
            .save_to_file(config_file)
            .with_context(|| format!("Failed to write configuration to {}", config_file))?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");
    let enforce = matches.get_flag("enforce");
    init_logging(verbose);

    let mut config = load_config(&matches)?;
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_file = output.clone();
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }

    let prefs_file = matches
        .get_one::<String>("studentprefs_file")
        .context("missing student preferences file")?;
    let papers_file = matches
        .get_one::<String>("papers_file")
        .context("missing papers file")?;

    let summary = run(prefs_file, papers_file, &config, enforce, verbose)?;
    print_summary(&summary);
    Ok(())
}

/// Reads both inputs, allocates, and persists the result. Fatal errors
/// return before anything is written.
fn run(
    prefs_file: &str,
    papers_file: &str,
    config: &Config,
    enforce: bool,
    verbose: bool,
) -> Result<AssignmentSummary> {
    let students = reader::read_preferences(prefs_file, config.has_headers)?;
    let papers = reader::read_papers(papers_file, config.has_headers)?;
    reader::report_unknown_preferences(&students, &papers);
    if students.is_empty() {
        tracing::warn!("No students found in {}", prefs_file);
    }

    let assignment = allocator::assign(&students, &papers, config.seed)?;
    let summary = AssignmentSummary::from_assignment(&assignment, papers.len());

    if verbose {
        println!("\n{}", writer::render_table(&assignment));
    }

    match writer::write_assignment(&assignment, &config.output_file, enforce) {
        Ok(()) => {}
        Err(Error::OutputConflict { path }) => {
            println!("\n Note:  The output file {} already exists.", path.display());
            println!("\tTo overwrite file, please enable the enforce (-e) flag");
            println!("\tor specify a new path for the output file.");
            println!("\tAlternatively, you can view the result with the -v flag.\n");
        }
        Err(e) if !e.is_fatal() => {
            tracing::error!("{}", e);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(summary)
}

fn print_summary(summary: &AssignmentSummary) {
    println!("\nSUMMARY");
    println!("=======");
    println!(
        "Students assigned: {} ({} from their preferences)",
        summary.students,
        summary.honored()
    );
    for (i, count) in summary.by_rank.iter().enumerate() {
        println!("   Preference {}: {}", i + 1, count);
    }
    println!("   Outside preferences: {}", summary.fallback);
    if summary.unused_papers > 0 {
        println!("Papers left unused: {}", summary.unused_papers);
    }
}
