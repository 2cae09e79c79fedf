use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use plantform::config::ConfigManager;
use plantform::engines::evolution::{
    ConsoleProgressCallback, FitnessHistory, GenerationRecord, GeneticEvolver,
};
use serde::Serialize;
use std::path::PathBuf;

/// Evolve parametric L-system plants
#[derive(Debug, Parser)]
#[command(name = "plantform")]
#[command(version, long_about = None)]
struct Cli {
    /// TOML configuration file, layered over the defaults
    #[arg(env = "PLANTFORM_CONFIG")]
    config: Option<PathBuf>,

    /// Write the best instance and the per-generation fitness as JSON
    #[arg(short, long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Print the tunable settings of each section as JSON and exit
    #[arg(long)]
    describe: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    genome: String,
    fitness: f64,
    generations: usize,
    population_size: usize,
    history: Vec<GenerationRecord>,
    finished_at: DateTime<Utc>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let manager = ConfigManager::new();
    manager
        .load_layered(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let config = manager.get()?;

    if cli.describe {
        println!("{}", serde_json::to_string_pretty(&config.manifests())?);
        return Ok(());
    }

    let mut evolver = GeneticEvolver::from_config(&config)?;
    let mut progress = FitnessHistory::new(ConsoleProgressCallback);
    let population = evolver.evolve(
        config.evolver.population_size,
        config.evolver.generations,
        config.evolver.target_fitness,
        &mut progress,
    )?;

    let best = population.first().context("Evolution produced no instances")?;
    println!("Best instance: {}", best.short_string());
    println!("{}", best.lsystem);

    if let Some(path) = cli.report {
        let history = progress.into_records();
        let report = RunReport {
            genome: best.to_genome(),
            fitness: best.score(),
            generations: history.len(),
            population_size: population.len(),
            history,
            finished_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_config_and_report() {
        let cli = Cli::try_parse_from(["plantform", "plants.toml", "--report", "out.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("plants.toml")));
        assert_eq!(cli.report, Some(PathBuf::from("out.json")));
        assert!(!cli.describe);
    }

    #[test]
    fn test_cli_describe_flag() {
        let cli = Cli::try_parse_from(["plantform", "--describe"]).unwrap();
        assert!(cli.describe);
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["plantform", "--generations", "5"]).is_err());
    }

    #[test]
    fn test_cli_report_requires_path() {
        assert!(Cli::try_parse_from(["plantform", "--report"]).is_err());
    }
}
