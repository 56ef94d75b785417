//! Scenario runner
//!
//! Loads a JSON scenario configuration, plans and simulates the run, and
//! writes the result record as JSON. The exit status mirrors the
//! terminal outcome so a batch runner can classify runs without parsing
//! output: 0 goal reached, 2 collided, 3 timed out, 4 planning failure,
//! 1 configuration or internal error.

use std::path::PathBuf;
use std::process;

use log::{error, info};
use structopt::StructOpt;

use nav_sim::simulation::{run_scenario, ScenarioReport, Termination};
use nav_sim::{NavError, ScenarioConfig};

#[derive(Debug, StructOpt)]
#[structopt(name = "simulate", about = "Plan a route and track it with a simulated vehicle")]
struct Opt {
    /// Scenario configuration file (JSON)
    #[structopt(parse(from_os_str))]
    config: PathBuf,

    /// Write the result record to this file as JSON
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[structopt(short, long)]
    verbose: bool,
}

fn logger_init(verbose: bool) -> Result<(), fern::InitError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:5}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

/// Map a finished scenario onto the process exit status
fn exit_code(report: &ScenarioReport) -> i32 {
    match report {
        ScenarioReport::Completed { result, .. } => match result.termination {
            Termination::GoalReached => 0,
            Termination::Collided => 2,
            Termination::TimedOut => 3,
        },
        ScenarioReport::PlanningFailed { .. } => 4,
    }
}

fn run(opt: &Opt) -> Result<i32, NavError> {
    let config = ScenarioConfig::from_file(&opt.config)?;
    info!("loaded scenario from {:?}", opt.config);

    let report = run_scenario(&config)?;

    if let Some(path) = &opt.output {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| NavError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        info!("result written to {:?}", path);
    }

    Ok(exit_code(&report))
}

fn main() {
    let opt = Opt::from_args();
    if let Err(e) = logger_init(opt.verbose) {
        eprintln!("failed to initialise logging: {}", e);
        process::exit(1);
    }

    match run(&opt) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_sim::simulation::SimulationResult;

    fn completed(termination: Termination) -> ScenarioReport {
        ScenarioReport::Completed {
            result: SimulationResult {
                termination,
                trajectory: Vec::new(),
                ticks: 0,
                elapsed: 0.0,
                max_cross_track: 0.0,
                collision_point: None,
            },
            course_length: 0.0,
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&completed(Termination::GoalReached)), 0);
        assert_eq!(exit_code(&completed(Termination::Collided)), 2);
        assert_eq!(exit_code(&completed(Termination::TimedOut)), 3);
        assert_eq!(
            exit_code(&ScenarioReport::PlanningFailed { reason: "walled off".to_string() }),
            4
        );
    }
}
