use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

use glidepath_core::model::PolicyTables;
use glidepath_core::protocol::handle_message;
use glidepath_core::simulation::SimulationContext;
use glidepath_core::{
    ExecutionPool, MonteCarloProgress, MonteCarloRequest, TaskResult, run_monte_carlo,
};

use crate::cli::RunArgs;
use crate::loader::load_params;

/// Run one batch and render the result as pretty JSON
pub fn run(args: &RunArgs) -> color_eyre::Result<String> {
    let mut params = load_params(&args.params)?;
    if let Some(year) = args.policy_year {
        params.policy_year = year;
    }

    let pool = ExecutionPool::new(args.workers)?;
    let request = MonteCarloRequest {
        trials: args.trials,
        mode: args.mode.into(),
        seed: args.seed,
        timeout: args.timeout_secs.map(Duration::from_secs),
    };
    let result = run_monte_carlo(
        &params,
        &PolicyTables::default(),
        &request,
        &pool,
        &MonteCarloProgress::new(),
    )?;
    tracing::info!(
        completed = result.completed,
        dropped = result.dropped.total(),
        cancelled = result.cancelled,
        seed = result.base_seed,
        success_probability = result.success_probability,
        "Run finished"
    );

    let json = if args.compact {
        serde_json::to_string_pretty(&TaskResult::from(result))?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    Ok(json)
}

/// Validate a parameter file and describe what would be simulated
pub fn validate(path: &Path) -> color_eyre::Result<String> {
    let params = load_params(path)?;
    let horizon = params.horizon_years()?;
    let tables = PolicyTables::default();
    SimulationContext::new(&params, &tables)?;

    let members = params.members().count();
    Ok(format!(
        "ok: {members} member(s), {horizon} year(s), ${:.0} starting assets, policy year {}",
        params.assets.total_assets(),
        params.policy_year
    ))
}

/// Answer one JSON task per input line until the input ends. Blank lines
/// are skipped.
pub fn serve<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    workers: usize,
) -> color_eyre::Result<()> {
    let pool = ExecutionPool::new(workers)?;
    let tables = PolicyTables::default();
    tracing::info!(workers = pool.workers(), "Worker ready");

    let mut handled = 0usize;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_message(&line, &tables, &pool);
        writeln!(output, "{reply}")?;
        output.flush()?;
        handled += 1;
    }

    tracing::info!(handled, "Worker input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Mode;
    use glidepath_core::model::AggregateResult;
    use glidepath_core::{PersonBuilder, SimulationBuilder};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_params(dir: &Path) -> PathBuf {
        let params = SimulationBuilder::new()
            .primary(PersonBuilder::new(64).retire_at(65).life_expectancy(85))
            .assets(500_000.0, 200_000.0, 150_000.0, 100_000.0, 25_000.0)
            .living_expenses(42_000.0)
            .build()
            .unwrap();
        let path = dir.join("plan.json");
        fs::write(&path, params.to_json().unwrap()).unwrap();
        path
    }

    fn args(params: PathBuf) -> RunArgs {
        RunArgs {
            params,
            trials: 50,
            mode: Mode::Bands,
            seed: Some(3),
            workers: 2,
            timeout_secs: None,
            policy_year: None,
            compact: false,
        }
    }

    #[test]
    fn test_run_prints_aggregate() {
        let dir = tempdir().unwrap();
        let out = run(&args(write_params(dir.path()))).unwrap();
        let result: AggregateResult = serde_json::from_str(&out).unwrap();
        assert_eq!(result.completed, 50);
        assert_eq!(result.base_seed, 3);
        assert_eq!(result.per_year.unwrap().len(), 21);
    }

    #[test]
    fn test_run_compact_uses_protocol_shape() {
        let dir = tempdir().unwrap();
        let mut a = args(write_params(dir.path()));
        a.compact = true;
        a.mode = Mode::Score;
        let out: serde_json::Value = serde_json::from_str(&run(&a).unwrap()).unwrap();
        assert_eq!(out["kind"], "score");
        assert_eq!(out["total"], 50);
    }

    #[test]
    fn test_unknown_policy_year_fails() {
        let dir = tempdir().unwrap();
        let mut a = args(write_params(dir.path()));
        a.policy_year = Some(1999);
        assert!(run(&a).is_err());
    }

    #[test]
    fn test_validate_reports_horizon() {
        let dir = tempdir().unwrap();
        let summary = validate(&write_params(dir.path())).unwrap();
        assert!(summary.starts_with("ok:"));
        assert!(summary.contains("21 year(s)"));
    }

    #[test]
    fn test_serve_answers_each_line() {
        let dir = tempdir().unwrap();
        let params: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(write_params(dir.path())).unwrap()).unwrap();
        let task = serde_json::json!({ "kind": "score", "params": params, "runs": 10, "seed": 1 });
        let input = format!("{task}\n\nnot json\n");

        let mut output = Vec::new();
        serve(input.as_bytes(), &mut output, 1).unwrap();

        let replies: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["kind"], "score");
        assert_eq!(replies[1]["kind"], "error");
    }
}
