use crate::data::{Config, ConfigOverrides, Instance};
use crate::error::AssignmentError;
use crate::report::{Report, report};
use crate::solver::{SolverOptions, solve};
use crate::{facts, model, tabular};
use log::info;
use std::path::Path;

/// The two accepted input forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Tabular,
    Facts,
}

impl InputKind {
    /// `.csv` files are tabular, everything else is read as facts.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Tabular,
            _ => Self::Facts,
        }
    }
}

/// Parses `text` and resolves the configuration: defaults, then anything the
/// input declares, then `overrides`.
pub fn load(
    text: &str,
    kind: InputKind,
    overrides: &ConfigOverrides,
) -> Result<(Instance, Config), AssignmentError> {
    let (instance, declared) = match kind {
        InputKind::Tabular => (tabular::parse(text)?, ConfigOverrides::default()),
        InputKind::Facts => {
            let input = facts::parse(text)?;
            (input.instance, input.declared)
        }
    };
    let config = Config::default()
        .with_overrides(&declared)
        .with_overrides(overrides);
    config.validate()?;
    Ok((instance, config))
}

/// Runs the whole chain on `text`: parse, build, solve, report.
pub fn run(
    text: &str,
    kind: InputKind,
    overrides: &ConfigOverrides,
    verbose_solver: bool,
) -> Result<Report, AssignmentError> {
    let (instance, config) = load(text, kind, overrides)?;
    info!("Resolved configuration: {config:?}");

    let model = model::build(&instance, &config);
    let options = SolverOptions {
        time_limit_seconds: config.time_limit_seconds,
        verbose: verbose_solver,
    };
    let outcome = solve(model, &options)?;
    info!("Solve finished with status {}", outcome.status);

    Ok(report(&instance, &outcome, &config))
}

/// Reads `path` and runs it, picking the input form from the extension.
pub fn run_file(
    path: &Path,
    overrides: &ConfigOverrides,
    verbose_solver: bool,
) -> Result<Report, AssignmentError> {
    let text = std::fs::read_to_string(path)?;
    run(&text, InputKind::from_path(path), overrides, verbose_solver)
}
