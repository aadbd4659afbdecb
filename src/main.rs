use clap::Parser;
use course_assigner::cli::{Args, Command};
use course_assigner::data::ConfigOverrides;
use course_assigner::error::AssignmentError;
use course_assigner::{facts, pipeline, server, tabular};
use log::{error, info};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Command::Solve {
            input,
            settings,
            verbose_solver,
        } => {
            let start_time = Instant::now();
            let overrides = ConfigOverrides::from(&settings);
            match pipeline::run_file(&input, &overrides, verbose_solver) {
                Ok(report) => {
                    print!("{report}");
                    info!("Time taken: {:.2?}", start_time.elapsed());
                    if report.success() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(1)
                    }
                }
                Err(e) => {
                    error!("{e}");
                    ExitCode::from(2)
                }
            }
        }
        Command::Export { csv, out } => match export(&csv, out.as_deref()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e}");
                ExitCode::from(2)
            }
        },
        Command::Serve { addr } => {
            let result = tokio::runtime::Runtime::new()
                .and_then(|runtime| runtime.block_on(server::run_server(addr)));
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Server error: {e}");
                    ExitCode::from(2)
                }
            }
        }
    }
}

fn export(csv: &Path, out: Option<&Path>) -> Result<(), AssignmentError> {
    let text = std::fs::read_to_string(csv)?;
    let instance = tabular::parse(&text)?;
    let facts = facts::export(&instance, None);
    match out {
        Some(path) => {
            std::fs::write(path, facts)?;
            info!("Wrote facts to {}", path.display());
        }
        None => print!("{facts}"),
    }
    Ok(())
}
