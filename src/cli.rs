use crate::data::ConfigOverrides;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Assigns students to courses by preference")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Solve an assignment problem from a .csv table or a fact file
    Solve {
        input: PathBuf,
        #[command(flatten)]
        settings: Settings,
        /// Show the HiGHS log
        #[arg(long)]
        verbose_solver: bool,
    },
    /// Convert a CSV preference table into fact form
    Export {
        csv: PathBuf,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Serve the solver over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

/// Settings that override whatever the input file declares.
#[derive(ClapArgs, Debug, Default)]
pub struct Settings {
    /// Time limit in seconds
    #[arg(long)]
    pub time_limit: Option<u32>,
    #[arg(long)]
    pub courses_per_student: Option<u32>,
    #[arg(long)]
    pub min_students_per_course: Option<u32>,
    #[arg(long)]
    pub max_students_per_course: Option<u32>,
    /// Forbid assignments to courses a student did not rank. A bare flag
    /// means `true`.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub hard_enforced_preference: Option<bool>,
    #[arg(long)]
    pub out_of_preference_penalty: Option<u32>,
}

impl From<&Settings> for ConfigOverrides {
    fn from(s: &Settings) -> Self {
        ConfigOverrides {
            courses_per_student: s.courses_per_student,
            min_students_per_course: s.min_students_per_course,
            max_students_per_course: s.max_students_per_course,
            hard_enforced_preference: s.hard_enforced_preference,
            out_of_preference_penalty: s.out_of_preference_penalty,
            time_limit_seconds: s.time_limit,
        }
    }
}
