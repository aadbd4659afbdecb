use crate::data::{Assignment, Grid, SolveStatus};
use ndarray::Array1;
use crate::error::AssignmentError;
use crate::model::Model;
use good_lp::solvers::SolutionStatus;
use good_lp::{ResolutionError, Solution, SolverModel, default_solver};
use log::{info, warn};
use std::time::Instant;

/// Settings for a single solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    /// Soft wall-clock cap. The best assignment found so far is kept when it
    /// runs out.
    pub time_limit_seconds: u32,
    /// Let HiGHS log to the console.
    pub verbose: bool,
}

impl SolverOptions {
    pub fn with_time_limit(time_limit_seconds: u32) -> Self {
        Self {
            time_limit_seconds,
            verbose: false,
        }
    }
}

/// What a solve produced. `assignment` and `objective` are present exactly
/// when `status` is `Optimal` or `Feasible`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub assignment: Option<Assignment>,
    pub objective: Option<f64>,
}

impl SolveOutcome {
    fn found(status: SolveStatus, assignment: Assignment, objective: f64) -> Self {
        Self {
            status,
            assignment: Some(assignment),
            objective: Some(objective),
        }
    }

    fn nothing(status: SolveStatus) -> Self {
        Self {
            status,
            assignment: None,
            objective: None,
        }
    }
}

/// Solves the assignment model using the HiGHS MILP solver.
///
/// The model is consumed, so every call works on its own variables and
/// concurrent solves share nothing. There are no retries: `Infeasible` and
/// `Unknown` are returned as they are and the caller decides what to change.
pub fn solve(model: Model, options: &SolverOptions) -> Result<SolveOutcome, AssignmentError> {
    let Model {
        variables,
        assign,
        active,
        objective,
        constraints,
        rules,
        too_few_courses,
    } = model;

    if too_few_courses {
        info!(
            "{} courses per student requested but only {} courses exist",
            rules.courses_per_student,
            assign.ncols()
        );
        return Ok(SolveOutcome::nothing(SolveStatus::Infeasible));
    }
    if assign.nrows() == 0 {
        info!("No students, nothing to assign");
        let empty = Assignment::new(Grid::from_elem((0, assign.ncols()), false));
        return Ok(SolveOutcome::found(SolveStatus::Optimal, empty, 0.0));
    }

    let start_time = Instant::now();
    let mut problem = variables
        .minimise(objective.clone())
        .using(default_solver)
        .set_option("time_limit", f64::from(options.time_limit_seconds))
        .set_option("threads", 1) // reproducible runs
        .set_option("random_seed", 1234)
        .set_option("output_flag", options.verbose)
        .set_option("log_to_console", options.verbose);
    for c in constraints {
        problem.add_constraint(c);
    }

    info!(
        "Starting ILP solver with a {}s time limit...",
        options.time_limit_seconds
    );
    let solution = match problem.solve() {
        Ok(s) => s,
        Err(ResolutionError::Infeasible) => {
            info!("Solver proved infeasibility in {:.2?}", start_time.elapsed());
            return Ok(SolveOutcome::nothing(SolveStatus::Infeasible));
        }
        // stopped (usually at the time limit) before any incumbent was found
        Err(ResolutionError::Other(reason @ ("NoSolutionFound" | "Unknown"))) => {
            info!(
                "Solver stopped after {:.2?} without a feasible assignment ({reason})",
                start_time.elapsed()
            );
            return Ok(SolveOutcome::nothing(SolveStatus::Unknown));
        }
        Err(e) => return Err(AssignmentError::Solver(e.to_string())),
    };
    info!("Solver finished in {:.2?}", start_time.elapsed());

    let taken = assign.map(|&var| solution.value(var) > 0.5);
    let open: Array1<bool> = active.iter().map(|&var| solution.value(var) > 0.5).collect();
    let assignment = Assignment::with_open_courses(taken, open);
    let value = solution.eval(objective);

    match solution.status() {
        SolutionStatus::Optimal => match rules.check(&assignment) {
            Ok(()) => Ok(SolveOutcome::found(SolveStatus::Optimal, assignment, value)),
            Err(v) => Err(AssignmentError::Solver(format!(
                "optimal solution violates a hard constraint: {v}"
            ))),
        },
        // time or gap limit: only an incumbent that holds up counts
        _ => match rules.check(&assignment) {
            Ok(()) => Ok(SolveOutcome::found(SolveStatus::Feasible, assignment, value)),
            Err(v) => {
                warn!("Discarding solver incumbent: {v}");
                Ok(SolveOutcome::nothing(SolveStatus::Unknown))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Config, Instance, Occupancy};
    use crate::model::build;
    use crate::tabular;

    fn run(table: &str, config: &Config) -> (Instance, SolveOutcome) {
        run_with_limit(table, config, 10)
    }

    fn run_with_limit(table: &str, config: &Config, seconds: u32) -> (Instance, SolveOutcome) {
        let instance = tabular::parse(table).unwrap();
        let model = build(&instance, config);
        let outcome = solve(model, &SolverOptions::with_time_limit(seconds)).unwrap();
        (instance, outcome)
    }

    /// `students` rows over `courses` columns, each student ranking four
    /// courses in a scrambled order.
    fn scrambled_table(students: usize, courses: usize) -> String {
        let header: String = (0..courses).map(|c| format!(";course{c}")).collect();
        let mut table = format!("{header}\n");
        for s in 0..students {
            let mut row = vec![String::new(); courses];
            for rank in 1..=4 {
                row[(s * 7 + rank * 3) % courses] = rank.to_string();
            }
            table.push_str(&format!("student{s};{}\n", row.join(";")));
        }
        table
    }

    fn open_window(max: u32) -> Config {
        Config {
            min_students_per_course: 0,
            max_students_per_course: max,
            ..Config::default()
        }
    }

    #[test]
    fn everyone_gets_their_shared_first_choice() {
        let (inst, out) = run(";chess;art\na;1;\nb;1;\nc;1;\n", &open_window(3));
        assert_eq!(out.status, SolveStatus::Optimal);
        let a = out.assignment.unwrap();
        assert_eq!(a.occupancy(0), Occupancy::Occupied(3));
        assert_eq!(a.occupancy(1), Occupancy::Empty);
        assert_eq!(a.assigned_count(), inst.students.len());
        assert!((0..3).all(|s| a.is_assigned(s, 0)));
        assert_eq!(out.objective.map(f64::round), Some(3.0));
    }

    #[test]
    fn minimum_that_cannot_be_met_is_infeasible() {
        let config = Config {
            min_students_per_course: 10,
            max_students_per_course: 30,
            ..Config::default()
        };
        let (_, out) = run(";solo\na;1\nb;1\nc;1\nd;1\ne;1\n", &config);
        assert_eq!(out.status, SolveStatus::Infeasible);
        assert!(out.assignment.is_none());
        assert!(out.objective.is_none());
    }

    #[test]
    fn unranked_student_still_gets_a_course() {
        let (_, out) = run(";Chess;Art\nanna;;\n", &open_window(30));
        assert_eq!(out.status, SolveStatus::Optimal);
        assert_eq!(out.assignment.unwrap().assigned_count(), 1);
        assert_eq!(out.objective.map(f64::round), Some(20.0));
    }

    #[test]
    fn more_courses_per_student_than_courses_is_infeasible() {
        let config = Config {
            courses_per_student: 3,
            ..open_window(5)
        };
        let (_, out) = run(";a;b\nx;1;2\n", &config);
        assert_eq!(out.status, SolveStatus::Infeasible);
        assert!(out.assignment.is_none());
    }

    #[test]
    fn capacity_pushes_students_to_second_choice() {
        let table = ";chess;art\na;1;2\nb;1;2\nc;1;2\nd;1;2\n";
        let (_, out) = run(table, &open_window(2));
        assert_eq!(out.status, SolveStatus::Optimal);
        let a = out.assignment.unwrap();
        assert_eq!(a.occupancy(0), Occupancy::Occupied(2));
        assert_eq!(a.occupancy(1), Occupancy::Occupied(2));
        assert_eq!(out.objective.map(f64::round), Some(6.0));
    }

    #[test]
    fn small_courses_are_closed_rather_than_underfilled() {
        // art would be everyone's favourite for one student, but a course
        // needs at least three
        let table = ";chess;art\na;2;1\nb;1;2\nc;1;2\nd;1;2\n";
        let config = Config {
            min_students_per_course: 3,
            max_students_per_course: 4,
            ..Config::default()
        };
        let (_, out) = run(table, &config);
        assert_eq!(out.status, SolveStatus::Optimal);
        let a = out.assignment.unwrap();
        assert_eq!(a.occupancy(0), Occupancy::Occupied(4));
        assert_eq!(a.occupancy(1), Occupancy::Empty);
    }

    #[test]
    fn multiple_courses_per_student_respect_every_window() {
        let table = "\
;a;b;c;d
s1;1;2;3;
s2;1;;2;3
s3;;1;2;3
s4;3;2;1;
s5;1;2;;3
s6;2;1;3;
";
        let config = Config {
            courses_per_student: 2,
            min_students_per_course: 2,
            max_students_per_course: 4,
            ..Config::default()
        };
        let (inst, out) = run(table, &config);
        assert!(out.status.is_success());
        let a = out.assignment.unwrap();
        assert_eq!(a.assigned_count(), inst.students.len() * 2);
        for c in 0..inst.courses.len() {
            let n = a.occupancy(c).count();
            assert!(n == 0 || (2..=4).contains(&n), "course {c} has {n}");
        }
    }

    #[test]
    fn hard_enforcement_never_assigns_unranked_pairs() {
        let table = ";a;b;c\ns1;1;;\ns2;;1;2\ns3;2;;1\n";
        let config = Config {
            hard_enforced_preference: true,
            ..open_window(3)
        };
        let (inst, out) = run(table, &config);
        assert_eq!(out.status, SolveStatus::Optimal);
        let a = out.assignment.unwrap();
        for (s, c) in a.pairs() {
            assert!(inst.rank(s, c).is_some(), "({s}, {c}) has no preference");
        }
    }

    #[test]
    fn hard_enforcement_with_too_few_preferences_is_infeasible() {
        let config = Config {
            courses_per_student: 2,
            hard_enforced_preference: true,
            ..open_window(3)
        };
        let (_, out) = run(";a;b\ns1;1;\n", &config);
        assert_eq!(out.status, SolveStatus::Infeasible);
    }

    #[test]
    fn no_students_is_trivially_optimal() {
        let (_, out) = run(";a;b\n", &open_window(3));
        assert_eq!(out.status, SolveStatus::Optimal);
        assert_eq!(out.assignment.unwrap().assigned_count(), 0);
        assert_eq!(out.objective, Some(0.0));
    }

    #[test]
    fn zero_time_limit_never_fails_the_solve() {
        let config = Config {
            courses_per_student: 2,
            min_students_per_course: 5,
            max_students_per_course: 12,
            ..Config::default()
        };
        let (inst, out) = run_with_limit(&scrambled_table(60, 11), &config, 0);
        assert_ne!(out.status, SolveStatus::Infeasible);
        assert_eq!(out.assignment.is_some(), out.status.is_success());
        assert_eq!(out.objective.is_some(), out.status.is_success());
        if let Some(a) = out.assignment {
            assert_eq!(a.assigned_count(), inst.students.len() * 2);
        }
    }

    #[test]
    fn open_flags_of_a_solved_model_match_the_head_counts() {
        let table = ";a;b;c\ns1;1;2;\ns2;1;;2\ns3;2;1;\n";
        let (_, out) = run(table, &open_window(3));
        let a = out.assignment.unwrap();
        for c in 0..a.courses() {
            assert_eq!(a.occupancy(c).count(), a.head_count(c));
        }
        assert_eq!(a.occupancy(2), Occupancy::Empty);
    }

    #[test]
    fn independent_solves_can_run_in_parallel() {
        let handles: Vec<_> = (1..=4)
            .map(|max| {
                std::thread::spawn(move || {
                    let table = ";x;y\na;1;2\nb;1;2\nc;1;2\nd;1;2\n";
                    run(table, &open_window(max)).1
                })
            })
            .collect();
        let statuses: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().status)
            .collect();
        // two courses of size 1 cannot hold four students
        assert_eq!(statuses[0], SolveStatus::Infeasible);
        assert!(statuses[1..].iter().all(|s| *s == SolveStatus::Optimal));
    }
}
