use crate::data::{Assignment, Atom, Config, Instance, Rank, SolveStatus};
use crate::model::penalty;
use crate::solver::SolveOutcome;
use itertools::Itertools;
use log::warn;
use std::collections::BTreeMap;
use std::fmt;

/// Statistics of one returned assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Students per course, in course order, empty courses included.
    pub course_counts: Vec<(Atom, usize)>,
    /// How many assignments realized each preference rank.
    pub rank_histogram: BTreeMap<Rank, usize>,
    /// Assignments without a recorded preference.
    pub no_preference: usize,
    /// Sum of the penalties of all assignments.
    pub total_penalty: u64,
}

impl Analysis {
    pub fn new(instance: &Instance, assignment: &Assignment, config: &Config) -> Self {
        let course_counts = instance
            .courses
            .iter()
            .enumerate()
            .map(|(c, atom)| (atom.clone(), assignment.occupancy(c).count()))
            .collect();

        let ranks: Vec<Option<Rank>> = assignment
            .pairs()
            .map(|(s, c)| instance.rank(s, c))
            .collect();
        let rank_histogram = ranks.iter().flatten().copied().counts().into_iter().collect();
        let no_preference = ranks.iter().filter(|r| r.is_none()).count();
        let total_penalty = ranks
            .iter()
            .map(|&r| u64::from(penalty(r, config).unwrap_or(0)))
            .sum();

        Self {
            course_counts,
            rank_histogram,
            no_preference,
            total_penalty,
        }
    }
}

/// The text report handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub config: Config,
    pub status: SolveStatus,
    /// Present when the solve produced an assignment.
    pub analysis: Option<Analysis>,
    pub objective: Option<f64>,
}

impl Report {
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// Builds the report for a finished solve.
pub fn report(instance: &Instance, outcome: &SolveOutcome, config: &Config) -> Report {
    let analysis = outcome
        .assignment
        .as_ref()
        .map(|a| Analysis::new(instance, a, config));

    if let (Some(analysis), Some(objective)) = (&analysis, outcome.objective) {
        if !config.hard_enforced_preference && analysis.total_penalty as f64 != objective.round() {
            warn!(
                "Realized penalty {} differs from solver objective {}",
                analysis.total_penalty, objective
            );
        }
    }

    Report {
        config: config.clone(),
        status: outcome.status,
        analysis,
        objective: outcome.objective,
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = &self.config;
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Courses per student: {}", cfg.courses_per_student)?;
        writeln!(f, "  Max students per course: {}", cfg.max_students_per_course)?;
        writeln!(f, "  Min students per course: {}", cfg.min_students_per_course)?;
        writeln!(f, "  Hard enforce preferences: {}", cfg.hard_enforced_preference)?;
        writeln!(f, "  Out-of-preference penalty: {}", cfg.out_of_preference_penalty)?;
        writeln!(f, "  Time limit: {}s", cfg.time_limit_seconds)?;
        writeln!(f)?;
        writeln!(f, "Status: {}", self.status)?;

        let Some(analysis) = &self.analysis else {
            return match self.status {
                SolveStatus::Infeasible => {
                    writeln!(f, "No feasible assignment exists for this configuration.")
                }
                _ => writeln!(f, "No feasible assignment found within the time limit."),
            };
        };

        writeln!(f, "\n=== COURSE COUNTS ===")?;
        for (course, count) in &analysis.course_counts {
            writeln!(f, "count({count},{course}).")?;
        }

        writeln!(f, "\n=== QUALITY STATISTICS ===")?;
        for (rank, amount) in &analysis.rank_histogram {
            writeln!(f, "quality(rank({rank}),amount({amount})).")?;
        }
        writeln!(
            f,
            "quality(rank(no_preference),amount({})).",
            analysis.no_preference
        )?;

        writeln!(f, "\nTotal penalty: {}", analysis.total_penalty)?;
        if let Some(objective) = self.objective {
            writeln!(f, "Objective value: {}", objective.round())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Grid;
    use crate::tabular;

    fn config() -> Config {
        Config {
            min_students_per_course: 0,
            ..Config::default()
        }
    }

    fn outcome(status: SolveStatus, taken: Grid<bool>, objective: f64) -> SolveOutcome {
        SolveOutcome {
            status,
            assignment: Some(Assignment::new(taken)),
            objective: Some(objective),
        }
    }

    #[test]
    fn counts_ranks_and_penalties() {
        let inst = tabular::parse(";chess;art;golf\na;1;2;\nb;1;;\nc;2;1;\n").unwrap();
        let mut taken = Grid::from_elem((3, 3), false);
        taken[[0, 0]] = true; // rank 1
        taken[[1, 2]] = true; // no preference
        taken[[2, 0]] = true; // rank 2
        let rep = report(&inst, &outcome(SolveStatus::Optimal, taken, 23.0), &config());
        let analysis = rep.analysis.as_ref().unwrap();

        let counts: Vec<_> = analysis
            .course_counts
            .iter()
            .map(|(c, n)| (c.as_str(), *n))
            .collect();
        assert_eq!(counts, [("chess", 2), ("art", 0), ("golf", 1)]);
        assert_eq!(analysis.rank_histogram, BTreeMap::from([(1, 1), (2, 1)]));
        assert_eq!(analysis.no_preference, 1);
        assert_eq!(analysis.total_penalty, 1 + 20 + 2);
        assert!(rep.success());
    }

    #[test]
    fn renders_sections_in_order() {
        let inst = tabular::parse(";Chess;Art\nanna;;\n").unwrap();
        let mut taken = Grid::from_elem((1, 2), false);
        taken[[0, 1]] = true;
        let text = report(&inst, &outcome(SolveStatus::Optimal, taken, 20.0), &config()).to_string();

        let order = [
            "Configuration:",
            "Status: OPTIMAL",
            "=== COURSE COUNTS ===",
            "count(0,chess).",
            "count(1,art).",
            "=== QUALITY STATISTICS ===",
            "quality(rank(no_preference),amount(1)).",
            "Total penalty: 20",
            "Objective value: 20",
        ];
        let mut from = 0;
        for needle in order {
            let at = text[from..]
                .find(needle)
                .unwrap_or_else(|| panic!("{needle:?} missing or out of order in\n{text}"));
            from += at + needle.len();
        }
    }

    #[test]
    fn failed_solves_omit_assignment_sections() {
        let inst = tabular::parse(";a\nx;1\n").unwrap();
        let failed = SolveOutcome {
            status: SolveStatus::Infeasible,
            assignment: None,
            objective: None,
        };
        let rep = report(&inst, &failed, &config());
        let text = rep.to_string();
        assert!(!rep.success());
        assert!(text.contains("Status: INFEASIBLE"));
        assert!(text.contains("No feasible assignment exists"));
        assert!(!text.contains("COURSE COUNTS"));
        assert!(!text.contains("Total penalty"));
    }
}
