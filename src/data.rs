use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

// Indices into `Instance::students` / `Instance::courses`.
pub type StudentIdx = usize;
pub type CourseIdx = usize;
pub type Rank = u32;

/// A normalized, ASCII-safe identifier for a student or a course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(String);

impl Atom {
    /// Wraps a string that is already normalized. Use
    /// [`normalize_atom`](crate::normalize::normalize_atom) for raw names.
    pub(crate) fn from_normalized(text: String) -> Self {
        debug_assert!(!text.is_empty());
        Atom(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dense matrix addressed by `[[student, course]]`.
pub type Grid<T> = Array2<T>;

/// Preference ranks by (student, course). `None` means no recorded preference.
pub type PreferenceTable = Grid<Option<Rank>>;

/// Normalized students, courses and their preference table for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub students: Vec<Atom>,
    pub courses: Vec<Atom>,
    pub preferences: PreferenceTable,
}

impl Instance {
    pub fn new(
        students: Vec<Atom>,
        courses: Vec<Atom>,
        edges: impl IntoIterator<Item = (StudentIdx, CourseIdx, Rank)>,
    ) -> Self {
        let mut preferences = Grid::from_elem((students.len(), courses.len()), None);
        for (s, c, rank) in edges {
            preferences[[s, c]] = Some(rank);
        }
        Self {
            students,
            courses,
            preferences,
        }
    }

    pub fn rank(&self, student: StudentIdx, course: CourseIdx) -> Option<Rank> {
        self.preferences[[student, course]]
    }

    /// All recorded preference edges in student-major order.
    pub fn edges(&self) -> impl Iterator<Item = (StudentIdx, CourseIdx, Rank)> + '_ {
        (0..self.students.len()).flat_map(move |s| {
            (0..self.courses.len()).filter_map(move |c| self.rank(s, c).map(|r| (s, c, r)))
        })
    }
}

/// Settings for one solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub courses_per_student: u32,
    pub min_students_per_course: u32,
    pub max_students_per_course: u32,
    pub hard_enforced_preference: bool,
    pub out_of_preference_penalty: u32,
    pub time_limit_seconds: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            courses_per_student: 1,
            min_students_per_course: 10,
            max_students_per_course: 30,
            hard_enforced_preference: false,
            out_of_preference_penalty: 20,
            time_limit_seconds: 30,
        }
    }
}

impl Config {
    /// Rejects values the model cannot express. Settings that merely make the
    /// instance unsolvable are left to the solver.
    pub fn validate(&self) -> Result<(), crate::error::AssignmentError> {
        use crate::error::AssignmentError::InvalidConfig;
        if self.courses_per_student == 0 {
            return Err(InvalidConfig("courses_per_student must be at least 1".into()));
        }
        if self.max_students_per_course == 0 {
            return Err(InvalidConfig("max_students_per_course must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(v) = overrides.courses_per_student {
            self.courses_per_student = v;
        }
        if let Some(v) = overrides.min_students_per_course {
            self.min_students_per_course = v;
        }
        if let Some(v) = overrides.max_students_per_course {
            self.max_students_per_course = v;
        }
        if let Some(v) = overrides.hard_enforced_preference {
            self.hard_enforced_preference = v;
        }
        if let Some(v) = overrides.out_of_preference_penalty {
            self.out_of_preference_penalty = v;
        }
        if let Some(v) = overrides.time_limit_seconds {
            self.time_limit_seconds = v;
        }
        self
    }
}

/// Explicit settings from the CLI or an HTTP query. Set fields win over
/// anything declared in the input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigOverrides {
    pub courses_per_student: Option<u32>,
    pub min_students_per_course: Option<u32>,
    pub max_students_per_course: Option<u32>,
    pub hard_enforced_preference: Option<bool>,
    pub out_of_preference_penalty: Option<u32>,
    pub time_limit_seconds: Option<u32>,
}

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

impl SolveStatus {
    /// `true` when an assignment comes with this status.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optimal => "OPTIMAL",
            Self::Feasible => "FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Per-course state in a returned assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Empty,
    Occupied(usize),
}

impl Occupancy {
    pub fn count(self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Occupied(n) => n,
        }
    }
}

/// Which student takes which course, and which courses run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    taken: Grid<bool>,
    open: Array1<bool>,
}

impl Assignment {
    /// A course counts as open when anyone takes it.
    pub fn new(taken: Grid<bool>) -> Self {
        let open = taken.columns().into_iter().map(|col| col.iter().any(|&on| on)).collect();
        Self { taken, open }
    }

    /// Takes the open flags as given. They may disagree with `taken`; such an
    /// assignment fails [`Rules::check`](crate::model::Rules::check).
    pub fn with_open_courses(taken: Grid<bool>, open: Array1<bool>) -> Self {
        debug_assert_eq!(taken.ncols(), open.len());
        Self { taken, open }
    }

    pub fn is_assigned(&self, student: StudentIdx, course: CourseIdx) -> bool {
        self.taken[[student, course]]
    }

    pub fn courses_of(&self, student: StudentIdx) -> impl Iterator<Item = CourseIdx> + '_ {
        self.taken
            .row(student)
            .into_iter()
            .enumerate()
            .filter_map(|(c, &on)| on.then_some(c))
    }

    /// Number of students taking `course`, whatever its open flag says.
    pub fn head_count(&self, course: CourseIdx) -> usize {
        self.taken.column(course).iter().filter(|&&on| on).count()
    }

    pub fn occupancy(&self, course: CourseIdx) -> Occupancy {
        if self.open[course] {
            Occupancy::Occupied(self.head_count(course))
        } else {
            Occupancy::Empty
        }
    }

    /// All (student, course) pairs that are assigned, student-major.
    pub fn pairs(&self) -> impl Iterator<Item = (StudentIdx, CourseIdx)> + '_ {
        (0..self.students()).flat_map(move |s| self.courses_of(s).map(move |c| (s, c)))
    }

    /// Number of assigned (student, course) pairs.
    pub fn assigned_count(&self) -> usize {
        self.taken.iter().filter(|&&on| on).count()
    }

    pub fn students(&self) -> usize {
        self.taken.nrows()
    }

    pub fn courses(&self) -> usize {
        self.taken.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms(names: &[&str]) -> Vec<Atom> {
        names.iter().map(|n| Atom::from_normalized(n.to_string())).collect()
    }

    #[test]
    fn preferences_are_indexed_by_student_then_course() {
        let inst = Instance::new(atoms(&["a", "b"]), atoms(&["x", "y", "z"]), [(1, 2, 3)]);
        assert_eq!(inst.preferences.dim(), (2, 3));
        assert_eq!(inst.rank(1, 2), Some(3));
        assert_eq!(inst.rank(0, 2), None);
    }

    #[test]
    #[should_panic]
    fn rank_rejects_out_of_bounds() {
        let inst = Instance::new(atoms(&["a"]), atoms(&["x"]), [(0, 0, 1)]);
        let _ = inst.rank(0, 1);
    }

    #[test]
    fn instance_edges_skip_missing_preferences() {
        let inst = Instance::new(atoms(&["a", "b"]), atoms(&["x", "y"]), [(0, 1, 2), (1, 0, 1)]);
        assert_eq!(inst.edges().collect::<Vec<_>>(), vec![(0, 1, 2), (1, 0, 1)]);
        assert_eq!(inst.rank(0, 0), None);
    }

    #[test]
    fn overrides_take_precedence() {
        let cfg = Config::default().with_overrides(&ConfigOverrides {
            courses_per_student: Some(2),
            hard_enforced_preference: Some(true),
            ..Default::default()
        });
        assert_eq!(cfg.courses_per_student, 2);
        assert!(cfg.hard_enforced_preference);
        assert_eq!(cfg.max_students_per_course, 30);
    }

    #[test]
    fn zero_courses_per_student_is_rejected() {
        let cfg = Config {
            courses_per_student: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn occupancy_distinguishes_empty_courses() {
        let mut taken = Grid::from_elem((3, 2), false);
        taken[[0, 0]] = true;
        taken[[2, 0]] = true;
        let a = Assignment::new(taken);
        assert_eq!(a.occupancy(0), Occupancy::Occupied(2));
        assert_eq!(a.occupancy(1), Occupancy::Empty);
        assert_eq!(a.assigned_count(), 2);
    }

    #[test]
    fn occupancy_follows_the_open_flags() {
        let mut taken = Grid::from_elem((2, 2), false);
        taken[[0, 0]] = true;
        taken[[1, 0]] = true;
        let a = Assignment::with_open_courses(taken, Array1::from(vec![false, true]));
        assert_eq!(a.occupancy(0), Occupancy::Empty);
        assert_eq!(a.head_count(0), 2);
        assert_eq!(a.occupancy(1), Occupancy::Occupied(0));
    }
}
