use crate::data::{Assignment, Config, Grid, Instance, Occupancy, Rank};
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};
use log::{info, trace};
use std::fmt;

/// Objective contribution of assigning a pair with preference `rank`.
/// `None` means the pair may not be assigned at all.
pub fn penalty(rank: Option<Rank>, config: &Config) -> Option<u32> {
    match rank {
        Some(rank) => Some(rank),
        None if config.hard_enforced_preference => None,
        None => Some(config.out_of_preference_penalty),
    }
}

/// The hard rules a returned assignment must satisfy.
#[derive(Debug, Clone)]
pub struct Rules {
    pub courses_per_student: u32,
    pub min_students_per_course: u32,
    pub max_students_per_course: u32,
    /// Pairs fixed to false under hard preference enforcement.
    pub forbidden: Grid<bool>,
}

/// A broken hard rule, found when checking an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    WrongCourseCount { student: usize, count: usize },
    CapacityWindow { course: usize, count: usize },
    ForbiddenPair { student: usize, course: usize },
    /// The course-activity flag disagrees with whether anyone takes the course.
    ActivityMismatch { course: usize, count: usize },
    ShapeMismatch,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongCourseCount { student, count } => {
                write!(f, "student #{student} has {count} courses")
            }
            Self::CapacityWindow { course, count } => {
                write!(f, "course #{course} has {count} students, outside its window")
            }
            Self::ForbiddenPair { student, course } => {
                write!(f, "student #{student} got course #{course} without a preference")
            }
            Self::ActivityMismatch { course, count } => {
                write!(f, "course #{course} has {count} students but its open flag disagrees")
            }
            Self::ShapeMismatch => write!(f, "assignment does not match the instance"),
        }
    }
}

impl Rules {
    pub fn check(&self, assignment: &Assignment) -> Result<(), Violation> {
        if (assignment.students(), assignment.courses()) != self.forbidden.dim() {
            return Err(Violation::ShapeMismatch);
        }
        for student in 0..assignment.students() {
            let count = assignment.courses_of(student).count();
            if count != self.courses_per_student as usize {
                return Err(Violation::WrongCourseCount { student, count });
            }
        }
        let window = self.min_students_per_course as usize..=self.max_students_per_course as usize;
        for course in 0..assignment.courses() {
            let count = assignment.head_count(course);
            match assignment.occupancy(course) {
                Occupancy::Empty if count > 0 => {
                    return Err(Violation::ActivityMismatch { course, count });
                }
                Occupancy::Occupied(0) => {
                    return Err(Violation::ActivityMismatch { course, count });
                }
                Occupancy::Occupied(_) if !window.contains(&count) => {
                    return Err(Violation::CapacityWindow { course, count });
                }
                _ => {}
            }
        }
        match assignment.pairs().find(|&(s, c)| self.forbidden[[s, c]]) {
            Some((student, course)) => Err(Violation::ForbiddenPair { student, course }),
            None => Ok(()),
        }
    }
}

/// A fully built assignment model. Built once per solve and consumed by
/// [`solve`](crate::solver::solve).
pub struct Model {
    pub(crate) variables: ProblemVariables,
    /// x[s][c] = 1 if student s takes course c
    pub(crate) assign: Grid<Variable>,
    /// y[c] = 1 if course c has any students
    pub(crate) active: Vec<Variable>,
    pub(crate) objective: Expression,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) rules: Rules,
    /// More courses per student than there are courses.
    pub(crate) too_few_courses: bool,
}

impl Model {
    pub fn students(&self) -> usize {
        self.assign.nrows()
    }

    pub fn courses(&self) -> usize {
        self.assign.ncols()
    }
}

/// Builds the decision variables, hard constraints and penalty objective for
/// `instance` under `config`.
pub fn build(instance: &Instance, config: &Config) -> Model {
    let n_students = instance.students.len();
    let n_courses = instance.courses.len();
    info!("Building model with {n_students} students and {n_courses} courses");

    let mut variables = ProblemVariables::new();
    let assign_vec = variables.add_vector(variable().binary(), n_students * n_courses);
    let assign = Grid::from_shape_fn((n_students, n_courses), |(s, c)| {
        assign_vec[s * n_courses + c]
    });
    let active = variables.add_vector(variable().binary(), n_courses);
    trace!(
        "Created {} assignment and {} course-activity variables",
        assign_vec.len(),
        active.len()
    );

    let mut constraints = Vec::new();

    // each student takes exactly k courses
    let k = f64::from(config.courses_per_student);
    for s in 0..n_students {
        let taken: Expression = assign.row(s).iter().copied().sum();
        constraints.push(constraint!(taken == k));
    }

    // a course is either empty or filled within [min, max]:
    //   active  -> 1 <= count, min <= count <= max
    //   !active -> count == 0
    let min = f64::from(config.min_students_per_course);
    let max = f64::from(config.max_students_per_course);
    for (c, &is_active) in active.iter().enumerate() {
        let count: Expression = assign.column(c).iter().copied().sum();
        constraints.push(constraint!(count.clone() <= max * is_active));
        constraints.push(constraint!(count.clone() >= min * is_active));
        constraints.push(constraint!(count >= is_active));
    }

    let mut forbidden = Grid::from_elem((n_students, n_courses), false);
    let mut n_forbidden = 0;
    let mut objective = Expression::from(0.0);
    for ((s, c), &var) in assign.indexed_iter() {
        match penalty(instance.rank(s, c), config) {
            Some(p) => objective += f64::from(p) * var,
            None => {
                forbidden[[s, c]] = true;
                n_forbidden += 1;
                constraints.push(constraint!(var == 0.0));
            }
        }
    }
    info!(
        "Model has {} constraints, {} forbidden pairs",
        constraints.len(),
        n_forbidden
    );

    Model {
        variables,
        assign,
        active,
        objective,
        constraints,
        rules: Rules {
            courses_per_student: config.courses_per_student,
            min_students_per_course: config.min_students_per_course,
            max_students_per_course: config.max_students_per_course,
            forbidden,
        },
        too_few_courses: n_students > 0 && config.courses_per_student as usize > n_courses,
    }
}
