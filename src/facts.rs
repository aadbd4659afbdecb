//! Line-oriented fact form.
//!
//! ```raw
//! % comment
//! course(chess).
//! student(anna).
//! preference(anna, chess, 1).
//! courses_per_student(1).
//! max_student_per_course(30).
//! min_student_per_course(10).
//! hard_enforced_preference(false).
//! ```
//!
//! Each line is read into a typed [`Fact`]. Blank lines and lines starting
//! with `%` or `#` are skipped, anything else that does not fit the grammar
//! is logged and skipped.

use crate::data::{Atom, Config, ConfigOverrides, Instance, Rank};
use crate::error::AssignmentError;
use crate::normalize::{COURSE_PREFIX, STUDENT_PREFIX, normalize_atom};
use itertools::Itertools;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// One recognized fact line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    Course(String),
    Student(String),
    Preference {
        student: String,
        course: String,
        rank: Rank,
    },
    CoursesPerStudent(u32),
    MaxStudentsPerCourse(u32),
    MinStudentsPerCourse(u32),
    HardEnforcedPreference(bool),
}

/// A line that is neither blank, a comment, nor a known fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedLine(pub String);

impl fmt::Display for UnrecognizedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized fact line {:?}", self.0)
    }
}

impl std::error::Error for UnrecognizedLine {}

impl FromStr for Fact {
    type Err = UnrecognizedLine;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fail = || UnrecognizedLine(line.to_string());

        let body = line.trim().strip_suffix('.').ok_or_else(fail)?.trim_end();
        let (name, rest) = body.split_once('(').ok_or_else(fail)?;
        let args: Vec<&str> = rest
            .strip_suffix(')')
            .ok_or_else(fail)?
            .split(',')
            .map(str::trim)
            .collect();
        if args.iter().any(|a| a.is_empty()) {
            return Err(fail());
        }

        let number = |s: &str| s.parse::<u32>().map_err(|_| fail());

        let fact = match (name.trim(), args.as_slice()) {
            ("course", [id]) => Fact::Course(id.to_string()),
            ("student", [id]) => Fact::Student(id.to_string()),
            ("preference", [student, course, rank]) => {
                let rank = number(*rank)?;
                if rank == 0 {
                    return Err(fail());
                }
                Fact::Preference {
                    student: student.to_string(),
                    course: course.to_string(),
                    rank,
                }
            }
            ("courses_per_student", [n]) => Fact::CoursesPerStudent(number(*n)?),
            ("max_student_per_course", [n]) => Fact::MaxStudentsPerCourse(number(*n)?),
            ("min_student_per_course", [n]) => Fact::MinStudentsPerCourse(number(*n)?),
            ("hard_enforced_preference", ["true"]) => Fact::HardEnforcedPreference(true),
            ("hard_enforced_preference", ["false"]) => Fact::HardEnforcedPreference(false),
            _ => return Err(fail()),
        };
        Ok(fact)
    }
}

/// Instance and configuration declarations read from fact form.
#[derive(Debug, Clone)]
pub struct FactInput {
    pub instance: Instance,
    /// Declared settings, to be layered over the defaults.
    pub declared: ConfigOverrides,
}

fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with('%') || line.starts_with('#')
}

/// Parses fact-form text. Identifiers are normalized like tabular names, and
/// repeated declarations refer to the same entity.
pub fn parse(text: &str) -> Result<FactInput, AssignmentError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(AssignmentError::InputFormat("input is empty".into()));
    }

    let mut students: Vec<Atom> = Vec::new();
    let mut courses: Vec<Atom> = Vec::new();
    let mut raw_preferences = Vec::new();
    let mut declared = ConfigOverrides::default();

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if is_skippable(line) {
            continue;
        }
        let fact = match line.parse::<Fact>() {
            Ok(fact) => fact,
            Err(e) => {
                debug!("Line {}: skipping {e}", n + 1);
                continue;
            }
        };
        match fact {
            Fact::Course(id) => {
                let atom = normalize_atom(&id, COURSE_PREFIX);
                if !courses.contains(&atom) {
                    courses.push(atom);
                }
            }
            Fact::Student(id) => {
                let atom = normalize_atom(&id, STUDENT_PREFIX);
                if !students.contains(&atom) {
                    students.push(atom);
                }
            }
            Fact::Preference {
                student,
                course,
                rank,
            } => raw_preferences.push((
                normalize_atom(&student, STUDENT_PREFIX),
                normalize_atom(&course, COURSE_PREFIX),
                rank,
            )),
            Fact::CoursesPerStudent(v) => declared.courses_per_student = Some(v),
            Fact::MaxStudentsPerCourse(v) => declared.max_students_per_course = Some(v),
            Fact::MinStudentsPerCourse(v) => declared.min_students_per_course = Some(v),
            Fact::HardEnforcedPreference(v) => declared.hard_enforced_preference = Some(v),
        }
    }

    if courses.is_empty() {
        return Err(AssignmentError::InputFormat("no course declarations".into()));
    }

    let student_idx: HashMap<&Atom, usize> =
        students.iter().enumerate().map(|(i, a)| (a, i)).collect();
    let course_idx: HashMap<&Atom, usize> =
        courses.iter().enumerate().map(|(i, a)| (a, i)).collect();

    let mut edges = Vec::with_capacity(raw_preferences.len());
    for (student, course, rank) in &raw_preferences {
        match (student_idx.get(student), course_idx.get(course)) {
            (Some(&s), Some(&c)) => edges.push((s, c, *rank)),
            _ => debug!("Skipping preference of undeclared pair ({student}, {course})"),
        }
    }

    let instance = Instance::new(students, courses, edges);
    info!(
        "Parsed {} students, {} courses, {} preferences from facts",
        instance.students.len(),
        instance.courses.len(),
        instance.edges().count()
    );
    Ok(FactInput { instance, declared })
}

/// Writes `instance` in fact form, optionally preceded by the model settings
/// of `config`.
pub fn export(instance: &Instance, config: Option<&Config>) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    if let Some(cfg) = config {
        let _ = writeln!(out, "courses_per_student({}).", cfg.courses_per_student);
        let _ = writeln!(out, "max_student_per_course({}).", cfg.max_students_per_course);
        let _ = writeln!(out, "min_student_per_course({}).", cfg.min_students_per_course);
        let _ = writeln!(out, "hard_enforced_preference({}).", cfg.hard_enforced_preference);
        out.push('\n');
    }

    let courses = instance.courses.iter().map(|c| format!("course({c}).")).join("\n");
    let students = instance.students.iter().map(|s| format!("student({s}).")).join("\n");
    let preferences = instance
        .edges()
        .map(|(s, c, rank)| {
            format!(
                "preference({}, {}, {rank}).",
                instance.students[s], instance.courses[c]
            )
        })
        .join("\n");

    let _ = writeln!(out, "{courses}\n\n{students}\n\n{preferences}");
    out
}
