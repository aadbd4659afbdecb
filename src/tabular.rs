//! Delimited preference tables.
//!
//! ```raw
//! ;Chess;Art;Football      <- first cell is a label, the rest are courses
//! Anna;1;;2                <- student name, then one rank cell per course
//! Ben;;1;
//! ```
//!
//! Blank or non-numeric rank cells carry no preference. They are dropped on
//! their own and never abort the parse.

use crate::data::{Atom, CourseIdx, Instance, Rank};
use crate::error::AssignmentError;
use crate::normalize::{COURSE_PREFIX, STUDENT_PREFIX, normalize};
use log::{debug, info, warn};
use std::collections::HashSet;

const BOM: char = '\u{feff}';

/// Picks the field delimiter from the first non-blank line.
///
/// Semicolon is the default. Comma wins only when it strictly outnumbers
/// semicolons; otherwise tab wins when it is at least as frequent as both.
pub fn detect_delimiter(text: &str) -> u8 {
    let first = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    let count = |ch: char| first.matches(ch).count();
    let (semis, commas, tabs) = (count(';'), count(','), count('\t'));

    if commas > 0 && commas > semis {
        b','
    } else if tabs > 0 && tabs >= semis.max(commas) {
        b'\t'
    } else {
        b';'
    }
}

/// Parses a preference table into an [`Instance`].
pub fn parse(text: &str) -> Result<Instance, AssignmentError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let delimiter = detect_delimiter(text);
    debug!("Detected delimiter {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(AssignmentError::InputFormat("input is empty".into())),
    };

    // (column in the file, course index) for every non-empty header cell
    let mut columns: Vec<(usize, CourseIdx)> = Vec::new();
    let mut courses = AtomSet::default();
    for (col, raw) in header.iter().enumerate().skip(1) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        columns.push((col, courses.len()));
        courses.insert(normalize(raw, COURSE_PREFIX), "course");
    }
    if columns.is_empty() {
        return Err(AssignmentError::InputFormat(
            "header has no course columns".into(),
        ));
    }

    let mut students = AtomSet::default();
    let mut edges = Vec::new();
    for (line, record) in records.enumerate() {
        let record = record?;
        let raw_name = record.get(0).unwrap_or("");
        if raw_name.trim().is_empty() {
            continue;
        }
        let student = students.len();
        students.insert(normalize(raw_name, STUDENT_PREFIX), "student");

        for &(col, course) in &columns {
            // short rows behave as if padded with blank cells
            let cell = record.get(col).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            match parse_rank(cell) {
                Some(rank) => edges.push((student, course, rank)),
                None => debug!(
                    "Row {}: ignoring malformed rank {:?} in column {}",
                    line + 2,
                    cell,
                    col + 1
                ),
            }
        }
    }

    let instance = Instance::new(students.into_atoms(), courses.into_atoms(), edges);
    info!(
        "Parsed {} students, {} courses, {} preferences",
        instance.students.len(),
        instance.courses.len(),
        instance.edges().count()
    );
    Ok(instance)
}

/// A rank is a positive integer; anything else is malformed.
fn parse_rank(cell: &str) -> Option<Rank> {
    let value: i64 = cell.parse().ok()?;
    if value <= 0 {
        return None;
    }
    Rank::try_from(value).ok()
}

/// Ordered atoms with collision handling: a repeated atom gets the first free
/// `_2`, `_3`, ... suffix so every row stays its own entity.
#[derive(Default)]
struct AtomSet {
    atoms: Vec<Atom>,
    seen: HashSet<String>,
}

impl AtomSet {
    fn len(&self) -> usize {
        self.atoms.len()
    }

    fn insert(&mut self, atom: String, kind: &str) {
        let mut unique = atom.clone();
        let mut n = 2;
        while self.seen.contains(&unique) {
            unique = format!("{atom}_{n}");
            n += 1;
        }
        if unique != atom {
            warn!("Duplicate {kind} {atom:?} renamed to {unique:?}");
        }
        self.seen.insert(unique.clone());
        self.atoms.push(Atom::from_normalized(unique));
    }

    fn into_atoms(self) -> Vec<Atom> {
        self.atoms
    }
}
