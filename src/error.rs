use std::fmt;

/// Everything that can stop an assignment run before a report is produced.
///
/// Malformed rank cells never show up here: they are dropped where they are
/// read. An infeasible model is not an error either, it is a
/// [`SolveStatus`](crate::data::SolveStatus).
#[derive(Debug)]
pub enum AssignmentError {
    /// The input file could not be read.
    Io(std::io::Error),
    /// The input is empty or has no usable course columns.
    InputFormat(String),
    /// A configuration value outside the range the model accepts.
    InvalidConfig(String),
    /// The solver failed in a way that is not a normal status.
    Solver(String),
}

impl fmt::Display for AssignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InputFormat(msg) => write!(f, "Input format error: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            Self::Solver(msg) => write!(f, "Solver failure: {msg}"),
        }
    }
}

impl std::error::Error for AssignmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AssignmentError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for AssignmentError {
    fn from(e: csv::Error) -> Self {
        Self::InputFormat(format!("unreadable CSV record: {e}"))
    }
}

impl AssignmentError {
    /// Whether the caller can fix this by changing the input or settings.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, Self::InputFormat(_) | Self::InvalidConfig(_))
    }
}
