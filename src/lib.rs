//! Assigns students to courses so that everyone gets a fixed number of
//! courses, every course is either closed or filled within its enrollment
//! window, and the summed preference penalty is as small as possible.
//!
//! Input is a preference table ([`tabular`]) or fact lines ([`facts`]);
//! [`model`] turns it into a MILP, [`solver`] runs HiGHS on it and
//! [`report`] renders the result. [`pipeline`] chains all of them.

pub mod cli;
pub mod data;
pub mod error;
pub mod facts;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod solver;
pub mod tabular;
