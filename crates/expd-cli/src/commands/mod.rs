//! Command implementations for the expd CLI.
//!
//! - [`start`] - run the controller until Ctrl+C
//! - [`check`] - one-shot compatibility validation
//!
//! Each command provides an `execute` function that takes the parsed
//! command arguments and returns a Result.

pub mod check;
pub mod start;

pub use check::execute as check_execute;
pub use start::execute as start_execute;
