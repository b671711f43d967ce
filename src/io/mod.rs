//! Output formats for the step history.

pub mod export;
