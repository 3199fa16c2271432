//! Small shared helpers.

pub mod ids;
