//! Operator-Befehle und ihre Ausfuehrung

pub mod executor;
pub mod types;
