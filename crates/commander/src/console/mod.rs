//! Zeilenbasierte Operator-Konsole

pub mod parser;
pub mod reader;
