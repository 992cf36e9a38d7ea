//! # kanalchat-observability
//!
//! Structured Logging (Text oder JSON) via tracing-subscriber.
//! Logs gehen nach stderr, stdout gehoert der Operator-Konsole bzw. dem
//! Chat-Client.

pub mod logging;

pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren};
