//! kanalchat-commander – Operator-Konsole fuer den Kanalchat Server
//!
//! Liest Befehle zeilenweise (im Server: stdin), validiert sie und fuehrt
//! sie gegen den [`kanalchat_signaling::SignalingState`] aus:
//! - `/kick channel_name client_username`
//! - `/mute channel_name client_username duration`
//! - `/empty channel_name`
//! - `/shutdown`
//!
//! Alle Ausgaben gehen an die Operator-[`kanalchat_signaling::Konsole`].

pub mod commands;
pub mod console;
pub mod error;

pub use commands::executor::BefehlsAusfuehrer;
pub use commands::types::{Ausfuehrung, OperatorBefehl};
pub use console::parser::zeile_parsen;
pub use console::reader::konsole_lesen;
pub use error::{CommanderError, CommanderResult};
