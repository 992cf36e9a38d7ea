//! kanalchat-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Kanalchat-Crates gemeinsam genutzt werden: validierte
//! Kanal-Beschreibungen, Session-IDs und den zentralen Fehlertyp.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{KanalchatError, Result};
pub use types::{
    benutzername_gueltig, KanalBeschreibung, KanalName, SessionId, AFK_BEREICH_SEK,
    AFK_STANDARD_SEK, MAX_KAPAZITAET, MIN_KAPAZITAET, MIN_PORT,
};
