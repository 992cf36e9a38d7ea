//! Fehlertypen fuer Kanalchat
//!
//! Zentraler Fehler-Enum fuer Validierung und Konfiguration. Die
//! Laufzeit-Crates definieren eigene Fehler und konvertieren bei Bedarf.

use thiserror::Error;

/// Globaler Result-Alias fuer Kanalchat
pub type Result<T> = std::result::Result<T, KanalchatError>;

/// Alle Validierungs- und Konfigurationsfehler
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KanalchatError {
    #[error("Ungueltiger Kanalname: '{0}'")]
    UngueltigerKanalname(String),

    #[error("Port {0} liegt ausserhalb von 1024-65535")]
    UngueltigerPort(u16),

    #[error("Kapazitaet {0} liegt ausserhalb von 1-8")]
    UngueltigeKapazitaet(usize),

}
