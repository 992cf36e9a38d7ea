//! Start- und Konfigurationsfehler des Servers
//!
//! Jeder Fehler kennt seinen Exit-Code und die Zeile fuer stderr.

use kanalchat_core::KanalchatError;
use kanalchat_protocol::nachrichten;
use thiserror::Error;

/// Exit-Codes des Servers
pub mod exit_code {
    pub const VERWENDUNG: u8 = 4;
    pub const KONFIGURATION: u8 = 5;
    pub const PORT: u8 = 6;
    pub const INTERN: u8 = 1;
}

/// Fehler in der Kanaldatei oder den Server-Einstellungen
#[derive(Debug, Error)]
pub enum KonfigFehler {
    #[error("Kanaldatei '{pfad}' nicht lesbar: {quelle}")]
    Lesen {
        pfad: String,
        #[source]
        quelle: std::io::Error,
    },

    #[error("Kanaldatei ist leer")]
    Leer,

    #[error("Zeile {zeile}: {grund}")]
    Syntax { zeile: usize, grund: String },

    #[error("Zeile {zeile}: {quelle}")]
    Kanal {
        zeile: usize,
        #[source]
        quelle: KanalchatError,
    },

    #[error("Zeile {zeile}: Kanalname '{name}' doppelt")]
    DoppelterName { zeile: usize, name: String },

    #[error("Zeile {zeile}: Port {port} doppelt")]
    DoppelterPort { zeile: usize, port: u16 },

    #[error("Server-Einstellungen: {0}")]
    Einstellungen(String),
}

/// Alles was den Start des Servers verhindert
#[derive(Debug, Error)]
pub enum StartFehler {
    #[error("Ungueltige Argumente: {0}")]
    Verwendung(String),

    #[error(transparent)]
    Konfiguration(#[from] KonfigFehler),

    #[error("Port {port} nicht verfuegbar")]
    PortBelegt { port: u16 },

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl StartFehler {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Verwendung(_) => exit_code::VERWENDUNG,
            Self::Konfiguration(_) => exit_code::KONFIGURATION,
            Self::PortBelegt { .. } => exit_code::PORT,
            Self::Io(_) => exit_code::INTERN,
        }
    }

    /// Zeile fuer stderr
    pub fn meldung(&self) -> String {
        match self {
            Self::Verwendung(_) => nachrichten::SERVER_VERWENDUNG.to_string(),
            Self::Konfiguration(_) => nachrichten::UNGUELTIGE_KONFIGURATION.to_string(),
            Self::PortBelegt { port } => nachrichten::port_belegt(*port),
            Self::Io(e) => format!("Error: {e}"),
        }
    }
}
