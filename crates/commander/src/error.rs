//! Fehlertypen fuer den Kanalchat Commander

use thiserror::Error;

/// Alle moeglichen Fehler im Commander-Crate
#[derive(Debug, Error)]
pub enum CommanderError {
    /// Befehl erkannt, Argumente passen nicht; enthaelt die Verwendungszeile
    #[error("{0}")]
    Verwendung(&'static str),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type CommanderResult<T> = Result<T, CommanderError>;

impl CommanderError {
    /// Zeile fuer die Operator-Konsole, falls der Fehler dort erscheinen soll
    pub fn konsolen_zeile(&self) -> Option<&'static str> {
        match self {
            Self::Verwendung(zeile) => Some(zeile),
            Self::Io(_) => None,
        }
    }
}
