//! Fehler- und Endzustaende des Clients mit ihren Exit-Codes

use kanalchat_protocol::nachrichten;
use thiserror::Error;

/// Fehler vor oder waehrend der Sitzung
#[derive(Debug, Error)]
pub enum ClientFehler {
    #[error("Ungueltige Argumente")]
    Verwendung,

    /// Port ungueltig oder Verbindung abgelehnt; enthaelt die Eingabe wie getippt
    #[error("Keine Verbindung zu Port {0}")]
    Verbindung(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientFehler {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Verwendung => 3,
            Self::Verbindung(_) => 7,
            Self::Io(_) => 1,
        }
    }

    /// Zeile fuer stderr
    pub fn meldung(&self) -> String {
        match self {
            Self::Verwendung => nachrichten::CLIENT_VERWENDUNG.to_string(),
            Self::Verbindung(port) => nachrichten::verbindung_fehlgeschlagen(port),
            Self::Io(e) => format!("Error: {e}"),
        }
    }
}

/// Wie eine Sitzung geendet hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ende {
    /// `/quit`
    Beendet,
    /// Gekickt oder Kanal geleert
    Entfernt,
    /// Wegen Inaktivitaet entfernt
    Afk,
    /// Benutzername im Kanal schon vergeben
    BenutzerExistiert,
    /// Server hat die Verbindung unerwartet geschlossen
    VerbindungGeschlossen,
}

impl Ende {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Beendet | Self::Entfernt | Self::Afk => 0,
            Self::BenutzerExistiert => 2,
            Self::VerbindungGeschlossen => 8,
        }
    }

    /// Zeile fuer stderr, falls eine ausgegeben wird
    pub fn meldung(self) -> Option<&'static str> {
        match self {
            Self::VerbindungGeschlossen => Some(nachrichten::VERBINDUNG_GESCHLOSSEN),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(ClientFehler::Verwendung.exit_code(), 3);
        assert_eq!(ClientFehler::Verbindung("80".into()).exit_code(), 7);
        assert_eq!(Ende::Entfernt.exit_code(), 0);
        assert_eq!(Ende::Afk.exit_code(), 0);
        assert_eq!(Ende::BenutzerExistiert.exit_code(), 2);
        assert_eq!(Ende::VerbindungGeschlossen.exit_code(), 8);
    }

    #[test]
    fn meldungen() {
        assert_eq!(
            ClientFehler::Verbindung("abc".into()).meldung(),
            "Error: Unable to connect to port abc."
        );
        assert_eq!(
            Ende::VerbindungGeschlossen.meldung(),
            Some("Error: server connection closed.")
        );
        assert_eq!(Ende::Beendet.meldung(), None);
    }
}
