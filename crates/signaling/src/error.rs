//! Fehlertypen fuer den Signaling-Service

use kanalchat_protocol::{nachrichten, CodecFehler};
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Fehler im Zeilenprotokoll
    #[error("Codec-Fehler: {0}")]
    Codec(#[from] CodecFehler),

    /// Port konnte nicht gebunden werden
    #[error("Port {port} konnte nicht gebunden werden: {quelle}")]
    PortBelegt {
        port: u16,
        #[source]
        quelle: std::io::Error,
    },

    /// Kanal mit diesem Namen existiert nicht
    #[error("Kanal existiert nicht: {0}")]
    KanalUnbekannt(String),

    /// Benutzer ist nicht verbunden
    #[error("Benutzer nicht im Kanal: {0}")]
    NichtImKanal(String),

    /// Benutzername im Kanal bereits vergeben
    #[error("Kanal {kanal} hat bereits Benutzer {benutzer}")]
    BenutzerExistiert { kanal: String, benutzer: String },

    /// Datei an sich selbst
    #[error("Datei an sich selbst")]
    NichtAnSichSelbst,

    /// Dateiuebertragung fehlgeschlagen
    #[error("Uebertragung von {pfad} an {ziel} fehlgeschlagen")]
    Uebertragung { pfad: String, ziel: String },

    /// Client liest nicht schnell genug, ein Puffer ist voll
    #[error("{puffer} voll, Client zu langsam")]
    Ueberlastet { puffer: &'static str },
}

impl SignalingError {
    /// Meldungszeile fuer den Client oder die Konsole
    ///
    /// `None` fuer Fehler, die nur geloggt werden.
    pub fn meldung(&self) -> Option<String> {
        match self {
            Self::KanalUnbekannt(kanal) => Some(nachrichten::kanal_existiert_nicht(kanal)),
            Self::NichtImKanal(benutzer) => Some(nachrichten::nicht_im_kanal(benutzer)),
            Self::BenutzerExistiert { kanal, benutzer } => {
                Some(nachrichten::benutzer_existiert(kanal, benutzer))
            }
            Self::NichtAnSichSelbst => Some(nachrichten::NICHT_AN_DICH_SELBST.to_string()),
            Self::Uebertragung { pfad, ziel } => {
                Some(nachrichten::senden_fehlgeschlagen(pfad, ziel))
            }
            _ => None,
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
