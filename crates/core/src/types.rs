//! Gemeinsame Typen fuer Kanalchat
//!
//! Kanal-Beschreibungen werden genau einmal beim Start validiert. Alle
//! nachgelagerten Crates duerfen sich auf die Invarianten verlassen:
//! Name aus `[A-Za-z0-9_]`, Port 1024-65535, Kapazitaet 1-8.

use uuid::Uuid;

use crate::error::{KanalchatError, Result};

/// Kleinster erlaubter Kanal-Port
pub const MIN_PORT: u16 = 1024;

/// Kleinste erlaubte Kanal-Kapazitaet
pub const MIN_KAPAZITAET: usize = 1;

/// Groesste erlaubte Kanal-Kapazitaet
pub const MAX_KAPAZITAET: usize = 8;

/// Standard-AFK-Zeit in Sekunden
pub const AFK_STANDARD_SEK: u64 = 100;

/// Erlaubter Bereich der AFK-Zeit in Sekunden
pub const AFK_BEREICH_SEK: std::ops::RangeInclusive<u64> = 1..=1000;

/// Eindeutige Session-ID (eine pro angenommener Verbindung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Validierter Kanalname (nur Buchstaben, Ziffern und Unterstrich)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KanalName(String);

impl KanalName {
    /// Validiert und erstellt einen Kanalnamen
    pub fn neu(name: &str) -> Result<Self> {
        let gueltig = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if gueltig {
            Ok(Self(name.to_string()))
        } else {
            Err(KanalchatError::UngueltigerKanalname(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KanalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validierte Beschreibung eines Kanals (Name, Port, Kapazitaet)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KanalBeschreibung {
    pub name: KanalName,
    pub port: u16,
    pub kapazitaet: usize,
}

impl KanalBeschreibung {
    /// Validiert alle drei Felder und erstellt die Beschreibung
    pub fn neu(name: &str, port: u16, kapazitaet: usize) -> Result<Self> {
        let name = KanalName::neu(name)?;
        if port < MIN_PORT {
            return Err(KanalchatError::UngueltigerPort(port));
        }
        if !(MIN_KAPAZITAET..=MAX_KAPAZITAET).contains(&kapazitaet) {
            return Err(KanalchatError::UngueltigeKapazitaet(kapazitaet));
        }
        Ok(Self {
            name,
            port,
            kapazitaet,
        })
    }
}

/// Prueft einen Benutzernamen: nicht leer, nur druckbares ASCII ohne Leerzeichen
pub fn benutzername_gueltig(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (0x21..=0x7e).contains(&b))
}
