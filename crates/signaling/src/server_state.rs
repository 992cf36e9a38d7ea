//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt die Konfiguration, alle Kanaele und die Operator-Konsole als
//! Arc-Referenzen, die zwischen tokio-Tasks geteilt werden.

use kanalchat_core::{KanalBeschreibung, AFK_STANDARD_SEK};
use kanalchat_protocol::wire::{STANDARD_MAX_DATEIGROESSE, STANDARD_MAX_ZEILENLAENGE};
use std::sync::Arc;
use std::time::Duration;

use crate::channel::Kanal;
use crate::connection::STANDARD_MAX_RUECKSTAND;
use crate::console::Konsole;
use crate::error::{SignalingError, SignalingResult};

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Inaktivitaet bis zur AFK-Entfernung
    pub afk_dauer: Duration,
    /// Maximale Zeilenlaenge in Bytes
    pub max_zeilenlaenge: usize,
    /// Maximale Dateigroesse fuer `/send` in Bytes
    pub max_dateigroesse: u64,
    /// Stummschaltung auch serverseitig durchsetzen
    pub stumm_erzwingen: bool,
    /// Grenze fuer Inbox und zurueckgehaltene Zeilen je Sitzung
    pub max_rueckstand: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            afk_dauer: Duration::from_secs(AFK_STANDARD_SEK),
            max_zeilenlaenge: STANDARD_MAX_ZEILENLAENGE,
            max_dateigroesse: STANDARD_MAX_DATEIGROESSE,
            stumm_erzwingen: false,
            max_rueckstand: STANDARD_MAX_RUECKSTAND,
        }
    }
}

/// Gemeinsamer Server-Zustand (Kanal-Registry)
///
/// Die Kanaele entstehen einmal beim Start und leben bis zum Prozessende.
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Kanaele in Konfigurationsreihenfolge
    kanaele: Vec<Arc<Kanal>>,
    /// Operator-Konsole
    pub konsole: Konsole,
}

impl SignalingState {
    /// Erstellt den Zustand aus validierten Kanalbeschreibungen
    pub fn neu(
        config: SignalingConfig,
        beschreibungen: Vec<KanalBeschreibung>,
        konsole: Konsole,
    ) -> Arc<Self> {
        let kanaele = beschreibungen
            .into_iter()
            .map(|b| Arc::new(Kanal::neu(b, konsole.clone())))
            .collect();
        Arc::new(Self {
            config: Arc::new(config),
            kanaele,
            konsole,
        })
    }

    pub fn kanaele(&self) -> &[Arc<Kanal>] {
        &self.kanaele
    }

    pub fn kanal_finden(&self, name: &str) -> Option<Arc<Kanal>> {
        self.kanaele.iter().find(|k| k.name() == name).cloned()
    }

    /// Wie `kanal_finden`, aber mit Fehler fuer unbekannte Namen
    pub fn kanal(&self, name: &str) -> SignalingResult<Arc<Kanal>> {
        self.kanal_finden(name)
            .ok_or_else(|| SignalingError::KanalUnbekannt(name.to_string()))
    }

    /// Antwortzeilen fuer `/list`
    pub fn kanal_liste(&self) -> Vec<String> {
        self.kanaele.iter().map(|k| k.status().zeile()).collect()
    }
}
