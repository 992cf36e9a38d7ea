//! Server-Einstellungen
//!
//! Optional aus einer TOML-Datei geladen (Pfad aus `KANALCHAT_CONFIG`,
//! Standard `kanalchat.toml`). Alle Felder haben Standardwerte, sodass der
//! Server ohne Einstellungsdatei lauffaehig ist. Die Kanaele selbst stehen
//! in der Kanaldatei von der Kommandozeile (siehe [`crate::kanaele`]).

use std::net::IpAddr;
use std::time::Duration;

use kanalchat_protocol::wire::{STANDARD_MAX_DATEIGROESSE, STANDARD_MAX_ZEILENLAENGE};
use kanalchat_signaling::{SignalingConfig, STANDARD_MAX_RUECKSTAND};
use serde::{Deserialize, Serialize};

use crate::error::KonfigFehler;

/// Umgebungsvariable fuer den Pfad der Einstellungsdatei
pub const ENV_CONFIG: &str = "KANALCHAT_CONFIG";
pub const STANDARD_CONFIG_PFAD: &str = "kanalchat.toml";

/// Vollstaendige Server-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Sitzungs- und Uebertragungslimits
    pub sitzung: SitzungsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer alle Kanal-Ports
    pub bind_adresse: String,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
        }
    }
}

/// Sitzungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungsEinstellungen {
    /// Maximale Laenge einer Textzeile in Bytes
    pub max_zeilenlaenge: usize,
    /// Maximale Dateigroesse fuer `/send` in Bytes
    pub max_dateigroesse: u64,
    /// Stummschaltung zusaetzlich serverseitig durchsetzen
    pub stumm_erzwingen: bool,
    /// Unzugestellte Zeilen je Sitzung, bevor ein langsamer Client getrennt wird
    pub max_rueckstand: usize,
}

impl Default for SitzungsEinstellungen {
    fn default() -> Self {
        Self {
            max_zeilenlaenge: STANDARD_MAX_ZEILENLAENGE,
            max_dateigroesse: STANDARD_MAX_DATEIGROESSE,
            stumm_erzwingen: false,
            max_rueckstand: STANDARD_MAX_RUECKSTAND,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Einstellungen aus einer TOML-Datei.
    /// Gibt die Standardeinstellungen zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    pfad = pfad,
                    "Einstellungsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Einstellungsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Pfad aus `KANALCHAT_CONFIG` oder Standard
    pub fn pfad_aus_env() -> String {
        std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_CONFIG_PFAD.into())
    }

    /// Prueft die Werte, die TOML allein nicht absichert
    pub fn pruefen(&self) -> Result<(), KonfigFehler> {
        self.bind_ip()?;
        if self.sitzung.max_zeilenlaenge == 0 {
            return Err(KonfigFehler::Einstellungen(
                "sitzung.max_zeilenlaenge muss groesser 0 sein".into(),
            ));
        }
        if self.sitzung.max_rueckstand == 0 {
            return Err(KonfigFehler::Einstellungen(
                "sitzung.max_rueckstand muss groesser 0 sein".into(),
            ));
        }
        if !kanalchat_observability::log_format_gueltig(&self.logging.format) {
            return Err(KonfigFehler::Einstellungen(format!(
                "logging.format '{}' unbekannt",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn bind_ip(&self) -> Result<IpAddr, KonfigFehler> {
        self.netzwerk.bind_adresse.parse().map_err(|_| {
            KonfigFehler::Einstellungen(format!(
                "netzwerk.bind_adresse '{}' ist keine IP-Adresse",
                self.netzwerk.bind_adresse
            ))
        })
    }

    /// Laufzeit-Konfiguration fuer die Sitzungen
    pub fn signaling_config(&self, afk_sek: u64) -> SignalingConfig {
        SignalingConfig {
            afk_dauer: Duration::from_secs(afk_sek),
            max_zeilenlaenge: self.sitzung.max_zeilenlaenge,
            max_dateigroesse: self.sitzung.max_dateigroesse,
            stumm_erzwingen: self.sitzung.stumm_erzwingen,
            max_rueckstand: self.sitzung.max_rueckstand,
        }
    }
}
