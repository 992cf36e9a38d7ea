//! Kommandozeile: `chatserver [afk_time] config_file`
//!
//! clap sammelt die Positionsargumente, die eigentliche Pruefung
//! (Anzahl, AFK-Bereich) passiert in [`Cli::pruefen`], damit jeder Fehler
//! auf dieselbe Verwendungszeile und denselben Exit-Code fuehrt.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use kanalchat_core::{AFK_BEREICH_SEK, AFK_STANDARD_SEK};

use crate::error::StartFehler;

/// Log-Format auf der Kommandozeile
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogFormat {
    Text,
    Json,
}

impl CliLogFormat {
    pub fn als_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// chatserver – Mehrkanal-Chat ueber TCP
#[derive(Debug, Parser)]
#[command(name = "chatserver", version, about = "Kanalchat server")]
pub struct Cli {
    /// [afk_time] config_file
    #[arg(value_name = "ARGS", num_args = 1..=2, required = true, allow_negative_numbers = true)]
    pub argumente: Vec<String>,

    /// Log-Level (ueberschreibt die Einstellungsdatei)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log-Format (ueberschreibt die Einstellungsdatei)
    #[arg(long = "log-format", value_enum)]
    pub log_format: Option<CliLogFormat>,
}

/// Geprueftes Ergebnis der Kommandozeile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartArgumente {
    pub afk_sek: u64,
    pub kanal_datei: PathBuf,
}

impl Cli {
    pub fn pruefen(&self) -> Result<StartArgumente, StartFehler> {
        if self.argumente.iter().any(|a| a.trim().is_empty()) {
            return Err(StartFehler::Verwendung("leeres Argument".into()));
        }

        match self.argumente.as_slice() {
            [datei] => Ok(StartArgumente {
                afk_sek: AFK_STANDARD_SEK,
                kanal_datei: PathBuf::from(datei),
            }),
            [afk, datei] => Ok(StartArgumente {
                afk_sek: afk_parsen(afk)?,
                kanal_datei: PathBuf::from(datei),
            }),
            _ => Err(StartFehler::Verwendung("falsche Anzahl Argumente".into())),
        }
    }
}

fn afk_parsen(wert: &str) -> Result<u64, StartFehler> {
    if !wert.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StartFehler::Verwendung(format!("afk_time '{wert}' ist keine Zahl")));
    }
    match wert.parse::<u64>() {
        Ok(sek) if AFK_BEREICH_SEK.contains(&sek) => Ok(sek),
        _ => Err(StartFehler::Verwendung(format!(
            "afk_time '{wert}' ausserhalb von {}-{}",
            AFK_BEREICH_SEK.start(),
            AFK_BEREICH_SEK.end()
        ))),
    }
}
