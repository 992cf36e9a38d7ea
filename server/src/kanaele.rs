//! Kanaldatei: eine Zeile `channel <name> <port> <capacity>` pro Kanal
//!
//! Jede Zeile wird an den Raendern getrimmt und an einzelnen Leerzeichen
//! getrennt. Die Datei ist ungueltig, sobald eine Zeile nicht passt; es
//! gibt keine Kommentare und keine Leerzeilen.

use std::collections::HashSet;
use std::path::Path;

use kanalchat_core::KanalBeschreibung;

use crate::error::KonfigFehler;

const SCHLUESSELWORT: &str = "channel";

/// Liest und validiert die Kanaldatei
pub fn kanaele_laden(pfad: &Path) -> Result<Vec<KanalBeschreibung>, KonfigFehler> {
    let inhalt = std::fs::read_to_string(pfad).map_err(|quelle| KonfigFehler::Lesen {
        pfad: pfad.display().to_string(),
        quelle,
    })?;
    kanaele_parsen(&inhalt)
}

/// Validiert den Inhalt einer Kanaldatei
pub fn kanaele_parsen(inhalt: &str) -> Result<Vec<KanalBeschreibung>, KonfigFehler> {
    if inhalt.is_empty() {
        return Err(KonfigFehler::Leer);
    }

    let mut kanaele: Vec<KanalBeschreibung> = Vec::new();
    let mut namen = HashSet::new();
    let mut ports = HashSet::new();

    for (index, zeile) in inhalt.lines().enumerate() {
        let nr = index + 1;
        let tokens: Vec<&str> = zeile.trim().split(' ').collect();
        let [schluessel, name, port, kapazitaet] = tokens.as_slice() else {
            return Err(syntax(nr, format!("{} statt 4 Felder", tokens.len())));
        };
        if *schluessel != SCHLUESSELWORT {
            return Err(syntax(nr, format!("'{schluessel}' statt '{SCHLUESSELWORT}'")));
        }

        let port = zahl(nr, "Port", port)?;
        let port = u16::try_from(port).map_err(|_| syntax(nr, format!("Port {port} zu gross")))?;
        let kapazitaet = zahl(nr, "Kapazitaet", kapazitaet)?;
        let kapazitaet = usize::try_from(kapazitaet)
            .map_err(|_| syntax(nr, format!("Kapazitaet {kapazitaet} zu gross")))?;

        let kanal = KanalBeschreibung::neu(name, port, kapazitaet)
            .map_err(|quelle| KonfigFehler::Kanal { zeile: nr, quelle })?;

        if !namen.insert(kanal.name.as_str().to_string()) {
            return Err(KonfigFehler::DoppelterName {
                zeile: nr,
                name: kanal.name.to_string(),
            });
        }
        if !ports.insert(kanal.port) {
            return Err(KonfigFehler::DoppelterPort {
                zeile: nr,
                port: kanal.port,
            });
        }
        kanaele.push(kanal);
    }

    Ok(kanaele)
}

/// Nur Ziffern, kein Vorzeichen
fn zahl(nr: usize, feld: &str, wert: &str) -> Result<u64, KonfigFehler> {
    if wert.is_empty() || !wert.bytes().all(|b| b.is_ascii_digit()) {
        return Err(syntax(nr, format!("{feld} '{wert}' ist keine Zahl")));
    }
    wert.parse()
        .map_err(|_| syntax(nr, format!("{feld} '{wert}' zu gross")))
}

fn syntax(zeile: usize, grund: String) -> KonfigFehler {
    KonfigFehler::Syntax { zeile, grund }
}
