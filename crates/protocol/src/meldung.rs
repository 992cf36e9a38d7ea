//! Erkennung von Servermeldungen auf der Clientseite
//!
//! Der Terminal-Client gibt fast alle Zeilen unveraendert aus, reagiert
//! aber auf einige Meldungen mit eigenem Verhalten (Dateiempfang,
//! Stummschaltung, Beenden).

/// Vom Client erkannte Servermeldung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMeldung {
    /// `Welcome to chatclient, <name>.`
    Willkommen,
    /// Benutzername im Kanal bereits vergeben
    BenutzerExistiert { kanal: String, benutzer: String },
    /// Server wartet auf Kopfzeile und Nutzlast
    UebertragungStarten,
    /// Ziel eines Befehls ist nicht im Kanal
    NichtImKanal { benutzer: String },
    /// Server kuendigt eine eingehende Datei an
    DateiAnkuendigung { basename: String, groesse: u64 },
    /// Eigene Stummschaltung
    Stummgeschaltet { sekunden: u64 },
    /// Gekickt oder Kanal geleert
    Entfernt,
    /// Jemand (evtl. man selbst) wurde wegen Inaktivitaet entfernt
    Afk { benutzer: String, kanal: String },
    /// Alles andere
    Sonstige,
}

const SERVER: &str = "[Server Message] ";

impl ServerMeldung {
    pub fn erkennen(zeile: &str) -> Self {
        let zeile = zeile.trim();

        if zeile.starts_with("Welcome to chatclient, ") && zeile.ends_with('.') {
            return Self::Willkommen;
        }

        let Some(inhalt) = zeile.strip_prefix(SERVER) else {
            return Self::Sonstige;
        };

        if zeile == crate::nachrichten::UEBERTRAGUNG_STARTEN {
            return Self::UebertragungStarten;
        }
        if zeile == crate::nachrichten::ENTFERNT {
            return Self::Entfernt;
        }

        if let Some(rest) = inhalt.strip_prefix("Channel \"") {
            if let Some((kanal, rest)) = rest.split_once("\" already has user ") {
                if let Some(benutzer) = rest.strip_suffix('.') {
                    return Self::BenutzerExistiert {
                        kanal: kanal.to_string(),
                        benutzer: benutzer.to_string(),
                    };
                }
            }
        }

        if let Some(rest) = inhalt.strip_prefix("FileSize ") {
            let teile: Vec<&str> = rest.split(' ').collect();
            if let [basename, groesse] = teile.as_slice() {
                if !basename.is_empty() && groesse.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(groesse) = groesse.parse() {
                        return Self::DateiAnkuendigung {
                            basename: basename.to_string(),
                            groesse,
                        };
                    }
                }
            }
        }

        if let Some(rest) = inhalt.strip_prefix("You have been muted for ") {
            if let Some(zahl) = rest.strip_suffix(" seconds.") {
                if let Ok(sekunden) = zahl.parse() {
                    return Self::Stummgeschaltet { sekunden };
                }
            }
        }

        if let Some(benutzer) = inhalt.strip_suffix(" is not in the channel.") {
            if !benutzer.is_empty() {
                return Self::NichtImKanal {
                    benutzer: benutzer.to_string(),
                };
            }
        }

        if let Some((benutzer, rest)) = inhalt.split_once(" went AFK in channel \"") {
            if let Some(kanal) = rest.strip_suffix("\".") {
                return Self::Afk {
                    benutzer: benutzer.to_string(),
                    kanal: kanal.to_string(),
                };
            }
        }

        Self::Sonstige
    }
}
