//! Client-Befehle
//!
//! Eine vom Client empfangene Textzeile wird in einen [`ClientBefehl`]
//! zerlegt. Fehlerhafte Argumente ergeben [`ProtokollFehler::Verwendung`]
//! mit der Verwendungszeile, die der Client angezeigt bekommt. Der Parser
//! wird sowohl vom Server als auch vom Terminal-Client benutzt.

/// Antworten des Clients waehrend einer Dateiuebertragung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMeldung {
    Bereit,
    Empfangen,
    Fehlgeschlagen,
}

impl ClientMeldung {
    pub const BEREIT: &'static str = "[Client Message] Ready";
    pub const EMPFANGEN: &'static str = "[Client Message] Received";
    pub const FEHLGESCHLAGEN: &'static str = "[Client Message] File Transfer Failed";

    pub fn erkennen(zeile: &str) -> Option<Self> {
        match zeile {
            Self::BEREIT => Some(Self::Bereit),
            Self::EMPFANGEN => Some(Self::Empfangen),
            Self::FEHLGESCHLAGEN => Some(Self::Fehlgeschlagen),
            _ => None,
        }
    }

    pub fn als_zeile(self) -> &'static str {
        match self {
            Self::Bereit => Self::BEREIT,
            Self::Empfangen => Self::EMPFANGEN,
            Self::Fehlgeschlagen => Self::FEHLGESCHLAGEN,
        }
    }
}

/// Geparster Client-Befehl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientBefehl {
    /// `/quit`
    Beenden,
    /// `/list`
    Liste,
    /// `/whisper <ziel> <text>`
    Fluestern { ziel: String, text: String },
    /// `/send <ziel> <pfad>`
    Senden { ziel: String, pfad: String },
    /// `/switch <kanal>`
    Wechseln { kanal: String },
    /// Quittung waehrend einer Dateiuebertragung
    Meldung(ClientMeldung),
    /// Gewoehnliche Chat-Zeile
    Chat(String),
    /// Leere Zeile (wird ignoriert)
    Leer,
}

/// Fehlerhafte Befehlsargumente
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtokollFehler {
    #[error("{verwendung}")]
    Verwendung {
        befehl: &'static str,
        verwendung: &'static str,
    },
}

impl ProtokollFehler {
    /// Die Zeile die an den Client geht
    pub fn verwendung(&self) -> &'static str {
        match self {
            Self::Verwendung { verwendung, .. } => verwendung,
        }
    }
}

pub const VERWENDUNG_QUIT: &str = "[Server Message] Usage: /quit";
pub const VERWENDUNG_LIST: &str = "[Server Message] Usage: /list";
pub const VERWENDUNG_WHISPER: &str =
    "[Server Message] Usage: /whisper receiver_client_username chat_message";
pub const VERWENDUNG_SEND: &str = "[Server Message] Usage: /send target_client_username file_path";
pub const VERWENDUNG_SWITCH: &str = "[Server Message] Usage: /switch channel_name";

fn verwendung(befehl: &'static str, verwendung: &'static str) -> ProtokollFehler {
    ProtokollFehler::Verwendung { befehl, verwendung }
}

/// Ein Token muss aus druckbaren ASCII-Zeichen ohne Leerzeichen bestehen
pub fn token_gueltig(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| (0x21..=0x7e).contains(&b))
}

impl ClientBefehl {
    /// Zerlegt eine empfangene Zeile (ohne Zeilenende)
    pub fn parsen(zeile: &str) -> Result<Self, ProtokollFehler> {
        let zeile = zeile.trim_end_matches(&['\r', '\n'][..]);

        if zeile.trim().is_empty() {
            return Ok(Self::Leer);
        }

        if let Some(meldung) = ClientMeldung::erkennen(zeile.trim()) {
            return Ok(Self::Meldung(meldung));
        }

        let (kopf, rest) = match zeile.split_once(' ') {
            Some((kopf, rest)) => (kopf, Some(rest)),
            None => (zeile, None),
        };

        match kopf {
            "/quit" => match rest {
                None => Ok(Self::Beenden),
                Some(_) => Err(verwendung("/quit", VERWENDUNG_QUIT)),
            },
            "/list" => match rest {
                None => Ok(Self::Liste),
                Some(_) => Err(verwendung("/list", VERWENDUNG_LIST)),
            },
            "/whisper" => {
                let fehler = || verwendung("/whisper", VERWENDUNG_WHISPER);
                let rest = rest.ok_or_else(fehler)?.trim_start();
                let (ziel, text) = rest.split_once(' ').ok_or_else(fehler)?;
                let text = text.trim();
                if !token_gueltig(ziel) || text.is_empty() {
                    return Err(fehler());
                }
                Ok(Self::Fluestern {
                    ziel: ziel.to_string(),
                    text: text.to_string(),
                })
            }
            "/send" => {
                let fehler = || verwendung("/send", VERWENDUNG_SEND);
                let teile: Vec<&str> = rest.ok_or_else(fehler)?.split_whitespace().collect();
                match teile.as_slice() {
                    [ziel, pfad] if token_gueltig(ziel) && token_gueltig(pfad) => {
                        Ok(Self::Senden {
                            ziel: ziel.to_string(),
                            pfad: pfad.to_string(),
                        })
                    }
                    _ => Err(fehler()),
                }
            }
            "/switch" => {
                let fehler = || verwendung("/switch", VERWENDUNG_SWITCH);
                match rest {
                    Some(kanal) if token_gueltig(kanal) => Ok(Self::Wechseln {
                        kanal: kanal.to_string(),
                    }),
                    _ => Err(fehler()),
                }
            }
            _ => Ok(Self::Chat(zeile.trim().to_string())),
        }
    }
}
