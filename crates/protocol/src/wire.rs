//! Wire-Format fuer TCP-Verbindungen
//!
//! Zeilenbasiertes Protokoll: jede Nachricht ist eine UTF-8-Zeile mit
//! abschliessendem `\n` (ein optionales `\r` davor wird entfernt).
//! Dateien werden laengenpraefixiert eingebettet:
//!
//! ```text
//! [FileSize] <n>\n
//! <genau n rohe Bytes>
//! ```
//!
//! Der Server-Codec erkennt die Kopfzeile selbst und liefert danach genau
//! `n` Bytes als [`Eingang::Datei`]. Der Client-Codec wechselt nur auf
//! ausdruecklichen Aufruf von [`ZeilenCodec::roh_erwarten`] in den Rohmodus,
//! weil die Dateiankuendigung des Servers erst quittiert werden muss.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Zeilenlaenge (ohne `\n`)
pub const STANDARD_MAX_ZEILENLAENGE: usize = 8192;

/// Standard-maximale Dateigroesse (64 MiB)
pub const STANDARD_MAX_DATEIGROESSE: u64 = 64 * 1024 * 1024;

/// Praefix der Dateikopfzeile vom sendenden Client
pub const DATEIKOPF_PRAEFIX: &str = "[FileSize] ";

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Codec-Fehler: Protokollverletzung oder IO-Fehler
#[derive(Debug, thiserror::Error)]
pub enum CodecFehler {
    #[error("Zeile ueberschreitet die maximale Laenge ({max} Bytes)")]
    ZeileZuLang { max: usize },

    #[error("Verbindung waehrend Datenuebertragung getrennt ({fehlend} Bytes fehlen)")]
    UebertragungAbgebrochen { fehlend: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Eingehende Einheit aus dem Byte-Strom
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eingang {
    /// Eine Textzeile ohne Zeilenende
    Zeile(String),
    /// Vollstaendige Nutzlast nach einer Dateikopfzeile
    Datei(Bytes),
    /// Nutzlast ueberschritt das Limit und wurde verworfen
    DateiVerworfen { groesse: u64 },
}

/// Ausgehende Einheit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ausgang {
    /// Textzeile, der Codec haengt `\n` an
    Zeile(String),
    /// Rohe Bytes ohne Rahmen
    Daten(Bytes),
}

impl Ausgang {
    /// Kurzform fuer eine Textzeile
    pub fn zeile(text: impl Into<String>) -> Self {
        Self::Zeile(text.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modus {
    Zeile,
    Roh { verbleibend: usize },
    Verwerfen { verbleibend: u64, gesamt: u64 },
}

// ---------------------------------------------------------------------------
// ZeilenCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer das Kanalchat-Zeilenprotokoll
///
/// Implementiert `Decoder<Item = Eingang>` und `Encoder<Ausgang>` fuer
/// `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct ZeilenCodec {
    max_zeilenlaenge: usize,
    max_dateigroesse: u64,
    dateikopf_erkennen: bool,
    modus: Modus,
    /// Bis hierhin wurde der Puffer bereits erfolglos nach `\n` durchsucht
    such_index: usize,
}

impl ZeilenCodec {
    /// Codec fuer die Serverseite (erkennt `[FileSize] n` selbststaendig)
    pub fn server() -> Self {
        Self {
            max_zeilenlaenge: STANDARD_MAX_ZEILENLAENGE,
            max_dateigroesse: STANDARD_MAX_DATEIGROESSE,
            dateikopf_erkennen: true,
            modus: Modus::Zeile,
            such_index: 0,
        }
    }

    /// Codec fuer die Clientseite
    pub fn client() -> Self {
        Self {
            dateikopf_erkennen: false,
            ..Self::server()
        }
    }

    /// Setzt benutzerdefinierte Limits
    pub fn mit_limits(mut self, max_zeilenlaenge: usize, max_dateigroesse: u64) -> Self {
        self.max_zeilenlaenge = max_zeilenlaenge;
        self.max_dateigroesse = max_dateigroesse;
        self
    }

    /// Die naechsten `laenge` Bytes als eine [`Eingang::Datei`] liefern
    pub fn roh_erwarten(&mut self, laenge: usize) {
        self.modus = Modus::Roh {
            verbleibend: laenge,
        };
    }

    pub fn max_zeilenlaenge(&self) -> usize {
        self.max_zeilenlaenge
    }

    pub fn max_dateigroesse(&self) -> u64 {
        self.max_dateigroesse
    }

    fn zeile_entnehmen(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecFehler> {
        let start = self.such_index.min(src.len());
        match src[start..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let ende = start + offset;
                self.such_index = 0;
                if ende > self.max_zeilenlaenge {
                    return Err(CodecFehler::ZeileZuLang {
                        max: self.max_zeilenlaenge,
                    });
                }
                let zeile = src.split_to(ende + 1);
                Ok(Some(zeile_dekodieren(&zeile[..ende])))
            }
            None => {
                if src.len() > self.max_zeilenlaenge {
                    return Err(CodecFehler::ZeileZuLang {
                        max: self.max_zeilenlaenge,
                    });
                }
                self.such_index = src.len();
                Ok(None)
            }
        }
    }
}

impl Default for ZeilenCodec {
    fn default() -> Self {
        Self::server()
    }
}

/// Entfernt ein abschliessendes `\r`; ungueltiges UTF-8 wird ersetzt
fn zeile_dekodieren(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Liest die Groesse aus einer Kopfzeile `[FileSize] <n>`
pub fn dateikopf_parsen(zeile: &str) -> Option<u64> {
    let zahl = zeile.strip_prefix(DATEIKOPF_PRAEFIX)?.trim();
    if zahl.is_empty() || !zahl.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    zahl.parse().ok()
}

/// Erstellt die Kopfzeile fuer eine Nutzlast der Groesse `groesse`
pub fn dateikopf(groesse: u64) -> String {
    format!("{DATEIKOPF_PRAEFIX}{groesse}")
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for ZeilenCodec {
    type Item = Eingang;
    type Error = CodecFehler;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.modus {
                Modus::Zeile => {
                    let Some(zeile) = self.zeile_entnehmen(src)? else {
                        return Ok(None);
                    };
                    if self.dateikopf_erkennen {
                        if let Some(groesse) = dateikopf_parsen(&zeile) {
                            self.modus = if groesse > self.max_dateigroesse {
                                Modus::Verwerfen {
                                    verbleibend: groesse,
                                    gesamt: groesse,
                                }
                            } else {
                                Modus::Roh {
                                    verbleibend: groesse as usize,
                                }
                            };
                            continue;
                        }
                    }
                    return Ok(Some(Eingang::Zeile(zeile)));
                }
                Modus::Roh { verbleibend } => {
                    if src.len() < verbleibend {
                        // Speicher vorbelegen um Reallocations zu vermeiden
                        src.reserve(verbleibend - src.len());
                        return Ok(None);
                    }
                    let daten = src.split_to(verbleibend).freeze();
                    self.modus = Modus::Zeile;
                    return Ok(Some(Eingang::Datei(daten)));
                }
                Modus::Verwerfen {
                    verbleibend,
                    gesamt,
                } => {
                    let anzahl = (src.len() as u64).min(verbleibend);
                    src.advance(anzahl as usize);
                    let rest = verbleibend - anzahl;
                    if rest > 0 {
                        self.modus = Modus::Verwerfen {
                            verbleibend: rest,
                            gesamt,
                        };
                        return Ok(None);
                    }
                    self.modus = Modus::Zeile;
                    return Ok(Some(Eingang::DateiVerworfen { groesse: gesamt }));
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(eingang) = self.decode(src)? {
            return Ok(Some(eingang));
        }

        match self.modus {
            Modus::Zeile => {
                if src.is_empty() {
                    return Ok(None);
                }
                // Letzte Zeile ohne abschliessendes `\n`
                let rest = src.split_to(src.len());
                self.such_index = 0;
                Ok(Some(Eingang::Zeile(zeile_dekodieren(&rest))))
            }
            Modus::Roh { verbleibend } => {
                let fehlend = (verbleibend - src.len()) as u64;
                src.clear();
                self.modus = Modus::Zeile;
                Err(CodecFehler::UebertragungAbgebrochen { fehlend })
            }
            Modus::Verwerfen { verbleibend, .. } => {
                self.modus = Modus::Zeile;
                Err(CodecFehler::UebertragungAbgebrochen {
                    fehlend: verbleibend,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<Ausgang> for ZeilenCodec {
    type Error = CodecFehler;

    fn encode(&mut self, item: Ausgang, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Ausgang::Zeile(zeile) => {
                let zeile = zeile.trim_end_matches(&['\r', '\n'][..]);
                dst.reserve(zeile.len() + 1);
                dst.put_slice(zeile.as_bytes());
                dst.put_u8(b'\n');
            }
            Ausgang::Daten(daten) => {
                dst.reserve(daten.len());
                dst.put_slice(&daten);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
