//! Dateiuebertragung – Weiterleitung zwischen zwei Sitzungen
//!
//! ```text
//! Absender                  Server                         Ziel
//!   /send bob pfad  ──>
//!                   <──  Start transmission.
//!   [FileSize] n    ──>
//!   n Bytes         ──>   DateiAngebot ──> Inbox(bob)
//!                                          FileSize <basename> n  ──>
//!                                                             <──  Ready
//!                                          n Bytes                ──>
//!                   <──  Sent "pfad" to bob.
//!                                          <absender> sent ...    ──>
//! ```
//!
//! Die Absender-Seite pruefen [`anfrage_pruefen`] und [`weiterleiten`].
//! Die Ziel-Seite verwaltet [`Empfangsseite`]: waehrend auf `Ready`
//! gewartet wird, haelt sie alle anderen Ausgaben zurueck, damit keine
//! Textzeile zwischen Ankuendigung und Nutzlast geraet.

use bytes::Bytes;
use kanalchat_protocol::nachrichten;
use std::collections::VecDeque;

use crate::channel::Kanal;
use crate::connection::{VerbindungsHandle, STANDARD_MAX_RUECKSTAND};
use crate::console::Konsole;
use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Absender-Seite
// ---------------------------------------------------------------------------

/// Ein angenommener `/send`, der auf Kopfzeile und Nutzlast wartet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AusstehendesSenden {
    pub ziel: String,
    pub pfad: String,
}

impl AusstehendesSenden {
    /// Meldung an den Absender wenn die Nutzlast nicht ankam
    pub fn fehlschlag(&self) -> String {
        nachrichten::senden_fehlgeschlagen(&self.pfad, &self.ziel)
    }
}

/// Prueft ein `/send` bevor der Client zur Uebertragung aufgefordert wird
///
/// Ein abwesendes Ziel wird sofort abgelehnt; der Client bekommt dann kein
/// `Start transmission.`.
pub fn anfrage_pruefen(
    kanal: &Kanal,
    absender: &str,
    ziel: &str,
    pfad: &str,
) -> SignalingResult<AusstehendesSenden> {
    if absender == ziel {
        return Err(SignalingError::NichtAnSichSelbst);
    }
    if !kanal.ist_verbunden(ziel) {
        return Err(SignalingError::NichtImKanal(ziel.to_string()));
    }
    Ok(AusstehendesSenden {
        ziel: ziel.to_string(),
        pfad: pfad.to_string(),
    })
}

/// Uebergibt eine vollstaendig empfangene Nutzlast an die Ziel-Sitzung
pub fn weiterleiten(
    kanal: &Kanal,
    absender: &str,
    absender_handle: &VerbindungsHandle,
    senden: AusstehendesSenden,
    daten: Bytes,
) -> SignalingResult<()> {
    let fehler = |senden: AusstehendesSenden| SignalingError::Uebertragung {
        pfad: senden.pfad,
        ziel: senden.ziel,
    };

    let Some(ziel_handle) = kanal.verbundenes_handle(&senden.ziel) else {
        return Err(fehler(senden));
    };

    let angebot = DateiAngebot {
        absender: absender.to_string(),
        absender_handle: absender_handle.clone(),
        ziel: senden.ziel,
        pfad: senden.pfad,
        daten,
    };

    tracing::debug!(
        kanal = %kanal.name(),
        absender = %angebot.absender,
        ziel = %angebot.ziel,
        bytes = angebot.groesse(),
        "Datei an Ziel-Sitzung uebergeben"
    );

    ziel_handle.angebot_senden(angebot).map_err(|angebot| {
        fehler(AusstehendesSenden {
            ziel: angebot.ziel,
            pfad: angebot.pfad,
        })
    })
}

// ---------------------------------------------------------------------------
// DateiAngebot
// ---------------------------------------------------------------------------

/// Eine Nutzlast unterwegs von Absender zu Ziel
#[derive(Debug)]
pub struct DateiAngebot {
    pub absender: String,
    pub absender_handle: VerbindungsHandle,
    pub ziel: String,
    pub pfad: String,
    pub daten: Bytes,
}

impl DateiAngebot {
    pub fn basename(&self) -> &str {
        nachrichten::basename(&self.pfad)
    }

    pub fn groesse(&self) -> u64 {
        self.daten.len() as u64
    }

    /// Ankuendigung fuer das Ziel
    pub fn ankuendigung(&self) -> String {
        nachrichten::datei_ankuendigung(self.basename(), self.groesse())
    }

    /// Teilt dem Absender das Scheitern mit
    pub fn fehlschlag_melden(&self) {
        tracing::info!(absender = %self.absender, ziel = %self.ziel, pfad = %self.pfad, "Dateiuebertragung fehlgeschlagen");
        self.absender_handle
            .zeile_senden(nachrichten::senden_fehlgeschlagen(&self.pfad, &self.ziel));
    }

    /// Bestaetigt die Zustellung an Absender und Konsole
    ///
    /// Gibt den Hinweis fuer das Ziel zurueck.
    pub fn zustellung_bestaetigen(&self, konsole: &Konsole) -> String {
        self.absender_handle
            .zeile_senden(nachrichten::gesendet(&self.pfad, &self.ziel));
        let hinweis = nachrichten::datei_hinweis(&self.absender, self.basename(), &self.ziel);
        konsole.ausgeben(hinweis.clone());
        tracing::info!(absender = %self.absender, ziel = %self.ziel, bytes = self.groesse(), "Datei zugestellt");
        hinweis
    }
}

// ---------------------------------------------------------------------------
// Empfangsseite
// ---------------------------------------------------------------------------

/// Antwort des Ziels auf eine Ankuendigung
#[derive(Debug)]
pub enum Antwort {
    /// Es wurde gar nicht auf `Ready` gewartet
    KeinTransfer,
    /// `Ready` – Nutzlast darf gesendet werden
    Bereit(DateiAngebot),
    /// Etwas anderes kam; die Zeile ist normale Eingabe
    Abgelehnt(DateiAngebot),
}

/// Zustand der Ziel-Sitzung fuer eingehende Dateien
#[derive(Debug)]
pub struct Empfangsseite {
    wartet: Option<DateiAngebot>,
    angebote: VecDeque<DateiAngebot>,
    zurueckgehalten: VecDeque<String>,
    /// Hoechstens so viele Zeilen werden zurueckgehalten
    limit: usize,
}

impl Default for Empfangsseite {
    fn default() -> Self {
        Self::mit_limit(STANDARD_MAX_RUECKSTAND)
    }
}

impl Empfangsseite {
    pub fn mit_limit(limit: usize) -> Self {
        Self {
            wartet: None,
            angebote: VecDeque::new(),
            zurueckgehalten: VecDeque::new(),
            limit,
        }
    }

    pub fn wartet_auf_bereit(&self) -> bool {
        self.wartet.is_some()
    }

    /// Nimmt ein Angebot an
    ///
    /// Gibt die Ankuendigung zurueck, wenn sie sofort gesendet werden soll.
    pub fn einreihen(&mut self, angebot: DateiAngebot) -> Option<String> {
        if self.wartet.is_some() {
            self.angebote.push_back(angebot);
            return None;
        }
        let ankuendigung = angebot.ankuendigung();
        self.wartet = Some(angebot);
        Some(ankuendigung)
    }

    /// Haelt eine Ausgabezeile zurueck, solange auf `Ready` gewartet wird
    ///
    /// Gibt die Zeile zurueck wenn sie sofort gesendet werden darf. Antwortet
    /// das Ziel nicht und der Rueckhalt ist voll, ist das ein Fehler.
    pub fn ausgabe(&mut self, zeile: String) -> SignalingResult<Option<String>> {
        if self.wartet.is_none() {
            return Ok(Some(zeile));
        }
        if self.zurueckgehalten.len() >= self.limit {
            return Err(SignalingError::Ueberlastet { puffer: "Rueckhalt" });
        }
        self.zurueckgehalten.push_back(zeile);
        Ok(None)
    }

    /// Wertet eine Eingabezeile des Ziels aus
    pub fn antwort(&mut self, zeile: &str) -> Antwort {
        let Some(angebot) = self.wartet.take() else {
            return Antwort::KeinTransfer;
        };
        if zeile.trim() == kanalchat_protocol::ClientMeldung::BEREIT {
            Antwort::Bereit(angebot)
        } else {
            Antwort::Abgelehnt(angebot)
        }
    }

    /// Zeilen, die nach Abschluss einer Uebertragung gesendet werden
    ///
    /// Erst die zurueckgehaltenen Ausgaben, dann ggf. die Ankuendigung des
    /// naechsten Angebots.
    pub fn fortsetzen(&mut self) -> Vec<String> {
        let mut zeilen: Vec<String> = self.zurueckgehalten.drain(..).collect();
        if self.wartet.is_none() {
            if let Some(naechstes) = self.angebote.pop_front() {
                zeilen.push(naechstes.ankuendigung());
                self.wartet = Some(naechstes);
            }
        }
        zeilen
    }

    /// Bricht alle offenen Angebote ab und gibt die zurueckgehaltenen Zeilen zurueck
    pub fn abbrechen(&mut self) -> Vec<String> {
        for angebot in self.wartet.take().into_iter().chain(self.angebote.drain(..)) {
            angebot.fehlschlag_melden();
        }
        self.zurueckgehalten.drain(..).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
