//! Befehlsausfuehrer der Operator-Konsole
//!
//! Reihenfolge der Pruefungen wie beim Operator erwartet: Kanal bekannt,
//! Benutzer verbunden, erst dann die Mute-Dauer. Jede Ablehnung ist eine
//! Zeile auf der Konsole, nie ein Fehler.

use std::sync::Arc;

use kanalchat_protocol::nachrichten;
use kanalchat_signaling::{Kanal, Konsole, SignalingError, SignalingState};

use crate::commands::types::{Ausfuehrung, OperatorBefehl};

/// Fuehrt Operator-Befehle gegen den laufenden Server aus
pub struct BefehlsAusfuehrer {
    state: Arc<SignalingState>,
}

impl BefehlsAusfuehrer {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    pub fn konsole(&self) -> &Konsole {
        &self.state.konsole
    }

    pub fn ausfuehren(&self, befehl: OperatorBefehl) -> Ausfuehrung {
        tracing::debug!(?befehl, "Operator-Befehl");
        match befehl {
            OperatorBefehl::Kick { kanal, benutzer } => self.kicken(&kanal, &benutzer),
            OperatorBefehl::Mute {
                kanal,
                benutzer,
                dauer,
            } => self.stummschalten(&kanal, &benutzer, &dauer),
            OperatorBefehl::Empty { kanal } => self.leeren(&kanal),
            OperatorBefehl::Shutdown => {
                tracing::info!("Shutdown durch Operator");
                self.state.konsole.ausgeben(nachrichten::HERUNTERFAHREN);
                return Ausfuehrung::Herunterfahren;
            }
        }
        Ausfuehrung::Weiter
    }

    fn kicken(&self, kanal: &str, benutzer: &str) {
        let Some(kanal) = self.verbunden_in(kanal, benutzer) else {
            return;
        };
        if let Err(e) = kanal.kicken(benutzer) {
            self.melden(e);
        }
    }

    fn stummschalten(&self, kanal: &str, benutzer: &str, dauer: &str) {
        let Some(kanal) = self.verbunden_in(kanal, benutzer) else {
            return;
        };
        let sekunden = match dauer.parse::<u64>() {
            Ok(sekunden) if sekunden > 0 => sekunden,
            _ => {
                self.state
                    .konsole
                    .ausgeben(nachrichten::UNGUELTIGE_STUMMDAUER);
                return;
            }
        };
        if let Err(e) = kanal.stummschalten(benutzer, sekunden) {
            self.melden(e);
        }
    }

    fn leeren(&self, kanal: &str) {
        let Some(kanal) = self.kanal(kanal) else {
            return;
        };
        let entfernt = kanal.leeren();
        tracing::info!(kanal = %kanal.name(), entfernt, "Kanal geleert");
    }

    fn kanal(&self, name: &str) -> Option<Arc<Kanal>> {
        match self.state.kanal(name) {
            Ok(kanal) => Some(kanal),
            Err(e) => {
                self.melden(e);
                None
            }
        }
    }

    /// Kanal, sofern `benutzer` dort verbunden ist (nicht nur wartend)
    fn verbunden_in(&self, kanal: &str, benutzer: &str) -> Option<Arc<Kanal>> {
        let kanal = self.kanal(kanal)?;
        if !kanal.ist_verbunden(benutzer) {
            self.state
                .konsole
                .ausgeben(nachrichten::nicht_im_kanal(benutzer));
            return None;
        }
        Some(kanal)
    }

    fn melden(&self, fehler: SignalingError) {
        match fehler.meldung() {
            Some(zeile) => self.state.konsole.ausgeben(zeile),
            None => tracing::error!(fehler = %fehler, "Operator-Befehl fehlgeschlagen"),
        }
    }
}
