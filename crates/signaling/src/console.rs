//! Operator-Konsole – Ausgabekanal fuer Serverzeilen
//!
//! Alles was der Operator auf stdout sehen soll (Beitritte, Chat-Echos,
//! Operator-Quittungen) laeuft ueber eine `Konsole`. Der Server-Binary
//! liest den Empfaenger aus und schreibt die Zeilen unveraendert aus.
//! Tests lesen denselben Empfaenger um Konsolenausgaben zu pruefen.

use tokio::sync::mpsc;

/// Sendeseite der Operator-Konsole
#[derive(Clone, Debug)]
pub struct Konsole {
    tx: mpsc::UnboundedSender<String>,
}

impl Konsole {
    /// Erstellt eine neue Konsole und den zugehoerigen Empfaenger
    pub fn neu() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Gibt eine Zeile auf der Konsole aus
    pub fn ausgeben(&self, zeile: impl Into<String>) {
        let zeile = zeile.into();
        tracing::trace!(zeile = %zeile, "Konsole");
        if self.tx.send(zeile).is_err() {
            tracing::debug!("Konsolen-Empfaenger geschlossen");
        }
    }
}
