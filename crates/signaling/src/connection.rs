//! Verbindung – Eine einzelne Client-Verbindung
//!
//! Jede angenommene Verbindung gehoert genau einer Sitzung. Die Sitzung ist
//! der einzige Schreiber auf dem Socket; alle anderen Beteiligten (Kanal,
//! andere Sitzungen) erreichen sie ueber ihren [`VerbindungsHandle`], der
//! Nachrichten in die Inbox der Sitzung legt.
//!
//! ```text
//! Kanal / andere Sitzung ──> VerbindungsHandle ──> Inbox ──> Sitzung ──> Socket
//! ```

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use kanalchat_core::SessionId;
use kanalchat_protocol::{Ausgang, CodecFehler, Eingang, ZeilenCodec};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::sync::Notify;
use tokio_util::codec::Framed;

use crate::error::SignalingResult;
use crate::transfer::DateiAngebot;

// ---------------------------------------------------------------------------
// Inbox-Nachrichten
// ---------------------------------------------------------------------------

/// Nachricht an eine laufende Sitzung
#[derive(Debug)]
pub enum SessionNachricht {
    /// Textzeile an den Client ausgeben
    Zeile(String),
    /// Die Sitzung wurde aus der Warteschlange befoerdert
    Befoerdert { ticket: u64 },
    /// Eine andere Sitzung moechte eine Datei zustellen
    DateiAngebot(DateiAngebot),
    /// Verbindung schliessen (Kick, Leeren)
    Schliessen,
}

// ---------------------------------------------------------------------------
// VerbindungsHandle
// ---------------------------------------------------------------------------

/// Standardgrenze fuer Inbox und zurueckgehaltene Zeilen einer Sitzung
pub const STANDARD_MAX_RUECKSTAND: usize = 1024;

/// Handle auf die Inbox einer Sitzung
///
/// Die Inbox ist begrenzt. Ist sie voll, wird die Nachricht verworfen und
/// die Sitzung ueber ihr Ueberlauf-Signal beendet.
#[derive(Clone, Debug)]
pub struct VerbindungsHandle {
    session_id: SessionId,
    tx: mpsc::Sender<SessionNachricht>,
    ueberlauf: Arc<Notify>,
}

impl VerbindungsHandle {
    /// Erstellt ein neues Handle und die zugehoerige Inbox
    pub fn neu() -> (Self, Inbox) {
        Self::mit_kapazitaet(STANDARD_MAX_RUECKSTAND)
    }

    pub fn mit_kapazitaet(kapazitaet: usize) -> (Self, Inbox) {
        let (tx, rx) = mpsc::channel(kapazitaet.max(1));
        let ueberlauf = Arc::new(Notify::new());
        (
            Self {
                session_id: SessionId::new(),
                tx,
                ueberlauf: Arc::clone(&ueberlauf),
            },
            Inbox { rx, ueberlauf },
        )
    }

    fn zustellen(&self, nachricht: SessionNachricht) -> Result<(), SessionNachricht> {
        self.tx.try_send(nachricht).map_err(|e| match e {
            TrySendError::Full(nachricht) => {
                tracing::warn!(session = %self.session_id, "Inbox voll, Sitzung wird getrennt");
                self.ueberlauf.notify_one();
                nachricht
            }
            TrySendError::Closed(nachricht) => {
                tracing::debug!(session = %self.session_id, "Inbox geschlossen (Sitzung beendet)");
                nachricht
            }
        })
    }

    /// Legt eine Textzeile in die Inbox
    ///
    /// Gibt `false` zurueck wenn die Sitzung bereits beendet ist.
    pub fn zeile_senden(&self, zeile: impl Into<String>) -> bool {
        self.zustellen(SessionNachricht::Zeile(zeile.into())).is_ok()
    }

    pub fn befoerdern(&self, ticket: u64) -> bool {
        self.zustellen(SessionNachricht::Befoerdert { ticket }).is_ok()
    }

    pub fn schliessen(&self) -> bool {
        self.zustellen(SessionNachricht::Schliessen).is_ok()
    }

    /// Uebergibt ein Dateiangebot; bei beendeter Sitzung kommt es zurueck
    pub fn angebot_senden(&self, angebot: DateiAngebot) -> Result<(), DateiAngebot> {
        if let Err(SessionNachricht::DateiAngebot(angebot)) =
            self.zustellen(SessionNachricht::DateiAngebot(angebot))
        {
            return Err(angebot);
        }
        Ok(())
    }
}

/// Empfangsseite der Inbox, gehoert der Sitzung
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<SessionNachricht>,
    ueberlauf: Arc<Notify>,
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<SessionNachricht> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<SessionNachricht, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Wird benachrichtigt, sobald eine Nachricht an der vollen Inbox scheitert
    pub fn ueberlauf(&self) -> Arc<Notify> {
        Arc::clone(&self.ueberlauf)
    }
}

// ---------------------------------------------------------------------------
// Verbindung
// ---------------------------------------------------------------------------

/// Framed-Socket einer Sitzung
///
/// Generisch ueber den Stream, damit Tests `tokio::io::duplex` nutzen koennen.
pub struct Verbindung<S> {
    framed: Framed<S, ZeilenCodec>,
    peer: String,
}

impl<S> Verbindung<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn neu(stream: S, codec: ZeilenCodec, peer: impl Into<String>) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            peer: peer.into(),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Sendet eine Textzeile (der Codec haengt `\n` an)
    pub async fn zeile_senden(&mut self, zeile: impl Into<String>) -> SignalingResult<()> {
        let zeile = zeile.into();
        tracing::trace!(peer = %self.peer, zeile = %zeile, "Zeile senden");
        self.framed.send(Ausgang::Zeile(zeile)).await?;
        Ok(())
    }

    /// Sendet rohe Nutzdaten ohne Rahmen
    pub async fn daten_senden(&mut self, daten: Bytes) -> SignalingResult<()> {
        tracing::debug!(peer = %self.peer, bytes = daten.len(), "Nutzdaten senden");
        self.framed.send(Ausgang::Daten(daten)).await?;
        Ok(())
    }

    /// Naechste Eingabe vom Client; `None` bei geschlossener Verbindung
    pub async fn empfangen(&mut self) -> Option<Result<Eingang, CodecFehler>> {
        self.framed.next().await
    }

    /// Puffer leeren und Schreibseite schliessen
    pub async fn schliessen(mut self) {
        if let Err(e) = SinkExt::<Ausgang>::flush(&mut self.framed).await {
            tracing::debug!(peer = %self.peer, fehler = %e, "Flush beim Schliessen fehlgeschlagen");
        }
        if let Err(e) = self.framed.get_mut().shutdown().await {
            tracing::debug!(peer = %self.peer, fehler = %e, "Shutdown fehlgeschlagen");
        }
        tracing::debug!(peer = %self.peer, "Verbindung geschlossen");
    }
}
