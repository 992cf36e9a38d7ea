//! kanalchat-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod cli;
pub mod config;
pub mod error;
pub mod kanaele;

use std::sync::Arc;

use kanalchat_commander::{konsole_lesen, Ausfuehrung, BefehlsAusfuehrer};
use kanalchat_core::KanalBeschreibung;
use kanalchat_protocol::nachrichten;
use kanalchat_signaling::{Konsole, SignalingError, SignalingServer, SignalingState};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

use config::ServerConfig;
use error::StartFehler;

/// Haelt den Server vor dem Start zusammen
pub struct Server {
    pub config: ServerConfig,
    pub afk_sek: u64,
    pub kanaele: Vec<KanalBeschreibung>,
}

impl Server {
    /// Erstellt einen neuen Server aus Einstellungen und validierten Kanaelen
    pub fn neu(config: ServerConfig, afk_sek: u64, kanaele: Vec<KanalBeschreibung>) -> Self {
        Self {
            config,
            afk_sek,
            kanaele,
        }
    }

    /// Startet mit stdin als Operator-Konsole und stdout als Ausgabe
    pub async fn starten(self) -> Result<(), StartFehler> {
        self.starten_mit(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Startet alle Subsysteme und laeuft bis `/shutdown` oder Ctrl-C
    ///
    /// Reihenfolge:
    /// 1. Alle Kanal-Ports binden (erster Fehler bricht ab)
    /// 2. Banner ausgeben
    /// 3. Listener und Operator-Konsole starten
    /// 4. Konsolenzeilen nach `ausgabe` schreiben bis zum Shutdown
    pub async fn starten_mit<E, A>(self, eingabe: E, mut ausgabe: A) -> Result<(), StartFehler>
    where
        E: AsyncBufRead + Unpin + Send + 'static,
        A: AsyncWrite + Unpin,
    {
        let bind_ip = self.config.bind_ip()?;
        let (konsole, mut konsole_rx) = Konsole::neu();
        let state = SignalingState::neu(
            self.config.signaling_config(self.afk_sek),
            self.kanaele,
            konsole,
        );

        tracing::info!(
            kanaele = state.kanaele().len(),
            afk_sek = self.afk_sek,
            bind = %bind_ip,
            "Server startet"
        );

        let server = SignalingServer::binden(Arc::clone(&state), bind_ip)
            .await
            .map_err(|e| match e {
                SignalingError::PortBelegt { port, quelle } => {
                    tracing::error!(port, fehler = %quelle, "Port nicht verfuegbar");
                    StartFehler::PortBelegt { port }
                }
                andere => StartFehler::Io(std::io::Error::other(andere.to_string())),
            })?;

        for kanal in state.kanaele() {
            state.konsole.ausgeben(nachrichten::kanal_erstellt(
                kanal.name(),
                kanal.port(),
                kanal.kapazitaet(),
            ));
        }
        state.konsole.ausgeben(nachrichten::SERVER_WILLKOMMEN);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener_task = tokio::spawn(server.starten(shutdown_rx));

        let ausfuehrer = BefehlsAusfuehrer::neu(Arc::clone(&state));
        let mut konsole_task = tokio::spawn(async move { konsole_lesen(eingabe, &ausfuehrer).await });
        let mut konsole_aktiv = true;

        loop {
            tokio::select! {
                zeile = konsole_rx.recv() => match zeile {
                    Some(zeile) => zeile_schreiben(&mut ausgabe, &zeile).await?,
                    None => break,
                },

                ergebnis = &mut konsole_task, if konsole_aktiv => {
                    konsole_aktiv = false;
                    match ergebnis {
                        Ok(Ok(Ausfuehrung::Herunterfahren)) => break,
                        Ok(Ok(Ausfuehrung::Weiter)) => {
                            tracing::info!("Operator-Konsole geschlossen, Server laeuft weiter");
                        }
                        Ok(Err(e)) => tracing::warn!(fehler = %e, "Operator-Konsole beendet"),
                        Err(e) => tracing::error!(fehler = %e, "Konsolen-Task abgebrochen"),
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                    break;
                }
            }
        }

        // Was bis hierher auf der Konsole stand, noch ausgeben
        while let Ok(zeile) = konsole_rx.try_recv() {
            zeile_schreiben(&mut ausgabe, &zeile).await?;
        }

        if let Err(e) = shutdown_tx.send(true) {
            tracing::debug!(fehler = %e, "Shutdown-Signal ohne Empfaenger");
        }
        konsole_task.abort();
        listener_task.abort();
        tracing::info!("Server beendet");
        Ok(())
    }
}

async fn zeile_schreiben<A>(ausgabe: &mut A, zeile: &str) -> std::io::Result<()>
where
    A: AsyncWrite + Unpin,
{
    ausgabe.write_all(zeile.as_bytes()).await?;
    ausgabe.write_all(b"\n").await?;
    ausgabe.flush().await
}
