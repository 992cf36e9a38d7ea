//! TCP-Listener – Ein Socket pro Kanal, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet fuer jeden Kanal dessen Port und startet
//! pro Kanal eine Accept-Loop. Jede eingehende Verbindung bekommt einen
//! eigenen tokio-Task mit einer Sitzung, die im Kanal des Ports beginnt.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::channel::Kanal;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;
use crate::session::sitzung_ausfuehren;

/// TCP-Server mit einem Listener pro Kanal
pub struct SignalingServer {
    state: Arc<SignalingState>,
    listener: Vec<(Arc<Kanal>, TcpListener)>,
}

impl SignalingServer {
    /// Bindet alle Kanal-Ports in Konfigurationsreihenfolge
    ///
    /// Der erste Port, der nicht gebunden werden kann, bricht ab.
    pub async fn binden(state: Arc<SignalingState>, bind_ip: IpAddr) -> SignalingResult<Self> {
        let mut listener = Vec::with_capacity(state.kanaele().len());
        for kanal in state.kanaele() {
            let adresse = SocketAddr::new(bind_ip, kanal.port());
            let socket = TcpListener::bind(adresse)
                .await
                .map_err(|quelle| SignalingError::PortBelegt {
                    port: kanal.port(),
                    quelle,
                })?;
            tracing::debug!(kanal = %kanal.name(), adresse = %adresse, "Port gebunden");
            listener.push((Arc::clone(kanal), socket));
        }
        Ok(Self { state, listener })
    }

    /// Verwendet bereits gebundene Listener (z.B. Port 0 in Tests)
    pub fn mit_listenern(
        state: Arc<SignalingState>,
        listener: Vec<(Arc<Kanal>, TcpListener)>,
    ) -> Self {
        Self { state, listener }
    }

    /// Tatsaechliche Adressen je Kanalname
    pub fn lokale_adressen(&self) -> Vec<(String, SocketAddr)> {
        self.listener
            .iter()
            .filter_map(|(kanal, l)| l.local_addr().ok().map(|a| (kanal.name().to_string(), a)))
            .collect()
    }

    /// Startet alle Accept-Loops
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let mut tasks = Vec::with_capacity(self.listener.len());
        for (kanal, listener) in self.listener {
            let state = Arc::clone(&self.state);
            let shutdown_rx = shutdown_rx.clone();
            tasks.push(tokio::spawn(accept_loop(state, kanal, listener, shutdown_rx)));
        }

        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(fehler = %e, "Accept-Task abgebrochen");
            }
        }

        tracing::info!("Alle Listener gestoppt");
        Ok(())
    }
}

/// Accept-Loop eines Kanals
async fn accept_loop(
    state: Arc<SignalingState>,
    kanal: Arc<Kanal>,
    listener: TcpListener,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    match listener.local_addr() {
        Ok(adresse) => tracing::info!(kanal = %kanal.name(), adresse = %adresse, "Listener gestartet"),
        Err(e) => tracing::warn!(kanal = %kanal.name(), fehler = %e, "Lokale Adresse unbekannt"),
    }

    loop {
        tokio::select! {
            // Neue eingehende Verbindung
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        tracing::debug!(kanal = %kanal.name(), peer = %peer_addr, "Verbindung akzeptiert");
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                        }

                        let state = Arc::clone(&state);
                        let kanal = Arc::clone(&kanal);
                        let shutdown_rx = shutdown_rx.clone();
                        tokio::spawn(async move {
                            sitzung_ausfuehren(state, kanal, stream, peer_addr.to_string(), shutdown_rx)
                                .await;
                        });
                    }
                    Err(e) => {
                        tracing::error!(kanal = %kanal.name(), fehler = %e, "TCP-Accept-Fehler");
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }

            // Shutdown-Signal
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!(kanal = %kanal.name(), "Shutdown-Signal empfangen");
                    break;
                }
            }
        }
    }

    tracing::info!(kanal = %kanal.name(), "Listener gestoppt");
}
