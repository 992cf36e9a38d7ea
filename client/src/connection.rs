//! Client-seitige TCP-Verbindung zum Kanalchat-Server
//!
//! Nutzt den ZeilenCodec aus kanalchat-protocol; der Codec wechselt nur auf
//! Aufruf von [`ServerVerbindung::roh_erwarten`] in den Rohmodus.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use kanalchat_protocol::{wire, Ausgang, CodecFehler, Eingang, ZeilenCodec};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::error::ClientFehler;

/// Verbindung zum Server ueber einen beliebigen Byte-Strom
pub struct ServerVerbindung<S> {
    framed: Framed<S, ZeilenCodec>,
}

impl ServerVerbindung<TcpStream> {
    /// Verbindet sich mit `localhost:<port>`
    ///
    /// `eingabe` ist der Port wie auf der Kommandozeile angegeben und
    /// erscheint in der Fehlermeldung.
    pub async fn verbinden(port: u16, eingabe: &str) -> Result<Self, ClientFehler> {
        let adresse = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        tracing::info!(adresse = %adresse, "Verbinde mit Server");

        let stream = TcpStream::connect(adresse).await.map_err(|e| {
            tracing::debug!(adresse = %adresse, fehler = %e, "Verbindung fehlgeschlagen");
            ClientFehler::Verbindung(eingabe.to_string())
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(fehler = %e, "TCP_NODELAY nicht gesetzt");
        }

        tracing::info!(adresse = %adresse, "TCP-Verbindung hergestellt");
        Ok(Self::neu(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> ServerVerbindung<S> {
    pub fn neu(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, ZeilenCodec::client()),
        }
    }

    pub async fn zeile_senden(&mut self, zeile: impl Into<String>) -> Result<(), CodecFehler> {
        self.framed.send(Ausgang::zeile(zeile)).await
    }

    /// Sendet Kopfzeile und Nutzlast in einem Flush
    pub async fn datei_senden(&mut self, daten: Bytes) -> Result<(), CodecFehler> {
        self.framed
            .feed(Ausgang::zeile(wire::dateikopf(daten.len() as u64)))
            .await?;
        self.framed.send(Ausgang::Daten(daten)).await
    }

    /// Naechste Zeile oder Nutzlast; `None` wenn der Server geschlossen hat
    pub async fn empfangen(&mut self) -> Option<Result<Eingang, CodecFehler>> {
        self.framed.next().await
    }

    /// Die naechsten `laenge` Bytes als Nutzlast lesen
    pub fn roh_erwarten(&mut self, laenge: usize) {
        self.framed.codec_mut().roh_erwarten(laenge);
    }

    pub fn max_dateigroesse(&self) -> u64 {
        self.framed.codec().max_dateigroesse()
    }
}
