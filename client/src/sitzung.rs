//! Sitzung des Terminal-Clients
//!
//! Zwei Quellen werden gleichzeitig bedient: Zeilen von stdin und Einheiten
//! vom Server. Befehle werden lokal geprueft bevor sie rausgehen, Servermeldungen
//! werden ausgegeben und steuern Dateiempfang, Stummschaltung und Ende.

use bytes::Bytes;
use kanalchat_protocol::{nachrichten, ClientBefehl, ClientMeldung, CodecFehler, Eingang, ServerMeldung};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::connection::ServerVerbindung;
use crate::error::{ClientFehler, Ende};
use crate::stumm::Stummschaltung;

/// Fuehrt eine Sitzung bis zu ihrem Ende aus
///
/// Empfangene Dateien landen unter ihrem Basisnamen in `verzeichnis`.
pub async fn sitzung_ausfuehren<S, E, A>(
    verbindung: ServerVerbindung<S>,
    benutzer: &str,
    eingabe: E,
    ausgabe: &mut A,
    verzeichnis: &Path,
) -> Result<Ende, ClientFehler>
where
    S: AsyncRead + AsyncWrite + Unpin,
    E: AsyncBufRead + Unpin,
    A: AsyncWrite + Unpin,
{
    let mut sitzung = Sitzung {
        verbindung,
        benutzer,
        ausgabe,
        verzeichnis,
        stumm: Stummschaltung::default(),
        ausstehend: None,
        empfang: None,
    };

    if let Some(ende) = sitzung.anmelden().await? {
        return Ok(ende);
    }
    sitzung.schleife(eingabe).await
}

struct Sitzung<'a, S, A> {
    verbindung: ServerVerbindung<S>,
    benutzer: &'a str,
    ausgabe: &'a mut A,
    verzeichnis: &'a Path,
    stumm: Stummschaltung,
    /// Pfad eines `/send`, der auf "Start transmission." wartet
    ausstehend: Option<String>,
    /// Basisname der angekuendigten Datei
    empfang: Option<String>,
}

impl<S, A> Sitzung<'_, S, A>
where
    S: AsyncRead + AsyncWrite + Unpin,
    A: AsyncWrite + Unpin,
{
    /// Benutzername senden, Begruessung und Kanalstatus ausgeben
    async fn anmelden(&mut self) -> Result<Option<Ende>, ClientFehler> {
        self.senden(self.benutzer.to_string()).await?;

        let Some(erste) = self.zeile_lesen().await else {
            return Ok(Some(Ende::VerbindungGeschlossen));
        };
        self.ausgeben(&erste).await?;

        match ServerMeldung::erkennen(&erste) {
            ServerMeldung::BenutzerExistiert { benutzer, .. } if benutzer == self.benutzer => {
                tracing::info!(benutzer = %self.benutzer, "Benutzername bereits vergeben");
                return Ok(Some(Ende::BenutzerExistiert));
            }
            ServerMeldung::Willkommen => {}
            _ => return Ok(None),
        }

        // Beigetreten oder Platz in der Warteschlange
        match self.zeile_lesen().await {
            Some(zweite) => self.ausgeben(&zweite).await?,
            None => return Ok(Some(Ende::VerbindungGeschlossen)),
        }
        Ok(None)
    }

    async fn schleife<E: AsyncBufRead + Unpin>(&mut self, eingabe: E) -> Result<Ende, ClientFehler> {
        let mut zeilen = eingabe.lines();
        let mut eingabe_offen = true;

        loop {
            tokio::select! {
                biased;

                empfangen = self.verbindung.empfangen() => {
                    let eingang = match empfangen {
                        Some(Ok(eingang)) => eingang,
                        Some(Err(e)) => {
                            tracing::warn!(fehler = %e, "Verbindung zum Server fehlerhaft");
                            return Ok(Ende::VerbindungGeschlossen);
                        }
                        None => return Ok(Ende::VerbindungGeschlossen),
                    };
                    if let Some(ende) = self.eingang_verarbeiten(eingang).await? {
                        return Ok(ende);
                    }
                }

                zeile = zeilen.next_line(), if eingabe_offen => {
                    match zeile? {
                        Some(zeile) => {
                            if let Some(ende) = self.befehl_verarbeiten(&zeile).await? {
                                return Ok(ende);
                            }
                        }
                        None => {
                            tracing::debug!("stdin geschlossen");
                            eingabe_offen = false;
                        }
                    }
                }
            }
        }
    }

    /// Eine Zeile von stdin
    async fn befehl_verarbeiten(&mut self, zeile: &str) -> Result<Option<Ende>, ClientFehler> {
        let befehl = match ClientBefehl::parsen(zeile) {
            Ok(befehl) => befehl,
            Err(fehler) => {
                self.ausgeben(fehler.verwendung()).await?;
                return Ok(None);
            }
        };

        match befehl {
            ClientBefehl::Leer => {}
            ClientBefehl::Beenden => {
                self.senden("/quit").await?;
                tracing::info!(benutzer = %self.benutzer, "Sitzung beendet");
                return Ok(Some(Ende::Beendet));
            }
            ClientBefehl::Fluestern { .. } | ClientBefehl::Chat(_) if self.stumm.aktiv() => {
                self.stumm_melden().await?;
            }
            ClientBefehl::Senden { pfad, .. } => {
                if self.stumm.aktiv() {
                    self.stumm_melden().await?;
                } else {
                    self.ausstehend = Some(pfad);
                    self.senden(zeile.trim()).await?;
                }
            }
            _ => self.senden(zeile.trim_end()).await?,
        }
        Ok(None)
    }

    async fn eingang_verarbeiten(&mut self, eingang: Eingang) -> Result<Option<Ende>, ClientFehler> {
        match eingang {
            Eingang::Zeile(zeile) => self.meldung_verarbeiten(zeile).await,
            Eingang::Datei(daten) => {
                self.datei_speichern(daten).await?;
                Ok(None)
            }
            Eingang::DateiVerworfen { groesse } => {
                tracing::warn!(groesse, "Datei verworfen");
                self.empfang = None;
                self.quittieren(ClientMeldung::Fehlgeschlagen).await?;
                Ok(None)
            }
        }
    }

    /// Eine Zeile vom Server
    async fn meldung_verarbeiten(&mut self, zeile: String) -> Result<Option<Ende>, ClientFehler> {
        match ServerMeldung::erkennen(&zeile) {
            ServerMeldung::UebertragungStarten => match self.ausstehend.take() {
                Some(pfad) => self.datei_senden(&pfad).await?,
                None => self.ausgeben(&zeile).await?,
            },
            ServerMeldung::NichtImKanal { .. } => {
                self.ausstehend = None;
                self.ausgeben(&zeile).await?;
            }
            ServerMeldung::DateiAnkuendigung { basename, groesse } => {
                self.angebot_annehmen(basename, groesse).await?;
            }
            ServerMeldung::Stummgeschaltet { sekunden } => {
                self.ausgeben(&zeile).await?;
                self.stumm.setzen(sekunden);
                tracing::debug!(sekunden, "Stummgeschaltet");
            }
            ServerMeldung::Entfernt => {
                self.ausgeben(&zeile).await?;
                return Ok(Some(Ende::Entfernt));
            }
            ServerMeldung::Afk { benutzer, .. } if benutzer == self.benutzer => {
                self.ausgeben(&zeile).await?;
                return Ok(Some(Ende::Afk));
            }
            _ => self.ausgeben(&zeile).await?,
        }
        Ok(None)
    }

    async fn datei_senden(&mut self, pfad: &str) -> Result<(), ClientFehler> {
        let daten = match tokio::fs::read(pfad).await {
            Ok(daten) => daten,
            Err(e) => {
                tracing::debug!(pfad, fehler = %e, "Datei nicht lesbar");
                return self.ausgeben(&nachrichten::datei_fehlt(pfad)).await;
            }
        };
        tracing::info!(pfad, groesse = daten.len(), "Sende Datei");
        self.verbindung
            .datei_senden(Bytes::from(daten))
            .await
            .map_err(codec_fehler)
    }

    async fn angebot_annehmen(&mut self, basename: String, groesse: u64) -> Result<(), ClientFehler> {
        let laenge = match usize::try_from(groesse) {
            Ok(laenge) if groesse <= self.verbindung.max_dateigroesse() => laenge,
            _ => {
                tracing::warn!(basename = %basename, groesse, "Angebotene Datei zu gross");
                return self.quittieren(ClientMeldung::Fehlgeschlagen).await;
            }
        };

        self.quittieren(ClientMeldung::Bereit).await?;
        self.verbindung.roh_erwarten(laenge);
        self.empfang = Some(basename);
        Ok(())
    }

    async fn datei_speichern(&mut self, daten: Bytes) -> Result<(), ClientFehler> {
        let Some(ziel) = self.empfang.take().and_then(|name| zielpfad(self.verzeichnis, &name)) else {
            tracing::warn!(groesse = daten.len(), "Nutzlast ohne gueltigen Dateinamen");
            return self.quittieren(ClientMeldung::Fehlgeschlagen).await;
        };

        match tokio::fs::write(&ziel, &daten).await {
            Ok(()) => {
                tracing::info!(ziel = %ziel.display(), groesse = daten.len(), "Datei empfangen");
                self.quittieren(ClientMeldung::Empfangen).await
            }
            Err(e) => {
                tracing::warn!(ziel = %ziel.display(), fehler = %e, "Datei nicht speicherbar");
                self.quittieren(ClientMeldung::Fehlgeschlagen).await
            }
        }
    }

    async fn stumm_melden(&mut self) -> Result<(), ClientFehler> {
        let zeile = nachrichten::noch_stumm(self.stumm.dauer());
        self.ausgeben(&zeile).await
    }

    /// Der Server kann die Verbindung bereits geschlossen haben; das zeigt
    /// erst der naechste Lesevorgang
    async fn quittieren(&mut self, meldung: ClientMeldung) -> Result<(), ClientFehler> {
        if let Err(e) = self.senden(meldung.als_zeile()).await {
            tracing::debug!(fehler = %e, "Quittung nicht zustellbar");
        }
        Ok(())
    }

    async fn senden(&mut self, zeile: impl Into<String>) -> Result<(), ClientFehler> {
        self.verbindung.zeile_senden(zeile).await.map_err(codec_fehler)
    }

    async fn zeile_lesen(&mut self) -> Option<String> {
        match self.verbindung.empfangen().await? {
            Ok(Eingang::Zeile(zeile)) => Some(zeile),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(fehler = %e, "Anmeldung fehlgeschlagen");
                None
            }
        }
    }

    async fn ausgeben(&mut self, zeile: &str) -> Result<(), ClientFehler> {
        self.ausgabe.write_all(zeile.as_bytes()).await?;
        self.ausgabe.write_all(b"\n").await?;
        self.ausgabe.flush().await?;
        Ok(())
    }
}

/// Nur der letzte Pfadteil; `.` und `..` werden abgelehnt
fn zielpfad(verzeichnis: &Path, name: &str) -> Option<PathBuf> {
    match nachrichten::basename(name) {
        "" | "." | ".." => None,
        basis => Some(verzeichnis.join(basis)),
    }
}

fn codec_fehler(e: CodecFehler) -> ClientFehler {
    match e {
        CodecFehler::Io(e) => ClientFehler::Io(e),
        andere => ClientFehler::Io(std::io::Error::other(andere.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zielpfad_nimmt_basisnamen() {
        let verzeichnis = Path::new("/tmp/empfang");
        assert_eq!(
            zielpfad(verzeichnis, "notiz.txt"),
            Some(PathBuf::from("/tmp/empfang/notiz.txt"))
        );
        assert_eq!(
            zielpfad(verzeichnis, "../../etc/passwd"),
            Some(PathBuf::from("/tmp/empfang/passwd"))
        );
        assert_eq!(zielpfad(verzeichnis, ".."), None);
        assert_eq!(zielpfad(verzeichnis, "a/"), None);
    }
}
