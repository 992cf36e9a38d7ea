//! Sitzung – Zustandsautomat einer Client-Verbindung
//!
//! ## Zustaende
//! ```text
//! Benutzername -> Aufnahme -> Verbunden ----------------+
//!                     |           ^                     |
//!                     v           | Befoerderung        | /switch
//!                  Wartend -------+                     v
//!                                              Aufnahme im Zielkanal
//!
//! /quit, EOF, AFK, Kick, Leeren  ->  Beendet
//! ```
//!
//! Die Sitzung ist der einzige Schreiber auf ihrem Socket. Im `select!`
//! wartet sie gleichzeitig auf das Shutdown-Signal, ihre Inbox, die naechste
//! Eingabe des Clients und die AFK-Frist, in genau dieser Rangfolge. Die
//! Inbox kommt vor dem Socket, damit Ausgaben in der Reihenfolge ihrer
//! Entstehung beim Client ankommen.
//!
//! Beim Herunterfahren wird der Socket ohne weitere Ausgabe geschlossen,
//! auch kein Abgang wird verkuendet.

use bytes::Bytes;
use kanalchat_core::benutzername_gueltig;
use kanalchat_protocol::{nachrichten, ClientBefehl, CodecFehler, Eingang, ZeilenCodec};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{watch, Notify};

use crate::afk::AfkTimer;
use crate::channel::{Abgangsgrund, Aufnahme, Kanal, Mitgliedschaft};
use crate::connection::{Inbox, SessionNachricht, Verbindung, VerbindungsHandle};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;
use crate::transfer::{self, Antwort, AusstehendesSenden, Empfangsseite};

/// Wie lange ein Ziel beim Abschluss noch auf eine Ankuendigung antworten darf
const ANTWORT_FRIST: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Zustaende
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Wartend,
    Verbunden,
}

/// Wie die Sitzung einen Kanal verlaesst
enum Ende {
    /// Weiter im Zielkanal mit derselben Verbindung
    Wechsel(Arc<Kanal>),
    Beendet,
    /// Server faehrt herunter; kein Abgang, keine Restausgabe
    Herunterfahren,
}

enum Schritt {
    Weiter,
    Ende(Ende),
}

// ---------------------------------------------------------------------------
// Einstieg
// ---------------------------------------------------------------------------

/// Fuehrt eine Sitzung auf einer frisch angenommenen Verbindung aus
///
/// Liest den Benutzernamen, nimmt ihn im Kanal auf und laeuft bis die
/// Verbindung endet.
pub async fn sitzung_ausfuehren<S>(
    state: Arc<SignalingState>,
    kanal: Arc<Kanal>,
    stream: S,
    peer: String,
    shutdown_rx: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let codec = ZeilenCodec::server()
        .mit_limits(state.config.max_zeilenlaenge, state.config.max_dateigroesse);
    let mut verbindung = Verbindung::neu(stream, codec, peer);

    let Some(benutzer) = benutzername_lesen(&mut verbindung).await else {
        verbindung.schliessen().await;
        return;
    };

    tracing::info!(peer = %verbindung.peer(), benutzer = %benutzer, kanal = %kanal.name(), "Benutzername empfangen");

    let (handle, inbox) = VerbindungsHandle::mit_kapazitaet(state.config.max_rueckstand);
    let afk = AfkTimer::neu(state.config.afk_dauer);
    let empfang = Empfangsseite::mit_limit(state.config.max_rueckstand);
    let sitzung = Sitzung {
        state,
        verbindung,
        handle,
        ueberlauf: inbox.ueberlauf(),
        inbox,
        benutzer,
        afk,
        senden: None,
        empfang,
        shutdown_rx,
    };
    sitzung.ausfuehren(kanal).await;
}

/// Erste Zeile der Verbindung: der Benutzername
async fn benutzername_lesen<S>(verbindung: &mut Verbindung<S>) -> Option<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let zeile = match verbindung.empfangen().await {
        Some(Ok(Eingang::Zeile(zeile))) => zeile,
        Some(Ok(_)) => String::new(),
        Some(Err(e)) => {
            tracing::warn!(peer = %verbindung.peer(), fehler = %e, "Fehler beim Lesen des Benutzernamens");
            return None;
        }
        None => {
            tracing::debug!(peer = %verbindung.peer(), "Verbindung vor Benutzername getrennt");
            return None;
        }
    };

    let name = zeile.trim();
    if benutzername_gueltig(name) {
        return Some(name.to_string());
    }

    tracing::info!(peer = %verbindung.peer(), "Ungueltiger Benutzername abgelehnt");
    if let Err(e) = verbindung
        .zeile_senden(nachrichten::UNGUELTIGER_BENUTZERNAME)
        .await
    {
        tracing::debug!(peer = %verbindung.peer(), fehler = %e, "Ablehnung nicht zustellbar");
    }
    None
}

// ---------------------------------------------------------------------------
// Sitzung
// ---------------------------------------------------------------------------

struct Sitzung<S> {
    state: Arc<SignalingState>,
    verbindung: Verbindung<S>,
    handle: VerbindungsHandle,
    inbox: Inbox,
    ueberlauf: Arc<Notify>,
    benutzer: String,
    afk: AfkTimer,
    /// Angenommenes `/send`, Nutzlast steht noch aus
    senden: Option<AusstehendesSenden>,
    /// Eingehende Dateien anderer Sitzungen
    empfang: Empfangsseite,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S> Sitzung<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Aeussere Schleife: Aufnahme, Kanal, ggf. Wechsel in den naechsten
    async fn ausfuehren(mut self, mut kanal: Arc<Kanal>) {
        loop {
            let aufnahme = match kanal.aufnehmen(&self.benutzer, self.handle.clone()) {
                Ok(aufnahme) => aufnahme,
                Err(e) => {
                    if let Some(meldung) = e.meldung() {
                        if let Err(e) = self.verbindung.zeile_senden(meldung).await {
                            tracing::debug!(peer = %self.verbindung.peer(), fehler = %e, "Ablehnung nicht zustellbar");
                        }
                    }
                    break;
                }
            };

            match self.im_kanal(&kanal, aufnahme).await {
                Ende::Wechsel(ziel) => {
                    tracing::info!(
                        benutzer = %self.benutzer,
                        von = %kanal.name(),
                        nach = %ziel.name(),
                        "Kanalwechsel"
                    );
                    kanal = ziel;
                }
                Ende::Beendet => break,
                Ende::Herunterfahren => {
                    tracing::debug!(peer = %self.verbindung.peer(), benutzer = %self.benutzer, "Verbindung beim Herunterfahren geschlossen");
                    self.verbindung.schliessen().await;
                    return;
                }
            }
        }

        self.abschliessen().await;
    }

    /// Innere Schleife fuer eine Mitgliedschaft in einem Kanal
    async fn im_kanal(&mut self, kanal: &Arc<Kanal>, aufnahme: Aufnahme) -> Ende {
        let mitgliedschaft = aufnahme.mitgliedschaft().clone();
        let mut phase = match aufnahme {
            Aufnahme::Verbunden(_) => {
                self.afk.starten();
                Phase::Verbunden
            }
            Aufnahme::Wartend { .. } => {
                self.afk.stoppen();
                Phase::Wartend
            }
        };
        let mut gepuffert: VecDeque<String> = VecDeque::new();
        self.senden = None;

        loop {
            let afk_aktiv = phase == Phase::Verbunden && self.afk.ist_aktiv();
            let frist = self.afk.frist();

            let schritt = tokio::select! {
                biased;

                Ok(()) = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        tracing::info!(benutzer = %self.benutzer, "Shutdown-Signal – Sitzung wird beendet");
                        Ok(Schritt::Ende(Ende::Herunterfahren))
                    } else {
                        Ok(Schritt::Weiter)
                    }
                }

                _ = self.ueberlauf.notified() => {
                    Err(SignalingError::Ueberlastet { puffer: "Inbox" })
                }

                nachricht = self.inbox.recv() => match nachricht {
                    Some(nachricht) => {
                        self.inbox_verarbeiten(kanal, &mitgliedschaft, &mut phase, &mut gepuffert, nachricht)
                            .await
                    }
                    None => Ok(Schritt::Ende(Ende::Beendet)),
                },

                eingang = self.verbindung.empfangen() => {
                    self.eingang_verarbeiten(kanal, &mitgliedschaft, phase, &mut gepuffert, eingang)
                        .await
                }

                _ = tokio::time::sleep_until(frist), if afk_aktiv => {
                    if kanal.afk_melden(&mitgliedschaft) {
                        kanal.verlassen(&mitgliedschaft, Abgangsgrund::Afk);
                    }
                    Ok(Schritt::Ende(Ende::Beendet))
                }
            };

            match schritt {
                Ok(Schritt::Weiter) => {}
                Ok(Schritt::Ende(ende)) => return ende,
                Err(e) => {
                    tracing::warn!(
                        peer = %self.verbindung.peer(),
                        benutzer = %self.benutzer,
                        fehler = %e,
                        "Sitzung wegen Fehler beendet"
                    );
                    kanal.verlassen(&mitgliedschaft, Abgangsgrund::Getrennt);
                    return Ende::Beendet;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inbox
    // -----------------------------------------------------------------------

    async fn inbox_verarbeiten(
        &mut self,
        kanal: &Arc<Kanal>,
        mitgliedschaft: &Mitgliedschaft,
        phase: &mut Phase,
        gepuffert: &mut VecDeque<String>,
        nachricht: SessionNachricht,
    ) -> SignalingResult<Schritt> {
        match nachricht {
            SessionNachricht::Zeile(zeile) => {
                self.ausgeben(zeile).await?;
                Ok(Schritt::Weiter)
            }
            SessionNachricht::Befoerdert { ticket } => {
                if *phase != Phase::Wartend || ticket != mitgliedschaft.ticket() {
                    tracing::debug!(benutzer = %self.benutzer, ticket, "Veraltete Befoerderung ignoriert");
                    return Ok(Schritt::Weiter);
                }
                *phase = Phase::Verbunden;
                tracing::debug!(
                    benutzer = %self.benutzer,
                    gepuffert = gepuffert.len(),
                    "Befoerdert, gepufferte Eingaben werden nachgeholt"
                );
                while let Some(zeile) = gepuffert.pop_front() {
                    if let Schritt::Ende(ende) = self.zeile_verarbeiten(kanal, mitgliedschaft, &zeile).await? {
                        return Ok(Schritt::Ende(ende));
                    }
                }
                self.afk.starten();
                Ok(Schritt::Weiter)
            }
            SessionNachricht::DateiAngebot(angebot) => {
                if let Some(ankuendigung) = self.empfang.einreihen(angebot) {
                    self.verbindung.zeile_senden(ankuendigung).await?;
                }
                Ok(Schritt::Weiter)
            }
            SessionNachricht::Schliessen => {
                tracing::info!(benutzer = %self.benutzer, kanal = %kanal.name(), "Vom Operator entfernt");
                Ok(Schritt::Ende(Ende::Beendet))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Eingaben vom Client
    // -----------------------------------------------------------------------

    async fn eingang_verarbeiten(
        &mut self,
        kanal: &Arc<Kanal>,
        mitgliedschaft: &Mitgliedschaft,
        phase: Phase,
        gepuffert: &mut VecDeque<String>,
        eingang: Option<Result<Eingang, CodecFehler>>,
    ) -> SignalingResult<Schritt> {
        let eingang = match eingang {
            None => {
                tracing::info!(peer = %self.verbindung.peer(), benutzer = %self.benutzer, "Verbindung vom Client getrennt");
                kanal.verlassen(mitgliedschaft, Abgangsgrund::Getrennt);
                return Ok(Schritt::Ende(Ende::Beendet));
            }
            Some(Err(CodecFehler::UebertragungAbgebrochen { fehlend })) => {
                tracing::warn!(
                    peer = %self.verbindung.peer(),
                    benutzer = %self.benutzer,
                    fehlend,
                    "Verbindung waehrend Dateiuebertragung getrennt"
                );
                if let Some(senden) = self.senden.take() {
                    if let Err(e) = self.verbindung.zeile_senden(senden.fehlschlag()).await {
                        tracing::debug!(fehler = %e, "Fehlschlag nicht zustellbar");
                    }
                }
                kanal.verlassen(mitgliedschaft, Abgangsgrund::Getrennt);
                return Ok(Schritt::Ende(Ende::Beendet));
            }
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(eingang)) => eingang,
        };

        match (phase, eingang) {
            (Phase::Wartend, Eingang::Zeile(zeile)) => {
                self.wartend_verarbeiten(kanal, mitgliedschaft, gepuffert, zeile)
                    .await
            }
            (Phase::Wartend, _) => {
                tracing::warn!(benutzer = %self.benutzer, "Nutzlast in der Warteschlange verworfen");
                Ok(Schritt::Weiter)
            }
            (Phase::Verbunden, Eingang::Zeile(zeile)) => {
                tracing::debug!(benutzer = %self.benutzer, kanal = %kanal.name(), "Zeile empfangen");
                let schritt = self.zeile_verarbeiten(kanal, mitgliedschaft, &zeile).await?;
                self.afk.starten();
                Ok(schritt)
            }
            (Phase::Verbunden, Eingang::Datei(daten)) => {
                self.datei_verarbeiten(kanal, daten).await?;
                self.afk.starten();
                Ok(Schritt::Weiter)
            }
            (Phase::Verbunden, Eingang::DateiVerworfen { groesse }) => {
                tracing::warn!(
                    benutzer = %self.benutzer,
                    groesse,
                    max = self.state.config.max_dateigroesse,
                    "Datei ueberschreitet das Groessenlimit"
                );
                if let Some(senden) = self.senden.take() {
                    self.ausgeben(senden.fehlschlag()).await?;
                }
                self.afk.starten();
                Ok(Schritt::Weiter)
            }
        }
    }

    /// In der Warteschlange wirken nur `/list` und `/quit` sofort
    async fn wartend_verarbeiten(
        &mut self,
        kanal: &Arc<Kanal>,
        mitgliedschaft: &Mitgliedschaft,
        gepuffert: &mut VecDeque<String>,
        zeile: String,
    ) -> SignalingResult<Schritt> {
        match ClientBefehl::parsen(&zeile) {
            Ok(ClientBefehl::Beenden) => {
                kanal.verlassen(mitgliedschaft, Abgangsgrund::Beendet);
                Ok(Schritt::Ende(Ende::Beendet))
            }
            Ok(ClientBefehl::Liste) => {
                self.liste_senden().await?;
                Ok(Schritt::Weiter)
            }
            Ok(ClientBefehl::Leer) => Ok(Schritt::Weiter),
            _ => {
                tracing::debug!(benutzer = %self.benutzer, "Eingabe bis zur Befoerderung gepuffert");
                gepuffert.push_back(zeile);
                Ok(Schritt::Weiter)
            }
        }
    }

    /// Verarbeitet eine Zeile im verbundenen Zustand
    async fn zeile_verarbeiten(
        &mut self,
        kanal: &Arc<Kanal>,
        mitgliedschaft: &Mitgliedschaft,
        zeile: &str,
    ) -> SignalingResult<Schritt> {
        match self.empfang.antwort(zeile) {
            Antwort::KeinTransfer => {}
            Antwort::Bereit(angebot) => {
                if let Err(e) = self.verbindung.daten_senden(angebot.daten.clone()).await {
                    angebot.fehlschlag_melden();
                    return Err(e);
                }
                let hinweis = angebot.zustellung_bestaetigen(&self.state.konsole);
                self.ausgeben(hinweis).await?;
                self.empfang_fortsetzen().await?;
                return Ok(Schritt::Weiter);
            }
            Antwort::Abgelehnt(angebot) => {
                angebot.fehlschlag_melden();
                self.empfang_fortsetzen().await?;
            }
        }

        let befehl = match ClientBefehl::parsen(zeile) {
            Ok(befehl) => befehl,
            Err(fehler) => {
                self.ausgeben(fehler.verwendung()).await?;
                return Ok(Schritt::Weiter);
            }
        };

        match befehl {
            ClientBefehl::Beenden => {
                kanal.verlassen(mitgliedschaft, Abgangsgrund::Beendet);
                return Ok(Schritt::Ende(Ende::Beendet));
            }
            ClientBefehl::Liste => self.liste_senden().await?,
            ClientBefehl::Fluestern { ziel, text } => {
                if !self.stumm_pruefen(kanal).await? {
                    match kanal.fluestern(&self.benutzer, &ziel, &text) {
                        Ok(bestaetigung) => self.ausgeben(bestaetigung).await?,
                        Err(e) => self.fehler_melden(e).await?,
                    }
                }
            }
            ClientBefehl::Senden { ziel, pfad } => {
                if !self.stumm_pruefen(kanal).await? {
                    match transfer::anfrage_pruefen(kanal, &self.benutzer, &ziel, &pfad) {
                        Ok(senden) => {
                            self.ausgeben(nachrichten::UEBERTRAGUNG_STARTEN).await?;
                            self.senden = Some(senden);
                        }
                        Err(e) => self.fehler_melden(e).await?,
                    }
                }
            }
            ClientBefehl::Wechseln { kanal: zielname } => {
                return self.wechseln(kanal, mitgliedschaft, &zielname).await;
            }
            ClientBefehl::Meldung(meldung) => {
                tracing::debug!(benutzer = %self.benutzer, ?meldung, "Client-Meldung");
            }
            ClientBefehl::Chat(text) => {
                if !self.stumm_pruefen(kanal).await? {
                    kanal.chat_weiterleiten(&self.benutzer, &text);
                }
            }
            ClientBefehl::Leer => {}
        }

        Ok(Schritt::Weiter)
    }

    async fn wechseln(
        &mut self,
        kanal: &Arc<Kanal>,
        mitgliedschaft: &Mitgliedschaft,
        zielname: &str,
    ) -> SignalingResult<Schritt> {
        let ziel = match self.state.kanal(zielname) {
            Ok(ziel) => ziel,
            Err(e) => {
                self.fehler_melden(e).await?;
                return Ok(Schritt::Weiter);
            }
        };

        if ziel.hat_benutzer(&self.benutzer) {
            self.fehler_melden(SignalingError::BenutzerExistiert {
                kanal: ziel.name().to_string(),
                benutzer: self.benutzer.clone(),
            })
            .await?;
            return Ok(Schritt::Weiter);
        }

        if !kanal.verlassen(mitgliedschaft, Abgangsgrund::Gewechselt) {
            // Zwischenzeitlich entfernt, das Schliessen steht in der Inbox
            return Ok(Schritt::Ende(Ende::Beendet));
        }
        self.afk.stoppen();
        Ok(Schritt::Ende(Ende::Wechsel(ziel)))
    }

    async fn datei_verarbeiten(&mut self, kanal: &Arc<Kanal>, daten: Bytes) -> SignalingResult<()> {
        let Some(senden) = self.senden.take() else {
            tracing::warn!(benutzer = %self.benutzer, bytes = daten.len(), "Nutzlast ohne vorheriges /send verworfen");
            return Ok(());
        };
        if let Err(e) = transfer::weiterleiten(kanal, &self.benutzer, &self.handle, senden, daten) {
            self.fehler_melden(e).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ausgaben
    // -----------------------------------------------------------------------

    /// Schreibt eine Zeile oder haelt sie waehrend einer Ankuendigung zurueck
    async fn ausgeben(&mut self, zeile: impl Into<String>) -> SignalingResult<()> {
        if let Some(zeile) = self.empfang.ausgabe(zeile.into())? {
            self.verbindung.zeile_senden(zeile).await?;
        }
        Ok(())
    }

    async fn empfang_fortsetzen(&mut self) -> SignalingResult<()> {
        for zeile in self.empfang.fortsetzen() {
            self.verbindung.zeile_senden(zeile).await?;
        }
        Ok(())
    }

    async fn liste_senden(&mut self) -> SignalingResult<()> {
        for zeile in self.state.kanal_liste() {
            self.ausgeben(zeile).await?;
        }
        Ok(())
    }

    /// Benutzerfehler als Meldung an den Client, alles andere nach oben
    async fn fehler_melden(&mut self, fehler: SignalingError) -> SignalingResult<()> {
        match fehler.meldung() {
            Some(meldung) => self.ausgeben(meldung).await,
            None => Err(fehler),
        }
    }

    /// Serverseitige Stummschaltung (nur wenn konfiguriert)
    async fn stumm_pruefen(&mut self, kanal: &Kanal) -> SignalingResult<bool> {
        if !self.state.config.stumm_erzwingen {
            return Ok(false);
        }
        match kanal.stumm_verbleibend(&self.benutzer) {
            Some(sekunden) => {
                self.ausgeben(nachrichten::noch_stumm(sekunden)).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Letzte Antwort abwarten, offene Angebote abbrechen, Inbox leeren, Socket schliessen
    async fn abschliessen(mut self) {
        self.inbox.close();
        self.letzte_antwort().await;

        let mut rest = self.empfang.abbrechen();
        while let Ok(nachricht) = self.inbox.try_recv() {
            match nachricht {
                SessionNachricht::Zeile(zeile) => rest.push(zeile),
                SessionNachricht::DateiAngebot(angebot) => angebot.fehlschlag_melden(),
                SessionNachricht::Befoerdert { .. } | SessionNachricht::Schliessen => {}
            }
        }

        for zeile in rest {
            if let Err(e) = self.verbindung.zeile_senden(zeile).await {
                tracing::debug!(peer = %self.verbindung.peer(), fehler = %e, "Restausgabe abgebrochen");
                break;
            }
        }

        tracing::info!(peer = %self.verbindung.peer(), benutzer = %self.benutzer, "Sitzung beendet");
        self.verbindung.schliessen().await;
    }

    /// Steht eine Ankuendigung offen, kann `Ready` schon unterwegs sein
    ///
    /// Kommt es innerhalb der Frist, geht die Nutzlast vor allen
    /// zurueckgehaltenen Zeilen raus. Sonst bricht `abbrechen` das Angebot ab.
    async fn letzte_antwort(&mut self) {
        if !self.empfang.wartet_auf_bereit() {
            return;
        }

        let frist = tokio::time::sleep(ANTWORT_FRIST);
        tokio::pin!(frist);
        let zeile = loop {
            tokio::select! {
                eingang = self.verbindung.empfangen() => match eingang {
                    Some(Ok(Eingang::Zeile(zeile))) => break zeile,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => return,
                },
                _ = &mut frist => {
                    tracing::debug!(benutzer = %self.benutzer, "Keine Antwort auf Ankuendigung");
                    return;
                }
            }
        };

        match self.empfang.antwort(&zeile) {
            Antwort::Bereit(angebot) => {
                if let Err(e) = self.verbindung.daten_senden(angebot.daten.clone()).await {
                    tracing::debug!(benutzer = %self.benutzer, fehler = %e, "Nutzlast nicht zustellbar");
                    angebot.fehlschlag_melden();
                    return;
                }
                let hinweis = angebot.zustellung_bestaetigen(&self.state.konsole);
                if let Err(e) = self.verbindung.zeile_senden(hinweis).await {
                    tracing::debug!(benutzer = %self.benutzer, fehler = %e, "Hinweis nicht zustellbar");
                }
            }
            Antwort::Abgelehnt(angebot) => angebot.fehlschlag_melden(),
            Antwort::KeinTransfer => {}
        }
    }
}
