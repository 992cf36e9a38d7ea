//! Kanal – Aufnahme, Warteschlange, Befoerderung
//!
//! Ein `Kanal` besitzt seine Kapazitaet, die verbundenen Mitglieder, die
//! FIFO-Warteschlange und die AFK-Markierungen. Jede Aenderung laeuft unter
//! dem kanaleigenen Lock; der Lock wird nie ueber einen `.await` gehalten,
//! Ausgaben gehen nur in die Inboxen der Sitzungen.
//!
//! ## Invarianten
//! - `verbunden.len() <= kapazitaet`
//! - ein Benutzername steht hoechstens einmal in `verbunden` oder
//!   `warteschlange`
//! - pro freiem Platz wird genau ein Wartender befoerdert

use kanalchat_core::KanalBeschreibung;
use kanalchat_protocol::nachrichten;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::connection::VerbindungsHandle;
use crate::console::Konsole;
use crate::error::{SignalingError, SignalingResult};

static NAECHSTES_TICKET: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Mitgliedschaft einer Sitzung in einem Kanal
///
/// Das Ticket unterscheidet aufeinanderfolgende Mitgliedschaften mit
/// demselben Namen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mitgliedschaft {
    name: String,
    ticket: u64,
}

impl Mitgliedschaft {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// Ergebnis einer erfolgreichen Aufnahme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aufnahme {
    Verbunden(Mitgliedschaft),
    Wartend {
        mitgliedschaft: Mitgliedschaft,
        vor_dir: usize,
    },
}

impl Aufnahme {
    pub fn mitgliedschaft(&self) -> &Mitgliedschaft {
        match self {
            Self::Verbunden(m) => m,
            Self::Wartend { mitgliedschaft, .. } => mitgliedschaft,
        }
    }
}

/// Grund fuer das Verlassen eines Kanals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abgangsgrund {
    /// `/quit`
    Beendet,
    /// Verbindung abgebrochen
    Getrennt,
    /// Inaktivitaet
    Afk,
    /// `/switch` in einen anderen Kanal
    Gewechselt,
}

/// Momentaufnahme fuer `/list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KanalStatus {
    pub name: String,
    pub port: u16,
    pub verbunden: usize,
    pub kapazitaet: usize,
    pub wartend: usize,
}

impl KanalStatus {
    pub fn zeile(&self) -> String {
        nachrichten::kanal_status(
            &self.name,
            self.port,
            self.verbunden,
            self.kapazitaet,
            self.wartend,
        )
    }
}

#[derive(Debug, Clone)]
struct Mitglied {
    name: String,
    ticket: u64,
    handle: VerbindungsHandle,
}

impl Mitglied {
    fn mitgliedschaft(&self) -> Mitgliedschaft {
        Mitgliedschaft {
            name: self.name.clone(),
            ticket: self.ticket,
        }
    }
}

#[derive(Debug, Default)]
struct KanalZustand {
    verbunden: Vec<Mitglied>,
    warteschlange: VecDeque<Mitglied>,
    afk_markiert: HashSet<String>,
    stumm_bis: HashMap<String, Instant>,
}

impl KanalZustand {
    fn hat_benutzer(&self, name: &str) -> bool {
        self.verbunden.iter().any(|m| m.name == name)
            || self.warteschlange.iter().any(|m| m.name == name)
    }

    fn verbunden_index(&self, name: &str) -> Option<usize> {
        self.verbunden.iter().position(|m| m.name == name)
    }

    fn an_verbundene(&self, zeile: &str, ausser: Option<&str>) {
        for m in &self.verbunden {
            if Some(m.name.as_str()) != ausser {
                m.handle.zeile_senden(zeile);
            }
        }
    }

    fn an_wartende(&self, zeile: &str) {
        for m in &self.warteschlange {
            m.handle.zeile_senden(zeile);
        }
    }

    /// Sendet "N user(s) ahead" an alle Wartenden ab Position `ab`
    fn wartepositionen_senden(&self, ab: usize) {
        for (position, m) in self.warteschlange.iter().enumerate().skip(ab) {
            m.handle.zeile_senden(nachrichten::warteschlange(position));
        }
    }
}

// ---------------------------------------------------------------------------
// Kanal
// ---------------------------------------------------------------------------

/// Ein Chat-Kanal mit eigenem Port und eigener Kapazitaet
#[derive(Debug)]
pub struct Kanal {
    beschreibung: KanalBeschreibung,
    zustand: Mutex<KanalZustand>,
    konsole: Konsole,
}

impl Kanal {
    pub fn neu(beschreibung: KanalBeschreibung, konsole: Konsole) -> Self {
        Self {
            beschreibung,
            zustand: Mutex::new(KanalZustand::default()),
            konsole,
        }
    }

    pub fn name(&self) -> &str {
        self.beschreibung.name.as_str()
    }

    pub fn port(&self) -> u16 {
        self.beschreibung.port
    }

    pub fn kapazitaet(&self) -> usize {
        self.beschreibung.kapazitaet
    }

    // -----------------------------------------------------------------------
    // Aufnahme und Verlassen
    // -----------------------------------------------------------------------

    /// Nimmt einen Benutzer auf: verbunden wenn Platz frei, sonst wartend
    ///
    /// Bei doppeltem Namen bleibt der Zustand unveraendert.
    pub fn aufnehmen(&self, name: &str, handle: VerbindungsHandle) -> SignalingResult<Aufnahme> {
        let mut zustand = self.zustand.lock();

        if zustand.hat_benutzer(name) {
            tracing::info!(kanal = %self.name(), benutzer = %name, "Benutzername bereits vergeben");
            return Err(SignalingError::BenutzerExistiert {
                kanal: self.name().to_string(),
                benutzer: name.to_string(),
            });
        }

        let mitglied = Mitglied {
            name: name.to_string(),
            ticket: NAECHSTES_TICKET.fetch_add(1, Ordering::Relaxed),
            handle,
        };
        let mitgliedschaft = mitglied.mitgliedschaft();

        mitglied.handle.zeile_senden(nachrichten::willkommen(name));

        if zustand.verbunden.len() < self.kapazitaet() {
            zustand.verbunden.push(mitglied);
            self.beitritt_melden(&zustand, name);
            tracing::info!(kanal = %self.name(), benutzer = %name, "Benutzer verbunden");
            Ok(Aufnahme::Verbunden(mitgliedschaft))
        } else {
            let vor_dir = zustand.warteschlange.len();
            mitglied
                .handle
                .zeile_senden(nachrichten::warteschlange(vor_dir));
            zustand.warteschlange.push_back(mitglied);
            tracing::info!(
                kanal = %self.name(),
                benutzer = %name,
                vor_dir,
                "Benutzer in Warteschlange"
            );
            Ok(Aufnahme::Wartend {
                mitgliedschaft,
                vor_dir,
            })
        }
    }

    /// Entfernt eine Mitgliedschaft auf Wunsch der Sitzung
    ///
    /// Gibt `false` zurueck wenn die Mitgliedschaft nicht mehr besteht
    /// (z.B. durch Kick oder Leeren bereits entfernt).
    pub fn verlassen(&self, mitgliedschaft: &Mitgliedschaft, grund: Abgangsgrund) -> bool {
        let mut zustand = self.zustand.lock();
        let name = mitgliedschaft.name();

        let war_afk = zustand.afk_markiert.remove(name);

        if let Some(index) = zustand
            .verbunden
            .iter()
            .position(|m| m.ticket == mitgliedschaft.ticket)
        {
            zustand.verbunden.remove(index);
        } else if let Some(position) = zustand
            .warteschlange
            .iter()
            .position(|m| m.ticket == mitgliedschaft.ticket)
        {
            zustand.warteschlange.remove(position);
            zustand.wartepositionen_senden(position);
        } else {
            tracing::debug!(kanal = %self.name(), benutzer = %name, "Mitgliedschaft bereits beendet");
            return false;
        }

        zustand.stumm_bis.remove(name);

        if grund != Abgangsgrund::Afk && !war_afk {
            let meldung = nachrichten::hat_verlassen(name);
            zustand.an_verbundene(&meldung, None);
            self.konsole.ausgeben(meldung);
        }

        tracing::info!(kanal = %self.name(), benutzer = %name, ?grund, "Benutzer hat Kanal verlassen");

        self.befoerdern(&mut zustand);
        true
    }

    /// Befoerdert pro freiem Platz genau einen Wartenden
    fn befoerdern(&self, zustand: &mut KanalZustand) {
        let mut befoerdert = false;
        while zustand.verbunden.len() < self.kapazitaet() {
            let Some(mitglied) = zustand.warteschlange.pop_front() else {
                break;
            };
            let name = mitglied.name.clone();
            let ticket = mitglied.ticket;
            let handle = mitglied.handle.clone();
            zustand.verbunden.push(mitglied);

            self.beitritt_melden(zustand, &name);
            handle.befoerdern(ticket);
            befoerdert = true;
            tracing::info!(kanal = %self.name(), benutzer = %name, "Aus Warteschlange befoerdert");
        }
        if befoerdert {
            zustand.wartepositionen_senden(0);
        }
    }

    /// Beitrittsmeldungen fuer ein gerade verbundenes Mitglied
    fn beitritt_melden(&self, zustand: &KanalZustand, name: &str) {
        let Some(mitglied) = zustand.verbunden.iter().find(|m| m.name == name) else {
            return;
        };
        mitglied
            .handle
            .zeile_senden(nachrichten::beigetreten(self.name()));
        let meldung = nachrichten::ist_beigetreten(name, self.name());
        zustand.an_verbundene(&meldung, Some(name));
        self.konsole.ausgeben(meldung);
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Name verbunden oder wartend
    pub fn hat_benutzer(&self, name: &str) -> bool {
        self.zustand.lock().hat_benutzer(name)
    }

    pub fn ist_verbunden(&self, name: &str) -> bool {
        self.zustand.lock().verbunden_index(name).is_some()
    }

    pub fn verbundenes_handle(&self, name: &str) -> Option<VerbindungsHandle> {
        let zustand = self.zustand.lock();
        zustand
            .verbunden_index(name)
            .map(|i| zustand.verbunden[i].handle.clone())
    }

    /// (verbunden, wartend)
    pub fn belegung(&self) -> (usize, usize) {
        let zustand = self.zustand.lock();
        (zustand.verbunden.len(), zustand.warteschlange.len())
    }

    pub fn verbundene_namen(&self) -> Vec<String> {
        self.zustand
            .lock()
            .verbunden
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn wartende_namen(&self) -> Vec<String> {
        self.zustand
            .lock()
            .warteschlange
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn status(&self) -> KanalStatus {
        let (verbunden, wartend) = self.belegung();
        KanalStatus {
            name: self.name().to_string(),
            port: self.port(),
            verbunden,
            kapazitaet: self.kapazitaet(),
            wartend,
        }
    }

    /// Restliche Stummdauer in ganzen Sekunden (aufgerundet)
    pub fn stumm_verbleibend(&self, name: &str) -> Option<u64> {
        let mut zustand = self.zustand.lock();
        let bis = *zustand.stumm_bis.get(name)?;
        let jetzt = Instant::now();
        if bis <= jetzt {
            zustand.stumm_bis.remove(name);
            return None;
        }
        let rest = bis - jetzt;
        Some(rest.as_secs() + u64::from(rest.subsec_nanos() > 0))
    }

    // -----------------------------------------------------------------------
    // Nachrichten
    // -----------------------------------------------------------------------

    /// Leitet eine Chat-Zeile an alle Verbundenen (inkl. Absender) weiter
    pub fn chat_weiterleiten(&self, absender: &str, text: &str) -> bool {
        let zustand = self.zustand.lock();
        if zustand.verbunden_index(absender).is_none() {
            return false;
        }
        let zeile = nachrichten::chat(absender, text);
        zustand.an_verbundene(&zeile, None);
        self.konsole.ausgeben(zeile);
        true
    }

    /// Fluestert an ein verbundenes Mitglied
    ///
    /// Gibt die Bestaetigungszeile fuer den Absender zurueck.
    pub fn fluestern(&self, absender: &str, ziel: &str, text: &str) -> SignalingResult<String> {
        let zustand = self.zustand.lock();
        let index = zustand
            .verbunden_index(ziel)
            .ok_or_else(|| SignalingError::NichtImKanal(ziel.to_string()))?;

        zustand.verbunden[index]
            .handle
            .zeile_senden(nachrichten::gefluestert_an_dich(absender, text));

        let bestaetigung = nachrichten::gefluestert(absender, ziel, text);
        self.konsole.ausgeben(bestaetigung.clone());
        Ok(bestaetigung)
    }

    // -----------------------------------------------------------------------
    // AFK
    // -----------------------------------------------------------------------

    /// Meldet einen verbundenen Benutzer als AFK
    ///
    /// Alle Verbundenen (inkl. des Betroffenen) und die Konsole erhalten die
    /// Meldung genau einmal. Danach verlaesst die Sitzung den Kanal mit
    /// [`Abgangsgrund::Afk`].
    pub fn afk_melden(&self, mitgliedschaft: &Mitgliedschaft) -> bool {
        let mut zustand = self.zustand.lock();
        let verbunden = zustand
            .verbunden
            .iter()
            .any(|m| m.ticket == mitgliedschaft.ticket);
        if !verbunden || !zustand.afk_markiert.insert(mitgliedschaft.name.clone()) {
            return false;
        }

        let meldung = nachrichten::afk(mitgliedschaft.name(), self.name());
        zustand.an_verbundene(&meldung, None);
        self.konsole.ausgeben(meldung);
        tracing::info!(kanal = %self.name(), benutzer = %mitgliedschaft.name(), "AFK-Timeout");
        true
    }

    // -----------------------------------------------------------------------
    // Operator
    // -----------------------------------------------------------------------

    /// Entfernt ein verbundenes Mitglied
    pub fn kicken(&self, name: &str) -> SignalingResult<()> {
        let mut zustand = self.zustand.lock();
        let index = zustand
            .verbunden_index(name)
            .ok_or_else(|| SignalingError::NichtImKanal(name.to_string()))?;

        let mitglied = zustand.verbunden.remove(index);
        zustand.afk_markiert.remove(name);
        zustand.stumm_bis.remove(name);
        mitglied.handle.zeile_senden(nachrichten::ENTFERNT);
        mitglied.handle.schliessen();

        self.konsole.ausgeben(nachrichten::gekickt(name));

        let meldung = nachrichten::hat_verlassen(name);
        zustand.an_verbundene(&meldung, None);
        zustand.an_wartende(&meldung);

        tracing::info!(kanal = %self.name(), benutzer = %name, "Benutzer gekickt");

        self.befoerdern(&mut zustand);
        Ok(())
    }

    /// Schaltet ein verbundenes Mitglied stumm
    pub fn stummschalten(&self, name: &str, sekunden: u64) -> SignalingResult<()> {
        let mut zustand = self.zustand.lock();
        let index = zustand
            .verbunden_index(name)
            .ok_or_else(|| SignalingError::NichtImKanal(name.to_string()))?;

        self.konsole
            .ausgeben(nachrichten::stumm_konsole(name, sekunden));

        zustand.verbunden[index]
            .handle
            .zeile_senden(nachrichten::stumm_dir(sekunden));
        zustand.an_verbundene(&nachrichten::stumm_andere(name, sekunden), Some(name));

        zustand.stumm_bis.insert(
            name.to_string(),
            Instant::now() + Duration::from_secs(sekunden),
        );

        tracing::info!(kanal = %self.name(), benutzer = %name, sekunden, "Benutzer stummgeschaltet");
        Ok(())
    }

    /// Entfernt alle verbundenen Mitglieder und befoerdert danach
    ///
    /// Gibt die Anzahl der entfernten Mitglieder zurueck.
    pub fn leeren(&self) -> usize {
        let mut zustand = self.zustand.lock();
        let entfernt: Vec<Mitglied> = zustand.verbunden.drain(..).collect();

        for mitglied in &entfernt {
            mitglied.handle.zeile_senden(nachrichten::ENTFERNT);
            mitglied.handle.schliessen();
            zustand.afk_markiert.remove(&mitglied.name);
            zustand.stumm_bis.remove(&mitglied.name);
        }

        self.konsole.ausgeben(nachrichten::geleert(self.name()));

        for mitglied in &entfernt {
            zustand.an_wartende(&nachrichten::hat_verlassen(&mitglied.name));
        }

        tracing::info!(kanal = %self.name(), anzahl = entfernt.len(), "Kanal geleert");

        self.befoerdern(&mut zustand);
        entfernt.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
