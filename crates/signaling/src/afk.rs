//! AFK-Timer – einmaliger, neu startbarer Inaktivitaets-Timer
//!
//! Die Sitzung startet den Timer nach jeder verarbeiteten Eingabe neu und
//! wartet im `select!` per `sleep_until` auf die Frist. Laeuft sie ab,
//! wird der ausstehende Lesevorgang verworfen und die Sitzung endet.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct AfkTimer {
    dauer: Duration,
    frist: Option<Instant>,
}

impl AfkTimer {
    pub fn neu(dauer: Duration) -> Self {
        Self { dauer, frist: None }
    }

    /// Startet (oder verlaengert) den Timer ab jetzt
    pub fn starten(&mut self) {
        self.frist = Some(Instant::now() + self.dauer);
    }

    pub fn stoppen(&mut self) {
        self.frist = None;
    }

    pub fn ist_aktiv(&self) -> bool {
        self.frist.is_some()
    }

    /// Frist fuer `sleep_until`; ohne aktiven Timer weit in der Zukunft
    pub fn frist(&self) -> Instant {
        self.frist
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400 * 365))
    }
}
