//! Lokale Stummschaltung
//!
//! Der Server teilt die Dauer mit, der Client schweigt danach selbst.
//! Eine neue Stummschaltung ersetzt die laufende.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct Stummschaltung {
    bis: Option<Instant>,
    /// Zuletzt gemeldete Dauer in Sekunden
    dauer: u64,
}

impl Stummschaltung {
    pub fn setzen(&mut self, sekunden: u64) {
        self.bis = Some(Instant::now() + Duration::from_secs(sekunden));
        self.dauer = sekunden;
    }

    pub fn aktiv(&self) -> bool {
        self.bis.is_some_and(|bis| Instant::now() < bis)
    }

    /// Dauer fuer die Hinweiszeile; wie vom Server gemeldet, nicht die Restzeit
    pub fn dauer(&self) -> u64 {
        self.dauer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn laeuft_ab() {
        let mut stumm = Stummschaltung::default();
        assert!(!stumm.aktiv());

        stumm.setzen(5);
        assert!(stumm.aktiv());
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(stumm.aktiv());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!stumm.aktiv());
    }

    #[tokio::test(start_paused = true)]
    async fn neue_ersetzt_alte() {
        let mut stumm = Stummschaltung::default();
        stumm.setzen(10);
        stumm.setzen(2);
        assert_eq!(stumm.dauer(), 2);
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!stumm.aktiv());
    }
}
