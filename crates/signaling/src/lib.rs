//! kanalchat-signaling – Kanal- und Sitzungsverwaltung
//!
//! Dieser Crate implementiert den Kern des Chat-Servers: Aufnahme gegen die
//! Kanalkapazitaet, FIFO-Warteschlange mit Befoerderung, den Zustandsautomaten
//! pro Client, den AFK-Timeout und die Dateiweiterleitung ueber dieselbe
//! Verbindung wie der Chat-Text.
//!
//! ## Architektur
//!
//! ```text
//! SignalingServer (ein TcpListener pro Kanal)
//!     |
//!     v
//! Sitzung (pro Verbindung ein Task)
//!     |  Zustaende: Aufnahme -> Verbunden | Wartend -> [Wechsel] -> Beendet
//!     |
//!     +-- Kanal            (Mitglieder, Warteschlange, AFK, Operator-Aktionen)
//!     +-- transfer         (Dateiangebote zwischen zwei Sitzungen)
//!     +-- AfkTimer         (einmalige Frist, bei jeder Eingabe neu)
//!
//! SignalingState – alle Kanaele, Konfiguration, Operator-Konsole
//! Konsole        – Ausgabezeilen fuer den Operator (stdout)
//! ```

pub mod afk;
pub mod channel;
pub mod connection;
pub mod console;
pub mod error;
pub mod server_state;
pub mod session;
pub mod tcp;
pub mod transfer;

// Bequeme Re-Exporte
pub use channel::{Abgangsgrund, Aufnahme, Kanal, KanalStatus, Mitgliedschaft};
pub use connection::{Inbox, SessionNachricht, VerbindungsHandle, STANDARD_MAX_RUECKSTAND};
pub use console::Konsole;
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use session::sitzung_ausfuehren;
pub use tcp::SignalingServer;
