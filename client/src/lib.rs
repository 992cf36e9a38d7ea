//! kanalchat-client – Terminal-Client fuer Kanalchat
//!
//! Liest Befehle von stdin, prueft sie lokal, schickt sie an den Server und
//! gibt alle Servermeldungen auf stdout aus. Dateien werden ueber dieselbe
//! Verbindung gesendet und empfangen.

pub mod cli;
pub mod connection;
pub mod error;
pub mod sitzung;
pub mod stumm;

pub use cli::{Cli, StartArgumente};
pub use connection::ServerVerbindung;
pub use error::{ClientFehler, Ende};
pub use sitzung::sitzung_ausfuehren;
