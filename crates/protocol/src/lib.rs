//! kanalchat-protocol – Zeilenprotokoll zwischen Client und Server
//!
//! Dieses Crate definiert das Wire-Format (Textzeilen mit eingebettetem,
//! laengenpraefixiertem Dateitransfer), die Client-Befehle und alle
//! Meldungstexte, die Server, Client und Operator-Konsole austauschen.

pub mod befehl;
pub mod meldung;
pub mod nachrichten;
pub mod wire;

pub use befehl::{ClientBefehl, ClientMeldung, ProtokollFehler};
pub use meldung::ServerMeldung;
pub use wire::{Ausgang, CodecFehler, Eingang, ZeilenCodec};
