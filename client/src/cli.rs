//! Kommandozeile: `chatclient port_number client_username`

use clap::Parser;
use kanalchat_core::MIN_PORT;

use crate::error::ClientFehler;

/// chatclient – Terminal-Client fuer Kanalchat
#[derive(Debug, Parser)]
#[command(name = "chatclient", version, about = "Kanalchat client")]
pub struct Cli {
    /// port_number client_username
    #[arg(value_name = "ARGS", num_args = 2, required = true, allow_negative_numbers = true)]
    pub argumente: Vec<String>,
}

/// Gepruefte Argumente
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartArgumente {
    pub port: u16,
    pub benutzer: String,
}

impl Cli {
    pub fn pruefen(&self) -> Result<StartArgumente, ClientFehler> {
        let [port, benutzer] = self.argumente.as_slice() else {
            return Err(ClientFehler::Verwendung);
        };
        if port.trim().is_empty() || benutzer.trim().is_empty() {
            return Err(ClientFehler::Verwendung);
        }

        let port = match port.trim().parse::<i64>() {
            Ok(p) if (i64::from(MIN_PORT)..=i64::from(u16::MAX)).contains(&p) => p as u16,
            _ => return Err(ClientFehler::Verbindung(port.clone())),
        };

        Ok(StartArgumente {
            port,
            benutzer: benutzer.clone(),
        })
    }
}
