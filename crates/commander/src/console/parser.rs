//! Parser fuer Operator-Zeilen
//!
//! Format: `/befehl arg1 arg2 ...`, getrennt durch genau ein Leerzeichen.
//! Jedes Argument muss aus druckbaren ASCII-Zeichen ohne Leerzeichen
//! bestehen. Zeilen mit unbekanntem Befehl werden ignoriert.

use kanalchat_protocol::nachrichten::{
    VERWENDUNG_EMPTY, VERWENDUNG_KICK, VERWENDUNG_MUTE, VERWENDUNG_SHUTDOWN,
};

use crate::commands::types::OperatorBefehl;
use crate::error::{CommanderError, CommanderResult};

/// Parst eine Konsolenzeile
///
/// `Ok(None)` fuer Zeilen ohne bekannten Befehl, `Err(Verwendung)` wenn der
/// Befehl erkannt wurde, die Argumente aber nicht passen.
pub fn zeile_parsen(zeile: &str) -> CommanderResult<Option<OperatorBefehl>> {
    let zeile = zeile.trim_end_matches(['\r', '\n']);
    let tokens: Vec<&str> = zeile.split(' ').collect();

    let befehl = match tokens[0] {
        "/kick" => {
            let [kanal, benutzer] = argumente::<2>(&tokens, VERWENDUNG_KICK)?;
            OperatorBefehl::Kick {
                kanal: kanal.to_string(),
                benutzer: benutzer.to_string(),
            }
        }
        "/mute" => {
            let [kanal, benutzer, dauer] = argumente::<3>(&tokens, VERWENDUNG_MUTE)?;
            OperatorBefehl::Mute {
                kanal: kanal.to_string(),
                benutzer: benutzer.to_string(),
                dauer: dauer.to_string(),
            }
        }
        "/empty" => {
            let [kanal] = argumente::<1>(&tokens, VERWENDUNG_EMPTY)?;
            OperatorBefehl::Empty {
                kanal: kanal.to_string(),
            }
        }
        "/shutdown" => {
            argumente::<0>(&tokens, VERWENDUNG_SHUTDOWN)?;
            OperatorBefehl::Shutdown
        }
        _ => return Ok(None),
    };
    Ok(Some(befehl))
}

/// Genau `N` gueltige Argumente nach dem Befehlsnamen
fn argumente<'a, const N: usize>(
    tokens: &[&'a str],
    verwendung: &'static str,
) -> CommanderResult<[&'a str; N]> {
    let args: [&str; N] = tokens[1..]
        .try_into()
        .map_err(|_| CommanderError::Verwendung(verwendung))?;
    if args.iter().all(|a| token_gueltig(a)) {
        Ok(args)
    } else {
        Err(CommanderError::Verwendung(verwendung))
    }
}

fn token_gueltig(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| (0x21..=0x7e).contains(&b))
}
