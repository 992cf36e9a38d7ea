//! Leseschleife der Operator-Konsole

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::executor::BefehlsAusfuehrer;
use crate::commands::types::Ausfuehrung;
use crate::console::parser::zeile_parsen;
use crate::error::CommanderResult;

/// Liest Befehle bis `/shutdown` oder Ende der Eingabe
///
/// Gibt [`Ausfuehrung::Herunterfahren`] nur nach `/shutdown` zurueck; am
/// Ende der Eingabe laeuft der Server ohne Konsole weiter.
pub async fn konsole_lesen<R>(
    eingabe: R,
    ausfuehrer: &BefehlsAusfuehrer,
) -> CommanderResult<Ausfuehrung>
where
    R: AsyncBufRead + Unpin,
{
    let mut zeilen = eingabe.lines();
    while let Some(zeile) = zeilen.next_line().await? {
        match zeile_parsen(&zeile) {
            Ok(Some(befehl)) => {
                if ausfuehrer.ausfuehren(befehl) == Ausfuehrung::Herunterfahren {
                    return Ok(Ausfuehrung::Herunterfahren);
                }
            }
            Ok(None) => {
                tracing::debug!(zeile = %zeile, "Unbekannte Konsolenzeile ignoriert");
            }
            Err(e) => match e.konsolen_zeile() {
                Some(verwendung) => ausfuehrer.konsole().ausgeben(verwendung),
                None => return Err(e),
            },
        }
    }

    tracing::info!("Operator-Eingabe beendet");
    Ok(Ausfuehrung::Weiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanalchat_core::KanalBeschreibung;
    use kanalchat_signaling::{Konsole, SignalingConfig, SignalingState};
    use std::sync::Arc;

    fn aufbau() -> (BefehlsAusfuehrer, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (konsole, rx) = Konsole::neu();
        let state = SignalingState::neu(
            SignalingConfig::default(),
            vec![KanalBeschreibung::neu("general", 6000, 2).unwrap()],
            konsole,
        );
        (BefehlsAusfuehrer::neu(Arc::clone(&state)), rx)
    }

    #[tokio::test]
    async fn verarbeitet_bis_shutdown() {
        let (ausfuehrer, mut rx) = aufbau();
        let eingabe: &[u8] = b"hallo\n/kick general\n/empty nirgendwo\n/shutdown\n/empty general\n";

        let ergebnis = konsole_lesen(eingabe, &ausfuehrer).await.unwrap();
        assert_eq!(ergebnis, Ausfuehrung::Herunterfahren);

        let mut zeilen = Vec::new();
        while let Ok(zeile) = rx.try_recv() {
            zeilen.push(zeile);
        }
        assert_eq!(
            zeilen,
            vec![
                "Usage: /kick channel_name client_username",
                "[Server Message] Channel \"nirgendwo\" does not exist.",
                "[Server Message] Server shuts down.",
            ]
        );
    }

    #[tokio::test]
    async fn ende_der_eingabe() {
        let (ausfuehrer, _rx) = aufbau();
        let eingabe: &[u8] = b"/empty general\n";
        assert_eq!(
            konsole_lesen(eingabe, &ausfuehrer).await.unwrap(),
            Ausfuehrung::Weiter
        );
    }
}
