//! chatclient – Terminal-Client fuer Kanalchat
//!
//! Aufruf: `chatclient port_number client_username`

use clap::Parser;
use kanalchat_client::{sitzung_ausfuehren, Cli, ClientFehler, ServerVerbindung};
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    let code = ausfuehren().await;
    // stdin wird blockierend gelesen; ohne explizites Ende wartet die Runtime darauf
    std::process::exit(i32::from(code));
}

async fn ausfuehren() -> u8 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            if let Err(e) = e.print() {
                tracing::debug!(fehler = %e, "Hilfe nicht ausgebbar");
            }
            return 0;
        }
        Err(_) => return fehler_beenden(ClientFehler::Verwendung),
    };

    if let Err(e) = kanalchat_observability::logging_initialisieren("warn", "text") {
        eprintln!("{e}");
    }

    let argumente = match cli.pruefen() {
        Ok(argumente) => argumente,
        Err(e) => return fehler_beenden(e),
    };
    let port_eingabe = cli.argumente.first().map(String::as_str).unwrap_or_default();

    let verbindung = match ServerVerbindung::verbinden(argumente.port, port_eingabe).await {
        Ok(verbindung) => verbindung,
        Err(e) => return fehler_beenden(e),
    };

    let verzeichnis = match std::env::current_dir() {
        Ok(verzeichnis) => verzeichnis,
        Err(e) => return fehler_beenden(e.into()),
    };

    let eingabe = BufReader::new(tokio::io::stdin());
    let mut ausgabe = tokio::io::stdout();

    let ende = tokio::select! {
        ende = sitzung_ausfuehren(verbindung, &argumente.benutzer, eingabe, &mut ausgabe, &verzeichnis) => ende,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C empfangen");
            return 0;
        }
    };

    match ende {
        Ok(ende) => {
            if let Some(meldung) = ende.meldung() {
                eprintln!("{meldung}");
            }
            ende.exit_code()
        }
        Err(e) => fehler_beenden(e),
    }
}

fn fehler_beenden(fehler: ClientFehler) -> u8 {
    eprintln!("{}", fehler.meldung());
    fehler.exit_code()
}
