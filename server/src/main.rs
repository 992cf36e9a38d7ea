//! Kanalchat Server – Einstiegspunkt
//!
//! Prueft die Kommandozeile, laedt Einstellungen und Kanaldatei,
//! initialisiert das Logging und startet den Server.

use clap::error::ErrorKind;
use clap::Parser;
use kanalchat_observability::logging_initialisieren;
use kanalchat_server::cli::Cli;
use kanalchat_server::config::ServerConfig;
use kanalchat_server::error::{KonfigFehler, StartFehler};
use kanalchat_server::kanaele::kanaele_laden;
use kanalchat_server::Server;

#[tokio::main]
async fn main() {
    let code = match ausfuehren().await {
        Ok(()) => 0,
        Err(fehler) => {
            tracing::error!(fehler = %fehler, "Server-Start fehlgeschlagen");
            eprintln!("{}", fehler.meldung());
            fehler.exit_code()
        }
    };
    // Ein haengender stdin-Read hielte sonst den Abbau der Runtime auf
    std::process::exit(i32::from(code));
}

async fn ausfuehren() -> Result<(), StartFehler> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => return Err(StartFehler::Verwendung(e.to_string())),
    };
    let args = cli.pruefen()?;

    // Einstellungen (Standardwerte falls Datei fehlt)
    let config_pfad = ServerConfig::pfad_aus_env();
    let config = ServerConfig::laden(&config_pfad)
        .map_err(|e| KonfigFehler::Einstellungen(e.to_string()))?;
    config.pruefen()?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let format = match cli.log_format {
        Some(f) => f.als_str(),
        None => &config.logging.format,
    };
    if let Err(e) = logging_initialisieren(level, format) {
        eprintln!("{e}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        kanal_datei = %args.kanal_datei.display(),
        "Kanalchat Server wird initialisiert"
    );

    let kanaele = kanaele_laden(&args.kanal_datei)?;

    Server::neu(config, args.afk_sek, kanaele).starten().await
}
