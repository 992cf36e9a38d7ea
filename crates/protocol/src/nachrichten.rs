//! Textbausteine fuer Server- und Konsolenausgaben
//!
//! Alle Zeilen die Clients oder der Operator-Konsole angezeigt werden,
//! entstehen hier. Die Formate sind Teil des Protokolls, der Client
//! erkennt einige davon wieder (siehe [`crate::meldung`]).

// ---------------------------------------------------------------------------
// Aufnahme und Mitgliedschaft
// ---------------------------------------------------------------------------

pub fn willkommen(benutzer: &str) -> String {
    format!("Welcome to chatclient, {benutzer}.")
}

pub fn benutzer_existiert(kanal: &str, benutzer: &str) -> String {
    format!("[Server Message] Channel \"{kanal}\" already has user {benutzer}.")
}

pub fn warteschlange(vor_dir: usize) -> String {
    format!(
        "[Server Message] You are in the waiting queue and there are {vor_dir} user(s) ahead of you."
    )
}

pub fn beigetreten(kanal: &str) -> String {
    format!("[Server Message] You have joined the channel \"{kanal}\".")
}

pub fn ist_beigetreten(benutzer: &str, kanal: &str) -> String {
    format!("[Server Message] {benutzer} has joined the channel \"{kanal}\".")
}

pub fn hat_verlassen(benutzer: &str) -> String {
    format!("[Server Message] {benutzer} has left the channel.")
}

pub const UNGUELTIGER_BENUTZERNAME: &str = "[Server Message] Invalid username.";

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

pub fn chat(absender: &str, text: &str) -> String {
    format!("[{absender}] {text}")
}

pub fn gefluestert_an_dich(absender: &str, text: &str) -> String {
    format!("[{absender} whispers to you] {text}")
}

pub fn gefluestert(absender: &str, ziel: &str, text: &str) -> String {
    format!("[{absender} whispers to {ziel}] {text}")
}

pub fn nicht_im_kanal(benutzer: &str) -> String {
    format!("[Server Message] {benutzer} is not in the channel.")
}

pub fn kanal_existiert_nicht(kanal: &str) -> String {
    format!("[Server Message] Channel \"{kanal}\" does not exist.")
}

pub fn kanal_status(
    name: &str,
    port: u16,
    verbunden: usize,
    kapazitaet: usize,
    wartend: usize,
) -> String {
    format!("[Channel] {name} {port} Capacity: {verbunden}/{kapazitaet}, Queue: {wartend}")
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

pub const ENTFERNT: &str = "[Server Message] You are removed from the channel.";
pub const UNGUELTIGE_STUMMDAUER: &str = "[Server Message] Invalid mute duration.";
pub const HERUNTERFAHREN: &str = "[Server Message] Server shuts down.";

pub fn gekickt(benutzer: &str) -> String {
    format!("[Server Message] Kicked {benutzer}.")
}

pub fn stumm_konsole(benutzer: &str, sekunden: u64) -> String {
    format!("[Server Message] Muted {benutzer} for {sekunden} seconds.")
}

pub fn stumm_dir(sekunden: u64) -> String {
    format!("[Server Message] You have been muted for {sekunden} seconds.")
}

pub fn stumm_andere(benutzer: &str, sekunden: u64) -> String {
    format!("[Server Message] {benutzer} has been muted for {sekunden} seconds.")
}

pub fn noch_stumm(sekunden: u64) -> String {
    format!("[Server Message] You are still in mute for {sekunden} seconds.")
}

pub fn geleert(kanal: &str) -> String {
    format!("[Server Message] \"{kanal}\" has been emptied.")
}

pub fn afk(benutzer: &str, kanal: &str) -> String {
    format!("[Server Message] {benutzer} went AFK in channel \"{kanal}\".")
}

// ---------------------------------------------------------------------------
// Dateiuebertragung
// ---------------------------------------------------------------------------

pub const NICHT_AN_DICH_SELBST: &str = "[Server Message] Cannot send file to yourself.";
pub const UEBERTRAGUNG_STARTEN: &str = "[Server Message] Start transmission.";

pub fn datei_ankuendigung(basename: &str, groesse: u64) -> String {
    format!("[Server Message] FileSize {basename} {groesse}")
}

pub fn gesendet(pfad: &str, ziel: &str) -> String {
    format!("[Server Message] Sent \"{pfad}\" to {ziel}.")
}

pub fn datei_hinweis(absender: &str, basename: &str, ziel: &str) -> String {
    format!("[Server Message] {absender} sent \"{basename}\" to {ziel}.")
}

pub fn senden_fehlgeschlagen(pfad: &str, ziel: &str) -> String {
    format!("[Server Message] Failed to send \"{pfad}\" to {ziel}.")
}

pub fn datei_fehlt(pfad: &str) -> String {
    format!("[Server Message] \"{pfad}\" does not exist.")
}

/// Letzte Pfadkomponente, getrennt an `/` oder `\`
pub fn basename(pfad: &str) -> &str {
    pfad.rsplit(['/', '\\']).next().unwrap_or(pfad)
}

// ---------------------------------------------------------------------------
// Programmausgaben
// ---------------------------------------------------------------------------

pub const SERVER_WILLKOMMEN: &str = "Welcome to chatserver.";
pub const SERVER_VERWENDUNG: &str = "Usage: chatserver [afk_time] config_file";
pub const UNGUELTIGE_KONFIGURATION: &str = "Error: Invalid configuration file.";
pub const CLIENT_VERWENDUNG: &str = "Usage: chatclient port_number client_username";
pub const VERBINDUNG_GESCHLOSSEN: &str = "Error: server connection closed.";

pub const VERWENDUNG_KICK: &str = "Usage: /kick channel_name client_username";
pub const VERWENDUNG_MUTE: &str = "Usage: /mute channel_name client_username duration";
pub const VERWENDUNG_EMPTY: &str = "Usage: /empty channel_name";
pub const VERWENDUNG_SHUTDOWN: &str = "Usage: /shutdown";

pub fn kanal_erstellt(kanal: &str, port: u16, kapazitaet: usize) -> String {
    format!("Channel \"{kanal}\" is created on port {port}, with a capacity of {kapazitaet}.")
}

pub fn port_belegt(port: u16) -> String {
    format!("Error: unable to listen on port {port}.")
}

pub fn verbindung_fehlgeschlagen(port: &str) -> String {
    format!("Error: Unable to connect to port {port}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_von_pfaden() {
        assert_eq!(basename("bild.png"), "bild.png");
        assert_eq!(basename("./a/b/bild.png"), "bild.png");
        assert_eq!(basename("C:\\temp\\x.txt"), "x.txt");
        assert_eq!(basename("ordner/"), "");
    }

    #[test]
    fn formate() {
        assert_eq!(
            warteschlange(0),
            "[Server Message] You are in the waiting queue and there are 0 user(s) ahead of you."
        );
        assert_eq!(
            kanal_status("general", 6000, 1, 5, 2),
            "[Channel] general 6000 Capacity: 1/5, Queue: 2"
        );
        assert_eq!(
            afk("alice", "general"),
            "[Server Message] alice went AFK in channel \"general\"."
        );
        assert_eq!(
            datei_ankuendigung("x.bin", 12),
            "[Server Message] FileSize x.bin 12"
        );
    }
}
