//! Sitzungstests gegen einen Server-Stub ueber In-Memory-Streams

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use kanalchat_client::{sitzung_ausfuehren, ClientFehler, Ende, ServerVerbindung};
use kanalchat_protocol::befehl::{VERWENDUNG_QUIT, VERWENDUNG_SEND, VERWENDUNG_SWITCH};
use kanalchat_protocol::{nachrichten, Ausgang, ClientMeldung, Eingang, ZeilenCodec};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::Framed;

const FRIST: Duration = Duration::from_secs(2);

struct Aufbau {
    server: Framed<DuplexStream, ZeilenCodec>,
    stdin: DuplexStream,
    stdout: Lines<BufReader<DuplexStream>>,
    sitzung: JoinHandle<Result<Ende, ClientFehler>>,
    verzeichnis: TempDir,
}

impl Aufbau {
    fn starten(benutzer: &'static str) -> Self {
        let (client_seite, server_seite) = tokio::io::duplex(64 * 1024);
        let (stdin, stdin_lesen) = tokio::io::duplex(4096);
        let (stdout_schreiben, stdout) = tokio::io::duplex(64 * 1024);
        let verzeichnis = tempfile::tempdir().unwrap();
        let pfad = verzeichnis.path().to_path_buf();

        let sitzung = tokio::spawn(async move {
            let mut ausgabe = stdout_schreiben;
            sitzung_ausfuehren(
                ServerVerbindung::neu(client_seite),
                benutzer,
                BufReader::new(stdin_lesen),
                &mut ausgabe,
                &pfad,
            )
            .await
        });

        Self {
            server: Framed::new(server_seite, ZeilenCodec::server()),
            stdin,
            stdout: BufReader::new(stdout).lines(),
            sitzung,
            verzeichnis,
        }
    }

    /// Startet und spielt die Begruessung durch
    async fn angemeldet(benutzer: &'static str) -> Self {
        let mut a = Self::starten(benutzer);
        assert_eq!(a.empfangen().await, benutzer);
        a.senden(nachrichten::willkommen(benutzer)).await;
        a.senden(nachrichten::beigetreten("general")).await;
        assert_eq!(a.ausgabe().await, nachrichten::willkommen(benutzer));
        assert_eq!(a.ausgabe().await, nachrichten::beigetreten("general"));
        a
    }

    async fn senden(&mut self, zeile: impl Into<String>) {
        self.server.send(Ausgang::zeile(zeile)).await.unwrap();
    }

    async fn naechstes(&mut self) -> Eingang {
        timeout(FRIST, self.server.next())
            .await
            .expect("Server wartet vergeblich")
            .expect("Client hat geschlossen")
            .unwrap()
    }

    async fn empfangen(&mut self) -> String {
        match self.naechstes().await {
            Eingang::Zeile(zeile) => zeile,
            anderes => panic!("Zeile erwartet, bekam {anderes:?}"),
        }
    }

    async fn eingeben(&mut self, zeile: &str) {
        self.stdin.write_all(format!("{zeile}\n").as_bytes()).await.unwrap();
    }

    async fn ausgabe(&mut self) -> String {
        timeout(FRIST, self.stdout.next_line())
            .await
            .expect("keine Ausgabe")
            .unwrap()
            .expect("stdout geschlossen")
    }

    async fn ende(self) -> Ende {
        timeout(FRIST, self.sitzung)
            .await
            .expect("Sitzung endet nicht")
            .unwrap()
            .unwrap()
    }
}

#[tokio::test]
async fn doppelter_benutzername_beendet_mit_code_2() {
    let mut a = Aufbau::starten("alice");
    assert_eq!(a.empfangen().await, "alice");
    a.senden(nachrichten::benutzer_existiert("general", "alice")).await;

    assert_eq!(a.ausgabe().await, nachrichten::benutzer_existiert("general", "alice"));
    let ende = a.ende().await;
    assert_eq!(ende, Ende::BenutzerExistiert);
    assert_eq!(ende.exit_code(), 2);
}

#[tokio::test]
async fn chat_hin_und_zurueck() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.eingeben("hello there").await;
    assert_eq!(a.empfangen().await, "hello there");

    a.senden(nachrichten::chat("bob", "hi")).await;
    assert_eq!(a.ausgabe().await, "[bob] hi");
}

#[tokio::test]
async fn verwendungsfehler_bleiben_lokal() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.eingeben("/quit now").await;
    assert_eq!(a.ausgabe().await, VERWENDUNG_QUIT);
    a.eingeben("/switch").await;
    assert_eq!(a.ausgabe().await, VERWENDUNG_SWITCH);
    a.eingeben("/send bob").await;
    assert_eq!(a.ausgabe().await, VERWENDUNG_SEND);
    a.eingeben("").await;

    // Nichts davon hat den Server erreicht
    a.eingeben("/list").await;
    assert_eq!(a.empfangen().await, "/list");
}

#[tokio::test]
async fn quit_sendet_und_endet() {
    let mut a = Aufbau::angemeldet("alice").await;
    a.eingeben("/quit").await;
    assert_eq!(a.empfangen().await, "/quit");
    assert_eq!(a.ende().await, Ende::Beendet);
}

#[tokio::test]
async fn stummschaltung_blockiert_lokal() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.senden(nachrichten::stumm_dir(1)).await;
    assert_eq!(a.ausgabe().await, nachrichten::stumm_dir(1));

    a.eingeben("hi").await;
    assert_eq!(a.ausgabe().await, nachrichten::noch_stumm(1));
    a.eingeben("/whisper bob psst").await;
    assert_eq!(a.ausgabe().await, nachrichten::noch_stumm(1));
    a.eingeben("/send bob notiz.txt").await;
    assert_eq!(a.ausgabe().await, nachrichten::noch_stumm(1));

    // /list ist nicht betroffen
    a.eingeben("/list").await;
    assert_eq!(a.empfangen().await, "/list");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    a.eingeben("wieder da").await;
    assert_eq!(a.empfangen().await, "wieder da");
}

#[tokio::test]
async fn datei_empfangen_und_quittieren() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.senden(nachrichten::datei_ankuendigung("notiz.txt", 5)).await;
    assert_eq!(a.empfangen().await, ClientMeldung::BEREIT);

    a.server
        .send(Ausgang::Daten(Bytes::from_static(b"hallo")))
        .await
        .unwrap();
    assert_eq!(a.empfangen().await, ClientMeldung::EMPFANGEN);

    let inhalt = std::fs::read(a.verzeichnis.path().join("notiz.txt")).unwrap();
    assert_eq!(inhalt, b"hallo");

    // Die Ankuendigung selbst wird nicht ausgegeben
    a.senden(nachrichten::datei_hinweis("bob", "notiz.txt", "alice")).await;
    assert_eq!(
        a.ausgabe().await,
        nachrichten::datei_hinweis("bob", "notiz.txt", "alice")
    );
}

#[tokio::test]
async fn zu_grosse_datei_wird_abgelehnt() {
    let mut a = Aufbau::angemeldet("alice").await;

    let groesse = kanalchat_protocol::wire::STANDARD_MAX_DATEIGROESSE + 1;
    a.senden(nachrichten::datei_ankuendigung("riesig.bin", groesse)).await;
    assert_eq!(a.empfangen().await, ClientMeldung::FEHLGESCHLAGEN);

    // Zeilenmodus bleibt aktiv
    a.senden(nachrichten::chat("bob", "schade")).await;
    assert_eq!(a.ausgabe().await, "[bob] schade");
}

#[tokio::test]
async fn datei_senden_nach_startsignal() {
    let mut a = Aufbau::angemeldet("alice").await;

    let quelle = tempfile::tempdir().unwrap();
    let pfad = quelle.path().join("bericht.txt");
    std::fs::write(&pfad, b"inhalt\nmit zeilen").unwrap();
    let pfad = pfad.to_str().unwrap().to_string();

    a.eingeben(&format!("/send bob {pfad}")).await;
    assert_eq!(a.empfangen().await, format!("/send bob {pfad}"));

    a.senden(nachrichten::UEBERTRAGUNG_STARTEN).await;
    assert_eq!(
        a.naechstes().await,
        Eingang::Datei(Bytes::from_static(b"inhalt\nmit zeilen"))
    );

    a.senden(nachrichten::gesendet(&pfad, "bob")).await;
    assert_eq!(a.ausgabe().await, nachrichten::gesendet(&pfad, "bob"));
}

#[tokio::test]
async fn fehlende_datei_wird_gemeldet() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.eingeben("/send bob /gibt/es/nicht.txt").await;
    assert_eq!(a.empfangen().await, "/send bob /gibt/es/nicht.txt");
    a.senden(nachrichten::UEBERTRAGUNG_STARTEN).await;

    assert_eq!(
        a.ausgabe().await,
        nachrichten::datei_fehlt("/gibt/es/nicht.txt")
    );
}

#[tokio::test]
async fn abwesendes_ziel_verwirft_ausstehenden_versand() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.eingeben("/send bob notiz.txt").await;
    assert_eq!(a.empfangen().await, "/send bob notiz.txt");

    a.senden(nachrichten::nicht_im_kanal("bob")).await;
    assert_eq!(a.ausgabe().await, nachrichten::nicht_im_kanal("bob"));

    // Ohne ausstehenden Versand ist das Startsignal nur Text
    a.senden(nachrichten::UEBERTRAGUNG_STARTEN).await;
    assert_eq!(a.ausgabe().await, nachrichten::UEBERTRAGUNG_STARTEN);
}

#[tokio::test]
async fn afk_anderer_nutzer_laeuft_weiter() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.senden(nachrichten::afk("bob", "general")).await;
    assert_eq!(a.ausgabe().await, nachrichten::afk("bob", "general"));
    a.eingeben("noch da").await;
    assert_eq!(a.empfangen().await, "noch da");

    a.senden(nachrichten::afk("alice", "general")).await;
    assert_eq!(a.ausgabe().await, nachrichten::afk("alice", "general"));
    let ende = a.ende().await;
    assert_eq!(ende, Ende::Afk);
    assert_eq!(ende.exit_code(), 0);
}

#[tokio::test]
async fn entfernt_endet_mit_code_0() {
    let mut a = Aufbau::angemeldet("alice").await;
    a.senden(nachrichten::ENTFERNT).await;
    assert_eq!(a.ausgabe().await, nachrichten::ENTFERNT);
    assert_eq!(a.ende().await, Ende::Entfernt);
}

#[tokio::test]
async fn server_schliesst_verbindung() {
    let a = Aufbau::angemeldet("alice").await;
    let Aufbau { server, sitzung, .. } = a;
    drop(server);

    let ende = timeout(FRIST, sitzung).await.unwrap().unwrap().unwrap();
    assert_eq!(ende, Ende::VerbindungGeschlossen);
    assert_eq!(ende.exit_code(), 8);
}

#[tokio::test]
async fn stdin_ende_haelt_sitzung_offen() {
    let mut a = Aufbau::angemeldet("alice").await;
    a.stdin.shutdown().await.unwrap();

    a.senden(nachrichten::chat("bob", "hallo?")).await;
    assert_eq!(a.ausgabe().await, "[bob] hallo?");

    a.senden(nachrichten::ENTFERNT).await;
    assert_eq!(a.ausgabe().await, nachrichten::ENTFERNT);
    assert_eq!(a.ende().await, Ende::Entfernt);
}

#[tokio::test]
async fn quittung_an_geschlossenen_server_ist_kein_fehler() {
    let mut a = Aufbau::angemeldet("alice").await;

    a.senden(nachrichten::datei_ankuendigung("notiz.txt", 5)).await;
    assert_eq!(a.empfangen().await, ClientMeldung::BEREIT);
    a.server
        .send(Ausgang::Daten(Bytes::from_static(b"hallo")))
        .await
        .unwrap();
    a.senden(nachrichten::ENTFERNT).await;

    // Der Server schliesst, bevor die Quittung ankommt
    let Aufbau {
        server,
        sitzung,
        verzeichnis,
        stdout: _stdout,
        stdin: _stdin,
    } = a;
    drop(server);

    let ende = timeout(FRIST, sitzung).await.unwrap().unwrap().unwrap();
    assert_eq!(ende, Ende::Entfernt);
    let inhalt = std::fs::read(verzeichnis.path().join("notiz.txt")).unwrap();
    assert_eq!(inhalt, b"hallo");
}
