//! Integrationstests: echte TCP-Verbindungen gegen den Signaling-Server

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use kanalchat_core::KanalBeschreibung;
use kanalchat_protocol::{Ausgang, Eingang, ZeilenCodec};
use kanalchat_signaling::{Konsole, SignalingConfig, SignalingServer, SignalingState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;

const WARTEZEIT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Hilfen
// ---------------------------------------------------------------------------

struct Umgebung {
    adressen: HashMap<String, SocketAddr>,
    state: Arc<SignalingState>,
    konsole: mpsc::UnboundedReceiver<String>,
    shutdown_tx: watch::Sender<bool>,
}

impl Umgebung {
    async fn starten(kanaele: &[(&str, usize)], config: SignalingConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("kanalchat_signaling=debug")
            .with_test_writer()
            .try_init();

        let beschreibungen = kanaele
            .iter()
            .enumerate()
            .map(|(i, (name, kapazitaet))| {
                KanalBeschreibung::neu(name, 6000 + i as u16, *kapazitaet).unwrap()
            })
            .collect();
        let (konsole, konsole_rx) = Konsole::neu();
        let state = SignalingState::neu(config, beschreibungen, konsole);

        let mut listener = Vec::new();
        for kanal in state.kanaele() {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.push((Arc::clone(kanal), l));
        }
        let server = SignalingServer::mit_listenern(Arc::clone(&state), listener);
        let adressen = server.lokale_adressen().into_iter().collect();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(server.starten(shutdown_rx));

        Self {
            adressen,
            state,
            konsole: konsole_rx,
            shutdown_tx,
        }
    }

    async fn standard(kanaele: &[(&str, usize)]) -> Self {
        Self::starten(kanaele, SignalingConfig::default()).await
    }

    async fn verbinden(&self, kanal: &str, name: &str) -> TestClient {
        let stream = TcpStream::connect(self.adressen[kanal]).await.unwrap();
        let mut client = TestClient {
            framed: Framed::new(stream, ZeilenCodec::client()),
        };
        client.senden(name).await;
        client
    }

    /// Verbindet und liest Willkommen + Beitritt
    async fn beitreten(&self, kanal: &str, name: &str) -> TestClient {
        let mut client = self.verbinden(kanal, name).await;
        client
            .erwarte(&format!("Welcome to chatclient, {name}."))
            .await;
        client
            .erwarte(&format!(
                "[Server Message] You have joined the channel \"{kanal}\"."
            ))
            .await;
        client
    }

    async fn konsole_erwarte(&mut self, erwartet: &str) {
        loop {
            let zeile = tokio::time::timeout(WARTEZEIT, self.konsole.recv())
                .await
                .expect("Konsolenzeile erwartet")
                .expect("Konsole geschlossen");
            if zeile == erwartet {
                return;
            }
        }
    }
}

struct TestClient {
    framed: Framed<TcpStream, ZeilenCodec>,
}

impl TestClient {
    async fn senden(&mut self, zeile: &str) {
        self.framed.send(Ausgang::zeile(zeile)).await.unwrap();
    }

    async fn daten(&mut self, daten: &'static [u8]) {
        self.framed
            .send(Ausgang::Daten(Bytes::from_static(daten)))
            .await
            .unwrap();
    }

    async fn naechstes(&mut self) -> Option<Eingang> {
        tokio::time::timeout(WARTEZEIT, self.framed.next())
            .await
            .expect("Zeitueberschreitung beim Lesen")
            .map(|r| r.unwrap())
    }

    async fn zeile(&mut self) -> String {
        match self.naechstes().await {
            Some(Eingang::Zeile(zeile)) => zeile,
            andere => panic!("Zeile erwartet, bekam {andere:?}"),
        }
    }

    async fn erwarte(&mut self, erwartet: &str) {
        assert_eq!(self.zeile().await, erwartet);
    }

    async fn geschlossen(&mut self) {
        loop {
            match self.naechstes().await {
                None => return,
                Some(_) => continue,
            }
        }
    }

    /// Die Verbindung endet, ohne dass vorher noch etwas kommt
    async fn endet_ohne_ausgabe(&mut self) {
        let eingang = self.naechstes().await;
        assert!(eingang.is_none(), "keine Ausgabe erwartet, bekam {eingang:?}");
    }

    /// Nichts kommt innerhalb von `dauer`
    async fn still(&mut self, dauer: Duration) -> bool {
        tokio::time::timeout(dauer, self.framed.next()).await.is_err()
    }
}

// ---------------------------------------------------------------------------
// Aufnahme und Warteschlange
// ---------------------------------------------------------------------------

#[tokio::test]
async fn warteschlange_und_befoerderung_nach_quit() {
    let mut env = Umgebung::standard(&[("general", 1)]).await;

    let mut a = env.beitreten("general", "A").await;
    env.konsole_erwarte("[Server Message] A has joined the channel \"general\".")
        .await;

    let mut b = env.verbinden("general", "B").await;
    b.erwarte("Welcome to chatclient, B.").await;
    b.erwarte(
        "[Server Message] You are in the waiting queue and there are 0 user(s) ahead of you.",
    )
    .await;

    a.senden("/quit").await;
    b.erwarte("[Server Message] You have joined the channel \"general\".")
        .await;
    env.konsole_erwarte("[Server Message] B has joined the channel \"general\".")
        .await;

    let kanal = env.state.kanal("general").unwrap();
    assert_eq!(kanal.verbundene_namen(), vec!["B"]);
    assert_eq!(kanal.belegung(), (1, 0));
}

#[tokio::test]
async fn warteschlange_fifo_mit_positionen() {
    let env = Umgebung::standard(&[("general", 1)]).await;
    let mut a = env.beitreten("general", "A").await;

    let mut wartende = Vec::new();
    for (i, name) in ["B", "C", "D"].iter().enumerate() {
        let mut c = env.verbinden("general", name).await;
        c.zeile().await;
        c.erwarte(&format!(
            "[Server Message] You are in the waiting queue and there are {i} user(s) ahead of you."
        ))
        .await;
        wartende.push(c);
    }

    a.senden("/quit").await;

    wartende[0]
        .erwarte("[Server Message] You have joined the channel \"general\".")
        .await;
    wartende[1]
        .erwarte(
            "[Server Message] You are in the waiting queue and there are 0 user(s) ahead of you.",
        )
        .await;
    wartende[2]
        .erwarte(
            "[Server Message] You are in the waiting queue and there are 1 user(s) ahead of you.",
        )
        .await;
}

#[tokio::test]
async fn doppelter_benutzername_wird_abgelehnt() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let _a = env.beitreten("general", "alice").await;

    let mut zweite = env.verbinden("general", "alice").await;
    zweite
        .erwarte("[Server Message] Channel \"general\" already has user alice.")
        .await;
    zweite.geschlossen().await;

    assert_eq!(env.state.kanal("general").unwrap().belegung(), (1, 0));
}

#[tokio::test]
async fn ungueltiger_benutzername() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let mut c = env.verbinden("general", "   ").await;
    c.erwarte("[Server Message] Invalid username.").await;
    c.geschlossen().await;
}

#[tokio::test]
async fn gepufferte_eingabe_nach_befoerderung() {
    let env = Umgebung::standard(&[("general", 1)]).await;
    let mut a = env.beitreten("general", "A").await;

    let mut b = env.verbinden("general", "B").await;
    b.zeile().await;
    b.zeile().await;
    b.senden("hallo aus der schlange").await;
    b.senden("/list").await;
    b.erwarte("[Channel] general 6000 Capacity: 1/1, Queue: 1")
        .await;

    a.senden("/quit").await;
    b.erwarte("[Server Message] You have joined the channel \"general\".")
        .await;
    b.erwarte("[B] hallo aus der schlange").await;
}

// ---------------------------------------------------------------------------
// Chat, Whisper, Liste
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_an_alle_und_konsole() {
    let mut env = Umgebung::standard(&[("general", 3)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.erwarte("[Server Message] bob has joined the channel \"general\".")
        .await;

    a.senden("hallo zusammen").await;
    a.erwarte("[alice] hallo zusammen").await;
    b.erwarte("[alice] hallo zusammen").await;
    env.konsole_erwarte("[alice] hallo zusammen").await;
}

#[tokio::test]
async fn fluestern() {
    let env = Umgebung::standard(&[("general", 3)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    a.senden("/whisper bob psst, geheim").await;
    b.erwarte("[alice whispers to you] psst, geheim").await;
    a.erwarte("[alice whispers to bob] psst, geheim").await;

    a.senden("/whisper carol hallo").await;
    a.erwarte("[Server Message] carol is not in the channel.")
        .await;

    a.senden("/whisper").await;
    a.erwarte("[Server Message] Usage: /whisper receiver_client_username chat_message")
        .await;
}

#[tokio::test]
async fn liste_aller_kanaele() {
    let env = Umgebung::standard(&[("general", 2), ("random", 1)]).await;
    let mut a = env.beitreten("general", "alice").await;

    a.senden("/list").await;
    a.erwarte("[Channel] general 6000 Capacity: 1/2, Queue: 0")
        .await;
    a.erwarte("[Channel] random 6001 Capacity: 0/1, Queue: 0")
        .await;
}

// ---------------------------------------------------------------------------
// Wechsel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wechsel_in_anderen_kanal() {
    let env = Umgebung::standard(&[("general", 2), ("random", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    a.senden("/switch random").await;
    b.erwarte("[Server Message] alice has left the channel.")
        .await;
    a.erwarte("Welcome to chatclient, alice.").await;
    a.erwarte("[Server Message] You have joined the channel \"random\".")
        .await;

    assert_eq!(
        env.state.kanal("general").unwrap().verbundene_namen(),
        vec!["bob"]
    );
    assert_eq!(
        env.state.kanal("random").unwrap().verbundene_namen(),
        vec!["alice"]
    );
}

#[tokio::test]
async fn wechsel_mit_namenskollision_laesst_alles_unveraendert() {
    let env = Umgebung::standard(&[("general", 2), ("random", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let _a2 = env.beitreten("random", "alice").await;

    a.senden("/switch random").await;
    a.erwarte("[Server Message] Channel \"random\" already has user alice.")
        .await;

    a.senden("/switch nirgendwo").await;
    a.erwarte("[Server Message] Channel \"nirgendwo\" does not exist.")
        .await;

    assert_eq!(
        env.state.kanal("general").unwrap().verbundene_namen(),
        vec!["alice"]
    );
    assert_eq!(env.state.kanal("random").unwrap().belegung(), (1, 0));

    // Sitzung laeuft weiter
    a.senden("noch da").await;
    a.erwarte("[alice] noch da").await;
}

// ---------------------------------------------------------------------------
// AFK
// ---------------------------------------------------------------------------

#[tokio::test]
async fn afk_entfernt_stillen_client() {
    let config = SignalingConfig {
        afk_dauer: Duration::from_millis(300),
        ..SignalingConfig::default()
    };
    let mut env = Umgebung::starten(&[("general", 1)], config).await;

    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.verbinden("general", "bob").await;
    b.zeile().await;
    b.zeile().await;

    a.erwarte("[Server Message] alice went AFK in channel \"general\".")
        .await;
    a.geschlossen().await;
    env.konsole_erwarte("[Server Message] alice went AFK in channel \"general\".")
        .await;

    // bob rueckt nach, bekommt keine "has left"-Meldung
    b.erwarte("[Server Message] You have joined the channel \"general\".")
        .await;
}

#[tokio::test]
async fn afk_meldung_an_alle_genau_einmal() {
    let config = SignalingConfig {
        afk_dauer: Duration::from_millis(400),
        ..SignalingConfig::default()
    };
    let env = Umgebung::starten(&[("general", 2)], config).await;

    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    // bob haelt sich aktiv, alice schweigt
    for _ in 0..2 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        b.senden("/list").await;
        b.zeile().await;
    }

    let meldung = "[Server Message] alice went AFK in channel \"general\".";
    let mut zeilen = Vec::new();
    while let Ok(Some(Ok(Eingang::Zeile(zeile)))) =
        tokio::time::timeout(Duration::from_millis(300), b.framed.next()).await
    {
        zeilen.push(zeile);
    }
    assert_eq!(zeilen.iter().filter(|z| *z == meldung).count(), 1);
    a.erwarte(meldung).await;
}

// ---------------------------------------------------------------------------
// Dateiuebertragung
// ---------------------------------------------------------------------------

#[tokio::test]
async fn datei_rundreise() {
    let mut env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    let inhalt: &'static [u8] = b"zeile eins\nzeile zwei\n\x00\xff";

    a.senden("/send bob ordner/notiz.bin").await;
    a.erwarte("[Server Message] Start transmission.").await;
    a.senden(&format!("[FileSize] {}", inhalt.len())).await;
    a.daten(inhalt).await;

    b.erwarte(&format!(
        "[Server Message] FileSize notiz.bin {}",
        inhalt.len()
    ))
    .await;
    b.framed.codec_mut().roh_erwarten(inhalt.len());
    b.senden("[Client Message] Ready").await;

    match b.naechstes().await {
        Some(Eingang::Datei(daten)) => assert_eq!(&daten[..], inhalt),
        andere => panic!("Nutzlast erwartet, bekam {andere:?}"),
    }
    b.erwarte("[Server Message] alice sent \"notiz.bin\" to bob.")
        .await;
    b.senden("[Client Message] Received").await;

    a.erwarte("[Server Message] Sent \"ordner/notiz.bin\" to bob.")
        .await;
    env.konsole_erwarte("[Server Message] alice sent \"notiz.bin\" to bob.")
        .await;
}

#[tokio::test]
async fn senden_an_abwesenden_und_sich_selbst() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;

    a.senden("/send bob a.txt").await;
    a.erwarte("[Server Message] bob is not in the channel.")
        .await;

    a.senden("/send alice a.txt").await;
    a.erwarte("[Server Message] Cannot send file to yourself.")
        .await;

    a.senden("/send bob").await;
    a.erwarte("[Server Message] Usage: /send target_client_username file_path")
        .await;
    assert!(a.still(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn abbruch_waehrend_nutzlast() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    a.senden("/send bob gross.bin").await;
    a.erwarte("[Server Message] Start transmission.").await;
    a.senden("[FileSize] 100").await;
    a.daten(b"nur ein teil").await;
    a.framed.get_mut().shutdown().await.unwrap();

    a.erwarte("[Server Message] Failed to send \"gross.bin\" to bob.")
        .await;

    b.erwarte("[Server Message] alice has left the channel.")
        .await;
    assert!(b.still(Duration::from_millis(300)).await);
}

#[tokio::test]
async fn andere_antwort_statt_ready() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    a.senden("/send bob x.txt").await;
    a.erwarte("[Server Message] Start transmission.").await;
    a.senden("[FileSize] 3").await;
    a.daten(b"abc").await;

    b.erwarte("[Server Message] FileSize x.txt 3").await;
    b.senden("doch nicht").await;

    a.erwarte("[Server Message] Failed to send \"x.txt\" to bob.")
        .await;
    // Die Antwort wird als normaler Chat behandelt
    a.erwarte("[bob] doch nicht").await;
    b.erwarte("[bob] doch nicht").await;
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kick_schliesst_verbindung() {
    let mut env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    env.state.kanal("general").unwrap().kicken("bob").unwrap();

    b.erwarte("[Server Message] You are removed from the channel.")
        .await;
    b.geschlossen().await;
    a.erwarte("[Server Message] bob has left the channel.")
        .await;
    env.konsole_erwarte("[Server Message] Kicked bob.").await;
}

#[tokio::test]
async fn leeren_befoerdert_wartende() {
    let env = Umgebung::standard(&[("general", 1)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.verbinden("general", "bob").await;
    b.zeile().await;
    b.zeile().await;

    env.state.kanal("general").unwrap().leeren();

    a.erwarte("[Server Message] You are removed from the channel.")
        .await;
    a.geschlossen().await;
    b.erwarte("[Server Message] alice has left the channel.")
        .await;
    b.erwarte("[Server Message] You have joined the channel \"general\".")
        .await;
}

#[tokio::test]
async fn serverseitige_stummschaltung() {
    let config = SignalingConfig {
        stumm_erzwingen: true,
        ..SignalingConfig::default()
    };
    let env = Umgebung::starten(&[("general", 2)], config).await;
    let mut a = env.beitreten("general", "alice").await;

    env.state
        .kanal("general")
        .unwrap()
        .stummschalten("alice", 60)
        .unwrap();
    a.erwarte("[Server Message] You have been muted for 60 seconds.")
        .await;

    a.senden("darf ich?").await;
    let zeile = a.zeile().await;
    assert!(
        zeile.starts_with("[Server Message] You are still in mute for "),
        "{zeile}"
    );
}

#[tokio::test]
async fn kick_nach_ready_liefert_erst_die_nutzlast() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    a.senden("/send bob notiz.txt").await;
    a.erwarte("[Server Message] Start transmission.").await;
    a.senden("[FileSize] 5").await;
    a.daten(b"hallo").await;
    b.erwarte("[Server Message] FileSize notiz.txt 5").await;

    // Kick trifft ein, bevor die Sitzung das Ready gelesen hat
    env.state.kanal("general").unwrap().kicken("bob").unwrap();
    b.framed.codec_mut().roh_erwarten(5);
    b.senden("[Client Message] Ready").await;

    match b.naechstes().await {
        Some(Eingang::Datei(daten)) => assert_eq!(&daten[..], b"hallo"),
        andere => panic!("Nutzlast erwartet, bekam {andere:?}"),
    }
    b.erwarte("[Server Message] alice sent \"notiz.txt\" to bob.")
        .await;
    b.erwarte("[Server Message] You are removed from the channel.")
        .await;
    b.geschlossen().await;

    a.erwarte("[Server Message] bob has left the channel.")
        .await;
    a.erwarte("[Server Message] Sent \"notiz.txt\" to bob.")
        .await;
}

#[tokio::test]
async fn kick_ohne_antwort_bricht_angebot_ab() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    a.senden("/send bob notiz.txt").await;
    a.erwarte("[Server Message] Start transmission.").await;
    a.senden("[FileSize] 5").await;
    a.daten(b"hallo").await;
    b.erwarte("[Server Message] FileSize notiz.txt 5").await;

    env.state.kanal("general").unwrap().kicken("bob").unwrap();

    b.erwarte("[Server Message] You are removed from the channel.")
        .await;
    b.geschlossen().await;
    a.erwarte("[Server Message] bob has left the channel.")
        .await;
    a.erwarte("[Server Message] Failed to send \"notiz.txt\" to bob.")
        .await;
}

// ---------------------------------------------------------------------------
// Grenzen und Herunterfahren
// ---------------------------------------------------------------------------

#[tokio::test]
async fn voller_rueckhalt_trennt_ziel() {
    let config = SignalingConfig {
        max_rueckstand: 3,
        ..SignalingConfig::default()
    };
    let env = Umgebung::starten(&[("general", 2)], config).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.zeile().await;

    a.senden("/send bob notiz.txt").await;
    a.erwarte("[Server Message] Start transmission.").await;
    a.senden("[FileSize] 5").await;
    a.daten(b"hallo").await;
    b.erwarte("[Server Message] FileSize notiz.txt 5").await;

    // bob antwortet nie; die Chatzeilen stauen sich bei ihm
    for i in 0..4 {
        a.senden(&format!("nachricht {i}")).await;
        a.erwarte(&format!("[alice] nachricht {i}")).await;
    }

    a.erwarte("[Server Message] bob has left the channel.")
        .await;
    a.erwarte("[Server Message] Failed to send \"notiz.txt\" to bob.")
        .await;

    for i in 0..3 {
        b.erwarte(&format!("[alice] nachricht {i}")).await;
    }
    b.geschlossen().await;
}

#[tokio::test]
async fn herunterfahren_ohne_meldung() {
    let env = Umgebung::standard(&[("general", 2)]).await;
    let mut a = env.beitreten("general", "alice").await;
    let mut b = env.beitreten("general", "bob").await;
    a.erwarte("[Server Message] bob has joined the channel \"general\".")
        .await;

    env.shutdown_tx.send(true).unwrap();

    a.endet_ohne_ausgabe().await;
    b.endet_ohne_ausgabe().await;
}
