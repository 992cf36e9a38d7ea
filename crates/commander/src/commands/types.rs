//! Befehls- und Ergebnistypen der Operator-Konsole

/// Ein syntaktisch gueltiger Operator-Befehl
///
/// Kanal und Benutzer sind hier nur Tokens; ob sie existieren, prueft
/// erst der [`crate::BefehlsAusfuehrer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorBefehl {
    /// Verbundenen Benutzer aus dem Kanal entfernen
    Kick { kanal: String, benutzer: String },
    /// Benutzer stummschalten; die Dauer wird bei der Ausfuehrung geprueft
    Mute {
        kanal: String,
        benutzer: String,
        dauer: String,
    },
    /// Alle verbundenen Benutzer eines Kanals entfernen
    Empty { kanal: String },
    /// Server sofort beenden
    Shutdown,
}

/// Was nach einem Befehl passieren soll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ausfuehrung {
    Weiter,
    Herunterfahren,
}
