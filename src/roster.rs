//! Fighter roster: manifest + per-fighter sheets, loaded from RON assets.
//!
//! The binary ships with a built-in roster so it runs without any assets on
//! disk; a roster directory, when present, overrides it.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RosterManifest {
    pub name: String,
    pub fighters: Vec<RosterEntry>,
    pub opponents: Vec<RosterEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub sheet_path: String,
}

/// Full stat sheet for one fighter or opponent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FighterSpec {
    pub id: String,
    pub name: String,
    pub hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub speed: u16,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub art: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("no built-in sheet for {0}")]
    UnknownFighter(String),
}

/// Loads the roster manifest from `dir`, falling back to the built-in roster
/// when the directory has no manifest.
pub async fn load_manifest(dir: &Path) -> Result<RosterManifest, RosterError> {
    let path = dir.join("manifest.ron");
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => ron::de::from_str(&contents).map_err(|source| RosterError::Parse {
            path: path.display().to_string(),
            source,
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(RosterManifest::builtin())
        }
        Err(source) => Err(RosterError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Loads one fighter sheet, falling back to the built-in table when the file
/// is absent.
pub async fn load_sheet(dir: &Path, entry: &RosterEntry) -> Result<FighterSpec, RosterError> {
    let path = dir.join(&entry.sheet_path);
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => ron::de::from_str(&contents).map_err(|source| RosterError::Parse {
            path: path.display().to_string(),
            source,
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => builtin_sheet(&entry.id)
            .ok_or_else(|| RosterError::UnknownFighter(entry.id.clone())),
        Err(source) => Err(RosterError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

impl RosterManifest {
    pub fn builtin() -> Self {
        fn entry(id: &str, name: &str) -> RosterEntry {
            RosterEntry {
                id: id.to_string(),
                name: name.to_string(),
                sheet_path: format!("sheets/{id}.ron"),
            }
        }
        Self {
            name: "Ashen Pit".to_string(),
            fighters: vec![
                entry("varga", "Varga"),
                entry("okkal", "Okkal"),
                entry("senn", "Senn"),
            ],
            opponents: vec![
                entry("rathmor", "Rathmor"),
                entry("bruke", "Bruke"),
                entry("ixis", "Ixis"),
                entry("maulwyrm", "Maulwyrm"),
            ],
        }
    }
}

pub fn builtin_sheet(id: &str) -> Option<FighterSpec> {
    let (name, hp, attack, defense, speed, title, art) = match id {
        "varga" => (
            "Varga",
            44,
            52,
            40,
            58,
            "the Lamplighter",
            &["  /\\_/\\", " ( o.o )", "  >|=|<"][..],
        ),
        "okkal" => (
            "Okkal",
            58,
            46,
            55,
            30,
            "Wall of the North",
            &[" [=====]", " | o o |", " |__^__|"][..],
        ),
        "senn" => (
            "Senn",
            38,
            60,
            32,
            66,
            "Twice-Banished",
            &["   ,^.", "  (o o)", "  /|||\\"][..],
        ),
        "rathmor" => (
            "Rathmor",
            50,
            50,
            44,
            40,
            "Pit Veteran",
            &["  {\\/\\}", "  (-_-)", "  /###\\"][..],
        ),
        "bruke" => (
            "Bruke",
            66,
            42,
            58,
            22,
            "the Anvil",
            &[" [#####]", " [ x x ]", " [_____]"][..],
        ),
        "ixis" => (
            "Ixis",
            36,
            64,
            30,
            70,
            "Sand Adder",
            &["   ~~s", "  (o )~", "   `~~~"][..],
        ),
        "maulwyrm" => (
            "Maulwyrm",
            72,
            56,
            50,
            18,
            "the Pit Itself",
            &[" <@@@@@>", " ( O O )", " \\VVVVV/"][..],
        ),
        _ => return None,
    };
    Some(FighterSpec {
        id: id.to_string(),
        name: name.to_string(),
        hp,
        attack,
        defense,
        speed,
        title: Some(title.to_string()),
        art: art.iter().map(|row| row.to_string()).collect(),
    })
}
