//! Application state - single source of truth.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::roster::{FighterSpec, RosterEntry, RosterManifest};
use crate::turn::ScreenName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Screen {
    Title,
    RosterSelect,
    Battle,
}

impl Screen {
    pub fn label(self) -> &'static str {
        match self {
            Screen::Title => "title",
            Screen::RosterSelect => "roster_select",
            Screen::Battle => "battle",
        }
    }
}

impl ScreenName for Screen {
    fn name(&self) -> &str {
        self.label()
    }
}

/// Lifecycle of the battle turn machinery, tracked by the host.
///
/// `Invalidated` is sticky: once in-flight work has been cancelled by leaving
/// the battle screen, only a fresh battle start moves the machinery again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TurnPhase {
    Idle,
    BattleActive,
    EnemyTurnPending,
    Invalidated,
}

/// Which fighter sheet a load task is feeding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SheetTarget {
    Preview,
    Fighter,
    Opponent,
}

impl SheetTarget {
    pub fn label(self) -> &'static str {
        match self {
            SheetTarget::Preview => "preview",
            SheetTarget::Fighter => "fighter",
            SheetTarget::Opponent => "opponent",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattleStage {
    Intro,
    Menu,
    EnemyTurn,
    Victory,
    Defeat,
    Escape,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleState {
    pub stage: BattleStage,
    pub opponent_entry: RosterEntry,
    /// Loaded asynchronously; stats are provisional until it arrives.
    pub opponent: Option<FighterSpec>,
    pub player_hp: u16,
    pub player_hp_max: u16,
    pub enemy_hp: u16,
    pub enemy_hp_max: u16,
    pub menu_index: usize,
    pub guard_pct: u8,
    pub guard_turns: u8,
    /// Count of resolved player actions; tags auto-turn timers so a fire
    /// belonging to an earlier turn cannot replay.
    pub turn: u32,
    pub message: String,
}

impl BattleState {
    pub fn new(opponent_entry: RosterEntry, player_hp_max: u16, player_hp: u16) -> Self {
        let message = format!("{} enters the pit!", opponent_entry.name);
        Self {
            stage: BattleStage::Intro,
            opponent_entry,
            opponent: None,
            player_hp: player_hp.min(player_hp_max),
            player_hp_max,
            enemy_hp: 1,
            enemy_hp_max: 1,
            menu_index: 0,
            guard_pct: 0,
            guard_turns: 0,
            turn: 0,
            message,
        }
    }

    pub fn opponent_name(&self) -> &str {
        &self.opponent_entry.name
    }

    pub fn opponent_attack(&self) -> u16 {
        self.opponent.as_ref().map(|spec| spec.attack).unwrap_or(10)
    }

    pub fn opponent_defense(&self) -> u16 {
        self.opponent
            .as_ref()
            .map(|spec| spec.defense)
            .unwrap_or(10)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MenuState {
    pub selected: usize,
    pub has_save: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RosterSelectState {
    pub entries: Vec<RosterEntry>,
    pub selected: usize,
    pub preview: Option<FighterSpec>,
    pub preview_loading: bool,
}

impl RosterSelectState {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self {
            entries,
            selected: 0,
            preview: None,
            preview_loading: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub screen: Screen,
    pub turn_phase: TurnPhase,
    #[serde(default = "RosterManifest::builtin")]
    pub roster: RosterManifest,
    #[serde(default = "default_roster_dir")]
    pub roster_dir: String,
    pub menu: Option<MenuState>,
    pub select: Option<RosterSelectState>,
    pub battle: Option<BattleState>,
    /// The chosen fighter's sheet, once loaded.
    pub fighter: Option<FighterSpec>,
    pub fighter_index: usize,
    /// HP carried between battles.
    pub player_hp: u16,
    pub wins: u16,
    /// Staleness counter for in-flight loads; completions tagged with an
    /// older value are dropped.
    #[serde(default)]
    pub load_generation: u64,
    #[serde(default = "default_auto_turn_delay_ms")]
    pub auto_turn_delay_ms: u64,
    pub message: Option<String>,
    #[serde(default)]
    pub message_timer: u16,
    pub rng_seed: u64,
    pub tick: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            terminal_size: (80, 24),
            screen: Screen::Title,
            turn_phase: TurnPhase::Idle,
            roster: RosterManifest::builtin(),
            roster_dir: default_roster_dir(),
            menu: Some(MenuState {
                selected: 0,
                has_save: false,
            }),
            select: None,
            battle: None,
            fighter: None,
            fighter_index: 0,
            player_hp: 0,
            wins: 0,
            load_generation: 0,
            auto_turn_delay_ms: default_auto_turn_delay_ms(),
            message: None,
            message_timer: 0,
            rng_seed: seed_from_time(),
            tick: 0,
        }
    }

    pub fn fighter_name(&self) -> String {
        self.fighter
            .as_ref()
            .map(|spec| spec.name.clone())
            .or_else(|| {
                self.select.as_ref().and_then(|select| {
                    select
                        .entries
                        .get(self.fighter_index)
                        .map(|entry| entry.name.clone())
                })
            })
            .unwrap_or_else(|| "your fighter".to_string())
    }

    pub fn fighter_max_hp(&self) -> u16 {
        self.fighter.as_ref().map(|spec| spec.hp).unwrap_or(40)
    }

    pub fn fighter_attack(&self) -> u16 {
        self.fighter.as_ref().map(|spec| spec.attack).unwrap_or(10)
    }

    pub fn fighter_defense(&self) -> u16 {
        self.fighter.as_ref().map(|spec| spec.defense).unwrap_or(10)
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![
            DebugSection::new("Screen")
                .entry("screen", ron_string(&self.screen))
                .entry("message", ron_string(&self.message))
                .entry("wins", ron_string(&self.wins)),
            DebugSection::new("Turn")
                .entry("phase", ron_string(&self.turn_phase))
                .entry("load_generation", ron_string(&self.load_generation)),
        ];

        if let Some(battle) = &self.battle {
            sections.push(
                DebugSection::new("Battle")
                    .entry("stage", ron_string(&battle.stage))
                    .entry("opponent", ron_string(&battle.opponent_entry.name))
                    .entry("turn", ron_string(&battle.turn))
                    .entry("player_hp", ron_string(&battle.player_hp))
                    .entry("enemy_hp", ron_string(&battle.enemy_hp)),
            );
        }

        sections
    }
}

fn seed_from_time() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() << 32) ^ now.subsec_nanos() as u64
}

fn default_roster_dir() -> String {
    "assets/roster".to_string()
}

fn default_auto_turn_delay_ms() -> u64 {
    10_000
}
