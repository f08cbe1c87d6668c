use serde::{Deserialize, Serialize};

use crate::roster::{FighterSpec, RosterManifest};
use crate::state::{AppState, SheetTarget};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,
    UiTerminalResize(u16, u16),
    Tick,

    // Title menu
    MenuSelect(usize),
    MenuConfirm,
    SaveExists(bool),

    // Roster selection
    FighterSelect(usize),
    FighterConfirm,

    // Sheet loading
    SheetDidLoad {
        target: SheetTarget,
        generation: u64,
        spec: FighterSpec,
    },
    SheetDidError {
        target: SheetTarget,
        generation: u64,
        error: String,
    },
    RosterDidLoad(RosterManifest),
    RosterDidError(String),

    // Battle
    BattleMenuNext,
    BattleMenuPrev,
    BattleConfirm,
    LeaveBattle,
    AutoTurnFired {
        turn: u32,
    },
    AutoTurnLapsed,

    // Save/Load
    SaveGame,
    SaveComplete,
    SaveError(String),
    LoadGame,
    LoadComplete(Box<AppState>),
    LoadError(String),

    Quit,
}
