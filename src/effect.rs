use crate::roster::RosterEntry;
use crate::state::{AppState, SheetTarget};

#[derive(Clone, Debug)]
pub enum Effect {
    LoadRoster {
        dir: String,
    },
    LoadSheet {
        target: SheetTarget,
        dir: String,
        entry: RosterEntry,
        generation: u64,
    },
    /// Cancels every in-flight sheet load task.
    CancelBattleLoads,
    /// Schedules the enemy's reply for the given turn.
    ArmAutoTurn {
        delay_ms: u64,
        turn: u32,
    },
    DisarmAutoTurn,

    // Save/Load
    CheckSaveExists,
    SaveGame {
        state: Box<AppState>,
    },
    LoadGame,
}
