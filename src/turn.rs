//! Turn orchestration for the battle screen.
//!
//! Everything here is capability-injected: the reducer and the effect handler
//! hand in small trait objects for "cancel the auto-turn timer", "mark
//! in-flight loads stale" and "commit the screen change", and this module only
//! decides when and in which order those capabilities fire. It holds no timer
//! or task state of its own, so it cannot leak either.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::combat;

/// The one screen label this module gives meaning to.
pub const BATTLE_SCREEN: &str = "battle";

/// True iff the change navigates away from the battle screen.
///
/// Total over arbitrary labels: anything that is not exactly [`BATTLE_SCREEN`]
/// counts as "not battle", including `None`.
pub fn should_invalidate_async_on_screen_change(prev: Option<&str>, next: Option<&str>) -> bool {
    prev == Some(BATTLE_SCREEN) && next != Some(BATTLE_SCREEN)
}

/// Cancellation capabilities owned by the host.
///
/// `clear_timer` stops the pending auto-turn timer; `invalidate_async_work`
/// marks in-flight battle loads stale. The staleness bookkeeping itself (task
/// keys, generation counter) lives with the host.
pub trait TurnCancelOps {
    fn clear_timer(&mut self);
    fn invalidate_async_work(&mut self);
}

/// A screen value the transition guard can classify by label.
pub trait ScreenName {
    fn name(&self) -> &str;
}

impl ScreenName for &str {
    fn name(&self) -> &str {
        self
    }
}

/// Host side of a screen transition: cancellation plus the screen setter.
pub trait ScreenTransitionOps<S>: TurnCancelOps {
    fn set_screen(&mut self, next: S);
}

pub struct ScreenTransition<'a, S> {
    pub prev: Option<&'a str>,
    pub next: S,
}

/// Runs one screen change through the guard.
///
/// On a battle -> non-battle change this calls `clear_timer` and then
/// `invalidate_async_work`, in that order: the timer has to stop firing before
/// the loads are marked stale, otherwise a fire landing between the two could
/// schedule fresh work against an already-stale flag. The screen setter runs
/// unconditionally, and last.
pub fn run_screen_transition<S: ScreenName>(
    transition: ScreenTransition<'_, S>,
    ops: &mut dyn ScreenTransitionOps<S>,
) {
    let ScreenTransition { prev, next } = transition;
    if should_invalidate_async_on_screen_change(prev, Some(next.name())) {
        ops.clear_timer();
        ops.invalidate_async_work();
    }
    ops.set_screen(next);
}

/// Battle configuration the start-of-battle flow receives.
///
/// `fighter_index` and `roster` are per-call; the rest is shared setup the
/// host keeps around between battles.
#[derive(Clone, Debug, PartialEq)]
pub struct StartBattleFlowArgs<R> {
    pub fighter_index: usize,
    pub roster: R,
    pub auto_turn_delay: Duration,
    pub heal_on_entry: bool,
}

/// Host side of a battle start: cancellation plus the actual flow.
pub trait StartBattleOps<R>: TurnCancelOps {
    fn run_flow(&mut self, args: StartBattleFlowArgs<R>);
}

/// Starts (or restarts) a battle for the fighter at `fighter_index`.
///
/// Invalidation and timer-clearing run unconditionally before the flow, so no
/// timer or load left over from a previous battle can bleed into the new one.
/// The explicit `fighter_index`/`roster` override whatever `shared` carried.
pub fn run_start_battle<R>(
    fighter_index: usize,
    roster: R,
    shared: StartBattleFlowArgs<R>,
    ops: &mut dyn StartBattleOps<R>,
) {
    ops.invalidate_async_work();
    ops.clear_timer();
    ops.run_flow(StartBattleFlowArgs {
        fighter_index,
        roster,
        ..shared
    });
}

/// Raw dependencies one enemy turn needs from the host.
pub trait EnemyTurnOps {
    /// Rolls the enemy's raw damage for this turn, before guard reduction.
    fn roll_damage(&mut self) -> u16;
    /// Applies damage to the player and returns the player's remaining HP.
    fn apply_to_player(&mut self, damage: u16) -> u16;
    fn on_defeat(&mut self, damage: u16);
    fn on_resolved(&mut self, damage: u16);
}

pub struct EnemyTurnDeps<'a> {
    pub ops: &'a mut dyn EnemyTurnOps,
    /// Guard reduction active for this turn, as a percentage.
    pub guard_pct: u8,
}

/// Handler bag handed to the shared enemy-turn flow.
///
/// Assembled fresh for every turn from [`EnemyTurnDeps`]; the bag folds the
/// turn's guard context into the damage roll so the flow never sees raw rolls.
pub struct EnemyTurnHandlers<'a> {
    ops: &'a mut dyn EnemyTurnOps,
    guard_pct: u8,
}

impl EnemyTurnHandlers<'_> {
    pub fn roll_damage(&mut self) -> u16 {
        combat::guarded(self.ops.roll_damage(), self.guard_pct)
    }

    pub fn apply_to_player(&mut self, damage: u16) -> u16 {
        self.ops.apply_to_player(damage)
    }

    pub fn defeated(&mut self, damage: u16) {
        self.ops.on_defeat(damage);
    }

    pub fn resolved(&mut self, damage: u16) {
        self.ops.on_resolved(damage);
    }
}

/// Executes one enemy turn by delegating to `flow` with a fresh handler bag.
///
/// No retry logic and no error handling live here: whatever the flow does
/// propagates to the caller unmodified.
pub fn run_enemy_turn<F>(deps: EnemyTurnDeps<'_>, flow: F)
where
    F: FnOnce(EnemyTurnHandlers<'_>),
{
    let EnemyTurnDeps { ops, guard_pct } = deps;
    flow(EnemyTurnHandlers { ops, guard_pct });
}

pub type TurnRunner<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Mutable slot holding the function that executes the enemy turn as of right
/// now.
///
/// The host (effect handler) writes it, the timeout path only reads it, and
/// always at fire time. A timer armed on turn N that fires after the host has
/// moved on to turn N+1 therefore runs turn N+1's logic, never a stale
/// closure. The slot is mutex-backed because timer tasks fire on the runtime's
/// worker threads; a poisoned lock is treated as still readable since the
/// contained value is just a pointer.
pub struct TurnRunnerCell<T> {
    slot: Mutex<Option<TurnRunner<T>>>,
}

impl<T> TurnRunnerCell<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn install(&self, runner: TurnRunner<T>) {
        *self.lock() = Some(runner);
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Invokes whatever runner is installed right now.
    ///
    /// An empty slot is a valid transient state (mid-teardown), not an error;
    /// it yields `None`. The guard is dropped before the runner executes, so
    /// a runner may reinstall or clear the slot without deadlocking.
    pub fn invoke_current(&self) -> Option<T> {
        let runner = self.lock().clone();
        runner.map(|run| run())
    }

    fn lock(&self) -> MutexGuard<'_, Option<TurnRunner<T>>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T> Default for TurnRunnerCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-argument indirection over a [`TurnRunnerCell`].
///
/// Handed to the timeout flow in place of a direct enemy-turn callback; the
/// cell is dereferenced only when [`fire`](Self::fire) runs.
pub struct CurrentTurnRunner<T> {
    cell: Arc<TurnRunnerCell<T>>,
}

impl<T> CurrentTurnRunner<T> {
    pub fn fire(&self) -> Option<T> {
        self.cell.invoke_current()
    }
}

pub struct TurnTimeoutArgs<T> {
    pub runner: Arc<TurnRunnerCell<T>>,
    pub delay: Duration,
}

pub struct TurnTimeoutFlowArgs<T> {
    pub delay: Duration,
    pub run_enemy_turn: CurrentTurnRunner<T>,
}

/// Hands the timeout flow a late-bound enemy-turn callback.
///
/// The flow receives its timing arguments unchanged plus the indirection; it
/// must call `run_enemy_turn.fire()` when its timer elapses rather than
/// capturing any runner value ahead of time.
pub fn run_turn_timeout<T, F>(args: TurnTimeoutArgs<T>, flow: F)
where
    F: FnOnce(TurnTimeoutFlowArgs<T>),
{
    let TurnTimeoutArgs { runner, delay } = args;
    flow(TurnTimeoutFlowArgs {
        delay,
        run_enemy_turn: CurrentTurnRunner { cell: runner },
    });
}
