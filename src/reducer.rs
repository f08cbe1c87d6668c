use std::time::Duration;

use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::combat;
use crate::effect::Effect;
use crate::state::{
    AppState, BattleStage, BattleState, MenuState, RosterSelectState, Screen, SheetTarget,
    TurnPhase,
};
use crate::turn;

pub const BATTLE_MENU: [&str; 3] = ["Strike", "Guard", "Flee"];
const GUARD_PCT: u8 = 50;

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => {
            state.screen = Screen::Title;
            state.turn_phase = TurnPhase::Idle;
            state.menu = Some(MenuState {
                selected: 0,
                has_save: false,
            });
            state.select = None;
            state.battle = None;
            DispatchResult::changed_with_many(vec![
                Effect::CheckSaveExists,
                Effect::LoadRoster {
                    dir: state.roster_dir.clone(),
                },
            ])
        }
        Action::UiTerminalResize(width, height) => {
            if state.terminal_size != (width, height) {
                state.terminal_size = (width, height);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }
        Action::Tick => tick(state),

        // Title menu
        Action::MenuSelect(index) => {
            if let Some(menu) = state.menu.as_mut() {
                menu.selected = index;
            }
            DispatchResult::changed()
        }
        Action::MenuConfirm => menu_confirm(state),
        Action::SaveExists(exists) => {
            if let Some(menu) = state.menu.as_mut() {
                menu.has_save = exists;
            }
            DispatchResult::changed()
        }

        // Roster selection
        Action::FighterSelect(index) => fighter_select(state, index),
        Action::FighterConfirm => fighter_confirm(state),

        // Sheet loading
        Action::SheetDidLoad {
            target,
            generation,
            spec,
        } => sheet_loaded(state, target, generation, spec),
        Action::SheetDidError {
            target,
            generation,
            error,
        } => sheet_error(state, target, generation, &error),
        Action::RosterDidLoad(manifest) => roster_loaded(state, manifest),
        Action::RosterDidError(error) => {
            state.message = Some(format!("Roster error: {error}"));
            DispatchResult::changed()
        }

        // Battle
        Action::BattleMenuNext => battle_menu_change(state, 1),
        Action::BattleMenuPrev => battle_menu_change(state, -1),
        Action::BattleConfirm => battle_confirm(state),
        Action::LeaveBattle => leave_battle(state),
        Action::AutoTurnFired { turn } => auto_turn_fired(state, turn),
        // A timer that fired while the runner slot was empty; nothing to do.
        Action::AutoTurnLapsed => DispatchResult::unchanged(),

        // Save/Load
        Action::SaveGame => DispatchResult::changed_with(Effect::SaveGame {
            state: Box::new(state.clone()),
        }),
        Action::SaveComplete => {
            show_message(state, "Game saved!".to_string());
            DispatchResult::changed()
        }
        Action::SaveError(error) => {
            show_message(state, format!("Save failed: {error}"));
            DispatchResult::changed()
        }
        Action::LoadGame => DispatchResult::changed_with(Effect::LoadGame),
        Action::LoadComplete(loaded) => load_complete(state, *loaded),
        Action::LoadError(error) => {
            show_message(state, format!("Load failed: {error}"));
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

/// Host capabilities handed to the turn orchestration layer.
///
/// Cancellation is expressed as effects (the effect handler owns the task
/// keys) plus the generation bump that makes queued completions stale.
struct TurnHost<'a> {
    state: &'a mut AppState,
    effects: &'a mut Vec<Effect>,
}

impl turn::TurnCancelOps for TurnHost<'_> {
    fn clear_timer(&mut self) {
        self.effects.push(Effect::DisarmAutoTurn);
    }

    fn invalidate_async_work(&mut self) {
        self.state.load_generation += 1;
        self.effects.push(Effect::CancelBattleLoads);
    }
}

impl turn::ScreenTransitionOps<Screen> for TurnHost<'_> {
    fn set_screen(&mut self, next: Screen) {
        self.state.screen = next;
    }
}

impl turn::StartBattleOps<crate::roster::RosterManifest> for TurnHost<'_> {
    fn run_flow(&mut self, args: turn::StartBattleFlowArgs<crate::roster::RosterManifest>) {
        begin_battle(self.state, self.effects, args);
    }
}

/// All screen changes go through the transition guard; leaving the battle
/// screen is what cancels outstanding timers and loads.
fn transition_screen(state: &mut AppState, effects: &mut Vec<Effect>, next: Screen) {
    let prev = state.screen;
    if turn::should_invalidate_async_on_screen_change(Some(prev.label()), Some(next.label())) {
        state.turn_phase = TurnPhase::Invalidated;
    }
    let mut host = TurnHost { state, effects };
    turn::run_screen_transition(
        turn::ScreenTransition {
            prev: Some(prev.label()),
            next,
        },
        &mut host,
    );
}

fn tick(state: &mut AppState) -> DispatchResult<Effect> {
    state.tick = state.tick.wrapping_add(1);
    if state.message_timer > 0 {
        state.message_timer -= 1;
        if state.message_timer == 0 {
            state.message = None;
            return DispatchResult::changed();
        }
    }
    DispatchResult::unchanged()
}

fn show_message(state: &mut AppState, message: String) {
    state.message = Some(message);
    state.message_timer = 30;
}

fn menu_confirm(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(menu) = state.menu.as_ref() else {
        return DispatchResult::unchanged();
    };

    match menu.selected {
        0 => {
            // New run
            state.fighter = None;
            state.fighter_index = 0;
            state.player_hp = 0;
            state.wins = 0;
            state.menu = None;
            let mut effects = Vec::new();
            transition_screen(state, &mut effects, Screen::RosterSelect);
            effects.extend(open_roster_select(state));
            DispatchResult::changed_with_many(effects)
        }
        1 if menu.has_save => {
            state.menu = None;
            DispatchResult::changed_with(Effect::LoadGame)
        }
        1 => {
            show_message(state, "No save file found.".to_string());
            DispatchResult::changed()
        }
        _ => DispatchResult::unchanged(), // Quit is handled by the UI
    }
}

fn open_roster_select(state: &mut AppState) -> Vec<Effect> {
    let mut select = RosterSelectState::new(state.roster.fighters.clone());
    select.selected = state.fighter_index.min(select.entries.len().saturating_sub(1));
    let effects = preview_load_effect(state, &select);
    state.select = Some(select);
    effects
}

fn preview_load_effect(state: &AppState, select: &RosterSelectState) -> Vec<Effect> {
    match select.entries.get(select.selected) {
        Some(entry) => vec![Effect::LoadSheet {
            target: SheetTarget::Preview,
            dir: state.roster_dir.clone(),
            entry: entry.clone(),
            generation: state.load_generation,
        }],
        None => Vec::new(),
    }
}

fn fighter_select(state: &mut AppState, index: usize) -> DispatchResult<Effect> {
    let Some(select) = state.select.as_mut() else {
        return DispatchResult::unchanged();
    };
    if index >= select.entries.len() || select.selected == index {
        return DispatchResult::unchanged();
    }
    select.selected = index;
    select.preview = None;
    select.preview_loading = true;
    let entry = select.entries[index].clone();

    DispatchResult::changed_with(Effect::LoadSheet {
        target: SheetTarget::Preview,
        dir: state.roster_dir.clone(),
        entry,
        generation: state.load_generation,
    })
}

fn fighter_confirm(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(select) = state.select.as_ref() else {
        return DispatchResult::unchanged();
    };
    if select.entries.is_empty() {
        return DispatchResult::unchanged();
    }
    let fighter_index = select.selected;
    let roster = state.roster.clone();
    let shared = turn::StartBattleFlowArgs {
        fighter_index: 0,
        roster: state.roster.clone(),
        auto_turn_delay: Duration::from_millis(state.auto_turn_delay_ms),
        heal_on_entry: false,
    };

    let mut effects = Vec::new();
    let mut host = TurnHost {
        state,
        effects: &mut effects,
    };
    turn::run_start_battle(fighter_index, roster, shared, &mut host);
    DispatchResult::changed_with_many(effects)
}

/// Shared start-of-battle flow, invoked by the start controller after it has
/// invalidated leftovers from any previous battle.
fn begin_battle(
    state: &mut AppState,
    effects: &mut Vec<Effect>,
    args: turn::StartBattleFlowArgs<crate::roster::RosterManifest>,
) {
    let Some(fighter_entry) = args.roster.fighters.get(args.fighter_index).cloned() else {
        show_message(state, "That fighter is not on the roster.".to_string());
        return;
    };
    if args.roster.opponents.is_empty() {
        show_message(state, "No opponents are scheduled today.".to_string());
        return;
    }

    state.fighter_index = args.fighter_index;

    // Reuse the preview sheet when it is the chosen fighter's; otherwise the
    // sheet streams in while the intro plays.
    let preview = state
        .select
        .as_ref()
        .and_then(|select| select.preview.clone());
    match preview {
        Some(spec) if spec.id == fighter_entry.id => state.fighter = Some(spec),
        _ => {
            if state.fighter.as_ref().map(|spec| spec.id.as_str()) != Some(fighter_entry.id.as_str())
            {
                state.fighter = None;
                effects.push(Effect::LoadSheet {
                    target: SheetTarget::Fighter,
                    dir: state.roster_dir.clone(),
                    entry: fighter_entry.clone(),
                    generation: state.load_generation,
                });
            }
        }
    }

    let opponent_index = next_rand(state) as usize % args.roster.opponents.len();
    let opponent_entry = args.roster.opponents[opponent_index].clone();

    let player_hp_max = state.fighter_max_hp();
    if args.heal_on_entry || state.player_hp == 0 {
        state.player_hp = player_hp_max;
    }
    state.battle = Some(BattleState::new(
        opponent_entry.clone(),
        player_hp_max,
        state.player_hp,
    ));

    transition_screen(state, effects, Screen::Battle);
    state.turn_phase = TurnPhase::BattleActive;

    effects.push(Effect::LoadSheet {
        target: SheetTarget::Opponent,
        dir: state.roster_dir.clone(),
        entry: opponent_entry,
        generation: state.load_generation,
    });
}

fn battle_menu_change(state: &mut AppState, delta: i16) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    if battle.stage != BattleStage::Menu {
        return DispatchResult::unchanged();
    }
    let len = BATTLE_MENU.len() as i16;
    let mut next = battle.menu_index as i16 + delta;
    if next < 0 {
        next = len - 1;
    }
    if next >= len {
        next = 0;
    }
    if next as usize == battle.menu_index {
        return DispatchResult::unchanged();
    }
    battle.menu_index = next as usize;
    DispatchResult::changed()
}

fn battle_confirm(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(stage) = state.battle.as_ref().map(|battle| battle.stage) else {
        return DispatchResult::unchanged();
    };

    match stage {
        BattleStage::Intro => {
            let name = state.fighter_name();
            if let Some(battle) = state.battle.as_mut() {
                battle.stage = BattleStage::Menu;
                battle.message = format!("What will {name} do?");
            }
            DispatchResult::changed()
        }
        BattleStage::Menu => player_act(state),
        BattleStage::EnemyTurn => {
            // Skip the wait: stop the scheduled reply and run it now.
            resolve_enemy_turn_now(state);
            DispatchResult::changed_with(Effect::DisarmAutoTurn)
        }
        BattleStage::Victory | BattleStage::Escape | BattleStage::Defeat => end_battle(state),
    }
}

fn player_act(state: &mut AppState) -> DispatchResult<Effect> {
    let menu_index = state
        .battle
        .as_ref()
        .map(|battle| battle.menu_index)
        .unwrap_or(0);

    match menu_index {
        0 => {
            let damage = combat::scaled_damage(
                state.fighter_attack(),
                state
                    .battle
                    .as_ref()
                    .map(|battle| battle.opponent_defense())
                    .unwrap_or(10),
                next_rand(state),
            );
            let delay_ms = state.auto_turn_delay_ms;
            let Some(battle) = state.battle.as_mut() else {
                return DispatchResult::unchanged();
            };
            battle.enemy_hp = battle.enemy_hp.saturating_sub(damage);
            if battle.enemy_hp == 0 {
                battle.stage = BattleStage::Victory;
                battle.message = format!("{} goes down!", battle.opponent_name());
                DispatchResult::changed()
            } else {
                battle.stage = BattleStage::EnemyTurn;
                battle.turn += 1;
                let turn = battle.turn;
                battle.message = format!("You hit {} for {damage}!", battle.opponent_name());
                DispatchResult::changed_with(Effect::ArmAutoTurn { delay_ms, turn })
            }
        }
        1 => {
            let delay_ms = state.auto_turn_delay_ms;
            let Some(battle) = state.battle.as_mut() else {
                return DispatchResult::unchanged();
            };
            battle.guard_pct = GUARD_PCT;
            battle.guard_turns = 1;
            battle.stage = BattleStage::EnemyTurn;
            battle.turn += 1;
            let turn = battle.turn;
            battle.message = "You raise your guard.".to_string();
            DispatchResult::changed_with(Effect::ArmAutoTurn { delay_ms, turn })
        }
        _ => {
            let Some(battle) = state.battle.as_mut() else {
                return DispatchResult::unchanged();
            };
            battle.stage = BattleStage::Escape;
            battle.message = "You slip out of the pit.".to_string();
            DispatchResult::changed()
        }
    }
}

struct EnemyTurnHost<'a> {
    state: &'a mut AppState,
}

impl turn::EnemyTurnOps for EnemyTurnHost<'_> {
    fn roll_damage(&mut self) -> u16 {
        let attack = self
            .state
            .battle
            .as_ref()
            .map(|battle| battle.opponent_attack())
            .unwrap_or(10);
        let defense = self.state.fighter_defense();
        let roll = next_rand(self.state);
        combat::scaled_damage(attack, defense, roll)
    }

    fn apply_to_player(&mut self, damage: u16) -> u16 {
        let Some(battle) = self.state.battle.as_mut() else {
            return 1;
        };
        battle.player_hp = battle.player_hp.saturating_sub(damage);
        battle.player_hp
    }

    fn on_defeat(&mut self, damage: u16) {
        if let Some(battle) = self.state.battle.as_mut() {
            battle.stage = BattleStage::Defeat;
            battle.message = format!(
                "{} hits you for {damage}. You fall!",
                battle.opponent_name()
            );
        }
    }

    fn on_resolved(&mut self, damage: u16) {
        let name = self.state.fighter_name();
        if let Some(battle) = self.state.battle.as_mut() {
            battle.stage = BattleStage::Menu;
            battle.message = format!(
                "{} hits you for {damage}. What will {name} do?",
                battle.opponent_name()
            );
            if battle.guard_turns > 0 {
                battle.guard_turns -= 1;
                if battle.guard_turns == 0 {
                    battle.guard_pct = 0;
                }
            }
        }
    }
}

fn resolve_enemy_turn_now(state: &mut AppState) {
    state.turn_phase = TurnPhase::EnemyTurnPending;
    let guard_pct = state
        .battle
        .as_ref()
        .filter(|battle| battle.guard_turns > 0)
        .map(|battle| battle.guard_pct)
        .unwrap_or(0);
    {
        let mut host = EnemyTurnHost {
            state: &mut *state,
        };
        turn::run_enemy_turn(
            turn::EnemyTurnDeps {
                ops: &mut host,
                guard_pct,
            },
            combat::resolve_enemy_turn,
        );
    }
    state.turn_phase = TurnPhase::BattleActive;
}

fn auto_turn_fired(state: &mut AppState, turn: u32) -> DispatchResult<Effect> {
    let live = state
        .battle
        .as_ref()
        .map(|battle| battle.stage == BattleStage::EnemyTurn && battle.turn == turn)
        .unwrap_or(false);
    if !live {
        return DispatchResult::unchanged();
    }
    resolve_enemy_turn_now(state);
    DispatchResult::changed()
}

fn leave_battle(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.take() else {
        return DispatchResult::unchanged();
    };
    state.player_hp = battle.player_hp.min(state.fighter_max_hp());
    show_message(state, "You abandon the bout.".to_string());
    let mut effects = Vec::new();
    transition_screen(state, &mut effects, Screen::RosterSelect);
    let open = open_roster_select(state);
    effects.extend(open);
    DispatchResult::changed_with_many(effects)
}

fn end_battle(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.take() else {
        return DispatchResult::unchanged();
    };

    let mut effects = Vec::new();
    match battle.stage {
        BattleStage::Victory => {
            state.wins += 1;
            state.player_hp = battle.player_hp.min(state.fighter_max_hp());
            show_message(
                state,
                format!("{} wins! {} victories.", state.fighter_name(), state.wins),
            );
            transition_screen(state, &mut effects, Screen::RosterSelect);
            effects.extend(open_roster_select(state));
        }
        BattleStage::Escape => {
            state.player_hp = battle.player_hp.min(state.fighter_max_hp());
            show_message(state, "Back to the roster board.".to_string());
            transition_screen(state, &mut effects, Screen::RosterSelect);
            effects.extend(open_roster_select(state));
        }
        _ => {
            // Defeat: the run is over.
            state.player_hp = 0;
            show_message(state, "Carried out of the pit.".to_string());
            transition_screen(state, &mut effects, Screen::Title);
            state.select = None;
            state.menu = Some(MenuState {
                selected: 0,
                has_save: false,
            });
            effects.push(Effect::CheckSaveExists);
        }
    }
    DispatchResult::changed_with_many(effects)
}

fn sheet_loaded(
    state: &mut AppState,
    target: SheetTarget,
    generation: u64,
    spec: crate::roster::FighterSpec,
) -> DispatchResult<Effect> {
    if generation != state.load_generation {
        return DispatchResult::unchanged();
    }
    match target {
        SheetTarget::Preview => {
            if let Some(select) = state.select.as_mut() {
                let current = select
                    .entries
                    .get(select.selected)
                    .map(|entry| entry.id.as_str());
                if current == Some(spec.id.as_str()) {
                    select.preview = Some(spec);
                    select.preview_loading = false;
                }
            }
        }
        SheetTarget::Fighter => {
            if let Some(battle) = state.battle.as_mut() {
                battle.player_hp_max = spec.hp;
                if battle.turn == 0 {
                    battle.player_hp = spec.hp;
                } else {
                    battle.player_hp = battle.player_hp.min(spec.hp);
                }
            }
            state.fighter = Some(spec);
        }
        SheetTarget::Opponent => {
            if let Some(battle) = state.battle.as_mut() {
                if battle.opponent_entry.id == spec.id {
                    let hp = spec.hp.max(1);
                    battle.enemy_hp_max = hp;
                    battle.enemy_hp = hp;
                    battle.opponent = Some(spec);
                }
            }
        }
    }
    DispatchResult::changed()
}

fn sheet_error(
    state: &mut AppState,
    target: SheetTarget,
    generation: u64,
    error: &str,
) -> DispatchResult<Effect> {
    if generation != state.load_generation {
        return DispatchResult::unchanged();
    }
    match target {
        SheetTarget::Preview => {
            if let Some(select) = state.select.as_mut() {
                select.preview_loading = false;
            }
            show_message(state, format!("Preview error: {error}"));
        }
        SheetTarget::Fighter => {
            show_message(state, format!("Fighter sheet error: {error}"));
        }
        SheetTarget::Opponent => {
            if let Some(battle) = state.battle.as_mut() {
                battle.stage = BattleStage::Escape;
                battle.message = format!("{} never showed.", battle.opponent_name());
            }
        }
    }
    DispatchResult::changed()
}

fn roster_loaded(
    state: &mut AppState,
    manifest: crate::roster::RosterManifest,
) -> DispatchResult<Effect> {
    state.roster = manifest;
    if state.select.is_some() {
        let effects = open_roster_select(state);
        return DispatchResult::changed_with_many(effects);
    }
    DispatchResult::changed()
}

fn load_complete(state: &mut AppState, loaded: AppState) -> DispatchResult<Effect> {
    *state = loaded;
    normalize_loaded_state(state);
    let effects = open_roster_select(state);
    show_message(state, "Game loaded!".to_string());
    DispatchResult::changed_with_many(effects)
}

/// Saves only capture between-battle state; anything transient is reset.
fn normalize_loaded_state(state: &mut AppState) {
    state.screen = Screen::RosterSelect;
    state.turn_phase = TurnPhase::Idle;
    state.battle = None;
    state.menu = None;
    state.message = None;
    state.message_timer = 0;
    let max_hp = state.fighter_max_hp();
    if state.player_hp > max_hp {
        state.player_hp = max_hp;
    }
}

fn next_rand(state: &mut AppState) -> u32 {
    state.rng_seed = state
        .rng_seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1);
    (state.rng_seed >> 32) as u32
}
