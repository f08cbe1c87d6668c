//! Store-level tests: the reducer drives the turn controllers, and the
//! effects it emits are the host's cancellation and scheduling commands.

use arenatui::action::Action;
use arenatui::effect::Effect;
use arenatui::reducer::reducer;
use arenatui::roster::FighterSpec;
use arenatui::state::{AppState, BattleStage, Screen, SheetTarget, TurnPhase};
use pretty_assertions::assert_eq;
use tui_dispatch::EffectStore;

fn mock_opponent(id: &str) -> FighterSpec {
    FighterSpec {
        id: id.to_string(),
        name: "Sparring Dummy".to_string(),
        hp: 66,
        attack: 10,
        defense: 10,
        speed: 10,
        title: None,
        art: Vec::new(),
    }
}

/// Init -> New Run -> pick the first fighter.
macro_rules! enter_battle {
    ($store:ident) => {{
        $store.dispatch(Action::Init);
        $store.dispatch(Action::MenuConfirm);
        $store.dispatch(Action::FighterConfirm).effects
    }};
}

/// Completes the opponent load so enemy HP is no longer provisional.
macro_rules! land_opponent {
    ($store:ident) => {{
        let (id, generation) = {
            let state = $store.state();
            let battle = state.battle.as_ref().expect("battle should be set up");
            (battle.opponent_entry.id.clone(), state.load_generation)
        };
        $store.dispatch(Action::SheetDidLoad {
            target: SheetTarget::Opponent,
            generation,
            spec: mock_opponent(&id),
        });
    }};
}

#[test]
fn init_probes_save_and_loads_roster() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    let result = store.dispatch(Action::Init);
    assert!(result.changed);
    assert_eq!(result.effects.len(), 2);
    assert!(matches!(result.effects[0], Effect::CheckSaveExists));
    assert!(matches!(result.effects[1], Effect::LoadRoster { .. }));
    assert_eq!(store.state().screen, Screen::Title);
    assert_eq!(store.state().turn_phase, TurnPhase::Idle);
}

#[test]
fn new_run_opens_roster_select_without_cancelling_anything() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    store.dispatch(Action::Init);
    let result = store.dispatch(Action::MenuConfirm);

    assert_eq!(store.state().screen, Screen::RosterSelect);
    assert!(store.state().select.is_some());
    // Title -> roster select never touches the cancellation capabilities.
    assert!(!result
        .effects
        .iter()
        .any(|e| matches!(e, Effect::DisarmAutoTurn | Effect::CancelBattleLoads)));
    assert!(result.effects.iter().any(|e| matches!(
        e,
        Effect::LoadSheet {
            target: SheetTarget::Preview,
            ..
        }
    )));
}

#[test]
fn battle_start_invalidates_then_clears_then_loads() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    let effects = enter_battle!(store);

    // Invalidation precedes timer-clearing, and both precede the flow's loads.
    assert!(matches!(effects[0], Effect::CancelBattleLoads));
    assert!(matches!(effects[1], Effect::DisarmAutoTurn));
    let load_positions: Vec<usize> = effects
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Effect::LoadSheet { .. }))
        .map(|(i, _)| i)
        .collect();
    assert!(!load_positions.is_empty());
    assert!(load_positions.iter().all(|&i| i >= 2));

    let state = store.state();
    assert_eq!(state.screen, Screen::Battle);
    assert_eq!(state.turn_phase, TurnPhase::BattleActive);
    assert_eq!(state.load_generation, 1);
    assert!(state.battle.is_some());

    // Loads are tagged with the post-bump generation.
    for effect in &effects {
        if let Effect::LoadSheet { generation, .. } = effect {
            assert_eq!(*generation, state.load_generation);
        }
    }
}

#[test]
fn restarting_a_battle_invalidates_again() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    let first_generation = store.state().load_generation;

    // Leave and start another bout.
    store.dispatch(Action::LeaveBattle);
    let effects = store.dispatch(Action::FighterConfirm).effects;

    assert!(matches!(effects[0], Effect::CancelBattleLoads));
    assert!(matches!(effects[1], Effect::DisarmAutoTurn));
    assert!(store.state().load_generation > first_generation);
    assert_eq!(store.state().turn_phase, TurnPhase::BattleActive);
}

#[test]
fn leaving_battle_clears_timer_then_invalidates() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);

    let effects = store.dispatch(Action::LeaveBattle).effects;

    // Guard order: timer first, loads second, screen committed after both.
    let disarm = effects
        .iter()
        .position(|e| matches!(e, Effect::DisarmAutoTurn))
        .expect("guard should disarm the timer");
    let cancel = effects
        .iter()
        .position(|e| matches!(e, Effect::CancelBattleLoads))
        .expect("guard should cancel loads");
    assert!(disarm < cancel);

    let state = store.state();
    assert_eq!(state.screen, Screen::RosterSelect);
    assert_eq!(state.turn_phase, TurnPhase::Invalidated);
    assert!(state.battle.is_none());
}

#[test]
fn invalidated_persists_until_next_start() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    store.dispatch(Action::LeaveBattle);
    assert_eq!(store.state().turn_phase, TurnPhase::Invalidated);

    // Browsing the roster does not wake the machinery.
    store.dispatch(Action::FighterSelect(1));
    assert_eq!(store.state().turn_phase, TurnPhase::Invalidated);

    // Only a fresh start does.
    store.dispatch(Action::FighterConfirm);
    assert_eq!(store.state().turn_phase, TurnPhase::BattleActive);
}

#[test]
fn strike_schedules_the_enemy_reply() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    land_opponent!(store);

    store.dispatch(Action::BattleConfirm); // Intro -> Menu
    let result = store.dispatch(Action::BattleConfirm); // Strike

    let state = store.state();
    let battle = state.battle.as_ref().expect("battle");
    assert_eq!(battle.stage, BattleStage::EnemyTurn);
    assert_eq!(battle.turn, 1);
    assert!(battle.enemy_hp < battle.enemy_hp_max);
    assert_eq!(result.effects.len(), 1);
    assert!(
        matches!(result.effects[0], Effect::ArmAutoTurn { turn: 1, .. }),
        "the reply timer should be tagged with the current turn"
    );
}

#[test]
fn auto_turn_fire_resolves_the_current_turn() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    land_opponent!(store);
    store.dispatch(Action::BattleConfirm); // Intro -> Menu
    store.dispatch(Action::BattleConfirm); // Strike
    let hp_before = store.state().battle.as_ref().unwrap().player_hp;

    let result = store.dispatch(Action::AutoTurnFired { turn: 1 });

    assert!(result.changed);
    let battle = store.state().battle.as_ref().unwrap();
    assert_eq!(battle.stage, BattleStage::Menu);
    assert!(battle.player_hp < hp_before);
    assert_eq!(store.state().turn_phase, TurnPhase::BattleActive);
}

#[test]
fn auto_turn_fire_from_an_earlier_turn_is_ignored() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    land_opponent!(store);
    store.dispatch(Action::BattleConfirm); // Intro -> Menu
    store.dispatch(Action::BattleConfirm); // Strike -> turn 1

    let stale = store.dispatch(Action::AutoTurnFired { turn: 0 });
    assert!(!stale.changed);
    assert_eq!(
        store.state().battle.as_ref().unwrap().stage,
        BattleStage::EnemyTurn
    );

    // A fire while the menu is open (no reply pending) is ignored too.
    store.dispatch(Action::AutoTurnFired { turn: 1 });
    let repeat = store.dispatch(Action::AutoTurnFired { turn: 1 });
    assert!(!repeat.changed);
}

#[test]
fn lapsed_timer_is_a_no_op() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    let result = store.dispatch(Action::AutoTurnLapsed);
    assert!(!result.changed);
    assert!(result.effects.is_empty());
}

#[test]
fn skipping_the_wait_disarms_the_timer() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    land_opponent!(store);
    store.dispatch(Action::BattleConfirm); // Intro -> Menu
    store.dispatch(Action::BattleConfirm); // Strike

    let result = store.dispatch(Action::BattleConfirm); // face the reply now

    assert!(result
        .effects
        .iter()
        .any(|e| matches!(e, Effect::DisarmAutoTurn)));
    assert_eq!(
        store.state().battle.as_ref().unwrap().stage,
        BattleStage::Menu
    );
}

#[test]
fn guard_raises_then_expires_after_the_reply() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    land_opponent!(store);
    store.dispatch(Action::BattleConfirm); // Intro -> Menu
    store.dispatch(Action::BattleMenuNext); // -> Guard
    store.dispatch(Action::BattleConfirm); // Guard up

    let battle = store.state().battle.as_ref().unwrap();
    assert_eq!(battle.guard_pct, 50);
    assert_eq!(battle.guard_turns, 1);
    assert_eq!(battle.stage, BattleStage::EnemyTurn);

    store.dispatch(Action::AutoTurnFired { turn: 1 });
    let battle = store.state().battle.as_ref().unwrap();
    assert_eq!(battle.guard_pct, 0);
    assert_eq!(battle.guard_turns, 0);
}

#[test]
fn stale_sheet_completions_are_dropped() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);

    let (id, generation) = {
        let state = store.state();
        let battle = state.battle.as_ref().unwrap();
        (battle.opponent_entry.id.clone(), state.load_generation)
    };

    // A completion from before the last invalidation.
    let result = store.dispatch(Action::SheetDidLoad {
        target: SheetTarget::Opponent,
        generation: generation - 1,
        spec: mock_opponent(&id),
    });
    assert!(!result.changed);
    assert!(store.state().battle.as_ref().unwrap().opponent.is_none());

    // The current generation lands.
    store.dispatch(Action::SheetDidLoad {
        target: SheetTarget::Opponent,
        generation,
        spec: mock_opponent(&id),
    });
    let battle = store.state().battle.as_ref().unwrap();
    assert_eq!(battle.enemy_hp_max, 66);
    assert!(battle.opponent.is_some());
}

#[test]
fn preview_for_a_different_fighter_is_ignored() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    store.dispatch(Action::Init);
    store.dispatch(Action::MenuConfirm);

    let generation = store.state().load_generation;
    let result = store.dispatch(Action::SheetDidLoad {
        target: SheetTarget::Preview,
        generation,
        spec: mock_opponent("somebody_else"),
    });
    assert!(result.changed);
    assert!(store.state().select.as_ref().unwrap().preview.is_none());
}

#[test]
fn defeat_returns_to_title() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    land_opponent!(store);
    store.dispatch(Action::BattleConfirm); // Intro -> Menu

    // Trade blows until one side drops; the fighter's provisional stats lose
    // to a 66 HP opponent well before 200 rounds.
    let mut rounds = 0;
    loop {
        store.dispatch(Action::BattleConfirm); // Strike
        match store.state().battle.as_ref().map(|b| b.stage) {
            Some(BattleStage::EnemyTurn) => {
                let turn = store.state().battle.as_ref().unwrap().turn;
                store.dispatch(Action::AutoTurnFired { turn });
            }
            Some(BattleStage::Victory) | None => break,
            _ => {}
        }
        if store.state().battle.as_ref().map(|b| b.stage) == Some(BattleStage::Defeat) {
            break;
        }
        rounds += 1;
        assert!(rounds < 200, "battle should end eventually");
    }

    let ended = store.dispatch(Action::BattleConfirm); // leave the terminal stage
    assert!(ended.changed);
    let state = store.state();
    assert!(state.battle.is_none());
    assert!(matches!(state.screen, Screen::Title | Screen::RosterSelect));
}

#[test]
fn victory_counts_the_win_and_invalidates_on_exit() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);

    // Leave the opponent at the provisional 1 HP: the first strike ends it.
    store.dispatch(Action::BattleConfirm); // Intro -> Menu
    store.dispatch(Action::BattleConfirm); // Strike
    assert_eq!(
        store.state().battle.as_ref().unwrap().stage,
        BattleStage::Victory
    );

    let effects = store.dispatch(Action::BattleConfirm).effects;
    let state = store.state();
    assert_eq!(state.wins, 1);
    assert_eq!(state.screen, Screen::RosterSelect);
    assert_eq!(state.turn_phase, TurnPhase::Invalidated);
    let disarm = effects
        .iter()
        .position(|e| matches!(e, Effect::DisarmAutoTurn))
        .expect("exit should disarm");
    let cancel = effects
        .iter()
        .position(|e| matches!(e, Effect::CancelBattleLoads))
        .expect("exit should cancel loads");
    assert!(disarm < cancel);
}

#[test]
fn save_roundtrip_normalizes_transients() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    enter_battle!(store);
    let saved = store.state().clone();

    let mut fresh = EffectStore::new(AppState::default(), reducer);
    fresh.dispatch(Action::Init);
    let result = fresh.dispatch(Action::LoadComplete(Box::new(saved)));

    assert!(result.changed);
    let state = fresh.state();
    assert_eq!(state.screen, Screen::RosterSelect);
    assert_eq!(state.turn_phase, TurnPhase::Idle);
    assert!(state.battle.is_none());
    assert!(state.select.is_some());
}

#[test]
fn save_action_snapshots_the_state() {
    let mut store = EffectStore::new(AppState::default(), reducer);
    store.dispatch(Action::Init);
    store.dispatch(Action::MenuConfirm);
    let result = store.dispatch(Action::SaveGame);
    assert_eq!(result.effects.len(), 1);
    assert!(matches!(result.effects[0], Effect::SaveGame { .. }));
}
