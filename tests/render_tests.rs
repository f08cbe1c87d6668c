//! Render smoke tests via the store test harness.

use arenatui::action::Action;
use arenatui::reducer::reducer;
use arenatui::state::AppState;
use arenatui::ui;
use tui_dispatch::testing::*;

#[test]
fn title_screen_shows_the_pit() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);
    harness.dispatch_collect(Action::Init);

    let output = harness.render_plain(80, 24, |frame, area, state| {
        ui::draw(frame, area, state);
    });

    assert!(
        output.contains("THE ASHEN PIT"),
        "title should be visible in output:\n{output}"
    );
    assert!(output.contains("New Run"));
}

#[test]
fn roster_screen_lists_fighters() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);
    harness.dispatch_collect(Action::Init);
    harness.dispatch_collect(Action::MenuConfirm);

    let output = harness.render_plain(80, 24, |frame, area, state| {
        ui::draw(frame, area, state);
    });

    assert!(
        output.contains("Varga"),
        "built-in roster should be listed:\n{output}"
    );
    assert!(output.contains("victories: 0"));
}

#[test]
fn battle_screen_shows_the_opponent_and_menu() {
    let mut harness = EffectStoreTestHarness::new(AppState::default(), reducer);
    harness.dispatch_collect(Action::Init);
    harness.dispatch_collect(Action::MenuConfirm);
    harness.dispatch_collect(Action::FighterConfirm);
    harness.dispatch_collect(Action::BattleConfirm); // Intro -> Menu

    let output = harness.render_plain(80, 24, |frame, area, state| {
        ui::draw(frame, area, state);
    });

    assert!(
        output.contains("OPPONENT"),
        "opponent panel should be visible:\n{output}"
    );
    assert!(output.contains("What will"));
    assert!(output.contains("Strike"));
    assert!(output.contains("Guard"));
    assert!(output.contains("Flee"));
}
