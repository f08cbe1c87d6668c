use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use arenatui::action::Action;
use arenatui::effect::Effect;
use arenatui::reducer::reducer;
use arenatui::roster;
use arenatui::state::{AppState, SheetTarget};
use arenatui::turn::{self, TurnRunnerCell};
use arenatui::ui;

const AUTO_TURN_TASK: &str = "auto_turn";

#[derive(Parser, Debug)]
#[command(name = "arenatui")]
#[command(about = "Turn-based arena battle TUI")]
struct Args {
    /// Roster directory containing manifest.ron and sheets/
    #[arg(long, default_value = "assets/roster")]
    roster_dir: String,

    /// Seconds of hesitation before the opponent acts on its own
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    auto_turn_secs: u64,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let Args {
        roster_dir,
        auto_turn_secs,
        debug: debug_args,
    } = Args::parse();
    let debug = DebugSession::new(debug_args);

    let state = debug
        .load_state_or_else_async(move || async move {
            let mut state = AppState::new();
            state.roster_dir = roster_dir;
            state.auto_turn_delay_ms = auto_turn_secs * 1000;
            Ok::<AppState, io::Error>(state)
        })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    // The effect handler writes the cell, the fired timer task reads it.
    let turn_runner: Arc<TurnRunnerCell<Action>> = Arc::new(TurnRunnerCell::new());

    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(100), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            move |effect, ctx: &mut EffectContext<Action>| {
                handle_effect(effect, ctx, &turn_runner)
            },
        )
        .await
}

fn handle_effect(
    effect: Effect,
    ctx: &mut EffectContext<Action>,
    runner: &Arc<TurnRunnerCell<Action>>,
) {
    match effect {
        Effect::LoadRoster { dir } => {
            ctx.tasks().spawn(TaskKey::new("roster"), async move {
                match roster::load_manifest(Path::new(&dir)).await {
                    Ok(manifest) => Action::RosterDidLoad(manifest),
                    Err(error) => Action::RosterDidError(error.to_string()),
                }
            });
        }
        Effect::LoadSheet {
            target,
            dir,
            entry,
            generation,
        } => {
            ctx.tasks().spawn(sheet_task_key(target), async move {
                match roster::load_sheet(Path::new(&dir), &entry).await {
                    Ok(spec) => Action::SheetDidLoad {
                        target,
                        generation,
                        spec,
                    },
                    Err(error) => Action::SheetDidError {
                        target,
                        generation,
                        error: error.to_string(),
                    },
                }
            });
        }
        Effect::CancelBattleLoads => {
            for target in [
                SheetTarget::Preview,
                SheetTarget::Fighter,
                SheetTarget::Opponent,
            ] {
                ctx.tasks().cancel(&sheet_task_key(target));
            }
        }
        Effect::ArmAutoTurn { delay_ms, turn } => {
            // Rebind the cell to this turn, then schedule the reply. The task
            // dereferences the cell only when the sleep elapses, so a timer
            // armed for an earlier turn that is replaced below never runs a
            // stale closure.
            runner.install(Arc::new(move || Action::AutoTurnFired { turn }));
            turn::run_turn_timeout(
                turn::TurnTimeoutArgs {
                    runner: Arc::clone(runner),
                    delay: Duration::from_millis(delay_ms),
                },
                |args| {
                    ctx.tasks().spawn(TaskKey::new(AUTO_TURN_TASK), async move {
                        tokio::time::sleep(args.delay).await;
                        args.run_enemy_turn
                            .fire()
                            .unwrap_or(Action::AutoTurnLapsed)
                    });
                },
            );
        }
        Effect::DisarmAutoTurn => {
            ctx.tasks().cancel(&TaskKey::new(AUTO_TURN_TASK));
            runner.clear();
        }
        Effect::CheckSaveExists => {
            ctx.tasks().spawn(TaskKey::new("check_save"), async move {
                let path = save_file_path();
                Action::SaveExists(path.exists())
            });
        }
        Effect::SaveGame { state } => {
            ctx.tasks().spawn(TaskKey::new("save_game"), async move {
                match save_game(&state).await {
                    Ok(()) => Action::SaveComplete,
                    Err(e) => Action::SaveError(e),
                }
            });
        }
        Effect::LoadGame => {
            ctx.tasks().spawn(TaskKey::new("load_game"), async move {
                match load_game().await {
                    Ok(state) => Action::LoadComplete(Box::new(state)),
                    Err(e) => Action::LoadError(e),
                }
            });
        }
    }
}

fn sheet_task_key(target: SheetTarget) -> TaskKey {
    TaskKey::new(format!("sheet_{}", target.label()))
}

fn save_file_path() -> PathBuf {
    let base = dirs_next::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("arenatui").join("save.json")
}

async fn save_game(state: &AppState) -> Result<(), String> {
    let path = save_file_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to create save directory: {}", e))?;
    }
    let json =
        serde_json::to_string_pretty(state).map_err(|e| format!("Failed to serialize: {}", e))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| format!("Failed to write save file: {}", e))?;
    Ok(())
}

async fn load_game() -> Result<AppState, String> {
    let path = save_file_path();
    let json = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() == ErrorKind::NotFound {
                return Err("Save file not found.".to_string());
            }
            return Err(format!("Failed to read save file: {}", e));
        }
    };
    let state: AppState =
        serde_json::from_str(&json).map_err(|e| format!("Save file corrupted: {}", e))?;
    Ok(state)
}
