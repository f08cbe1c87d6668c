use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};

use crate::action::Action;
use crate::reducer::BATTLE_MENU;
use crate::state::{AppState, BattleStage, Screen};

const BG_BASE: Color = Color::Rgb(30, 24, 20);
const BG_PANEL: Color = Color::Rgb(46, 36, 28);
const BG_PANEL_ALT: Color = Color::Rgb(40, 32, 26);
const TEXT_MAIN: Color = Color::Rgb(232, 220, 196);
const TEXT_DIM: Color = Color::Rgb(168, 152, 128);
const ACCENT_EMBER: Color = Color::Rgb(224, 122, 62);
const ACCENT_BRASS: Color = Color::Rgb(206, 178, 94);
const HIGHLIGHT_BG: Color = ACCENT_EMBER;
const HIGHLIGHT_TEXT: Color = Color::Rgb(28, 18, 12);
const BORDER_ACCENT: Color = Color::Rgb(108, 88, 64);
const HP_OK: Color = Color::Rgb(120, 190, 96);
const HP_LOW: Color = Color::Rgb(214, 92, 70);

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    draw(frame, area, state);
}

pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);
    match state.screen {
        Screen::Title => render_title(frame, area, state),
        Screen::RosterSelect => render_roster_select(frame, area, state),
        Screen::Battle => render_battle(frame, area, state),
    }
    if let Some(message) = state.message.as_deref() {
        render_message_bar(frame, area, message);
    }
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    match state.screen {
        Screen::Title => handle_title_key(key, state),
        Screen::RosterSelect => handle_roster_key(key, state),
        Screen::Battle => handle_battle_key(key, state),
    }
}

fn handle_title_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let Some(menu) = state.menu.as_ref() else {
        return EventOutcome::ignored();
    };
    let last = if menu.has_save { 2 } else { 1 };

    match key.code {
        KeyCode::Up | KeyCode::Char('w') => {
            let new_idx = if menu.selected == 0 {
                last
            } else {
                menu.selected - 1
            };
            EventOutcome::action(Action::MenuSelect(new_idx))
        }
        KeyCode::Down | KeyCode::Char('s') => {
            let new_idx = if menu.selected >= last {
                0
            } else {
                menu.selected + 1
            };
            EventOutcome::action(Action::MenuSelect(new_idx))
        }
        KeyCode::Enter | KeyCode::Char('z') | KeyCode::Char('Z') => {
            if menu.selected == last {
                return EventOutcome::action(Action::Quit);
            }
            EventOutcome::action(Action::MenuConfirm)
        }
        _ => EventOutcome::ignored(),
    }
}

fn handle_roster_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let Some(select) = state.select.as_ref() else {
        return EventOutcome::ignored();
    };

    match key.code {
        KeyCode::Up | KeyCode::Char('w') => {
            let new_idx = if select.selected == 0 {
                select.entries.len().saturating_sub(1)
            } else {
                select.selected - 1
            };
            EventOutcome::action(Action::FighterSelect(new_idx))
        }
        KeyCode::Down | KeyCode::Char('s') => {
            let new_idx = if select.selected >= select.entries.len().saturating_sub(1) {
                0
            } else {
                select.selected + 1
            };
            EventOutcome::action(Action::FighterSelect(new_idx))
        }
        KeyCode::Enter | KeyCode::Char('z') | KeyCode::Char('Z') => {
            EventOutcome::action(Action::FighterConfirm)
        }
        KeyCode::Char('p') => EventOutcome::action(Action::SaveGame),
        KeyCode::Esc => EventOutcome::action(Action::Init),
        _ => EventOutcome::ignored(),
    }
}

fn handle_battle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let Some(battle) = state.battle.as_ref() else {
        return EventOutcome::ignored();
    };

    if matches!(key.code, KeyCode::Esc) {
        return EventOutcome::action(Action::LeaveBattle);
    }
    if matches!(
        key.code,
        KeyCode::Enter | KeyCode::Char('z') | KeyCode::Char('Z')
    ) {
        return EventOutcome::action(Action::BattleConfirm);
    }
    if battle.stage == BattleStage::Menu {
        let action = match key.code {
            KeyCode::Up | KeyCode::Left => Some(Action::BattleMenuPrev),
            KeyCode::Down | KeyCode::Right => Some(Action::BattleMenuNext),
            _ => None,
        };
        return EventOutcome::from(action);
    }
    EventOutcome::ignored()
}

fn panel_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT))
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
}

fn render_title(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" THE ASHEN PIT ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(menu) = state.menu.as_ref() else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "THE ASHEN PIT",
            Style::default()
                .fg(ACCENT_EMBER)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "An arena crawl, one bout at a time",
            Style::default().fg(TEXT_DIM),
        )),
        Line::from(""),
        Line::from(""),
    ];

    let options = if menu.has_save {
        vec!["New Run", "Continue", "Quit"]
    } else {
        vec!["New Run", "Quit"]
    };
    for (i, option) in options.iter().enumerate() {
        let style = if i == menu.selected {
            Style::default()
                .bg(HIGHLIGHT_BG)
                .fg(HIGHLIGHT_TEXT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_MAIN)
        };
        lines.push(Line::from(Span::styled(format!("  {option}  "), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "arrows: move   enter: confirm",
        Style::default().fg(TEXT_DIM),
    )));

    let content = centered(inner, 40, lines.len() as u16);
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        content,
    );
}

fn render_roster_select(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let list_block = panel_block(" ROSTER ");
    let list_inner = list_block.inner(columns[0]);
    frame.render_widget(list_block, columns[0]);

    let Some(select) = state.select.as_ref() else {
        return;
    };

    let mut lines = Vec::new();
    for (i, entry) in select.entries.iter().enumerate() {
        let style = if i == select.selected {
            Style::default()
                .bg(HIGHLIGHT_BG)
                .fg(HIGHLIGHT_TEXT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_MAIN)
        };
        lines.push(Line::from(Span::styled(format!(" {} ", entry.name), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("victories: {}", state.wins),
        Style::default().fg(ACCENT_BRASS),
    )));
    lines.push(Line::from(Span::styled(
        "enter: fight  p: save  esc: title",
        Style::default().fg(TEXT_DIM),
    )));
    frame.render_widget(Paragraph::new(lines), list_inner);

    let preview_block = panel_block(" FIGHTER ");
    let preview_inner = preview_block.inner(columns[1]);
    frame.render_widget(preview_block, columns[1]);

    let mut preview_lines = Vec::new();
    match (&select.preview, select.preview_loading) {
        (Some(spec), _) => {
            preview_lines.push(Line::from(Span::styled(
                spec.name.clone(),
                Style::default()
                    .fg(ACCENT_EMBER)
                    .add_modifier(Modifier::BOLD),
            )));
            if let Some(title) = spec.title.as_deref() {
                preview_lines.push(Line::from(Span::styled(
                    title.to_string(),
                    Style::default().fg(TEXT_DIM),
                )));
            }
            preview_lines.push(Line::from(""));
            for row in &spec.art {
                preview_lines.push(Line::from(Span::styled(
                    row.clone(),
                    Style::default().fg(ACCENT_BRASS),
                )));
            }
            preview_lines.push(Line::from(""));
            preview_lines.push(stat_line("HP", spec.hp));
            preview_lines.push(stat_line("ATK", spec.attack));
            preview_lines.push(stat_line("DEF", spec.defense));
            preview_lines.push(stat_line("SPD", spec.speed));
        }
        (None, true) => {
            preview_lines.push(Line::from(Span::styled(
                "Pulling the sheet...",
                Style::default().fg(TEXT_DIM),
            )));
        }
        (None, false) => {
            preview_lines.push(Line::from(Span::styled(
                "No sheet on file.",
                Style::default().fg(TEXT_DIM),
            )));
        }
    }
    frame.render_widget(Paragraph::new(preview_lines), preview_inner);
}

fn stat_line(label: &str, value: u16) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:>4}  "), Style::default().fg(TEXT_DIM)),
        Span::styled(value.to_string(), Style::default().fg(TEXT_MAIN)),
    ])
}

fn render_battle(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(battle) = state.battle.as_ref() else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(6),
            Constraint::Length(5),
        ])
        .split(area);

    // Opponent panel
    let opponent_block = panel_block(" OPPONENT ");
    let opponent_inner = opponent_block.inner(rows[0]);
    frame.render_widget(opponent_block, rows[0]);

    let mut opponent_lines = vec![Line::from(Span::styled(
        battle.opponent_name().to_string(),
        Style::default()
            .fg(ACCENT_EMBER)
            .add_modifier(Modifier::BOLD),
    ))];
    if let Some(spec) = battle.opponent.as_ref() {
        if let Some(title) = spec.title.as_deref() {
            opponent_lines.push(Line::from(Span::styled(
                title.to_string(),
                Style::default().fg(TEXT_DIM),
            )));
        }
        for row in &spec.art {
            opponent_lines.push(Line::from(Span::styled(
                row.clone(),
                Style::default().fg(ACCENT_BRASS),
            )));
        }
    } else {
        opponent_lines.push(Line::from(Span::styled(
            "Approaching the pit...",
            Style::default().fg(TEXT_DIM),
        )));
    }
    opponent_lines.push(hp_bar(battle.enemy_hp, battle.enemy_hp_max));
    frame.render_widget(Paragraph::new(opponent_lines), opponent_inner);

    // Player panel
    let player_block = Block::default()
        .title(format!(" {} ", state.fighter_name().to_uppercase()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT))
        .style(Style::default().bg(BG_PANEL_ALT).fg(TEXT_MAIN));
    let player_inner = player_block.inner(rows[1]);
    frame.render_widget(player_block, rows[1]);

    let mut player_lines = vec![hp_bar(battle.player_hp, battle.player_hp_max)];
    if battle.guard_turns > 0 {
        player_lines.push(Line::from(Span::styled(
            format!("guarding ({}%)", battle.guard_pct),
            Style::default().fg(ACCENT_BRASS),
        )));
    }
    frame.render_widget(Paragraph::new(player_lines), player_inner);

    // Message + menu
    let footer_block = panel_block("");
    let footer_inner = footer_block.inner(rows[2]);
    frame.render_widget(footer_block, rows[2]);

    let mut footer_lines = vec![Line::from(Span::styled(
        battle.message.clone(),
        Style::default().fg(TEXT_MAIN),
    ))];
    match battle.stage {
        BattleStage::Menu => {
            let mut spans = Vec::new();
            for (i, item) in BATTLE_MENU.iter().enumerate() {
                let style = if i == battle.menu_index {
                    Style::default()
                        .bg(HIGHLIGHT_BG)
                        .fg(HIGHLIGHT_TEXT)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(TEXT_MAIN)
                };
                spans.push(Span::styled(format!(" {item} "), style));
                spans.push(Span::raw("  "));
            }
            footer_lines.push(Line::from(spans));
        }
        BattleStage::EnemyTurn => {
            footer_lines.push(Line::from(Span::styled(
                "The reply is coming. Enter to face it now.",
                Style::default().fg(TEXT_DIM),
            )));
        }
        _ => {
            footer_lines.push(Line::from(Span::styled(
                "Enter to continue.",
                Style::default().fg(TEXT_DIM),
            )));
        }
    }
    frame.render_widget(
        Paragraph::new(footer_lines).wrap(Wrap { trim: true }),
        footer_inner,
    );
}

fn hp_bar(hp: u16, hp_max: u16) -> Line<'static> {
    const WIDTH: u16 = 20;
    let hp_max = hp_max.max(1);
    let filled = (((hp as u32 * WIDTH as u32) / hp_max as u32) as u16).min(WIDTH);
    let color = if hp * 4 <= hp_max { HP_LOW } else { HP_OK };
    let mut spans = vec![Span::styled("HP ", Style::default().fg(TEXT_DIM))];
    spans.push(Span::styled(
        "█".repeat(filled as usize),
        Style::default().fg(color),
    ));
    spans.push(Span::styled(
        "░".repeat((WIDTH - filled.min(WIDTH)) as usize),
        Style::default().fg(TEXT_DIM),
    ));
    spans.push(Span::styled(
        format!(" {hp}/{hp_max}"),
        Style::default().fg(TEXT_MAIN),
    ));
    Line::from(spans)
}

fn render_message_bar(frame: &mut Frame, area: Rect, message: &str) {
    if area.height < 1 {
        return;
    }
    let bar = Rect::new(area.x, area.y + area.height - 1, area.width, 1);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {message} "),
            Style::default().fg(HIGHLIGHT_TEXT).bg(ACCENT_BRASS),
        ))),
        bar,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
