use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};

use crate::action::Action;
use crate::state::{AppState, CatalogItemDetail, ListPhase};

const BG_BASE: Color = Color::Rgb(12, 18, 28);
const BG_PANEL: Color = Color::Rgb(20, 32, 46);
const BG_HIGHLIGHT: Color = Color::Rgb(28, 92, 110);
const TEXT_MAIN: Color = Color::Rgb(232, 242, 244);
const TEXT_DIM: Color = Color::Rgb(176, 195, 207);
const ACCENT_TEAL: Color = Color::Rgb(72, 204, 184);
const ACCENT_GOLD: Color = Color::Rgb(228, 176, 88);
const ACCENT_RED: Color = Color::Rgb(232, 96, 88);
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const STAT_BAR_WIDTH: u16 = 20;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    draw(frame, area, state);
}

/// Draws the whole screen for `state`.
pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_list(frame, body[0], state);
    render_detail(frame, body[1], state);

    render_footer(frame, chunks[2], state);
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        EventKind::Scroll { delta, .. } => {
            EventOutcome::action(Action::SelectionMove((*delta * 3) as i16))
        }
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    match key.code {
        KeyCode::Char('q') => EventOutcome::action(Action::Quit),
        KeyCode::Up | KeyCode::Char('k') => EventOutcome::action(Action::SelectionMove(-1)),
        KeyCode::Down | KeyCode::Char('j') => EventOutcome::action(Action::SelectionMove(1)),
        KeyCode::PageUp => EventOutcome::action(Action::SelectionPage(-1)),
        KeyCode::PageDown => EventOutcome::action(Action::SelectionPage(1)),
        KeyCode::Home | KeyCode::Char('g') => EventOutcome::action(Action::SelectionJumpTop),
        KeyCode::End | KeyCode::Char('G') => EventOutcome::action(Action::SelectionJumpBottom),
        KeyCode::Enter => EventOutcome::action(Action::DetailOpenSelected),
        KeyCode::Char('n') => EventOutcome::action(Action::ListLoadNext),
        KeyCode::Esc if state.message.is_some() => EventOutcome::action(Action::MessageDismiss),
        KeyCode::Esc if state.detail_open => EventOutcome::action(Action::DetailClose),
        _ => EventOutcome::ignored(),
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let status = match state.phase() {
        ListPhase::Loading => {
            let spinner = SPINNER[(state.tick as usize) % SPINNER.len()];
            Span::styled(
                format!("{spinner} loading page {}", state.current_page + 1),
                Style::default().fg(ACCENT_GOLD),
            )
        }
        ListPhase::Error => Span::styled(
            "last load failed (n to retry)",
            Style::default().fg(ACCENT_RED),
        ),
        ListPhase::Idle if !state.has_more => {
            Span::styled("end of catalog", Style::default().fg(TEXT_DIM))
        }
        ListPhase::Idle => Span::styled(
            format!("{} loaded", state.items.len()),
            Style::default().fg(TEXT_DIM),
        ),
    };
    let line = Line::from(vec![
        Span::styled(
            " POKEDEX ",
            Style::default()
                .fg(BG_BASE)
                .bg(ACCENT_TEAL)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        status,
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let items: Vec<ListItem> = state
        .items
        .iter()
        .map(|item| {
            let number = item
                .id()
                .map(|id| format!("#{id:04}"))
                .unwrap_or_else(|| "#----".to_string());
            ListItem::new(Line::from(vec![
                Span::styled(number, Style::default().fg(TEXT_DIM)),
                Span::raw(" "),
                Span::styled(item.name.clone(), Style::default().fg(TEXT_MAIN)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(" Pokemon "))
        .highlight_style(
            Style::default()
                .bg(BG_HIGHLIGHT)
                .fg(TEXT_MAIN)
                .add_modifier(Modifier::BOLD),
        );
    let mut list_state = ListState::default();
    if !state.items.is_empty() {
        list_state.select(Some(state.selected_index));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" Detail ");
    let text = if !state.detail_open {
        Text::from(Line::styled(
            "Enter: show detail",
            Style::default().fg(TEXT_DIM),
        ))
    } else if let Some(id) = state.detail_pending {
        Text::from(Line::styled(
            format!("Loading #{id}..."),
            Style::default().fg(ACCENT_GOLD),
        ))
    } else if let Some(id) = state.detail_failed {
        Text::from(Line::styled(
            format!("Could not load #{id}"),
            Style::default().fg(ACCENT_RED),
        ))
    } else {
        match state.current_detail() {
            Some(detail) => detail_text(detail),
            None => Text::from(Line::styled("No detail loaded", Style::default().fg(TEXT_DIM))),
        }
    };
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn detail_text(detail: &CatalogItemDetail) -> Text<'static> {
    let label = Style::default().fg(TEXT_DIM);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("#{:04} {}", detail.id, detail.name.to_uppercase()),
            Style::default().fg(ACCENT_TEAL).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Height ", label),
            Span::raw(format!("{:.1} m", detail.height as f32 / 10.0)),
            Span::styled("   Weight ", label),
            Span::raw(format!("{:.1} kg", detail.weight as f32 / 10.0)),
        ]),
        Line::from(vec![
            Span::styled("Sprite ", label),
            Span::raw(detail.sprite_url()),
        ]),
        Line::raw(""),
        Line::styled("Abilities", Style::default().fg(ACCENT_GOLD)),
    ];
    for ability in &detail.abilities {
        let hidden = if ability.is_hidden { " (hidden)" } else { "" };
        lines.push(Line::raw(format!("  {}. {}{hidden}", ability.slot, ability.name)));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled("Stats", Style::default().fg(ACCENT_GOLD)));
    for stat in &detail.stats {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<16}", stat.name), label),
            Span::raw(format!("{:>3} ", stat.base_value)),
            Span::styled(stat_bar(stat.base_value), Style::default().fg(ACCENT_TEAL)),
        ]));
    }
    Text::from(lines)
}

fn stat_bar(value: u16) -> String {
    let filled = (u32::from(value.min(255)) * u32::from(STAT_BAR_WIDTH) / 255) as usize;
    "#".repeat(filled)
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let line = match &state.message {
        Some(message) => Line::from(vec![
            Span::styled(format!(" {message} "), Style::default().fg(TEXT_MAIN).bg(ACCENT_RED)),
            Span::styled("  esc: dismiss", Style::default().fg(TEXT_DIM)),
        ]),
        None => Line::styled(
            " j/k move  pgup/pgdn page  enter detail  esc close  n next page  q quit",
            Style::default().fg(TEXT_DIM),
        ),
    };
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Left), area);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
        .border_style(Style::default().fg(TEXT_DIM))
}
