//! Terminal rendering for the browser front-end.

use ratzilla::ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratzilla::ratatui::Frame;

use pyramid_scheme::app::{format_number, App, InputMode, UPGRADE_HOTKEYS};
use pyramid_scheme::game::{UpgradeKey, WorkerNode};

/// Narrow layout threshold (columns).
pub fn is_narrow_layout(width: u16) -> bool {
    width < 60
}

pub fn render(f: &mut Frame, app: &App) {
    let size = f.area();
    let narrow = is_narrow_layout(size.width);

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(size);

    render_title(f, app, main_chunks[0]);

    if narrow {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Min(6),
                Constraint::Length(6),
            ])
            .split(main_chunks[1]);
        render_stats(f, app, chunks[0]);
        render_main_panel(f, app, chunks[1], narrow);
        render_log(f, app, chunks[2]);
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[1]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(6)])
            .split(columns[0]);
        render_stats(f, app, left[0]);
        render_main_panel(f, app, left[1], narrow);
        render_log(f, app, columns[1]);
    }

    render_help(f, app, main_chunks[2]);
}

fn render_title(f: &mut Frame, app: &App, area: Rect) {
    let (title, color) = if app.session.state.victory_pending {
        ("★ A BILLION PYRAMIDS ★", Color::Yellow)
    } else {
        ("Pyramid Scheme", Color::Cyan)
    };
    let title_block = Paragraph::new(Line::from(Span::styled(
        title,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);
    f.render_widget(title_block, area);
}

fn render_stats(f: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;
    let state = &session.state;
    let cfg = session.config();

    let mut lines = vec![
        Line::from(vec![
            Span::styled(" ▲ Pyramids: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                format_number(state.pyramids),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  (+{:.2}/s)", session.pyramids_per_second()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                " Stones: {}/{}  Progress: {}/{}",
                state.sculpted_stones,
                cfg.stones_per_pyramid,
                state.stone_progress,
                cfg.clicks_per_stone
            ),
            Style::default().fg(Color::White),
        )),
        Line::from(Span::styled(
            format!(
                " Investors: {}  Hires: {}  Unbanked: {}",
                state.unlocked_roots().count(),
                session.total_hires(),
                format_number(state.tree_pyramids())
            ),
            Style::default().fg(Color::Gray),
        )),
    ];

    if session.ap_store_visible() {
        let prestige_style = if session.can_prestige() {
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Magenta)
        };
        lines.push(Line::from(Span::styled(
            format!(
                " AP: {}  Sell now: +{} AP",
                state.alien_points,
                session.ap_gain()
            ),
            prestige_style,
        )));
    }

    let stats = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(" Quarry "),
    );
    f.render_widget(stats, area);
}

fn render_main_panel(f: &mut Frame, app: &App, area: Rect, narrow: bool) {
    match app.input_mode {
        InputMode::Play => render_investors(f, app, area, narrow),
        InputMode::Store => render_store(f, app, area),
    }
}

/// Seat bar: one mark per visible hire row, filled for each occupied seat.
fn seat_bar(node: &WorkerNode, rows: u32) -> String {
    let filled = node.sub_workers.len().min(rows as usize);
    let mut bar = "■".repeat(filled);
    bar.push_str(&"□".repeat(rows as usize - filled));
    bar
}

fn render_investors(f: &mut Frame, app: &App, area: Rect, narrow: bool) {
    let session = &app.session;
    let state = &session.state;
    let cfg = session.config();
    let slots = cfg.max_investor_slots(&state.ap_upgrades);
    let rows = cfg.visible_hire_rows(&state.ap_upgrades, narrow);

    let items: Vec<ListItem> = (1..=slots)
        .map(|slot| match state.workers.get(&slot).filter(|w| w.unlocked) {
            Some(root) => ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" #{} ", slot),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(seat_bar(root, rows), Style::default().fg(Color::Green)),
                Span::styled(
                    format!(
                        " {}/{} hires  depth {}  ▲{}",
                        root.sub_workers.len(),
                        cfg.max_hires_for_tier(root.tier, &state.ap_upgrades),
                        root.max_depth(),
                        format_number(root.total_pyramids())
                    ),
                    Style::default().fg(Color::White),
                ),
            ])),
            None => {
                let need = cfg.root_unlock_requirement(slot);
                let style = if state.pyramids >= need {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let label = match app.slot_hotkey(slot) {
                    Some(key) => format!(" [{}] ", key),
                    None => format!(" #{} ", slot),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(label, style.add_modifier(Modifier::BOLD)),
                    Span::styled(format!("Hire investor ({} ▲)", format_number(need)), style),
                ]))
            }
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Investors "),
    );
    f.render_widget(list, area);
}

fn render_store(f: &mut Frame, app: &App, area: Rect) {
    let session = &app.session;
    let state = &session.state;
    let cfg = session.config();

    let items: Vec<ListItem> = UpgradeKey::all()
        .iter()
        .zip(UPGRADE_HOTKEYS)
        .filter_map(|(key, hotkey)| {
            let def = cfg.upgrade(key.as_str())?;
            let level = state.ap_upgrades.level(*key);
            let cost = cfg.upgrade_cost(key.as_str(), level);
            let (price, style) = match cost {
                Some(c) if c <= state.alien_points => {
                    (format!("{} AP", c), Style::default().fg(Color::Green))
                }
                Some(c) => (format!("{} AP", c), Style::default().fg(Color::DarkGray)),
                None => ("MAX".to_string(), Style::default().fg(Color::Cyan)),
            };
            Some(ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!(" [{}] ", hotkey.to_ascii_uppercase()),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!("{} Lv.{} ", def.name, level), style),
                    Span::styled(price, style),
                ]),
                Line::from(Span::styled(
                    format!("     {}", def.description),
                    Style::default().fg(Color::Gray),
                )),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(format!(" Alien Store ({} AP) ", state.alien_points)),
    );
    f.render_widget(list, area);
}

fn render_log(f: &mut Frame, app: &App, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let start = app.log.len().saturating_sub(visible_height);

    let log_lines: Vec<Line> = app.log[start..]
        .iter()
        .map(|entry| {
            let style = if entry.is_important {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(entry.text.as_str(), style))
        })
        .collect();

    let log_widget = Paragraph::new(log_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Log "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(log_widget, area);
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.delete_armed() {
        "[X] again to DELETE everything, any other key cancels"
    } else if app.session.state.victory_pending {
        "[V] Continue"
    } else {
        match app.input_mode {
            InputMode::Play if app.has_more_slot_pages() => {
                "[C] Sculpt  [1-9] Hire  [N] Slots  [P] Sell  [U] Store  [S] Save"
            }
            InputMode::Play => "[C] Sculpt  [1-9] Hire  [P] Sell  [U] Store  [S] Save",
            InputMode::Store => "[A-G] Buy  [U] Close",
        }
    };
    let help = Paragraph::new(Line::from(Span::styled(
        help_text,
        Style::default().fg(Color::DarkGray),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);
    f.render_widget(help, area);
}
