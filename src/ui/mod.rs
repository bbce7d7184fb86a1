// UI module for rendering the TUI.
// Lays out tabs, the active feed, the detail pane, and overlays.

mod list;
mod modal;
mod tabs;

use ratatui::{prelude::*, widgets::*};

use crate::app::{App, Modal, Tab};

/// Main draw function that renders the entire UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    tabs::draw_tabs(frame, app, chunks[0]);
    draw_content(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    // Overlays, topmost last
    match &app.modal {
        Some(Modal::Edit { form, .. }) | Some(Modal::Upload(form)) => {
            modal::draw_form_modal(frame, form)
        }
        Some(Modal::ConfirmDelete { name }) => modal::draw_confirm_delete(frame, name),
        None => {}
    }
    if app.show_help {
        draw_help_overlay(frame);
    }
    if let Some(url) = app.login_prompt() {
        modal::draw_login_modal(frame, &url);
    }
}

/// Draw the active tab, with the detail pane beside it when a photo is open.
fn draw_content(frame: &mut Frame, app: &mut App, area: Rect) {
    let (list_area, detail_area) = if app.detail.is_some() {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    match app.active_tab {
        Tab::Photos => list::render_photo_feed(frame, &mut app.photos, "Photos", list_area),
        Tab::Tags => match &mut app.tag_photos {
            Some(tag_photos) => {
                let title = format!("#{}", tag_photos.tag);
                list::render_photo_feed(frame, &mut tag_photos.feed, &title, list_area);
            }
            None => list::render_tag_feed(frame, &mut app.tags, list_area),
        },
        Tab::Search => list::render_search(frame, &mut app.search, list_area),
    }

    if let (Some(detail), Some(area)) = (&app.detail, detail_area) {
        list::render_detail(frame, detail, area);
    }
}

fn hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::raw(format!("  {} ", key)),
        Span::styled(action, Style::default().fg(Color::DarkGray)),
    ]
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(status) = &app.status {
        let color = if status.is_error { Color::Red } else { Color::Green };
        let line = Paragraph::new(Span::styled(
            format!(" {}", status.text),
            Style::default().fg(color),
        ));
        frame.render_widget(line, area);
        return;
    }

    let mut hints: Vec<Span> = if app.detail.is_some() {
        [
            hint("e", "Edit"),
            hint("d", "Delete"),
            hint("Esc", "Close"),
            hint("?", "Help"),
            hint("q", "Quit"),
        ]
        .into_iter()
        .flatten()
        .collect()
    } else {
        [
            hint("↑↓", "Navigate"),
            hint("↵", "Open"),
            hint("Tab", "Switch"),
            hint("u", "Upload"),
            hint("r", "Refresh"),
            hint("?", "Help"),
            hint("q", "Quit"),
        ]
        .into_iter()
        .flatten()
        .collect()
    };

    let pending = app.pending_mutations();
    if pending > 0 {
        hints.push(Span::styled(
            format!("  ⏳ {} pending", pending),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 50.min(area.width);
    let popup_height = 19.min(area.height);
    let popup_x = (area.width - popup_width) / 2;
    let popup_y = (area.height - popup_height) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let keys = [
        ("↑/↓ or j/k", "Navigate list"),
        ("Enter", "Open photo / tag"),
        ("Esc", "Close photo / tag"),
        ("Tab", "Switch tabs"),
        ("/", "Edit search (Search tab)"),
        ("e", "Edit open photo"),
        ("d", "Delete open photo"),
        ("u", "Upload a photo"),
        ("r", "Refresh"),
        ("l", "Log out"),
        ("?", "Show/hide this help"),
        ("q", "Quit"),
    ];

    let mut help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    help_text.extend(keys.iter().map(|(key, action)| {
        Line::from(vec![
            Span::styled(format!("  {:<14}", key), Style::default().fg(Color::Cyan)),
            Span::raw(*action),
        ])
    }));
    help_text.push(Line::from(""));
    help_text.push(Line::from(vec![
        Span::styled("Press ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::styled(" or ", Style::default().fg(Color::DarkGray)),
        Span::styled("?", Style::default().fg(Color::Yellow)),
        Span::styled(" to close", Style::default().fg(Color::DarkGray)),
    ]));

    let help_paragraph = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help ")
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
    );

    frame.render_widget(help_paragraph, popup_area);
}
