// Modal UI components.
// Forms, delete confirmation, and the login prompt drawn over the view.

use ratatui::{prelude::*, widgets::*};

use crate::state::Form;

/// A rectangle of at most `width` x `height` centered in `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn instructions(keys: &[(&'static str, &'static str)]) -> Paragraph<'static> {
    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(format!(" {}", key), Style::default().fg(Color::Yellow)),
                Span::styled(format!(" = {} ", action), Style::default().fg(Color::DarkGray)),
            ]
        })
        .collect();
    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

/// Draw a text form with one input box per field.
pub fn draw_form_modal(frame: &mut Frame, form: &Form) {
    let height = form.fields.len() as u16 * 3 + 4;
    let modal_area = centered(frame.area(), 64, height);
    frame.render_widget(Clear, modal_area);

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", form.title));
    let inner = outer.inner(modal_area);
    frame.render_widget(outer, modal_area);

    let mut constraints: Vec<Constraint> = form.fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let border = if focused { Color::Yellow } else { Color::DarkGray };
        let mut line = vec![Span::raw(field.value.clone())];
        if focused {
            line.push(Span::styled("█", Style::default().fg(Color::Yellow)));
        }
        let input = Paragraph::new(Line::from(line)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(format!(" {} ", field.label)),
        );
        frame.render_widget(input, chunks[i]);
    }

    let help = instructions(&[("Enter", "Save"), ("Tab", "Next field"), ("Esc", "Cancel")]);
    frame.render_widget(help, chunks[form.fields.len()]);
}

/// Ask before deleting a photo.
pub fn draw_confirm_delete(frame: &mut Frame, name: &str) {
    let modal_area = centered(frame.area(), 50, 6);
    frame.render_widget(Clear, modal_area);

    let text = vec![
        Line::from(vec![
            Span::raw("Delete "),
            Span::styled(name.to_string(), Style::default().fg(Color::Cyan)),
            Span::raw("?"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Yellow)),
            Span::styled(" = Delete  ", Style::default().fg(Color::DarkGray)),
            Span::styled("any other key", Style::default().fg(Color::Yellow)),
            Span::styled(" = Cancel", Style::default().fg(Color::DarkGray)),
        ]),
    ];

    let widget = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Delete Photo "),
    );
    frame.render_widget(widget, modal_area);
}

/// Show where to sign in after the session was rejected.
pub fn draw_login_modal(frame: &mut Frame, url: &str) {
    let modal_area = centered(frame.area(), 70, 9);
    frame.render_widget(Clear, modal_area);

    let text = vec![
        Line::from(Span::styled(
            "Your session has expired or you are not signed in.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Open this address in a browser to sign in:"),
        Line::from(Span::styled(url.to_string(), Style::default().fg(Color::Cyan))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::styled(" = Dismiss", Style::default().fg(Color::DarkGray)),
        ]),
    ];

    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Sign In "),
        );
    frame.render_widget(widget, modal_area);
}
