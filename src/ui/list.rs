// List rendering for photo and tag feeds.
// Styled rows plus the sentinel row that pulls the next page into view.

use chrono::{DateTime, Utc};
use ratatui::{prelude::*, widgets::*};

use crate::api::{Metadata, MetadataWithName, TagsWithSample};
use crate::query::{PagePayload, PageSnapshot};
use crate::state::{DetailState, Feed, LoadingState, SearchState};

/// Format a timestamp as relative time (e.g., "2h ago").
pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(*dt);

    if duration.num_days() > 0 {
        format!("{}d ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

pub fn render_loading(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(format!("⏳ {}...", message))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(text, area);
}

pub fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let text = Paragraph::new(format!("❌ {}", error))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Red));
    frame.render_widget(text, area);
}

pub fn render_empty(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(text, area);
}

fn photo_row(item: &MetadataWithName) -> ListItem<'static> {
    let tags = item
        .metadata
        .tags
        .iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ");

    ListItem::new(Line::from(vec![
        Span::styled(item.name.clone(), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  {}", format_relative_time(&item.metadata.created_at)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("  {}", tags), Style::default().fg(Color::Magenta)),
    ]))
}

fn tag_row(tag: &str, sample: &MetadataWithName) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled(format!("#{}", tag), Style::default().fg(Color::Magenta)),
        Span::styled(
            format!("  {}", sample.name),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
}

/// The row after the last item. Drawing it is what asks for the next page.
fn sentinel_row<P>(snapshot: &PageSnapshot<P>, end_message: &str) -> ListItem<'static> {
    let (text, color) = if snapshot.is_fetching {
        ("⏳ Loading more...".to_string(), Color::Yellow)
    } else if let Some(error) = &snapshot.error {
        (format!("❌ {} (scroll here to retry)", error), Color::Red)
    } else if snapshot.is_last {
        (end_message.to_string(), Color::DarkGray)
    } else {
        ("...".to_string(), Color::DarkGray)
    };
    ListItem::new(Span::styled(text, Style::default().fg(color)))
}

fn render_feed<P: PagePayload>(
    frame: &mut Frame,
    feed: &mut Feed<P>,
    mut rows: Vec<ListItem<'static>>,
    sentinel: ListItem<'static>,
    title: &str,
    area: Rect,
) {
    rows.push(sentinel);

    let list_widget = List::new(rows)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list_widget, area, &mut feed.list.list_state);

    let height = area.height.saturating_sub(2) as usize;
    let offset = feed.list.list_state.offset();
    feed.report_viewport(offset, height);
}

/// Render a paginated photo list.
pub fn render_photo_feed(
    frame: &mut Frame,
    feed: &mut Feed<Vec<MetadataWithName>>,
    title: &str,
    area: Rect,
) {
    let snapshot = feed.snapshot();
    let items = snapshot.data.as_deref().unwrap_or_default();
    let rows = items.iter().map(photo_row).collect();
    let empty = if items.is_empty() { "No photos yet" } else { "(end)" };
    let sentinel = sentinel_row(&snapshot, empty);
    render_feed(frame, feed, rows, sentinel, title, area);
}

/// Render the paginated tag list.
pub fn render_tag_feed(frame: &mut Frame, feed: &mut Feed<TagsWithSample>, area: Rect) {
    let snapshot = feed.snapshot();
    let rows: Vec<ListItem> = snapshot
        .data
        .iter()
        .flatten()
        .map(|(tag, sample)| tag_row(tag, sample))
        .collect();
    let empty = if rows.is_empty() { "No tags yet" } else { "(end)" };
    let sentinel = sentinel_row(&snapshot, empty);
    render_feed(frame, feed, rows, sentinel, "Tags", area);
}

/// Render search results below the query input.
pub fn render_search(frame: &mut Frame, search: &mut SearchState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let border = if search.editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let mut input = vec![
        Span::styled("Search: ", Style::default().fg(Color::DarkGray)),
        Span::raw(search.input.clone()),
    ];
    if search.editing {
        input.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    }
    let input_widget = Paragraph::new(Line::from(input)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(input_widget, chunks[0]);

    match &search.results {
        LoadingState::Idle => render_empty(frame, chunks[1], "Press / to search"),
        LoadingState::Loading => render_loading(frame, chunks[1], "Searching"),
        LoadingState::Error(e) => render_error(frame, chunks[1], e),
        LoadingState::Absent => render_empty(frame, chunks[1], "No matches"),
        LoadingState::Loaded(results) if results.is_empty() => {
            render_empty(frame, chunks[1], "No matches")
        }
        LoadingState::Loaded(results) => {
            let rows: Vec<ListItem> = results.iter().map(photo_row).collect();
            let list_widget = List::new(rows)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" {} results ", results.len())),
                )
                .highlight_style(
                    Style::default()
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");
            frame.render_stateful_widget(list_widget, chunks[1], &mut search.list.list_state);
        }
    }
}

fn detail_lines(name: &str, metadata: &Metadata) -> Vec<Line<'static>> {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    vec![
        Line::from(Span::styled(
            name.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![label("By       "), Span::raw(metadata.creator_email.clone())]),
        Line::from(vec![
            label("Created  "),
            Span::raw(format!(
                "{} ({})",
                metadata.created_at.format("%Y-%m-%d %H:%M"),
                format_relative_time(&metadata.created_at)
            )),
        ]),
        Line::from(vec![
            label("Tags     "),
            Span::styled(
                metadata.tags.iter().cloned().collect::<Vec<_>>().join(", "),
                Style::default().fg(Color::Magenta),
            ),
        ]),
        Line::from(""),
        Line::from(metadata.description.clone()),
    ]
}

/// Render the detail pane of the open photo.
pub fn render_detail(frame: &mut Frame, detail: &DetailState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Photo ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &detail.metadata {
        LoadingState::Idle | LoadingState::Loading => render_loading(frame, inner, "Loading photo"),
        LoadingState::Absent => render_error(frame, inner, &format!("{} not found", detail.name)),
        LoadingState::Error(e) => render_error(frame, inner, e),
        LoadingState::Loaded(metadata) => {
            let text = Paragraph::new(detail_lines(&detail.name, metadata)).wrap(Wrap { trim: true });
            frame.render_widget(text, inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(5))), "5m ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(3))), "3h ago");
        assert_eq!(format_relative_time(&(now - Duration::days(2))), "2d ago");
    }
}
