use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// One labelled line of a wizard form.
pub struct FieldView<'a> {
    pub label: &'a str,
    pub value: String,
    pub selected: bool,
    pub editing: bool,
    pub error: Option<&'a str>,
    pub hint: Option<&'a str>,
}

/// Apply a keystroke to a free-text field.
pub fn edit_text(value: &mut String, key: KeyCode) {
    match key {
        KeyCode::Char(c) => value.push(c),
        KeyCode::Backspace => {
            value.pop();
        }
        _ => {}
    }
}

pub fn render_fields<B: Backend>(frame: &mut Frame<B>, area: Rect, title: &str, fields: &[FieldView]) {
    let items: Vec<ListItem> = fields
        .iter()
        .map(|field| {
            let label_style = if field.selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            let value = if field.editing {
                Span::styled(
                    format!("{}|", field.value),
                    Style::default().add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw(field.value.clone())
            };

            let mut lines = vec![Spans::from(vec![
                Span::styled(format!("{}: ", field.label), label_style),
                value,
            ])];

            if let Some(error) = field.error {
                lines.push(Spans::from(Span::styled(
                    format!("  {error}"),
                    Style::default().fg(Color::Red),
                )));
            } else if let Some(hint) = field.hint.filter(|_| field.selected) {
                lines.push(Spans::from(Span::styled(
                    format!("  {hint}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }

            ListItem::new(lines)
        })
        .collect();

    let form_list = List::new(items).block(Block::default().borders(Borders::ALL).title(title.to_string()));

    frame.render_widget(form_list, area);
}
