use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::actions::{self, ActionError};
use crate::db::Store;
use crate::models::{InvoiceStatus, InvoiceWithCustomer};
use crate::money::format_currency;
use crate::ui::components::popup::{render_confirmation, render_error};

pub const STATUS_UPDATED: &str = "Invoice status updated successfully!";

pub struct InvoiceDetailState {
    invoice: InvoiceWithCustomer,
    selected_status: InvoiceStatus,
    show_delete_confirmation: bool,
    message: Option<String>,
    show_error: Option<String>,
}

impl InvoiceDetailState {
    pub fn new(invoice: InvoiceWithCustomer) -> Self {
        let selected_status = invoice.invoice.status;
        Self {
            invoice,
            selected_status,
            show_delete_confirmation: false,
            message: None,
            show_error: None,
        }
    }

    pub fn invoice_id(&self) -> i32 {
        self.invoice.invoice.id
    }

    pub fn invoice(&self) -> &InvoiceWithCustomer {
        &self.invoice
    }

    pub fn selected_status(&self) -> InvoiceStatus {
        self.selected_status
    }

    /// Reload after a successful status change.
    pub fn status_applied(&mut self, invoice: InvoiceWithCustomer) {
        self.selected_status = invoice.invoice.status;
        self.invoice = invoice;
        self.message = Some(STATUS_UPDATED.to_string());
    }

    pub fn apply_error(&mut self, err: &ActionError) {
        self.message = None;
        self.show_error = Some(err.to_string());
    }
}

pub enum InvoiceDetailAction {
    Back,
    Edit(i32),
    SetStatus(i32, InvoiceStatus),
    Delete(i32),
}

pub async fn load_invoice_detail<S: Store>(store: &S, id: i32) -> Result<InvoiceDetailState, ActionError> {
    let invoice = actions::get_invoice(store, id).await?;
    Ok(InvoiceDetailState::new(invoice))
}

pub fn render_invoice_detail<B: Backend>(frame: &mut Frame<B>, state: &mut InvoiceDetailState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ].as_ref())
        .split(frame.size());

    let invoice = &state.invoice.invoice;
    let label = Style::default().fg(Color::Gray);
    let details = Paragraph::new(vec![
        Spans::from(vec![
            Span::styled("Customer: ", label),
            Span::raw(state.invoice.customer_name.clone().unwrap_or_else(|| "-".to_string())),
        ]),
        Spans::from(vec![
            Span::styled("Date: ", label),
            Span::raw(invoice.created_at.format("%b %-d, %Y").to_string()),
        ]),
        Spans::from(vec![
            Span::styled("Value: ", label),
            Span::styled(
                format_currency(invoice.value.into()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Spans::from(vec![
            Span::styled("Status: ", label),
            Span::raw(invoice.status.label()),
        ]),
        Spans::from(""),
        Spans::from(vec![
            Span::styled("Description: ", label),
            Span::raw(invoice.description.clone().unwrap_or_default()),
        ]),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(format!("Invoice #{}", invoice.id))
            .borders(Borders::ALL),
    );
    frame.render_widget(details, chunks[0]);

    let mut buttons = Vec::new();
    for status in InvoiceStatus::ALL {
        let style = if status == state.selected_status {
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else if status == invoice.status {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        buttons.push(Span::styled(format!(" {} ", status.label()), style));
        buttons.push(Span::raw(" "));
    }
    let status_bar = Paragraph::new(Spans::from(buttons))
        .block(Block::default().title("Change Status").borders(Borders::ALL));
    frame.render_widget(status_bar, chunks[1]);

    let message = Paragraph::new(state.message.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(message, chunks[2]);

    let help = Paragraph::new(
        "<Left/Right> Choose status | <Enter> Apply | <E> Edit | <D> Delete | <Esc> Back",
    )
    .block(Block::default().borders(Borders::TOP))
    .style(Style::default().fg(Color::White));
    frame.render_widget(help, chunks[3]);

    if state.show_delete_confirmation {
        render_confirmation(
            frame,
            "Are you sure you want to delete this invoice?",
            "This cannot be undone.",
        );
    }

    if let Some(error) = &state.show_error {
        render_error(frame, error);
    }
}

pub fn handle_key(state: &mut InvoiceDetailState, key: KeyCode) -> Option<InvoiceDetailAction> {
    if state.show_error.take().is_some() {
        return None;
    }

    if state.show_delete_confirmation {
        match key {
            KeyCode::Char('y') => {
                state.show_delete_confirmation = false;
                return Some(InvoiceDetailAction::Delete(state.invoice_id()));
            }
            KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                state.show_delete_confirmation = false;
            }
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Esc | KeyCode::Char('q') => return Some(InvoiceDetailAction::Back),
        KeyCode::Right => {
            state.selected_status = state.selected_status.next();
            state.message = None;
        }
        KeyCode::Left => {
            state.selected_status = state.selected_status.previous();
            state.message = None;
        }
        KeyCode::Enter => {
            return Some(InvoiceDetailAction::SetStatus(
                state.invoice_id(),
                state.selected_status,
            ));
        }
        KeyCode::Char('e') => return Some(InvoiceDetailAction::Edit(state.invoice_id())),
        KeyCode::Char('d') => state.show_delete_confirmation = true,
        _ => {}
    }

    None
}

pub fn handle_input(state: &mut InvoiceDetailState) -> Result<Option<InvoiceDetailAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewCustomer, NewInvoice};
    use tui::{backend::TestBackend, Terminal};

    async fn store_with_invoice() -> (MemoryStore, i32) {
        let store = MemoryStore::new();
        let customer = store
            .create_customer(&NewCustomer {
                name: "Acme".to_string(),
                email: "billing@acme.example".to_string(),
            })
            .await
            .unwrap();
        let invoice = store
            .create_invoice(&NewInvoice {
                value: 1264,
                description: Some("Consulting".to_string()),
                customer_id: customer.id,
                status: InvoiceStatus::Open,
            })
            .await
            .unwrap();
        (store, invoice.id)
    }

    #[tokio::test]
    async fn choosing_status_and_applying_it() {
        let (store, id) = store_with_invoice().await;
        let mut state = load_invoice_detail(&store, id).await.unwrap();

        handle_key(&mut state, KeyCode::Right);
        assert_eq!(state.selected_status(), InvoiceStatus::Paid);

        let Some(InvoiceDetailAction::SetStatus(target, status)) =
            handle_key(&mut state, KeyCode::Enter)
        else {
            panic!("expected a status change");
        };
        actions::update_invoice_status(&store, target, status.as_str())
            .await
            .unwrap();
        state.status_applied(actions::get_invoice(&store, target).await.unwrap());

        assert_eq!(state.invoice().invoice.status, InvoiceStatus::Paid);
        assert_eq!(state.message.as_deref(), Some(STATUS_UPDATED));
    }

    #[tokio::test]
    async fn left_wraps_to_last_status() {
        let (store, id) = store_with_invoice().await;
        let mut state = load_invoice_detail(&store, id).await.unwrap();

        handle_key(&mut state, KeyCode::Left);
        assert_eq!(state.selected_status(), InvoiceStatus::Uncollectible);
    }

    #[tokio::test]
    async fn delete_asks_first() {
        let (store, id) = store_with_invoice().await;
        let mut state = load_invoice_detail(&store, id).await.unwrap();

        assert!(handle_key(&mut state, KeyCode::Char('d')).is_none());
        assert!(handle_key(&mut state, KeyCode::Esc).is_none());
        assert!(matches!(
            handle_key(&mut state, KeyCode::Esc),
            Some(InvoiceDetailAction::Back)
        ));

        handle_key(&mut state, KeyCode::Char('d'));
        assert!(matches!(
            handle_key(&mut state, KeyCode::Char('y')),
            Some(InvoiceDetailAction::Delete(deleted)) if deleted == id
        ));
    }

    #[tokio::test]
    async fn renders_invoice_fields() {
        let (store, id) = store_with_invoice().await;
        let mut state = load_invoice_detail(&store, id).await.unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| render_invoice_detail(f, &mut state)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect();
        assert!(text.contains("$12,64"));
        assert!(text.contains("Consulting"));
        assert!(text.contains("Uncollectible"));
    }
}
