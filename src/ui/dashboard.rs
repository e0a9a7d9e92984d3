use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::actions::{self, ActionError};
use crate::db::Store;
use crate::models::{InvoiceStats, InvoiceStatus, InvoiceWithCustomer};
use crate::money::format_currency;
use crate::ui::components::popup::render_error;

/// Which invoices the dashboard table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceFilter {
    All,
    Open,
}

impl InvoiceFilter {
    pub fn toggled(self) -> Self {
        match self {
            InvoiceFilter::All => InvoiceFilter::Open,
            InvoiceFilter::Open => InvoiceFilter::All,
        }
    }

    fn status(self) -> Option<InvoiceStatus> {
        match self {
            InvoiceFilter::All => None,
            InvoiceFilter::Open => Some(InvoiceStatus::Open),
        }
    }

    fn title(self) -> &'static str {
        match self {
            InvoiceFilter::All => "All Invoices",
            InvoiceFilter::Open => "Open Invoices",
        }
    }
}

pub struct DashboardState {
    invoices: Vec<InvoiceWithCustomer>,
    stats: InvoiceStats,
    filter: InvoiceFilter,
    table_state: TableState,
    show_error: Option<String>,
}

impl DashboardState {
    pub fn new(invoices: Vec<InvoiceWithCustomer>, stats: InvoiceStats, filter: InvoiceFilter) -> Self {
        let mut table_state = TableState::default();
        if !invoices.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            invoices,
            stats,
            filter,
            table_state,
            show_error: None,
        }
    }

    pub fn next(&mut self) {
        if self.invoices.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) if i + 1 < self.invoices.len() => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.invoices.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(0) | None => self.invoices.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_invoice_id(&self) -> Option<i32> {
        self.table_state
            .selected()
            .and_then(|i| self.invoices.get(i))
            .map(|row| row.invoice.id)
    }

    pub fn filter(&self) -> InvoiceFilter {
        self.filter
    }

    pub fn apply_error(&mut self, err: &ActionError) {
        self.show_error = Some(err.to_string());
    }
}

pub enum DashboardAction {
    Quit,
    NewInvoice,
    ViewInvoice(i32),
    Customers,
    ToggleFilter,
}

pub async fn load_dashboard<S: Store>(store: &S, filter: InvoiceFilter) -> Result<DashboardState> {
    let invoices = actions::list_invoices(store, filter.status()).await?;
    let stats = actions::invoice_stats(store).await?;
    Ok(DashboardState::new(invoices, stats, filter))
}

pub fn render_dashboard<B: Backend>(frame: &mut Frame<B>, state: &mut DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(3),
        ].as_ref())
        .split(frame.size());

    let header_cells = ["Invoice Number", "Date", "Customer Name", "Value", "Status"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells)
        .style(Style::default())
        .height(1)
        .bottom_margin(1);

    let block = Block::default().title(state.filter.title()).borders(Borders::ALL);

    if state.invoices.is_empty() {
        let empty = Paragraph::new("No invoices found")
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(empty, chunks[0]);
    } else {
        let rows = state.invoices.iter().map(|row| {
            let invoice = &row.invoice;
            Row::new(vec![
                Cell::from(format!("#{}", invoice.id)),
                Cell::from(invoice.created_at.format("%Y-%m-%d").to_string()),
                Cell::from(row.customer_name.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(format_currency(invoice.value.into())),
                Cell::from(invoice.status.label()),
            ])
        });

        let table = Table::new(rows)
            .header(header)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .widths(&[
                Constraint::Percentage(15),
                Constraint::Percentage(15),
                Constraint::Percentage(35),
                Constraint::Percentage(20),
                Constraint::Percentage(15),
            ]);

        frame.render_stateful_widget(table, chunks[0], &mut state.table_state);
    }

    let stats = &state.stats;
    let summary = Paragraph::new(vec![
        Spans::from(vec![
            Span::styled("Invoices: ", Style::default().fg(Color::Gray)),
            Span::raw(stats.total_invoices.to_string()),
            Span::styled("  Total: ", Style::default().fg(Color::Gray)),
            Span::raw(format_currency(stats.total_amount)),
        ]),
        Spans::from(vec![
            Span::styled("Paid: ", Style::default().fg(Color::Green)),
            Span::raw(format_currency(stats.paid_amount)),
            Span::styled("  Outstanding: ", Style::default().fg(Color::Yellow)),
            Span::raw(format_currency(stats.outstanding_amount)),
            Span::styled("  Void: ", Style::default().fg(Color::Gray)),
            Span::raw(format_currency(stats.void_amount)),
            Span::styled("  Uncollectible: ", Style::default().fg(Color::Red)),
            Span::raw(format_currency(stats.uncollectible_amount)),
        ]),
    ])
    .block(Block::default().title("Summary").borders(Borders::ALL));
    frame.render_widget(summary, chunks[1]);

    let filter_hint = match state.filter {
        InvoiceFilter::All => "<Tab> Open only",
        InvoiceFilter::Open => "<Tab> All invoices",
    };
    let buttons = Paragraph::new(format!(
        "<N> New Invoice | <Enter> View | <C> Customers | {filter_hint} | <Q> Quit"
    ))
    .block(Block::default().borders(Borders::TOP))
    .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[2]);

    if let Some(error) = &state.show_error {
        render_error(frame, error);
    }
}

pub fn handle_key(state: &mut DashboardState, key: KeyCode) -> Option<DashboardAction> {
    if state.show_error.take().is_some() {
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(DashboardAction::Quit),
        KeyCode::Char('n') => return Some(DashboardAction::NewInvoice),
        KeyCode::Char('c') => return Some(DashboardAction::Customers),
        KeyCode::Tab | KeyCode::Char('f') => return Some(DashboardAction::ToggleFilter),
        KeyCode::Enter => return state.selected_invoice_id().map(DashboardAction::ViewInvoice),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }

    None
}

pub fn handle_input(state: &mut DashboardState) -> Result<Option<DashboardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}
