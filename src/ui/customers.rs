use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::actions::{self, ActionError};
use crate::db::Store;
use crate::models::Customer;
use crate::ui::components::popup::{render_confirmation, render_error};

// Represents the state of the customer list screen
pub struct CustomersState {
    customers: Vec<Customer>,
    list_state: ListState,
    show_delete_confirmation: bool,
    search: String,
    searching: bool,
    show_error: Option<String>,
}

impl CustomersState {
    pub fn new(customers: Vec<Customer>, search: String) -> Self {
        let mut list_state = ListState::default();
        if !customers.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            customers,
            list_state,
            show_delete_confirmation: false,
            search,
            searching: false,
            show_error: None,
        }
    }

    pub fn next(&mut self) {
        if self.customers.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.customers.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.customers.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(0) | None => self.customers.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_customer(&self) -> Option<&Customer> {
        self.list_state.selected().and_then(|i| self.customers.get(i))
    }

    pub fn selected_customer_id(&self) -> Option<i32> {
        self.selected_customer().map(|c| c.id)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn apply_error(&mut self, err: &ActionError) {
        self.show_error = Some(err.to_string());
    }
}

pub enum CustomerAction {
    Back,
    NewCustomer,
    EditCustomer(i32),
    DeleteCustomer(i32),
    Search(String),
}

pub async fn load_customers<S: Store>(store: &S, search: &str) -> Result<CustomersState> {
    let customers = actions::list_customers(store, Some(search)).await?;
    Ok(CustomersState::new(customers, search.to_string()))
}

pub fn render_customers<B: Backend>(frame: &mut Frame<B>, state: &mut CustomersState) {
    let size = frame.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    let search_style = if state.searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let search = Paragraph::new(Spans::from(vec![
        Span::styled("Search: ", search_style),
        Span::raw(format!("{}{}", state.search, if state.searching { "|" } else { "" })),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(search, chunks[0]);

    let items: Vec<ListItem> = if state.customers.is_empty() {
        vec![ListItem::new("No customers found")]
    } else {
        state
            .customers
            .iter()
            .map(|customer| {
                ListItem::new(Spans::from(vec![
                    Span::raw(customer.name.clone()),
                    Span::styled(
                        format!("  <{}>", customer.email),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(
                        format!("  since {}", customer.created_at.format("%b %-d, %Y")),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };

    let customers_list = List::new(items)
        .block(Block::default().title("Customers").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(customers_list, chunks[1], &mut state.list_state);

    let buttons_text = if state.searching {
        "<Enter> Apply search | <Esc> Cancel search"
    } else if state.selected_customer().is_some() {
        "<N> New Customer | <E> Edit Customer | <D> Delete Customer | </> Search | <Esc> Back"
    } else {
        "<N> New Customer | </> Search | <Esc> Back"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[2]);

    if state.show_delete_confirmation {
        render_confirmation(
            frame,
            "Are you sure you want to delete this customer?",
            "Customers with invoices cannot be deleted.",
        );
    }

    if let Some(error) = &state.show_error {
        render_error(frame, error);
    }
}

pub fn handle_key(state: &mut CustomersState, key: KeyCode) -> Option<CustomerAction> {
    if state.show_error.take().is_some() {
        return None;
    }

    if state.searching {
        match key {
            KeyCode::Enter => {
                state.searching = false;
                return Some(CustomerAction::Search(state.search.trim().to_string()));
            }
            KeyCode::Esc => {
                state.searching = false;
            }
            KeyCode::Char(c) => state.search.push(c),
            KeyCode::Backspace => {
                state.search.pop();
            }
            _ => {}
        }
        return None;
    }

    if state.show_delete_confirmation {
        match key {
            KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.selected_customer_id().map(CustomerAction::DeleteCustomer);
            }
            KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                state.toggle_delete_confirmation();
            }
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(CustomerAction::Back),
        KeyCode::Char('n') => return Some(CustomerAction::NewCustomer),
        KeyCode::Char('e') | KeyCode::Enter => {
            return state.selected_customer_id().map(CustomerAction::EditCustomer);
        }
        KeyCode::Char('d') => {
            if state.selected_customer().is_some() {
                state.toggle_delete_confirmation();
            }
        }
        KeyCode::Char('/') => {
            state.searching = true;
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }

    None
}

pub fn handle_input(state: &mut CustomersState) -> Result<Option<CustomerAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}
