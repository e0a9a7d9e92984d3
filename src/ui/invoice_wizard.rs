use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::actions::ActionError;
use crate::db::Store;
use crate::models::{Customer, Invoice, InvoiceStatus};
use crate::money::{format_amount, sanitize_amount_input};
use crate::ui::components::form::{edit_text, render_fields, FieldView};
use crate::ui::components::popup::render_error;
use crate::validation::{
    self, FormData, ValidationErrors, CUSTOMER_ID, DESCRIPTION, STATUS, VALUE,
};

// Represents a field in the invoice form
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum InvoiceField {
    Customer,
    Value,
    Description,
    Status,
}

impl InvoiceField {
    const ORDER: [InvoiceField; 4] = [
        InvoiceField::Customer,
        InvoiceField::Value,
        InvoiceField::Description,
        InvoiceField::Status,
    ];

    fn step(self, forward: bool) -> Self {
        let len = Self::ORDER.len();
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward { index + 1 } else { index + len - 1 };
        Self::ORDER[next % len]
    }

    fn is_text(self) -> bool {
        matches!(self, InvoiceField::Value | InvoiceField::Description)
    }
}

pub enum InvoiceWizardAction {
    Cancel,
    /// Submit the form; `Some(id)` updates that invoice.
    Save(Option<i32>, FormData),
}

pub struct InvoiceWizardState {
    invoice_id: Option<i32>,
    customers: Vec<Customer>,
    customer_index: Option<usize>,
    value: String,
    description: String,
    status: InvoiceStatus,
    current_field: InvoiceField,
    editing: bool,
    errors: ValidationErrors,
    show_error: Option<String>,
}

impl InvoiceWizardState {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self {
            invoice_id: None,
            customers,
            customer_index: None,
            value: String::new(),
            description: String::new(),
            status: InvoiceStatus::default(),
            current_field: InvoiceField::Customer,
            editing: false,
            errors: ValidationErrors::new(),
            show_error: None,
        }
    }

    pub fn from_existing(customers: Vec<Customer>, invoice: Invoice) -> Self {
        let customer_index = customers.iter().position(|c| c.id == invoice.customer_id);
        Self {
            invoice_id: Some(invoice.id),
            customer_index,
            value: format_amount(invoice.value.into()),
            description: invoice.description.unwrap_or_default(),
            status: invoice.status,
            ..Self::new(customers)
        }
    }

    pub fn selected_customer(&self) -> Option<&Customer> {
        self.customer_index.and_then(|i| self.customers.get(i))
    }

    fn cycle_customer(&mut self, forward: bool) {
        if self.customers.is_empty() {
            return;
        }
        let len = self.customers.len();
        self.customer_index = Some(match (self.customer_index, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        });
    }

    fn cycle_choice(&mut self, forward: bool) {
        match self.current_field {
            InvoiceField::Customer => self.cycle_customer(forward),
            InvoiceField::Status => {
                self.status = if forward {
                    self.status.next()
                } else {
                    self.status.previous()
                };
            }
            _ => {}
        }
    }

    fn edit_current_field(&mut self, key: KeyCode) {
        match self.current_field {
            InvoiceField::Value => {
                edit_text(&mut self.value, key);
                self.value = sanitize_amount_input(&self.value);
            }
            InvoiceField::Description => edit_text(&mut self.description, key),
            _ => {}
        }
    }

    pub fn to_form(&self) -> FormData {
        let mut form = FormData::new()
            .with(VALUE, self.value.as_str())
            .with(DESCRIPTION, self.description.as_str())
            .with(STATUS, self.status.as_str());
        if let Some(customer) = self.selected_customer() {
            form.insert(CUSTOMER_ID, customer.id.to_string());
        }
        form
    }

    /// Check the form with the same rules the handler applies.
    pub fn validate(&mut self) -> bool {
        let result = match self.invoice_id {
            None => validation::validate_new_invoice(&self.to_form()).map(|_| ()),
            Some(_) => validation::validate_invoice_patch(&self.to_form()).map(|_| ()),
        };
        match result {
            Ok(()) => {
                self.errors = ValidationErrors::new();
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    pub fn apply_error(&mut self, err: &ActionError) {
        match err.field_errors() {
            Some(errors) => self.errors = errors.clone(),
            None => self.show_error = Some(err.to_string()),
        }
    }

    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }
}

pub async fn load_invoice_wizard<S: Store>(
    store: &S,
    invoice_id: Option<i32>,
) -> Result<InvoiceWizardState, ActionError> {
    let customers = store.customers().await?;
    let state = match invoice_id {
        Some(id) => {
            let invoice = crate::actions::get_invoice(store, id).await?;
            InvoiceWizardState::from_existing(customers, invoice.invoice)
        }
        None => InvoiceWizardState::new(customers),
    };
    Ok(state)
}

pub fn render_invoice_wizard<B: Backend>(f: &mut Frame<B>, state: &mut InvoiceWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = match state.invoice_id {
        None => "New Invoice".to_string(),
        Some(id) => format!("Edit Invoice #{id}"),
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let customer = match state.selected_customer() {
        Some(customer) => format!("< {} >", customer.name),
        None if state.customers.is_empty() => "No customers yet".to_string(),
        None => "< Select a customer >".to_string(),
    };

    let field = |which: InvoiceField| (state.current_field == which, state.editing && state.current_field == which);
    let (customer_selected, _) = field(InvoiceField::Customer);
    let (value_selected, value_editing) = field(InvoiceField::Value);
    let (description_selected, description_editing) = field(InvoiceField::Description);
    let (status_selected, _) = field(InvoiceField::Status);

    let fields = [
        FieldView {
            label: "Customer",
            value: customer,
            selected: customer_selected,
            editing: false,
            error: state.error_for(CUSTOMER_ID),
            hint: Some("Left/Right to choose"),
        },
        FieldView {
            label: "Value",
            value: state.value.clone(),
            selected: value_selected,
            editing: value_editing,
            error: state.error_for(VALUE),
            hint: Some("e.g. 12,64"),
        },
        FieldView {
            label: "Description",
            value: state.description.clone(),
            selected: description_selected,
            editing: description_editing,
            error: state.error_for(DESCRIPTION),
            hint: None,
        },
        FieldView {
            label: "Status",
            value: format!("< {} >", state.status.label()),
            selected: status_selected,
            editing: false,
            error: state.error_for(STATUS),
            hint: Some("Left/Right to choose"),
        },
    ];
    render_fields(f, chunks[1], "Invoice Details", &fields);

    let help_text = if state.editing {
        "Enter - Save field | Esc - Stop editing"
    } else {
        "Enter - Edit field | Up/Down - Navigate | Left/Right - Choose | S - Save invoice | Esc - Cancel"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);

    if let Some(error) = &state.show_error {
        render_error(f, error);
    }
}

pub fn handle_key(state: &mut InvoiceWizardState, key: KeyCode) -> Option<InvoiceWizardAction> {
    if state.show_error.take().is_some() {
        return None;
    }

    if state.editing {
        match key {
            KeyCode::Enter | KeyCode::Esc => state.editing = false,
            _ => state.edit_current_field(key),
        }
        return None;
    }

    match key {
        KeyCode::Esc => return Some(InvoiceWizardAction::Cancel),
        KeyCode::Enter if state.current_field.is_text() => state.editing = true,
        KeyCode::Down | KeyCode::Tab => state.current_field = state.current_field.step(true),
        KeyCode::Up => state.current_field = state.current_field.step(false),
        KeyCode::Right => state.cycle_choice(true),
        KeyCode::Left => state.cycle_choice(false),
        KeyCode::Char('s') => {
            if state.validate() {
                return Some(InvoiceWizardAction::Save(state.invoice_id, state.to_form()));
            }
        }
        _ => {}
    }

    None
}

pub fn handle_input(state: &mut InvoiceWizardState) -> Result<Option<InvoiceWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }

    Ok(None)
}
