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
use crate::models::Customer;
use crate::ui::components::form::{edit_text, render_fields, FieldView};
use crate::ui::components::popup::render_error;
use crate::validation::{self, FormData, ValidationErrors, EMAIL, NAME};

pub enum CustomerWizardAction {
    Cancel,
    /// Submit the form; `Some(id)` updates that customer.
    Save(Option<i32>, FormData),
}

#[derive(Clone, PartialEq, Copy)]
pub enum CustomerField {
    Name,
    Email,
}

pub struct CustomerWizardState {
    customer_id: Option<i32>,
    pub name: String,
    pub email: String,
    pub current_field: CustomerField,
    pub editing: bool,
    errors: ValidationErrors,
    show_error: Option<String>,
}

impl CustomerWizardState {
    pub fn new() -> Self {
        Self {
            customer_id: None,
            name: String::new(),
            email: String::new(),
            current_field: CustomerField::Name,
            editing: false,
            errors: ValidationErrors::new(),
            show_error: None,
        }
    }

    pub fn from_existing(customer: Customer) -> Self {
        Self {
            customer_id: Some(customer.id),
            name: customer.name,
            email: customer.email,
            ..Self::new()
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            CustomerField::Name => CustomerField::Email,
            CustomerField::Email => CustomerField::Name,
        };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            CustomerField::Name => &mut self.name,
            CustomerField::Email => &mut self.email,
        };
        edit_text(field_value, key);
    }

    pub fn to_form(&self) -> FormData {
        FormData::new()
            .with(NAME, self.name.as_str())
            .with(EMAIL, self.email.as_str())
    }

    /// Run the same checks the handler will, keeping the messages per field.
    pub fn validate(&mut self) -> bool {
        match validation::validate_customer(&self.to_form()) {
            Ok(_) => {
                self.errors = ValidationErrors::new();
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    /// Show a failed submission on the form.
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

impl Default for CustomerWizardState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_customer_wizard<B: Backend>(f: &mut Frame<B>, state: &mut CustomerWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = if state.customer_id.is_none() {
        "New Customer"
    } else {
        "Edit Customer"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let fields = [
        FieldView {
            label: "Name",
            value: state.name.clone(),
            selected: state.current_field == CustomerField::Name,
            editing: state.editing && state.current_field == CustomerField::Name,
            error: state.error_for(NAME),
            hint: None,
        },
        FieldView {
            label: "Email",
            value: state.email.clone(),
            selected: state.current_field == CustomerField::Email,
            editing: state.editing && state.current_field == CustomerField::Email,
            error: state.error_for(EMAIL),
            hint: Some("e.g. billing@example.com"),
        },
    ];
    render_fields(f, chunks[1], "Customer Details", &fields);

    let help_text = if state.editing {
        "Enter - Save field | Esc - Stop editing"
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save customer | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);

    if let Some(error) = &state.show_error {
        render_error(f, error);
    }
}

pub fn handle_key(state: &mut CustomerWizardState, key: KeyCode) -> Option<CustomerWizardAction> {
    if state.show_error.take().is_some() {
        return None;
    }

    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(CustomerWizardAction::Cancel);
            }
        }
        KeyCode::Enter => {
            state.toggle_editing();
        }
        KeyCode::Up | KeyCode::Down | KeyCode::Tab if !state.editing => {
            state.next_field();
        }
        KeyCode::Char('s') if !state.editing => {
            if state.validate() {
                return Some(CustomerWizardAction::Save(state.customer_id, state.to_form()));
            }
        }
        _ if state.editing => {
            state.edit_current_field(key);
        }
        _ => {}
    }

    None
}

pub fn handle_input(state: &mut CustomerWizardState) -> Result<Option<CustomerWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn type_text(state: &mut CustomerWizardState, text: &str) {
        for c in text.chars() {
            handle_key(state, KeyCode::Char(c));
        }
    }

    #[test]
    fn fills_and_submits_new_customer() {
        let mut state = CustomerWizardState::new();
        handle_key(&mut state, KeyCode::Enter);
        type_text(&mut state, "Ada");
        handle_key(&mut state, KeyCode::Enter);
        handle_key(&mut state, KeyCode::Down);
        handle_key(&mut state, KeyCode::Enter);
        type_text(&mut state, "ada@example.com");
        handle_key(&mut state, KeyCode::Enter);

        match handle_key(&mut state, KeyCode::Char('s')) {
            Some(CustomerWizardAction::Save(None, form)) => {
                assert_eq!(form.get(NAME), Some("Ada"));
                assert_eq!(form.get(EMAIL), Some("ada@example.com"));
            }
            _ => panic!("expected a save action"),
        }
    }

    #[test]
    fn invalid_form_stays_open_with_field_errors() {
        let mut state = CustomerWizardState::new();
        state.name = "Ada".to_string();
        state.email = "not-an-email".to_string();

        assert!(handle_key(&mut state, KeyCode::Char('s')).is_none());
        assert_eq!(state.error_for(EMAIL), Some("Invalid email format"));
        assert_eq!(state.error_for(NAME), None);
    }

    #[test]
    fn editing_existing_customer_keeps_its_id() {
        let customer = Customer {
            id: 4,
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            created_at: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let mut state = CustomerWizardState::from_existing(customer);
        assert!(matches!(
            handle_key(&mut state, KeyCode::Char('s')),
            Some(CustomerWizardAction::Save(Some(4), _))
        ));
    }

    #[test]
    fn typing_s_while_editing_is_text() {
        let mut state = CustomerWizardState::new();
        handle_key(&mut state, KeyCode::Enter);
        assert!(handle_key(&mut state, KeyCode::Char('s')).is_none());
        assert_eq!(state.name, "s");
    }

    #[test]
    fn storage_failure_is_shown_then_dismissed() {
        let mut state = CustomerWizardState::new();
        state.apply_error(&ActionError::Storage(anyhow::anyhow!("connection refused")));
        assert!(state.show_error.is_some());

        assert!(handle_key(&mut state, KeyCode::Esc).is_none());
        assert!(state.show_error.is_none());
        assert!(matches!(
            handle_key(&mut state, KeyCode::Esc),
            Some(CustomerWizardAction::Cancel)
        ));
    }
}
