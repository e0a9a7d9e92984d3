//! Non-interactive command line.
//!
//! Mutating commands go through the same handlers the screens use, so a
//! submission from the shell is validated exactly like one from a form.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::actions::{self, ActionError, ActionResult};
use crate::db::Store;
use crate::models::{Customer, Invoice, InvoiceStats, InvoiceWithCustomer};
use crate::money::format_currency;
use crate::validation::{self, FormData, CUSTOMER_ID, DESCRIPTION, EMAIL, NAME, STATUS, VALUE};

#[derive(Parser, Debug)]
#[command(name = "invoice_desk")]
#[command(about = "Manage customers and invoices")]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the terminal interface (default)
    Tui,
    /// Apply pending database migrations
    Migrate,
    /// Manage customers
    Customers {
        #[command(subcommand)]
        command: CustomerCommand,
    },
    /// Manage invoices
    Invoices {
        #[command(subcommand)]
        command: InvoiceCommand,
    },
    /// Show invoice totals by status
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// List customers, optionally filtered by name
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Change a customer; omitted fields keep their current value
    Update {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Delete { id: i32 },
}

#[derive(Args, Debug, Default)]
pub struct InvoiceFields {
    /// Customer id
    #[arg(long)]
    pub customer: Option<String>,
    /// Amount such as 12,64 or 12.64
    #[arg(long, allow_hyphen_values = true)]
    pub value: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// open, paid, void or uncollectible
    #[arg(long)]
    pub status: Option<String>,
}

impl InvoiceFields {
    fn to_form(&self) -> FormData {
        [
            (CUSTOMER_ID, &self.customer),
            (VALUE, &self.value),
            (DESCRIPTION, &self.description),
            (STATUS, &self.status),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }
}

#[derive(Subcommand, Debug)]
pub enum InvoiceCommand {
    /// List invoices, newest first
    List {
        #[arg(long)]
        status: Option<String>,
        /// Only invoices of this customer
        #[arg(long, conflicts_with = "status")]
        customer: Option<i32>,
    },
    Show { id: i32 },
    Add {
        #[command(flatten)]
        fields: InvoiceFields,
    },
    /// Change the given fields of an invoice
    Update {
        id: i32,
        #[command(flatten)]
        fields: InvoiceFields,
    },
    /// Set only the status of an invoice
    Status { id: i32, status: String },
    Delete { id: i32 },
}

/// Result of a command that succeeded.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
    Customers(Vec<Customer>),
    Customer(Customer),
    Invoices(Vec<InvoiceWithCustomer>),
    CustomerInvoices(Vec<Invoice>),
    InvoiceRow(InvoiceWithCustomer),
    Invoice(Invoice),
    Deleted { entity: &'static str, deleted: usize },
    Stats(InvoiceStats),
}

pub async fn run_customers<S: Store>(store: &S, command: CustomerCommand) -> Result<Output, ActionError> {
    let output = match command {
        CustomerCommand::List { search } => {
            Output::Customers(actions::list_customers(store, search.as_deref()).await?)
        }
        CustomerCommand::Add { name, email } => {
            let form = FormData::new().with(NAME, name).with(EMAIL, email);
            Output::Customer(actions::create_customer(store, &form).await?)
        }
        CustomerCommand::Update { id, name, email } => {
            let current = actions::get_customer(store, id).await?;
            let form = FormData::new()
                .with(NAME, name.unwrap_or(current.name))
                .with(EMAIL, email.unwrap_or(current.email));
            Output::Customer(actions::update_customer(store, id, &form).await?)
        }
        CustomerCommand::Delete { id } => {
            let deleted = actions::delete_customer(store, id).await?;
            Output::Deleted {
                entity: "customer",
                deleted: deleted.len(),
            }
        }
    };
    Ok(output)
}

pub async fn run_invoices<S: Store>(store: &S, command: InvoiceCommand) -> Result<Output, ActionError> {
    let output = match command {
        InvoiceCommand::List {
            customer: Some(customer_id),
            ..
        } => Output::CustomerInvoices(actions::list_invoices_by_customer(store, customer_id).await?),
        InvoiceCommand::List { status, .. } => {
            let status = status
                .as_deref()
                .map(validation::validate_status)
                .transpose()?;
            Output::Invoices(actions::list_invoices(store, status).await?)
        }
        InvoiceCommand::Show { id } => Output::InvoiceRow(actions::get_invoice(store, id).await?),
        InvoiceCommand::Add { fields } => {
            Output::Invoice(actions::create_invoice(store, &fields.to_form()).await?)
        }
        InvoiceCommand::Update { id, fields } => {
            Output::Invoice(actions::update_invoice(store, id, &fields.to_form()).await?)
        }
        InvoiceCommand::Status { id, status } => {
            Output::Invoice(actions::update_invoice_status(store, id, &status).await?)
        }
        InvoiceCommand::Delete { id } => {
            let deleted = actions::delete_invoice(store, id).await?;
            Output::Deleted {
                entity: "invoice",
                deleted: deleted.len(),
            }
        }
    };
    Ok(output)
}

pub async fn run_stats<S: Store>(store: &S) -> Result<Output, ActionError> {
    Ok(Output::Stats(actions::invoice_stats(store).await?))
}

fn invoice_line(invoice: &Invoice, customer_name: Option<&str>) -> String {
    format!(
        "#{:<5} {}  {:<24} {:>12}  {}",
        invoice.id,
        invoice.created_at.format("%Y-%m-%d"),
        customer_name.unwrap_or("-"),
        format_currency(invoice.value.into()),
        invoice.status.label(),
    )
}

/// Human-readable rendering of a successful command.
pub fn render_text(output: &Output) -> String {
    match output {
        Output::Customers(customers) if customers.is_empty() => "No customers found".to_string(),
        Output::Customers(customers) => customers
            .iter()
            .map(|c| format!("{:<5} {:<24} {}", c.id, c.name, c.email))
            .collect::<Vec<_>>()
            .join("\n"),
        Output::Customer(c) => format!("{:<5} {:<24} {}", c.id, c.name, c.email),
        Output::Invoices(rows) if rows.is_empty() => "No invoices found".to_string(),
        Output::Invoices(rows) => rows
            .iter()
            .map(|row| invoice_line(&row.invoice, row.customer_name.as_deref()))
            .collect::<Vec<_>>()
            .join("\n"),
        Output::CustomerInvoices(invoices) if invoices.is_empty() => "No invoices found".to_string(),
        Output::CustomerInvoices(invoices) => invoices
            .iter()
            .map(|invoice| invoice_line(invoice, None))
            .collect::<Vec<_>>()
            .join("\n"),
        Output::InvoiceRow(row) => {
            let mut text = invoice_line(&row.invoice, row.customer_name.as_deref());
            if let Some(description) = &row.invoice.description {
                text.push('\n');
                text.push_str(description);
            }
            text
        }
        Output::Invoice(invoice) => invoice_line(invoice, None),
        Output::Deleted { entity, deleted } => format!("Deleted {deleted} {entity}(s)"),
        Output::Stats(stats) => format!(
            "Invoices:      {}\nTotal:         {}\nPaid:          {}\nOutstanding:   {}\nVoid:          {}\nUncollectible: {}",
            stats.total_invoices,
            format_currency(stats.total_amount),
            format_currency(stats.paid_amount),
            format_currency(stats.outstanding_amount),
            format_currency(stats.void_amount),
            format_currency(stats.uncollectible_amount),
        ),
    }
}

/// Human-readable rendering of a failed command.
pub fn render_failure(result: &ActionResult) -> String {
    let mut lines = vec![format!(
        "Error: {}",
        result.message.as_deref().unwrap_or("request failed")
    )];
    for (field, message) in &result.field_errors {
        lines.push(format!("  {field}: {message}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::InvoiceStatus;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("invoice_desk").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    async fn add_customer(store: &MemoryStore) -> Customer {
        let Output::Customer(customer) = run_customers(
            store,
            CustomerCommand::Add {
                name: "Acme".to_string(),
                email: "billing@acme.example".to_string(),
            },
        )
        .await
        .unwrap() else {
            panic!("expected a customer");
        };
        customer
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn json_flag_is_global() {
        let cli = parse(&["invoices", "list", "--status", "open", "--json"]);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Some(Command::Invoices {
                command: InvoiceCommand::List { status: Some(ref s), customer: None }
            }) if s == "open"
        ));
    }

    #[test]
    fn negative_value_reaches_validation() {
        let cli = parse(&["invoices", "add", "--customer", "1", "--value", "-5"]);
        let Some(Command::Invoices {
            command: InvoiceCommand::Add { fields },
        }) = cli.command
        else {
            panic!("expected invoices add");
        };
        let errors = validation::validate_new_invoice(&fields.to_form()).unwrap_err();
        assert_eq!(errors.get(VALUE), Some("Value must be a positive number"));
    }

    #[tokio::test]
    async fn customer_update_keeps_omitted_fields() {
        let store = MemoryStore::new();
        let customer = add_customer(&store).await;

        let Output::Customer(updated) = run_customers(
            &store,
            CustomerCommand::Update {
                id: customer.id,
                name: Some("Acme Corp".to_string()),
                email: None,
            },
        )
        .await
        .unwrap() else {
            panic!("expected a customer");
        };
        assert_eq!(updated.name, "Acme Corp");
        assert_eq!(updated.email, "billing@acme.example");
    }

    #[tokio::test]
    async fn invoice_commands_flow_through_handlers() {
        let store = MemoryStore::new();
        let customer = add_customer(&store).await;

        let fields = InvoiceFields {
            customer: Some(customer.id.to_string()),
            value: Some("12,649".to_string()),
            ..InvoiceFields::default()
        };
        let Output::Invoice(invoice) = run_invoices(&store, InvoiceCommand::Add { fields })
            .await
            .unwrap()
        else {
            panic!("expected an invoice");
        };
        assert_eq!(invoice.value, 1264);

        let Output::Invoice(paid) = run_invoices(
            &store,
            InvoiceCommand::Status {
                id: invoice.id,
                status: "paid".to_string(),
            },
        )
        .await
        .unwrap() else {
            panic!("expected an invoice");
        };
        assert_eq!(paid.status, InvoiceStatus::Paid);

        let output = run_stats(&store).await.unwrap();
        let text = render_text(&output);
        assert!(text.contains("Paid:          $12,64"));
    }

    #[tokio::test]
    async fn unknown_status_filter_is_a_field_error() {
        let store = MemoryStore::new();
        let err = run_invoices(
            &store,
            InvoiceCommand::List {
                status: Some("overdue".to_string()),
                customer: None,
            },
        )
        .await
        .unwrap_err();

        let rendered = render_failure(&ActionResult::failure(&err));
        assert!(rendered.contains("status: Invalid invoice status"));
    }

    #[tokio::test]
    async fn customer_with_invoices_cannot_be_deleted() {
        let store = MemoryStore::new();
        let customer = add_customer(&store).await;
        let fields = InvoiceFields {
            customer: Some(customer.id.to_string()),
            value: Some("10".to_string()),
            ..InvoiceFields::default()
        };
        run_invoices(&store, InvoiceCommand::Add { fields }).await.unwrap();

        let err = run_customers(&store, CustomerCommand::Delete { id: customer.id })
            .await
            .unwrap_err();
        let json = serde_json::to_value(ActionResult::failure(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Cannot delete customer with existing invoices");
    }

    #[test]
    fn empty_lists_have_messages() {
        assert_eq!(render_text(&Output::Customers(Vec::new())), "No customers found");
        assert_eq!(render_text(&Output::Invoices(Vec::new())), "No invoices found");
    }
}
