mod actions;
mod cli;
mod config;
mod db;
mod models;
mod money;
mod telemetry;
mod ui;
mod validation;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::actions::{ActionError, ActionResult};
use crate::cli::{Cli, Command, Output};
use crate::db::Store;
use crate::telemetry::LogTarget;
use crate::ui::{
    customer_wizard::{CustomerWizardAction, CustomerWizardState, render_customer_wizard, handle_input as handle_customer_wizard_input},
    customers::{CustomerAction, CustomersState, render_customers, handle_input as handle_customers_input, load_customers},
    dashboard::{DashboardAction, DashboardState, InvoiceFilter, render_dashboard, handle_input as handle_dashboard_input, load_dashboard},
    invoice_detail::{InvoiceDetailAction, InvoiceDetailState, render_invoice_detail, handle_input as handle_invoice_detail_input, load_invoice_detail},
    invoice_wizard::{InvoiceWizardAction, InvoiceWizardState, render_invoice_wizard, handle_input as handle_invoice_wizard_input, load_invoice_wizard},
};

// Represents the current screen in the app
enum AppScreen {
    Dashboard,
    InvoiceDetail,
    InvoiceWizard(Option<i32>),     // Contains optional invoice_id
    Customers,
    CustomerWizard,
}

// Main application state
struct AppState<'a, S: Store> {
    store: &'a S,
    screen: AppScreen,
    filter: InvoiceFilter,
    dashboard_state: Option<DashboardState>,
    invoice_detail_state: Option<InvoiceDetailState>,
    invoice_wizard_state: Option<InvoiceWizardState>,
    customers_state: Option<CustomersState>,
    customer_wizard_state: Option<CustomerWizardState>,
}

impl<'a, S: Store> AppState<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            screen: AppScreen::Dashboard,
            filter: InvoiceFilter::All,
            dashboard_state: None,
            invoice_detail_state: None,
            invoice_wizard_state: None,
            customers_state: None,
            customer_wizard_state: None,
        }
    }

    // Shows a failed navigation on the screen the user is still looking at
    fn report_error(&mut self, err: &ActionError) {
        match self.screen {
            AppScreen::Dashboard => {
                if let Some(state) = &mut self.dashboard_state {
                    state.apply_error(err);
                }
            }
            AppScreen::InvoiceDetail => {
                if let Some(state) = &mut self.invoice_detail_state {
                    state.apply_error(err);
                }
            }
            AppScreen::InvoiceWizard(_) => {
                if let Some(state) = &mut self.invoice_wizard_state {
                    state.apply_error(err);
                }
            }
            AppScreen::Customers => {
                if let Some(state) = &mut self.customers_state {
                    state.apply_error(err);
                }
            }
            AppScreen::CustomerWizard => {
                if let Some(state) = &mut self.customer_wizard_state {
                    state.apply_error(err);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?;

    let target = match cli.command {
        None | Some(Command::Tui) => LogTarget::Interactive,
        Some(_) => LogTarget::Stderr,
    };
    telemetry::init_tracing(&config, target)?;

    // Initialize the store
    let backend = db::init(&config).await?;

    if matches!(cli.command, Some(Command::Migrate)) {
        match &backend {
            db::Backend::Postgres(db) => db.run_migrations().await?,
            db::Backend::Memory(_) => info!("in-memory store needs no migrations"),
        }
        println!("Migrations applied");
        return Ok(ExitCode::SUCCESS);
    }

    match &backend {
        db::Backend::Postgres(db) => run(db, cli).await,
        db::Backend::Memory(store) => run(store, cli).await,
    }
}

async fn run<S: Store>(store: &S, cli: Cli) -> Result<ExitCode> {
    let json = cli.json;
    let result = match cli.command {
        None | Some(Command::Tui) => {
            run_tui(store).await?;
            return Ok(ExitCode::SUCCESS);
        }
        // Applied in `main` before a store is chosen.
        Some(Command::Migrate) => return Ok(ExitCode::SUCCESS),
        Some(Command::Customers { command }) => cli::run_customers(store, command).await,
        Some(Command::Invoices { command }) => cli::run_invoices(store, command).await,
        Some(Command::Stats) => cli::run_stats(store).await,
    };

    print_result(result, json)
}

fn print_result(result: Result<Output, ActionError>, json: bool) -> Result<ExitCode> {
    let outcome = ActionResult::from_result(&result);
    match result {
        Ok(output) if json => println!("{}", serde_json::to_string_pretty(&output)?),
        Ok(output) => println!("{}", cli::render_text(&output)),
        Err(_) if json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        Err(_) => eprintln!("{}", cli::render_failure(&outcome)),
    }

    if outcome.success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn run_tui<S: Store>(store: &S) -> Result<()> {
    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app_state = AppState::new(store);

    // Run the main app loop
    let result = match load_dashboard_screen(&mut app_state).await {
        Ok(()) => run_app(&mut terminal, &mut app_state).await,
        Err(err) => Err(err),
    };

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Show any error message
    if let Err(err) = &result {
        error!(error = %err, "terminal session ended with an error");
        println!("Error: {}", err);
    }

    result
}

async fn run_app<B: Backend, S: Store>(terminal: &mut Terminal<B>, app_state: &mut AppState<'_, S>) -> Result<()> {
    loop {
        // Render current screen
        terminal.draw(|f| {
            match app_state.screen {
                AppScreen::Dashboard => {
                    if let Some(state) = &mut app_state.dashboard_state {
                        render_dashboard(f, state);
                    }
                }
                AppScreen::InvoiceDetail => {
                    if let Some(state) = &mut app_state.invoice_detail_state {
                        render_invoice_detail(f, state);
                    }
                }
                AppScreen::InvoiceWizard(_) => {
                    if let Some(state) = &mut app_state.invoice_wizard_state {
                        render_invoice_wizard(f, state);
                    }
                }
                AppScreen::Customers => {
                    if let Some(state) = &mut app_state.customers_state {
                        render_customers(f, state);
                    }
                }
                AppScreen::CustomerWizard => {
                    if let Some(state) = &mut app_state.customer_wizard_state {
                        render_customer_wizard(f, state);
                    }
                }
            }
        })?;

        // Handle input for current screen
        let should_quit = match app_state.screen {
            AppScreen::Dashboard => handle_dashboard_screen(app_state).await?,
            AppScreen::InvoiceDetail => handle_invoice_detail_screen(app_state).await?,
            AppScreen::InvoiceWizard(_) => handle_invoice_wizard_screen(app_state).await?,
            AppScreen::Customers => handle_customers_screen(app_state).await?,
            AppScreen::CustomerWizard => handle_customer_wizard_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn load_dashboard_screen<S: Store>(app_state: &mut AppState<'_, S>) -> Result<()> {
    app_state.dashboard_state = Some(load_dashboard(app_state.store, app_state.filter).await?);
    app_state.screen = AppScreen::Dashboard;
    Ok(())
}

async fn load_invoice_detail_screen<S: Store>(app_state: &mut AppState<'_, S>, invoice_id: i32) {
    match load_invoice_detail(app_state.store, invoice_id).await {
        Ok(state) => {
            app_state.invoice_detail_state = Some(state);
            app_state.screen = AppScreen::InvoiceDetail;
        }
        Err(err) => app_state.report_error(&err),
    }
}

async fn load_invoice_wizard_screen<S: Store>(app_state: &mut AppState<'_, S>, invoice_id: Option<i32>) {
    match load_invoice_wizard(app_state.store, invoice_id).await {
        Ok(state) => {
            app_state.invoice_wizard_state = Some(state);
            app_state.screen = AppScreen::InvoiceWizard(invoice_id);
        }
        Err(err) => app_state.report_error(&err),
    }
}

async fn load_customers_screen<S: Store>(app_state: &mut AppState<'_, S>) -> Result<()> {
    let search = app_state
        .customers_state
        .as_ref()
        .map(|state| state.search().to_string())
        .unwrap_or_default();
    app_state.customers_state = Some(load_customers(app_state.store, &search).await?);
    app_state.screen = AppScreen::Customers;
    Ok(())
}

async fn handle_dashboard_screen<S: Store>(app_state: &mut AppState<'_, S>) -> Result<bool> {
    if let Some(state) = &mut app_state.dashboard_state {
        match handle_dashboard_input(state)? {
            Some(DashboardAction::Quit) => {
                return Ok(true);
            }
            Some(DashboardAction::ToggleFilter) => {
                app_state.filter = state.filter().toggled();
                load_dashboard_screen(app_state).await?;
            }
            Some(DashboardAction::ViewInvoice(invoice_id)) => {
                load_invoice_detail_screen(app_state, invoice_id).await;
            }
            Some(DashboardAction::NewInvoice) => {
                load_invoice_wizard_screen(app_state, None).await;
            }
            Some(DashboardAction::Customers) => {
                load_customers_screen(app_state).await?;
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_invoice_detail_screen<S: Store>(app_state: &mut AppState<'_, S>) -> Result<bool> {
    if let Some(state) = &mut app_state.invoice_detail_state {
        match handle_invoice_detail_input(state)? {
            Some(InvoiceDetailAction::Back) => {
                load_dashboard_screen(app_state).await?;
            }
            Some(InvoiceDetailAction::Edit(invoice_id)) => {
                load_invoice_wizard_screen(app_state, Some(invoice_id)).await;
            }
            Some(InvoiceDetailAction::SetStatus(invoice_id, status)) => {
                match actions::update_invoice_status(app_state.store, invoice_id, status.as_str()).await {
                    Ok(_) => match actions::get_invoice(app_state.store, invoice_id).await {
                        Ok(invoice) => state.status_applied(invoice),
                        Err(err) => state.apply_error(&err),
                    },
                    Err(err) => state.apply_error(&err),
                }
            }
            Some(InvoiceDetailAction::Delete(invoice_id)) => {
                match actions::delete_invoice(app_state.store, invoice_id).await {
                    Ok(_) => load_dashboard_screen(app_state).await?,
                    Err(err) => state.apply_error(&err),
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_invoice_wizard_screen<S: Store>(app_state: &mut AppState<'_, S>) -> Result<bool> {
    if let Some(state) = &mut app_state.invoice_wizard_state {
        match handle_invoice_wizard_input(state)? {
            Some(InvoiceWizardAction::Cancel) => {
                // Go back to where the wizard was opened from
                match app_state.screen {
                    AppScreen::InvoiceWizard(Some(invoice_id)) => {
                        match load_invoice_detail(app_state.store, invoice_id).await {
                            Ok(detail) => {
                                app_state.invoice_detail_state = Some(detail);
                                app_state.screen = AppScreen::InvoiceDetail;
                            }
                            Err(err) => {
                                load_dashboard_screen(app_state).await?;
                                app_state.report_error(&err);
                            }
                        }
                    }
                    _ => load_dashboard_screen(app_state).await?,
                }
            }
            Some(InvoiceWizardAction::Save(None, form)) => {
                match actions::create_invoice(app_state.store, &form).await {
                    Ok(_) => load_dashboard_screen(app_state).await?,
                    Err(err) => state.apply_error(&err),
                }
            }
            Some(InvoiceWizardAction::Save(Some(invoice_id), form)) => {
                match actions::update_invoice(app_state.store, invoice_id, &form).await {
                    Ok(_) => load_invoice_detail_screen(app_state, invoice_id).await,
                    Err(err) => state.apply_error(&err),
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_customers_screen<S: Store>(app_state: &mut AppState<'_, S>) -> Result<bool> {
    if let Some(state) = &mut app_state.customers_state {
        match handle_customers_input(state)? {
            Some(CustomerAction::Back) => {
                load_dashboard_screen(app_state).await?;
            }
            Some(CustomerAction::NewCustomer) => {
                app_state.customer_wizard_state = Some(CustomerWizardState::new());
                app_state.screen = AppScreen::CustomerWizard;
            }
            Some(CustomerAction::EditCustomer(customer_id)) => {
                match actions::get_customer(app_state.store, customer_id).await {
                    Ok(customer) => {
                        app_state.customer_wizard_state = Some(CustomerWizardState::from_existing(customer));
                        app_state.screen = AppScreen::CustomerWizard;
                    }
                    Err(err) => state.apply_error(&err),
                }
            }
            Some(CustomerAction::DeleteCustomer(customer_id)) => {
                match actions::delete_customer(app_state.store, customer_id).await {
                    Ok(_) => load_customers_screen(app_state).await?,
                    Err(err) => state.apply_error(&err),
                }
            }
            Some(CustomerAction::Search(query)) => {
                app_state.customers_state = Some(load_customers(app_state.store, &query).await?);
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_customer_wizard_screen<S: Store>(app_state: &mut AppState<'_, S>) -> Result<bool> {
    if let Some(state) = &mut app_state.customer_wizard_state {
        match handle_customer_wizard_input(state)? {
            Some(CustomerWizardAction::Cancel) => {
                load_customers_screen(app_state).await?;
            }
            Some(CustomerWizardAction::Save(customer_id, form)) => {
                let result = match customer_id {
                    None => actions::create_customer(app_state.store, &form).await,
                    Some(id) => actions::update_customer(app_state.store, id, &form).await,
                };
                match result {
                    Ok(_) => load_customers_screen(app_state).await?,
                    Err(err) => state.apply_error(&err),
                }
            }
            None => {}
        }
    }

    Ok(false)
}
