//! Offline Inventory - stock counting CLI
//!
//! Logs in to the inventory backend, imports one domain's on-hand stock into a
//! local SQLite snapshot and records scanned counts against it.

use clap::{Parser, Subcommand};
use offline_inventory::{
    clear_all, clear_scan_events, fetch_and_import, get_scan_event_count, get_snapshot_count,
    list_scan_events, list_snapshot, open_db, pick_default_domain, start_fresh_session,
    InventoryError, LocalStorage, QadClient, Result, SavedImportFilters, ScanWorkflow,
    ScannerSettings, Session, SessionContext, SettingsProvider, Step, StepOutcome, WorkflowEvent,
    WorkflowState,
};
use rusqlite::Connection;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Offline stock counting against an imported inventory snapshot
#[derive(Parser, Debug)]
#[command(name = "offline_inventory")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Directory holding settings.json, session.json and import_filters.json
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Base URL of the inventory backend
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// OAuth client id sent with the login request
    #[arg(long, default_value = "offline_inventory")]
    client_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop the snapshot and all scan events and start a new counting session
    Init,
    /// Log in and select the default domain
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored token, operator and domain
    Logout,
    /// List available domains, optionally selecting one
    Domains {
        /// Domain code to select, e.g. CZ01
        #[arg(long)]
        select: Option<String>,
    },
    /// Import the selected domain's inventory into the snapshot
    Import {
        /// Domain code; defaults to the selected domain
        #[arg(long)]
        domain: Option<String>,
        /// Site code or `*`
        #[arg(long)]
        site: Option<String>,
        /// Storage location, `*` or a prefix ending in `*`
        #[arg(long)]
        location: Option<String>,
        /// Part number, `*` or a prefix ending in `*`
        #[arg(long)]
        part: Option<String>,
    },
    /// Show the imported snapshot
    Snapshot,
    /// Count stock: reads scans from stdin
    Scan {
        /// Site booked when the scanned item is not in the snapshot
        #[arg(long, default_value = "1")]
        site: String,
    },
    /// List recorded scan events, newest first
    Events {
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Delete all scan events
    Reset {
        /// Also empty the snapshot
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Show or change scanner settings
    Settings {
        #[arg(long)]
        sm_prefix: Option<String>,
        #[arg(long)]
        item_prefix: Option<String>,
        #[arg(long)]
        check_against_db: Option<bool>,
        #[arg(long)]
        reset_sm_after_item: Option<bool>,
        #[arg(long)]
        manual_qty: Option<bool>,
    },
}

/// Returns the default database path: ~/.local/share/offline_inventory/inventory.db
fn default_db_path() -> String {
    LocalStorage::default_dir()
        .join("inventory.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let storage = LocalStorage::new(
        args.data_dir
            .clone()
            .unwrap_or_else(LocalStorage::default_dir),
    );
    let client = QadClient::new(&args.base_url, &args.client_id);

    match args.command {
        Command::Init => {
            let conn = open_database(&args.database)?;
            start_fresh_session(&conn)?;
            println!("Started a new counting session");
        }
        Command::Login { username, password } => {
            login(&client, &storage, &username, &password).await?;
        }
        Command::Logout => {
            storage.clear_auth()?;
            println!("Logged out");
        }
        Command::Domains { select } => domains(&client, &storage, select).await?,
        Command::Import {
            domain,
            site,
            location,
            part,
        } => {
            let mut conn = open_database(&args.database)?;
            import(&client, &storage, &mut conn, domain, site, location, part).await?;
        }
        Command::Snapshot => {
            let conn = open_database(&args.database)?;
            for r in list_snapshot(&conn)? {
                println!(
                    "{:<12} {:<10} {:<20} {:<16} {:>10}  {}",
                    r.storage_location, r.site, r.part_number, r.reference, r.quantity, r.batch
                );
            }
            println!("{} records", get_snapshot_count(&conn)?);
        }
        Command::Scan { site } => {
            let conn = open_database(&args.database)?;
            scan(&conn, &storage, site)?;
        }
        Command::Events { json } => {
            let conn = open_database(&args.database)?;
            let events = list_scan_events(&conn)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                for e in &events {
                    println!(
                        "{}  {:<12} {:<16} {:>8} {:<14} {}",
                        e.scan_date,
                        e.storage_location,
                        e.reference,
                        e.quantity,
                        e.status.as_str(),
                        e.scanned_by
                    );
                }
                println!("{} events", events.len());
            }
        }
        Command::Reset { all } => {
            let mut conn = open_database(&args.database)?;
            if all {
                clear_all(&mut conn)?;
                println!("Snapshot and scan events deleted");
            } else {
                let removed = clear_scan_events(&conn)?;
                println!("Deleted {} scan events", removed);
            }
        }
        Command::Settings {
            sm_prefix,
            item_prefix,
            check_against_db,
            reset_sm_after_item,
            manual_qty,
        } => {
            let mut settings = storage.load_settings();
            let before = settings.clone();
            if let Some(v) = sm_prefix {
                settings.sm_prefix = v;
            }
            if let Some(v) = item_prefix {
                settings.item_prefix = v;
            }
            if let Some(v) = check_against_db {
                settings.check_against_db = v;
            }
            if let Some(v) = reset_sm_after_item {
                settings.reset_sm_after_item = v;
            }
            if let Some(v) = manual_qty {
                settings.manual_qty = v;
            }
            if settings != before {
                storage.save_settings(&settings)?;
                log::info!("Scanner settings saved");
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

fn open_database(path: &str) -> Result<Connection> {
    let db_path = PathBuf::from(path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            log::info!("Created directory: {}", parent.display());
        }
    }
    Ok(open_db(&db_path)?)
}

fn require_token(session: &Session) -> Result<&str> {
    session.access_token.as_deref().ok_or(InventoryError::Auth)
}

async fn login(
    client: &QadClient,
    storage: &LocalStorage,
    username: &str,
    password: &str,
) -> Result<()> {
    let token = client.authenticate(username, password).await?;
    log::info!("Logged in as {}", username);

    let domains = client.fetch_domains(&token).await?;
    let domain = pick_default_domain(&domains).map(|d| d.name.clone());
    match &domain {
        Some(d) => println!("Logged in as {}, domain {}", username, d),
        None => println!(
            "Logged in as {}. {} domains available, select one with `domains --select`",
            username,
            domains.len()
        ),
    }

    storage.save_session(&Session {
        access_token: Some(token),
        user_id: Some(username.to_string()),
        domain,
    })
}

async fn domains(client: &QadClient, storage: &LocalStorage, select: Option<String>) -> Result<()> {
    let mut session = storage.load_session();
    let token = require_token(&session)?.to_string();
    let domains = client.fetch_domains(&token).await?;

    if let Some(code) = select {
        if !domains.iter().any(|d| d.name == code) {
            return Err(InventoryError::Validation(format!("unknown domain {}", code)));
        }
        log::info!("Selected domain {}", code);
        session.domain = Some(code);
        storage.save_session(&session)?;
    }

    for d in &domains {
        let marker = if session.domain.as_deref() == Some(d.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<8} {}",
            marker,
            d.name,
            d.description.as_deref().unwrap_or(d.full_name.as_str())
        );
    }
    Ok(())
}

async fn import(
    client: &QadClient,
    storage: &LocalStorage,
    conn: &mut Connection,
    domain: Option<String>,
    site: Option<String>,
    location: Option<String>,
    part: Option<String>,
) -> Result<()> {
    let session = storage.load_session();
    let token = require_token(&session)?;
    let domain = domain.or_else(|| session.domain.clone()).unwrap_or_default();

    // Filters not given on the command line come from the last import of this domain
    let mut filters = storage
        .load_import_filters()
        .filter(|saved| saved.domain == domain)
        .map(|saved| saved.filters)
        .unwrap_or_default();
    if let Some(v) = site {
        filters.site = v;
    }
    if let Some(v) = location {
        filters.storage_location = v;
    }
    if let Some(v) = part {
        filters.part = v;
    }

    let summary = fetch_and_import(client, token, conn, &domain, &filters).await?;
    storage.save_import_filters(&SavedImportFilters {
        domain: domain.clone(),
        filters: filters.clone(),
    })?;
    println!(
        "Imported {} of {} records for {}",
        summary.imported, summary.available, domain
    );
    Ok(())
}

/// Map one line of operator input to a workflow event
///
/// While confirming a quantity, a bare line is taken as the quantity and
/// committed at once; an empty line commits the pending quantity.
fn parse_line(line: &str, state: &WorkflowState) -> Vec<WorkflowEvent> {
    let line = line.trim();
    if let Some(qty) = line.strip_prefix(":qty") {
        return vec![WorkflowEvent::EnterQuantity(qty.trim().to_string())];
    }
    match line {
        ":ok" => vec![WorkflowEvent::Commit],
        ":cancel" => vec![WorkflowEvent::Cancel],
        _ => match state.step {
            Step::ConfirmingQuantity(_) if line.is_empty() => vec![WorkflowEvent::Commit],
            Step::ConfirmingQuantity(_) => vec![
                WorkflowEvent::EnterQuantity(line.to_string()),
                WorkflowEvent::Commit,
            ],
            _ => vec![WorkflowEvent::Scan(line.to_string())],
        },
    }
}

fn scan(conn: &Connection, storage: &LocalStorage, site: String) -> Result<()> {
    let session = storage.load_session();
    let defaults = SessionContext::default();
    let context = SessionContext {
        domain: session.domain.unwrap_or(defaults.domain),
        site,
        operator: session.user_id.unwrap_or(defaults.operator),
    };

    let (mut workflow, mut state) = ScanWorkflow::start(storage, context);
    println!("Commands: :qty N, :ok, :cancel, :settings, :quit");
    println!("{}", state.status_message);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("[{}] > ", state.step.name());
        std::io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        match line.trim() {
            ":quit" => break,
            ":settings" => {
                state = workflow.resume(storage, state);
                print_settings(workflow.settings());
                println!("{}", state.status_message);
                continue;
            }
            "" if !matches!(state.step, Step::ConfirmingQuantity(_)) => continue,
            _ => {}
        }

        for event in parse_line(&line, &state) {
            let transition = workflow.apply(conn, state, event);
            state = transition.state;
            match transition.result {
                Ok(StepOutcome::Committed { event_id }) => {
                    log::debug!("Scan event {} saved", event_id)
                }
                Ok(_) => {}
                Err(e) => {
                    // Remaining events of this line depend on the failed one
                    log::log!(failure_level(&e), "{}", e);
                    break;
                }
            }
        }
        if let Some(qty) = state.pending_quantity() {
            println!("{} [qty: {}]", state.status_message, qty);
        } else {
            println!("{}", state.status_message);
        }
    }

    println!("{} scan events recorded", get_scan_event_count(conn)?);
    Ok(())
}

/// Operator mistakes are warnings; storage and other failures are errors
fn failure_level(err: &InventoryError) -> log::Level {
    if err.is_recoverable() {
        log::Level::Warn
    } else {
        log::Level::Error
    }
}

fn print_settings(settings: &ScannerSettings) {
    println!(
        "SM prefix: {:?}, item prefix: {:?}, check against db: {}, reset SM after item: {}, manual qty: {}",
        settings.sm_prefix,
        settings.item_prefix,
        settings.check_against_db,
        settings.reset_sm_after_item,
        settings.manual_qty
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirming_state() -> WorkflowState {
        let conn = Connection::open_in_memory().unwrap();
        let workflow = ScanWorkflow::new(
            ScannerSettings {
                check_against_db: false,
                ..ScannerSettings::default()
            },
            SessionContext::default(),
        );
        let state = WorkflowState::new(workflow.settings());
        let state = workflow
            .apply(&conn, state, WorkflowEvent::Scan("A1".to_string()))
            .state;
        workflow
            .apply(&conn, state, WorkflowEvent::Scan("R555".to_string()))
            .state
    }

    #[test]
    fn lines_are_scans_outside_quantity_step() {
        let state = WorkflowState::new(&ScannerSettings::default());
        assert_eq!(
            parse_line("  A1-05 ", &state),
            vec![WorkflowEvent::Scan("A1-05".to_string())]
        );
    }

    #[test]
    fn bare_number_while_confirming_enters_and_commits() {
        let state = confirming_state();
        assert_eq!(
            parse_line("4", &state),
            vec![
                WorkflowEvent::EnterQuantity("4".to_string()),
                WorkflowEvent::Commit
            ]
        );
        assert_eq!(parse_line("", &state), vec![WorkflowEvent::Commit]);
    }

    #[test]
    fn colon_commands_map_directly() {
        let state = confirming_state();
        assert_eq!(
            parse_line(":qty 2.5", &state),
            vec![WorkflowEvent::EnterQuantity("2.5".to_string())]
        );
        assert_eq!(parse_line(":cancel", &state), vec![WorkflowEvent::Cancel]);
        assert_eq!(parse_line(":ok", &state), vec![WorkflowEvent::Commit]);
    }

    #[test]
    fn failure_level_depends_on_recoverability() {
        let decode = InventoryError::Decode("empty scan".to_string());
        assert_eq!(failure_level(&decode), log::Level::Warn);
        let validation = InventoryError::Validation("enter a quantity".to_string());
        assert_eq!(failure_level(&validation), log::Level::Warn);
        let import = InventoryError::Import("no domain selected".to_string());
        assert_eq!(failure_level(&import), log::Level::Error);
    }
}
