mod config;
mod db;
mod error;
mod logging;
mod models;
mod operations;

use clap::Parser;
use config::{config_file_path, update_settings_file, DatabaseType, Settings};
use db::{open_store, LedgerStore};
use error::LedgerResult;
use operations::add::{
    add_expense_to_db, add_income_to_db, edit_expense_in_db, edit_income_in_db, parse_date,
};
use operations::alerts::{run_tick, AlertMonitor};
use operations::backup::{
    backup_database, database_info, default_backup_name, list_backups, restore_database,
};
use operations::budget::{delete_budget_db, set_budget_db};
use operations::budget_status::{BudgetEngine, BudgetStatus, ThresholdPath};
use operations::category::{
    add_category_db, category_expenses, delete_category_db, list_categories, rename_category_db,
    seed_defaults,
};
use operations::export::{export_data, ExportFormat};
use operations::migrate::migrate_to_cloud;
use operations::remove::{remove_expense_from_db, remove_income_from_db};
use operations::report::{
    category_totals, chart_dataset, daily_category_pivot, income_by_source, period_summary,
    DateRange,
};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "expman", about = "Track expenses, incomes and budgets")]
struct Cli {
    /// Settings file (defaults to EXPENSE_MANAGER_CONFIG or the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the settings
    #[arg(long)]
    db: Option<PathBuf>,

    /// Do not start the periodic budget alerts
    #[arg(long)]
    no_alerts: bool,
}

pub enum UserCommands {
    Add,
    Income,
    Edit,
    EditIncome,
    Remove,
    RemoveIncome,
    Categories,
    Category,
    Budget,
    Budgets,
    Unbudget,
    Status,
    Alerts,
    Totals,
    Daily,
    Summary,
    Sources,
    Chart,
    Export,
    Backup,
    Restore,
    Backups,
    Info,
    Migrate,
    Settings,
    Help,
    Exit,
    Unknown,
}

/// Why the prompt loop returned.
enum Outcome {
    Quit,
    Restore(PathBuf),
    Reload(Settings),
}

fn main() -> ExitCode {
    logging::init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> LedgerResult<()> {
    let config_path = config_file_path(cli.config.as_deref());
    let mut settings = Settings::load(&config_path)?;
    if let Some(db) = &cli.db {
        settings.database_path = db.clone();
    }
    settings.validate()?;

    println!("Welcome to the expense manager!");
    loop {
        let store = open_store(&settings)?;
        seed_defaults(store.as_ref())?;

        let monitor = if cli.no_alerts {
            None
        } else {
            Some(AlertMonitor::spawn(settings.clone(), |messages| {
                for message in messages {
                    println!("\n{}", message);
                }
            }))
        };
        let running = monitor
            .as_ref()
            .map(AlertMonitor::running_flag)
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

        let outcome = prompt_loop(store.as_ref(), &settings, &config_path, &running);
        drop(monitor);
        drop(store);

        match outcome {
            Outcome::Quit => return Ok(()),
            Outcome::Restore(backup) => {
                match restore_database(&settings.database_path, &backup) {
                    Ok(Some(saved)) => {
                        println!("Database restored. Previous data saved to {}", saved.display())
                    }
                    Ok(None) => println!("Database restored."),
                    Err(e) => println!("Restore failed: {}", e),
                }
            }
            Outcome::Reload(mut updated) => {
                if let Some(db) = &cli.db {
                    updated.database_path = db.clone();
                }
                settings = updated;
            }
        }
    }
}

fn prompt_loop(
    store: &dyn LedgerStore,
    settings: &Settings,
    config_path: &Path,
    running: &AtomicBool,
) -> Outcome {
    let engine = BudgetEngine::new(store, settings.thresholds);
    match engine.dashboard_status() {
        Ok(status) => println!("{}", status),
        Err(e) => println!("Error reading budgets: {}", e),
    }

    loop {
        println!("Please enter a command (type 'help' for the list):");

        // read user input
        let input = match read_user_input() {
            Ok(cmd) => cmd,
            Err(e) => {
                println!("Error reading input: {}", e);
                continue;
            }
        };
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        let result = match check_for_command(parts[0]) {
            UserCommands::Add => prompt(
                "Enter expense details in the format:\ndate(YYYY-MM-DD), amount, category, note",
            )
            .and_then(|details| add_expense_to_db(store, &details))
            .map(|id| println!("Expense {} added successfully!", id)),
            UserCommands::Income => {
                prompt("Enter income details in the format:\ndate(YYYY-MM-DD), amount, source")
                    .and_then(|details| add_income_to_db(store, &details))
                    .map(|id| println!("Income {} added successfully!", id))
            }
            UserCommands::Edit => prompt("Provide the expense ID to edit:").and_then(|id| {
                let details =
                    prompt("Enter the new details: date(YYYY-MM-DD), amount, category, note")?;
                edit_expense_in_db(store, &id, &details)?;
                println!("Expense updated.");
                Ok(())
            }),
            UserCommands::EditIncome => prompt("Provide the income ID to edit:").and_then(|id| {
                let details = prompt("Enter the new details: date(YYYY-MM-DD), amount, source")?;
                edit_income_in_db(store, &id, &details)?;
                println!("Income updated.");
                Ok(())
            }),
            UserCommands::Remove => prompt("Provide the expense ID to remove:")
                .and_then(|id| remove_expense_from_db(store, &id))
                .map(|_| println!("Expense removed successfully.")),
            UserCommands::RemoveIncome => prompt("Provide the income ID to remove:")
                .and_then(|id| remove_income_from_db(store, &id))
                .map(|_| println!("Income removed successfully.")),
            UserCommands::Categories => print_categories(store),
            UserCommands::Category => manage_category(store),
            UserCommands::Budget => prompt(
                "Enter budget details in the format: \
                 category, amount, period(Weekly/Monthly/Yearly)",
            )
            .and_then(|details| {
                let fields: Vec<&str> = details.splitn(3, ',').collect();
                set_budget_db(
                    store,
                    fields.first().copied().unwrap_or(""),
                    fields.get(1).copied().unwrap_or(""),
                    fields.get(2).copied().unwrap_or(""),
                )
            })
            .map(|_| println!("Budget saved.")),
            UserCommands::Budgets => print_budgets(&engine, settings),
            UserCommands::Unbudget => {
                prompt("Provide the category whose budget should be removed:")
                    .and_then(|category| delete_budget_db(store, &category))
                    .map(|_| println!("Budget removed."))
            }
            UserCommands::Status => engine.dashboard_status().map(|status| println!("{}", status)),
            UserCommands::Alerts => run_tick(running, &engine).map(|outcome| match outcome {
                None => println!("A budget check is already running."),
                Some(messages) if messages.is_empty() => println!("All budgets are within limits."),
                Some(messages) => messages.iter().for_each(|m| println!("{}", m)),
            }),
            UserCommands::Totals => read_range().and_then(|range| {
                for (category, total) in category_totals(store, range)? {
                    println!("{:<20} {}", category, settings.format_amount(total));
                }
                Ok(())
            }),
            UserCommands::Daily => {
                read_range().and_then(|range| print_daily(store, range, settings))
            }
            UserCommands::Summary => read_range().and_then(|range| {
                let summary = period_summary(store, range)?;
                println!("Period:         {} to {}", range.start, range.end);
                println!("Total income:   {}", settings.format_amount(summary.total_income));
                println!("Total expenses: {}", settings.format_amount(summary.total_expenses));
                println!("Balance:        {}", settings.format_amount(summary.balance));
                Ok(())
            }),
            UserCommands::Sources => read_range().and_then(|range| {
                for (source, total) in income_by_source(store, range)? {
                    println!("{:<20} {}", source, settings.format_amount(total));
                }
                Ok(())
            }),
            UserCommands::Chart => {
                read_range().and_then(|range| print_chart(store, range, settings))
            }
            UserCommands::Export => read_range().and_then(|range| {
                let format: ExportFormat = prompt("Export format (csv/json):")?.parse()?;
                let path = prompt("File path to export to:")?;
                let written = export_data(store, range, format, &PathBuf::from(path))?;
                println!("Data exported successfully to {}", written.display());
                Ok(())
            }),
            UserCommands::Backup => sqlite_only(settings).and_then(|_| {
                let default_name = default_backup_name();
                let target = prompt(&format!("Backup file path (empty for {}):", default_name))?;
                let target = if target.is_empty() { default_name } else { target };
                backup_database(&settings.database_path, &PathBuf::from(&target))?;
                println!("Backup completed successfully: {}", target);
                Ok(())
            }),
            UserCommands::Restore => {
                match sqlite_only(settings).and_then(|_| prompt("Backup file to restore from:")) {
                    Ok(path) if !path.is_empty() => {
                        let answer =
                            prompt("This replaces the current database. Continue? (yes/no)");
                        if matches!(answer.as_deref(), Ok("yes") | Ok("y")) {
                            return Outcome::Restore(PathBuf::from(path));
                        }
                        println!("Restore cancelled.");
                        Ok(())
                    }
                    Ok(_) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            UserCommands::Backups => prompt("Directory to search for backups:").and_then(|dir| {
                let dir = if dir.is_empty() { "." } else { dir.as_str() };
                let backups = list_backups(Path::new(dir))?;
                if backups.is_empty() {
                    println!("No backups found.");
                }
                for backup in backups {
                    println!(
                        "{}  {} bytes  {}",
                        backup.filename,
                        backup.size_bytes,
                        backup.modified.format("%Y-%m-%d %H:%M:%S")
                    );
                }
                Ok(())
            }),
            UserCommands::Info => print_info(settings),
            UserCommands::Migrate => migrate_to_cloud(settings).map(|report| {
                println!(
                    "Migrated {} categories, {} expenses, {} incomes and {} budgets.",
                    report.categories, report.expenses, report.incomes, report.budgets
                );
                println!(
                    "Run 'settings' and set database_type = postgresql to use the cloud database."
                );
            }),
            UserCommands::Settings => match edit_settings(settings, config_path) {
                Ok(Some(updated)) => return Outcome::Reload(updated),
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            },
            UserCommands::Help => {
                print_help();
                Ok(())
            }
            UserCommands::Exit => {
                println!("Exiting the application.");
                return Outcome::Quit;
            }
            UserCommands::Unknown => {
                println!("Unknown command '{}'. Type 'help' for the list.", parts[0]);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("Error: {}", e);
            println!("Please try again.");
        }
    }
}

fn print_categories(store: &dyn LedgerStore) -> LedgerResult<()> {
    for category in list_categories(store)? {
        println!("{:>4}  {}", category.id, category.name);
    }
    Ok(())
}

fn manage_category(store: &dyn LedgerStore) -> LedgerResult<()> {
    let action = prompt("Category action (add/rename/delete/show):")?;
    match action.as_str() {
        "add" => {
            add_category_db(store, &prompt("New category name:")?)?;
            println!("Category added.");
        }
        "rename" => {
            let old = prompt("Category to rename:")?;
            let new = prompt("New name:")?;
            rename_category_db(store, &old, &new)?;
            println!("Category renamed.");
        }
        "delete" => {
            let name = prompt("Category to delete (its expenses and budget are deleted too):")?;
            let removed = delete_category_db(store, &name)?;
            println!("Category deleted together with {} expense(s).", removed);
        }
        "show" => {
            let name = prompt("Category to show:")?;
            let range = read_range()?;
            let expenses = category_expenses(store, &name, range)?;
            if expenses.is_empty() {
                println!("No expenses found for category: {}", name);
            }
            for expense in expenses {
                println!(
                    "{:>4}  {}  {:>10}  {}",
                    expense.id, expense.date, expense.amount, expense.note
                );
            }
        }
        other => println!("Unknown category action '{}'.", other),
    }
    Ok(())
}

fn print_budgets(engine: &BudgetEngine<'_>, settings: &Settings) -> LedgerResult<()> {
    let overview = engine.budget_overview(ThresholdPath::Dashboard)?;
    if overview.reports.is_empty() {
        println!("No budgets set.");
        return Ok(());
    }
    for report in &overview.reports {
        let status = match report.status {
            BudgetStatus::Ok => "OK",
            BudgetStatus::Warning => "WARNING",
            BudgetStatus::Over => "OVER",
        };
        println!(
            "{:<16} {:<8} budget {:>12}  spent {:>12}  left {:>12}  {:>6.1}%  {}",
            report.category,
            report.period,
            settings.format_amount(report.amount),
            settings.format_amount(report.spent),
            settings.format_amount(report.remaining),
            report.progress,
            status
        );
    }
    println!(
        "Total Budget: {} | Total Spent: {} | Remaining: {}",
        settings.format_amount(overview.total_budget),
        settings.format_amount(overview.total_spent),
        settings.format_amount(overview.total_remaining)
    );
    Ok(())
}

fn print_daily(store: &dyn LedgerStore, range: DateRange, settings: &Settings) -> LedgerResult<()> {
    let pivot = daily_category_pivot(store, range)?;
    if pivot.dates.is_empty() {
        println!("No expenses in this period.");
        return Ok(());
    }
    for (i, date) in pivot.dates.iter().enumerate() {
        let cells: Vec<String> = pivot
            .series
            .iter()
            .filter(|(_, values)| !values[i].is_zero())
            .map(|(category, values)| format!("{} {}", category, settings.format_amount(values[i])))
            .collect();
        println!("{}  {}", date, cells.join(", "));
    }
    Ok(())
}

fn print_chart(store: &dyn LedgerStore, range: DateRange, settings: &Settings) -> LedgerResult<()> {
    let data = chart_dataset(store, range)?;
    if data.is_empty() {
        println!("No expenses in this period.");
        return Ok(());
    }
    let total: rust_decimal::Decimal = data.iter().map(|(_, v)| *v).sum();
    for (category, value) in data {
        let share = value / total * rust_decimal::Decimal::ONE_HUNDRED;
        println!("{:<20} {:>12}  {:>5.1}%", category, settings.format_amount(value), share);
    }
    Ok(())
}

fn print_info(settings: &Settings) -> LedgerResult<()> {
    match settings.database_type {
        DatabaseType::Sqlite => {
            let info = database_info(&settings.database_path)?;
            println!("Database: {}", info.path.display());
            println!("Size:     {} bytes", info.size_bytes);
            println!("Modified: {}", info.modified.format("%Y-%m-%d %H:%M:%S"));
        }
        DatabaseType::Postgresql => {
            let cloud = &settings.cloud_database;
            println!("PostgreSQL database '{}' on {}:{}", cloud.database, cloud.host, cloud.port);
        }
    }
    Ok(())
}

/// Shows the settings and applies one edit. Returns the saved settings when
/// something changed so the caller can reopen the ledger with them.
fn edit_settings(settings: &Settings, config_path: &Path) -> LedgerResult<Option<Settings>> {
    println!("Settings file: {}", config_path.display());
    for (key, value) in settings.entries() {
        println!("  {:<26} {}", key, value);
    }
    let edit = prompt("Enter 'key = value', 'defaults' to restore defaults, or leave empty:")?;
    if edit.is_empty() {
        return Ok(None);
    }
    if edit.eq_ignore_ascii_case("defaults") {
        let answer = prompt("Restore all settings to their defaults? (yes/no)")?;
        if !matches!(answer.as_str(), "yes" | "y") {
            println!("Settings unchanged.");
            return Ok(None);
        }
    }
    let updated = update_settings_file(config_path, &edit)?;
    println!("Settings saved.");
    Ok(Some(updated))
}

fn sqlite_only(settings: &Settings) -> LedgerResult<()> {
    if settings.database_type != DatabaseType::Sqlite {
        return Err(error::LedgerError::Validation(
            "Backup and restore are only available for the local SQLite database".to_string(),
        ));
    }
    Ok(())
}

fn print_help() {
    println!(
        "Commands:
  add, edit, remove              expenses
  income, edit-income, remove-income
  categories, category           list or manage categories
  budget, budgets, unbudget      set, list or delete budgets
  status, alerts                 dashboard banner, run a budget check now
  totals, daily, summary, sources, chart
  export, backup, restore, backups, info, migrate
  settings                       show or change settings
  exit"
    );
}

/// Prints `message` and reads one trimmed line.
fn prompt(message: &str) -> LedgerResult<String> {
    println!("{}", message);
    read_line_from(&mut io::stdin().lock())
}

/// Reads `start end`; empty input means the current month so far.
fn read_range() -> LedgerResult<DateRange> {
    let input = prompt(
        "Enter the period as: start(YYYY-MM-DD) end(YYYY-MM-DD), or leave empty for this month:",
    )?;
    let dates: Vec<&str> = input.split_whitespace().collect();
    match dates.as_slice() {
        [] => Ok(DateRange::month_to_date(chrono::Local::now().date_naive())),
        [start, end] => Ok(DateRange::normalized(parse_date(start)?, parse_date(end)?)),
        _ => Err(error::LedgerError::Validation(
            "Please provide exactly two dates.".to_string(),
        )),
    }
}

fn read_user_input() -> io::Result<String> {
    read_input_line(&mut io::stdin().lock())
}

/// One trimmed line; end of input reads as `exit`.
fn read_input_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut input = String::new();
    let read = reader.read_line(&mut input)?;
    if read == 0 {
        return Ok("exit".to_string());
    }
    Ok(input.trim().to_string())
}

/// Like [`read_input_line`], with read failures reported as I/O errors.
fn read_line_from<R: BufRead>(reader: &mut R) -> LedgerResult<String> {
    Ok(read_input_line(reader)?)
}

fn check_for_command(input: &str) -> UserCommands {
    match input {
        "add" => UserCommands::Add,
        "income" => UserCommands::Income,
        "edit" => UserCommands::Edit,
        "edit-income" => UserCommands::EditIncome,
        "remove" => UserCommands::Remove,
        "remove-income" => UserCommands::RemoveIncome,
        "categories" => UserCommands::Categories,
        "category" => UserCommands::Category,
        "budget" => UserCommands::Budget,
        "budgets" => UserCommands::Budgets,
        "unbudget" => UserCommands::Unbudget,
        "status" => UserCommands::Status,
        "alerts" => UserCommands::Alerts,
        "totals" => UserCommands::Totals,
        "daily" => UserCommands::Daily,
        "summary" => UserCommands::Summary,
        "sources" => UserCommands::Sources,
        "chart" => UserCommands::Chart,
        "export" => UserCommands::Export,
        "backup" => UserCommands::Backup,
        "restore" => UserCommands::Restore,
        "backups" => UserCommands::Backups,
        "info" => UserCommands::Info,
        "migrate" => UserCommands::Migrate,
        "settings" => UserCommands::Settings,
        "help" => UserCommands::Help,
        "exit" | "quit" => UserCommands::Exit,
        _ => UserCommands::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use std::io::{BufReader, Cursor, Read};

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"))
        }
    }

    #[test]
    fn test_read_input_line_trims_and_maps_eof_to_exit() {
        let mut input = Cursor::new("  budgets  \n");
        assert_eq!(read_input_line(&mut input).unwrap(), "budgets");
        assert_eq!(read_input_line(&mut input).unwrap(), "exit");
    }

    #[test]
    fn test_read_failure_is_an_io_error() {
        let mut reader = BufReader::new(FailingReader);
        let err = read_line_from(&mut reader).unwrap_err();
        assert!(matches!(err, LedgerError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_settings_command_is_recognized() {
        assert!(matches!(check_for_command("settings"), UserCommands::Settings));
        assert!(matches!(check_for_command("quit"), UserCommands::Exit));
    }
}
