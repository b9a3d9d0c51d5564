//! CLI binary for keeping budget sheets from the terminal.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use owo_colors::OwoColorize;
use trackly::allowance::DailyAllowance;
use trackly::format::{format_money, parse_money_value};
use trackly::identity::{Identity, Session};
use trackly::models::{
    BillItem, BillPatch, Category, CategoryId, DebtItem, DebtPatch, ExpenseItem, ExpensePatch,
    IncomeItem, IncomePatch, ItemId, LOCAL_USER, NaiveDate, NewBill, NewDebt, NewExpense,
    NewIncome, NewSavings, SavingsItem, SavingsPatch, ShareId, ShareVisibility, Sheet, SheetId,
    Theme, UserKey, day_key,
};
use trackly::storage::{BlockingStorage, FileStorage};
use trackly::store::{Added, Outcome, SheetStore};
use trackly::totals::{self, SheetTotals};

/// Environment variable naming the user whose sheets are opened.
const USER_ENV: &str = "TRACKLY_USER";

/// Currency symbol amounts are displayed with.
const CURRENCY: &str = "\u{20ab}";

/// Placeholder for an empty cell.
const BLANK: &str = "\u{2014}";

/// Trackly: budget sheets, category spending and a daily allowance.
#[derive(Debug, Parser)]
#[command(name = "trackly", version, about)]
struct Cli {
    /// Override the storage directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// User whose sheets are opened.
    #[arg(long, global = true, env = USER_ENV, default_value = LOCAL_USER)]
    user: String,
    /// Email of the user, checked when opening invited-only shares.
    #[arg(long, global = true)]
    email: Option<String>,
    /// Day the allowance is computed for (YYYY-MM-DD, default: today).
    #[arg(long, global = true, value_parser = parse_date)]
    today: Option<NaiveDate>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Show totals, the daily allowance and spending by category of the
    /// current sheet.
    Overview,
    /// List all sheets.
    Sheets,
    /// Add, rename, remove or switch sheets.
    #[command(subcommand)]
    Sheet(SheetCommand),
    /// Manage income entries of the current sheet.
    #[command(subcommand)]
    Income(PlainItemCommand),
    /// Manage savings entries of the current sheet.
    #[command(subcommand)]
    Savings(PlainItemCommand),
    /// Manage debt repayments of the current sheet.
    #[command(subcommand)]
    Debt(DatedItemCommand),
    /// Manage bills of the current sheet.
    #[command(subcommand)]
    Bill(DatedItemCommand),
    /// Manage expenses of the current sheet.
    #[command(subcommand)]
    Expense(ExpenseCommand),
    /// Manage expense categories of the current sheet.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Set the budgeting period of the current sheet.
    Period {
        /// First day of the period (YYYY-MM-DD).
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        /// Last day of the period, inclusive (YYYY-MM-DD).
        #[arg(value_parser = parse_date)]
        end: NaiveDate,
    },
    /// Share the current sheet read-only, or open someone's shared sheet.
    #[command(subcommand)]
    Share(ShareCommand),
    /// Switch the colour theme.
    Theme {
        /// Theme to use.
        #[arg(value_enum)]
        theme: ThemeArg,
    },
    /// Set the interface language.
    Language {
        /// Language code, e.g. `en` or `vi`.
        code: String,
    },
}

/// Sheet management.
#[derive(Debug, Subcommand)]
enum SheetCommand {
    /// Create a sheet and make it current.
    Add {
        /// Name of the sheet (default: "Sheet N").
        name: Option<String>,
    },
    /// Rename a sheet.
    Rename {
        /// Sheet id.
        id: String,
        /// New name.
        name: String,
    },
    /// Remove a sheet. The last sheet cannot be removed.
    Remove {
        /// Sheet id.
        id: String,
    },
    /// Make a sheet current.
    Use {
        /// Sheet id.
        id: String,
    },
}

/// Fields of a new undated entry.
#[derive(Debug, Args)]
struct EntryArgs {
    /// Amount, e.g. `1,500,000` or `50000`.
    #[arg(long, value_parser = parse_amount)]
    amount: f64,
    /// Free-text description.
    #[arg(long, default_value = "")]
    description: String,
}

/// Fields to change on an existing entry.
#[derive(Debug, Args)]
struct EntryChanges {
    /// New amount.
    #[arg(long, value_parser = parse_amount)]
    amount: Option<f64>,
    /// New description.
    #[arg(long)]
    description: Option<String>,
}

/// Commands for income and savings.
#[derive(Debug, Subcommand)]
enum PlainItemCommand {
    /// List entries.
    List,
    /// Add an entry.
    Add(EntryArgs),
    /// Remove an entry.
    Rm {
        /// Entry id.
        id: String,
    },
    /// Change fields of an entry.
    Edit {
        /// Entry id.
        id: String,
        /// Fields to change.
        #[command(flatten)]
        changes: EntryChanges,
    },
}

/// Commands for debts and bills.
#[derive(Debug, Subcommand)]
enum DatedItemCommand {
    /// List entries.
    List,
    /// Add an entry.
    Add {
        /// Amount and description.
        #[command(flatten)]
        entry: EntryArgs,
        /// Due date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
    },
    /// Remove an entry.
    Rm {
        /// Entry id.
        id: String,
    },
    /// Change fields of an entry.
    Edit {
        /// Entry id.
        id: String,
        /// Amount and description to change.
        #[command(flatten)]
        changes: EntryChanges,
        /// New due date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
    },
}

/// Expense commands.
#[derive(Debug, Subcommand)]
enum ExpenseCommand {
    /// List expenses.
    List,
    /// Record an expense.
    Add {
        /// Amount and description.
        #[command(flatten)]
        entry: EntryArgs,
        /// Category name to book the expense under.
        #[arg(long)]
        category: String,
        /// Day of the expense (YYYY-MM-DD, default: today).
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Remove an expense.
    Rm {
        /// Expense id.
        id: String,
    },
    /// Change fields of an expense.
    Edit {
        /// Expense id.
        id: String,
        /// Amount and description to change.
        #[command(flatten)]
        changes: EntryChanges,
        /// New category name.
        #[arg(long)]
        category: Option<String>,
        /// New day (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

/// Category commands.
#[derive(Debug, Subcommand)]
enum CategoryCommand {
    /// List categories with their totals.
    List,
    /// Add a category.
    Add {
        /// Category name.
        name: String,
    },
    /// Remove a category. Expenses booked under it are kept.
    Rm {
        /// Category id.
        id: String,
    },
    /// Rename a category. Expenses keep the old name.
    Rename {
        /// Category id.
        id: String,
        /// New name.
        name: String,
    },
}

/// Sharing commands.
#[derive(Debug, Subcommand)]
enum ShareCommand {
    /// Share the current sheet read-only.
    Enable {
        /// Who may open the share.
        #[arg(long, value_enum, default_value_t = VisibilityArg::Public)]
        visibility: VisibilityArg,
        /// Email allowed to open an invited-only share (repeatable).
        #[arg(long = "invite", value_name = "EMAIL")]
        invite: Vec<String>,
    },
    /// Stop sharing the current sheet.
    Disable,
    /// Show the sharing settings of the current sheet.
    Status,
    /// Open a shared sheet.
    View {
        /// Share id from the link.
        share_id: String,
    },
}

/// Colour theme choices.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeArg {
    /// Light scheme.
    Light,
    /// Dark scheme.
    Dark,
}

impl From<ThemeArg> for Theme {
    #[inline]
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
        }
    }
}

/// Share visibility choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VisibilityArg {
    /// Anyone holding the link.
    Public,
    /// Any signed-in viewer holding the link.
    Restricted,
    /// Only invited emails.
    Invited,
}

impl From<VisibilityArg> for ShareVisibility {
    #[inline]
    fn from(arg: VisibilityArg) -> Self {
        match arg {
            VisibilityArg::Public => Self::Public,
            VisibilityArg::Restricted => Self::Restricted,
            VisibilityArg::Invited => Self::Invited,
        }
    }
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a money amount for clap, ignoring currency symbols and
/// thousands separators.
#[allow(
    clippy::unnecessary_wraps,
    reason = "clap value parsers must return a Result"
)]
fn parse_amount(s: &str) -> Result<f64, String> {
    Ok(parse_money_value(s))
}

/// Builds the identity of the CLI user.
fn identity(user: &str, email: Option<&str>) -> Identity {
    let identity = Identity::new(UserKey::from(user));
    match email {
        Some(address) => identity.with_email(address),
        None => identity,
    }
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let storage = match create_storage(cli.data_dir) {
        Ok(storage) => storage,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to initialize storage: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut session = Session::new(Arc::new(storage));
    match session.sign_in(identity(&cli.user, cli.email.as_deref())) {
        Ok(origin) => tracing::debug!(user = %cli.user, ?origin, "session ready"),
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to load sheets of {}: {err}",
                "error:".red().bold(),
                cli.user.bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    }

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    dispatch(&mut session, today, cli.command)
}

/// Creates the storage backend, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_storage(data_dir: Option<PathBuf>) -> trackly::error::Result<FileStorage> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    FileStorage::new(dir)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    today: NaiveDate,
    command: Command,
) -> io::Result<ExitCode> {
    match command {
        Command::Overview => cmd_overview(session, today),
        Command::Sheets => cmd_sheets(session),
        Command::Sheet(action) => cmd_sheet(session, action),
        Command::Income(action) => cmd_income(session, action),
        Command::Savings(action) => cmd_savings(session, action),
        Command::Debt(action) => cmd_debt(session, action),
        Command::Bill(action) => cmd_bill(session, action),
        Command::Expense(action) => cmd_expense(session, today, action),
        Command::Category(action) => cmd_category(session, action),
        Command::Period { start, end } => with_store(session, |store| {
            let outcome = store.update_period(day_key(start), day_key(end));
            report("set", "period", &format!("{start} to {end}"), outcome)
        }),
        Command::Share(action) => cmd_share(session, today, action),
        Command::Theme { theme } => with_store(session, |store| {
            let name = match theme {
                ThemeArg::Light => "light",
                ThemeArg::Dark => "dark",
            };
            report("set", "theme", name, store.set_theme(theme.into()))
        }),
        Command::Language { code } => with_store(session, |store| {
            let outcome = store.set_language(&code);
            report("set", "language", code.trim(), outcome)
        }),
    }
}

/// Runs `op` on the signed-in user's store, printing an error if nobody
/// is signed in.
fn with_store<S, F>(session: &mut Session<S>, op: F) -> io::Result<ExitCode>
where
    S: BlockingStorage + 'static,
    F: FnOnce(&mut SheetStore) -> io::Result<ExitCode>,
{
    match session.store_mut() {
        Ok(store) => op(store),
        Err(err) => {
            writeln!(io::stderr().lock(), "{} {err}", "error:".red().bold())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Runs `op` on the current sheet, printing an error if there is none.
fn with_sheet<F>(store: &SheetStore, op: F) -> io::Result<ExitCode>
where
    F: FnOnce(&Sheet) -> io::Result<()>,
{
    if let Some(sheet) = store.current_sheet() {
        op(sheet)?;
        Ok(ExitCode::SUCCESS)
    } else {
        writeln!(
            io::stderr().lock(),
            "{} no current sheet",
            "error:".red().bold()
        )?;
        Ok(ExitCode::FAILURE)
    }
}

/// Prints what a mutation did and maps it to an exit code.
fn report(verb: &str, label: &str, target: &str, outcome: Outcome) -> io::Result<ExitCode> {
    match outcome {
        Outcome::Applied => {
            writeln!(
                io::stdout().lock(),
                "{} {label} {}",
                format_args!("{verb}:").green().bold(),
                target.dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Orphaned => {
            writeln!(
                io::stdout().lock(),
                "{} {label} {}",
                format_args!("{verb}:").green().bold(),
                target.dimmed()
            )?;
            writeln!(
                io::stderr().lock(),
                "{} no category has this name, category totals are unchanged",
                "warning:".yellow().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Outcome::NotFound => {
            writeln!(
                io::stderr().lock(),
                "{} {label} not found: {target}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
        Outcome::Ignored => {
            writeln!(
                io::stdout().lock(),
                "{}",
                format_args!("{label} {target} left unchanged").dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Reports the result of an `add_*` mutation.
fn report_added<Id: core::fmt::Display>(label: &str, added: &Added<Id>) -> io::Result<ExitCode> {
    report("added", label, &added.id.to_string(), added.outcome)
}

/// Executes the `overview` subcommand: refreshes today's allowance and
/// prints the current sheet.
fn cmd_overview<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    today: NaiveDate,
) -> io::Result<ExitCode> {
    with_store(session, |store| {
        let allowance = store.refresh_allowance(today);
        with_sheet(store, |sheet| print_sheet_summary(sheet, allowance.as_ref()))
    })
}

/// Executes the `sheets` subcommand: lists all sheets.
fn cmd_sheets<S: BlockingStorage + 'static>(session: &mut Session<S>) -> io::Result<ExitCode> {
    with_store(session, |store| {
        let state = store.state();
        let rows = state
            .sheets
            .iter()
            .map(|sheet| {
                let marker = if sheet.id == state.current_sheet_id {
                    "*"
                } else {
                    ""
                };
                vec![
                    marker.to_owned(),
                    sheet.id.to_string(),
                    sheet.name.clone(),
                    format!(
                        "{} to {}",
                        sheet.period_settings.start_date, sheet.period_settings.end_date
                    ),
                    format_money(totals::remaining_amount(sheet), CURRENCY),
                ]
            })
            .collect();
        print_table("Sheets", &["", "Id", "Name", "Period", "Remaining"], rows)?;
        Ok(ExitCode::SUCCESS)
    })
}

/// Executes the `sheet` subcommands.
fn cmd_sheet<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    command: SheetCommand,
) -> io::Result<ExitCode> {
    with_store(session, |store| match command {
        SheetCommand::Add { name } => report_added("sheet", &store.add_sheet(name.as_deref())),
        SheetCommand::Rename { id, name } => {
            let outcome = store.rename_sheet(&SheetId::from(id.as_str()), &name);
            report("renamed", "sheet", &id, outcome)
        }
        SheetCommand::Remove { id } => {
            let outcome = store.remove_sheet(&SheetId::from(id.as_str()));
            report("removed", "sheet", &id, outcome)
        }
        SheetCommand::Use { id } => {
            let outcome = store.set_current_sheet(&SheetId::from(id.as_str()));
            report("switched to", "sheet", &id, outcome)
        }
    })
}

/// Executes the `income` subcommands.
fn cmd_income<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    command: PlainItemCommand,
) -> io::Result<ExitCode> {
    with_store(session, |store| match command {
        PlainItemCommand::List => with_sheet(store, |sheet| print_items("Income", &sheet.income)),
        PlainItemCommand::Add(entry) => report_added(
            "income",
            &store.add_income(NewIncome {
                description: entry.description,
                amount: entry.amount,
            }),
        ),
        PlainItemCommand::Rm { id } => {
            let outcome = store.remove_income(&ItemId::from(id.as_str()));
            report("removed", "income", &id, outcome)
        }
        PlainItemCommand::Edit { id, changes } => {
            let patch = IncomePatch {
                description: changes.description,
                amount: changes.amount,
            };
            let outcome = store.update_income(&ItemId::from(id.as_str()), patch);
            report("updated", "income", &id, outcome)
        }
    })
}

/// Executes the `savings` subcommands.
fn cmd_savings<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    command: PlainItemCommand,
) -> io::Result<ExitCode> {
    with_store(session, |store| match command {
        PlainItemCommand::List => with_sheet(store, |sheet| print_items("Savings", &sheet.savings)),
        PlainItemCommand::Add(entry) => report_added(
            "savings",
            &store.add_savings(NewSavings {
                description: entry.description,
                amount: entry.amount,
            }),
        ),
        PlainItemCommand::Rm { id } => {
            let outcome = store.remove_savings(&ItemId::from(id.as_str()));
            report("removed", "savings", &id, outcome)
        }
        PlainItemCommand::Edit { id, changes } => {
            let patch = SavingsPatch {
                description: changes.description,
                amount: changes.amount,
            };
            let outcome = store.update_savings(&ItemId::from(id.as_str()), patch);
            report("updated", "savings", &id, outcome)
        }
    })
}

/// Executes the `debt` subcommands.
fn cmd_debt<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    command: DatedItemCommand,
) -> io::Result<ExitCode> {
    with_store(session, |store| match command {
        DatedItemCommand::List => with_sheet(store, |sheet| print_items("Debts", &sheet.debts)),
        DatedItemCommand::Add { entry, due } => report_added(
            "debt",
            &store.add_debt(NewDebt {
                description: entry.description,
                amount: entry.amount,
                date: due.map(day_key).unwrap_or_default(),
            }),
        ),
        DatedItemCommand::Rm { id } => {
            let outcome = store.remove_debt(&ItemId::from(id.as_str()));
            report("removed", "debt", &id, outcome)
        }
        DatedItemCommand::Edit { id, changes, due } => {
            let patch = DebtPatch {
                description: changes.description,
                amount: changes.amount,
                date: due.map(day_key),
            };
            let outcome = store.update_debt(&ItemId::from(id.as_str()), patch);
            report("updated", "debt", &id, outcome)
        }
    })
}

/// Executes the `bill` subcommands.
fn cmd_bill<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    command: DatedItemCommand,
) -> io::Result<ExitCode> {
    with_store(session, |store| match command {
        DatedItemCommand::List => with_sheet(store, |sheet| print_items("Bills", &sheet.bills)),
        DatedItemCommand::Add { entry, due } => report_added(
            "bill",
            &store.add_bill(NewBill {
                description: entry.description,
                amount: entry.amount,
                date: due.map(day_key).unwrap_or_default(),
            }),
        ),
        DatedItemCommand::Rm { id } => {
            let outcome = store.remove_bill(&ItemId::from(id.as_str()));
            report("removed", "bill", &id, outcome)
        }
        DatedItemCommand::Edit { id, changes, due } => {
            let patch = BillPatch {
                description: changes.description,
                amount: changes.amount,
                date: due.map(day_key),
            };
            let outcome = store.update_bill(&ItemId::from(id.as_str()), patch);
            report("updated", "bill", &id, outcome)
        }
    })
}

/// Executes the `expense` subcommands.
fn cmd_expense<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    today: NaiveDate,
    command: ExpenseCommand,
) -> io::Result<ExitCode> {
    with_store(session, |store| match command {
        ExpenseCommand::List => with_sheet(store, |sheet| print_items("Expenses", &sheet.expenses)),
        ExpenseCommand::Add {
            entry,
            category,
            date,
        } => report_added(
            "expense",
            &store.add_expense(NewExpense {
                date: day_key(date.unwrap_or(today)),
                description: entry.description,
                category,
                amount: entry.amount,
            }),
        ),
        ExpenseCommand::Rm { id } => {
            let outcome = store.remove_expense(&ItemId::from(id.as_str()));
            report("removed", "expense", &id, outcome)
        }
        ExpenseCommand::Edit {
            id,
            changes,
            category,
            date,
        } => {
            let patch = ExpensePatch {
                date: date.map(day_key),
                description: changes.description,
                category,
                amount: changes.amount,
            };
            let outcome = store.update_expense(&ItemId::from(id.as_str()), patch);
            report("updated", "expense", &id, outcome)
        }
    })
}

/// Executes the `category` subcommands.
fn cmd_category<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    command: CategoryCommand,
) -> io::Result<ExitCode> {
    with_store(session, |store| match command {
        CategoryCommand::List => {
            with_sheet(store, |sheet| print_items("Categories", &sheet.categories))
        }
        CategoryCommand::Add { name } => report_added("category", &store.add_category(&name)),
        CategoryCommand::Rm { id } => {
            let outcome = store.remove_category(&CategoryId::from(id.as_str()));
            report("removed", "category", &id, outcome)
        }
        CategoryCommand::Rename { id, name } => {
            let outcome = store.update_category(&CategoryId::from(id.as_str()), &name);
            report("renamed", "category", &id, outcome)
        }
    })
}

/// Executes the `share` subcommands.
fn cmd_share<S: BlockingStorage + 'static>(
    session: &mut Session<S>,
    today: NaiveDate,
    command: ShareCommand,
) -> io::Result<ExitCode> {
    match command {
        ShareCommand::Enable { visibility, invite } => with_store(session, |store| {
            if visibility != VisibilityArg::Invited && !invite.is_empty() {
                writeln!(
                    io::stderr().lock(),
                    "{} invited emails only apply to --visibility invited",
                    "warning:".yellow().bold()
                )?;
            }
            let outcome = store.enable_share(visibility.into(), &invite);
            let share = store
                .share_settings()
                .map_or_else(String::new, |settings| settings.id.to_string());
            report("shared", "sheet as", &share, outcome)
        }),
        ShareCommand::Disable => with_store(session, |store| {
            report("stopped", "sharing", "", store.disable_share())
        }),
        ShareCommand::Status => with_store(session, |store| {
            let mut out = io::stdout().lock();
            match store.share_settings() {
                Some(settings) => {
                    writeln!(out, "{} {}", "Share id:".bold(), settings.id)?;
                    let visibility = match settings.visibility {
                        ShareVisibility::Public => "public",
                        ShareVisibility::Restricted => "restricted",
                        ShareVisibility::Invited => "invited",
                    };
                    writeln!(out, "{} {visibility}", "Visibility:".bold())?;
                    if !settings.allowed_emails.is_empty() {
                        writeln!(
                            out,
                            "{} {}",
                            "Invited:".bold(),
                            settings.allowed_emails.join(", ")
                        )?;
                    }
                }
                None => writeln!(out, "{}", "Current sheet is not shared.".dimmed())?,
            }
            Ok(ExitCode::SUCCESS)
        }),
        ShareCommand::View { share_id } => match session.open_shared(&ShareId::from(share_id.as_str()))
        {
            Ok(Some(shared)) => {
                writeln!(
                    io::stdout().lock(),
                    "{} {}",
                    "Shared by".dimmed(),
                    shared.owner.bold()
                )?;
                let allowance = DailyAllowance::compute(&shared.sheet, today);
                print_sheet_summary(&shared.sheet, Some(&allowance))?;
                Ok(ExitCode::SUCCESS)
            }
            Ok(None) => {
                writeln!(
                    io::stderr().lock(),
                    "{} shared sheet not found: {share_id}",
                    "error:".red().bold()
                )?;
                Ok(ExitCode::FAILURE)
            }
            Err(err) => {
                writeln!(io::stderr().lock(), "{} {err}", "error:".red().bold())?;
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Something listed as one table row.
trait TableRow {
    /// Column headers.
    const HEADERS: &'static [&'static str];

    /// Cell texts, one per header.
    fn cells(&self) -> Vec<String>;
}

impl TableRow for IncomeItem {
    const HEADERS: &'static [&'static str] = &["Id", "Description", "Amount"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.description.clone(),
            format_money(self.amount, CURRENCY),
        ]
    }
}

impl TableRow for SavingsItem {
    const HEADERS: &'static [&'static str] = &["Id", "Description", "Amount"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.description.clone(),
            format_money(self.amount, CURRENCY),
        ]
    }
}

impl TableRow for DebtItem {
    const HEADERS: &'static [&'static str] = &["Id", "Description", "Amount", "Due"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.description.clone(),
            format_money(self.amount, CURRENCY),
            or_blank(&self.date),
        ]
    }
}

impl TableRow for BillItem {
    const HEADERS: &'static [&'static str] = &["Id", "Description", "Amount", "Due"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.description.clone(),
            format_money(self.amount, CURRENCY),
            or_blank(&self.date),
        ]
    }
}

impl TableRow for ExpenseItem {
    const HEADERS: &'static [&'static str] = &["Id", "Date", "Description", "Category", "Amount"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            or_blank(&self.date),
            self.description.clone(),
            or_blank(&self.category),
            format_money(self.amount, CURRENCY),
        ]
    }
}

impl TableRow for Category {
    const HEADERS: &'static [&'static str] = &["Id", "Name", "Spent"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            format_money(self.total, CURRENCY),
        ]
    }
}

/// Returns `text`, or a dash if it is empty.
fn or_blank(text: &str) -> String {
    if text.is_empty() {
        BLANK.to_owned()
    } else {
        text.to_owned()
    }
}

/// Prints a list of entries in a table.
fn print_items<T: TableRow>(title: &str, items: &[T]) -> io::Result<()> {
    print_table(title, T::HEADERS, items.iter().map(TableRow::cells).collect())
}

/// Prints rows under a titled table, or a placeholder if there are none.
fn print_table(title: &str, headers: &[&str], rows: Vec<Vec<String>>) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if rows.is_empty() {
        let subject = title.to_lowercase();
        writeln!(out, "{}", format_args!("No {subject} found.").dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(
        headers
            .iter()
            .map(|&header| Cell::new(header).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    let count = rows.len();
    for row in rows {
        _ = table.add_row(row);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({count})").dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints totals, allowance and category breakdown of a sheet.
fn print_sheet_summary(sheet: &Sheet, allowance: Option<&DailyAllowance>) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{} {}",
        sheet.name.green().bold(),
        format_args!(
            "({} to {})",
            sheet.period_settings.start_date, sheet.period_settings.end_date
        )
        .dimmed()
    )?;
    writeln!(out)?;

    let sums = SheetTotals::of(sheet);
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Total").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);
    for (name, amount) in [
        ("Income", sums.income),
        ("Savings", sums.savings),
        ("Expenses", sums.expenses),
        ("Debts", sums.debts),
        ("Bills", sums.bills),
    ] {
        _ = table.add_row(vec![Cell::new(name), Cell::new(format_money(amount, CURRENCY))]);
    }
    let remaining_color = if sums.remaining < 0.0_f64 {
        Color::Red
    } else {
        Color::Green
    };
    _ = table.add_row(vec![
        Cell::new("Remaining"),
        Cell::new(format_money(sums.remaining, CURRENCY)).fg(remaining_color),
    ]);
    writeln!(out, "{table}")?;

    if let Some(daily) = allowance {
        writeln!(out)?;
        let note = if daily.frozen { "(frozen for today)" } else { "" };
        writeln!(
            out,
            "{} {} {}",
            "Daily allowance:".bold(),
            format_money(daily.daily, CURRENCY).green(),
            note.dimmed()
        )?;
        writeln!(
            out,
            "{} {}",
            "From tomorrow:".bold(),
            format_money(daily.next_day, CURRENCY)
        )?;
        writeln!(
            out,
            "{} {}",
            "Days in period:".bold(),
            daily.days_remaining
        )?;
    }

    writeln!(out)?;
    let breakdown = totals::category_breakdown(sheet);
    if breakdown.is_empty() {
        writeln!(out, "{}", "No spending recorded yet.".dimmed())?;
        return Ok(());
    }
    let mut categories = Table::new();
    _ = categories.load_preset(UTF8_FULL);
    _ = categories.set_header(vec![
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Spent").fg(Color::Cyan),
        Cell::new("Share").fg(Color::Cyan),
    ]);
    for slice in &breakdown {
        _ = categories.add_row(vec![
            Cell::new(&slice.name),
            Cell::new(format_money(slice.total, CURRENCY)),
            Cell::new(format!("{:.1}%", slice.percent)),
        ]);
    }
    writeln!(out, "{}", "Spending by category".green().bold())?;
    writeln!(out, "{categories}")?;
    Ok(())
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Last-resort error output; if stderr itself failed, nothing
            // we can do.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory as _;
    use trackly::storage::InMemoryStorage;

    /// Fixed calendar day used by every test.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 10).unwrap()
    }

    /// Session signed in as the local user over in-memory storage.
    fn signed_in() -> Session<InMemoryStorage> {
        let mut session = Session::new(Arc::new(InMemoryStorage::new()));
        let _origin = session.sign_in(Identity::local()).unwrap();
        session
    }

    /// Amount and description of a new entry.
    fn entry(amount: f64, description: &str) -> EntryArgs {
        EntryArgs {
            amount,
            description: description.to_owned(),
        }
    }

    // ── argument parsing ──────────────────────────────────────────────

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_date_valid() {
        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn parse_date_invalid() {
        assert!(parse_date("not-a-date").is_err());
        assert!(parse_date("01-15-2024").is_err());
    }

    #[test]
    fn parse_amount_is_lenient() {
        assert!((parse_amount("$1,250").unwrap() - 1_250.0).abs() < f64::EPSILON);
        assert!((parse_amount(" 82000 ").unwrap() - 82_000.0).abs() < f64::EPSILON);
        assert!(parse_amount("abc").unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn parses_expense_add() {
        let cli = Cli::try_parse_from([
            "trackly",
            "--user",
            "alice",
            "expense",
            "add",
            "--amount",
            "82,000",
            "--category",
            "Food & Dining",
        ])
        .unwrap();
        assert_eq!(cli.user, "alice");
        assert!(matches!(
            cli.command,
            Command::Expense(ExpenseCommand::Add {
                entry: EntryArgs { amount, .. },
                category,
                date: None,
            }) if category == "Food & Dining" && (amount - 82_000.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn parses_share_enable_with_invites() {
        let cli = Cli::try_parse_from([
            "trackly",
            "share",
            "enable",
            "--visibility",
            "invited",
            "--invite",
            "a@example.com",
            "--invite",
            "b@example.com",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Share(ShareCommand::Enable {
                visibility: VisibilityArg::Invited,
                invite,
            }) if invite.len() == 2
        ));
    }

    #[test]
    fn period_requires_both_dates() {
        assert!(Cli::try_parse_from(["trackly", "period", "2025-11-01"]).is_err());
    }

    // ── create_storage tests ──────────────────────────────────────────

    #[test]
    fn create_storage_with_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = create_storage(Some(dir.path().to_path_buf()));
        assert!(storage.is_ok());
    }

    #[test]
    fn identity_keeps_email() {
        let who = identity("alice", Some("Alice@Example.com"));
        assert_eq!(who.key, UserKey::from("alice"));
        assert_eq!(who.email.as_deref(), Some("alice@example.com"));
        assert!(identity("bob", None).email.is_none());
    }

    // ── dispatch tests ────────────────────────────────────────────────

    #[test]
    fn signed_out_session_fails() {
        let mut session = Session::new(Arc::new(InMemoryStorage::new()));
        let code = dispatch(&mut session, today(), Command::Overview).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn income_add_updates_totals() {
        let mut session = signed_in();
        let code = dispatch(
            &mut session,
            today(),
            Command::Income(PlainItemCommand::Add(entry(1_000.0, "Salary"))),
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let store = session.store().unwrap();
        assert!((store.total_income() - 1_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn expense_add_defaults_to_today() {
        let mut session = signed_in();
        let code = dispatch(
            &mut session,
            today(),
            Command::Expense(ExpenseCommand::Add {
                entry: entry(50_000.0, "Lunch"),
                category: "Food & Dining".to_owned(),
                date: None,
            }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let sheet = session.store().unwrap().current_sheet().unwrap().clone();
        assert_eq!(sheet.expenses[0].date, "2025-11-10");
        let food = sheet
            .categories
            .iter()
            .find(|category| category.name == "Food & Dining")
            .unwrap();
        assert!((food.total - 50_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn orphaned_expense_is_kept() {
        let mut session = signed_in();
        let code = dispatch(
            &mut session,
            today(),
            Command::Expense(ExpenseCommand::Add {
                entry: entry(500.0, ""),
                category: "Nonexistent".to_owned(),
                date: None,
            }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let store = session.store().unwrap();
        assert_eq!(store.current_sheet().unwrap().expenses.len(), 1);
        assert!(store.category_breakdown().is_empty());
    }

    #[test]
    fn removing_unknown_item_fails() {
        let mut session = signed_in();
        let code = dispatch(
            &mut session,
            today(),
            Command::Expense(ExpenseCommand::Rm {
                id: "missing".to_owned(),
            }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn last_sheet_is_kept() {
        let mut session = signed_in();
        let id = session.store().unwrap().state().current_sheet_id.to_string();
        let code = dispatch(
            &mut session,
            today(),
            Command::Sheet(SheetCommand::Remove { id }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(session.store().unwrap().state().sheets.len(), 1);
    }

    #[test]
    fn overview_freezes_todays_allowance() {
        let mut session = signed_in();
        let _code = dispatch(
            &mut session,
            today(),
            Command::Income(PlainItemCommand::Add(entry(300_000.0, "Salary"))),
        )
        .unwrap();
        let code = dispatch(&mut session, today(), Command::Overview).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let sheet = session.store().unwrap().current_sheet().unwrap().clone();
        let snapshot = sheet.allowance_snapshot.unwrap();
        assert_eq!(snapshot.date, "2025-11-10");
    }

    #[test]
    fn period_and_settings_are_applied() {
        let mut session = signed_in();
        let start = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let _code = dispatch(&mut session, today(), Command::Period { start, end }).unwrap();
        let _code = dispatch(
            &mut session,
            today(),
            Command::Theme {
                theme: ThemeArg::Dark,
            },
        )
        .unwrap();
        let state = session.store().unwrap().state();
        let sheet = state.current_sheet().unwrap();
        assert_eq!(sheet.period_settings.start_date, "2025-12-01");
        assert_eq!(sheet.period_settings.end_date, "2025-12-31");
        assert_eq!(state.ui_settings.theme, Theme::Dark);
    }

    #[test]
    fn shared_sheet_can_be_viewed() {
        let mut session = signed_in();
        let code = dispatch(
            &mut session,
            today(),
            Command::Share(ShareCommand::Enable {
                visibility: VisibilityArg::Public,
                invite: Vec::new(),
            }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let share_id = session
            .store()
            .unwrap()
            .share_settings()
            .unwrap()
            .id
            .to_string();
        let code = dispatch(
            &mut session,
            today(),
            Command::Share(ShareCommand::View { share_id }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn unknown_share_fails() {
        let mut session = signed_in();
        let code = dispatch(
            &mut session,
            today(),
            Command::Share(ShareCommand::View {
                share_id: "nope".to_owned(),
            }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }
}
