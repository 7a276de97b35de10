//! `bizdesk` command-line front end.
//!
//! Every command opens the configured database, runs one service call and
//! prints the result as JSON on stdout. Failures go to stderr as a single
//! line and exit with status 1.

use bizdesk_core::config::AppConfig;
use bizdesk_core::db::{migrations, open_db};
use bizdesk_core::model::asset::{Asset, AssetStatus, ReturnCondition};
use bizdesk_core::model::gamification::LeaderboardPeriod;
use bizdesk_core::model::license::SoftwareLicense;
use bizdesk_core::model::payroll::{PayComponents, PayrollStatus};
use bizdesk_core::model::workspace::EmployeeStatus;
use bizdesk_core::repo::asset_repo::{AssetListQuery, SqliteAssetRepository};
use bizdesk_core::repo::gamification_repo::SqliteGamificationRepository;
use bizdesk_core::repo::license_repo::{LicenseListQuery, SqliteLicenseRepository};
use bizdesk_core::repo::payroll_repo::{PayrollListQuery, SqlitePayrollRepository};
use bizdesk_core::repo::vault_repo::{EntryListQuery, SqliteVaultRepository};
use bizdesk_core::repo::workspace_repo::{EmployeeListQuery, SqliteWorkspaceRepository};
use bizdesk_core::service::vault_service::EntryInput;
use bizdesk_core::service::workspace_service::NewEmployee;
use bizdesk_core::{
    init_from_config, AccessContext, AssetService, GamificationService, LicenseService,
    PayrollService, VaultService, WorkspaceService,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "bizdesk", version)]
#[command(about = "Workspace back office: people, assets, licenses, payroll and vaults")]
struct Cli {
    /// TOML config file; a missing file means defaults
    #[arg(long, env = "BIZDESK_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or migrate the database
    Init,
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    #[command(subcommand)]
    Employee(EmployeeCommand),
    #[command(subcommand)]
    Asset(AssetCommand),
    #[command(subcommand)]
    License(LicenseCommand),
    #[command(subcommand)]
    Payroll(PayrollCommand),
    #[command(subcommand)]
    Leaderboard(LeaderboardCommand),
    #[command(subcommand)]
    Vault(VaultCommand),
    /// Generate a random password
    Gen {
        #[arg(long, default_value_t = 20)]
        length: usize,
        #[arg(long)]
        no_symbols: bool,
    },
}

#[derive(Args, Debug)]
struct Scope {
    /// Workspace id
    #[arg(long, short = 'w')]
    workspace: Uuid,
}

#[derive(Subcommand, Debug)]
enum WorkspaceCommand {
    /// Register a user account
    RegisterUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    Create {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        name: String,
    },
    List {
        #[arg(long)]
        owner: Option<Uuid>,
    },
}

#[derive(Subcommand, Debug)]
enum EmployeeCommand {
    Add {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Generated when omitted
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        hire_date: Option<NaiveDate>,
    },
    List {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, value_enum)]
        status: Option<CliEmployeeStatus>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    Deactivate {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        employee: Uuid,
    },
}

#[derive(Subcommand, Debug)]
enum AssetCommand {
    Add {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        name: String,
        #[arg(long)]
        tag: String,
        #[arg(long)]
        serial: Option<String>,
        /// Purchase cost in minor units
        #[arg(long, default_value_t = 0)]
        cost: i64,
        #[arg(long)]
        purchased: Option<NaiveDate>,
        #[arg(long)]
        warranty_expiry: Option<NaiveDate>,
    },
    List {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, value_enum)]
        status: Option<CliAssetStatus>,
        #[arg(long)]
        search: Option<String>,
    },
    Assign {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        asset: Uuid,
        #[arg(long)]
        employee: Uuid,
        /// Defaults to today
        #[arg(long)]
        on: Option<NaiveDate>,
        #[arg(long)]
        expected_return: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    Return {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        asset: Uuid,
        #[arg(long, value_enum, default_value = "good")]
        condition: CliReturnCondition,
        #[arg(long)]
        on: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Warranties expired or inside the warning window
    Warranties {
        #[command(flatten)]
        scope: Scope,
    },
    Summary {
        #[command(flatten)]
        scope: Scope,
    },
}

#[derive(Subcommand, Debug)]
enum LicenseCommand {
    Add {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        name: String,
        #[arg(long)]
        seats: u32,
        #[arg(long)]
        vendor: Option<String>,
        /// Cost per seat in minor units
        #[arg(long, default_value_t = 0)]
        cost: i64,
        #[arg(long)]
        expires: Option<NaiveDate>,
    },
    List {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        free_only: bool,
    },
    Assign {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        license: Uuid,
        #[arg(long)]
        employee: Uuid,
        #[arg(long)]
        on: Option<NaiveDate>,
    },
    Revoke {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        license: Uuid,
        #[arg(long)]
        employee: Uuid,
        #[arg(long)]
        on: Option<NaiveDate>,
    },
    Utilization {
        #[command(flatten)]
        scope: Scope,
    },
}

#[derive(Args, Debug)]
struct PayArgs {
    /// Base salary in minor units
    #[arg(long)]
    base: i64,
    #[arg(long, default_value_t = 0)]
    allowances: i64,
    #[arg(long, default_value_t = 0)]
    overtime: i64,
    #[arg(long, default_value_t = 0)]
    bonus: i64,
    #[arg(long, default_value_t = 0)]
    deductions: i64,
    #[arg(long, default_value_t = 0)]
    tax: i64,
}

impl From<PayArgs> for PayComponents {
    fn from(args: PayArgs) -> Self {
        Self {
            base_salary: args.base,
            allowances: args.allowances,
            overtime: args.overtime,
            bonus: args.bonus,
            deductions: args.deductions,
            tax: args.tax,
        }
    }
}

#[derive(Subcommand, Debug)]
enum PayrollCommand {
    Create {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        employee: Uuid,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[command(flatten)]
        pay: PayArgs,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        employee: Option<Uuid>,
        #[arg(long, value_enum)]
        status: Option<CliPayrollStatus>,
    },
    Process {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        id: Uuid,
    },
    Pay {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        on: Option<NaiveDate>,
    },
    Cancel {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        id: Uuid,
    },
    Totals {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

#[derive(Args, Debug)]
struct BoardArgs {
    #[command(flatten)]
    scope: Scope,
    #[arg(long, value_enum, default_value = "monthly")]
    period: CliPeriod,
    /// Any date inside the period; defaults to today
    #[arg(long)]
    anchor: Option<NaiveDate>,
    /// Achievement category; defaults to the configured one
    #[arg(long)]
    category: Option<String>,
}

#[derive(Subcommand, Debug)]
enum LeaderboardCommand {
    /// Re-rank and store one period
    Recompute {
        #[command(flatten)]
        board: BoardArgs,
    },
    Show {
        #[command(flatten)]
        board: BoardArgs,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Args, Debug)]
struct VaultAccess {
    #[command(flatten)]
    scope: Scope,
    #[arg(long)]
    vault: Uuid,
    /// Acting user, recorded in the access log
    #[arg(long)]
    user: Uuid,
    #[arg(long, env = "BIZDESK_MASTER_PASSWORD", hide_env_values = true)]
    master_password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
    Create {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Omit to protect the vault with the application secret
        #[arg(long, env = "BIZDESK_MASTER_PASSWORD", hide_env_values = true)]
        master_password: Option<String>,
    },
    List {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        owner: Option<Uuid>,
    },
    AddEntry {
        #[command(flatten)]
        access: VaultAccess,
        #[arg(long)]
        title: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, env = "BIZDESK_ENTRY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Entries {
        #[command(flatten)]
        access: VaultAccess,
        #[arg(long)]
        search: Option<String>,
    },
    Reveal {
        #[command(flatten)]
        access: VaultAccess,
        #[arg(long)]
        entry: Uuid,
    },
    Log {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        vault: Uuid,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEmployeeStatus {
    Active,
    OnLeave,
    Terminated,
}

impl From<CliEmployeeStatus> for EmployeeStatus {
    fn from(value: CliEmployeeStatus) -> Self {
        match value {
            CliEmployeeStatus::Active => Self::Active,
            CliEmployeeStatus::OnLeave => Self::OnLeave,
            CliEmployeeStatus::Terminated => Self::Terminated,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAssetStatus {
    Available,
    Assigned,
    Maintenance,
    Retired,
    Lost,
}

impl From<CliAssetStatus> for AssetStatus {
    fn from(value: CliAssetStatus) -> Self {
        match value {
            CliAssetStatus::Available => Self::Available,
            CliAssetStatus::Assigned => Self::Assigned,
            CliAssetStatus::Maintenance => Self::Maintenance,
            CliAssetStatus::Retired => Self::Retired,
            CliAssetStatus::Lost => Self::Lost,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliReturnCondition {
    Good,
    Fair,
    Damaged,
}

impl From<CliReturnCondition> for ReturnCondition {
    fn from(value: CliReturnCondition) -> Self {
        match value {
            CliReturnCondition::Good => Self::Good,
            CliReturnCondition::Fair => Self::Fair,
            CliReturnCondition::Damaged => Self::Damaged,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPayrollStatus {
    Draft,
    Processed,
    Paid,
    Cancelled,
}

impl From<CliPayrollStatus> for PayrollStatus {
    fn from(value: CliPayrollStatus) -> Self {
        match value {
            CliPayrollStatus::Draft => Self::Draft,
            CliPayrollStatus::Processed => Self::Processed,
            CliPayrollStatus::Paid => Self::Paid,
            CliPayrollStatus::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    AllTime,
}

impl From<CliPeriod> for LeaderboardPeriod {
    fn from(value: CliPeriod) -> Self {
        match value {
            CliPeriod::Daily => Self::Daily,
            CliPeriod::Weekly => Self::Weekly,
            CliPeriod::Monthly => Self::Monthly,
            CliPeriod::Yearly => Self::Yearly,
            CliPeriod::AllTime => Self::AllTime,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_or_default(path)?,
        None => AppConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    init_from_config(&config.logging)?;

    let conn = open_db(&config.database.path)?;
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        config.database.path.display()
    );

    match cli.command {
        Command::Init => print_json(&json!({
            "database": config.database.path,
            "version": bizdesk_core::core_version(),
            "schema_version": migrations::current_user_version(&conn)?,
        })),
        Command::Workspace(command) => workspace(&conn, command),
        Command::Employee(command) => employee(&conn, command),
        Command::Asset(command) => asset(&conn, &config, command),
        Command::License(command) => license(&conn, &config, command),
        Command::Payroll(command) => payroll(&conn, command),
        Command::Leaderboard(command) => leaderboard(&conn, &config, command),
        Command::Vault(command) => vault(&conn, &config, command),
        Command::Gen { length, no_symbols } => {
            let service = VaultService::new(SqliteVaultRepository::try_new(&conn)?, &config.vault);
            print_json(&service.generate_password(length, !no_symbols)?)
        }
    }
}

fn workspace(conn: &Connection, command: WorkspaceCommand) -> CliResult<()> {
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(conn)?);
    match command {
        WorkspaceCommand::RegisterUser { name, email } => {
            print_json(&service.register_user(name, email)?)
        }
        WorkspaceCommand::Create { owner, name } => {
            print_json(&service.create_workspace(owner, name)?)
        }
        WorkspaceCommand::List { owner } => print_json(&service.list_workspaces(owner)?),
    }
}

fn employee(conn: &Connection, command: EmployeeCommand) -> CliResult<()> {
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(conn)?);
    match command {
        EmployeeCommand::Add {
            scope,
            first_name,
            last_name,
            code,
            email,
            position,
            department,
            hire_date,
        } => {
            let input = NewEmployee {
                employee_code: code,
                first_name,
                last_name,
                email,
                position,
                department,
                hire_date,
                user_id: None,
            };
            print_json(&service.add_employee(scope.workspace, input)?)
        }
        EmployeeCommand::List {
            scope,
            status,
            department,
            search,
        } => {
            let query = EmployeeListQuery {
                status: status.map(Into::into),
                department,
                search,
            };
            print_json(&service.list_employees(scope.workspace, &query)?)
        }
        EmployeeCommand::Deactivate { scope, employee } => {
            print_json(&service.deactivate_employee(scope.workspace, employee)?)
        }
    }
}

fn asset(conn: &Connection, config: &AppConfig, command: AssetCommand) -> CliResult<()> {
    let service = AssetService::new(SqliteAssetRepository::try_new(conn)?)
        .with_warning_days(config.alerts.warranty_warning_days);
    match command {
        AssetCommand::Add {
            scope,
            name,
            tag,
            serial,
            cost,
            purchased,
            warranty_expiry,
        } => {
            let mut asset = Asset::new(scope.workspace, name, tag);
            asset.serial_number = serial;
            asset.purchase_cost = cost;
            asset.purchase_date = purchased;
            asset.warranty_expiry = warranty_expiry;
            print_json(&service.create_asset(asset)?)
        }
        AssetCommand::List {
            scope,
            status,
            search,
        } => {
            let query = AssetListQuery {
                status: status.map(Into::into),
                search,
                ..AssetListQuery::default()
            };
            print_json(&service.list_assets(scope.workspace, &query)?)
        }
        AssetCommand::Assign {
            scope,
            asset,
            employee,
            on,
            expected_return,
            notes,
        } => print_json(&service.assign_asset(
            scope.workspace,
            asset,
            employee,
            on.unwrap_or_else(today),
            expected_return,
            notes,
        )?),
        AssetCommand::Return {
            scope,
            asset,
            condition,
            on,
            notes,
        } => print_json(&service.return_asset(
            scope.workspace,
            asset,
            on.unwrap_or_else(today),
            condition.into(),
            notes,
        )?),
        AssetCommand::Warranties { scope } => {
            print_json(&service.expiring_warranties(scope.workspace, today())?)
        }
        AssetCommand::Summary { scope } => {
            print_json(&service.inventory_summary(scope.workspace)?)
        }
    }
}

fn license(conn: &Connection, config: &AppConfig, command: LicenseCommand) -> CliResult<()> {
    let service = LicenseService::new(SqliteLicenseRepository::try_new(conn)?)
        .with_warning_days(config.alerts.license_warning_days);
    match command {
        LicenseCommand::Add {
            scope,
            name,
            seats,
            vendor,
            cost,
            expires,
        } => {
            let mut license = SoftwareLicense::new(scope.workspace, name, seats);
            license.vendor = vendor;
            license.cost_per_license = cost;
            license.expiry_date = expires;
            print_json(&service.create_license(license)?)
        }
        LicenseCommand::List {
            scope,
            search,
            free_only,
        } => {
            let query = LicenseListQuery {
                search,
                with_free_seats: free_only,
            };
            print_json(&service.list_licenses(scope.workspace, &query)?)
        }
        LicenseCommand::Assign {
            scope,
            license,
            employee,
            on,
        } => print_json(&service.assign_license(
            scope.workspace,
            license,
            employee,
            on.unwrap_or_else(today),
        )?),
        LicenseCommand::Revoke {
            scope,
            license,
            employee,
            on,
        } => print_json(&service.revoke_license(
            scope.workspace,
            license,
            employee,
            on.unwrap_or_else(today),
        )?),
        LicenseCommand::Utilization { scope } => {
            print_json(&service.utilization_summary(scope.workspace)?)
        }
    }
}

fn payroll(conn: &Connection, command: PayrollCommand) -> CliResult<()> {
    let service = PayrollService::new(SqlitePayrollRepository::try_new(conn)?);
    match command {
        PayrollCommand::Create {
            scope,
            employee,
            start,
            end,
            pay,
            notes,
        } => print_json(&service.create_payroll(
            scope.workspace,
            employee,
            start,
            end,
            pay.into(),
            notes,
        )?),
        PayrollCommand::List {
            scope,
            employee,
            status,
        } => {
            let query = PayrollListQuery {
                employee_id: employee,
                status: status.map(Into::into),
                ..PayrollListQuery::default()
            };
            print_json(&service.list_payrolls(scope.workspace, &query)?)
        }
        PayrollCommand::Process { scope, id } => {
            print_json(&service.process(scope.workspace, id)?)
        }
        PayrollCommand::Pay { scope, id, on } => {
            print_json(&service.mark_paid(scope.workspace, id, on.unwrap_or_else(today))?)
        }
        PayrollCommand::Cancel { scope, id } => print_json(&service.cancel(scope.workspace, id)?),
        PayrollCommand::Totals { scope, from, to } => {
            print_json(&service.period_totals(scope.workspace, from, to)?)
        }
    }
}

fn leaderboard(conn: &Connection, config: &AppConfig, command: LeaderboardCommand) -> CliResult<()> {
    let service = GamificationService::new(SqliteGamificationRepository::try_new(conn)?);
    let resolve = |board: BoardArgs| {
        (
            board.scope.workspace,
            LeaderboardPeriod::from(board.period),
            board.anchor.unwrap_or_else(today),
            board
                .category
                .unwrap_or_else(|| config.gamification.default_category.clone()),
        )
    };
    match command {
        LeaderboardCommand::Recompute { board } => {
            let (workspace, period, anchor, category) = resolve(board);
            print_json(&service.recompute_leaderboard(workspace, period, anchor, &category)?)
        }
        LeaderboardCommand::Show { board, limit } => {
            let (workspace, period, anchor, category) = resolve(board);
            print_json(&service.leaderboard(workspace, period, anchor, &category, limit)?)
        }
    }
}

fn vault(conn: &Connection, config: &AppConfig, command: VaultCommand) -> CliResult<()> {
    let service = VaultService::new(SqliteVaultRepository::try_new(conn)?, &config.vault);
    match command {
        VaultCommand::Create {
            scope,
            owner,
            name,
            description,
            master_password,
        } => print_json(&service.create_vault(
            scope.workspace,
            owner,
            &name,
            description,
            master_password.as_deref(),
        )?),
        VaultCommand::List { scope, owner } => {
            print_json(&service.list_vaults(scope.workspace, owner)?)
        }
        VaultCommand::AddEntry {
            access,
            title,
            username,
            url,
            password,
        } => {
            let ctx = AccessContext::new(access.user);
            let handle = service.unlock(
                access.scope.workspace,
                access.vault,
                &ctx,
                access.master_password.as_deref(),
            )?;
            let input = EntryInput {
                title,
                username,
                url,
                password,
                ..EntryInput::default()
            };
            let entry = service.add_entry(&handle, input)?;
            service.lock(handle, &ctx)?;
            print_json(&entry)
        }
        VaultCommand::Entries { access, search } => {
            let ctx = AccessContext::new(access.user);
            let handle = service.unlock(
                access.scope.workspace,
                access.vault,
                &ctx,
                access.master_password.as_deref(),
            )?;
            let query = EntryListQuery {
                search,
                ..EntryListQuery::default()
            };
            let entries = service.list_entries(&handle, &query)?;
            service.lock(handle, &ctx)?;
            print_json(&entries)
        }
        VaultCommand::Reveal { access, entry } => {
            let ctx = AccessContext::new(access.user);
            let handle = service.unlock(
                access.scope.workspace,
                access.vault,
                &ctx,
                access.master_password.as_deref(),
            )?;
            let revealed = service.reveal_entry(&handle, &ctx, entry)?;
            service.lock(handle, &ctx)?;
            print_json(&revealed)
        }
        VaultCommand::Log {
            scope,
            vault,
            limit,
        } => print_json(&service.access_log(scope.workspace, vault, limit)?),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, PayrollCommand};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn payroll_create_parses_components() {
        let cli = Cli::try_parse_from([
            "bizdesk",
            "payroll",
            "create",
            "-w",
            "6f1c1a52-5f43-4c9a-9a51-6d1f2b0e8a11",
            "--employee",
            "0b0e9d63-2c1f-4d5e-8f41-1f3c9a7b6d22",
            "--start",
            "2025-01-01",
            "--end",
            "2025-01-31",
            "--base",
            "400000",
            "--tax",
            "50000",
        ])
        .unwrap();
        let Command::Payroll(PayrollCommand::Create { pay, .. }) = cli.command else {
            panic!("expected payroll create");
        };
        assert_eq!(pay.base, 400_000);
        assert_eq!(pay.tax, 50_000);
        assert_eq!(pay.bonus, 0);
    }
}
