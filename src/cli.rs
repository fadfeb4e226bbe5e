use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{BudgetPeriod, Currency, TxKind};
use crate::filter::{KindFilter, QuickRange};

#[derive(Debug, Parser)]
#[command(name = "moneyflow")]
#[command(about = "Personal ledger: income, expenses, savings goals and holdings", long_about = None)]
pub struct Cli {
    /// Override Moneyflow home directory (config/data subdirs will be created inside it).
    #[arg(long, env = "MONEYFLOW_HOME", global = true)]
    pub home: Option<std::path::PathBuf>,

    /// Skip the startup sync and all outbound notifications.
    #[arg(long, env = "MONEYFLOW_OFFLINE", global = true)]
    pub offline: bool,

    /// Presentation currency. Defaults to the configured one.
    #[arg(long, value_enum, global = true)]
    pub currency: Option<CurrencyArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Tx(TxArgs),
    Goal(GoalArgs),
    Metals(MetalsArgs),
    Crypto(CryptoArgs),
    Budget(BudgetArgs),

    /// Income, expense and net over the filtered transactions.
    Dashboard(FilterArgs),
    /// Expenses per category over the filtered transactions.
    Categories(FilterArgs),
    /// Cumulative balance per day over the filtered transactions.
    Series(FilterArgs),
    /// Valuation snapshots for a holding category.
    History {
        #[arg(value_enum)]
        which: HoldingArg,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CurrencyArg {
    Base,
    Eur,
    Usd,
}

impl From<CurrencyArg> for Currency {
    fn from(value: CurrencyArg) -> Self {
        match value {
            CurrencyArg::Base => Currency::Base,
            CurrencyArg::Eur => Currency::Eur,
            CurrencyArg::Usd => Currency::Usd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Income,
    Expense,
}

impl From<KindArg> for TxKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Income => TxKind::Income,
            KindArg::Expense => TxKind::Expense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindFilterArg {
    All,
    Income,
    Expense,
}

impl From<KindFilterArg> for KindFilter {
    fn from(value: KindFilterArg) -> Self {
        match value {
            KindFilterArg::All => KindFilter::All,
            KindFilterArg::Income => KindFilter::Income,
            KindFilterArg::Expense => KindFilter::Expense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    Custom,
    Day,
    Week,
    Month,
    Year,
}

impl From<RangeArg> for QuickRange {
    fn from(value: RangeArg) -> Self {
        match value {
            RangeArg::Custom => QuickRange::Custom,
            RangeArg::Day => QuickRange::Day,
            RangeArg::Week => QuickRange::Week,
            RangeArg::Month => QuickRange::Month,
            RangeArg::Year => QuickRange::Year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Weekly,
    Monthly,
}

impl From<PeriodArg> for BudgetPeriod {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Weekly => BudgetPeriod::Weekly,
            PeriodArg::Monthly => BudgetPeriod::Monthly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HoldingArg {
    Metals,
    Crypto,
}

#[derive(Debug, Args, Clone)]
pub struct FilterArgs {
    /// Lower bound, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,

    /// Upper bound, inclusive (YYYY-MM-DD). Also the reference date for --range.
    #[arg(long)]
    pub to: Option<String>,

    #[arg(long, value_enum, default_value = "all")]
    pub kind: KindFilterArg,

    /// Quick range ending at --to (or today). `custom` keeps --from/--to as given.
    #[arg(long, value_enum, default_value = "custom")]
    pub range: RangeArg,
}

#[derive(Debug, Args)]
pub struct TxArgs {
    #[command(subcommand)]
    pub cmd: TxCmd,
}

#[derive(Debug, Subcommand)]
pub enum TxCmd {
    /// Record an income or expense.
    Add {
        #[arg(value_enum)]
        kind: KindArg,
        amount: String,

        /// Currency the amount was entered in; stored converted to base.
        #[arg(long = "in", value_enum, default_value = "base")]
        entered_in: CurrencyArg,

        /// Defaults to today.
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long, short = 'm')]
        note: Option<String>,
    },
    /// List filtered transactions, newest first.
    List(FilterArgs),
    /// Delete a transaction by id.
    Delete { id: String },
    /// Delete the transaction at a 1-based ledger position (see `tx list`).
    DeleteAt { position: usize },
}

#[derive(Debug, Args)]
pub struct GoalArgs {
    #[command(subcommand)]
    pub cmd: GoalCmd,
}

#[derive(Debug, Subcommand)]
pub enum GoalCmd {
    Create {
        name: String,
        goal: String,
    },
    Deposit {
        name: String,
        amount: String,
    },
    /// Rename a goal and/or change its target.
    Update {
        name: String,

        #[arg(long = "name")]
        new_name: Option<String>,

        #[arg(long)]
        goal: Option<String>,
    },
    List,
}

#[derive(Debug, Args)]
pub struct MetalsArgs {
    #[command(subcommand)]
    pub cmd: MetalsCmd,
}

#[derive(Debug, Subcommand)]
pub enum MetalsCmd {
    /// Replace gold and silver holdings, in grams.
    Set { gold: String, silver: String },
    Show,
}

#[derive(Debug, Args)]
pub struct CryptoArgs {
    #[command(subcommand)]
    pub cmd: CryptoCmd,
}

#[derive(Debug, Subcommand)]
pub enum CryptoCmd {
    /// Insert or replace a holding (price is per unit, in base).
    Set {
        symbol: String,
        quantity: String,
        price: String,
    },
    List,
}

#[derive(Debug, Args)]
pub struct BudgetArgs {
    #[command(subcommand)]
    pub cmd: BudgetCmd,
}

#[derive(Debug, Subcommand)]
pub enum BudgetCmd {
    Set {
        #[arg(value_enum)]
        period: PeriodArg,
        limit: String,
    },
    Show,
}
