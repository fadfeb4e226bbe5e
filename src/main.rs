use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use moneyflow::cli::{
    BudgetCmd, Cli, Command, CryptoCmd, FilterArgs, GoalCmd, HoldingArg, MetalsCmd, TxCmd,
};
use moneyflow::config::{AppConfig, AppPaths, app_paths, load_or_init_config, now_local, today};
use moneyflow::currency::{Presenter, format_number};
use moneyflow::db::{SqliteKv, db_path};
use moneyflow::domain::BudgetPeriod;
use moneyflow::filter::{FilterState, QuickRange, filtered_transactions};
use moneyflow::history::{crypto_value, metals_value};
use moneyflow::report::{
    SeriesPoint, budget_status, category_breakdown, cumulative_balance_series, dashboard_totals,
    value_over_time,
};
use moneyflow::store::{Ledger, NewTransaction};
use moneyflow::sync::{EventSink, HttpEventSink, HttpSnapshotSource, NullSink};

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moneyflow=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = app_paths(cli.home.clone())?;
    let (cfg, cfg_path) = load_or_init_config(&paths)?;

    let presenter = Presenter::new(
        cli.currency.map(Into::into).unwrap_or(cfg.default_currency),
        cfg.rates,
        cfg.base_label.clone(),
    );

    if let Command::Config = cli.command {
        print_config(&cfg, &paths, &cfg_path);
        return Ok(());
    }

    let remote = if cli.offline {
        None
    } else {
        cfg.remote_url().map(str::to_string)
    };
    let mut ledger = open_ledger(&paths, &cfg, remote.as_deref())?;

    match cli.command {
        Command::Tx(args) => handle_tx(&mut ledger, &presenter, args.cmd),
        Command::Goal(args) => handle_goal(&mut ledger, &presenter, args.cmd),
        Command::Metals(args) => handle_metals(&mut ledger, &presenter, args.cmd),
        Command::Crypto(args) => handle_crypto(&mut ledger, &presenter, args.cmd),
        Command::Budget(args) => handle_budget(&mut ledger, &presenter, args.cmd),
        Command::Dashboard(args) => {
            let filter = build_filter(&args)?;
            let txs = filtered_transactions(ledger.state(), &filter);
            let totals = dashboard_totals(&txs);
            for (label, amount) in [
                ("income", totals.income),
                ("expense", totals.expense),
                ("balance", totals.net),
            ] {
                let f = presenter.format_triple(amount);
                println!("{label}\t{}\t{}", f.main, f.detail);
            }
            Ok(())
        }
        Command::Categories(args) => {
            let filter = build_filter(&args)?;
            let txs = filtered_transactions(ledger.state(), &filter);
            print_series(&category_breakdown(&txs, &presenter), &presenter);
            Ok(())
        }
        Command::Series(args) => {
            let filter = build_filter(&args)?;
            let txs = filtered_transactions(ledger.state(), &filter);
            print_series(&cumulative_balance_series(&txs, &presenter), &presenter);
            Ok(())
        }
        Command::History { which } => {
            let history = match which {
                HoldingArg::Metals => &ledger.state().metals_history,
                HoldingArg::Crypto => &ledger.state().crypto_history,
            };
            if history.is_empty() {
                println!("(no history)");
                return Ok(());
            }
            print_series(&value_over_time(history, &presenter), &presenter);
            Ok(())
        }
        Command::Config => Ok(()),
    }
}

/// Loads local state, then performs the one startup sync when a remote is set.
fn open_ledger(paths: &AppPaths, cfg: &AppConfig, remote: Option<&str>) -> Result<Ledger> {
    let kv = SqliteKv::open(paths)?;

    let sink: Box<dyn EventSink> = match remote {
        Some(url) => match HttpEventSink::new(url, cfg.sync_timeout()) {
            Ok(sink) => Box::new(sink),
            Err(err) => {
                warn!("remote sink disabled: {err:#}");
                Box::new(NullSink)
            }
        },
        None => Box::new(NullSink),
    };

    let mut ledger = Ledger::open(Box::new(kv), sink, cfg.rates);

    if let Some(url) = remote {
        match HttpSnapshotSource::new(url, cfg.sync_timeout()) {
            Ok(source) => {
                ledger.reconcile_with(&source)?;
            }
            Err(err) => warn!("startup sync skipped: {err:#}"),
        }
    }

    Ok(ledger)
}

fn handle_tx(ledger: &mut Ledger, presenter: &Presenter, cmd: TxCmd) -> Result<()> {
    match cmd {
        TxCmd::Add {
            kind,
            amount,
            entered_in,
            date,
            category,
            note,
        } => {
            let amount = parse_decimal(&amount, "amount")?;
            let date = match date.as_deref() {
                Some(raw) => parse_date(raw)?,
                None => today(),
            };
            let id = ledger.add_transaction(NewTransaction {
                kind: kind.into(),
                amount,
                currency: entered_in.into(),
                date,
                category: category.unwrap_or_default(),
                note: note.unwrap_or_default(),
            })?;
            println!("Recorded {} {id}", moneyflow::domain::TxKind::from(kind).label());
            Ok(())
        }
        TxCmd::List(args) => {
            let filter = build_filter(&args)?;
            let state = ledger.state();
            let mut rows: Vec<(usize, &moneyflow::domain::Transaction)> =
                filtered_transactions(state, &filter)
                    .into_iter()
                    .filter_map(|t| ledger.transaction_position(t.id).map(|i| (i + 1, t)))
                    .collect();
            if rows.is_empty() {
                println!("(no transactions)");
                return Ok(());
            }
            rows.sort_by(|a, b| b.1.date.cmp(&a.1.date));

            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|(pos, t)| {
                    vec![
                        pos.to_string(),
                        t.date.format("%Y-%m-%d").to_string(),
                        t.kind.label().to_string(),
                        presenter.format_triple(t.amount_base).main,
                        t.category.clone(),
                        t.note.clone(),
                        t.id.to_string(),
                    ]
                })
                .collect();
            print_table(
                &["#", "date", "kind", "amount", "category", "note", "id"],
                &rows,
            );
            Ok(())
        }
        TxCmd::Delete { id } => {
            let id = Uuid::parse_str(id.trim()).with_context(|| format!("Invalid id: {id}"))?;
            match ledger.delete_transaction(id)? {
                Some(t) => println!("Deleted {} {}", t.kind.label(), t.id),
                None => return Err(anyhow!("No such transaction: {id}")),
            }
            Ok(())
        }
        TxCmd::DeleteAt { position } => {
            let removed = match position.checked_sub(1) {
                Some(index) => ledger.delete_transaction_at(index)?,
                None => None,
            };
            match removed {
                Some(t) => println!("Deleted {} {}", t.kind.label(), t.id),
                None => println!("(nothing to delete)"),
            }
            Ok(())
        }
    }
}

fn handle_goal(ledger: &mut Ledger, presenter: &Presenter, cmd: GoalCmd) -> Result<()> {
    match cmd {
        GoalCmd::Create { name, goal } => {
            let goal = parse_decimal(&goal, "goal")?;
            ledger.create_goal(&name, goal)?;
            println!(
                "Created goal '{}' target {}.",
                name.trim(),
                presenter.format_triple(goal).main
            );
            Ok(())
        }
        GoalCmd::Deposit { name, amount } => {
            let Some(index) = ledger.goal_index(&name) else {
                return Err(anyhow!("No such goal: '{name}'"));
            };
            let amount = parse_decimal(&amount, "amount")?;
            let balance = ledger.deposit_to_goal(index, amount)?;
            println!(
                "Deposited into '{name}'. Balance {}.",
                presenter.format_triple(balance).main
            );
            Ok(())
        }
        GoalCmd::Update {
            name,
            new_name,
            goal,
        } => {
            let Some(index) = ledger.goal_index(&name) else {
                return Err(anyhow!("No such goal: '{name}'"));
            };
            let current = ledger.state().coffrets[index].clone();
            let goal = match goal {
                Some(raw) => parse_decimal(&raw, "goal")?,
                None => current.goal,
            };
            let new_name = new_name.unwrap_or(current.name);
            ledger.update_goal(index, &new_name, goal)?;
            println!("Updated goal '{}'.", new_name.trim());
            Ok(())
        }
        GoalCmd::List => {
            let goals = &ledger.state().coffrets;
            if goals.is_empty() {
                println!("(no goals)");
                return Ok(());
            }
            println!("name\tbalance\tgoal\tpercent");
            for g in goals {
                println!(
                    "{}\t{}\t{}\t{}%",
                    g.name,
                    format_number(g.balance),
                    format_number(g.goal),
                    format_number(g.progress_percent())
                );
            }
            Ok(())
        }
    }
}

fn handle_metals(ledger: &mut Ledger, presenter: &Presenter, cmd: MetalsCmd) -> Result<()> {
    match cmd {
        MetalsCmd::Set { gold, silver } => {
            let gold = parse_decimal(&gold, "gold grams")?;
            let silver = parse_decimal(&silver, "silver grams")?;
            ledger.set_metals(gold, silver)?;
            println!(
                "Metals set. Value {}.",
                format_value(presenter, metals_value(&ledger.state().metals))
            );
            Ok(())
        }
        MetalsCmd::Show => {
            let metals = ledger.state().metals;
            println!("gold_grams\t{}", metals.gold_grams);
            println!("silver_grams\t{}", metals.silver_grams);
            println!("value\t{}", format_value(presenter, metals_value(&metals)));
            Ok(())
        }
    }
}

fn handle_crypto(ledger: &mut Ledger, presenter: &Presenter, cmd: CryptoCmd) -> Result<()> {
    match cmd {
        CryptoCmd::Set {
            symbol,
            quantity,
            price,
        } => {
            let quantity = parse_decimal(&quantity, "quantity")?;
            let price = parse_decimal(&price, "price")?;
            ledger.upsert_crypto(&symbol, quantity, price)?;
            println!(
                "Crypto {} set. Portfolio {}.",
                symbol.trim().to_ascii_uppercase(),
                format_value(presenter, crypto_value(&ledger.state().cryptos))
            );
            Ok(())
        }
        CryptoCmd::List => {
            let cryptos = &ledger.state().cryptos;
            if cryptos.is_empty() {
                println!("(no cryptos)");
                return Ok(());
            }
            println!("symbol\tquantity\tvalue");
            for c in cryptos {
                println!(
                    "{}\t{}\t{}",
                    c.symbol,
                    c.quantity,
                    c.value()
                        .map(|v| presenter.format_triple(v).main)
                        .unwrap_or_else(|| UNVALUED.to_string())
                );
            }
            println!("total\t\t{}", format_value(presenter, crypto_value(cryptos)));
            Ok(())
        }
    }
}

fn handle_budget(ledger: &mut Ledger, presenter: &Presenter, cmd: BudgetCmd) -> Result<()> {
    match cmd {
        BudgetCmd::Set { period, limit } => {
            let limit = parse_decimal(&limit, "limit")?;
            ledger.set_budget(period.into(), limit)?;
            println!("Budget set.");
            Ok(())
        }
        BudgetCmd::Show => {
            let state = ledger.state();
            let Some(status) = budget_status(&state.transactions, &state.budget, now_local())
            else {
                println!("(no budget)");
                return Ok(());
            };
            let period = match status.period {
                BudgetPeriod::Weekly => "weekly",
                BudgetPeriod::Monthly => "monthly",
            };
            println!("period\t{period}");
            println!("limit\t{}", presenter.format_triple(status.limit).main);
            println!("spent\t{}", presenter.format_triple(status.spent).main);
            println!("remaining\t{}", presenter.format_triple(status.remaining).main);
            if status.is_overspent() {
                println!("(over budget)");
            }
            Ok(())
        }
    }
}

fn build_filter(args: &FilterArgs) -> Result<FilterState> {
    let mut filter = FilterState {
        from: args.from.as_deref().map(parse_date).transpose()?,
        to: args.to.as_deref().map(parse_date).transpose()?,
        kind: args.kind.into(),
        quick_range: QuickRange::Custom,
    };
    let reference = filter.to.unwrap_or_else(today);
    filter.set_quick_range(args.range.into(), reference);
    Ok(filter)
}

fn print_series(points: &[SeriesPoint], presenter: &Presenter) {
    let symbol = presenter.symbol(presenter.currency);
    for p in points {
        println!("{}\t{} {}", p.label, format_number(p.value), symbol);
    }
}

const UNVALUED: &str = "(too large to value)";

fn format_value(presenter: &Presenter, value: Option<Decimal>) -> String {
    value
        .map(|v| presenter.format_all(v))
        .unwrap_or_else(|| UNVALUED.to_string())
}

fn print_config(cfg: &AppConfig, paths: &AppPaths, cfg_path: &std::path::Path) {
    println!("config\t{}", cfg_path.display());
    println!("data_dir\t{}", paths.data_dir.display());
    println!("db\t{}", db_path(paths).display());
    println!("device_id\t{}", cfg.device_id);
    println!("remote_url\t{}", cfg.remote_url().unwrap_or("<not set>"));
    println!("sync_timeout_secs\t{}", cfg.sync_timeout_secs);
    println!("rate_eur\t{}", cfg.rates.eur);
    println!("rate_usd\t{}", cfg.rates.usd);
    println!("base_label\t{}", cfg.base_label);
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();

    for row in rows {
        for (i, cell) in row.iter().take(cols).enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    fn print_row(cells: &[String], widths: &[usize]) {
        print!("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            print!(" {:width$} |", cell, width = *w);
        }
        println!();
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    print_row(&header_cells, &widths);
    print!("|");
    for w in &widths {
        print!("{}|", "-".repeat(w + 2));
    }
    println!();
    for row in rows {
        print_row(row, &widths);
    }
}

fn parse_decimal(raw: &str, field: &'static str) -> Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal for {field}: {raw}"))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))
}
