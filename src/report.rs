use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::currency::Presenter;
use crate::domain::{BudgetConfig, BudgetPeriod, Transaction, TxKind, ValuationSnapshot};

pub const NO_DATA_LABEL: &str = "No data";
pub const NO_EXPENSES_LABEL: &str = "No expenses";
pub const OTHER_CATEGORY: &str = "Other";

/// One labelled value handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

/// Base-unit sums by kind, in one pass. Sums saturate at the `Decimal` bounds.
pub fn dashboard_totals(txs: &[&Transaction]) -> Totals {
    let mut totals = Totals::default();
    for t in txs {
        match t.kind {
            TxKind::Income => totals.income = totals.income.saturating_add(t.amount_base),
            TxKind::Expense => totals.expense = totals.expense.saturating_add(t.amount_base),
        }
    }
    totals.net = totals.income.saturating_sub(totals.expense);
    totals
}

/// Running balance per day, ascending, in the presenter's currency.
///
/// Deltas are summed per date and accumulated in base units; conversion only
/// happens on the emitted point.
pub fn cumulative_balance_series(txs: &[&Transaction], presenter: &Presenter) -> Vec<SeriesPoint> {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for t in txs {
        let day = by_date.entry(t.date).or_insert(Decimal::ZERO);
        *day = day.saturating_add(t.signed_amount());
    }

    if by_date.is_empty() {
        return vec![SeriesPoint {
            label: NO_DATA_LABEL.to_string(),
            value: Decimal::ZERO,
        }];
    }

    let mut running = Decimal::ZERO;
    by_date
        .into_iter()
        .map(|(date, delta)| {
            running = running.saturating_add(delta);
            SeriesPoint {
                label: date.format("%Y-%m-%d").to_string(),
                value: presenter.convert(running),
            }
        })
        .collect()
}

/// Expense totals per category, in order of first appearance.
///
/// Blank categories fold into "Other". With no expenses at all a single
/// placeholder slice of value 1 is returned so a chart can still render.
pub fn category_breakdown(txs: &[&Transaction], presenter: &Presenter) -> Vec<SeriesPoint> {
    let mut order: Vec<(String, Decimal)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for t in txs.iter().filter(|t| t.kind == TxKind::Expense) {
        let cat = match t.category.trim() {
            "" => OTHER_CATEGORY,
            c => c,
        };
        match index.get(cat) {
            Some(&i) => order[i].1 = order[i].1.saturating_add(t.amount_base),
            None => {
                index.insert(cat.to_string(), order.len());
                order.push((cat.to_string(), t.amount_base));
            }
        }
    }

    if order.is_empty() {
        return vec![SeriesPoint {
            label: NO_EXPENSES_LABEL.to_string(),
            value: Decimal::ONE,
        }];
    }

    order
        .into_iter()
        .map(|(label, total)| SeriesPoint {
            label,
            value: presenter.convert(total),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetStatus {
    pub period: BudgetPeriod,
    pub limit: Decimal,
    pub spent: Decimal,
    /// Clamped at zero; compare `spent` with `limit` to detect overspend.
    pub remaining: Decimal,
}

impl BudgetStatus {
    pub fn is_overspent(&self) -> bool {
        self.spent > self.limit
    }
}

/// Weekly windows trail `now` by seven days; monthly windows open on the
/// first of the current month.
pub fn period_start(period: BudgetPeriod, now: NaiveDateTime) -> NaiveDateTime {
    match period {
        BudgetPeriod::Weekly => now - Duration::days(7),
        BudgetPeriod::Monthly => now
            .date()
            .with_day(1)
            .unwrap_or(now.date())
            .and_time(chrono::NaiveTime::MIN),
    }
}

/// Expense consumption over the budget's current window. Takes the whole
/// ledger, not the filtered view. `None` when no limit is configured.
pub fn budget_status(
    all: &[Transaction],
    budget: &BudgetConfig,
    now: NaiveDateTime,
) -> Option<BudgetStatus> {
    if !budget.is_configured() {
        return None;
    }

    let from = period_start(budget.period, now);
    let spent: Decimal = all
        .iter()
        .filter(|t| t.kind == TxKind::Expense)
        .filter(|t| {
            let at = t.date.and_time(chrono::NaiveTime::MIN);
            at >= from && at <= now
        })
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount_base));

    Some(BudgetStatus {
        period: budget.period,
        limit: budget.limit,
        spent,
        remaining: budget.limit.saturating_sub(spent).max(Decimal::ZERO),
    })
}

/// Each stored snapshot mapped through the presenter, in stored order.
/// Duplicate dates are kept and gaps are not filled.
pub fn value_over_time(history: &[ValuationSnapshot], presenter: &Presenter) -> Vec<SeriesPoint> {
    history
        .iter()
        .map(|h| SeriesPoint {
            label: h.date.format("%Y-%m-%d").to_string(),
            value: presenter.convert(h.total_value_base),
        })
        .collect()
}
