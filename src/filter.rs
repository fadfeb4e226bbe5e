use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{LedgerState, Transaction, TxKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    Income,
    Expense,
}

impl KindFilter {
    pub fn matches(self, kind: TxKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Income => kind == TxKind::Income,
            KindFilter::Expense => kind == TxKind::Expense,
        }
    }
}

/// Presets that generate a `[from, to]` window ending at a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickRange {
    #[default]
    Custom,
    Day,
    Week,
    Month,
    Year,
}

/// Window for `mode` ending at `reference`; `None` for `Custom`.
pub fn apply_quick_range(mode: QuickRange, reference: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let from = match mode {
        QuickRange::Custom => return None,
        QuickRange::Day => reference,
        QuickRange::Week => reference - Duration::days(6),
        QuickRange::Month => reference.with_day(1)?,
        QuickRange::Year => NaiveDate::from_ymd_opt(reference.year(), 1, 1)?,
    };
    Some((from, reference))
}

/// Inclusive on both ends, at day granularity. A missing bound is open.
pub fn is_within_range(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    if let Some(from) = from {
        if date < from {
            return false;
        }
    }
    if let Some(to) = to {
        if date > to {
            return false;
        }
    }
    true
}

/// UI-side filter state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: KindFilter,
    pub quick_range: QuickRange,
}

impl FilterState {
    /// Selects a preset and, unless it is `Custom`, overwrites both bounds.
    pub fn set_quick_range(&mut self, mode: QuickRange, reference: NaiveDate) {
        self.quick_range = mode;
        if let Some((from, to)) = apply_quick_range(mode, reference) {
            self.from = Some(from);
            self.to = Some(to);
        }
    }

    pub fn reset(&mut self) {
        *self = FilterState::default();
    }

    pub fn has_date_bounds(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

/// Active subset in ledger order, recomputed by a linear scan on each call.
pub fn filtered_transactions<'a>(
    state: &'a LedgerState,
    filter: &FilterState,
) -> Vec<&'a Transaction> {
    state
        .transactions
        .iter()
        .filter(|t| !filter.has_date_bounds() || is_within_range(t.date, filter.from, filter.to))
        .filter(|t| filter.kind.matches(t.kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn tx(kind: TxKind, amount: i64, date: NaiveDate) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            kind,
            amount_base: Decimal::from(amount),
            date,
            category: String::new(),
            note: String::new(),
            original_amount: Decimal::from(amount),
            original_currency: Currency::Base,
        }
    }

    #[test]
    fn quick_ranges_end_at_reference() {
        let r = d(2025, 5, 14);
        assert_eq!(apply_quick_range(QuickRange::Day, r), Some((r, r)));
        assert_eq!(apply_quick_range(QuickRange::Week, r), Some((d(2025, 5, 8), r)));
        assert_eq!(apply_quick_range(QuickRange::Month, r), Some((d(2025, 5, 1), r)));
        assert_eq!(apply_quick_range(QuickRange::Year, r), Some((d(2025, 1, 1), r)));
        assert_eq!(apply_quick_range(QuickRange::Custom, r), None);
    }

    #[test]
    fn custom_range_keeps_existing_bounds() {
        let mut f = FilterState {
            from: Some(d(2024, 1, 1)),
            to: Some(d(2024, 2, 1)),
            ..FilterState::default()
        };
        f.set_quick_range(QuickRange::Custom, d(2025, 5, 14));
        assert_eq!(f.from, Some(d(2024, 1, 1)));
        assert_eq!(f.to, Some(d(2024, 2, 1)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let from = Some(d(2025, 1, 10));
        let to = Some(d(2025, 1, 20));
        assert!(is_within_range(d(2025, 1, 10), from, to));
        assert!(is_within_range(d(2025, 1, 20), from, to));
        assert!(!is_within_range(d(2025, 1, 21), from, to));
        assert!(is_within_range(d(1999, 1, 1), None, to));
    }

    #[test]
    fn kind_filter_narrows_after_dates() {
        let state = LedgerState {
            transactions: vec![
                tx(TxKind::Income, 10, d(2025, 1, 1)),
                tx(TxKind::Expense, 5, d(2025, 1, 2)),
                tx(TxKind::Expense, 7, d(2025, 2, 2)),
            ],
            ..LedgerState::default()
        };
        let f = FilterState {
            to: Some(d(2025, 1, 31)),
            kind: KindFilter::Expense,
            ..FilterState::default()
        };
        let out = filtered_transactions(&state, &f);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount_base, Decimal::from(5));

        let mut f = f;
        f.set_quick_range(QuickRange::Month, d(2025, 1, 15));
        f.reset();
        assert_eq!(f, FilterState::default());
        assert_eq!(filtered_transactions(&state, &f).len(), 3);
    }
}
