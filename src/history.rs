use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::{
    CryptoHolding, GOLD_PRICE_PER_GRAM, LedgerState, MetalHoldings, SILVER_PRICE_PER_GRAM,
    ValuationSnapshot,
};
use crate::error::LedgerError;

/// Base-unit value at the fixed gram prices. `None` when it does not fit a `Decimal`.
pub fn metals_value(metals: &MetalHoldings) -> Option<Decimal> {
    let gold = metals.gold_grams.checked_mul(GOLD_PRICE_PER_GRAM)?;
    let silver = metals.silver_grams.checked_mul(SILVER_PRICE_PER_GRAM)?;
    gold.checked_add(silver)
}

/// Sum of holding values. `None` on overflow.
pub fn crypto_value(cryptos: &[CryptoHolding]) -> Option<Decimal> {
    cryptos
        .iter()
        .try_fold(Decimal::ZERO, |acc, c| acc.checked_add(c.value()?))
}

/// Appends today's metals valuation. Same-day entries are not superseded.
pub fn record_metals(state: &mut LedgerState, today: NaiveDate) -> Result<(), LedgerError> {
    let total_value_base = metals_value(&state.metals)
        .ok_or_else(|| LedgerError::invalid("Metal holdings are too large to value"))?;
    state.metals_history.push(ValuationSnapshot {
        date: today,
        total_value_base,
    });
    Ok(())
}

/// Appends today's crypto valuation. Same-day entries are not superseded.
pub fn record_crypto(state: &mut LedgerState, today: NaiveDate) -> Result<(), LedgerError> {
    let total_value_base = crypto_value(&state.cryptos)
        .ok_or_else(|| LedgerError::invalid("Crypto holdings are too large to value"))?;
    state.crypto_history.push(ValuationSnapshot {
        date: today,
        total_value_base,
    });
    Ok(())
}

/// Seeds empty histories with a single snapshot when holdings are worth
/// something. Holdings that cannot be valued are skipped with a warning.
pub fn seed_if_empty(state: &mut LedgerState, today: NaiveDate) {
    if state.metals_history.is_empty() {
        match metals_value(&state.metals) {
            Some(total_value_base) if total_value_base > Decimal::ZERO => {
                state.metals_history.push(ValuationSnapshot {
                    date: today,
                    total_value_base,
                });
            }
            Some(_) => {}
            None => warn!("metal holdings are too large to value, history not seeded"),
        }
    }
    if state.crypto_history.is_empty() {
        match crypto_value(&state.cryptos) {
            Some(total_value_base) if total_value_base > Decimal::ZERO => {
                state.crypto_history.push(ValuationSnapshot {
                    date: today,
                    total_value_base,
                });
            }
            Some(_) => {}
            None => warn!("crypto holdings are too large to value, history not seeded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    #[test]
    fn metals_use_fixed_gram_prices() {
        let m = MetalHoldings {
            gold_grams: Decimal::from(2),
            silver_grams: Decimal::from(10),
        };
        assert_eq!(metals_value(&m), Some(Decimal::from(85_000)));
    }

    #[test]
    fn repeated_records_keep_same_day_duplicates() {
        let mut state = LedgerState::default();
        state.metals.gold_grams = Decimal::ONE;
        record_metals(&mut state, today()).expect("record");
        state.metals.gold_grams = Decimal::ZERO;
        record_metals(&mut state, today()).expect("record");

        assert_eq!(state.metals_history.len(), 2);
        assert_eq!(state.metals_history[1].total_value_base, Decimal::ZERO);
    }

    #[test]
    fn seed_skips_worthless_holdings() {
        let mut state = LedgerState::default();
        state.cryptos.push(CryptoHolding {
            symbol: "BTC".into(),
            quantity: Decimal::ZERO,
            price: Decimal::from(1000),
        });
        seed_if_empty(&mut state, today());
        assert!(state.crypto_history.is_empty());
        assert!(state.metals_history.is_empty());
    }

    #[test]
    fn oversized_holdings_have_no_value() {
        let mut state = LedgerState::default();
        state.metals.gold_grams = Decimal::MAX;
        assert_eq!(metals_value(&state.metals), None);
        assert!(record_metals(&mut state, today()).is_err());
        assert!(state.metals_history.is_empty());

        state.cryptos = vec![
            CryptoHolding {
                symbol: "BTC".into(),
                quantity: Decimal::MAX,
                price: Decimal::ONE,
            },
            CryptoHolding {
                symbol: "ETH".into(),
                quantity: Decimal::ONE,
                price: Decimal::ONE,
            },
        ];
        assert_eq!(crypto_value(&state.cryptos), None);

        seed_if_empty(&mut state, today());
        assert!(state.metals_history.is_empty());
        assert!(state.crypto_history.is_empty());
    }
}
