use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{Currency, ExchangeRates};
use crate::error::LedgerError;

/// Base amount expressed in `currency`. No rounding; saturates at the `Decimal` bounds.
pub fn to_presentation(amount_base: Decimal, currency: Currency, rates: &ExchangeRates) -> Decimal {
    amount_base.saturating_mul(rates.rate(currency))
}

/// Converts an amount entered in `currency` back into base units.
pub fn to_base(
    amount: Decimal,
    currency: Currency,
    rates: &ExchangeRates,
) -> Result<Decimal, LedgerError> {
    amount
        .checked_div(rates.rate(currency))
        .ok_or_else(|| LedgerError::invalid(format!("No usable rate for {currency:?}")))
}

/// Rounds to the nearest integer and groups thousands with a space (`1 234 567`).
pub fn format_number(n: Decimal) -> String {
    let rounded = n.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub main: String,
    pub detail: String,
}

/// Holds the active presentation currency and the process-wide rates.
#[derive(Debug, Clone)]
pub struct Presenter {
    pub currency: Currency,
    pub rates: ExchangeRates,
    pub base_label: String,
}

impl Presenter {
    pub fn new(currency: Currency, rates: ExchangeRates, base_label: impl Into<String>) -> Self {
        Self {
            currency,
            rates,
            base_label: base_label.into(),
        }
    }

    pub fn convert(&self, amount_base: Decimal) -> Decimal {
        to_presentation(amount_base, self.currency, &self.rates)
    }

    pub fn symbol(&self, currency: Currency) -> &str {
        match currency {
            Currency::Base => &self.base_label,
            Currency::Eur => "€",
            Currency::Usd => "$",
        }
    }

    fn figure(&self, amount_base: Decimal, currency: Currency) -> String {
        format!(
            "{} {}",
            format_number(to_presentation(amount_base, currency, &self.rates)),
            self.symbol(currency)
        )
    }

    /// Active currency as `main`, the other two as an approximation in `detail`.
    pub fn format_triple(&self, amount_base: Decimal) -> Formatted {
        let others: Vec<String> = Currency::ALL
            .iter()
            .filter(|c| **c != self.currency)
            .map(|c| self.figure(amount_base, *c))
            .collect();
        Formatted {
            main: self.figure(amount_base, self.currency),
            detail: format!("≈ {}", others.join(" • ")),
        }
    }

    /// All three figures on one line, base first.
    pub fn format_all(&self, amount_base: Decimal) -> String {
        Currency::ALL
            .iter()
            .map(|c| self.figure(amount_base, *c))
            .collect::<Vec<_>>()
            .join(" • ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> ExchangeRates {
        ExchangeRates {
            eur: Decimal::new(15, 4),
            usd: Decimal::new(17, 4),
        }
    }

    #[test]
    fn base_is_identity() {
        let x = Decimal::new(123_456, 2);
        assert_eq!(to_presentation(x, Currency::Base, &rates()), x);
    }

    #[test]
    fn eur_round_trip_restores_base_amount() {
        let r = rates();
        let x = Decimal::from(655_957);
        let eur = to_presentation(x, Currency::Eur, &r);
        let back = to_base(eur, Currency::Eur, &r).expect("rate > 0");
        assert_eq!(to_presentation(back, Currency::Base, &r), x);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let r = ExchangeRates {
            eur: Decimal::ZERO,
            usd: Decimal::ONE,
        };
        assert!(to_base(Decimal::TEN, Currency::Eur, &r).is_err());
    }

    #[test]
    fn numbers_are_grouped_by_thousands() {
        assert_eq!(format_number(Decimal::new(1_234_567_4, 1)), "1 234 567");
        assert_eq!(format_number(Decimal::new(9995, 1)), "1 000");
        assert_eq!(format_number(Decimal::from(-2500)), "-2 500");
        assert_eq!(format_number(Decimal::new(-4, 1)), "0");
    }

    #[test]
    fn triple_puts_active_currency_first() {
        let p = Presenter::new(Currency::Eur, rates(), "FCFA");
        let f = p.format_triple(Decimal::from(100_000));
        assert_eq!(f.main, "150 €");
        assert_eq!(f.detail, "≈ 100 000 FCFA • 170 $");
    }
}
