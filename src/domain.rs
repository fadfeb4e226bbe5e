use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Fixed gold valuation, in base units per gram.
pub const GOLD_PRICE_PER_GRAM: Decimal = Decimal::from_parts(40_000, 0, 0, false, 0);
/// Fixed silver valuation, in base units per gram.
pub const SILVER_PRICE_PER_GRAM: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Income,
    Expense,
}

impl TxKind {
    pub fn label(self) -> &'static str {
        match self {
            TxKind::Income => "income",
            TxKind::Expense => "expense",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "income" => Some(TxKind::Income),
            "expense" => Some(TxKind::Expense),
            _ => None,
        }
    }
}

/// Presentation currencies. `Base` is the ledger's home unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "BASE", alias = "XOF")]
    Base,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Base, Currency::Eur, Currency::Usd];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BASE" | "XOF" | "FCFA" => Some(Currency::Base),
            "EUR" => Some(Currency::Eur),
            "USD" => Some(Currency::Usd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TxKind,
    /// Always >= 0; the sign lives in `kind`.
    #[serde(rename = "amount")]
    pub amount_base: Decimal,
    #[serde(with = "ymd")]
    pub date: NaiveDate,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub note: String,
    pub original_amount: Decimal,
    #[serde(default)]
    pub original_currency: Currency,
}

impl Transaction {
    /// Signed contribution to a running balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TxKind::Income => self.amount_base,
            TxKind::Expense => -self.amount_base,
        }
    }

    /// Lenient decoding used for stored documents and remote payloads.
    ///
    /// Returns `None` when the record has no usable kind or date; amounts that
    /// fail to parse collapse to zero.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let kind = obj.get("type").and_then(|v| v.as_str()).and_then(TxKind::parse)?;
        let date = obj.get("date").and_then(normalize_date)?;
        let amount_base = obj
            .get("amount")
            .and_then(json_decimal)
            .unwrap_or(Decimal::ZERO)
            .abs();
        let original_amount = obj
            .get("originalAmount")
            .and_then(json_decimal)
            .unwrap_or(amount_base);
        let original_currency = obj
            .get("originalCurrency")
            .and_then(|v| v.as_str())
            .and_then(Currency::parse)
            .unwrap_or_default();
        let id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Some(Self {
            id,
            kind,
            amount_base,
            date,
            category: json_string(obj.get("category")),
            note: json_string(obj.get("note")),
            original_amount,
            original_currency,
        })
    }
}

/// A named savings goal ("coffret").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub name: String,
    pub goal: Decimal,
    #[serde(default)]
    pub balance: Decimal,
}

impl SavingsGoal {
    /// Completion percentage, capped at 100.
    pub fn progress_percent(&self) -> Decimal {
        if self.goal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.balance
            .checked_div(self.goal)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Decimal::ONE_HUNDRED, |pct| pct.min(Decimal::ONE_HUNDRED))
    }

    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = json_string(obj.get("name"));
        if name.trim().is_empty() {
            return None;
        }
        Some(Self {
            name,
            goal: obj.get("goal").and_then(json_decimal).unwrap_or(Decimal::ZERO),
            balance: obj
                .get("balance")
                .and_then(json_decimal)
                .unwrap_or(Decimal::ZERO),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalHoldings {
    #[serde(default)]
    pub gold_grams: Decimal,
    #[serde(default)]
    pub silver_grams: Decimal,
}

impl MetalHoldings {
    pub fn is_empty(&self) -> bool {
        self.gold_grams.is_zero() && self.silver_grams.is_zero()
    }

    /// Remote metals: missing or unparseable quantities fall back to zero.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            gold_grams: obj
                .get("goldGrams")
                .and_then(json_decimal)
                .unwrap_or(Decimal::ZERO),
            silver_grams: obj
                .get("silverGrams")
                .and_then(json_decimal)
                .unwrap_or(Decimal::ZERO),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoHolding {
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl CryptoHolding {
    /// Quantity times unit price. `None` when the product overflows.
    pub fn value(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }

    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let symbol = json_string(obj.get("symbol")).trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return None;
        }
        Some(Self {
            symbol,
            quantity: obj
                .get("quantity")
                .and_then(json_decimal)
                .unwrap_or(Decimal::ZERO),
            price: obj.get("price").and_then(json_decimal).unwrap_or(Decimal::ZERO),
        })
    }
}

/// Immutable point-in-time valuation of a holding category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationSnapshot {
    #[serde(with = "ymd")]
    pub date: NaiveDate,
    #[serde(alias = "totalXOF")]
    pub total_value_base: Decimal,
}

/// "1 base unit = rate foreign units".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    #[serde(rename = "EUR")]
    pub eur: Decimal,
    #[serde(rename = "USD")]
    pub usd: Decimal,
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self {
            eur: Decimal::new(15, 4),
            usd: Decimal::new(17, 4),
        }
    }
}

impl ExchangeRates {
    pub fn rate(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Base => Decimal::ONE,
            Currency::Eur => self.eur,
            Currency::Usd => self.usd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default)]
    pub limit: Decimal,
}

impl BudgetConfig {
    /// A limit <= 0 means no budget has been configured.
    pub fn is_configured(&self) -> bool {
        self.limit > Decimal::ZERO
    }
}

/// Everything the ledger persists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    #[serde(default, deserialize_with = "lenient_transactions")]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub coffrets: Vec<SavingsGoal>,
    #[serde(default)]
    pub metals: MetalHoldings,
    #[serde(default)]
    pub cryptos: Vec<CryptoHolding>,
    #[serde(default)]
    pub metals_history: Vec<ValuationSnapshot>,
    #[serde(default)]
    pub crypto_history: Vec<ValuationSnapshot>,
    #[serde(default)]
    pub budget: BudgetConfig,
}

fn lenient_transactions<'de, D>(deserializer: D) -> Result<Vec<Transaction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(Transaction::from_json).collect())
}

/// Accepts full timestamps or `YYYY-MM-DD` strings; anything else is rejected.
///
/// Timestamps carrying an offset are reduced to their UTC calendar date.
pub fn normalize_date(value: &serde_json::Value) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc().date());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Numbers may arrive as JSON numbers or numeric strings.
pub fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

fn json_string(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

mod ymd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::normalize_date(&serde_json::Value::String(raw.clone()))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_date_accepts_plain_dates_and_timestamps() {
        assert_eq!(
            normalize_date(&json!("2025-03-04")),
            NaiveDate::from_ymd_opt(2025, 3, 4)
        );
        assert_eq!(
            normalize_date(&json!("2025-03-03T23:00:00.000Z")),
            NaiveDate::from_ymd_opt(2025, 3, 3)
        );
        assert_eq!(normalize_date(&json!("yesterday")), None);
        assert_eq!(normalize_date(&json!(20250304)), None);
    }

    #[test]
    fn transaction_from_json_drops_records_without_a_date() {
        let tx = json!({"type": "expense", "amount": "12.5", "date": "nope"});
        assert!(Transaction::from_json(&tx).is_none());

        let tx = json!({"type": "income", "amount": 100, "date": "2025-01-02", "category": "salary"});
        let parsed = Transaction::from_json(&tx).expect("valid tx");
        assert_eq!(parsed.kind, TxKind::Income);
        assert_eq!(parsed.amount_base, Decimal::from(100));
        assert_eq!(parsed.original_amount, Decimal::from(100));
        assert_eq!(parsed.category, "salary");
    }

    #[test]
    fn goal_progress_is_capped() {
        let g = SavingsGoal {
            name: "car".into(),
            goal: Decimal::from(100),
            balance: Decimal::from(250),
        };
        assert_eq!(g.progress_percent(), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn budget_with_zero_limit_is_unset() {
        assert!(!BudgetConfig::default().is_configured());
    }
}
