use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use crate::config::today;
use crate::currency::to_base;
use crate::db::KvStore;
use crate::domain::{
    BudgetConfig, BudgetPeriod, CryptoHolding, Currency, ExchangeRates, LedgerState,
    MetalHoldings, SavingsGoal, Transaction, TxKind,
};
use crate::error::LedgerError;
use crate::history;
use crate::sync::{
    CoffretAction, CoffretEvent, EventSink, SnapshotSource, SyncEvent, SyncOutcome,
    startup_reconcile,
};

pub const STORAGE_KEY: &str = "moneyflow-v1";

/// Reads the stored document, shallow-merged over the default state.
///
/// Top-level fields that are missing or null keep their defaults; nested
/// objects are replaced wholesale. Any read or decode failure yields the
/// default state.
pub fn load_state(kv: &dyn KvStore) -> LedgerState {
    match try_load_state(kv) {
        Ok(state) => state,
        Err(err) => {
            warn!("{err}; starting from an empty ledger");
            LedgerState::default()
        }
    }
}

fn try_load_state(kv: &dyn KvStore) -> Result<LedgerState, LedgerError> {
    let raw = kv
        .get(STORAGE_KEY)
        .map_err(|e| LedgerError::PersistenceRead(format!("{e:#}")))?;
    let Some(raw) = raw else {
        return Ok(LedgerState::default());
    };

    let stored: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| LedgerError::PersistenceRead(e.to_string()))?;
    let serde_json::Value::Object(stored) = stored else {
        return Err(LedgerError::PersistenceRead(
            "document is not a JSON object".to_string(),
        ));
    };

    let mut merged = serde_json::to_value(LedgerState::default())
        .map_err(|e| LedgerError::PersistenceRead(e.to_string()))?;
    if let Some(fields) = merged.as_object_mut() {
        for (key, value) in stored {
            if !value.is_null() {
                fields.insert(key, value);
            }
        }
    }

    serde_json::from_value(merged).map_err(|e| LedgerError::PersistenceRead(e.to_string()))
}

pub fn save_state(kv: &dyn KvStore, state: &LedgerState) -> Result<()> {
    let json = serde_json::to_string(state).context("Failed to serialize ledger")?;
    kv.set(STORAGE_KEY, &json)
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TxKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub date: NaiveDate,
    pub category: String,
    pub note: String,
}

/// Sole owner of the persisted ledger.
///
/// Every mutator validates first, persists the new state, and only then
/// publishes it; on any error the in-memory state is unchanged. Outbound
/// notifications go out after the write is durable.
pub struct Ledger {
    state: LedgerState,
    kv: Box<dyn KvStore>,
    sink: Box<dyn EventSink>,
    rates: ExchangeRates,
    clock: fn() -> NaiveDate,
}

impl Ledger {
    pub fn open(kv: Box<dyn KvStore>, sink: Box<dyn EventSink>, rates: ExchangeRates) -> Self {
        let state = load_state(kv.as_ref());
        Self {
            state,
            kv,
            sink,
            rates,
            clock: today,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn rates(&self) -> &ExchangeRates {
        &self.rates
    }

    fn commit(&mut self, next: LedgerState) -> Result<(), LedgerError> {
        save_state(self.kv.as_ref(), &next)?;
        self.state = next;
        Ok(())
    }

    /// One-time startup merge with the remote snapshot. Fetch failures are
    /// absorbed; only a failed local write is reported.
    pub fn reconcile_with(&mut self, source: &dyn SnapshotSource) -> Result<SyncOutcome, LedgerError> {
        let (merged, outcome) = startup_reconcile(self.state.clone(), source, (self.clock)());
        if outcome == SyncOutcome::Applied {
            self.commit(merged)?;
        }
        Ok(outcome)
    }

    pub fn add_transaction(&mut self, new: NewTransaction) -> Result<Uuid, LedgerError> {
        if new.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid("Amount must be > 0"));
        }
        let amount_base = to_base(new.amount, new.currency, &self.rates)?;

        let tx = Transaction {
            id: Uuid::new_v4(),
            kind: new.kind,
            amount_base,
            date: new.date,
            category: new.category.trim().to_string(),
            note: new.note,
            original_amount: new.amount,
            original_currency: new.currency,
        };
        let id = tx.id;

        let mut next = self.state.clone();
        next.transactions.push(tx.clone());
        self.commit(next)?;
        self.sink.notify(&SyncEvent::Transaction(tx));
        Ok(id)
    }

    pub fn transaction_position(&self, id: Uuid) -> Option<usize> {
        self.state.transactions.iter().position(|t| t.id == id)
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> Result<Option<Transaction>, LedgerError> {
        match self.transaction_position(id) {
            Some(index) => self.delete_transaction_at(index),
            None => Ok(None),
        }
    }

    /// Removes the record currently at `index`. Later positions shift down,
    /// so callers must look positions up again after each deletion. Out of
    /// bounds is a no-op.
    pub fn delete_transaction_at(&mut self, index: usize) -> Result<Option<Transaction>, LedgerError> {
        if index >= self.state.transactions.len() {
            return Ok(None);
        }
        let mut next = self.state.clone();
        let removed = next.transactions.remove(index);
        self.commit(next)?;
        Ok(Some(removed))
    }

    pub fn goal_index(&self, name: &str) -> Option<usize> {
        self.state.coffrets.iter().position(|g| g.name == name)
    }

    fn validate_goal(&self, name: &str, goal: Decimal, skip: Option<usize>) -> Result<(), LedgerError> {
        if name.is_empty() {
            return Err(LedgerError::invalid("Goal name must not be empty"));
        }
        if goal <= Decimal::ZERO {
            return Err(LedgerError::invalid("Goal target must be > 0"));
        }
        match self.goal_index(name) {
            Some(i) if Some(i) != skip => {
                Err(LedgerError::invalid(format!("A goal named '{name}' already exists")))
            }
            _ => Ok(()),
        }
    }

    pub fn create_goal(&mut self, name: &str, goal: Decimal) -> Result<usize, LedgerError> {
        let name = name.trim();
        self.validate_goal(name, goal, None)?;

        let mut next = self.state.clone();
        next.coffrets.push(SavingsGoal {
            name: name.to_string(),
            goal,
            balance: Decimal::ZERO,
        });
        let index = next.coffrets.len() - 1;
        self.commit(next)?;

        self.sink.notify(&SyncEvent::Coffret(CoffretEvent {
            action: CoffretAction::Create,
            name: name.to_string(),
            goal: Some(goal),
            amount: Some(Decimal::ZERO),
            balance: Decimal::ZERO,
        }));
        Ok(index)
    }

    pub fn deposit_to_goal(&mut self, index: usize, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid("Deposit amount must be > 0"));
        }
        let mut next = self.state.clone();
        let goal = next
            .coffrets
            .get_mut(index)
            .ok_or_else(|| LedgerError::invalid(format!("No goal at position {index}")))?;
        goal.balance = goal
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::invalid("Deposit would overflow the goal balance"))?;
        let (name, balance) = (goal.name.clone(), goal.balance);
        self.commit(next)?;

        self.sink.notify(&SyncEvent::Coffret(CoffretEvent {
            action: CoffretAction::Deposit,
            name,
            goal: None,
            amount: Some(amount),
            balance,
        }));
        Ok(balance)
    }

    pub fn update_goal(&mut self, index: usize, name: &str, goal: Decimal) -> Result<(), LedgerError> {
        if index >= self.state.coffrets.len() {
            return Err(LedgerError::invalid(format!("No goal at position {index}")));
        }
        let name = name.trim();
        self.validate_goal(name, goal, Some(index))?;

        let mut next = self.state.clone();
        let entry = &mut next.coffrets[index];
        entry.name = name.to_string();
        entry.goal = goal;
        let balance = entry.balance;
        self.commit(next)?;

        self.sink.notify(&SyncEvent::Coffret(CoffretEvent {
            action: CoffretAction::Update,
            name: name.to_string(),
            goal: Some(goal),
            amount: None,
            balance,
        }));
        Ok(())
    }

    pub fn set_metals(&mut self, gold_grams: Decimal, silver_grams: Decimal) -> Result<(), LedgerError> {
        if gold_grams < Decimal::ZERO || silver_grams < Decimal::ZERO {
            return Err(LedgerError::invalid("Metal quantities must be >= 0"));
        }
        let metals = MetalHoldings {
            gold_grams,
            silver_grams,
        };

        let mut next = self.state.clone();
        next.metals = metals;
        history::record_metals(&mut next, (self.clock)())?;
        self.commit(next)?;
        self.sink.notify(&SyncEvent::Metals(metals));
        Ok(())
    }

    /// Last write wins: an existing symbol has its quantity and price replaced.
    pub fn upsert_crypto(
        &mut self,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(LedgerError::invalid("Crypto symbol must not be empty"));
        }
        if quantity < Decimal::ZERO {
            return Err(LedgerError::invalid("Crypto quantity must be >= 0"));
        }
        if price <= Decimal::ZERO {
            return Err(LedgerError::invalid("Crypto price must be > 0"));
        }
        let holding = CryptoHolding {
            symbol,
            quantity,
            price,
        };

        let mut next = self.state.clone();
        match next.cryptos.iter_mut().find(|c| c.symbol == holding.symbol) {
            Some(existing) => {
                existing.quantity = quantity;
                existing.price = price;
            }
            None => next.cryptos.push(holding.clone()),
        }
        history::record_crypto(&mut next, (self.clock)())?;
        self.commit(next)?;
        self.sink.notify(&SyncEvent::Crypto(holding));
        Ok(())
    }

    pub fn set_budget(&mut self, period: BudgetPeriod, limit: Decimal) -> Result<(), LedgerError> {
        if limit <= Decimal::ZERO {
            return Err(LedgerError::invalid("Budget limit must be > 0"));
        }
        let mut next = self.state.clone();
        next.budget = BudgetConfig { period, limit };
        self.commit(next)
    }
}
