use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{CryptoHolding, LedgerState, MetalHoldings, SavingsGoal, Transaction};
use crate::error::LedgerError;
use crate::history;

const UA: &str = concat!("moneyflow/", env!("CARGO_PKG_VERSION"));

/// Remote state as served by the snapshot endpoint. Each field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    pub transactions: Option<Vec<Transaction>>,
    pub coffrets: Option<Vec<SavingsGoal>>,
    pub metals: Option<MetalHoldings>,
    pub cryptos: Option<Vec<CryptoHolding>>,
}

impl RemoteSnapshot {
    /// Decodes the `{transactions?, coffrets?, metals?, cryptos?}` payload.
    ///
    /// A collection that is present but not an array counts as absent.
    /// Transactions whose date cannot be normalized are dropped.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow!("snapshot payload is not a JSON object"))?;

        let transactions = obj.get("transactions").and_then(|v| v.as_array()).map(|items| {
            let parsed: Vec<Transaction> = items.iter().filter_map(Transaction::from_json).collect();
            if parsed.len() < items.len() {
                debug!(
                    dropped = items.len() - parsed.len(),
                    "dropped remote transactions with unusable dates"
                );
            }
            parsed
        });
        let coffrets = obj.get("coffrets").and_then(|v| v.as_array()).map(|items| {
            let parsed = items.iter().filter_map(SavingsGoal::from_json).collect();
            last_wins_by_key(parsed, |g: &SavingsGoal| g.name.as_str())
        });
        let metals = obj.get("metals").and_then(MetalHoldings::from_json);
        let cryptos = obj.get("cryptos").and_then(|v| v.as_array()).map(|items| {
            let parsed = items.iter().filter_map(CryptoHolding::from_json).collect();
            last_wins_by_key(parsed, |c: &CryptoHolding| c.symbol.as_str())
        });

        Ok(Self {
            transactions,
            coffrets,
            metals,
            cryptos,
        })
    }
}

/// Collapses records sharing a key: the later record replaces the earlier one
/// in place, so first-seen order is kept.
fn last_wins_by_key<T>(items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let total = items.len();
    let mut out: Vec<T> = Vec::with_capacity(total);
    let mut seen: HashMap<String, usize> = HashMap::new();
    for item in items {
        let k = key(&item).to_string();
        match seen.get(&k).copied() {
            Some(i) => out[i] = item,
            None => {
                seen.insert(k, out.len());
                out.push(item);
            }
        }
    }
    if out.len() < total {
        debug!(dropped = total - out.len(), "collapsed duplicate remote records");
    }
    out
}

/// Additive, local-wins merge of a remote snapshot into local state.
///
/// A remote collection is adopted only when the local one is empty; metals
/// only when both local quantities are zero. Nothing is merged by key, so a
/// single local record shadows the whole remote category.
pub fn reconcile(mut local: LedgerState, remote: &RemoteSnapshot, today: NaiveDate) -> LedgerState {
    // TODO: merge remote records by key once they carry stable ids; today any
    // remote record created after first sync is never seen locally.
    if let Some(txs) = &remote.transactions {
        if local.transactions.is_empty() {
            info!(count = txs.len(), "adopting remote transactions");
            local.transactions = txs.clone();
        }
    }

    if let Some(coffrets) = &remote.coffrets {
        if local.coffrets.is_empty() {
            info!(count = coffrets.len(), "adopting remote coffrets");
            local.coffrets = coffrets.clone();
        }
    }

    if let Some(metals) = remote.metals {
        if local.metals.is_empty() {
            if history::metals_value(&metals).is_some() {
                info!("adopting remote metals");
                local.metals = metals;
            } else {
                warn!("remote metals are too large to value, keeping local metals");
            }
        }
    }

    if let Some(cryptos) = &remote.cryptos {
        if local.cryptos.is_empty() {
            let valued: Vec<CryptoHolding> = cryptos
                .iter()
                .filter(|c| c.value().is_some())
                .cloned()
                .collect();
            if valued.len() < cryptos.len() {
                warn!(
                    dropped = cryptos.len() - valued.len(),
                    "dropped remote cryptos too large to value"
                );
            }
            if history::crypto_value(&valued).is_some() {
                info!(count = valued.len(), "adopting remote cryptos");
                local.cryptos = valued;
            } else {
                warn!("remote crypto portfolio is too large to value, keeping local cryptos");
            }
        }
    }

    history::seed_if_empty(&mut local, today);
    local
}

pub trait SnapshotSource {
    fn fetch(&self) -> Result<RemoteSnapshot>;
}

pub struct HttpSnapshotSource {
    client: Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
        })
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self) -> Result<RemoteSnapshot> {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        pb.set_message("Fetching remote snapshot...");

        let result = (|| -> Result<RemoteSnapshot> {
            let resp = self
                .client
                .get(&self.url)
                .query(&[("kind", "all")])
                .send()
                .with_context(|| format!("Failed to reach {}", self.url))?
                .error_for_status()
                .context("Snapshot endpoint returned an error status")?;
            let body: serde_json::Value = resp.json().context("Snapshot is not valid JSON")?;
            RemoteSnapshot::from_json(&body)
        })();

        pb.finish_and_clear();
        result.map_err(|e| LedgerError::SyncTransport(format!("{e:#}")).into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    Unavailable,
}

/// Runs the one-time startup merge. Never fails: when the remote cannot be
/// fetched the local state is returned untouched.
pub fn startup_reconcile(
    local: LedgerState,
    source: &dyn SnapshotSource,
    today: NaiveDate,
) -> (LedgerState, SyncOutcome) {
    match source.fetch() {
        Ok(remote) => {
            let merged = reconcile(local, &remote, today);
            info!("startup sync applied");
            (merged, SyncOutcome::Applied)
        }
        Err(err) => {
            warn!("remote sync unavailable, continuing with local data: {err:#}");
            (local, SyncOutcome::Unavailable)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoffretAction {
    Create,
    Deposit,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoffretEvent {
    pub action: CoffretAction,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub balance: Decimal,
}

/// One-way notification sent to the remote write sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncEvent {
    Transaction(Transaction),
    Coffret(CoffretEvent),
    Metals(MetalHoldings),
    Crypto(CryptoHolding),
}

/// Best-effort side channel. There is no delivery guarantee: implementations
/// log failures and never report them to the caller, and `notify` must not
/// block on the remote.
pub trait EventSink {
    fn notify(&self, event: &SyncEvent);
}

/// Used when no remote is configured or `--offline` is set.
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, event: &SyncEvent) {
        debug!(?event, "remote sink disabled, dropping event");
    }
}

/// Posts each event from its own thread so mutators never wait on the
/// network. Dropping the sink joins the in-flight posts, each bounded by the
/// client timeout, so a short-lived process does not lose them on exit.
pub struct HttpEventSink {
    client: Client,
    url: String,
    pending: RefCell<Vec<JoinHandle<()>>>,
}

impl HttpEventSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
            pending: RefCell::new(Vec::new()),
        })
    }
}

impl EventSink for HttpEventSink {
    fn notify(&self, event: &SyncEvent) {
        let client = self.client.clone();
        let url = self.url.clone();
        let event = event.clone();
        let handle = thread::spawn(move || {
            // The response body is never read.
            match client.post(&url).json(&event).send() {
                Ok(resp) => debug!(status = %resp.status(), "event sent to remote sink"),
                Err(err) => warn!("failed to send event to remote sink: {err}"),
            }
        });
        self.pending.borrow_mut().push(handle);
    }
}

impl Drop for HttpEventSink {
    fn drop(&mut self) {
        for handle in self.pending.get_mut().drain(..) {
            if handle.join().is_err() {
                warn!("remote sink worker panicked");
            }
        }
    }
}

fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(UA)
        .build()
        .context("Failed to build HTTP client")?;
    Ok(client)
}
