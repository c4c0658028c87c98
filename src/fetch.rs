use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::AccountProfile;
use crate::provider_clients::{RemoteTarget, UsageClient};
use crate::utils::{current_day_window, now_rfc3339};

const BALANCE_FALLBACK_REASON: &str = "Balance failed";
const USAGE_FALLBACK_REASON: &str = "Usage failed";
const GENERIC_FAILURE_REASON: &str = "Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchStatus {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchState {
    pub status: FetchStatus,
    pub balance: f64,
    pub used_today: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl FetchState {
    /// Start of a cycle: error cleared, last known numbers kept.
    pub fn loading(previous: Option<&FetchState>) -> Self {
        match previous {
            Some(previous) => Self {
                status: FetchStatus::Loading,
                error_message: None,
                ..previous.clone()
            },
            None => Self {
                status: FetchStatus::Loading,
                balance: 0.0,
                used_today: 0.0,
                error_message: None,
                last_updated: None,
            },
        }
    }

    pub fn success(reading: QuotaReading) -> Self {
        Self {
            status: FetchStatus::Success,
            balance: reading.balance,
            used_today: reading.used_today,
            error_message: None,
            last_updated: Some(now_rfc3339()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE_REASON.to_string()
        } else {
            message
        };
        Self {
            status: FetchStatus::Error,
            balance: 0.0,
            used_today: 0.0,
            error_message: Some(message),
            last_updated: Some(now_rfc3339()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

/// Result of one successful fetch cycle, in raw quota units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaReading {
    pub balance: f64,
    pub used_today: f64,
}

/// One cell per account id. A cell is only ever replaced as a whole, so a
/// poisoned lock still guards consistent data and is recovered.
#[derive(Debug)]
pub struct FetchStates {
    cells: RwLock<HashMap<String, FetchState>>,
    changes: Arc<watch::Sender<u64>>,
}

impl FetchStates {
    pub fn new(changes: Arc<watch::Sender<u64>>) -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn get(&self, account_id: &str) -> Option<FetchState> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account_id)
            .cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, FetchState> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, account_id: &str, state: FetchState) {
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account_id.to_string(), state);
        notify_change(&self.changes);
    }

    fn begin(&self, account_id: &str) {
        {
            let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
            let loading = FetchState::loading(cells.get(account_id));
            cells.insert(account_id.to_string(), loading);
        }
        notify_change(&self.changes);
    }

    pub fn remove(&self, account_id: &str) -> Option<FetchState> {
        let removed = self
            .cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account_id);
        if removed.is_some() {
            notify_change(&self.changes);
        }
        removed
    }
}

pub fn notify_change(changes: &watch::Sender<u64>) {
    changes.send_modify(|revision| *revision = revision.wrapping_add(1));
}

#[derive(Clone)]
pub struct FetchOrchestrator {
    client: Arc<dyn UsageClient>,
    states: Arc<FetchStates>,
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}

impl FetchOrchestrator {
    pub fn new(client: Arc<dyn UsageClient>, changes: Arc<watch::Sender<u64>>) -> Self {
        Self {
            client,
            states: Arc::new(FetchStates::new(changes)),
        }
    }

    pub fn state(&self, account_id: &str) -> Option<FetchState> {
        self.states.get(account_id)
    }

    pub fn snapshot(&self) -> HashMap<String, FetchState> {
        self.states.snapshot()
    }

    /// Drops the cell of a deleted account. A cycle still in flight for it may
    /// write the cell again; nothing reads it afterwards.
    pub fn forget(&self, account_id: &str) {
        self.states.remove(account_id);
    }

    /// Marks the account `Loading` right away and runs the cycle on the runtime.
    /// Must be called from within a tokio runtime.
    pub fn refresh_account(&self, profile: &AccountProfile) -> JoinHandle<()> {
        self.states.begin(&profile.id);

        let client = Arc::clone(&self.client);
        let states = Arc::clone(&self.states);
        let profile = profile.clone();
        tokio::spawn(async move {
            let state = match run_cycle(client.as_ref(), &profile).await {
                Ok(reading) => {
                    log::debug!("[fetch] {} refreshed", profile.name);
                    FetchState::success(reading)
                }
                Err(err) => {
                    log::warn!("[fetch] {} failed: {err}", profile.name);
                    FetchState::failure(err.to_string())
                }
            };
            states.replace(&profile.id, state);
        })
    }

    pub fn refresh_all(&self, profiles: &[AccountProfile]) -> Vec<JoinHandle<()>> {
        log::debug!("[fetch] refreshing {} account(s)", profiles.len());
        profiles
            .iter()
            .map(|profile| self.refresh_account(profile))
            .collect()
    }

    pub async fn refresh_all_and_wait(&self, profiles: &[AccountProfile]) {
        for outcome in join_all(self.refresh_all(profiles)).await {
            if let Err(err) = outcome {
                log::error!("[fetch] refresh task aborted: {err}");
            }
        }
    }
}

/// Balance lookup, then usage since local midnight.
pub async fn run_cycle(client: &dyn UsageClient, profile: &AccountProfile) -> Result<QuotaReading> {
    let target = RemoteTarget::from_profile(profile);
    let balance = client
        .fetch_balance(&target)
        .await?
        .into_quota(BALANCE_FALLBACK_REASON)?;

    let window = current_day_window();
    let used_today = client
        .fetch_usage(&target, window)
        .await?
        .into_quota(USAGE_FALLBACK_REASON)?;

    Ok(QuotaReading {
        balance,
        used_today,
    })
}
