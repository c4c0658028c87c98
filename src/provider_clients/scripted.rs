//! Canned `UsageClient` for exercising the fetch cycle without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::error::BackendError;
use crate::provider_clients::{ApiEnvelope, ClientFuture, QuotaData, RemoteTarget, UsageClient};
use crate::utils::DayWindow;

#[derive(Debug, Clone)]
pub enum Reply {
    Envelope(ApiEnvelope),
    Transport(String),
}

pub fn ok(quota: f64) -> Reply {
    Reply::Envelope(ApiEnvelope {
        success: true,
        message: None,
        data: Some(QuotaData { quota }),
    })
}

pub fn rejected(message: Option<&str>) -> Reply {
    Reply::Envelope(ApiEnvelope {
        success: false,
        message: message.map(str::to_string),
        data: None,
    })
}

pub fn without_data() -> Reply {
    Reply::Envelope(ApiEnvelope {
        success: true,
        message: None,
        data: None,
    })
}

/// Replies are keyed by endpoint URL; unknown endpoints succeed with
/// `DEFAULT_BALANCE` / `DEFAULT_USAGE`.
#[derive(Default)]
pub struct ScriptedClient {
    balance: Mutex<HashMap<String, Reply>>,
    usage: Mutex<HashMap<String, Reply>>,
    gate: Option<Arc<Semaphore>>,
    balance_calls: AtomicUsize,
    usage_calls: AtomicUsize,
    windows: Mutex<Vec<DayWindow>>,
    targets: Mutex<Vec<RemoteTarget>>,
}

pub const DEFAULT_BALANCE: f64 = 1_500_000.0;
pub const DEFAULT_USAGE: f64 = 250_000.0;

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every balance lookup waits for a permit from `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn on_balance(self, endpoint_url: &str, reply: Reply) -> Self {
        self.set_balance(endpoint_url, reply);
        self
    }

    pub fn on_usage(self, endpoint_url: &str, reply: Reply) -> Self {
        self.set_usage(endpoint_url, reply);
        self
    }

    pub fn set_balance(&self, endpoint_url: &str, reply: Reply) {
        self.balance
            .lock()
            .expect("scripted replies mutex poisoned")
            .insert(endpoint_url.to_string(), reply);
    }

    pub fn set_usage(&self, endpoint_url: &str, reply: Reply) {
        self.usage
            .lock()
            .expect("scripted replies mutex poisoned")
            .insert(endpoint_url.to_string(), reply);
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn usage_calls(&self) -> usize {
        self.usage_calls.load(Ordering::SeqCst)
    }

    pub fn windows(&self) -> Vec<DayWindow> {
        self.windows
            .lock()
            .expect("scripted windows mutex poisoned")
            .clone()
    }

    pub fn targets(&self) -> Vec<RemoteTarget> {
        self.targets
            .lock()
            .expect("scripted targets mutex poisoned")
            .clone()
    }

    fn reply(
        replies: &Mutex<HashMap<String, Reply>>,
        endpoint_url: &str,
        default_quota: f64,
    ) -> crate::error::Result<ApiEnvelope> {
        let reply = replies
            .lock()
            .expect("scripted replies mutex poisoned")
            .get(endpoint_url)
            .cloned()
            .unwrap_or_else(|| ok(default_quota));
        match reply {
            Reply::Envelope(envelope) => Ok(envelope),
            Reply::Transport(message) => Err(BackendError::Provider(message)),
        }
    }
}

impl UsageClient for ScriptedClient {
    fn fetch_balance<'a>(&'a self, target: &'a RemoteTarget) -> ClientFuture<'a> {
        Box::pin(async move {
            if let Some(gate) = self.gate.as_ref() {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            self.targets
                .lock()
                .expect("scripted targets mutex poisoned")
                .push(target.clone());
            Self::reply(&self.balance, &target.endpoint_url, DEFAULT_BALANCE)
        })
    }

    fn fetch_usage<'a>(
        &'a self,
        target: &'a RemoteTarget,
        window: DayWindow,
    ) -> ClientFuture<'a> {
        Box::pin(async move {
            self.usage_calls.fetch_add(1, Ordering::SeqCst);
            self.windows
                .lock()
                .expect("scripted windows mutex poisoned")
                .push(window);
            Self::reply(&self.usage, &target.endpoint_url, DEFAULT_USAGE)
        })
    }
}
