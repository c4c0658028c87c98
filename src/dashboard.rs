use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;

use crate::account_store::AccountRegistry;
use crate::carousel::Carousel;
use crate::config::DashboardConfig;
use crate::error::{BackendError, Result};
use crate::fetch::{notify_change, FetchOrchestrator, FetchState};
use crate::models::{AccountProfile, ProfileInput};
use crate::presentation::{select_view, EditSession, FormTarget, RenderState, ViewInput, ViewMode};
use crate::provider_clients::UsageClient;
use crate::scheduler::Scheduler;
use crate::storage::KeyValueStore;

/// Handle to the running dashboard. All state sits behind one lock and every
/// user action is a method here. Must be created and used inside a tokio
/// runtime, since refreshes and timers are spawned tasks.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    state: Mutex<DashboardState>,
    fetcher: FetchOrchestrator,
    config: DashboardConfig,
    changes: Arc<watch::Sender<u64>>,
}

struct DashboardState {
    registry: AccountRegistry,
    carousel: Carousel,
    mode: ViewMode,
    editing: Option<EditSession>,
    scheduler: Scheduler,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    pub fn open(
        storage: Arc<dyn KeyValueStore>,
        client: Arc<dyn UsageClient>,
        config: DashboardConfig,
    ) -> Result<Self> {
        let registry = AccountRegistry::load(storage)?;
        let mode = if registry.is_empty() {
            ViewMode::Settings
        } else {
            ViewMode::Active
        };
        let account_count = registry.len();

        let (changes, _) = watch::channel(0u64);
        let changes = Arc::new(changes);
        let inner = Arc::new(DashboardInner {
            state: Mutex::new(DashboardState {
                registry,
                carousel: Carousel::new(),
                mode,
                editing: None,
                scheduler: Scheduler::new(),
            }),
            fetcher: FetchOrchestrator::new(client, Arc::clone(&changes)),
            config,
            changes,
        });

        {
            let mut state = inner.lock()?;
            if state.mode == ViewMode::Active {
                inner.start_refresh(&mut state);
                inner.sync_rotation(&mut state);
            }
        }

        log::info!("[dashboard] opened with {account_count} account(s)");
        Ok(Self { inner })
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn accounts(&self) -> Result<Vec<AccountProfile>> {
        Ok(self.inner.lock()?.registry.list().to_vec())
    }

    pub fn current_index(&self) -> Result<usize> {
        Ok(self.inner.lock()?.carousel.index())
    }

    pub fn mode(&self) -> Result<ViewMode> {
        Ok(self.inner.lock()?.mode)
    }

    pub fn editing(&self) -> Result<Option<EditSession>> {
        Ok(self.inner.lock()?.editing.clone())
    }

    pub fn fetch_state(&self, account_id: &str) -> Option<FetchState> {
        self.inner.fetcher.state(account_id)
    }

    pub fn render(&self) -> Result<RenderState> {
        let state = self.inner.lock()?;
        let accounts = state.registry.list();
        let current_state = state
            .carousel
            .current(accounts.len())
            .and_then(|index| self.inner.fetcher.state(&accounts[index].id));

        Ok(select_view(ViewInput {
            accounts,
            current_index: state.carousel.index(),
            mode: state.mode,
            editing: state.editing.as_ref(),
            current_state: current_state.as_ref(),
        }))
    }

    pub fn next(&self) -> Result<()> {
        let mut state = self.inner.lock()?;
        let len = state.registry.len();
        state.carousel.next(len);
        self.inner.notify();
        Ok(())
    }

    pub fn previous(&self) -> Result<()> {
        let mut state = self.inner.lock()?;
        let len = state.registry.len();
        state.carousel.previous(len);
        self.inner.notify();
        Ok(())
    }

    pub fn refresh_now(&self) -> Result<()> {
        let state = self.inner.lock()?;
        self.inner.fetcher.refresh_all(state.registry.list());
        Ok(())
    }

    pub fn toggle_settings(&self) -> Result<ViewMode> {
        let mut state = self.inner.lock()?;
        let settings = state.mode == ViewMode::Active;
        self.inner.switch_mode(&mut state, settings);
        Ok(state.mode)
    }

    pub fn set_settings_mode(&self, settings: bool) -> Result<()> {
        let mut state = self.inner.lock()?;
        self.inner.switch_mode(&mut state, settings);
        Ok(())
    }

    pub fn begin_add(&self) -> Result<()> {
        let mut state = self.inner.lock()?;
        let draft = ProfileInput::new_entry(
            &self.inner.config.default_endpoint_url,
            &self.inner.config.default_user_id,
        );
        state.editing = Some(EditSession {
            target: FormTarget::New,
            draft,
        });
        self.inner.switch_mode(&mut state, true);
        self.inner.notify();
        Ok(())
    }

    /// Returns `false` for an unknown id; the form stays as it was.
    pub fn begin_edit(&self, account_id: &str) -> Result<bool> {
        let mut state = self.inner.lock()?;
        let Some(draft) = state.registry.get(account_id).map(AccountProfile::input) else {
            return Ok(false);
        };
        state.editing = Some(EditSession {
            target: FormTarget::Existing(account_id.to_string()),
            draft,
        });
        self.inner.switch_mode(&mut state, true);
        self.inner.notify();
        Ok(true)
    }

    pub fn update_draft(&self, draft: ProfileInput) -> Result<bool> {
        let mut state = self.inner.lock()?;
        let Some(session) = state.editing.as_mut() else {
            return Ok(false);
        };
        session.draft = draft;
        self.inner.notify();
        Ok(true)
    }

    pub fn cancel_form(&self) -> Result<bool> {
        let mut state = self.inner.lock()?;
        let closed = state.editing.take().is_some();
        if closed {
            self.inner.notify();
        }
        Ok(closed)
    }

    /// Commits the open form. A validation error keeps the form open with its
    /// draft; saving over an account deleted meanwhile just closes the form.
    pub fn save_form(&self) -> Result<Option<AccountProfile>> {
        let mut state = self.inner.lock()?;
        let Some(session) = state.editing.clone() else {
            return Ok(None);
        };
        let previous_len = state.registry.len();

        let saved = match &session.target {
            FormTarget::New => Some(state.registry.add(session.draft)?),
            FormTarget::Existing(account_id) => {
                if state.registry.update(account_id, session.draft)? {
                    state.registry.get(account_id).cloned()
                } else {
                    None
                }
            }
        };

        state.editing = None;
        self.inner.after_list_change(&mut state, previous_len);
        Ok(saved)
    }

    pub fn add_account(&self, input: ProfileInput) -> Result<AccountProfile> {
        let mut state = self.inner.lock()?;
        let previous_len = state.registry.len();
        let account = state.registry.add(input)?;
        log::info!("[dashboard] added account {}", account.name);
        self.inner.after_list_change(&mut state, previous_len);
        Ok(account)
    }

    pub fn update_account(&self, account_id: &str, input: ProfileInput) -> Result<bool> {
        let mut state = self.inner.lock()?;
        let previous_len = state.registry.len();
        let updated = state.registry.update(account_id, input)?;
        if updated {
            self.inner.after_list_change(&mut state, previous_len);
        }
        Ok(updated)
    }

    pub fn remove_account(&self, account_id: &str) -> Result<Option<AccountProfile>> {
        let mut state = self.inner.lock()?;
        let previous_len = state.registry.len();
        let Some(removed) = state.registry.remove(account_id)? else {
            return Ok(None);
        };

        self.inner.fetcher.forget(&removed.id);
        let editing_removed = matches!(
            state.editing.as_ref().map(|session| &session.target),
            Some(FormTarget::Existing(id)) if *id == removed.id
        );
        if editing_removed {
            state.editing = None;
        }
        log::info!("[dashboard] removed account {}", removed.name);
        self.inner.after_list_change(&mut state, previous_len);
        Ok(Some(removed))
    }
}

impl DashboardInner {
    fn lock(&self) -> Result<MutexGuard<'_, DashboardState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::Store("dashboard state mutex poisoned".to_string()))
    }

    fn notify(&self) {
        notify_change(&self.changes);
    }

    fn switch_mode(self: &Arc<Self>, state: &mut DashboardState, settings: bool) {
        let target = if settings {
            ViewMode::Settings
        } else {
            ViewMode::Active
        };
        if state.mode == target {
            return;
        }
        state.mode = target;

        if settings {
            state.scheduler.disarm_all();
            log::debug!("[dashboard] settings opened, timers suspended");
        } else {
            state.editing = None;
            self.start_refresh(state);
            log::debug!("[dashboard] settings closed, timers resumed");
        }
        self.sync_rotation(state);
        self.notify();
    }

    fn after_list_change(self: &Arc<Self>, state: &mut DashboardState, previous_len: usize) {
        let len = state.registry.len();
        state.carousel.repair(len);
        if state.mode == ViewMode::Active {
            self.start_refresh(state);
        }
        if len != previous_len {
            self.sync_rotation(state);
        }
        self.notify();
    }

    /// Immediate refresh of every account, then the periodic timer.
    fn start_refresh(self: &Arc<Self>, state: &mut DashboardState) {
        self.fetcher.refresh_all(state.registry.list());

        let weak = Arc::downgrade(self);
        state
            .scheduler
            .arm_refresh(self.config.refresh_interval, move || refresh_tick(&weak));
    }

    fn sync_rotation(self: &Arc<Self>, state: &mut DashboardState) {
        if state.mode == ViewMode::Active && state.registry.len() > 1 {
            let weak = Arc::downgrade(self);
            state
                .scheduler
                .arm_rotation(self.config.rotation_interval, move || rotation_tick(&weak));
        } else {
            state.scheduler.disarm_rotation();
        }
    }
}

fn refresh_tick(weak: &Weak<DashboardInner>) -> bool {
    let Some(inner) = weak.upgrade() else {
        return false;
    };
    let Ok(state) = inner.state.lock() else {
        log::error!("[dashboard] state mutex poisoned, skipping refresh tick");
        return true;
    };
    if state.mode == ViewMode::Active {
        inner.fetcher.refresh_all(state.registry.list());
    }
    true
}

fn rotation_tick(weak: &Weak<DashboardInner>) -> bool {
    let Some(inner) = weak.upgrade() else {
        return false;
    };
    let Ok(mut state) = inner.state.lock() else {
        log::error!("[dashboard] state mutex poisoned, skipping rotation tick");
        return true;
    };
    let len = state.registry.len();
    if state.mode == ViewMode::Active && len > 1 {
        state.carousel.next(len);
        inner.notify();
    }
    true
}
