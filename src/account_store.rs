use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{BackendError, Result};
use crate::models::{
    normalize_string, validate_profile_input, AccountProfile, ProfileInput, DEFAULT_USER_ID,
};
use crate::storage::KeyValueStore;
use crate::utils::now_rfc3339;

pub const SITES_KEY: &str = "newapi_sites";
pub const LEGACY_URL_KEY: &str = "newapi_url";
pub const LEGACY_COOKIE_KEY: &str = "newapi_cookie";
pub const LEGACY_USER_ID_KEY: &str = "newapi_userid";
const LEGACY_PROFILE_NAME: &str = "Default Site";

/// Ordered list of account profiles, persisted in full on every mutation.
pub struct AccountRegistry {
    storage: Arc<dyn KeyValueStore>,
    accounts: Vec<AccountProfile>,
}

impl std::fmt::Debug for AccountRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRegistry")
            .field("accounts", &self.accounts.len())
            .finish()
    }
}

impl AccountRegistry {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let accounts = match storage.get(SITES_KEY)? {
            Some(contents) => parse_accounts(&contents)?,
            None => {
                let migrated = migrate_legacy(storage.as_ref())?;
                if !migrated.is_empty() {
                    log::info!("[registry] migrated legacy single-site settings");
                    storage.set(SITES_KEY, &serde_json::to_string(&migrated)?)?;
                }
                migrated
            }
        };

        Ok(Self { storage, accounts })
    }

    pub fn list(&self) -> &[AccountProfile] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, account_id: &str) -> Option<&AccountProfile> {
        self.accounts.iter().find(|account| account.id == account_id)
    }

    pub fn add(&mut self, input: ProfileInput) -> Result<AccountProfile> {
        validate_profile_input(&input).map_err(BackendError::Validation)?;
        let input = input.normalized();

        let now = now_rfc3339();
        let account = AccountProfile {
            id: self.fresh_id(),
            name: input.name,
            endpoint_url: input.endpoint_url,
            auth_cookie: input.auth_cookie,
            user_id: input.user_id,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };

        let mut next = self.accounts.clone();
        next.push(account.clone());
        self.commit(next)?;
        Ok(account)
    }

    /// Returns `false` when no account has `account_id`; nothing is validated
    /// or written then.
    pub fn update(&mut self, account_id: &str, input: ProfileInput) -> Result<bool> {
        let Some(index) = self.position(account_id) else {
            return Ok(false);
        };
        validate_profile_input(&input).map_err(BackendError::Validation)?;
        let input = input.normalized();

        let mut next = self.accounts.clone();
        let account = &mut next[index];
        account.name = input.name;
        account.endpoint_url = input.endpoint_url;
        account.auth_cookie = input.auth_cookie;
        account.user_id = input.user_id;
        account.updated_at = Some(now_rfc3339());
        self.commit(next)?;
        Ok(true)
    }

    pub fn remove(&mut self, account_id: &str) -> Result<Option<AccountProfile>> {
        let Some(index) = self.position(account_id) else {
            return Ok(None);
        };

        let mut next = self.accounts.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(Some(removed))
    }

    fn position(&self, account_id: &str) -> Option<usize> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return None;
        }
        self.accounts
            .iter()
            .position(|account| account.id == account_id)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }

    /// Persists `next` first; the in-memory list only changes once the write succeeded.
    fn commit(&mut self, next: Vec<AccountProfile>) -> Result<()> {
        let serialized = serde_json::to_string(&next)?;
        self.storage.set(SITES_KEY, &serialized)?;
        self.accounts = next;
        Ok(())
    }
}

fn parse_accounts(contents: &str) -> Result<Vec<AccountProfile>> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    let accounts = serde_json::from_str::<Vec<AccountProfile>>(contents)?;

    let mut seen = HashSet::new();
    let total = accounts.len();
    let accounts = accounts
        .into_iter()
        .filter(|account| seen.insert(account.id.clone()))
        .collect::<Vec<_>>();
    if accounts.len() != total {
        log::warn!(
            "[registry] dropped {} account(s) with duplicate ids",
            total - accounts.len()
        );
    }
    Ok(accounts)
}

fn migrate_legacy(storage: &dyn KeyValueStore) -> Result<Vec<AccountProfile>> {
    let Some(url) = storage.get(LEGACY_URL_KEY)?.and_then(|url| normalize_string(&url)) else {
        return Ok(Vec::new());
    };
    let cookie = storage.get(LEGACY_COOKIE_KEY)?.unwrap_or_default();
    let user_id = storage
        .get(LEGACY_USER_ID_KEY)?
        .and_then(|value| normalize_string(&value))
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    let now = now_rfc3339();
    Ok(vec![AccountProfile {
        id: Uuid::new_v4().to_string(),
        name: LEGACY_PROFILE_NAME.to_string(),
        endpoint_url: url,
        auth_cookie: cookie,
        user_id,
        created_at: Some(now.clone()),
        updated_at: Some(now),
    }])
}
