use serde::Serialize;

use crate::fetch::FetchState;
use crate::models::{AccountProfile, ProfileInput};

/// Raw quota units per US dollar on new-api consoles.
pub const QUOTA_PER_DOLLAR: f64 = 500_000.0;

pub fn format_money(quota: f64) -> String {
    format!("${:.3}", quota / QUOTA_PER_DOLLAR)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    Active,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum FormTarget {
    New,
    Existing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSession {
    pub target: FormTarget,
    pub draft: ProfileInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
}

/// Where the card sits in the carousel, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPosition {
    pub index: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum RenderState {
    Empty,
    List {
        accounts: Vec<AccountSummary>,
    },
    Form {
        target: FormTarget,
        draft: ProfileInput,
    },
    #[serde(rename_all = "camelCase")]
    Loading {
        account_name: String,
        position: CardPosition,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        account_name: String,
        message: String,
        position: CardPosition,
    },
    #[serde(rename_all = "camelCase")]
    Data {
        account_name: String,
        used_today: String,
        balance: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_updated: Option<String>,
        position: CardPosition,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ViewInput<'a> {
    pub accounts: &'a [AccountProfile],
    pub current_index: usize,
    pub mode: ViewMode,
    pub editing: Option<&'a EditSession>,
    pub current_state: Option<&'a FetchState>,
}

/// An open form wins over everything else, so the first account can be
/// added from an empty list.
pub fn select_view(input: ViewInput<'_>) -> RenderState {
    if let Some(session) = input.editing {
        return RenderState::Form {
            target: session.target.clone(),
            draft: session.draft.clone(),
        };
    }

    if input.accounts.is_empty() {
        return RenderState::Empty;
    }

    if input.mode == ViewMode::Settings {
        return RenderState::List {
            accounts: input
                .accounts
                .iter()
                .map(|account| AccountSummary {
                    id: account.id.clone(),
                    name: account.name.clone(),
                })
                .collect(),
        };
    }

    let index = if input.current_index < input.accounts.len() {
        input.current_index
    } else {
        0
    };
    card_view(
        &input.accounts[index],
        input.current_state,
        CardPosition {
            index,
            total: input.accounts.len(),
        },
    )
}

pub fn card_view(
    profile: &AccountProfile,
    state: Option<&FetchState>,
    position: CardPosition,
) -> RenderState {
    let account_name = profile.name.clone();

    if let Some(message) = state
        .and_then(|state| state.error_message.as_deref())
        .filter(|message| !message.trim().is_empty())
    {
        return RenderState::Error {
            account_name,
            message: message.to_string(),
            position,
        };
    }

    match state {
        Some(state) if !state.is_loading() => RenderState::Data {
            account_name,
            used_today: format_money(state.used_today),
            balance: format_money(state.balance),
            last_updated: state.last_updated.clone(),
            position,
        },
        _ => RenderState::Loading {
            account_name,
            position,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchStatus, QuotaReading};

    fn account(id: &str, name: &str) -> AccountProfile {
        AccountProfile {
            id: id.to_string(),
            name: name.to_string(),
            endpoint_url: "https://api.example.com".to_string(),
            auth_cookie: "session=abc".to_string(),
            user_id: "39".to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    fn input<'a>(
        accounts: &'a [AccountProfile],
        mode: ViewMode,
        editing: Option<&'a EditSession>,
        current_state: Option<&'a FetchState>,
    ) -> ViewInput<'a> {
        ViewInput {
            accounts,
            current_index: 0,
            mode,
            editing,
            current_state,
        }
    }

    #[test]
    fn money_uses_fixed_scale_and_three_decimals() {
        assert_eq!(format_money(1_500_000.0), "$3.000");
        assert_eq!(format_money(0.0), "$0.000");
        assert_eq!(format_money(250_000.0), "$0.500");
        assert_eq!(format_money(123_456.0), "$0.247");
    }

    #[test]
    fn empty_list_shows_empty_view_in_both_modes() {
        assert_eq!(select_view(input(&[], ViewMode::Active, None, None)), RenderState::Empty);
        assert_eq!(select_view(input(&[], ViewMode::Settings, None, None)), RenderState::Empty);
    }

    #[test]
    fn open_form_is_shown_even_for_an_empty_list() {
        let session = EditSession {
            target: FormTarget::New,
            draft: ProfileInput::default(),
        };
        let view = select_view(input(&[], ViewMode::Settings, Some(&session), None));
        assert_eq!(
            view,
            RenderState::Form {
                target: FormTarget::New,
                draft: ProfileInput::default(),
            }
        );
    }

    #[test]
    fn settings_mode_lists_accounts() {
        let accounts = vec![account("1", "Main"), account("2", "Backup")];
        let view = select_view(input(&accounts, ViewMode::Settings, None, None));
        let RenderState::List { accounts } = view else {
            panic!("expected list view");
        };
        assert_eq!(accounts[1].name, "Backup");
    }

    #[test]
    fn missing_or_loading_state_shows_loading() {
        let accounts = vec![account("1", "Main")];
        let view = select_view(input(&accounts, ViewMode::Active, None, None));
        assert!(matches!(view, RenderState::Loading { .. }));

        let loading = FetchState::loading(None);
        let view = select_view(input(&accounts, ViewMode::Active, None, Some(&loading)));
        assert!(matches!(view, RenderState::Loading { .. }));
    }

    #[test]
    fn error_takes_precedence_over_loading() {
        let accounts = vec![account("1", "Main")];
        let mut state = FetchState::failure("invalid session");
        state.status = FetchStatus::Loading;

        let view = select_view(input(&accounts, ViewMode::Active, None, Some(&state)));
        assert_eq!(
            view,
            RenderState::Error {
                account_name: "Main".to_string(),
                message: "invalid session".to_string(),
                position: CardPosition { index: 0, total: 1 },
            }
        );
    }

    #[test]
    fn success_shows_formatted_numbers() {
        let accounts = vec![account("1", "Main"), account("2", "Backup")];
        let state = FetchState::success(QuotaReading {
            balance: 1_500_000.0,
            used_today: 250_000.0,
        });
        let mut view_input = input(&accounts, ViewMode::Active, None, Some(&state));
        view_input.current_index = 1;

        let RenderState::Data {
            account_name,
            used_today,
            balance,
            position,
            ..
        } = select_view(view_input)
        else {
            panic!("expected data view");
        };
        assert_eq!(account_name, "Backup");
        assert_eq!(used_today, "$0.500");
        assert_eq!(balance, "$3.000");
        assert_eq!(position, CardPosition { index: 1, total: 2 });
    }
}
