use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_NAME: &str = "New Site";
pub const DEFAULT_ENDPOINT_URL: &str = "https://api.husanai.com";
pub const DEFAULT_USER_ID: &str = "39";

/// A configured console account. Field names on disk match the widget's
/// `newapi_sites` payload, so lists saved by older builds load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: String,
    pub name: String,
    #[serde(rename = "url")]
    pub endpoint_url: String,
    #[serde(rename = "cookie")]
    pub auth_cookie: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl AccountProfile {
    pub fn input(&self) -> ProfileInput {
        ProfileInput {
            name: self.name.clone(),
            endpoint_url: self.endpoint_url.clone(),
            auth_cookie: self.auth_cookie.clone(),
            user_id: self.user_id.clone(),
        }
    }

    pub fn masked_cookie(&self) -> String {
        mask_secret(&self.auth_cookie)
    }
}

/// The user-editable part of a profile; doubles as the settings form draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub name: String,
    #[serde(rename = "url")]
    pub endpoint_url: String,
    #[serde(rename = "cookie")]
    pub auth_cookie: String,
    pub user_id: String,
}

impl ProfileInput {
    pub fn new_entry(endpoint_url: &str, user_id: &str) -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            endpoint_url: endpoint_url.to_string(),
            auth_cookie: String::new(),
            user_id: user_id.to_string(),
        }
    }

    /// Trims the plain-text fields. The cookie is kept verbatim and trimmed
    /// only when a request is built.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            endpoint_url: self.endpoint_url.trim().to_string(),
            auth_cookie: self.auth_cookie.clone(),
            user_id: self.user_id.trim().to_string(),
        }
    }
}

impl Default for ProfileInput {
    fn default() -> Self {
        Self::new_entry(DEFAULT_ENDPOINT_URL, DEFAULT_USER_ID)
    }
}

pub fn normalize_optional_string(input: Option<String>) -> Option<String> {
    input.and_then(|value| normalize_string(&value))
}

pub fn normalize_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn validate_profile_input(input: &ProfileInput) -> Result<(), String> {
    let required = [
        ("name", &input.name),
        ("url", &input.endpoint_url),
        ("cookie", &input.auth_cookie),
        ("userId", &input.user_id),
    ];
    for (field, value) in required {
        if normalize_string(value).is_none() {
            return Err(format!("{field} is required"));
        }
    }
    Ok(())
}

pub fn mask_secret(value: &str) -> String {
    let trimmed = value.trim();
    let visible = trimmed.chars().take(4).collect::<String>();
    if trimmed.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, url: &str, cookie: &str, user_id: &str) -> ProfileInput {
        ProfileInput {
            name: name.to_string(),
            endpoint_url: url.to_string(),
            auth_cookie: cookie.to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn validation_requires_every_field() {
        assert!(validate_profile_input(&input("Main", "https://a", "sid=1", "39")).is_ok());

        let err = validate_profile_input(&input("  ", "https://a", "sid=1", "39"))
            .expect_err("blank name should fail");
        assert_eq!(err, "name is required");

        let err = validate_profile_input(&input("Main", "https://a", " \n", "39"))
            .expect_err("blank cookie should fail");
        assert_eq!(err, "cookie is required");

        assert!(validate_profile_input(&input("Main", "https://a", "sid=1", "")).is_err());
        assert!(validate_profile_input(&input("Main", "", "sid=1", "39")).is_err());
    }

    #[test]
    fn profile_uses_widget_field_names() {
        let raw = r#"[{"id":"1700000000000","name":"Default Site","url":"https://api.husanai.com","cookie":"session=abc","userId":"39"}]"#;
        let profiles: Vec<AccountProfile> =
            serde_json::from_str(raw).expect("legacy list should parse");
        assert_eq!(profiles[0].endpoint_url, "https://api.husanai.com");
        assert_eq!(profiles[0].auth_cookie, "session=abc");
        assert_eq!(profiles[0].created_at, None);

        let serialized = serde_json::to_value(&profiles[0]).expect("profile should serialize");
        assert_eq!(serialized["userId"], "39");
        assert!(serialized.get("createdAt").is_none());
    }

    #[test]
    fn normalized_keeps_cookie_verbatim() {
        let normalized = input(" Main ", " https://a ", " sid=1 ", " 39 ").normalized();
        assert_eq!(normalized.name, "Main");
        assert_eq!(normalized.endpoint_url, "https://a");
        assert_eq!(normalized.auth_cookie, " sid=1 ");
        assert_eq!(normalized.user_id, "39");
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret("session=abcdef"), "sess****");
        assert_eq!(mask_secret("abc"), "****");
    }
}
