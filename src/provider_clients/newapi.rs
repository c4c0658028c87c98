use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use url::Url;

use crate::error::{BackendError, Result};
use crate::provider_clients::{format_http_error, ApiEnvelope, ClientFuture, RemoteTarget, UsageClient};
use crate::utils::DayWindow;

const BALANCE_PATH: &str = "api/user/self";
const USAGE_STAT_PATH: &str = "api/log/self/stat";
/// Browser request headers some consoles check behind bot protection.
const BROWSER_HEADERS: [(&str, &str); 9] = [
    ("accept-language", "zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("dnt", "1"),
    ("priority", "u=1, i"),
    (
        "sec-ch-ua",
        "\"Google Chrome\";v=\"143\", \"Chromium\";v=\"143\", \"Not A(Brand\";v=\"24\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
];
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Cookie-authenticated client for new-api style consoles.
#[derive(Debug, Clone)]
pub struct NewApiClient {
    http: Client,
}

impl NewApiClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            .build()
            .map_err(|err| BackendError::Provider(format!("HTTP client setup failed: {err}")))?;
        Ok(Self { http })
    }

    async fn get_envelope(&self, target: &RemoteTarget, url: Url) -> Result<ApiEnvelope> {
        let headers = build_headers(target)?;
        let response = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|err| BackendError::Provider(format!("Request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| BackendError::Provider(format!("Read body failed: {err}")))?;
        if !status.is_success() {
            return Err(BackendError::Provider(format_http_error(status, &body)));
        }

        serde_json::from_str::<ApiEnvelope>(&body)
            .map_err(|err| BackendError::Provider(format!("Invalid response: {err}")))
    }
}

impl UsageClient for NewApiClient {
    fn fetch_balance<'a>(&'a self, target: &'a RemoteTarget) -> ClientFuture<'a> {
        Box::pin(async move {
            let url = balance_url(&target.endpoint_url)?;
            self.get_envelope(target, url).await
        })
    }

    fn fetch_usage<'a>(
        &'a self,
        target: &'a RemoteTarget,
        window: DayWindow,
    ) -> ClientFuture<'a> {
        Box::pin(async move {
            let url = usage_stat_url(&target.endpoint_url, window)?;
            self.get_envelope(target, url).await
        })
    }
}

fn build_headers(target: &RemoteTarget) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "accept",
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("user-agent", HeaderValue::from_static(USER_AGENT));
    for (name, value) in BROWSER_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers.insert(
        "new-api-user",
        HeaderValue::from_str(target.user_id.trim())
            .map_err(|_| BackendError::Provider("Invalid User ID".to_string()))?,
    );
    let referer = format!("{}/console", target.endpoint_url.trim().trim_end_matches('/'));
    headers.insert(
        "referer",
        HeaderValue::from_str(&referer)
            .map_err(|_| BackendError::Provider("Invalid URL".to_string()))?,
    );
    headers.insert(
        "cookie",
        HeaderValue::from_str(&target.auth_cookie)
            .map_err(|_| BackendError::Provider("Invalid Cookie".to_string()))?,
    );
    Ok(headers)
}

fn balance_url(endpoint_url: &str) -> Result<Url> {
    endpoint_with_path(endpoint_url, BALANCE_PATH)
}

fn usage_stat_url(endpoint_url: &str, window: DayWindow) -> Result<Url> {
    let mut url = endpoint_with_path(endpoint_url, USAGE_STAT_PATH)?;
    url.query_pairs_mut()
        .append_pair("type", "2")
        .append_pair("token_name", "")
        .append_pair("model_name", "")
        .append_pair("start_timestamp", &window.start.to_string())
        .append_pair("end_timestamp", &window.end.to_string())
        .append_pair("group", "");
    Ok(url)
}

fn endpoint_with_path(endpoint_url: &str, path: &str) -> Result<Url> {
    let mut url = parse_url(endpoint_url)
        .ok_or_else(|| BackendError::Provider(format!("Invalid URL: {}", endpoint_url.trim())))?;
    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}/{path}"));
    url.set_query(None);
    Ok(url)
}

fn parse_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        if url.has_host() {
            return Some(url);
        }
    }
    let with_scheme = format!("https://{trimmed}");
    Url::parse(&with_scheme).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(endpoint_url: &str, cookie: &str, user_id: &str) -> RemoteTarget {
        RemoteTarget {
            endpoint_url: endpoint_url.to_string(),
            auth_cookie: cookie.to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn balance_url_appends_path_once() {
        let url = balance_url("https://api.example.com/").expect("url should build");
        assert_eq!(url.as_str(), "https://api.example.com/api/user/self");

        let url = balance_url("api.example.com").expect("bare host should get a scheme");
        assert_eq!(url.as_str(), "https://api.example.com/api/user/self");

        let url = balance_url("https://example.com/proxy").expect("base path should be kept");
        assert_eq!(url.as_str(), "https://example.com/proxy/api/user/self");
    }

    #[test]
    fn usage_url_carries_day_window() {
        let url = usage_stat_url(
            "https://api.example.com",
            DayWindow {
                start: 1_700_000_000,
                end: 1_700_050_000,
            },
        )
        .expect("url should build");
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/log/self/stat?type=2&token_name=&model_name=&start_timestamp=1700000000&end_timestamp=1700050000&group="
        );
    }

    #[test]
    fn blank_endpoint_is_rejected() {
        let err = balance_url("   ").expect_err("blank url should fail");
        assert!(err.to_string().starts_with("Invalid URL"));
    }

    #[test]
    fn headers_identify_the_user() {
        let headers = build_headers(&target("https://api.example.com/", "session=abc", "39"))
            .expect("headers should build");
        assert_eq!(headers["new-api-user"], "39");
        assert_eq!(headers["referer"], "https://api.example.com/console");
        assert_eq!(headers["cookie"], "session=abc");
    }

    #[test]
    fn headers_look_like_the_browser_console() {
        let headers = build_headers(&target("https://api.example.com", "session=abc", "39"))
            .expect("headers should build");
        assert_eq!(headers["cache-control"], "no-store");
        assert_eq!(headers["dnt"], "1");
        assert_eq!(headers["sec-fetch-mode"], "cors");
        assert_eq!(headers["sec-ch-ua-platform"], "\"Windows\"");
        assert!(headers["user-agent"].to_str().expect("ascii").contains("Chrome/143"));
        assert!(headers.contains_key("accept-language"));
    }

    #[test]
    fn control_characters_in_cookie_are_rejected() {
        let err = build_headers(&target("https://api.example.com", "a\nb", "39"))
            .expect_err("newline in cookie should fail");
        assert_eq!(err.to_string(), "Invalid Cookie");

        let err = build_headers(&target("https://api.example.com", "a", "3\r9"))
            .expect_err("newline in user id should fail");
        assert_eq!(err.to_string(), "Invalid User ID");
    }
}
