use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::history::{HistoryPage, HistoryPager, PAGE_SIZE};

const API_BASE: &str = "https://slack.com/api";
const LIST_PAGE_SIZE: u32 = 200;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A conversation in scope for archiving: the raw listing payload kept for
/// provenance, plus the id and the name its snapshot file is keyed by.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub name: String,
    pub info: Value,
}

/// Thin blocking wrapper over the Slack Web API. Payloads are kept as raw
/// JSON objects: messages are open field sets and the snapshot format stores
/// them verbatim.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    token: String,
}

impl ApiClient {
    /// Build a client and validate the credential, before any download
    /// starts, via `auth.test`.
    pub fn new(token: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::SlackApi(e.to_string()))?;
        let client = Self {
            http,
            token: token.to_string(),
        };
        if client.call("auth.test", &[]).is_err() {
            return Err(AppError::AuthenticationFailed);
        }
        Ok(client)
    }

    /// GET one Web API method and unwrap the response envelope. Slack reports
    /// failures in-band with `"ok": false` plus an `error` code, so both the
    /// HTTP status and the envelope are checked.
    fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let response = self
            .http
            .get(format!("{API_BASE}/{method}"))
            .bearer_auth(&self.token)
            .query(&params)
            .send()
            .map_err(|e| AppError::SlackApi(format!("{method}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::SlackApi(format!("{method}: HTTP {status}")));
        }
        let body: Value = response
            .json()
            .map_err(|e| AppError::SlackApi(format!("{method}: {e}")))?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(AppError::SlackApi(format!("{method}: {reason}")));
        }
        Ok(body)
    }

    fn next_cursor(body: &Value) -> Option<String> {
        body.get("response_metadata")
            .and_then(|meta| meta.get("next_cursor"))
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string)
    }

    /// Full id→display-name mapping for the workspace.
    pub fn list_users(&self) -> Result<BTreeMap<String, String>> {
        let mut users = BTreeMap::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![("limit", LIST_PAGE_SIZE.to_string())];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }
            let body = self.call("users.list", &params)?;
            for member in body
                .get("members")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                if let (Some(id), Some(name)) = (
                    member.get("id").and_then(Value::as_str),
                    member.get("name").and_then(Value::as_str),
                ) {
                    users.insert(id.to_string(), name.to_string());
                }
            }
            cursor = Self::next_cursor(&body);
            if cursor.is_none() {
                break;
            }
        }
        Ok(users)
    }

    fn list_conversations(&self, types: &str) -> Result<Vec<Value>> {
        let mut conversations = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![
                ("limit", LIST_PAGE_SIZE.to_string()),
                ("types", types.to_string()),
            ];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }
            let body = self.call("conversations.list", &params)?;
            if let Some(channels) = body.get("channels").and_then(Value::as_array) {
                conversations.extend(channels.iter().cloned());
            }
            cursor = Self::next_cursor(&body);
            if cursor.is_none() {
                break;
            }
        }
        Ok(conversations)
    }

    /// Raw public channel listings.
    pub fn list_channels(&self) -> Result<Vec<Value>> {
        self.list_conversations("public_channel")
    }

    /// Raw private channel listings.
    pub fn list_groups(&self) -> Result<Vec<Value>> {
        self.list_conversations("private_channel")
    }

    /// Raw direct-message thread listings.
    pub fn list_dm_threads(&self) -> Result<Vec<Value>> {
        self.list_conversations("im")
    }

    /// One page of a conversation's history, newest first, strictly older
    /// than `older_than` when given (`latest` is exclusive). `oldest=0` pins
    /// the epoch floor.
    pub fn fetch_history_page(
        &self,
        channel_id: &str,
        older_than: Option<&str>,
    ) -> Result<HistoryPage> {
        let mut params = vec![
            ("channel", channel_id.to_string()),
            ("oldest", "0".to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        if let Some(ts) = older_than {
            params.push(("latest", ts.to_string()));
        }
        let body = self.call("conversations.history", &params)?;
        let messages = body
            .get("messages")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let has_more = body
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(HistoryPage { messages, has_more })
    }

    /// Pager over one conversation, for feeding a `HistoryIter`.
    pub fn history_pager(&self, channel_id: &str) -> ChannelPager<'_> {
        ChannelPager {
            api: self,
            channel_id: channel_id.to_string(),
        }
    }
}

/// `HistoryPager` backed by `conversations.history`.
pub struct ChannelPager<'a> {
    api: &'a ApiClient,
    channel_id: String,
}

impl HistoryPager for ChannelPager<'_> {
    fn fetch_page(&mut self, older_than: Option<&str>) -> Result<HistoryPage> {
        self.api.fetch_history_page(&self.channel_id, older_than)
    }
}

fn conversation_name(info: &Value) -> String {
    info.get("name")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

fn conversation(info: Value, name: String) -> Option<Conversation> {
    let id = info.get("id").and_then(Value::as_str)?.to_string();
    Some(Conversation { id, name, info })
}

/// Public channels the authenticated account is a member of. A missing
/// `is_member` flag counts as not a member.
pub fn member_channels(raw: Vec<Value>) -> Vec<Conversation> {
    raw.into_iter()
        .filter(|info| {
            info.get("is_member")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .filter_map(|info| {
            let name = conversation_name(&info);
            conversation(info, name)
        })
        .collect()
}

/// Private channels, keyed by their own names. No membership filter: the
/// listing only ever contains private channels the account belongs to.
pub fn named_channels(raw: Vec<Value>) -> Vec<Conversation> {
    raw.into_iter()
        .filter_map(|info| {
            let name = conversation_name(&info);
            conversation(info, name)
        })
        .collect()
}

/// Direct-message threads, each keyed by the peer's display name. The user
/// directory is fetched before any listing, so an unknown peer id is
/// unexpected and treated as an error.
pub fn dm_threads(raw: Vec<Value>, users: &BTreeMap<String, String>) -> Result<Vec<Conversation>> {
    let mut threads = Vec::new();
    for info in raw {
        let Some(id) = info.get("id").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        let peer = info
            .get("user")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let name = users
            .get(&peer)
            .cloned()
            .ok_or(AppError::UnknownUser(peer))?;
        threads.push(Conversation { id, name, info });
    }
    Ok(threads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_channels_filters_non_members() {
        let raw = vec![
            json!({"id": "C1", "name": "general", "is_member": true}),
            json!({"id": "C2", "name": "random", "is_member": false}),
            json!({"id": "C3", "name": "no-flag"}),
        ];

        let channels = member_channels(raw);

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, "C1");
        assert_eq!(channels[0].name, "general");
    }

    #[test]
    fn test_member_channels_keeps_raw_payload() {
        let raw = vec![json!({"id": "C1", "name": "general", "is_member": true, "topic": "hi"})];
        let channels = member_channels(raw);
        assert_eq!(
            channels[0].info.get("topic").and_then(Value::as_str),
            Some("hi")
        );
    }

    #[test]
    fn test_named_channels_keeps_everything_with_an_id() {
        let raw = vec![
            json!({"id": "G1", "name": "secret-plans"}),
            json!({"name": "no-id-entry"}),
        ];

        let channels = named_channels(raw);

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "secret-plans");
    }

    #[test]
    fn test_channel_name_falls_back_to_unknown() {
        let channels = named_channels(vec![json!({"id": "G1"})]);
        assert_eq!(channels[0].name, "unknown");
    }

    #[test]
    fn test_dm_threads_resolve_peer_names() {
        let users = BTreeMap::from([
            ("U01000".to_string(), "marie_curie".to_string()),
            ("U02000".to_string(), "sophie_wilson".to_string()),
        ]);
        let raw = vec![
            json!({"id": "D1", "user": "U01000"}),
            json!({"id": "D2", "user": "U02000"}),
        ];

        let threads = dm_threads(raw, &users).unwrap();

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].name, "marie_curie");
        assert_eq!(threads[1].name, "sophie_wilson");
    }

    #[test]
    fn test_dm_threads_unknown_peer_is_an_error() {
        let users = BTreeMap::new();
        let err = dm_threads(vec![json!({"id": "D1", "user": "U99999"})], &users).unwrap_err();
        assert!(matches!(err, AppError::UnknownUser(id) if id == "U99999"));
    }

    #[test]
    fn test_dm_threads_skip_entries_without_id() {
        let users = BTreeMap::from([("U01000".to_string(), "marie_curie".to_string())]);
        let threads = dm_threads(vec![json!({"user": "U01000"})], &users).unwrap();
        assert!(threads.is_empty());
    }

    #[test]
    fn test_next_cursor_present() {
        let body = json!({"response_metadata": {"next_cursor": "dXNlcjpVMDYxTkZUVDI="}});
        assert_eq!(
            ApiClient::next_cursor(&body),
            Some("dXNlcjpVMDYxTkZUVDI=".to_string())
        );
    }

    #[test]
    fn test_next_cursor_empty_or_absent() {
        assert_eq!(
            ApiClient::next_cursor(&json!({"response_metadata": {"next_cursor": ""}})),
            None
        );
        assert_eq!(ApiClient::next_cursor(&json!({"ok": true})), None);
    }
}
