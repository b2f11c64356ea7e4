use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::timestamp::format_ts;

/// Number of messages requested per history page.
pub const PAGE_SIZE: u32 = 1000;

/// One page of raw history messages plus whether older pages remain.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<Value>,
    pub has_more: bool,
}

/// Capability to fetch one page of a conversation's history, bounded above by
/// an exclusive `ts` cursor. `None` means "start from the most recent page".
pub trait HistoryPager {
    fn fetch_page(&mut self, older_than: Option<&str>) -> Result<HistoryPage>;
}

impl<P: HistoryPager + ?Sized> HistoryPager for &mut P {
    fn fetch_page(&mut self, older_than: Option<&str>) -> Result<HistoryPage> {
        (**self).fetch_page(older_than)
    }
}

/// The `ts` field of a raw message, or "" when absent.
pub fn message_ts(message: &Value) -> &str {
    message.get("ts").and_then(Value::as_str).unwrap_or("")
}

/// Sort messages newest first. Slack orders `ts` tokens as strings, so the
/// comparison here is over the raw token, not its numeric value. The sort is
/// stable: records sharing a `ts` keep their relative order.
pub fn sort_newest_first(messages: &mut [Value]) {
    messages.sort_by(|a, b| message_ts(b).cmp(message_ts(a)));
}

/// Lazy newest-first walk over one conversation's history.
///
/// Explicit state machine: an exclusive upper-bound cursor, the buffered
/// remainder of the current page, and an exhausted flag. Each page is fetched
/// only when the previous one has been fully consumed, so a consumer that
/// stops iterating early saves the remaining network round-trips. The
/// sequence is finite and not restartable; build a new one to re-walk from
/// the top.
pub struct HistoryIter<'a, P> {
    pager: P,
    users: &'a BTreeMap<String, String>,
    cursor: Option<String>,
    page: std::vec::IntoIter<Value>,
    exhausted: bool,
}

impl<'a, P: HistoryPager> HistoryIter<'a, P> {
    pub fn new(pager: P, users: &'a BTreeMap<String, String>) -> Self {
        Self {
            pager,
            users,
            cursor: None,
            page: Vec::new().into_iter(),
            exhausted: false,
        }
    }

    /// Attach the derived `date` and `username` fields and advance the cursor
    /// to this message's `ts`. Messages from authors missing from the user
    /// directory (bots, mostly) get no `username` field at all.
    fn enrich(&mut self, mut message: Value) -> Result<Value> {
        let ts = message_ts(&message).to_string();
        let date = format_ts(&ts)?;
        self.cursor = Some(ts);
        if let Some(fields) = message.as_object_mut() {
            let username = fields
                .get("user")
                .and_then(Value::as_str)
                .and_then(|id| self.users.get(id))
                .cloned();
            fields.insert("date".to_string(), Value::String(date));
            if let Some(name) = username {
                fields.insert("username".to_string(), Value::String(name));
            }
        }
        Ok(message)
    }
}

impl<P: HistoryPager> Iterator for HistoryIter<'_, P> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(message) = self.page.next() {
                return Some(self.enrich(message));
            }
            if self.exhausted {
                return None;
            }
            match self.pager.fetch_page(self.cursor.as_deref()) {
                Ok(page) => {
                    self.exhausted = !page.has_more;
                    let mut messages = page.messages;
                    // The next cursor is derived from the last yielded
                    // element, so each page must be in descending order
                    // before any of it is yielded.
                    sort_newest_first(&mut messages);
                    self.page = messages.into_iter();
                }
                Err(err) => {
                    self.exhausted = true;
                    self.page = Vec::new().into_iter();
                    return Some(Err(err));
                }
            }
        }
    }
}
