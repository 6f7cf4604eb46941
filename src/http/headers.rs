//! Client-wide default headers.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Default headers shared by every send, including offline queue replays.
///
/// Readers take a snapshot per send; writers replace the whole map, so a
/// request never observes a half-applied update.
#[derive(Debug, Clone)]
pub struct DefaultHeaders {
    inner: Arc<ArcSwap<BTreeMap<String, String>>>,
}

impl DefaultHeaders {
    /// Create the header set. `Content-Type: application/json` is added unless present.
    pub fn new(initial: BTreeMap<String, String>) -> Self {
        let mut headers = initial;
        if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        Self {
            inner: Arc::new(ArcSwap::from_pointee(headers)),
        }
    }

    pub fn snapshot(&self) -> Arc<BTreeMap<String, String>> {
        self.inner.load_full()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner
            .load()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn set(&self, name: &str, value: &str) {
        self.inner.rcu(|current| {
            let mut next = (**current).clone();
            next.retain(|k, _| !k.eq_ignore_ascii_case(name));
            next.insert(name.to_string(), value.to_string());
            next
        });
    }

    pub fn remove(&self, name: &str) {
        self.inner.rcu(|current| {
            let mut next = (**current).clone();
            next.retain(|k, _| !k.eq_ignore_ascii_case(name));
            next
        });
    }

    pub fn set_auth_token(&self, token: &str) {
        self.set("Authorization", &format!("Bearer {}", token));
    }

    pub fn clear_auth_token(&self) {
        self.remove("Authorization");
    }
}

impl Default for DefaultHeaders {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}
