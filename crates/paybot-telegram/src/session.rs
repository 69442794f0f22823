//! Per-chat purchase state and update deduplication.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use paybot_payments::{PaymentMethod, Plan};

/// How long update keys are remembered, and the maximum age of a message
pub const UPDATE_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug, Default)]
struct ChatState {
    plan: Option<&'static Plan>,
    last_payment: Option<(PaymentMethod, String)>,
}

/// What each chat has chosen so far
#[derive(Default)]
pub struct ChatSessions {
    chats: Mutex<HashMap<i64, ChatState>>,
}

impl ChatSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_chat<T>(&self, chat_id: i64, f: impl FnOnce(&mut ChatState) -> T) -> Option<T> {
        let mut chats = self.chats.lock().ok()?;
        Some(f(chats.entry(chat_id).or_default()))
    }

    /// Remember the plan the buyer picked
    pub fn select_plan(&self, chat_id: i64, plan: &'static Plan) {
        self.with_chat(chat_id, |state| state.plan = Some(plan));
    }

    /// The buyer's last chosen plan
    pub fn selected_plan(&self, chat_id: i64) -> Option<&'static Plan> {
        self.with_chat(chat_id, |state| state.plan).flatten()
    }

    /// Remember the charge created for this chat
    pub fn record_payment(&self, chat_id: i64, method: PaymentMethod, payment_id: &str) {
        self.with_chat(chat_id, |state| {
            state.last_payment = Some((method, payment_id.to_string()));
        });
    }

    /// Id of the most recent charge for `method`
    pub fn last_payment(&self, chat_id: i64, method: PaymentMethod) -> Option<String> {
        self.with_chat(chat_id, |state| match &state.last_payment {
            Some((m, id)) if *m == method => Some(id.clone()),
            _ => None,
        })
        .flatten()
    }
}

/// Remembers recently handled update keys so redelivered updates are skipped
pub struct RecentUpdates {
    seen: Mutex<HashMap<String, Instant>>,
    window: Duration,
}

impl Default for RecentUpdates {
    fn default() -> Self {
        Self::new(UPDATE_WINDOW)
    }
}

impl RecentUpdates {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// True the first time `key` is seen within the window
    pub fn first_seen(&self, key: &str) -> bool {
        self.first_seen_at(key, Instant::now())
    }

    fn first_seen_at(&self, key: &str, now: Instant) -> bool {
        let Ok(mut seen) = self.seen.lock() else {
            return true;
        };

        seen.retain(|_, at| now.duration_since(*at) < self.window);

        if seen.contains_key(key) {
            return false;
        }
        seen.insert(key.to_string(), now);
        true
    }
}
