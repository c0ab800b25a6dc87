use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::ai::chat::Chat;
use crate::core::ChatFactory;

/// A session behind an async mutex so submissions to the same
/// session are handled one at a time.
pub type SharedChat = Arc<Mutex<Chat>>;

pub struct AppState {
    pub factory: ChatFactory,
    // In memory only, sessions end when the process does
    pub sessions: HashMap<String, SharedChat>,
}

impl AppState {
    pub fn new(factory: ChatFactory) -> Self {
        Self {
            factory,
            sessions: HashMap::new(),
        }
    }

    pub fn session(&self, id: &str) -> Option<SharedChat> {
        self.sessions.get(id).cloned()
    }

    /// Keeps the first session registered under an ID and returns it.
    pub fn register(&mut self, id: &str, chat: SharedChat) -> SharedChat {
        Arc::clone(self.sessions.entry(id.to_string()).or_insert(chat))
    }

    /// Removes `chat` from the sessions unless another request is
    /// still holding on to it. `chat` must be the caller's only handle
    /// besides the one in the map.
    pub fn discard_if_unused(&mut self, id: &str, chat: &SharedChat) -> bool {
        let unused = self
            .sessions
            .get(id)
            .is_some_and(|held| Arc::ptr_eq(held, chat) && Arc::strong_count(chat) == 2);
        if unused {
            self.sessions.remove(id);
        }
        unused
    }
}
