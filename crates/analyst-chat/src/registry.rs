//! Live chat sessions, keyed by id.
//!
//! Each session owns its own [`TurnLoop`] behind an async mutex. Only one
//! trigger runs per session at a time: a second one arriving while a turn is
//! in flight is rejected instead of queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, TimeZone};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use analyst_core::config::ChatConfig;
use analyst_core::format_timestamp;
use analyst_warehouse::SqlExecutor;

use crate::client::Assistant;
use crate::error::ChatError;
use crate::render::TurnRenderer;
use crate::turn_loop::TurnLoop;

/// Lightweight view of a session for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub started_at: String,
    pub last_active: String,
    pub turns: usize,
    pub working: bool,
}

pub struct SessionHandle {
    id: Uuid,
    started_at: i64,
    last_active: AtomicI64,
    working: AtomicBool,
    turns: AtomicUsize,
    chat: tokio::sync::Mutex<TurnLoop>,
}

impl SessionHandle {
    fn new(chat: TurnLoop) -> Self {
        let now = Local::now().timestamp();
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            last_active: AtomicI64::new(now),
            working: AtomicBool::new(false),
            turns: AtomicUsize::new(0),
            chat: tokio::sync::Mutex::new(chat),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True while a trigger holds the session.
    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::SeqCst)
    }

    /// Claim the session for one trigger.
    pub fn begin(&self) -> Result<ActiveTurn<'_>, ChatError> {
        let chat = self
            .chat
            .try_lock()
            .map_err(|_| ChatError::TurnInProgress(self.id))?;
        self.working.store(true, Ordering::SeqCst);
        Ok(ActiveTurn {
            handle: self,
            chat,
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            started_at: display_time(self.started_at),
            last_active: display_time(self.last_active.load(Ordering::SeqCst)),
            turns: self.turns.load(Ordering::SeqCst),
            working: self.is_working(),
        }
    }

    fn idle_for(&self, now: i64) -> i64 {
        now - self.last_active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("working", &self.is_working())
            .finish()
    }
}

fn display_time(secs: i64) -> String {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(format_timestamp)
        .unwrap_or_default()
}

/// Exclusive access to a session's turn loop for the duration of one trigger.
///
/// Dropping it clears the working flag and refreshes the session metadata.
pub struct ActiveTurn<'a> {
    handle: &'a SessionHandle,
    chat: tokio::sync::MutexGuard<'a, TurnLoop>,
}

impl std::ops::Deref for ActiveTurn<'_> {
    type Target = TurnLoop;

    fn deref(&self) -> &TurnLoop {
        &self.chat
    }
}

impl std::ops::DerefMut for ActiveTurn<'_> {
    fn deref_mut(&mut self) -> &mut TurnLoop {
        &mut self.chat
    }
}

impl Drop for ActiveTurn<'_> {
    fn drop(&mut self) {
        self.handle
            .turns
            .store(self.chat.session().len(), Ordering::SeqCst);
        self.handle
            .last_active
            .store(Local::now().timestamp(), Ordering::SeqCst);
        self.handle.working.store(false, Ordering::SeqCst);
    }
}

/// All live sessions. The assistant client and warehouse handle are shared by
/// every session.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<SessionHandle>>>,
    assistant: Arc<dyn Assistant>,
    executor: Arc<dyn SqlExecutor>,
    config: ChatConfig,
}

impl SessionRegistry {
    pub fn new(
        assistant: Arc<dyn Assistant>,
        executor: Arc<dyn SqlExecutor>,
        config: ChatConfig,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            assistant,
            executor,
            config,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<SessionHandle>>> {
        // The map holds no invariant a panicking holder could break.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new session with empty history.
    pub fn create(&self) -> Arc<SessionHandle> {
        self.purge_expired();

        let chat = TurnLoop::new(
            self.assistant.clone(),
            TurnRenderer::new(self.executor.clone()),
            self.config.clone(),
        );
        let handle = Arc::new(SessionHandle::new(chat));
        self.lock().insert(handle.id, handle.clone());

        info!(session_id = %handle.id, "Session created");
        handle
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<SessionHandle>, ChatError> {
        self.purge_expired();
        self.lock()
            .get(&id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(id))
    }

    /// Summaries of all live sessions, most recently active first.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.purge_expired();
        let mut handles: Vec<Arc<SessionHandle>> = self.lock().values().cloned().collect();
        handles.sort_by_key(|h| std::cmp::Reverse(h.last_active.load(Ordering::SeqCst)));
        handles.iter().map(|h| h.summary()).collect()
    }

    pub fn remove(&self, id: Uuid) -> Result<(), ChatError> {
        match self.lock().remove(&id) {
            Some(_) => {
                info!(session_id = %id, "Session removed");
                Ok(())
            }
            None => Err(ChatError::SessionNotFound(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop idle sessions past the timeout. Busy sessions are kept.
    pub fn purge_expired(&self) -> usize {
        let timeout = i64::from(self.config.session_timeout_minutes) * 60;
        let now = Local::now().timestamp();

        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, h| h.is_working() || h.idle_for(now) <= timeout);
        let purged = before - sessions.len();

        if purged > 0 {
            debug!(purged, "Expired idle sessions");
        }
        purged
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}
