use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::quiz::{DisplayOption, ParticipantId, QuestionRecord};

/// The question a participant is currently expected to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    /// Matches [`crate::quiz::engine::PresentedQuestion::ticket`] of the serving
    pub ticket: u64,
    pub question: QuestionRecord,
    pub display_options: Vec<DisplayOption>,
    pub correct_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CurrentQuestion {
    #[default]
    Unset,
    Pending(PendingQuestion),
}

impl CurrentQuestion {
    pub fn pending(&self) -> Option<&PendingQuestion> {
        match self {
            CurrentQuestion::Pending(pending) => Some(pending),
            CurrentQuestion::Unset => None,
        }
    }
}

/// Per-participant quiz progress.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub remaining: usize,
    pub answered: usize,
    pub correct: usize,
    pub current: CurrentQuestion,
    /// Questions drawn up front when the quiz must not repeat questions.
    pub queue: Vec<QuestionRecord>,
    pub last_active: Instant,
}

impl SessionRecord {
    fn new() -> Self {
        Self {
            remaining: 0,
            answered: 0,
            correct: 0,
            current: CurrentQuestion::Unset,
            queue: Vec::new(),
            last_active: Instant::now(),
        }
    }
}

/// Whether [`SessionStore::modify`] keeps the record it just changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retain {
    Keep,
    Remove,
}

/// Owns every participant's session.
///
/// Records are handed out as copies. [`SessionStore::modify`] changes a
/// record in place under the store lock, so a read-check-write on one
/// participant cannot interleave with another. Different participants never
/// interfere.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<ParticipantId, SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ParticipantId, SessionRecord>> {
        // A panic while holding the lock cannot leave a half-written record behind
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a fresh record, silently replacing an unfinished one.
    pub fn create(&self, participant: ParticipantId) -> SessionRecord {
        let record = SessionRecord::new();
        if self.lock().insert(participant, record.clone()).is_some() {
            log::debug!("Participant {} abandoned an unfinished quiz", participant);
        }
        record
    }

    pub fn get(&self, participant: ParticipantId) -> Option<SessionRecord> {
        self.lock().get(&participant).cloned()
    }

    /// Stores `record`, replacing whatever is there.
    ///
    /// This does not check that the participant still has a session: a record
    /// fetched with [`SessionStore::get`] and dropped by [`SessionStore::purge_idle`]
    /// in the meantime comes back. Use [`SessionStore::modify`] to change a live record.
    pub fn update(&self, participant: ParticipantId, mut record: SessionRecord) {
        record.last_active = Instant::now();
        self.lock().insert(participant, record);
    }

    /// Runs `f` on the participant's record while holding the lock.
    ///
    /// Returns `None` without calling `f` when the participant has no session.
    /// The record is removed afterwards if `f` asks for it.
    pub fn modify<R>(
        &self,
        participant: ParticipantId,
        f: impl FnOnce(&mut SessionRecord) -> (R, Retain),
    ) -> Option<R> {
        let mut sessions = self.lock();
        let record = sessions.get_mut(&participant)?;
        record.last_active = Instant::now();
        let (result, retain) = f(record);
        if retain == Retain::Remove {
            sessions.remove(&participant);
        }
        Some(result)
    }

    pub fn delete(&self, participant: ParticipantId) -> Option<SessionRecord> {
        self.lock().remove(&participant)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops sessions untouched for longer than `max_idle`. Returns how many were removed.
    ///
    /// Changes made through [`SessionStore::modify`] never resurrect a purged
    /// session, a later [`SessionStore::update`] does.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        self.purge_idle_at(Instant::now(), max_idle)
    }

    fn purge_idle_at(&self, now: Instant, max_idle: Duration) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| now.saturating_duration_since(record.last_active) <= max_idle);
        before - sessions.len()
    }
}
