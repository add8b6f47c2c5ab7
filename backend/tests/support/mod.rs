//! In-memory repository implementations for protocol-level tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use rollcall_backend::error::AppError;
use rollcall_backend::models::attendance::AttendanceRecord;
use rollcall_backend::models::session::ClassSession;
use rollcall_backend::models::token::AttendanceToken;
use rollcall_backend::repositories::attendance::{AttendanceRepositoryTrait, LedgerInsert};
use rollcall_backend::repositories::session::SessionRepositoryTrait;
use rollcall_backend::repositories::token::TokenRepositoryTrait;
use rollcall_backend::types::{SessionId, UnitId, UserId};

#[derive(Default)]
pub struct InMemorySessions {
    sessions: Mutex<HashMap<SessionId, ClassSession>>,
    enrollments: Mutex<HashSet<(UserId, UnitId)>>,
}

impl InMemorySessions {
    pub fn with_session(session: ClassSession) -> Self {
        let store = Self::default();
        store
            .sessions
            .lock()
            .unwrap()
            .insert(session.id, session);
        store
    }

    pub fn enroll(&self, student_id: UserId, unit_id: UnitId) {
        self.enrollments
            .lock()
            .unwrap()
            .insert((student_id, unit_id));
    }
}

#[async_trait]
impl SessionRepositoryTrait for InMemorySessions {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<ClassSession>, AppError> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn is_enrolled(&self, student_id: UserId, unit_id: UnitId) -> Result<bool, AppError> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .contains(&(student_id, unit_id)))
    }
}

#[derive(Default)]
pub struct InMemoryTokens {
    tokens: Mutex<Vec<AttendanceToken>>,
}

impl InMemoryTokens {
    pub fn all(&self) -> Vec<AttendanceToken> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn unrevoked_count(&self, session_id: SessionId) -> usize {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.session_id == session_id && !t.revoked)
            .count()
    }
}

#[async_trait]
impl TokenRepositoryTrait for InMemoryTokens {
    async fn find_active(
        &self,
        session_id: SessionId,
    ) -> Result<Option<AttendanceToken>, AppError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.session_id == session_id && !t.revoked)
            .cloned())
    }

    async fn replace_active(&self, token: &AttendanceToken) -> Result<(), AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        for existing in tokens.iter_mut() {
            if existing.session_id == token.session_id && !existing.revoked {
                existing.revoked = true;
            }
        }
        tokens.push(token.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<HashMap<(SessionId, UserId), AttendanceRecord>>,
}

impl InMemoryLedger {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl AttendanceRepositoryTrait for InMemoryLedger {
    async fn find_by_session_and_student(
        &self,
        session_id: SessionId,
        student_id: UserId,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(session_id, student_id))
            .cloned())
    }

    // First writer wins, like the database's unique constraint.
    async fn try_insert(&self, record: AttendanceRecord) -> Result<LedgerInsert, AppError> {
        let mut records = self.records.lock().unwrap();
        let key = (record.session_id, record.student_id);
        if let Some(existing) = records.get(&key) {
            return Ok(LedgerInsert::Duplicate(existing.clone()));
        }
        records.insert(key, record.clone());
        Ok(LedgerInsert::Inserted(record))
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn list_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }
}
