use crate::application_port::AuthError;
use crate::domain_port::{MemberRecord, MemberRepo};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Member repository for the `memory` backend and for tests.
#[derive(Default)]
pub struct MemoryMemberRepo {
    members: Mutex<BTreeMap<String, MemberRecord>>,
}

impl MemoryMemberRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn members(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemberRecord>> {
        self.members.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl MemberRepo for MemoryMemberRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<MemberRecord>, AuthError> {
        Ok(self.members().get(username).cloned())
    }

    async fn insert(&self, record: MemberRecord) -> Result<(), AuthError> {
        let mut members = self.members();
        if members.contains_key(&record.username) {
            return Err(AuthError::UsernameTaken);
        }
        members.insert(record.username.clone(), record);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<MemberRecord>, AuthError> {
        Ok(self.members().values().cloned().collect())
    }
}
