use crate::application_port::AuthError;
use crate::domain_model::Role;

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Boundary to member persistence. The member aggregate itself (teams,
/// profile images, validation) lives outside this subsystem; auth only needs
/// credentials and a role.
#[async_trait::async_trait]
pub trait MemberRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<MemberRecord>, AuthError>;
    /// Fails with `UsernameTaken` when the username is already registered.
    async fn insert(&self, record: MemberRecord) -> Result<(), AuthError>;
    async fn list(&self) -> Result<Vec<MemberRecord>, AuthError>;
}
