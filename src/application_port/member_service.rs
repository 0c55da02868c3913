use crate::application_port::AuthError;
use crate::domain_model::Role;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub username: String,
    pub role: Role,
}

#[async_trait::async_trait]
pub trait MemberService: Send + Sync {
    /// Register a new member with the default MEMBER role.
    async fn signup(&self, input: SignupInput) -> Result<MemberView, AuthError>;

    async fn list(&self) -> Result<Vec<MemberView>, AuthError>;
}
