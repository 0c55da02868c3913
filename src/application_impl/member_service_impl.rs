use crate::application_port::{
    AuthError, CredentialHasher, MemberService, MemberView, SignupInput,
};
use crate::domain_model::Role;
use crate::domain_port::{MemberRecord, MemberRepo};
use std::sync::Arc;

pub struct MemberServiceImpl {
    member_repo: Arc<dyn MemberRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl MemberServiceImpl {
    pub fn new(
        member_repo: Arc<dyn MemberRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            member_repo,
            credential_hasher,
        }
    }
}

#[async_trait::async_trait]
impl MemberService for MemberServiceImpl {
    async fn signup(&self, input: SignupInput) -> Result<MemberView, AuthError> {
        let SignupInput { username, password } = input;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let record = MemberRecord {
            username: username.clone(),
            password_hash,
            // Elevated roles are granted out of band, never self-assigned.
            role: Role::Member,
        };
        self.member_repo.insert(record).await?;

        Ok(MemberView {
            username,
            role: Role::Member,
        })
    }

    async fn list(&self) -> Result<Vec<MemberView>, AuthError> {
        let records = self.member_repo.list().await?;
        Ok(records
            .into_iter()
            .map(|r| MemberView {
                username: r.username,
                role: r.role,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::Argon2PasswordHasher;
    use crate::infra_memory::MemoryMemberRepo;

    fn service() -> MemberServiceImpl {
        MemberServiceImpl::new(Arc::new(MemoryMemberRepo::new()), Arc::new(Argon2PasswordHasher))
    }

    fn signup_input(username: &str) -> SignupInput {
        SignupInput {
            username: username.to_string(),
            password: "pw1".to_string(),
        }
    }

    #[tokio::test]
    async fn signup_registers_a_member_with_the_default_role() {
        let service = service();
        let view = service.signup(signup_input("alice")).await.unwrap();
        assert_eq!(view.role, Role::Member);

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "alice");
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let service = service();
        service.signup(signup_input("alice")).await.unwrap();
        assert_eq!(
            service.signup(signup_input("alice")).await,
            Err(AuthError::UsernameTaken)
        );
    }
}
