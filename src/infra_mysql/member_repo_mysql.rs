use crate::application_port::AuthError;
use crate::domain_port::{MemberRecord, MemberRepo};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlMemberRepo {
    pool: MySqlPool,
}

impl MySqlMemberRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlMemberRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<MemberRecord, AuthError> {
        let username: String = row
            .try_get("username")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let role = role
            .parse()
            .map_err(|e: crate::domain_model::ParseRoleError| AuthError::Store(e.to_string()))?;

        Ok(MemberRecord {
            username,
            password_hash,
            role,
        })
    }
}

#[async_trait::async_trait]
impl MemberRepo for MySqlMemberRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<MemberRecord>, AuthError> {
        let row = sqlx::query(
            "SELECT username, password_hash, role FROM member WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(format!("query member: {e}")))?;

        row.map(Self::row_to_record).transpose()
    }

    async fn insert(&self, record: MemberRecord) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
INSERT INTO member (username, password_hash, role)
VALUES (?, ?, ?)
"#,
        )
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(record.role.to_string())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AuthError::UsernameTaken)
            }
            Err(e) => Err(AuthError::Store(format!("insert member: {e}"))),
        }
    }

    async fn list(&self) -> Result<Vec<MemberRecord>, AuthError> {
        let rows = sqlx::query("SELECT username, password_hash, role FROM member ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("list members: {e}")))?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
