use async_trait::async_trait;
use chrono::Utc;

use crate::config::DbPool;

use super::interface::{
    DeviceRepository, RefreshTokenRepository, RepoError, RepoResult, RoleRepository,
    UserRepository, VerificationCodeRepository,
};
use super::model::{
    CodePurpose, Device, RefreshToken, RefreshTokenWithUser, Role, User, UserWithRole,
    VerificationCode,
};

// =============================================================================
// USERS
// =============================================================================

pub struct UserCrud {
    pool: DbPool,
}

impl UserCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_role(&self, role_id: &str) -> RepoResult<Role> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)?;
        Ok(role)
    }
}

#[async_trait]
impl UserRepository for UserCrud {
    async fn create(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, name, phone_number, password_hash, avatar, totp_secret,
                 status, role_id, deleted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.totp_secret)
        .bind(user.status)
        .bind(&user.role_id)
        .bind(user.deleted_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ? AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = ? AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email_with_role(&self, email: &str) -> RepoResult<Option<UserWithRole>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        let role = self.find_role(&user.role_id).await?;
        Ok(Some(UserWithRole { user, role }))
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn set_totp_secret(&self, user_id: &str, secret: Option<&str>) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE users SET totp_secret = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(secret)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// ROLES
// =============================================================================

pub struct RoleCrud {
    pool: DbPool,
}

impl RoleCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for RoleCrud {
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }
}

// =============================================================================
// VERIFICATION CODES
// =============================================================================

pub struct VerificationCodeCrud {
    pool: DbPool,
}

impl VerificationCodeCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationCodeRepository for VerificationCodeCrud {
    async fn upsert(&self, code: &VerificationCode) -> RepoResult<()> {
        // Unique key on (email, purpose): a re-issue for the same pair
        // overwrites code and expiry in place, never creating a second row.
        sqlx::query(
            r#"
            INSERT INTO verification_codes (email, code, purpose, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE code = VALUES(code), expires_at = VALUES(expires_at)
            "#,
        )
        .bind(&code.email)
        .bind(&code.code)
        .bind(code.purpose)
        .bind(code.expires_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> RepoResult<Option<VerificationCode>> {
        let row = sqlx::query_as::<_, VerificationCode>(
            "SELECT * FROM verification_codes WHERE email = ? AND code = ? AND purpose = ?",
        )
        .bind(email)
        .bind(code)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, email: &str, code: &str, purpose: CodePurpose) -> RepoResult<()> {
        sqlx::query("DELETE FROM verification_codes WHERE email = ? AND code = ? AND purpose = ?")
            .bind(email)
            .bind(code)
            .bind(purpose)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// DEVICES
// =============================================================================

pub struct DeviceCrud {
    pool: DbPool,
}

impl DeviceCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepository for DeviceCrud {
    async fn create(&self, device: &Device) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO devices (id, user_id, user_agent, ip, last_active, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&device.id)
        .bind(&device.user_id)
        .bind(&device.user_agent)
        .bind(&device.ip)
        .bind(device.last_active)
        .bind(device.is_active)
        .bind(device.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch(&self, device_id: &str, user_agent: &str, ip: &str) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE devices SET user_agent = ?, ip = ?, last_active = ? WHERE id = ?",
        )
        .bind(user_agent)
        .bind(ip)
        .bind(Utc::now())
        .bind(device_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn deactivate(&self, device_id: &str) -> RepoResult<()> {
        let result = sqlx::query("UPDATE devices SET is_active = FALSE WHERE id = ?")
            .bind(device_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// REFRESH TOKENS
// =============================================================================

pub struct RefreshTokenCrud {
    pool: DbPool,
}

impl RefreshTokenCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for RefreshTokenCrud {
    async fn create(&self, token: &RefreshToken) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, device_id, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.token)
        .bind(&token.user_id)
        .bind(&token.device_id)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_with_user(&self, token: &str) -> RepoResult<Option<RefreshTokenWithUser>> {
        let Some(row) =
            sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&row.user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;

        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
            .bind(&user.role_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)?;

        Ok(Some(RefreshTokenWithUser {
            token: row,
            user,
            role,
        }))
    }

    async fn delete(&self, token: &str) -> RepoResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;

        // The delete is the atomic consume: whichever concurrent caller sees
        // zero affected rows lost the race and reports the token as used.
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(row)
    }
}
