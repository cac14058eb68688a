//! Password reset by SMS code
//!
//! A reset code is stored as a bcrypt hash with an expiry, one row per phone.
//! The plaintext code is written to `sms_outbox`, which the SMS scheduler
//! drains outside this service.

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::{normalize_phone, validate_password, validate_phone, validate_reset_code};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::PasswordResetConfig;
use crate::error::{AppError, AppResult};

/// Password reset service
#[derive(Clone)]
pub struct PasswordResetService {
    db: PgPool,
    config: PasswordResetConfig,
}

#[derive(Debug, Deserialize)]
pub struct RequestResetInput {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordInput {
    pub phone: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct RequestResetResponse {
    pub phone: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ResetCodeRow {
    user_id: i64,
    code_hash: String,
    expires_at: DateTime<Utc>,
}

const SMS_KIND_PASSWORD_RESET: &str = "PASSWORD_RESET";

impl PasswordResetService {
    pub fn new(db: PgPool, config: PasswordResetConfig) -> Self {
        Self { db, config }
    }

    /// Issue a new reset code for the user registered with `phone`.
    /// Any earlier unused code for the same phone is replaced.
    ///
    /// The response is the same whether or not the phone is registered; an
    /// unknown phone gets no code and no SMS.
    #[tracing::instrument(skip(self, input))]
    pub async fn request_reset(&self, input: RequestResetInput) -> AppResult<RequestResetResponse> {
        validate_phone(&input.phone).map_err(|msg| AppError::validation("phone", msg))?;
        let phone = normalize_phone(&input.phone);

        let code = generate_code();
        let code_hash = hash(&code, self.config.bcrypt_cost)?;
        let expires_at = Utc::now() + Duration::seconds(self.config.code_ttl_secs);

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, (i64, Option<i64>)>(
            "SELECT id, client_id FROM users WHERE phone = $1",
        )
        .bind(&phone)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, client_id)) = user else {
            tracing::debug!("Password reset requested for unregistered phone");
            return Ok(RequestResetResponse { phone, expires_at });
        };

        sqlx::query(
            r#"
            INSERT INTO password_reset_codes (phone, user_id, code_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (phone) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                code_hash = EXCLUDED.code_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            "#,
        )
        .bind(&phone)
        .bind(user_id)
        .bind(&code_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO sms_outbox (client_id, phone, message, kind) VALUES ($1, $2, $3, $4)",
        )
        .bind(client_id)
        .bind(&phone)
        .bind(reset_message(&code, self.config.code_ttl_secs))
        .bind(SMS_KIND_PASSWORD_RESET)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id, "Password reset code issued");

        Ok(RequestResetResponse { phone, expires_at })
    }

    /// Replace the user's password if `code` matches an unexpired reset code.
    /// The code is consumed on success.
    #[tracing::instrument(skip(self, input))]
    pub async fn reset_password(&self, input: ResetPasswordInput) -> AppResult<()> {
        validate_phone(&input.phone).map_err(|msg| AppError::validation("phone", msg))?;
        validate_reset_code(input.code.trim()).map_err(|msg| AppError::validation("code", msg))?;
        validate_password(&input.new_password)
            .map_err(|msg| AppError::validation("new_password", msg))?;
        let phone = normalize_phone(&input.phone);

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ResetCodeRow>(
            r#"
            SELECT user_id, code_hash, expires_at
            FROM password_reset_codes
            WHERE phone = $1
            FOR UPDATE
            "#,
        )
        .bind(&phone)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::validation("code", "Invalid or expired reset code"))?;

        if row.expires_at <= Utc::now() {
            sqlx::query("DELETE FROM password_reset_codes WHERE phone = $1")
                .bind(&phone)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::warn!(user_id = row.user_id, "Expired password reset code used");
            return Err(AppError::validation("code", "Invalid or expired reset code"));
        }

        if !verify(input.code.trim(), &row.code_hash)? {
            tracing::warn!(user_id = row.user_id, "Wrong password reset code");
            return Err(AppError::validation("code", "Invalid or expired reset code"));
        }

        let password_hash = hash(&input.new_password, self.config.bcrypt_cost)?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(row.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM password_reset_codes WHERE phone = $1")
            .bind(&phone)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = row.user_id, "Password reset");

        Ok(())
    }
}

/// Six decimal digits drawn from a random UUID
fn generate_code() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % 1_000_000;
    format!("{:06}", value)
}

fn reset_message(code: &str, ttl_secs: i64) -> String {
    format!(
        "Your password reset code is {}. It expires in {} minutes.",
        code,
        (ttl_secs + 59) / 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert!(validate_reset_code(&code).is_ok(), "bad code {}", code);
        }
    }

    #[test]
    fn test_reset_message_rounds_minutes_up() {
        assert!(reset_message("123456", 600).contains("10 minutes"));
        assert!(reset_message("123456", 90).contains("2 minutes"));
        assert!(reset_message("123456", 600).contains("123456"));
    }
}
