//! Device-local key-value settings backed by the `settings` table.
//!
//! Holds the signed-in user's cached profile fields and API tokens. Values
//! are stored as text; numeric and timestamp fields are parsed on read and
//! dropped (with a warning) if they no longer parse.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    UserId,
    DisplayName,
    Email,
    AvatarUrl,
    Points,
    Rank,
    PointsToNextRank,
    CreatedAt,
    UpdatedAt,
    LocalAvatarPath,
    AccessToken,
    RefreshToken,
}

impl SettingKey {
    pub const ALL: [SettingKey; 12] = [
        SettingKey::UserId,
        SettingKey::DisplayName,
        SettingKey::Email,
        SettingKey::AvatarUrl,
        SettingKey::Points,
        SettingKey::Rank,
        SettingKey::PointsToNextRank,
        SettingKey::CreatedAt,
        SettingKey::UpdatedAt,
        SettingKey::LocalAvatarPath,
        SettingKey::AccessToken,
        SettingKey::RefreshToken,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::UserId => "user_id",
            SettingKey::DisplayName => "display_name",
            SettingKey::Email => "email",
            SettingKey::AvatarUrl => "avatar_url",
            SettingKey::Points => "points",
            SettingKey::Rank => "rank",
            SettingKey::PointsToNextRank => "points_to_next_rank",
            SettingKey::CreatedAt => "created_at",
            SettingKey::UpdatedAt => "updated_at",
            SettingKey::LocalAvatarPath => "local_avatar_path",
            SettingKey::AccessToken => "access_token",
            SettingKey::RefreshToken => "refresh_token",
        }
    }
}

/// Everything the settings store remembers about the signed-in user.
#[derive(Clone, Default, PartialEq)]
pub struct UserSession {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub points: Option<u32>,
    pub rank: Option<String>,
    pub points_to_next_rank: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub local_avatar_path: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl UserSession {
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.access_token.is_some()
    }

    fn value_of(&self, key: SettingKey) -> Option<String> {
        match key {
            SettingKey::UserId => self.user_id.clone(),
            SettingKey::DisplayName => self.display_name.clone(),
            SettingKey::Email => self.email.clone(),
            SettingKey::AvatarUrl => self.avatar_url.clone(),
            SettingKey::Points => self.points.map(|p| p.to_string()),
            SettingKey::Rank => self.rank.clone(),
            SettingKey::PointsToNextRank => self.points_to_next_rank.map(|p| p.to_string()),
            SettingKey::CreatedAt => self.created_at.map(|t| t.to_rfc3339()),
            SettingKey::UpdatedAt => self.updated_at.map(|t| t.to_rfc3339()),
            SettingKey::LocalAvatarPath => self.local_avatar_path.clone(),
            SettingKey::AccessToken => self.access_token.clone(),
            SettingKey::RefreshToken => self.refresh_token.clone(),
        }
    }

    fn apply(&mut self, key: SettingKey, value: String) {
        match key {
            SettingKey::UserId => self.user_id = Some(value),
            SettingKey::DisplayName => self.display_name = Some(value),
            SettingKey::Email => self.email = Some(value),
            SettingKey::AvatarUrl => self.avatar_url = Some(value),
            SettingKey::Points => self.points = parse_or_warn(key, &value),
            SettingKey::Rank => self.rank = Some(value),
            SettingKey::PointsToNextRank => self.points_to_next_rank = parse_or_warn(key, &value),
            SettingKey::CreatedAt => self.created_at = parse_time_or_warn(key, &value),
            SettingKey::UpdatedAt => self.updated_at = parse_time_or_warn(key, &value),
            SettingKey::LocalAvatarPath => self.local_avatar_path = Some(value),
            SettingKey::AccessToken => self.access_token = Some(value),
            SettingKey::RefreshToken => self.refresh_token = Some(value),
        }
    }
}

impl std::fmt::Debug for UserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSession")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("avatar_url", &self.avatar_url)
            .field("points", &self.points)
            .field("rank", &self.rank)
            .field("points_to_next_rank", &self.points_to_next_rank)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("local_avatar_path", &self.local_avatar_path)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

fn parse_or_warn(key: SettingKey, value: &str) -> Option<u32> {
    match value.parse::<u32>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "ignoring unparsable setting");
            None
        }
    }
}

fn parse_time_or_warn(key: SettingKey, value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "ignoring unparsable setting");
            None
        }
    }
}

/// Read a single setting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_setting(pool: &SqlitePool, key: SettingKey) -> Result<Option<String>, DbError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
        .bind(key.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Write a single setting, replacing any previous value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn set_setting(pool: &SqlitePool, key: SettingKey, value: &str) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;
    set_setting_on(&mut conn, key, value).await
}

pub(crate) async fn set_setting_on(
    conn: &mut SqliteConnection,
    key: SettingKey,
    value: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) \
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
    )
    .bind(key.as_str())
    .bind(value)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Remove a single setting. Returns `true` if it existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn remove_setting(pool: &SqlitePool, key: SettingKey) -> Result<bool, DbError> {
    let rows_affected = sqlx::query("DELETE FROM settings WHERE key = ?1")
        .bind(key.as_str())
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

/// Load the full session. Missing keys stay `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_session(pool: &SqlitePool) -> Result<UserSession, DbError> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await?;

    let mut session = UserSession::default();
    for (key, value) in rows {
        if let Some(key) = SettingKey::ALL.into_iter().find(|k| k.as_str() == key) {
            session.apply(key, value);
        }
    }
    Ok(session)
}

/// Persist `session`: present fields are written, absent fields are removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in that case.
pub async fn save_session(pool: &SqlitePool, session: &UserSession) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    for key in SettingKey::ALL {
        match session.value_of(key) {
            Some(value) => set_setting_on(&mut tx, key, &value).await?,
            None => {
                sqlx::query("DELETE FROM settings WHERE key = ?1")
                    .bind(key.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }
    tx.commit().await?;
    Ok(())
}

/// Forget every session field (sign-out).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn clear_session(pool: &SqlitePool) -> Result<(), DbError> {
    save_session(pool, &UserSession::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_round_trips() {
        let pool = crate::connect_in_memory().await.unwrap();
        let created = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let session = UserSession {
            user_id: Some("u-1".to_string()),
            display_name: Some("Sam".to_string()),
            points: Some(420),
            created_at: Some(created),
            access_token: Some("access".to_string()),
            refresh_token: Some("refresh".to_string()),
            ..UserSession::default()
        };

        save_session(&pool, &session).await.unwrap();
        let loaded = load_session(&pool).await.unwrap();
        assert_eq!(loaded, session);
        assert!(loaded.is_signed_in());
    }

    #[tokio::test]
    async fn save_removes_absent_fields() {
        let pool = crate::connect_in_memory().await.unwrap();
        set_setting(&pool, SettingKey::Email, "old@example.com")
            .await
            .unwrap();

        save_session(&pool, &UserSession::default()).await.unwrap();
        assert_eq!(get_setting(&pool, SettingKey::Email).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_numeric_setting_is_dropped() {
        let pool = crate::connect_in_memory().await.unwrap();
        set_setting(&pool, SettingKey::Points, "lots").await.unwrap();
        set_setting(&pool, SettingKey::Rank, "Gold").await.unwrap();

        let session = load_session(&pool).await.unwrap();
        assert_eq!(session.points, None);
        assert_eq!(session.rank.as_deref(), Some("Gold"));
    }

    #[tokio::test]
    async fn clear_session_signs_out() {
        let pool = crate::connect_in_memory().await.unwrap();
        set_setting(&pool, SettingKey::AccessToken, "t").await.unwrap();
        assert!(remove_setting(&pool, SettingKey::RefreshToken).await.is_ok());

        clear_session(&pool).await.unwrap();
        assert!(!load_session(&pool).await.unwrap().is_signed_in());
    }

    #[test]
    fn debug_redacts_tokens() {
        let session = UserSession {
            access_token: Some("super-secret".to_string()),
            ..UserSession::default()
        };
        assert!(!format!("{session:?}").contains("super-secret"));
    }
}
