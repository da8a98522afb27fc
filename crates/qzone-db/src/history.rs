//! Point history of the signed-in user: credited surveys and redemptions.
//!
//! Every history write also stores the resulting balance in the settings
//! table, in the same transaction, so the two never disagree.

use chrono::{DateTime, Utc};
use qzone_core::{CompletedSurvey, Redemption};
use sqlx::{SqliteConnection, SqlitePool};

use crate::settings::{set_setting_on, SettingKey};
use crate::DbError;

/// Balance to persist alongside a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointBalance {
    pub points: u32,
    pub points_to_next_rank: u32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompletedSurveyRow {
    pub survey_id: String,
    pub title: String,
    pub points_earned: i64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RedemptionRow {
    pub id: i64,
    pub reward_id: String,
    pub brand_name: String,
    pub points_spent: i64,
    pub code: String,
    pub redeemed_at: DateTime<Utc>,
}

fn points_column(column: &'static str, value: i64) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::Decode {
        column,
        reason: format!("{value} is out of range"),
    })
}

impl TryFrom<CompletedSurveyRow> for CompletedSurvey {
    type Error = DbError;

    fn try_from(row: CompletedSurveyRow) -> Result<Self, Self::Error> {
        Ok(Self {
            survey_id: row.survey_id,
            title: row.title,
            points_earned: points_column("completed_surveys.points_earned", row.points_earned)?,
            completed_at: row.completed_at,
        })
    }
}

impl TryFrom<RedemptionRow> for Redemption {
    type Error = DbError;

    fn try_from(row: RedemptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            reward_id: row.reward_id,
            brand_name: row.brand_name,
            points_spent: points_column("redemptions.points_spent", row.points_spent)?,
            code: row.code,
            redeemed_at: row.redeemed_at,
        })
    }
}

async fn save_balance_on(conn: &mut SqliteConnection, balance: PointBalance) -> Result<(), DbError> {
    set_setting_on(conn, SettingKey::Points, &balance.points.to_string()).await?;
    set_setting_on(
        conn,
        SettingKey::PointsToNextRank,
        &balance.points_to_next_rank.to_string(),
    )
    .await?;
    set_setting_on(conn, SettingKey::UpdatedAt, &Utc::now().to_rfc3339()).await?;
    Ok(())
}

/// Credit a survey and store the new balance.
///
/// Returns `false`, writing nothing, if the survey was already credited.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in that case.
pub async fn record_completed_survey(
    pool: &SqlitePool,
    completed: &CompletedSurvey,
    balance: PointBalance,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        "INSERT INTO completed_surveys (survey_id, title, points_earned, completed_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (survey_id) DO NOTHING",
    )
    .bind(&completed.survey_id)
    .bind(&completed.title)
    .bind(i64::from(completed.points_earned))
    .bind(completed.completed_at)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    save_balance_on(&mut tx, balance).await?;
    tx.commit().await?;
    Ok(true)
}

/// Append a redemption and store the new balance.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in that case.
pub async fn record_redemption(
    pool: &SqlitePool,
    redemption: &Redemption,
    balance: PointBalance,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO redemptions (reward_id, brand_name, points_spent, code, redeemed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&redemption.reward_id)
    .bind(&redemption.brand_name)
    .bind(i64::from(redemption.points_spent))
    .bind(&redemption.code)
    .bind(redemption.redeemed_at)
    .execute(&mut *tx)
    .await?;

    save_balance_on(&mut tx, balance).await?;
    tx.commit().await?;
    Ok(())
}

/// Credited surveys, oldest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub async fn list_completed_surveys(pool: &SqlitePool) -> Result<Vec<CompletedSurvey>, DbError> {
    sqlx::query_as::<_, CompletedSurveyRow>(
        "SELECT survey_id, title, points_earned, completed_at \
         FROM completed_surveys \
         ORDER BY completed_at ASC, survey_id ASC",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(CompletedSurvey::try_from)
    .collect()
}

/// Redemptions in the order they were made.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub async fn list_redemptions(pool: &SqlitePool) -> Result<Vec<Redemption>, DbError> {
    sqlx::query_as::<_, RedemptionRow>(
        "SELECT id, reward_id, brand_name, points_spent, code, redeemed_at \
         FROM redemptions \
         ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Redemption::try_from)
    .collect()
}

/// Forget all point history (sign-out).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails.
pub async fn clear_history(pool: &SqlitePool) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM completed_surveys")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM redemptions")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(id: &str, points: u32) -> CompletedSurvey {
        CompletedSurvey {
            survey_id: id.to_string(),
            title: format!("Survey {id}"),
            points_earned: points,
            completed_at: Utc::now(),
        }
    }

    fn balance(points: u32) -> PointBalance {
        PointBalance {
            points,
            points_to_next_rank: 1_000 - points,
        }
    }

    #[tokio::test]
    async fn survey_is_credited_once() {
        let pool = crate::connect_in_memory().await.unwrap();

        assert!(record_completed_survey(&pool, &completed("s-1", 50), balance(150))
            .await
            .unwrap());
        assert!(!record_completed_survey(&pool, &completed("s-1", 50), balance(200))
            .await
            .unwrap());

        let history = list_completed_surveys(&pool).await.unwrap();
        assert_eq!(history.len(), 1);
        let session = crate::load_session(&pool).await.unwrap();
        assert_eq!(session.points, Some(150), "rejected credit must not touch the balance");
        assert_eq!(session.points_to_next_rank, Some(850));
    }

    #[tokio::test]
    async fn redemptions_keep_insertion_order() {
        let pool = crate::connect_in_memory().await.unwrap();
        for (reward, left) in [("r-b", 700), ("r-a", 400)] {
            let redemption = Redemption {
                reward_id: reward.to_string(),
                brand_name: "Brand".to_string(),
                points_spent: 300,
                code: "CODE".to_string(),
                redeemed_at: Utc::now(),
            };
            record_redemption(&pool, &redemption, balance(left))
                .await
                .unwrap();
        }

        let ids: Vec<String> = list_redemptions(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.reward_id)
            .collect();
        assert_eq!(ids, vec!["r-b", "r-a"]);
        assert_eq!(crate::load_session(&pool).await.unwrap().points, Some(400));
    }

    #[tokio::test]
    async fn clear_history_empties_both_lists() {
        let pool = crate::connect_in_memory().await.unwrap();
        record_completed_survey(&pool, &completed("s-1", 10), balance(10))
            .await
            .unwrap();

        clear_history(&pool).await.unwrap();

        assert!(list_completed_surveys(&pool).await.unwrap().is_empty());
        assert!(list_redemptions(&pool).await.unwrap().is_empty());
    }
}
