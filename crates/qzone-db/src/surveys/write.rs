//! Write operations for the survey tables.

use qzone_core::Survey;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Replace the survey row and all of its question/option rows.
async fn upsert_on(conn: &mut SqliteConnection, survey: &Survey) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO surveys \
             (id, title, description, image_url, latitude, longitude, points, is_completed, \
              status, current_question_index, question_count, answers, last_synced_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
         ON CONFLICT (id) DO UPDATE SET \
             title                  = excluded.title, \
             description            = excluded.description, \
             image_url              = excluded.image_url, \
             latitude               = excluded.latitude, \
             longitude              = excluded.longitude, \
             points                 = excluded.points, \
             is_completed           = excluded.is_completed, \
             status                 = excluded.status, \
             current_question_index = excluded.current_question_index, \
             question_count         = excluded.question_count, \
             answers                = excluded.answers, \
             last_synced_at         = excluded.last_synced_at",
    )
    .bind(&survey.id)
    .bind(&survey.title)
    .bind(&survey.description)
    .bind(&survey.image_url)
    .bind(survey.latitude)
    .bind(survey.longitude)
    .bind(i64::from(survey.points))
    .bind(survey.is_completed)
    .bind(survey.status.as_str())
    .bind(to_i64(survey.current_question_index))
    .bind(to_i64(survey.question_count))
    .bind(Json(&survey.answers))
    .bind(chrono::Utc::now())
    .execute(&mut *conn)
    .await?;

    // Options cascade from their questions.
    sqlx::query("DELETE FROM survey_questions WHERE survey_id = ?1")
        .bind(&survey.id)
        .execute(&mut *conn)
        .await?;

    for (list_index, question) in survey.questions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO survey_questions \
                 (survey_id, id, question_type, prompt, required, position, list_index) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&survey.id)
        .bind(&question.id)
        .bind(question.question_type.as_str())
        .bind(&question.prompt)
        .bind(question.required)
        .bind(question.position)
        .bind(to_i64(list_index))
        .execute(&mut *conn)
        .await?;

        for (position, option) in question.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO survey_options \
                     (id, survey_id, question_id, content, label, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(option.id)
            .bind(&survey.id)
            .bind(&question.id)
            .bind(&option.content)
            .bind(&option.label)
            .bind(to_i64(position))
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

/// Insert or replace a survey together with its questions and options.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in that case.
pub async fn upsert_survey(pool: &SqlitePool, survey: &Survey) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    upsert_on(&mut tx, survey).await?;
    tx.commit().await?;
    Ok(())
}

/// Insert or replace a batch of surveys in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in that case.
pub async fn upsert_surveys(pool: &SqlitePool, surveys: &[Survey]) -> Result<u64, DbError> {
    if surveys.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for survey in surveys {
        upsert_on(&mut tx, survey).await?;
    }
    tx.commit().await?;

    Ok(surveys.len() as u64)
}

/// Delete a survey; its questions and options go with it.
///
/// Returns `true` if a survey row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn delete_survey(pool: &SqlitePool, survey_id: &str) -> Result<bool, DbError> {
    let rows_affected = sqlx::query("DELETE FROM surveys WHERE id = ?1")
        .bind(survey_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

/// Delete every cached survey, returning the number of survey rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn delete_all_surveys(pool: &SqlitePool) -> Result<u64, DbError> {
    let rows_affected = sqlx::query("DELETE FROM surveys")
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected)
}
