//! Read operations for the survey tables.
//!
//! Surveys are listed most recently synced first. Each survey is returned
//! with its questions and their options in the order they were written.

use std::collections::HashMap;

use qzone_core::{BoundingBox, Survey, SurveyOption};
use sqlx::SqlitePool;

use super::types::{SurveyOptionRow, SurveyQuestionRow, SurveyRow};
use crate::DbError;

const SELECT_COLUMNS: &str = "SELECT id, title, description, image_url, latitude, longitude, \
                                     points, is_completed, status, current_question_index, \
                                     question_count, answers, last_synced_at \
                              FROM surveys";

const ORDER_BY: &str = "ORDER BY last_synced_at DESC, id ASC";

/// Look up a survey, with its questions and options, by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails or [`DbError::Decode`] if a
/// stored enum value is not recognised.
pub async fn get_survey(pool: &SqlitePool, survey_id: &str) -> Result<Option<Survey>, DbError> {
    let row = sqlx::query_as::<_, SurveyRow>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
        .bind(survey_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(assemble(pool, row).await?)),
        None => Ok(None),
    }
}

/// List every cached survey.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails or a row cannot be decoded.
pub async fn list_surveys(pool: &SqlitePool) -> Result<Vec<Survey>, DbError> {
    let rows = sqlx::query_as::<_, SurveyRow>(&format!("{SELECT_COLUMNS} {ORDER_BY}"))
        .fetch_all(pool)
        .await?;

    assemble_all(pool, rows).await
}

/// List cached surveys whose coordinate falls inside `bounds` (inclusive).
///
/// # Errors
///
/// Returns [`DbError`] if a query fails or a row cannot be decoded.
pub async fn list_surveys_in_bounds(
    pool: &SqlitePool,
    bounds: &BoundingBox,
) -> Result<Vec<Survey>, DbError> {
    let rows = sqlx::query_as::<_, SurveyRow>(&format!(
        "{SELECT_COLUMNS} \
         WHERE latitude BETWEEN ?1 AND ?2 \
           AND longitude BETWEEN ?3 AND ?4 \
         {ORDER_BY}"
    ))
    .bind(bounds.min_lat)
    .bind(bounds.max_lat)
    .bind(bounds.min_lng)
    .bind(bounds.max_lng)
    .fetch_all(pool)
    .await?;

    assemble_all(pool, rows).await
}

/// Number of cached surveys.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_surveys(pool: &SqlitePool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM surveys")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn assemble_all(pool: &SqlitePool, rows: Vec<SurveyRow>) -> Result<Vec<Survey>, DbError> {
    let mut surveys = Vec::with_capacity(rows.len());
    for row in rows {
        surveys.push(assemble(pool, row).await?);
    }
    Ok(surveys)
}

async fn assemble(pool: &SqlitePool, row: SurveyRow) -> Result<Survey, DbError> {
    let question_rows = sqlx::query_as::<_, SurveyQuestionRow>(
        "SELECT survey_id, id, question_type, prompt, required, position \
         FROM survey_questions \
         WHERE survey_id = ?1 \
         ORDER BY list_index ASC",
    )
    .bind(&row.id)
    .fetch_all(pool)
    .await?;

    let option_rows = sqlx::query_as::<_, SurveyOptionRow>(
        "SELECT id, survey_id, question_id, content, label, position \
         FROM survey_options \
         WHERE survey_id = ?1 \
         ORDER BY question_id ASC, position ASC",
    )
    .bind(&row.id)
    .fetch_all(pool)
    .await?;

    let mut options_by_question: HashMap<String, Vec<SurveyOption>> = HashMap::new();
    for option in option_rows {
        options_by_question
            .entry(option.question_id.clone())
            .or_default()
            .push(SurveyOption::from(option));
    }

    let questions = question_rows
        .into_iter()
        .map(|q| {
            let options = options_by_question.remove(&q.id).unwrap_or_default();
            q.into_question(options)
        })
        .collect::<Result<Vec<_>, _>>()?;

    row.into_survey(questions)
}
