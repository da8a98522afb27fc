//! Row types for the survey tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use qzone_core::{QuestionType, Survey, SurveyOption, SurveyQuestion, SurveyStatus};
use sqlx::types::Json;
use uuid::Uuid;

use crate::DbError;

/// A row from the `surveys` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurveyRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub points: i64,
    pub is_completed: bool,
    pub status: String,
    pub current_question_index: i64,
    pub question_count: i64,
    pub answers: Json<BTreeMap<String, Vec<String>>>,
    pub last_synced_at: DateTime<Utc>,
}

/// A row from the `survey_questions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurveyQuestionRow {
    pub survey_id: String,
    pub id: String,
    pub question_type: String,
    pub prompt: String,
    pub required: bool,
    pub position: i64,
}

/// A row from the `survey_options` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurveyOptionRow {
    pub id: Uuid,
    pub survey_id: String,
    pub question_id: String,
    pub content: String,
    pub label: String,
    pub position: i64,
}

impl SurveyRow {
    /// Assemble the domain survey from this row and its already-grouped questions.
    pub(crate) fn into_survey(self, questions: Vec<SurveyQuestion>) -> Result<Survey, DbError> {
        let status = self
            .status
            .parse::<SurveyStatus>()
            .map_err(|e| DbError::Decode {
                column: "surveys.status",
                reason: e.to_string(),
            })?;

        Ok(Survey {
            id: self.id,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            latitude: self.latitude,
            longitude: self.longitude,
            points: non_negative("surveys.points", self.points)?,
            is_completed: self.is_completed,
            status,
            current_question_index: non_negative(
                "surveys.current_question_index",
                self.current_question_index,
            )?,
            question_count: non_negative("surveys.question_count", self.question_count)?,
            questions,
            answers: self.answers.0,
        })
    }
}

impl SurveyQuestionRow {
    pub(crate) fn into_question(self, options: Vec<SurveyOption>) -> Result<SurveyQuestion, DbError> {
        let question_type =
            self.question_type
                .parse::<QuestionType>()
                .map_err(|e| DbError::Decode {
                    column: "survey_questions.question_type",
                    reason: e.to_string(),
                })?;

        Ok(SurveyQuestion {
            id: self.id,
            question_type,
            prompt: self.prompt,
            required: self.required,
            options,
            position: self.position,
        })
    }
}

impl From<SurveyOptionRow> for SurveyOption {
    fn from(row: SurveyOptionRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            label: row.label,
        }
    }
}

fn non_negative<T: TryFrom<i64>>(column: &'static str, value: i64) -> Result<T, DbError> {
    T::try_from(value).map_err(|_| DbError::Decode {
        column,
        reason: format!("{value} is out of range"),
    })
}
