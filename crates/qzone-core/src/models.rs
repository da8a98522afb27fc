//! Domain records shared by the store, the API client and the repositories.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    #[default]
    Empty,
    InProgress,
    Complete,
}

impl SurveyStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SurveyStatus::Empty => "empty",
            SurveyStatus::InProgress => "in_progress",
            SurveyStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurveyStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(SurveyStatus::Empty),
            "in_progress" => Ok(SurveyStatus::InProgress),
            "complete" => Ok(SurveyStatus::Complete),
            other => Err(CoreError::InvalidSurveyStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    ShortText,
    Rating,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::ShortText => "short_text",
            QuestionType::Rating => "rating",
        }
    }

    /// Whether answers are picked from the question's option list.
    #[must_use]
    pub fn has_options(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(QuestionType::SingleChoice),
            "multi_choice" => Ok(QuestionType::MultiChoice),
            "short_text" => Ok(QuestionType::ShortText),
            "rating" => Ok(QuestionType::Rating),
            other => Err(CoreError::InvalidQuestionType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyOption {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub content: String,
    /// Short display label such as `"A"` or `"B"`.
    pub label: String,
}

impl SurveyOption {
    #[must_use]
    pub fn new(content: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: String,
    pub question_type: QuestionType,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<SurveyOption>,
    /// Position within the parent survey.
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub status: SurveyStatus,
    #[serde(default)]
    pub current_question_index: usize,
    #[serde(default)]
    pub question_count: usize,
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,
    /// Free-text answer tokens keyed by question id.
    #[serde(default)]
    pub answers: BTreeMap<String, Vec<String>>,
}

impl Survey {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// `question_count` agrees with the loaded question list.
    ///
    /// A survey whose questions have not been loaded yet is always consistent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.questions.is_empty() || self.question_count == self.questions.len()
    }

    /// Keep `current_question_index` within `[0, question_count - 1]`.
    pub fn clamp_question_index(&mut self) {
        self.current_question_index = if self.question_count == 0 {
            0
        } else {
            self.current_question_index.min(self.question_count - 1)
        };
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&SurveyQuestion> {
        self.questions.get(self.current_question_index)
    }

    /// Store the answer tokens for `question_id` and step to the next question.
    ///
    /// Returns `false` when the survey has no such question.
    pub fn record_answer(&mut self, question_id: &str, tokens: Vec<String>) -> bool {
        let Some(position) = self.questions.iter().position(|q| q.id == question_id) else {
            return false;
        };
        self.answers.insert(question_id.to_string(), tokens);
        if self.status == SurveyStatus::Empty {
            self.status = SurveyStatus::InProgress;
        }
        self.current_question_index = position + 1;
        self.clamp_question_index();
        true
    }

    pub fn mark_completed(&mut self) {
        self.is_completed = true;
        self.status = SurveyStatus::Complete;
    }

    /// Every required question has at least one answer token.
    #[must_use]
    pub fn required_answered(&self) -> bool {
        self.questions
            .iter()
            .filter(|q| q.required)
            .all(|q| self.answers.get(&q.id).is_some_and(|a| !a.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyLocation {
    pub document_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters from the user, either server-computed or filled in locally.
    #[serde(default)]
    pub distance_meters: Option<f64>,
    pub last_synced_at: DateTime<Utc>,
}

impl NearbyLocation {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSurvey {
    pub survey_id: String,
    pub title: String,
    pub points_earned: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub reward_id: String,
    pub brand_name: String,
    pub points_spent: u32,
    pub code: String,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub rank: String,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub tier_points_goal: u32,
    #[serde(default)]
    pub location_label: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub completed_surveys: Vec<CompletedSurvey>,
    #[serde(default)]
    pub redemptions: Vec<Redemption>,
}

impl UserProfile {
    /// Progress toward the next tier in `[0, 1]`; a zero goal reports no progress.
    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        if self.tier_points_goal == 0 {
            return 0.0;
        }
        (f64::from(self.total_points) / f64::from(self.tier_points_goal)).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn points_to_next_tier(&self) -> u32 {
        self.tier_points_goal.saturating_sub(self.total_points)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub brand_name: String,
    pub description: String,
    pub points_cost: u32,
    pub expiry_label: String,
    #[serde(default)]
    pub terms: String,
    /// Code shown to the user after redemption; the catalog carries a placeholder.
    pub redemption_code: String,
    #[serde(default)]
    pub image_url: Option<String>,
}
