//! Database operations for `surveys` and their owned `survey_questions` /
//! `survey_options` rows.
//!
//! Questions and options are never written on their own: they are replaced
//! together with their survey and removed by `ON DELETE CASCADE`.

mod read;
mod types;
mod write;

pub use read::{count_surveys, get_survey, list_surveys, list_surveys_in_bounds};
pub use types::{SurveyOptionRow, SurveyQuestionRow, SurveyRow};
pub use write::{delete_all_surveys, delete_survey, upsert_survey, upsert_surveys};
