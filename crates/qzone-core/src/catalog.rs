//! Placeholder catalog of surveys, rewards and the demo profile.
//!
//! The reward and user repositories serve this data until the backend
//! exposes real endpoints for them. A copy of `config/catalog.yaml` is
//! compiled in so a missing file still yields a usable catalog.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{Reward, Survey, UserProfile};
use crate::ConfigError;

const BUILTIN_CATALOG: &str = include_str!("../../../config/catalog.yaml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub surveys: Vec<Survey>,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    pub profile: UserProfile,
}

impl Catalog {
    /// Parse and validate catalog YAML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::CatalogFileParse` on malformed YAML and
    /// `ConfigError::Validation` when the content breaks a catalog rule.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut catalog: Catalog =
            serde_yaml::from_str(content).map_err(ConfigError::CatalogFileParse)?;
        catalog.normalize();
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    /// The catalog compiled into the binary.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled YAML itself is broken.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    // Question positions follow list order; a missing count is taken from the list.
    fn normalize(&mut self) {
        for survey in &mut self.surveys {
            for (position, question) in survey.questions.iter_mut().enumerate() {
                question.position = i64::try_from(position).unwrap_or(i64::MAX);
            }
            if survey.question_count == 0 {
                survey.question_count = survey.questions.len();
            }
            survey.clamp_question_index();
        }
    }
}

/// Load the catalog from `path`, falling back to the bundled copy when the
/// file does not exist.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Catalog::from_yaml(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Catalog::builtin(),
        Err(e) => Err(ConfigError::CatalogFileIo {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

fn validate_catalog(catalog: &Catalog) -> Result<(), ConfigError> {
    let mut survey_ids = HashSet::new();
    for survey in &catalog.surveys {
        if survey.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "survey id must be non-empty".to_string(),
            ));
        }
        if !survey_ids.insert(survey.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate survey id: '{}'",
                survey.id
            )));
        }
        if !survey.is_consistent() {
            return Err(ConfigError::Validation(format!(
                "survey '{}' declares {} questions but lists {}",
                survey.id,
                survey.question_count,
                survey.questions.len()
            )));
        }

        let mut question_ids = HashSet::new();
        for question in &survey.questions {
            if !question_ids.insert(question.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "survey '{}' has duplicate question id '{}'",
                    survey.id, question.id
                )));
            }
            if question.question_type.has_options() == question.options.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "question '{}' in survey '{}': {} questions {} options",
                    question.id,
                    survey.id,
                    question.question_type,
                    if question.options.is_empty() {
                        "need"
                    } else {
                        "take no"
                    }
                )));
            }
        }
    }

    let mut reward_ids = HashSet::new();
    for reward in &catalog.rewards {
        if !reward_ids.insert(reward.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate reward id: '{}'",
                reward.id
            )));
        }
        if reward.points_cost == 0 {
            return Err(ConfigError::Validation(format!(
                "reward '{}' must cost at least one point",
                reward.id
            )));
        }
    }

    Ok(())
}
