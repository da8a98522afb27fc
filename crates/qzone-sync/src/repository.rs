//! Survey and nearby-location repository.
//!
//! Owns the observable survey snapshot and nearby list. Remote and storage
//! failures are logged and degrade to empty or no-op results; nothing is
//! retried.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use qzone_client::{ApiClient, NearbyQuery, PRECISION_FALLBACK};
use qzone_core::{bounding_box, Catalog, Coordinate, NearbyLocation, Survey};
use qzone_db::LocalStore;
use tokio::sync::watch;

use crate::location::LocationProvider;
use crate::SyncError;

const DEFAULT_MAX_RESULTS: u32 = 50;

/// Outcome of a nearby refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearbyRefresh {
    /// Results were found at `precision`.
    Found { precision: u8, count: usize },
    /// Every precision failed or came back empty.
    Exhausted,
}

pub struct SurveyRepository {
    api: Arc<ApiClient>,
    store: LocalStore,
    catalog: Arc<Catalog>,
    location: Option<LocationProvider>,
    max_results: u32,
    nearby: watch::Sender<Vec<NearbyLocation>>,
    surveys: watch::Sender<Vec<Survey>>,
}

impl SurveyRepository {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, store: LocalStore, catalog: Arc<Catalog>) -> Self {
        Self {
            api,
            store,
            catalog,
            location: None,
            max_results: DEFAULT_MAX_RESULTS,
            nearby: watch::Sender::new(Vec::new()),
            surveys: watch::Sender::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_location_provider(mut self, provider: LocationProvider) -> Self {
        self.location = Some(provider);
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Observable nearby list, replaced wholesale by every refresh.
    #[must_use]
    pub fn nearby_locations(&self) -> watch::Receiver<Vec<NearbyLocation>> {
        self.nearby.subscribe()
    }

    /// Observable survey snapshot.
    #[must_use]
    pub fn surveys(&self) -> watch::Receiver<Vec<Survey>> {
        self.surveys.subscribe()
    }

    #[must_use]
    pub fn current_nearby(&self) -> Vec<NearbyLocation> {
        self.nearby.borrow().clone()
    }

    // -----------------------------------------------------------------------
    // Nearby locations
    // -----------------------------------------------------------------------

    /// Query the backend around `user_location`, loosening precision until
    /// something comes back.
    ///
    /// A missing location searches around `(0, 0)`. On success the nearby
    /// list and the cached rows are replaced; when every precision fails the
    /// list is cleared and the cache is left alone.
    pub async fn refresh_nearby(
        &self,
        user_location: Option<Coordinate>,
        radius_meters: f64,
    ) -> NearbyRefresh {
        let center = user_location.unwrap_or_else(Coordinate::origin);

        for precision in PRECISION_FALLBACK {
            let query = NearbyQuery::new(center, radius_meters, precision, self.max_results);
            match self.api.nearby_locations(&query).await {
                Ok(response) if response.has_results() => {
                    let synced_at = Utc::now();
                    let locations: Vec<NearbyLocation> = response
                        .data
                        .into_iter()
                        .map(|dto| dto.into_location(synced_at))
                        .collect();
                    let count = locations.len();

                    self.nearby.send_replace(locations.clone());
                    if let Err(e) = self.store.replace_all_nearby_locations(&locations).await {
                        tracing::warn!(error = %e, "failed to cache nearby locations");
                    }

                    tracing::info!(precision, count, %center, "nearby refresh succeeded");
                    return NearbyRefresh::Found { precision, count };
                }
                Ok(response) => {
                    tracing::debug!(
                        precision,
                        success = response.success,
                        message = response.message.as_deref().unwrap_or(""),
                        "no nearby results; loosening precision"
                    );
                }
                Err(e) => {
                    tracing::warn!(precision, error = %e, "nearby query failed");
                }
            }
        }

        tracing::warn!(%center, radius_meters, "nearby refresh exhausted every precision");
        self.nearby.send_replace(Vec::new());
        NearbyRefresh::Exhausted
    }

    /// [`refresh_nearby`](Self::refresh_nearby) around the device's last known position.
    pub async fn refresh_nearby_from_device(&self, radius_meters: f64) -> NearbyRefresh {
        let position = match &self.location {
            Some(provider) => {
                let result = provider.get_last_location().await;
                if result.fix().is_none() {
                    tracing::info!(?result, "no device position; searching around the origin");
                }
                result.coordinate()
            }
            None => None,
        };
        self.refresh_nearby(position, radius_meters).await
    }

    /// Cached locations within `radius_meters` of `center`, for offline display.
    ///
    /// Rows the server sent without a distance get one computed locally.
    /// Results are nearest first.
    pub async fn load_cached_nearby(
        &self,
        center: Coordinate,
        radius_meters: f64,
    ) -> Vec<NearbyLocation> {
        let bounds = bounding_box(center, radius_meters);
        let mut locations = match self.store.nearby_locations_in_bounds(&bounds).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cached nearby locations");
                return Vec::new();
            }
        };

        for location in &mut locations {
            if location.distance_meters.is_none() {
                #[allow(clippy::cast_precision_loss)]
                let meters = center.distance_to(&location.coordinate()) as f64;
                location.distance_meters = Some(meters);
            }
        }
        locations.sort_by(|a, b| {
            a.distance_meters
                .unwrap_or(f64::MAX)
                .total_cmp(&b.distance_meters.unwrap_or(f64::MAX))
        });
        locations
    }

    // -----------------------------------------------------------------------
    // Surveys
    // -----------------------------------------------------------------------

    /// Load catalog surveys, keep any local progress, cache and publish them.
    ///
    /// Returns the number of surveys in the new snapshot.
    pub async fn refresh_surveys(&self) -> usize {
        let cached: HashMap<String, Survey> = match self.store.surveys().await {
            Ok(rows) => rows.into_iter().map(|s| (s.id.clone(), s)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cached surveys");
                HashMap::new()
            }
        };

        let merged: Vec<Survey> = self
            .catalog
            .surveys
            .iter()
            .cloned()
            .map(|mut survey| {
                if let Some(previous) = cached.get(&survey.id) {
                    carry_progress(&mut survey, previous);
                }
                survey
            })
            .collect();

        if let Err(e) = self.store.upsert_surveys(&merged).await {
            tracing::warn!(error = %e, "failed to cache surveys");
        }

        let count = merged.len();
        self.surveys.send_replace(merged);
        tracing::debug!(count, "survey snapshot refreshed");
        count
    }

    /// Look up a survey in the current snapshot.
    #[must_use]
    pub fn get_survey_by_id(&self, survey_id: &str) -> Option<Survey> {
        self.surveys
            .borrow()
            .iter()
            .find(|s| s.id == survey_id)
            .cloned()
    }

    /// Flag a survey as completed in the snapshot and, best-effort, in the cache.
    ///
    /// Returns the updated survey, or `None` if the snapshot does not contain it.
    pub async fn mark_survey_completed(&self, survey_id: &str) -> Option<Survey> {
        let updated = self.update_in_snapshot(survey_id, |survey| {
            survey.mark_completed();
            true
        })?;
        self.persist_survey(&updated).await;
        Some(updated)
    }

    /// Record the answer tokens for one question and step forward.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the survey is not in the snapshot or
    /// has no question `question_id`, and [`SyncError::AlreadyCompleted`] for
    /// a finished survey.
    pub async fn answer_question(
        &self,
        survey_id: &str,
        question_id: &str,
        answers: Vec<String>,
    ) -> Result<Survey, SyncError> {
        let survey = self
            .get_survey_by_id(survey_id)
            .ok_or_else(|| SyncError::NotFound {
                kind: "survey",
                id: survey_id.to_string(),
            })?;
        if survey.is_completed {
            return Err(SyncError::AlreadyCompleted(survey_id.to_string()));
        }

        let updated = self
            .update_in_snapshot(survey_id, |s| s.record_answer(question_id, answers))
            .ok_or_else(|| SyncError::NotFound {
                kind: "question",
                id: question_id.to_string(),
            })?;
        self.persist_survey(&updated).await;
        Ok(updated)
    }

    /// Apply `change` to the snapshot entry for `survey_id`; publishes only
    /// when `change` reports a modification.
    fn update_in_snapshot<F>(&self, survey_id: &str, change: F) -> Option<Survey>
    where
        F: FnOnce(&mut Survey) -> bool,
    {
        let mut updated = None;
        self.surveys.send_if_modified(|snapshot| {
            let Some(survey) = snapshot.iter_mut().find(|s| s.id == survey_id) else {
                return false;
            };
            if !change(survey) {
                return false;
            }
            updated = Some(survey.clone());
            true
        });
        updated
    }

    async fn persist_survey(&self, survey: &Survey) {
        if let Err(e) = self.store.upsert_survey(survey).await {
            tracing::warn!(survey_id = %survey.id, error = %e, "failed to persist survey");
        }
    }
}

/// Keep the user's progress from `previous` when catalog content is refreshed.
fn carry_progress(survey: &mut Survey, previous: &Survey) {
    survey.is_completed = previous.is_completed;
    survey.status = previous.status;
    survey.answers = previous
        .answers
        .iter()
        .filter(|(question_id, _)| survey.questions.iter().any(|q| &q.id == *question_id))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    survey.current_question_index = previous.current_question_index;
    survey.clamp_question_index();
}

#[cfg(test)]
mod tests {
    use qzone_core::{QuestionType, SurveyQuestion, SurveyStatus};

    use super::*;

    fn question(id: &str) -> SurveyQuestion {
        SurveyQuestion {
            id: id.to_string(),
            question_type: QuestionType::ShortText,
            prompt: String::new(),
            required: false,
            options: vec![],
            position: 0,
        }
    }

    fn survey(questions: &[&str]) -> Survey {
        Survey {
            id: "s".to_string(),
            title: "S".to_string(),
            description: String::new(),
            image_url: None,
            latitude: 0.0,
            longitude: 0.0,
            points: 10,
            is_completed: false,
            status: SurveyStatus::Empty,
            current_question_index: 0,
            question_count: questions.len(),
            questions: questions.iter().map(|id| question(id)).collect(),
            answers: Default::default(),
        }
    }

    #[test]
    fn carry_progress_drops_answers_for_removed_questions() {
        let mut previous = survey(&["q1", "q2", "q3"]);
        previous.status = SurveyStatus::InProgress;
        previous.current_question_index = 2;
        previous.answers.insert("q1".to_string(), vec!["a".to_string()]);
        previous.answers.insert("q3".to_string(), vec!["c".to_string()]);

        let mut fresh = survey(&["q1", "q2"]);
        carry_progress(&mut fresh, &previous);

        assert_eq!(fresh.status, SurveyStatus::InProgress);
        assert_eq!(fresh.current_question_index, 1, "index clamps to new count");
        assert_eq!(fresh.answers.len(), 1);
        assert!(fresh.answers.contains_key("q1"));
    }
}
