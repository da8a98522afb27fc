//! Signed-in user: tokens, cached profile fields, and point balance.
//!
//! The profile starts from the catalog placeholder and is overlaid with
//! whatever the settings store remembers about the session and with the
//! persisted point history.

use std::sync::Arc;

use chrono::Utc;
use qzone_client::{ApiClient, TokenPair};
use qzone_core::{Catalog, CompletedSurvey, Redemption, Reward, Survey, UserProfile};
use qzone_db::{LocalStore, PointBalance, SettingKey, UserSession};
use tokio::sync::watch;

use crate::SyncError;

pub struct UserRepository {
    api: Arc<ApiClient>,
    store: LocalStore,
    catalog: Arc<Catalog>,
    profile: watch::Sender<UserProfile>,
}

impl UserRepository {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, store: LocalStore, catalog: Arc<Catalog>) -> Self {
        let profile = watch::Sender::new(catalog.profile.clone());
        Self {
            api,
            store,
            catalog,
            profile,
        }
    }

    /// Reload the saved session: tokens go to the shared holder, cached
    /// fields and point history are merged into the profile.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Db`] if the settings or history cannot be read.
    pub async fn restore_session(&self) -> Result<UserSession, SyncError> {
        let pool = self.store.pool();
        let session = qzone_db::load_session(pool).await?;
        let completed_surveys = qzone_db::list_completed_surveys(pool).await?;
        let redemptions = qzone_db::list_redemptions(pool).await?;

        if let (Some(access_token), Some(refresh_token)) =
            (session.access_token.clone(), session.refresh_token.clone())
        {
            self.api.tokens().set(TokenPair {
                access_token,
                refresh_token,
            });
        }

        let mut profile = self.catalog.profile.clone();
        apply_session(&mut profile, &session);
        profile.completed_surveys = completed_surveys;
        profile.redemptions = redemptions;
        self.profile.send_replace(profile);
        Ok(session)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.api.tokens().get().is_some()
    }

    /// Exchange a third-party identity token for API tokens and remember them.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Api`] if the backend rejects the token and
    /// [`SyncError::Db`] if the tokens cannot be saved.
    pub async fn login(&self, third_party_token: &str) -> Result<TokenPair, SyncError> {
        let tokens = self.api.login(third_party_token).await?;

        let pool = self.store.pool();
        qzone_db::set_setting(pool, SettingKey::AccessToken, &tokens.access_token).await?;
        qzone_db::set_setting(pool, SettingKey::RefreshToken, &tokens.refresh_token).await?;
        qzone_db::set_setting(pool, SettingKey::UpdatedAt, &Utc::now().to_rfc3339()).await?;

        Ok(tokens)
    }

    /// Forget tokens, every cached session field and the point history.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Db`] if the settings store cannot be cleared.
    pub async fn logout(&self) -> Result<(), SyncError> {
        self.api.tokens().clear();
        qzone_db::clear_session(self.store.pool()).await?;
        qzone_db::clear_history(self.store.pool()).await?;
        self.profile.send_replace(self.catalog.profile.clone());
        tracing::info!("signed out");
        Ok(())
    }

    #[must_use]
    pub fn profile(&self) -> UserProfile {
        self.profile.borrow().clone()
    }

    #[must_use]
    pub fn watch_profile(&self) -> watch::Receiver<UserProfile> {
        self.profile.subscribe()
    }

    /// Credit the points for a finished survey.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyCompleted`] if the survey was already
    /// credited and [`SyncError::Db`] if the new balance cannot be saved.
    pub async fn add_points(&self, survey: &Survey) -> Result<UserProfile, SyncError> {
        let mut profile = self.profile();
        if profile
            .completed_surveys
            .iter()
            .any(|c| c.survey_id == survey.id)
        {
            return Err(SyncError::AlreadyCompleted(survey.id.clone()));
        }

        let completed = CompletedSurvey {
            survey_id: survey.id.clone(),
            title: survey.title.clone(),
            points_earned: survey.points,
            completed_at: Utc::now(),
        };
        profile.total_points = profile.total_points.saturating_add(survey.points);

        // Stored history outlives this process and rejects repeat credits.
        let credited =
            qzone_db::record_completed_survey(self.store.pool(), &completed, balance(&profile))
                .await?;
        if !credited {
            return Err(SyncError::AlreadyCompleted(survey.id.clone()));
        }

        profile.completed_surveys.push(completed);
        self.profile.send_replace(profile.clone());
        tracing::info!(
            survey_id = %survey.id,
            earned = survey.points,
            total = profile.total_points,
            "points credited"
        );
        Ok(profile)
    }

    /// Deduct the cost of `reward` and record the redemption.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InsufficientPoints`] when the balance is too low
    /// and [`SyncError::Db`] if the new balance cannot be saved.
    pub async fn spend_points(&self, reward: &Reward) -> Result<Redemption, SyncError> {
        let mut profile = self.profile();
        if profile.total_points < reward.points_cost {
            return Err(SyncError::InsufficientPoints {
                required: reward.points_cost,
                available: profile.total_points,
            });
        }

        profile.total_points -= reward.points_cost;
        let redemption = Redemption {
            reward_id: reward.id.clone(),
            brand_name: reward.brand_name.clone(),
            points_spent: reward.points_cost,
            code: reward.redemption_code.clone(),
            redeemed_at: Utc::now(),
        };
        qzone_db::record_redemption(self.store.pool(), &redemption, balance(&profile)).await?;
        profile.redemptions.push(redemption.clone());
        self.profile.send_replace(profile);
        tracing::info!(reward_id = %reward.id, spent = reward.points_cost, "reward redeemed");
        Ok(redemption)
    }
}

fn balance(profile: &UserProfile) -> PointBalance {
    PointBalance {
        points: profile.total_points,
        points_to_next_rank: profile.points_to_next_tier(),
    }
}

/// Overlay the fields a saved session knows about onto `profile`.
fn apply_session(profile: &mut UserProfile, session: &UserSession) {
    if let Some(id) = &session.user_id {
        profile.id.clone_from(id);
    }
    if let Some(name) = &session.display_name {
        profile.display_name.clone_from(name);
    }
    if let Some(email) = &session.email {
        profile.email.clone_from(email);
    }
    if session.local_avatar_path.is_some() || session.avatar_url.is_some() {
        profile.avatar_url = session
            .local_avatar_path
            .clone()
            .or_else(|| session.avatar_url.clone());
    }
    if let Some(rank) = &session.rank {
        profile.rank.clone_from(rank);
    }
    if let Some(points) = session.points {
        profile.total_points = points;
        if let Some(to_next) = session.points_to_next_rank {
            profile.tier_points_goal = points.saturating_add(to_next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder() -> UserProfile {
        UserProfile {
            id: "demo".to_string(),
            display_name: "Demo".to_string(),
            email: "demo@example.com".to_string(),
            avatar_url: None,
            rank: "Bronze".to_string(),
            total_points: 100,
            tier_points_goal: 500,
            location_label: "Shanghai".to_string(),
            country: "China".to_string(),
            completed_surveys: vec![],
            redemptions: vec![],
        }
    }

    #[test]
    fn empty_session_leaves_placeholder_untouched() {
        let mut profile = placeholder();
        apply_session(&mut profile, &UserSession::default());
        assert_eq!(profile, placeholder());
    }

    #[test]
    fn session_points_rebuild_the_tier_goal() {
        let mut profile = placeholder();
        let session = UserSession {
            display_name: Some("Sam".to_string()),
            points: Some(640),
            points_to_next_rank: Some(360),
            ..UserSession::default()
        };
        apply_session(&mut profile, &session);

        assert_eq!(profile.display_name, "Sam");
        assert_eq!(profile.total_points, 640);
        assert_eq!(profile.tier_points_goal, 1_000);
        assert_eq!(profile.points_to_next_tier(), 360);
    }

    #[test]
    fn local_avatar_wins_over_remote() {
        let mut profile = placeholder();
        let session = UserSession {
            avatar_url: Some("https://cdn/a.png".to_string()),
            local_avatar_path: Some("/tmp/a.png".to_string()),
            ..UserSession::default()
        };
        apply_session(&mut profile, &session);
        assert_eq!(profile.avatar_url.as_deref(), Some("/tmp/a.png"));
    }
}
