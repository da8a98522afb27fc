use qzone_client::ApiError;
use qzone_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("not enough points: {required} required, {available} available")]
    InsufficientPoints { required: u32, available: u32 },

    #[error("survey {0} is already completed")]
    AlreadyCompleted(String),
}

impl SyncError {
    /// Short message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Api(e) => e.user_message(),
            SyncError::Db(_) => "Something went wrong saving your data.".to_string(),
            SyncError::NotFound { kind, .. } => format!("That {kind} is no longer available."),
            SyncError::InsufficientPoints {
                required,
                available,
            } => format!(
                "You need {} more points for this reward.",
                required.saturating_sub(*available)
            ),
            SyncError::AlreadyCompleted(_) => "You already completed this survey.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_points_message_names_the_shortfall() {
        let err = SyncError::InsufficientPoints {
            required: 800,
            available: 650,
        };
        assert_eq!(err.user_message(), "You need 150 more points for this reward.");
    }

    #[test]
    fn not_found_message_names_the_kind() {
        let err = SyncError::NotFound {
            kind: "reward",
            id: "r-1".to_string(),
        };
        assert_eq!(err.user_message(), "That reward is no longer available.");
        assert_eq!(err.to_string(), "reward not found: r-1");
    }
}
