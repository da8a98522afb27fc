//! Reward catalog and redemption.

use std::sync::Arc;

use qzone_core::{Catalog, Redemption, Reward};

use crate::user::UserRepository;
use crate::SyncError;

pub struct RewardRepository {
    catalog: Arc<Catalog>,
}

impl RewardRepository {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Rewards ordered cheapest first.
    #[must_use]
    pub fn list_rewards(&self) -> Vec<Reward> {
        let mut rewards = self.catalog.rewards.clone();
        rewards.sort_by(|a, b| a.points_cost.cmp(&b.points_cost).then_with(|| a.id.cmp(&b.id)));
        rewards
    }

    #[must_use]
    pub fn get_reward(&self, reward_id: &str) -> Option<Reward> {
        self.catalog.rewards.iter().find(|r| r.id == reward_id).cloned()
    }

    /// Rewards the user can currently afford.
    #[must_use]
    pub fn affordable(&self, balance: u32) -> Vec<Reward> {
        self.list_rewards()
            .into_iter()
            .filter(|r| r.points_cost <= balance)
            .collect()
    }

    /// Redeem `reward_id` against the user's point balance.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] for an unknown reward and whatever
    /// [`UserRepository::spend_points`] reports otherwise.
    pub async fn redeem(
        &self,
        reward_id: &str,
        user: &UserRepository,
    ) -> Result<Redemption, SyncError> {
        let reward = self
            .get_reward(reward_id)
            .ok_or_else(|| SyncError::NotFound {
                kind: "reward",
                id: reward_id.to_string(),
            })?;
        user.spend_points(&reward).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rewards_are_listed_cheapest_first() {
        let repo = RewardRepository::new(Arc::new(Catalog::builtin().unwrap()));
        let costs: Vec<u32> = repo.list_rewards().iter().map(|r| r.points_cost).collect();
        let mut sorted = costs.clone();
        sorted.sort_unstable();
        assert_eq!(costs, sorted);
        assert!(!costs.is_empty());
    }

    #[test]
    fn affordable_filters_by_balance() {
        let repo = RewardRepository::new(Arc::new(Catalog::builtin().unwrap()));
        assert!(repo.affordable(0).is_empty());
        assert!(repo
            .affordable(u32::MAX)
            .iter()
            .all(|r| repo.get_reward(&r.id).is_some()));
    }

    #[test]
    fn unknown_reward_is_none() {
        let repo = RewardRepository::new(Arc::new(Catalog::builtin().unwrap()));
        assert!(repo.get_reward("does-not-exist").is_none());
    }
}
