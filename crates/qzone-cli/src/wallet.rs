//! Rewards, profile and session commands.

use crate::app::App;
use crate::surveys::user_facing;

pub(crate) fn run_rewards(app: &App, affordable: bool) {
    let balance = app.user.profile().total_points;
    let rewards = if affordable {
        app.rewards.affordable(balance)
    } else {
        app.rewards.list_rewards()
    };
    println!("balance: {balance} points");
    for reward in &rewards {
        let mark = if reward.points_cost <= balance { " " } else { "x" };
        println!(
            "{mark} {:<22} {:>5} pts  {}: {} ({})",
            reward.id, reward.points_cost, reward.brand_name, reward.description, reward.expiry_label
        );
    }
}

pub(crate) async fn run_redeem(app: &App, reward_id: &str) -> anyhow::Result<()> {
    let redemption = app
        .rewards
        .redeem(reward_id, &app.user)
        .await
        .map_err(user_facing)?;
    println!(
        "redeemed {} for {} points; code {}",
        redemption.brand_name, redemption.points_spent, redemption.code
    );
    println!("remaining balance: {}", app.user.profile().total_points);
    Ok(())
}

pub(crate) fn run_profile(app: &App) {
    let profile = app.user.profile();
    println!("{} <{}>", profile.display_name, profile.email);
    println!("{}, {}", profile.location_label, profile.country);
    println!(
        "rank {}: {} / {} points ({:.0}%), {} to next tier",
        profile.rank,
        profile.total_points,
        profile.tier_points_goal,
        profile.progress_fraction() * 100.0,
        profile.points_to_next_tier()
    );
    println!(
        "signed in: {}",
        if app.user.is_signed_in() { "yes" } else { "no" }
    );
    for done in &profile.completed_surveys {
        println!("  completed {} (+{})", done.title, done.points_earned);
    }
}

pub(crate) async fn run_login(app: &App, token: &str) -> anyhow::Result<()> {
    app.user.login(token).await.map_err(user_facing)?;
    println!("signed in");
    Ok(())
}

pub(crate) async fn run_logout(app: &App) -> anyhow::Result<()> {
    app.user.logout().await.map_err(user_facing)?;
    println!("signed out");
    Ok(())
}
