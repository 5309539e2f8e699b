//! Background scheduled tasks.
//!
//! - daily compound recalculation for every organization
//! - periodic expiry of stale redemption codes
//!
//! Call `spawn_all` once during startup.

use crate::config::SchedulerConfig;
use crate::services::{LoyaltyService, RewardService};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Time left until the next `hour:00` UTC strictly after `now`.
pub fn until_next_run(now: DateTime<Utc>, hour: u32) -> Duration {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    let today = now.date_naive().and_time(time).and_utc();
    let next = if today > now {
        today
    } else {
        today + Duration::days(1)
    };
    next - now
}

/// Spawn all background tasks. Tasks are detached via `tokio::spawn`.
pub fn spawn_all(
    config: &SchedulerConfig,
    loyalty_service: LoyaltyService,
    reward_service: RewardService,
) {
    if !config.enabled {
        log::info!("Scheduler disabled");
        return;
    }

    // 每日定时全量重算（默认 UTC 02:00）
    {
        let svc = loyalty_service.clone();
        let hour = config.daily_run_hour_utc;
        tokio::spawn(async move {
            loop {
                let wait = until_next_run(Utc::now(), hour);
                log::info!("Next loyalty recalculation in {} minutes", wait.num_minutes());
                tokio::time::sleep(wait.to_std().unwrap_or_default()).await;

                match svc.run_for_all_organizations().await {
                    Ok(r) => log::info!(
                        "Daily recalculation done: organizations={} succeeded={} failed={}",
                        r.organizations,
                        r.succeeded,
                        r.failed
                    ),
                    Err(e) => log::error!("Daily recalculation failed: {e:?}"),
                }
            }
        });
    }

    // 过期兑换码清理
    {
        let svc = reward_service.clone();
        let interval = config.reward_expiry_interval_secs.max(60);
        tokio::spawn(async move {
            loop {
                match svc.expire_stale_rewards(Utc::now()).await {
                    Ok(r) if r.rows_expired > 0 => {
                        log::info!("Expired reward codes processed: {}", r.rows_expired)
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire reward codes: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
            }
        });
    }
}
