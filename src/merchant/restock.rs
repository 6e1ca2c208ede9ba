//! Periodic restocking, independent of user activity.
//!
//! Vend menus also restock lazily when opened, so the tick only bounds how
//! stale an unvisited merchant's stock can get.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::game::MerchantWorld;

#[derive(Debug, Clone, Copy)]
pub struct RestockScheduler {
    interval: Duration,
}

impl RestockScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One pass over every merchant in the world
    pub fn tick(&self, world: &MerchantWorld) -> usize {
        let restocked = world.restock_all(Utc::now());
        if restocked > 0 {
            debug!("Restock tick refreshed {} entries", restocked);
        }
        restocked
    }

    /// Run ticks forever on the tokio runtime
    pub fn spawn(self, world: Arc<MerchantWorld>) -> JoinHandle<()> {
        info!("Restock scheduler running every {:?}", self.interval);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                self.tick(&world);
            }
        })
    }
}
