//! Run metrics
//!
//! Counters the orchestrator updates every tick, plus the derived figures
//! reported at the end of a run.

use std::collections::BTreeMap;

use log::info;

use super::types::VehicleId;

/// Aggregate wait figures over every vehicle seen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitSummary {
    pub max: u32,
    pub min: u32,
    pub mean: f64,
}

/// Counters exposed after (or during) a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimMetrics {
    pub spawned: usize,
    pub exited: usize,
    /// Vehicles removed after an error in their own update
    pub dropped: usize,
    /// Highest wait time observed for each vehicle ever spawned
    pub max_wait: BTreeMap<VehicleId, u32>,
}

impl SimMetrics {
    pub fn record_spawn(&mut self, vehicle: VehicleId) {
        self.spawned += 1;
        self.max_wait.entry(vehicle).or_insert(0);
    }

    pub fn record_exit(&mut self) {
        self.exited += 1;
    }

    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub fn observe_wait(&mut self, vehicle: VehicleId, wait_time: u32) {
        let entry = self.max_wait.entry(vehicle).or_insert(0);
        *entry = (*entry).max(wait_time);
    }

    /// Vehicles still in the network
    pub fn active(&self) -> usize {
        self.spawned.saturating_sub(self.exited + self.dropped)
    }

    /// Share of spawned vehicles that left through an exit, in percent
    pub fn completion_rate(&self) -> f64 {
        if self.spawned == 0 {
            0.0
        } else {
            self.exited as f64 / self.spawned as f64 * 100.0
        }
    }

    pub fn wait_summary(&self) -> Option<WaitSummary> {
        let max = *self.max_wait.values().max()?;
        let min = *self.max_wait.values().min()?;
        let total: u64 = self.max_wait.values().map(|w| u64::from(*w)).sum();
        Some(WaitSummary {
            max,
            min,
            mean: total as f64 / self.max_wait.len() as f64,
        })
    }

    /// Log the end-of-run report
    pub fn log_report(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Total vehicles spawned: {}", self.spawned);
        info!("Vehicles exited: {}", self.exited);
        info!("Active vehicles: {}", self.active());
        if self.dropped > 0 {
            info!("Vehicles removed after errors: {}", self.dropped);
        }
        info!("Completion rate: {:.1}%", self.completion_rate());
        if let Some(summary) = self.wait_summary() {
            info!("Maximum wait time: {} ticks", summary.max);
            info!("Minimum wait time: {} ticks", summary.min);
            info!("Average wait time: {:.2} ticks", summary.mean);
        }
    }
}
