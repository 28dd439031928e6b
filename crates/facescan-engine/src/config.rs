use facescan_core::MatchThresholds;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Expected descriptor dimensionality; installs with any other length
    /// are rejected.
    pub descriptor_dim: usize,
    /// Candidates per batch. Batches exist to bound cancellation latency and
    /// the gap between progress emissions, not to parallelize work.
    pub batch_size: usize,
    /// How many recent per-item durations feed the ETA moving average.
    pub eta_window: usize,
    pub thresholds: MatchThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            descriptor_dim: 512,
            batch_size: 8,
            eta_window: 10,
            thresholds: MatchThresholds::default(),
        }
    }
}
