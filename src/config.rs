//! Stage configuration.

/// Worker count and output buffer capacity of a single stage.
///
/// Both values are fixed for the lifetime of the stage. Out-of-range values are
/// coerced rather than rejected: fewer than one worker becomes one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StageConfig {
    /// Number of items each output channel buffers before senders block
    pub buffer_size: usize,
    /// Number of concurrent workers
    pub workers: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1,
            workers: 1,
        }
    }
}

impl StageConfig {
    /// Create a configuration with the given buffer capacity and worker count
    pub fn new(buffer_size: usize, workers: usize) -> Self {
        Self {
            buffer_size,
            workers,
        }
    }

    /// Build from signed values, clamping a negative buffer to zero and a
    /// worker count below one to one.
    pub fn from_signed(buffer_size: i64, workers: i64) -> Self {
        Self {
            buffer_size: usize::try_from(buffer_size.max(0)).unwrap_or(usize::MAX),
            workers: usize::try_from(workers.max(1)).unwrap_or(usize::MAX),
        }
    }

    /// Set the buffer size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the number of workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Worker count actually spawned
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// Capacity handed to `tokio::sync::mpsc::channel`.
    ///
    /// tokio has no zero-capacity rendezvous channel, so a buffer of 0 becomes a
    /// single slot.
    pub fn channel_capacity(&self) -> usize {
        self.buffer_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion() {
        let config = StageConfig::new(0, 0);
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.channel_capacity(), 1);

        let config = StageConfig::from_signed(-5, -3);
        assert_eq!(config, StageConfig::new(0, 1));

        let config = StageConfig::from_signed(8, 4);
        assert_eq!(config.channel_capacity(), 8);
        assert_eq!(config.worker_count(), 4);
    }

    #[test]
    fn test_builder() {
        let config = StageConfig::default().buffer_size(16).workers(3);
        assert_eq!(config, StageConfig::new(16, 3));
    }
}
