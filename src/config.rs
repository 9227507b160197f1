use std::env;

/// Engine configuration
///
/// Loaded from environment variables; the demo binary lets command line
/// flags override the result.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of worker threads processing the async queue.
    pub num_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { num_workers: 1 }
    }
}

/// Load configuration from the environment.
///
/// Recognized variables: `ENGINE_WORKERS` (worker pool size). Log level is
/// handled separately by the logging setup via `LOG_LEVEL`.
pub fn load_config() -> EngineConfig {
    let mut config = EngineConfig::default();

    if let Ok(workers) = env::var("ENGINE_WORKERS") {
        if let Ok(workers) = workers.parse::<usize>() {
            if workers > 0 {
                config.num_workers = workers;
            }
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.num_workers, 1);
    }
}
