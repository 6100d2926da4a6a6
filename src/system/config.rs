//! Runtime configuration.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal crate imports
use crate::persistence::RecoveryMode;

/// The three startup behaviors a system can take toward its configured
/// persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PersistenceMode {
    #[default]
    Ignore,
    FailOnAnomaly,
    Recover(RecoveryMode),
}

/// Tunables for an [`crate::system::ActorSystem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub default_mailbox_capacity: usize,
    pub spawn_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub max_actors: usize,
    pub dead_letter_queue_capacity: usize,
    pub event_ring_capacity: usize,
    pub persistence: PersistenceMode,
}

impl SystemConfig {
    pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;
    pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_ACTORS: usize = 10_000;
    pub const DEFAULT_DEAD_LETTER_QUEUE_CAPACITY: usize = 1_000;
    pub const DEFAULT_EVENT_RING_CAPACITY: usize = 1_000;

    pub fn builder() -> SystemConfigBuilder {
        SystemConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_mailbox_capacity == 0 {
            return Err("default_mailbox_capacity must be greater than zero".to_string());
        }
        if self.max_actors == 0 {
            return Err("max_actors must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            default_mailbox_capacity: Self::DEFAULT_MAILBOX_CAPACITY,
            spawn_timeout: Self::DEFAULT_SPAWN_TIMEOUT,
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
            max_actors: Self::DEFAULT_MAX_ACTORS,
            dead_letter_queue_capacity: Self::DEFAULT_DEAD_LETTER_QUEUE_CAPACITY,
            event_ring_capacity: Self::DEFAULT_EVENT_RING_CAPACITY,
            persistence: PersistenceMode::default(),
        }
    }
}

/// Fluent builder for [`SystemConfig`].
#[derive(Debug, Default)]
pub struct SystemConfigBuilder {
    config: SystemConfig,
}

impl SystemConfigBuilder {
    pub fn default_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.default_mailbox_capacity = capacity;
        self
    }

    pub fn spawn_timeout(mut self, timeout: Duration) -> Self {
        self.config.spawn_timeout = timeout;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    pub fn max_actors(mut self, max: usize) -> Self {
        self.config.max_actors = max;
        self
    }

    pub fn dead_letter_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.dead_letter_queue_capacity = capacity;
        self
    }

    pub fn event_ring_capacity(mut self, capacity: usize) -> Self {
        self.config.event_ring_capacity = capacity;
        self
    }

    pub fn persistence(mut self, mode: PersistenceMode) -> Self {
        self.config.persistence = mode;
        self
    }

    pub fn build(self) -> Result<SystemConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SystemConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let result = SystemConfig::builder().default_mailbox_capacity(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_applies_overrides() {
        let config = SystemConfig::builder()
            .max_actors(5)
            .default_mailbox_capacity(16)
            .build()
            .expect("valid config");
        assert_eq!(config.max_actors, 5);
        assert_eq!(config.default_mailbox_capacity, 16);
    }
}
