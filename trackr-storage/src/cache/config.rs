//! Cache configuration.

use std::time::Duration;

/// Configuration for the cached collection client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a committed snapshot stays fresh.
    pub ttl: Duration,
    /// Page size requested from the remote during a sweep.
    pub sweep_page_size: usize,
    /// Upper bound on pages fetched in one sweep.
    pub max_sweep_pages: usize,
    /// Deadline for a whole sweep. `None` means no deadline.
    pub sweep_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300), // 5 minutes
            sweep_page_size: 100,
            max_sweep_pages: 1000,
            sweep_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the sweep page size. Zero is raised to one.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.sweep_page_size = size.max(1);
        self
    }

    /// Set the maximum number of pages per sweep.
    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_sweep_pages = pages;
        self
    }

    /// Set a deadline for each sweep.
    pub fn with_sweep_timeout(mut self, timeout: Duration) -> Self {
        self.sweep_timeout = Some(timeout);
        self
    }
}
