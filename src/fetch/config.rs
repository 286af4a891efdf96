use std::time::Duration;

/// Client-side request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchConfig {
    /// Upper bound on a single request; unbounded when `None`.
    pub request_timeout: Option<Duration>,
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
