//! Client configuration

/// Default server endpoint
pub const DEFAULT_URL: &str = "ws://127.0.0.1:2657";

/// Default capacity of the transport event channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Configuration for a roomlink client
///
/// # Example
///
/// ```
/// use roomlink_client::ClientConfig;
///
/// let config = ClientConfig::new("ws://game.example.com:2657")
///     .with_channel_capacity(256);
///
/// assert_eq!(config.url, "ws://game.example.com:2657");
/// assert_eq!(config.channel_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint used by `Client::connect_websocket`
    pub url: String,

    /// Capacity of the channel between the transport and the event loop.
    /// Values below 1 are clamped to 1.
    pub channel_capacity: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_new_keeps_default_capacity() {
        let config = ClientConfig::new("ws://localhost:9000");
        assert_eq!(config.url, "ws://localhost:9000");
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_capacity_is_clamped() {
        let config = ClientConfig::default().with_channel_capacity(0);
        assert_eq!(config.channel_capacity, 1);
    }
}
