//! Connection settings shared by every role wrapper.
use std::time::Duration;

/// Where the broker lives and how long socket operations may block.
///
/// A zero duration is treated the same as `None`.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use lucidmq_client::ClientConfig;
///
/// let config = ClientConfig::new("127.0.0.1", 6969).with_read_timeout(Duration::from_secs(5));
/// assert_eq!(config.address(), "127.0.0.1:6969");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for establishing the TCP connection. `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// Read deadline for a response frame. `None` blocks until the peer answers or hangs up.
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sockets reject a zero deadline, so it is dropped here.
pub(crate) fn deadline(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}
