use std::time::Duration;

use crate::Consistency;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Period of the background refresh
    pub poll_interval: Duration,
    pub consistency: Consistency,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            poll_interval: DEFAULT_POLL_INTERVAL,
            consistency: Consistency::default(),
        }
    }
}
