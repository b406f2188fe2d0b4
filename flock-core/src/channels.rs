use crate::{ConfigError, DEFAULT_DATA_CHANNEL_INTERVAL_MS, MESSAGE_SIZE_MAX, MESSAGE_SIZE_MIN};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sendonly,
    Recvonly,
    Sendrecv,
}

/// A data channel requested in the `connect` message.
///
/// `interval`, `size_min` and `size_max` are local: they drive the background sender
/// for this label and are never sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChannelSpec {
    pub label: String,
    pub direction: Direction,
    /// Milliseconds between two sends.
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default = "default_size", alias = "size-min")]
    pub size_min: usize,
    #[serde(default = "default_size", alias = "size-max")]
    pub size_max: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_packet_life_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retransmits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
}

fn default_interval() -> u64 {
    DEFAULT_DATA_CHANNEL_INTERVAL_MS
}

fn default_size() -> usize {
    MESSAGE_SIZE_MIN
}

/// The server-facing part of a [`DataChannelSpec`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalingDataChannel {
    pub label: String,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_packet_life_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retransmits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
}

impl DataChannelSpec {
    pub fn new(label: &str, direction: Direction) -> Self {
        Self {
            label: label.to_string(),
            direction,
            interval: DEFAULT_DATA_CHANNEL_INTERVAL_MS,
            size_min: MESSAGE_SIZE_MIN,
            size_max: MESSAGE_SIZE_MIN,
            ordered: None,
            max_packet_life_time: None,
            max_retransmits: None,
            protocol: None,
            compress: None,
        }
    }

    pub fn interval(mut self, interval_ms: u64) -> Self {
        self.interval = interval_ms;
        self
    }

    pub fn sizes(mut self, min: usize, max: usize) -> Self {
        self.size_min = min;
        self.size_max = max;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Check bounds and normalize the size range.
    ///
    /// A `size_max` smaller than `size_min` is raised to `size_min`.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let fail = |reason: String| ConfigError::DataChannel {
            label: self.label.clone(),
            reason,
        };

        if self.label.is_empty() {
            return Err(fail("label must not be empty".to_string()));
        }
        if self.interval == 0 {
            return Err(fail("interval must be greater than 0".to_string()));
        }
        for (name, size) in [("size_min", self.size_min), ("size_max", self.size_max)] {
            if !(MESSAGE_SIZE_MIN..=MESSAGE_SIZE_MAX).contains(&size) {
                return Err(fail(format!(
                    "{name} must be within {MESSAGE_SIZE_MIN}..={MESSAGE_SIZE_MAX}, found {size}"
                )));
            }
        }

        if self.size_min > self.size_max {
            self.size_max = self.size_min;
        }
        Ok(self)
    }

    /// Whether this client writes to the channel.
    pub fn is_sender(&self) -> bool {
        matches!(self.direction, Direction::Sendonly | Direction::Sendrecv)
    }

    pub fn signaling(&self) -> SignalingDataChannel {
        SignalingDataChannel {
            label: self.label.clone(),
            direction: self.direction,
            ordered: self.ordered,
            max_packet_life_time: self.max_packet_life_time,
            max_retransmits: self.max_retransmits,
            protocol: self.protocol.clone(),
            compress: self.compress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_size_spellings() {
        let spec: DataChannelSpec = serde_json::from_value(json!({
            "label": "#spam",
            "direction": "sendrecv",
            "size-min": 100,
            "size_max": 200,
        }))
        .unwrap();
        assert_eq!(spec.size_min, 100);
        assert_eq!(spec.size_max, 200);
        assert_eq!(spec.interval, DEFAULT_DATA_CHANNEL_INTERVAL_MS);
    }

    #[test]
    fn validate_raises_size_max() {
        let spec = DataChannelSpec::new("#a", Direction::Sendonly)
            .sizes(500, 100)
            .validate()
            .unwrap();
        assert_eq!((spec.size_min, spec.size_max), (500, 500));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let too_small = DataChannelSpec::new("#a", Direction::Sendonly).sizes(10, 100);
        assert!(too_small.validate().is_err());

        let too_large = DataChannelSpec::new("#a", Direction::Sendonly).sizes(48, 256_001);
        assert!(too_large.validate().is_err());

        let no_interval = DataChannelSpec::new("#a", Direction::Sendonly).interval(0);
        assert!(matches!(
            no_interval.validate(),
            Err(ConfigError::DataChannel { .. })
        ));
    }

    #[test]
    fn signaling_form_drops_local_keys() {
        let spec = DataChannelSpec::new("#a", Direction::Recvonly)
            .interval(250)
            .sizes(64, 128)
            .compress(true);
        let value = serde_json::to_value(spec.signaling()).unwrap();
        assert_eq!(
            value,
            json!({"label": "#a", "direction": "recvonly", "compress": true})
        );
        assert!(!spec.is_sender());
    }
}
