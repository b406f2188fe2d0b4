use crate::{
    ConfigError, DataChannelSpec, Endpoint, DEFAULT_DISCONNECT_WAIT_TIMEOUT, DEFAULT_HATCH_RATE,
    DEFAULT_STATS_INTERVAL, FIRST_STATS_DELAY,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Sendonly,
    Recvonly,
    Sendrecv,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sendonly => "sendonly",
            Role::Recvonly => "recvonly",
            Role::Sendrecv => "sendrecv",
        }
    }
}

/// Requested video parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoOptions {
    pub enabled: bool,
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<u32>,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            codec_type: None,
            bit_rate: None,
        }
    }
}

impl VideoOptions {
    /// `false` when disabled, `true` when enabled without options, otherwise an object.
    pub fn signaling(&self) -> Value {
        if !self.enabled {
            return Value::Bool(false);
        }
        let mut obj = Map::new();
        if let Some(codec) = &self.codec_type {
            obj.insert("codec_type".to_string(), json!(codec));
        }
        if let Some(bit_rate) = self.bit_rate {
            obj.insert("bit_rate".to_string(), json!(bit_rate));
        }
        if obj.is_empty() {
            Value::Bool(true)
        } else {
            Value::Object(obj)
        }
    }
}

/// Requested audio parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioOptions {
    pub enabled: bool,
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<u32>,
    #[serde(default)]
    pub opus_clock_rate: Option<u32>,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            codec_type: None,
            bit_rate: None,
            opus_clock_rate: None,
        }
    }
}

impl AudioOptions {
    pub fn signaling(&self) -> Value {
        if !self.enabled {
            return Value::Bool(false);
        }
        let mut obj = Map::new();
        if let Some(codec) = &self.codec_type {
            obj.insert("codec_type".to_string(), json!(codec));
        }
        if let Some(bit_rate) = self.bit_rate {
            obj.insert("bit_rate".to_string(), json!(bit_rate));
        }
        if let Some(clock_rate) = self.opus_clock_rate {
            obj.insert("opus_params".to_string(), json!({ "clock_rate": clock_rate }));
        }
        if obj.is_empty() {
            Value::Bool(true)
        } else {
            Value::Object(obj)
        }
    }
}

/// Everything one simulated client needs to open a signaling session.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub signaling_urls: Vec<String>,
    pub channel_id: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub video: VideoOptions,
    #[serde(default)]
    pub audio: AudioOptions,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub signaling_notify_metadata: Option<Value>,
    #[serde(default)]
    pub multistream: Option<bool>,
    #[serde(default)]
    pub simulcast: bool,
    #[serde(default)]
    pub simulcast_rid: Option<String>,
    #[serde(default)]
    pub spotlight: bool,
    #[serde(default)]
    pub spotlight_number: Option<u32>,
    #[serde(default)]
    pub spotlight_focus_rid: Option<String>,
    #[serde(default)]
    pub spotlight_unfocus_rid: Option<String>,
    #[serde(default)]
    pub data_channel_signaling: Option<bool>,
    #[serde(default)]
    pub ignore_disconnect_websocket: Option<bool>,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_disconnect_wait_timeout")]
    pub disconnect_wait_timeout: Duration,
    #[serde(default)]
    pub data_channels: Vec<DataChannelSpec>,
    #[serde(default)]
    pub disable_signaling_url_randomization: bool,
    /// Stop scheduling reconnects once this many consecutive retries failed.
    #[serde(default)]
    pub max_retry: Option<u32>,
}

fn default_disconnect_wait_timeout() -> Duration {
    DEFAULT_DISCONNECT_WAIT_TIMEOUT
}

impl SessionConfig {
    pub fn new(channel_id: &str, signaling_urls: &[&str]) -> Self {
        Self {
            signaling_urls: signaling_urls.iter().map(|s| s.to_string()).collect(),
            channel_id: channel_id.to_string(),
            role: Role::default(),
            client_id: None,
            bundle_id: None,
            video: VideoOptions::default(),
            audio: AudioOptions::default(),
            metadata: None,
            signaling_notify_metadata: None,
            multistream: None,
            simulcast: false,
            simulcast_rid: None,
            spotlight: false,
            spotlight_number: None,
            spotlight_focus_rid: None,
            spotlight_unfocus_rid: None,
            data_channel_signaling: None,
            ignore_disconnect_websocket: None,
            disconnect_wait_timeout: DEFAULT_DISCONNECT_WAIT_TIMEOUT,
            data_channels: vec![],
            disable_signaling_url_randomization: false,
            max_retry: None,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn data_channel_signaling(mut self, enabled: bool) -> Self {
        self.data_channel_signaling = Some(enabled);
        self
    }

    pub fn ignore_disconnect_websocket(mut self, ignore: bool) -> Self {
        self.ignore_disconnect_websocket = Some(ignore);
        self
    }

    pub fn data_channel(mut self, spec: DataChannelSpec) -> Self {
        self.data_channels.push(spec);
        self
    }

    pub fn disconnect_wait_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_wait_timeout = timeout;
        self
    }

    pub fn fixed_url_order(mut self) -> Self {
        self.disable_signaling_url_randomization = true;
        self
    }

    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = Some(max_retry);
        self
    }

    pub fn endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        if self.signaling_urls.is_empty() {
            return Err(ConfigError::NoSignalingUrls);
        }
        self.signaling_urls
            .iter()
            .map(|url| Endpoint::parse(url).map_err(ConfigError::from))
            .collect()
    }

    /// Validate the whole session configuration, normalizing data-channel specs.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.channel_id.is_empty() {
            return Err(ConfigError::EmptyChannelId);
        }
        self.endpoints()?;
        self.data_channels = self
            .data_channels
            .into_iter()
            .map(DataChannelSpec::validate)
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

/// Shape of a whole simulation.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub clients: usize,
    /// Clients started per second.
    #[serde(default = "default_hatch_rate")]
    pub hatch_rate: f64,
    /// How long each client stays connected before disconnecting. Unset means forever.
    #[serde_as(as = "Option<DurationMilliSeconds>")]
    #[serde(default)]
    pub duration: Option<Duration>,
    /// Pause between a disconnect and the next reconnect. Unset means exit instead.
    #[serde_as(as = "Option<DurationMilliSeconds>")]
    #[serde(default)]
    pub repeat_interval: Option<Duration>,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_first_stats_delay")]
    pub first_stats_delay: Duration,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_stats_interval")]
    pub stats_interval: Duration,
}

fn default_hatch_rate() -> f64 {
    DEFAULT_HATCH_RATE
}

fn default_first_stats_delay() -> Duration {
    FIRST_STATS_DELAY
}

fn default_stats_interval() -> Duration {
    DEFAULT_STATS_INTERVAL
}

impl SimulationConfig {
    pub fn new(clients: usize) -> Self {
        Self {
            clients,
            hatch_rate: DEFAULT_HATCH_RATE,
            duration: None,
            repeat_interval: None,
            first_stats_delay: FIRST_STATS_DELAY,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }

    pub fn hatch_rate(mut self, hatch_rate: f64) -> Self {
        self.hatch_rate = hatch_rate;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn repeat_interval(mut self, interval: Duration) -> Self {
        self.repeat_interval = Some(interval);
        self
    }

    pub fn stats_interval(mut self, first: Duration, every: Duration) -> Self {
        self.first_stats_delay = first;
        self.stats_interval = every;
        self
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.hatch_rate.is_finite() && self.hatch_rate > 0.0) {
            return Err(ConfigError::HatchRate(self.hatch_rate.to_string()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;

    #[test]
    fn media_options_shape() {
        assert_eq!(VideoOptions::default().signaling(), json!(true));
        let disabled = VideoOptions {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(disabled.signaling(), json!(false));

        let video = VideoOptions {
            enabled: true,
            codec_type: Some("VP9".to_string()),
            bit_rate: Some(500),
        };
        assert_eq!(video.signaling(), json!({"codec_type": "VP9", "bit_rate": 500}));

        let audio = AudioOptions {
            opus_clock_rate: Some(48000),
            ..Default::default()
        };
        assert_eq!(
            audio.signaling(),
            json!({"opus_params": {"clock_rate": 48000}})
        );
    }

    #[test]
    fn session_config_defaults_from_json() {
        let config: SessionConfig = serde_json::from_value(json!({
            "signaling_urls": ["ws://127.0.0.1:5000/signaling"],
            "channel_id": "load",
        }))
        .unwrap();
        assert_eq!(config.role, Role::Sendonly);
        assert_eq!(config.disconnect_wait_timeout, Duration::from_secs(5));
        assert!(config.video.enabled && config.audio.enabled);
        assert_eq!(config, SessionConfig::new("load", &["ws://127.0.0.1:5000/signaling"]));
    }

    #[test]
    fn validate_checks_urls_and_channels() {
        let bad_url = SessionConfig::new("load", &["http://127.0.0.1/signaling"]);
        assert!(matches!(bad_url.validate(), Err(ConfigError::Endpoint(_))));

        let no_urls = SessionConfig::new("load", &[]);
        assert_eq!(no_urls.validate(), Err(ConfigError::NoSignalingUrls));

        let channels = SessionConfig::new("load", &["wss://example.com/signaling"])
            .data_channel(DataChannelSpec::new("#x", Direction::Sendonly).sizes(100, 50))
            .validate()
            .unwrap();
        assert_eq!(channels.data_channels[0].size_max, 100);
    }

    #[test]
    fn hatch_rate_must_be_positive() {
        assert!(SimulationConfig::new(3).hatch_rate(0.0).validate().is_err());
        assert!(SimulationConfig::new(3).hatch_rate(f64::NAN).validate().is_err());
        assert!(SimulationConfig::new(3).hatch_rate(0.5).validate().is_ok());
    }
}
