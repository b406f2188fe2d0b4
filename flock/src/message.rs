//! JSON signaling messages.
use crate::error::ProtocolError;
use flock_core::{Role, SessionConfig, SignalingDataChannel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Inbound {
    Offer(Offer),
    Update(Renegotiation),
    ReOffer(Renegotiation),
    Ping(Ping),
    Notify(Notify),
    Redirect(Redirect),
    Switched(Switched),
    ReqStats,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Offer {
    pub sdp: String,
    pub connection_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub encodings: Option<Vec<Value>>,
    #[serde(default)]
    pub mid: Option<Mid>,
    #[serde(default)]
    pub data_channels: Vec<OfferedDataChannel>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Mid {
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OfferedDataChannel {
    pub label: String,
    #[serde(default)]
    pub compress: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Renegotiation {
    pub sdp: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ping {
    #[serde(default)]
    pub stats: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notify {
    pub event_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Notify {
    pub fn field(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Redirect {
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Switched {
    #[serde(default)]
    pub ignore_disconnect_websocket: bool,
}

impl Inbound {
    /// Parse one text frame.
    ///
    /// Broken JSON and frames without a `type` are [`ProtocolError::Malformed`] /
    /// [`ProtocolError::MissingType`]. A known type with missing or mistyped fields is a
    /// [`ProtocolError::Violation`]. Unknown types parse as [`Inbound::Unknown`].
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();
        serde_json::from_value(value).map_err(|source| ProtocolError::Violation { kind, source })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Offer(_) => "offer",
            Inbound::Update(_) => "update",
            Inbound::ReOffer(_) => "re-offer",
            Inbound::Ping(_) => "ping",
            Inbound::Notify(_) => "notify",
            Inbound::Redirect(_) => "redirect",
            Inbound::Switched(_) => "switched",
            Inbound::ReqStats => "req-stats",
            Inbound::Unknown => "unknown",
        }
    }
}

/// Messages this client sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Outbound {
    Connect(Box<Connect>),
    Answer {
        sdp: String,
    },
    Update {
        sdp: String,
    },
    ReAnswer {
        sdp: String,
    },
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<Value>,
    },
    Stats {
        reports: Value,
    },
    Candidate {
        candidate: String,
    },
    Disconnect,
}

impl Outbound {
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connect {
    pub role: Role,
    pub channel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub redirect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multistream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulcast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulcast_rid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotlight: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotlight_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotlight_focus_rid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotlight_unfocus_rid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signaling_notify_metadata: Option<Value>,
    pub video: Value,
    pub audio: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_channel_signaling: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_disconnect_websocket: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_channels: Vec<SignalingDataChannel>,
}

impl Connect {
    pub fn new(config: &SessionConfig, redirect: bool) -> Self {
        Self {
            role: config.role,
            channel_id: config.channel_id.clone(),
            client_id: config.client_id.clone(),
            bundle_id: config.bundle_id.clone(),
            redirect,
            multistream: config.multistream,
            simulcast: config.simulcast.then_some(true),
            simulcast_rid: config.simulcast_rid.clone(),
            spotlight: config.spotlight.then_some(true),
            spotlight_number: config.spotlight_number.filter(|n| *n > 0),
            spotlight_focus_rid: config.spotlight_focus_rid.clone(),
            spotlight_unfocus_rid: config.spotlight_unfocus_rid.clone(),
            metadata: config.metadata.clone(),
            signaling_notify_metadata: config.signaling_notify_metadata.clone(),
            video: config.video.signaling(),
            audio: config.audio.signaling(),
            data_channel_signaling: config.data_channel_signaling,
            ignore_disconnect_websocket: config.ignore_disconnect_websocket,
            data_channels: config.data_channels.iter().map(|c| c.signaling()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::{DataChannelSpec, Direction};
    use serde_json::json;

    #[test]
    fn parses_offer() {
        let offer = Inbound::parse(
            &json!({
                "type": "offer",
                "sdp": "v=0",
                "connection_id": "CONN",
                "config": {"iceServers": []},
                "data_channels": [
                    {"label": "signaling", "compress": true},
                    {"label": "stats"},
                ],
                "mid": {"video": "1"},
            })
            .to_string(),
        )
        .unwrap();

        let Inbound::Offer(offer) = offer else {
            panic!("expected offer, got {offer:?}");
        };
        assert_eq!(offer.connection_id, "CONN");
        assert!(offer.data_channels[0].compress);
        assert!(!offer.data_channels[1].compress);
        assert_eq!(offer.mid.and_then(|m| m.video).as_deref(), Some("1"));
    }

    #[test]
    fn classifies_bad_messages() {
        assert!(matches!(
            Inbound::parse("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            Inbound::parse(r#"{"sdp":"v=0"}"#),
            Err(ProtocolError::MissingType)
        ));

        let err = Inbound::parse(r#"{"type":"offer","connection_id":"C"}"#).unwrap_err();
        assert!(err.is_violation());
        assert!(err.to_string().contains("offer"));

        assert_eq!(
            Inbound::parse(r#"{"type":"from-the-future","x":1}"#).unwrap(),
            Inbound::Unknown
        );
    }

    #[test]
    fn parses_small_messages() {
        assert_eq!(
            Inbound::parse(r#"{"type":"ping"}"#).unwrap(),
            Inbound::Ping(Ping { stats: false })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"re-offer","sdp":"x"}"#).unwrap(),
            Inbound::ReOffer(Renegotiation {
                sdp: "x".to_string()
            })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"req-stats"}"#).unwrap(),
            Inbound::ReqStats
        );

        let Inbound::Notify(notify) = Inbound::parse(
            r#"{"type":"notify","event_type":"network.status","unstable_level":2}"#,
        )
        .unwrap() else {
            panic!("expected notify");
        };
        assert_eq!(notify.field("unstable_level"), &json!(2));
        assert_eq!(notify.field("missing"), &Value::Null);
    }

    #[test]
    fn outbound_shapes() {
        let pong = Outbound::Pong { stats: None }.to_text().unwrap();
        assert_eq!(pong, r#"{"type":"pong"}"#);

        let reanswer = serde_json::to_value(Outbound::ReAnswer {
            sdp: "v=0".to_string(),
        })
        .unwrap();
        assert_eq!(reanswer, json!({"type": "re-answer", "sdp": "v=0"}));

        let disconnect = serde_json::to_value(Outbound::Disconnect).unwrap();
        assert_eq!(disconnect, json!({"type": "disconnect"}));
    }

    #[test]
    fn connect_message() {
        let config = SessionConfig::new("load", &["ws://127.0.0.1/signaling"])
            .data_channel_signaling(true)
            .data_channel(DataChannelSpec::new("#spam", Direction::Sendonly).interval(100));

        let first = serde_json::to_value(Outbound::Connect(Box::new(Connect::new(&config, false))))
            .unwrap();
        assert_eq!(
            first,
            json!({
                "type": "connect",
                "role": "sendonly",
                "channel_id": "load",
                "video": true,
                "audio": true,
                "data_channel_signaling": true,
                "data_channels": [{"label": "#spam", "direction": "sendonly"}],
            })
        );

        let redirected = serde_json::to_value(Outbound::Connect(Box::new(Connect::new(&config, true))))
            .unwrap();
        assert_eq!(redirected["redirect"], json!(true));
    }
}
