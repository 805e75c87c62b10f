// signal-protocol: wire types for the synth coordination core.
//
// All WebSocket frames use a top-level `type` field for discriminated
// deserialization. Field names are camelCase on the wire to match the
// browser-side clients; Rust-side fields stay snake_case.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Client identity
// ---------------------------------------------------------------------------

/// Inferred purely from the id prefix (`synth-…` / `controller-…`); never
/// carried as authoritative state separately from the id itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Controller,
    Synth,
}

impl ClientType {
    pub fn from_id(id: &str) -> Option<Self> {
        if id.starts_with("controller-") {
            Some(Self::Controller)
        } else if id.starts_with("synth-") {
            Some(Self::Synth)
        } else {
            None
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Controller => "controller-",
            Self::Synth => "synth-",
        }
    }
}

// ---------------------------------------------------------------------------
// Client-list entries (controller-facing)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientListEntry {
    pub id: String,
    /// Whether a local socket for this id exists on *some* instance that
    /// the directory entry was written from; best-effort, not authoritative.
    pub connected: bool,
    /// Epoch milliseconds.
    pub last_seen: i64,
    pub reconnection_count: u32,
    /// True if some controller's ActiveWebRTCMap currently claims this synth.
    pub claimed: bool,
}

// ---------------------------------------------------------------------------
// Inbound / outbound WebSocket frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    Register {
        id: String,
        #[serde(default, rename = "clientType", skip_serializing_if = "Option::is_none")]
        client_type: Option<ClientType>,
        #[serde(default, rename = "isReconnect")]
        is_reconnect: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    RegistrationConfirmed {
        id: String,
        #[serde(rename = "reconnectionCount")]
        reconnection_count: u32,
        timestamp: i64,
        #[serde(rename = "isReconnection")]
        is_reconnection: bool,
    },
    #[serde(rename = "heartbeat")]
    Heartbeat {
        timestamp: i64,
    },
    #[serde(rename = "heartbeat_ack")]
    HeartbeatAck {
        timestamp: i64,
    },
    ControllerHeartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    ControllerActivate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    ControllerDeactivate {},
    ControllerConnections {
        connections: Vec<String>,
    },
    RequestActiveController {},
    ActiveController {
        #[serde(rename = "controllerId")]
        controller_id: Option<String>,
        timestamp: i64,
    },
    ClientList {
        clients: Vec<ClientListEntry>,
    },
    Offer {
        target: String,
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    Answer {
        target: String,
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    IceCandidate {
        target: String,
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    ClientConnected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client: Option<ClientListEntry>,
        #[serde(default, rename = "clientId", skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    ClientReconnected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client: Option<ClientListEntry>,
        #[serde(default, rename = "clientId", skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    ClientDisconnected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client: Option<ClientListEntry>,
        #[serde(default, rename = "clientId", skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
}

impl ClientFrame {
    /// The signaling envelope's addressed recipient, for the three verbs
    /// that carry one. Used by the router to decide local-vs-queued delivery.
    pub fn signaling_target(&self) -> Option<&str> {
        match self {
            Self::Offer { target, .. } | Self::Answer { target, .. } | Self::IceCandidate { target, .. } => {
                Some(target.as_str())
            }
            _ => None,
        }
    }

    pub fn stamp_source(&mut self, source_id: &str) {
        match self {
            Self::Offer { source, .. } | Self::Answer { source, .. } | Self::IceCandidate { source, .. } => {
                *source = Some(source_id.to_owned());
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP request/response bodies (frozen schema definitions)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdRequest {
    #[serde(rename = "type")]
    pub client_type: ClientType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdResponse {
    pub success: bool,
    pub client_id: String,
    #[serde(rename = "type")]
    pub client_type: ClientType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatusResponse {
    pub active_controller: Option<String>,
    pub timestamp: Option<i64>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerLockRequest {
    pub controller_id: String,
    #[serde(default)]
    pub heartbeat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerLockResponse {
    pub is_active: bool,
    pub active_controller: Option<String>,
    pub changed: bool,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerLockStatusResponse {
    pub locked: bool,
    pub is_owner: bool,
    pub active_controller: Option<String>,
    pub remaining_time_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerLockHealthReport {
    pub consistent: bool,
    pub active_controller: Option<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServersResponse {
    pub ice_servers: Vec<serde_json::Value>,
}

/// Frozen HTTP error envelope used by all non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub success: bool,
    pub error: String,
}

impl HttpErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_type_from_id_prefix() {
        assert_eq!(ClientType::from_id("controller-abc"), Some(ClientType::Controller));
        assert_eq!(ClientType::from_id("synth-xyz"), Some(ClientType::Synth));
        assert_eq!(ClientType::from_id("bogus-1"), None);
    }

    #[test]
    fn register_frame_round_trips_with_kebab_case_tag() {
        let frame = ClientFrame::Register {
            id: "synth-1".to_owned(),
            client_type: Some(ClientType::Synth),
            is_reconnect: true,
            timestamp: Some(42),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "register");
        assert_eq!(json["isReconnect"], true);
        let back: ClientFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn heartbeat_ack_uses_snake_case_tag_not_kebab() {
        let frame = ClientFrame::HeartbeatAck { timestamp: 7 };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "heartbeat_ack");
    }

    #[test]
    fn offer_stamps_source_and_exposes_target() {
        let mut frame = ClientFrame::Offer {
            target: "controller-abc".to_owned(),
            data: serde_json::json!({"sdp": "..."}),
            source: None,
        };
        assert_eq!(frame.signaling_target(), Some("controller-abc"));
        frame.stamp_source("synth-A");
        match &frame {
            ClientFrame::Offer { source, .. } => assert_eq!(source.as_deref(), Some("synth-A")),
            _ => unreachable!(),
        }
    }

    #[test]
    fn unknown_verb_fails_to_deserialize_so_router_can_drop_it() {
        let raw = serde_json::json!({"type": "not-a-real-verb"});
        let result: Result<ClientFrame, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }
}
