use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Peer connection state.
///
/// DISCONNECTED -> CONNECTING -> CONNECTED -> DISCONNECTING -> DISCONNECTED
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No active connection to this peer.
    Disconnected,
    /// Transport connection in progress.
    Connecting,
    /// Handshake done, can exchange protocol messages.
    Connected,
    /// Disconnect message sent or received.
    Disconnecting,
}

impl ConnectionState {
    pub fn is_disconnected(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Disconnecting
        )
    }
}

/// Reason codes carried by a devp2p disconnect message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DisconnectReason {
    Requested = 0x00,
    TcpSubsystemError = 0x01,
    /// Peer sent something that violates the protocol, e.g. a payload that
    /// cannot be decoded.
    BreachOfProtocol = 0x02,
    UselessPeer = 0x03,
    TooManyPeers = 0x04,
    ClientQuitting = 0x08,
    Timeout = 0x0b,
    SubprotocolTriggered = 0x10,
}

impl DisconnectReason {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(DisconnectReason::Requested),
            0x01 => Some(DisconnectReason::TcpSubsystemError),
            0x02 => Some(DisconnectReason::BreachOfProtocol),
            0x03 => Some(DisconnectReason::UselessPeer),
            0x04 => Some(DisconnectReason::TooManyPeers),
            0x08 => Some(DisconnectReason::ClientQuitting),
            0x0b => Some(DisconnectReason::Timeout),
            0x10 => Some(DisconnectReason::SubprotocolTriggered),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            DisconnectReason::Requested => "requested",
            DisconnectReason::TcpSubsystemError => "tcp subsystem error",
            DisconnectReason::BreachOfProtocol => "breach of protocol",
            DisconnectReason::UselessPeer => "useless peer",
            DisconnectReason::TooManyPeers => "too many peers",
            DisconnectReason::ClientQuitting => "client quitting",
            DisconnectReason::Timeout => "timeout",
            DisconnectReason::SubprotocolTriggered => "subprotocol triggered",
        };
        write!(f, "{reason} (0x{:02x})", self.code())
    }
}
