use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Kind of ICMP message a hop answered with. Resolving raw ICMP type/code pairs (and
/// detecting spoofed replies) happens in the capture reader.
#[derive(Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum IcmpKind {
    TimeExceeded,
    EchoReply,
    DestUnreachable,
    /// Reply that claims to come from the probed destination but was sent by a router on the way.
    Spoofing,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Hop {
    pub addr: IpAddr,
    /// Sent TTL that yielded this response.
    pub probe_ttl: u8,
    /// TTL of the response as it arrived at the vantage point.
    pub reply_ttl: u8,
    pub kind: IcmpKind,
}

impl Hop {
    pub fn is_echo_reply(&self) -> bool {
        self.kind == IcmpKind::EchoReply
    }
}
