use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::oracle::Asn;

/// Classified address with its nearest distinct predecessor and its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triplet {
    pub prior: Option<IpAddr>,
    pub addr: IpAddr,
    pub next: IpAddr,
}

/// Two consecutive hops inside the same exchange point prefix. `prior_asn` is the AS
/// of the hop before the exchange, i.e. the network that handed traffic to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IxpCrossing {
    pub prior_asn: Option<Asn>,
    pub addr: IpAddr,
    pub next: IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplyTtls {
    pub prior: Option<IpAddr>,
    pub addr: IpAddr,
    pub next: IpAddr,
    pub prior_ttl: Option<u8>,
    pub ttl: u8,
    pub next_ttl: u8,
}

/// Hops a reply travelled, assuming the router started from the nearest common
/// initial TTL (255, 128 or 65) above the observed value.
pub fn return_distance(reply_ttl: u8) -> u8 {
    match reply_ttl {
        129.. => 255 - reply_ttl,
        66..=128 => 128 - reply_ttl,
        _ => 65u8.saturating_sub(reply_ttl),
    }
}

/// Two consecutive distinct hops of a trace, classified or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Adjacency {
    pub prior: IpAddr,
    pub addr: IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoopEdge {
    pub from: IpAddr,
    pub to: IpAddr,
}
