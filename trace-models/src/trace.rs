use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::Hop;

/// Hops for one probed destination, in TTL order. Private addresses and trivial
/// repeats are expected to be gone already.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Trace {
    pub dst: IpAddr,
    pub hops: Vec<Hop>,
    /// Cycle detected upstream, if any. The hops in here are no longer part of `hops`.
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub loop_hops: Option<Vec<Hop>>,
}

impl Trace {
    pub fn new(dst: IpAddr, hops: Vec<Hop>) -> Self {
        Self {
            dst,
            hops,
            loop_hops: None,
        }
    }

    pub fn with_loop(mut self, loop_hops: Vec<Hop>) -> Self {
        self.loop_hops = Some(loop_hops);
        self
    }
}
