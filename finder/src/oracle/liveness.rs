use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    path::Path,
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::geometry::block_of_four;

use super::read::{json_file, OracleReadError};

/// Another address of the /30 block that cannot be a host (network or broadcast)
/// answered, so the block is not a four-address subnet.
pub const BLOCK_NOT_SUBNET: u8 = 1;
/// Both host addresses of the /30 answered.
pub const BOTH_HOSTS_ALIVE: u8 = 2;
/// Only the candidate itself answered.
pub const CANDIDATE_ALIVE: u8 = 3;
/// Nothing in the block answered.
pub const NO_RESPONSE: u8 = 4;

/// Score assumed for candidates without a liveness entry. Missing data keeps the
/// candidate, because pruning only acts on positive contrary evidence.
pub const UNSCORED: u8 = BOTH_HOSTS_ALIVE;

/// Liveness code per four-address candidate.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Liveness(HashMap<IpAddr, u8>);

impl Liveness {
    pub fn code_of(&self, addr: &IpAddr) -> u8 {
        self.0.get(addr).copied().unwrap_or(UNSCORED)
    }

    /// The candidate is contradicted by ping responses from its block.
    pub fn is_refuted(&self, addr: &IpAddr) -> bool {
        self.code_of(addr) <= BLOCK_NOT_SUBNET
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn read(path: &Path) -> Result<Self, OracleReadError> {
        let liveness: Liveness = json_file(path)?;
        info!("Read liveness codes for {} candidates from {:?}", liveness.len(), path);
        Ok(liveness)
    }
}

impl FromIterator<(IpAddr, u8)> for Liveness {
    fn from_iter<T: IntoIterator<Item = (IpAddr, u8)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Converts echo-responsive addresses into liveness codes for every candidate.
pub fn score<'a>(
    candidates: impl IntoIterator<Item = &'a IpAddr>,
    responsive: &HashSet<IpAddr>,
) -> Liveness {
    candidates
        .into_iter()
        .map(|candidate| (*candidate, score_one(candidate, responsive)))
        .collect()
}

fn score_one(candidate: &IpAddr, responsive: &HashSet<IpAddr>) -> u8 {
    let [w, x, y, z] = block_of_four(candidate);
    if responsive.contains(&w) || responsive.contains(&z) {
        BLOCK_NOT_SUBNET
    } else if responsive.contains(&x) && responsive.contains(&y) {
        BOTH_HOSTS_ALIVE
    } else if responsive.contains(candidate) {
        CANDIDATE_ALIVE
    } else {
        NO_RESPONSE
    }
}
