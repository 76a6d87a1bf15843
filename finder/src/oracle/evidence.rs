use std::{collections::HashSet, fmt::Display, net::IpAddr, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use crate::info::FinderInfo;

use super::read::{json_file, OracleReadError};

/// Outcome of follow-up probing, as address sets. After [Evidence::subtract], the three
/// sets are disjoint with precedence confirmed > reject > unknown.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Evidence {
    pub confirmed: HashSet<IpAddr>,
    pub reject: HashSet<IpAddr>,
    pub unknown: HashSet<IpAddr>,
}

impl Evidence {
    pub fn subtract(&mut self) {
        self.reject.retain(|addr| !self.confirmed.contains(addr));
        self.unknown
            .retain(|addr| !self.confirmed.contains(addr) && !self.reject.contains(addr));
    }

    /// Evidence about partner addresses, mapped back onto the candidates whose subnet
    /// partner they are.
    pub fn match_candidates(&self, info: &FinderInfo) -> Evidence {
        let mut matched = Evidence::default();
        for (candidate, _, partner) in info.pairs() {
            let Some(partner) = partner else { continue };
            if self.confirmed.contains(&partner) {
                matched.confirmed.insert(candidate);
            } else if self.reject.contains(&partner) {
                matched.reject.insert(candidate);
            } else if self.unknown.contains(&partner) {
                matched.unknown.insert(candidate);
            }
        }
        matched.subtract();
        matched
    }

    /// Reads and normalises an evidence file.
    pub fn read(path: &Path) -> Result<Self, OracleReadError> {
        let mut evidence: Evidence = json_file(path)?;
        evidence.subtract();
        info!("Read evidence {} from {:?}", evidence, path);
        Ok(evidence)
    }
}

impl Display for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "C {} R {} U {}",
            self.confirmed.len(),
            self.reject.len(),
            self.unknown.len()
        )
    }
}
