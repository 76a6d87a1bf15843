use std::{
    collections::{BTreeMap, HashMap, HashSet},
    net::IpAddr,
};

use itertools::Itertools;
use serde::Serialize;
use strum::{Display, IntoEnumIterator};

use crate::{
    geometry::Width,
    info::{tuples::return_distance, FinderInfo, Role},
    prune::{FinalStage, Pruned},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CfaKind {
    Two,
    Four,
    Ixp,
}

impl From<Width> for CfaKind {
    fn from(value: Width) -> Self {
        match value {
            Width::Two => CfaKind::Two,
            Width::Four => CfaKind::Four,
        }
    }
}

/// One output row per candidate, with the context it was inferred from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CfaRecord {
    pub addr: IpAddr,
    pub kind: CfaKind,
    /// `;`-separated roles the address was classified in, or `crossing` for exchanges.
    pub roles: String,
    /// Observations backing the classification.
    pub count: u64,
    pub priors: String,
    pub nexts: String,
    /// Smallest estimated return-path length of the candidate's replies, in hops.
    pub min_return_distance: Option<u8>,
}

/// Final classification, one kind per address with precedence two > four > ixp.
pub fn classify_final(info: &FinderInfo) -> BTreeMap<IpAddr, CfaKind> {
    let mut cfas = BTreeMap::new();
    for addr in info.ixp_addrs() {
        cfas.insert(addr, CfaKind::Ixp);
    }
    for addr in info.fours().keys() {
        cfas.insert(*addr, CfaKind::Four);
    }
    for addr in info.twos().keys() {
        cfas.insert(*addr, CfaKind::Two);
    }
    cfas
}

fn joined(addrs: Option<&HashSet<IpAddr>>) -> String {
    addrs.map(|it| it.iter().sorted().join(";")).unwrap_or_default()
}

pub fn records_of(info: &FinderInfo) -> Vec<CfaRecord> {
    let priors = info.prior_hops();
    let nexts = info.next_hops();
    let mut distances: HashMap<IpAddr, u8> = HashMap::new();
    for rttl in info.rttls.keys() {
        let distance = return_distance(rttl.ttl);
        distances
            .entry(rttl.addr)
            .and_modify(|it| *it = (*it).min(distance))
            .or_insert(distance);
    }

    classify_final(info)
        .into_iter()
        .map(|(addr, kind)| {
            let (roles, count) = match kind {
                CfaKind::Ixp => (
                    "crossing".to_string(),
                    info.ixps.iter().filter(|it| it.addr == addr).count() as u64,
                ),
                CfaKind::Two | CfaKind::Four => {
                    let width = if kind == CfaKind::Two {
                        Width::Two
                    } else {
                        Width::Four
                    };
                    let roles = Role::iter()
                        .filter(|role| info.bucket(*role, width).contains(&addr))
                        .join(";");
                    let count = Role::iter().map(|role| info.bucket(role, width).get(&addr)).sum();
                    (roles, count)
                }
            };
            CfaRecord {
                addr,
                kind,
                roles,
                count,
                priors: joined(priors.get(&addr)),
                nexts: joined(nexts.get(&addr)),
                min_return_distance: distances.get(&addr).copied(),
            }
        })
        .collect()
}

impl<S: FinalStage> Pruned<S> {
    /// Only available once pruning is complete.
    pub fn cfas(&self) -> BTreeMap<IpAddr, CfaKind> {
        classify_final(self)
    }

    pub fn cfa_records(&self) -> Vec<CfaRecord> {
        records_of(self)
    }
}
