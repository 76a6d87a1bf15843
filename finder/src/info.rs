use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    net::IpAddr,
};

use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumIter, IntoEnumIterator};

use crate::geometry::{otherside, Width};

pub mod counter;
pub mod persist;
pub mod tuples;

pub use counter::Counter;
pub use persist::{Aggregate, PersistError, SCHEMA_VERSION};
pub use tuples::{Adjacency, IxpCrossing, LoopEdge, ReplyTtls, Triplet};

/// Where in a trace the pair `(x, y)` that classified `x` was seen: `y` in the middle of
/// the trace, `y` as the last hop, or `y` answering with an echo reply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Middle,
    Last,
    Echo,
}

/// Addresses removed by router-loop pruning, per bucket they were removed from.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterLoops {
    pub twos: Counter<IpAddr>,
    pub fours: Counter<IpAddr>,
    pub ixps: Counter<IpAddr>,
}

impl RouterLoops {
    pub fn merge(&mut self, other: RouterLoops) {
        self.twos.merge(other.twos);
        self.fours.merge(other.fours);
        self.ixps.merge(other.ixps);
    }

    pub fn of_width_mut(&mut self, width: Width) -> &mut Counter<IpAddr> {
        match width {
            Width::Two => &mut self.twos,
            Width::Four => &mut self.fours,
        }
    }
}

/// Evidence collected from traces: classification buckets per role and width, raw
/// occurrence counters, and the context tuples later passes need. Every collection
/// merges by union (sets) or count addition (counters), so merging is commutative and
/// associative.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinderInfo {
    pub middle_twos: Counter<IpAddr>,
    pub middle_fours: Counter<IpAddr>,
    pub last_twos: Counter<IpAddr>,
    pub last_fours: Counter<IpAddr>,
    pub echo_twos: Counter<IpAddr>,
    pub echo_fours: Counter<IpAddr>,

    pub ixps: HashSet<IxpCrossing>,
    pub triplets: HashSet<Triplet>,
    pub rttls: Counter<ReplyTtls>,
    pub adjacencies: HashSet<Adjacency>,

    /// Classified addresses whose successor did not answer with destination unreachable.
    pub nounreach: HashSet<IpAddr>,
    /// Classified addresses whose successor answered with destination unreachable.
    pub unreach: HashSet<IpAddr>,
    /// Classified addresses whose successor sent a spoofed reply.
    pub spoofing: HashSet<IpAddr>,

    pub loops: Counter<LoopEdge>,
    pub router_loops: RouterLoops,

    /// Every address seen before another hop, classified or not.
    pub middle: Counter<IpAddr>,
    /// Every address seen as the final hop of a trace without an echo reply.
    pub last: Counter<IpAddr>,
    /// Every address seen as the final hop of a trace with an echo reply.
    pub last_echos: Counter<IpAddr>,
}

impl FinderInfo {
    pub fn bucket(&self, role: Role, width: Width) -> &Counter<IpAddr> {
        match (role, width) {
            (Role::Middle, Width::Two) => &self.middle_twos,
            (Role::Middle, Width::Four) => &self.middle_fours,
            (Role::Last, Width::Two) => &self.last_twos,
            (Role::Last, Width::Four) => &self.last_fours,
            (Role::Echo, Width::Two) => &self.echo_twos,
            (Role::Echo, Width::Four) => &self.echo_fours,
        }
    }

    pub fn bucket_mut(&mut self, role: Role, width: Width) -> &mut Counter<IpAddr> {
        match (role, width) {
            (Role::Middle, Width::Two) => &mut self.middle_twos,
            (Role::Middle, Width::Four) => &mut self.middle_fours,
            (Role::Last, Width::Two) => &mut self.last_twos,
            (Role::Last, Width::Four) => &mut self.last_fours,
            (Role::Echo, Width::Two) => &mut self.echo_twos,
            (Role::Echo, Width::Four) => &mut self.echo_fours,
        }
    }

    pub fn merge(&mut self, other: FinderInfo) {
        let FinderInfo {
            middle_twos,
            middle_fours,
            last_twos,
            last_fours,
            echo_twos,
            echo_fours,
            ixps,
            triplets,
            rttls,
            adjacencies,
            nounreach,
            unreach,
            spoofing,
            loops,
            router_loops,
            middle,
            last,
            last_echos,
        } = other;
        self.middle_twos.merge(middle_twos);
        self.middle_fours.merge(middle_fours);
        self.last_twos.merge(last_twos);
        self.last_fours.merge(last_fours);
        self.echo_twos.merge(echo_twos);
        self.echo_fours.merge(echo_fours);
        self.ixps.extend(ixps);
        self.triplets.extend(triplets);
        self.rttls.merge(rttls);
        self.adjacencies.extend(adjacencies);
        self.nounreach.extend(nounreach);
        self.unreach.extend(unreach);
        self.spoofing.extend(spoofing);
        self.loops.merge(loops);
        self.router_loops.merge(router_loops);
        self.middle.merge(middle);
        self.last.merge(last);
        self.last_echos.merge(last_echos);
    }

    /// Sum over all roles for one width.
    pub fn of_width(&self, width: Width) -> Counter<IpAddr> {
        Counter::sum(Role::iter().map(|role| self.bucket(role, width)))
    }

    pub fn twos(&self) -> Counter<IpAddr> {
        self.of_width(Width::Two)
    }

    pub fn fours(&self) -> Counter<IpAddr> {
        self.of_width(Width::Four)
    }

    /// Sum over both widths for one role.
    pub fn of_role(&self, role: Role) -> Counter<IpAddr> {
        Counter::sum(Width::iter().map(|width| self.bucket(role, width)))
    }

    pub fn middle_cfas(&self) -> Counter<IpAddr> {
        self.of_role(Role::Middle)
    }

    pub fn last_cfas(&self) -> Counter<IpAddr> {
        self.of_role(Role::Last)
    }

    pub fn echo_cfas(&self) -> Counter<IpAddr> {
        self.of_role(Role::Echo)
    }

    /// Removes `addr` from the buckets of `width` in every role. Returns the number of
    /// observations dropped.
    pub fn remove_everywhere(&mut self, width: Width, addr: &IpAddr) -> u64 {
        Role::iter()
            .map(|role| self.bucket_mut(role, width).remove(addr))
            .sum()
    }

    pub fn ixp_addrs(&self) -> HashSet<IpAddr> {
        self.ixps.iter().map(|it| it.addr).collect()
    }

    /// Every address seen in any trace, i.e. the universe validation draws from.
    pub fn addresses(&self) -> HashSet<IpAddr> {
        self.middle
            .keys()
            .chain(self.last.keys())
            .chain(self.last_echos.keys())
            .copied()
            .collect()
    }

    /// Distinct predecessors per classified address, from the recorded triplets.
    pub fn prior_hops(&self) -> HashMap<IpAddr, HashSet<IpAddr>> {
        let mut prev: HashMap<IpAddr, HashSet<IpAddr>> = HashMap::new();
        for triplet in &self.triplets {
            if let Some(prior) = triplet.prior {
                prev.entry(triplet.addr).or_default().insert(prior);
            }
        }
        prev
    }

    /// Every address any hop directly followed, whether classified or not.
    pub fn predecessors(&self) -> HashMap<IpAddr, HashSet<IpAddr>> {
        let mut prev: HashMap<IpAddr, HashSet<IpAddr>> = HashMap::new();
        for adjacency in &self.adjacencies {
            prev.entry(adjacency.addr).or_default().insert(adjacency.prior);
        }
        prev
    }

    /// Successors per classified address, from the recorded triplets.
    pub fn next_hops(&self) -> HashMap<IpAddr, HashSet<IpAddr>> {
        let mut next: HashMap<IpAddr, HashSet<IpAddr>> = HashMap::new();
        for triplet in &self.triplets {
            next.entry(triplet.addr).or_default().insert(triplet.next);
        }
        next
    }

    /// Every classified address with the width it was classified as and the address on
    /// the other side of its assumed subnet. An address may appear once per role.
    pub fn pairs(&self) -> impl Iterator<Item = (IpAddr, Width, Option<IpAddr>)> + '_ {
        Role::iter()
            .flat_map(move |role| Width::iter().map(move |width| (role, width)))
            .flat_map(move |(role, width)| {
                self.bucket(role, width)
                    .keys()
                    .map(move |addr| (*addr, width, otherside(addr, width)))
            })
    }

    /// Makes the raw occurrence counters mutually exclusive: an address seen mid-path is
    /// not also counted as last hop, and echo-only last hops exclude both.
    pub fn dedup_roles(&mut self) {
        let middle: HashSet<IpAddr> = self.middle.keys().copied().collect();
        self.last.retain(|addr| !middle.contains(addr));
        let last: HashSet<IpAddr> = self.last.keys().copied().collect();
        self.last_echos
            .retain(|addr| !middle.contains(addr) && !last.contains(addr));
    }

    pub fn summary(&self) -> Summary {
        Summary {
            middle_twos: self.middle_twos.len(),
            middle_fours: self.middle_fours.len(),
            last_twos: self.last_twos.len(),
            last_fours: self.last_fours.len(),
            echo_twos: self.echo_twos.len(),
            echo_fours: self.echo_fours.len(),
            ixps: self.ixps.len(),
            loop_twos: self.router_loops.twos.len(),
            loop_fours: self.router_loops.fours.len(),
            middle: self.middle.len(),
            last: self.last.len(),
        }
    }
}

/// Bucket sizes (distinct addresses), for progress logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub middle_twos: usize,
    pub middle_fours: usize,
    pub last_twos: usize,
    pub last_fours: usize,
    pub echo_twos: usize,
    pub echo_fours: usize,
    pub ixps: usize,
    pub loop_twos: usize,
    pub loop_fours: usize,
    pub middle: usize,
    pub last: usize,
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "M2 {} M4 {} L2 {} L4 {} E2 {} E4 {} X {} C2 {} C4 {} M {} L {}",
            self.middle_twos,
            self.middle_fours,
            self.last_twos,
            self.last_fours,
            self.echo_twos,
            self.echo_fours,
            self.ixps,
            self.loop_twos,
            self.loop_fours,
            self.middle,
            self.last,
        )
    }
}
