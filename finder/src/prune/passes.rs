//! The pruning passes on a bare accumulator. Each pass only removes entries and is
//! idempotent; the order they have to run in is enforced by [super::Pruned].

use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
};

use strum::IntoEnumIterator;

use crate::{
    geometry::{otherside, Width},
    info::{FinderInfo, LoopEdge, Role},
    oracle::{Aliases, AsOrgs, IxpMembers, Liveness},
};

/// Drops last-hop candidates that only ever saw spoofed replies.
pub(crate) fn spoofing(info: &mut FinderInfo) -> usize {
    let spoofed_only: Vec<IpAddr> = info
        .spoofing
        .difference(&info.nounreach)
        .copied()
        .collect();
    let mut removed = 0;
    for addr in &spoofed_only {
        for width in Width::iter() {
            if info.bucket_mut(Role::Last, width).remove(addr) > 0 {
                removed += 1;
            }
        }
    }
    removed
}

/// Two-address evidence wins: anything that is also a two loses its four entries.
pub(crate) fn fix_fours(info: &mut FinderInfo) -> usize {
    let twos = info.twos();
    let overlap: Vec<IpAddr> = info
        .fours()
        .keys()
        .filter(|addr| twos.contains(addr))
        .copied()
        .collect();
    for addr in &overlap {
        info.remove_everywhere(Width::Four, addr);
    }
    overlap.len()
}

pub(crate) fn pingtest(info: &mut FinderInfo, liveness: &Liveness) -> usize {
    let refuted: Vec<IpAddr> = info
        .fours()
        .keys()
        .filter(|addr| liveness.is_refuted(addr))
        .copied()
        .collect();
    for addr in &refuted {
        info.remove_everywhere(Width::Four, addr);
    }
    refuted.len()
}

/// For a triplet `(w, x, y)` where `w` and `x` are interfaces of the same router, `x`
/// is the router re-entering the path rather than a forwarding interface towards `y`.
pub(crate) fn router_loops(info: &mut FinderInfo, aliases: &Aliases) -> usize {
    let ixp_addrs = info.ixp_addrs();
    let suspects: Vec<_> = info
        .triplets
        .iter()
        .filter_map(|t| t.prior.map(|prior| (prior, t.addr, t.next)))
        .filter(|(prior, addr, _)| aliases.same_router(prior, addr))
        .collect();

    let mut removed = 0;
    for (prior, addr, next) in suspects {
        let dropped = if Some(next) == otherside(&addr, Width::Four) {
            remove_loop_width(info, Width::Four, &addr)
        } else if Some(next) == otherside(&addr, Width::Two) {
            remove_loop_width(info, Width::Two, &addr)
        } else if ixp_addrs.contains(&addr) {
            let before = info.ixps.len();
            info.ixps
                .retain(|crossing| !(crossing.addr == addr && crossing.next == next));
            let gone = (before - info.ixps.len()) as u64;
            info.router_loops.ixps.add_n(addr, gone);
            gone
        } else {
            0
        };
        if dropped > 0 {
            info.loops.add(LoopEdge {
                from: prior,
                to: addr,
            });
            removed += 1;
        }
    }
    removed
}

fn remove_loop_width(info: &mut FinderInfo, width: Width, addr: &IpAddr) -> u64 {
    let gone = info.remove_everywhere(width, addr);
    info.router_loops.of_width_mut(width).add_n(*addr, gone);
    gone
}

/// Keeps an exchange crossing only if the member owning the exchange address belongs to
/// one of the organizations seen handing traffic to it.
pub(crate) fn ixps(info: &mut FinderInfo, members: &IxpMembers, orgs: &AsOrgs) -> usize {
    let mut handing_orgs: HashMap<IpAddr, HashSet<_>> = HashMap::new();
    for crossing in &info.ixps {
        let entry = handing_orgs.entry(crossing.addr).or_default();
        if let Some(org) = crossing.prior_asn.and_then(|asn| orgs.org_of(asn)) {
            entry.insert(org);
        }
    }

    let rejected: HashSet<IpAddr> = handing_orgs
        .into_iter()
        .filter(|(addr, seen)| {
            let Some(owners) = members.asns_of(addr) else {
                return true;
            };
            !owners
                .iter()
                .any(|owner| seen.contains(&orgs.org_of_real(*owner)))
        })
        .map(|(addr, _)| addr)
        .collect();
    info.ixps.retain(|crossing| !rejected.contains(&crossing.addr));
    rejected.len()
}

/// Removes rejected candidates from every bucket and crossing.
pub(crate) fn reject(info: &mut FinderInfo, rejected: &HashSet<IpAddr>) -> usize {
    let mut removed = HashSet::new();
    for addr in rejected {
        for width in Width::iter() {
            if info.remove_everywhere(width, addr) > 0 {
                removed.insert(*addr);
            }
        }
    }
    info.ixps.retain(|crossing| {
        let keep = !rejected.contains(&crossing.addr);
        if !keep {
            removed.insert(crossing.addr);
        }
        keep
    });
    removed.len()
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use crate::{
        info::{IxpCrossing, Triplet},
        oracle::liveness::BLOCK_NOT_SUBNET,
        test_utils::addr,
    };

    use super::*;

    fn snapshot(info: &FinderInfo) -> Vec<usize> {
        Role::iter()
            .flat_map(|role| Width::iter().map(move |width| (role, width)))
            .map(|(role, width)| info.bucket(role, width).len())
            .chain([info.ixps.len()])
            .collect()
    }

    fn crowded() -> FinderInfo {
        let mut info = FinderInfo::default();
        let (a, b, c) = (addr("192.0.2.1"), addr("192.0.2.5"), addr("192.0.2.9"));
        info.middle_twos.add(a);
        info.middle_fours.add(a);
        info.last_fours.add(a);
        info.echo_fours.add(b);
        info.last_twos.add(c);
        info.last_fours.add(c);
        info.spoofing.insert(c);
        info
    }

    #[test]
    fn scenario_fix_fours() {
        // given
        let mut info = crowded();
        let a = addr("192.0.2.1");
        // when
        fix_fours(&mut info);
        // then
        assert_that!(info.fours().contains(&a)).is_false();
        assert_that!(info.twos().contains(&a)).is_true();
        assert_that!(info.fours().contains(&addr("192.0.2.5"))).is_true();
    }

    #[test]
    fn fix_fours_is_idempotent_and_disjoint() {
        // given
        let mut once = crowded();
        fix_fours(&mut once);
        let mut twice = once.clone();
        // when
        let removed = fix_fours(&mut twice);
        // then
        assert_that!(removed).is_equal_to(0);
        assert_that!(twice).is_equal_to(once.clone());
        let twos = twice.twos();
        assert_that!(twice.fours().keys().any(|it| twos.contains(it))).is_false();
    }

    #[test]
    fn spoofed_only_leaves_last_buckets() {
        // given
        let mut info = crowded();
        info.spoofing.insert(addr("192.0.2.5"));
        info.nounreach.insert(addr("192.0.2.5"));
        // when
        spoofing(&mut info);
        // then
        assert_that!(info.last_twos.is_empty()).is_true();
        assert_that!(info.last_fours.contains(&addr("192.0.2.9"))).is_false();
        assert_that!(info.echo_fours.contains(&addr("192.0.2.5"))).is_true();
        assert_that!(info.middle_twos.contains(&addr("192.0.2.1"))).is_true();
    }

    #[test]
    fn pingtest_drops_refuted_fours() {
        // given
        let mut info = crowded();
        let liveness = Liveness::from_iter([(addr("192.0.2.5"), BLOCK_NOT_SUBNET), (addr("192.0.2.9"), 4)]);
        // when
        pingtest(&mut info, &liveness);
        // then
        assert_that!(info.fours().contains(&addr("192.0.2.5"))).is_false();
        assert_that!(info.fours().contains(&addr("192.0.2.9"))).is_true();
        assert_that!(info.fours().contains(&addr("192.0.2.1"))).is_true();
    }

    #[test]
    fn scenario_router_loop() {
        // given
        let (w, x, y) = (addr("198.51.100.3"), addr("192.0.2.5"), addr("192.0.2.6"));
        let mut info = FinderInfo::default();
        info.middle_fours.add_n(x, 2);
        info.echo_fours.add(x);
        info.triplets.insert(Triplet { prior: Some(w), addr: x, next: y });
        let aliases = Aliases::from_groups([("N7".to_string(), [w, x])]);
        // when
        router_loops(&mut info, &aliases);
        // then
        assert_that!(info.fours().contains(&x)).is_false();
        assert_that!(info.loops.get(&LoopEdge { from: w, to: x })).is_equal_to(1);
        assert_that!(info.router_loops.fours.get(&x)).is_equal_to(3);
    }

    #[test]
    fn router_loop_needs_alias_and_partner() {
        // given
        let (w, x, y) = (addr("198.51.100.3"), addr("192.0.2.5"), addr("192.0.2.6"));
        let mut info = FinderInfo::default();
        info.middle_fours.add(x);
        info.triplets.insert(Triplet { prior: Some(w), addr: x, next: y });
        info.triplets.insert(Triplet { prior: None, addr: x, next: y });
        let unrelated = Aliases::from_groups([("N7".to_string(), [w]), ("N8".to_string(), [x])]);
        // when
        let removed = router_loops(&mut info, &unrelated);
        // then
        assert_that!(removed).is_equal_to(0);
        assert_that!(info.middle_fours.contains(&x)).is_true();
        assert_that!(info.loops.is_empty()).is_true();
    }

    #[test]
    fn router_loop_on_exchange() {
        // given
        let (w, x, y) = (addr("198.51.100.3"), addr("203.0.113.5"), addr("203.0.113.77"));
        let mut info = FinderInfo::default();
        info.ixps.insert(IxpCrossing { prior_asn: Some(15169), addr: x, next: y });
        info.ixps.insert(IxpCrossing { prior_asn: Some(36040), addr: x, next: y });
        info.triplets.insert(Triplet { prior: Some(w), addr: x, next: y });
        let aliases = Aliases::from_groups([("N7".to_string(), [w, x])]);
        // when
        router_loops(&mut info, &aliases);
        // then
        assert_that!(info.ixps.is_empty()).is_true();
        assert_that!(info.router_loops.ixps.get(&x)).is_equal_to(2);
    }

    #[test]
    fn exchange_kept_only_for_owner_org() {
        // given
        let (kept, foreign, unknown) = (addr("203.0.113.5"), addr("203.0.113.6"), addr("203.0.113.7"));
        let next = addr("203.0.113.99");
        let mut info = FinderInfo::default();
        info.ixps.insert(IxpCrossing { prior_asn: Some(36040), addr: kept, next });
        info.ixps.insert(IxpCrossing { prior_asn: Some(64500), addr: foreign, next });
        info.ixps.insert(IxpCrossing { prior_asn: Some(15169), addr: unknown, next });
        let mut members = IxpMembers::default();
        members.insert(kept, 15169);
        members.insert(foreign, 15169);
        let orgs = AsOrgs::from_pairs([(15169, "GOGL".to_string()), (36040, "GOGL".to_string())]);
        // when
        let removed = ixps(&mut info, &members, &orgs);
        // then
        assert_that!(removed).is_equal_to(2);
        assert_that!(info.ixp_addrs()).contains(kept);
        assert_that!(info.ixp_addrs()).has_length(1);
    }

    #[test]
    fn reject_clears_every_collection() {
        // given
        let mut info = crowded();
        let a = addr("192.0.2.1");
        info.ixps.insert(IxpCrossing { prior_asn: None, addr: a, next: addr("192.0.2.2") });
        // when
        let removed = reject(&mut info, &HashSet::from([a, addr("10.0.0.1")]));
        // then
        assert_that!(removed).is_equal_to(1);
        assert_that!(info.twos().contains(&a)).is_false();
        assert_that!(info.fours().contains(&a)).is_false();
        assert_that!(info.ixps.is_empty()).is_true();
    }

    #[test]
    fn passes_only_remove() {
        // given
        let mut info = crowded();
        info.triplets.insert(Triplet {
            prior: Some(addr("192.0.2.9")),
            addr: addr("192.0.2.5"),
            next: addr("192.0.2.6"),
        });
        let aliases = Aliases::from_groups([("N1".to_string(), [addr("192.0.2.9"), addr("192.0.2.5")])]);
        let liveness = Liveness::from_iter([(addr("192.0.2.1"), BLOCK_NOT_SUBNET)]);
        let mut before = snapshot(&info);
        // when / then
        let steps: Vec<Box<dyn Fn(&mut FinderInfo) + '_>> = vec![
            Box::new(|it| {
                spoofing(it);
            }),
            Box::new(|it| {
                fix_fours(it);
            }),
            Box::new(|it| {
                pingtest(it, &liveness);
            }),
            Box::new(|it| {
                router_loops(it, &aliases);
            }),
            Box::new(|it| {
                ixps(it, &IxpMembers::default(), &AsOrgs::default());
            }),
        ];
        for step in steps {
            step(&mut info);
            let after = snapshot(&info);
            for (old, new) in before.iter().zip(&after) {
                assert_that!(*new <= *old).is_true();
            }
            before = after;
        }
    }
}
