use cfa_crab::helpers::ip::Pack;
use itertools::Itertools;
use log::trace;
use trace_models::{Hop, IcmpKind, Trace};

use crate::{
    context::prior_distinct,
    geometry::{pattern_of, Width},
    info::{Adjacency, FinderInfo, IxpCrossing, LoopEdge, ReplyTtls, Role, Triplet},
    oracle::{AsLookup, AsnKind},
};

/// Walks the hop pairs of traces and records what they say into a [FinderInfo].
/// Holds no state besides the shared AS lookup, so one instance per worker is enough.
pub struct TraceClassifier<'a> {
    asns: &'a dyn AsLookup,
}

impl<'a> TraceClassifier<'a> {
    pub fn new(asns: &'a dyn AsLookup) -> Self {
        Self { asns }
    }

    pub fn classify_all<'t>(&self, traces: impl IntoIterator<Item = &'t Trace>) -> FinderInfo {
        let mut info = FinderInfo::default();
        for trace in traces {
            self.classify(trace, &mut info);
        }
        info
    }

    pub fn classify(&self, trace: &Trace, info: &mut FinderInfo) {
        if trace.hops.len() < 2 {
            trace!("Skipping trace to {} with {} hops", trace.dst, trace.hops.len());
            return;
        }

        if let Some(loop_hops) = &trace.loop_hops {
            for (from, to) in loop_hops.iter().tuple_windows() {
                info.loops.add(LoopEdge {
                    from: from.addr,
                    to: to.addr,
                });
            }
        }

        let last_idx = trace.hops.len() - 1;
        for (idx, (x, y)) in trace.hops.iter().tuple_windows().enumerate() {
            if x.addr.packed() == y.addr.packed() {
                continue;
            }
            info.middle.add(x.addr);
            info.adjacencies.insert(Adjacency {
                prior: x.addr,
                addr: y.addr,
            });

            // a TTL gap means a hop in between stayed silent, x and y need not be neighbours
            if x.probe_ttl.checked_add(1) != Some(y.probe_ttl) {
                continue;
            }

            let prior = prior_distinct(trace, idx);
            let x_asn = self.asns.asn_for(&x.addr);
            match AsnKind::of(x_asn) {
                AsnKind::Real => {
                    if let Some(width) = pattern_of(&x.addr, &y.addr) {
                        let role = if idx + 1 == last_idx {
                            Role::Last
                        } else {
                            Role::Middle
                        };
                        record_pair(info, role, width, prior, x, y);
                    }
                }
                AsnKind::Ixp if self.asns.asn_for(&y.addr) == x_asn => {
                    info.ixps.insert(IxpCrossing {
                        prior_asn: prior.map(|it| self.asns.asn_for(&it.addr)),
                        addr: x.addr,
                        next: y.addr,
                    });
                    info.triplets.insert(Triplet {
                        prior: prior.map(|it| it.addr),
                        addr: x.addr,
                        next: y.addr,
                    });
                }
                _ => {}
            }
        }

        let last = &trace.hops[last_idx];
        if last.is_echo_reply() {
            info.last_echos.add(last.addr);
        } else {
            info.last.add(last.addr);
        }
    }
}

fn record_pair(info: &mut FinderInfo, role: Role, width: Width, prior: Option<&Hop>, x: &Hop, y: &Hop) {
    info.bucket_mut(role, width).add(x.addr);
    if y.is_echo_reply() {
        info.bucket_mut(Role::Echo, width).add(x.addr);
    }

    info.triplets.insert(Triplet {
        prior: prior.map(|it| it.addr),
        addr: x.addr,
        next: y.addr,
    });
    info.rttls.add(ReplyTtls {
        prior: prior.map(|it| it.addr),
        addr: x.addr,
        next: y.addr,
        prior_ttl: prior.map(|it| it.reply_ttl),
        ttl: x.reply_ttl,
        next_ttl: y.reply_ttl,
    });

    match y.kind {
        IcmpKind::DestUnreachable => info.unreach.insert(x.addr),
        IcmpKind::Spoofing => info.spoofing.insert(x.addr),
        IcmpKind::TimeExceeded | IcmpKind::EchoReply => info.nounreach.insert(x.addr),
    };
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use crate::test_utils::{addr, asns, hop, trace_ending_in, trace_of, Everywhere};

    use super::*;

    fn classify_with(lookup: &dyn AsLookup, trace: &Trace) -> FinderInfo {
        TraceClassifier::new(lookup).classify_all([trace])
    }

    #[test]
    fn scenario_two_address_subnet() {
        // given
        let trace = trace_of(&["198.51.100.7", "192.0.2.0", "192.0.2.1", "203.0.113.9"]);
        // when
        let info = classify_with(&Everywhere(15169), &trace);
        // then
        let x = addr("192.0.2.0");
        assert_that!(info.middle_twos.get(&x)).is_equal_to(1);
        assert_that!(info.fours().is_empty()).is_true();
        assert_that!(info.triplets).contains(Triplet {
            prior: Some(addr("198.51.100.7")),
            addr: x,
            next: addr("192.0.2.1"),
        });
        assert_that!(info.nounreach).contains(x);
    }

    #[test]
    fn scenario_not_adjacent_only_counts() {
        // given
        let trace = trace_of(&["192.0.2.1", "192.0.2.3"]);
        // when
        let info = classify_with(&Everywhere(15169), &trace);
        // then
        assert_that!(info.twos().is_empty()).is_true();
        assert_that!(info.fours().is_empty()).is_true();
        assert_that!(info.triplets.is_empty()).is_true();
        assert_that!(info.adjacencies).contains(Adjacency {
            prior: addr("192.0.2.1"),
            addr: addr("192.0.2.3"),
        });
        assert_that!(info.middle.get(&addr("192.0.2.1"))).is_equal_to(1);
        assert_that!(info.last.get(&addr("192.0.2.3"))).is_equal_to(1);
    }

    #[test]
    fn scenario_ixp_crossing() {
        // given
        let trace = trace_of(&["198.51.100.7", "203.0.113.5", "203.0.113.6", "192.0.2.1"]);
        let lookup = asns(&[
            ("198.51.100.7", 15169),
            ("203.0.113.5", -105),
            ("203.0.113.6", -105),
            ("192.0.2.1", 36040),
        ]);
        // when
        let info = classify_with(&lookup, &trace);
        // then
        assert_that!(info.ixps).contains(IxpCrossing {
            prior_asn: Some(15169),
            addr: addr("203.0.113.5"),
            next: addr("203.0.113.6"),
        });
        assert_that!(info.ixps).has_length(1);
        assert_that!(info.twos().is_empty()).is_true();
        assert_that!(info.fours().is_empty()).is_true();
        assert_that!(info.triplets).has_length(1);
    }

    #[test]
    fn different_exchanges_are_no_crossing() {
        // given
        let trace = trace_of(&["203.0.113.5", "203.0.113.6"]);
        let lookup = asns(&[("203.0.113.5", -105), ("203.0.113.6", -107)]);
        // when
        let info = classify_with(&lookup, &trace);
        // then
        assert_that!(info.ixps.is_empty()).is_true();
    }

    #[test]
    fn unknown_asn_only_counts() {
        // given
        let trace = trace_of(&["192.0.2.1", "192.0.2.2", "198.51.100.1"]);
        // when
        let info = classify_with(&asns(&[]), &trace);
        // then
        assert_that!(info.fours().is_empty()).is_true();
        assert_that!(info.middle.len()).is_equal_to(2);
    }

    #[test]
    fn ttl_gap_prevents_classification() {
        // given
        let mut trace = trace_of(&["192.0.2.1", "192.0.2.2", "198.51.100.1"]);
        trace.hops[1] = hop("192.0.2.2", 5);
        // when
        let info = classify_with(&Everywhere(15169), &trace);
        // then
        assert_that!(info.fours().is_empty()).is_true();
        assert_that!(info.middle.get(&addr("192.0.2.1"))).is_equal_to(1);
    }

    #[test]
    fn last_and_echo_roles() {
        // given
        let trace = trace_ending_in(&["198.51.100.7", "192.0.2.1", "192.0.2.2"], IcmpKind::EchoReply);
        // when
        let info = classify_with(&Everywhere(15169), &trace);
        // then
        let x = addr("192.0.2.1");
        assert_that!(info.last_fours.get(&x)).is_equal_to(1);
        assert_that!(info.echo_fours.get(&x)).is_equal_to(1);
        assert_that!(info.middle_fours.is_empty()).is_true();
        assert_that!(info.last_echos.get(&addr("192.0.2.2"))).is_equal_to(1);
        assert_that!(info.last.is_empty()).is_true();
    }

    #[test]
    fn terminal_kind_marks_candidate() {
        // given
        let spoofed = trace_ending_in(&["192.0.2.1", "192.0.2.2"], IcmpKind::Spoofing);
        let unreach = trace_ending_in(&["192.0.2.5", "192.0.2.6"], IcmpKind::DestUnreachable);
        // when
        let info = TraceClassifier::new(&Everywhere(15169)).classify_all([&spoofed, &unreach]);
        // then
        assert_that!(info.spoofing).contains(addr("192.0.2.1"));
        assert_that!(info.unreach).contains(addr("192.0.2.5"));
        assert_that!(info.nounreach.is_empty()).is_true();
    }

    #[test]
    fn repeated_hop_is_not_prior() {
        // given
        let mut trace = trace_of(&["198.51.100.7", "192.0.2.5", "192.0.2.5", "192.0.2.6"]);
        trace.hops[3] = hop("192.0.2.6", 4);
        // when
        let info = classify_with(&Everywhere(15169), &trace);
        // then
        let triplets: Vec<_> = info.triplets.iter().copied().collect();
        assert_that!(triplets).is_equal_to(vec![Triplet {
            prior: Some(addr("198.51.100.7")),
            addr: addr("192.0.2.5"),
            next: addr("192.0.2.6"),
        }]);
        let rttl = info.rttls.keys().next().copied();
        assert_that!(rttl.map(|it| it.prior_ttl)).is_equal_to(Some(Some(254)));
    }

    #[test]
    fn records_loop_edges() {
        // given
        let trace = trace_of(&["192.0.2.1", "198.51.100.1"]).with_loop(vec![
            hop("203.0.113.1", 3),
            hop("203.0.113.2", 4),
            hop("203.0.113.1", 5),
        ]);
        // when
        let info = classify_with(&asns(&[]), &trace);
        // then
        assert_that!(info.loops.len()).is_equal_to(2);
        assert_that!(info.loops.get(&LoopEdge {
            from: addr("203.0.113.2"),
            to: addr("203.0.113.1"),
        }))
        .is_equal_to(1);
    }

    #[test]
    fn short_trace_contributes_nothing() {
        // given
        let trace = trace_of(&["192.0.2.1"]);
        // when
        let info = classify_with(&Everywhere(15169), &trace);
        // then
        assert_that!(info).is_equal_to(FinderInfo::default());
    }
}
