use std::{collections::HashMap, net::IpAddr};

use trace_models::{Hop, IcmpKind, Trace};

use crate::oracle::{AsLookup, Asn};

pub fn addr(input: &str) -> IpAddr {
    input.parse().expect(input)
}

pub fn hop(input: &str, probe_ttl: u8) -> Hop {
    Hop {
        addr: addr(input),
        probe_ttl,
        reply_ttl: 255 - probe_ttl,
        kind: IcmpKind::TimeExceeded,
    }
}

pub fn hop_of_kind(input: &str, probe_ttl: u8, kind: IcmpKind) -> Hop {
    Hop {
        kind,
        ..hop(input, probe_ttl)
    }
}

/// Time-exceeded hops at consecutive TTLs, starting at TTL 1.
pub fn trace_of(addrs: &[&str]) -> Trace {
    let hops = addrs
        .iter()
        .enumerate()
        .map(|(idx, it)| hop(it, idx as u8 + 1))
        .collect();
    Trace::new(addr("203.0.113.254"), hops)
}

/// Same as [trace_of], but the last hop answered with the given kind.
pub fn trace_ending_in(addrs: &[&str], kind: IcmpKind) -> Trace {
    let mut trace = trace_of(addrs);
    if let Some(last) = trace.hops.last_mut() {
        last.kind = kind;
    }
    trace
}

/// Maps every address to the same ASN.
pub struct Everywhere(pub Asn);

impl AsLookup for Everywhere {
    fn asn_for(&self, _addr: &IpAddr) -> Asn {
        self.0
    }
}

pub fn asns(entries: &[(&str, Asn)]) -> HashMap<IpAddr, Asn> {
    entries.iter().map(|(it, asn)| (addr(it), *asn)).collect()
}
