use std::{
    collections::{BTreeMap, HashMap},
    net::IpAddr,
    path::Path,
};

use ipnet::IpNet;
use log::{debug, info};

use super::read::{data_lines, OracleReadError};

/// Result of an AS lookup. Non-negative values are real ASNs, values at or below
/// [IXP_ASN_SENTINEL] identify an exchange point prefix, anything in between means
/// that no prefix matched.
pub type Asn = i64;

pub const UNKNOWN_ASN: Asn = -1;
pub const IXP_ASN_SENTINEL: Asn = -100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsnKind {
    Real,
    Ixp,
    Unknown,
}

impl AsnKind {
    pub fn of(asn: Asn) -> Self {
        if asn >= 0 {
            AsnKind::Real
        } else if asn <= IXP_ASN_SENTINEL {
            AsnKind::Ixp
        } else {
            AsnKind::Unknown
        }
    }
}

/// Synthetic ASN for the exchange point with the given id.
pub fn ixp_asn(ixp_id: u32) -> Asn {
    IXP_ASN_SENTINEL - Asn::from(ixp_id)
}

/// Longest-prefix-match lookup from address to ASN. Shared read-only between all file
/// workers, hence `Send + Sync`.
pub trait AsLookup: Send + Sync {
    fn asn_for(&self, addr: &IpAddr) -> Asn;
}

#[derive(Debug, Default, Clone)]
pub struct PrefixAsTable {
    /// Prefix length -> networks of that length. Searched from the longest length down.
    by_len: BTreeMap<u8, HashMap<IpNet, Asn>>,
}

impl PrefixAsTable {
    pub fn insert(&mut self, net: IpNet, asn: Asn) {
        self.by_len
            .entry(net.prefix_len())
            .or_default()
            .insert(net.trunc(), asn);
    }

    /// Most specific prefix covering `addr`, with its ASN.
    pub fn search_best(&self, addr: &IpAddr) -> Option<(IpNet, Asn)> {
        for (len, nets) in self.by_len.iter().rev() {
            // fails for IPv4 addresses and lengths > 32, which is exactly what we want
            if let Ok(candidate) = IpNet::new(*addr, *len) {
                let candidate = candidate.trunc();
                if let Some(asn) = nets.get(&candidate) {
                    return Some((candidate, *asn));
                }
            }
        }
        None
    }

    fn covers(&self, net: &IpNet) -> bool {
        self.search_best(&net.network())
            .map_or(false, |(found, _)| found.contains(net))
    }

    /// Adds an exchange point prefix with its synthetic ASN, unless a prefix already in the
    /// table covers it. Real allocations win over exchange point data.
    pub fn insert_ixp(&mut self, net: IpNet, ixp_id: u32) -> bool {
        if self.covers(&net) {
            debug!("IXP prefix {} is already covered, keeping existing mapping", net);
            return false;
        }
        self.insert(net, ixp_asn(ixp_id));
        true
    }

    pub fn len(&self) -> usize {
        self.by_len.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `prefix asn` lines, whitespace-separated.
    pub fn read(path: &Path) -> Result<Self, OracleReadError> {
        let mut table = Self::default();
        for (net, asn) in read_prefix_pairs(path)? {
            table.insert(net, asn);
        }
        info!("Read {} prefixes from AS table {:?}", table.len(), path);
        Ok(table)
    }

    /// Reads `prefix ixp_id` lines and inserts them via [Self::insert_ixp].
    pub fn read_ixp_prefixes(&mut self, path: &Path) -> Result<usize, OracleReadError> {
        let mut added = 0;
        for (line_no, (net, id)) in read_prefix_pairs(path)?.into_iter().enumerate() {
            let ixp_id = u32::try_from(id).map_err(|_| {
                OracleReadError::syntax(line_no + 1, &format!("{} {}", net, id), "IXP id out of range")
            })?;
            if self.insert_ixp(net, ixp_id) {
                added += 1;
            }
        }
        info!("Added {} IXP prefixes from {:?}", added, path);
        Ok(added)
    }
}

fn read_prefix_pairs(path: &Path) -> Result<Vec<(IpNet, Asn)>, OracleReadError> {
    data_lines(path)?
        .into_iter()
        .map(|(line_no, line)| {
            let mut fields = line.split_whitespace();
            let (Some(net), Some(asn)) = (fields.next(), fields.next()) else {
                return Err(OracleReadError::syntax(line_no, &line, "expected `prefix number`"));
            };
            let net: IpNet = net
                .parse()
                .map_err(|e| OracleReadError::syntax(line_no, &line, e))?;
            let asn: Asn = asn
                .parse()
                .map_err(|e| OracleReadError::syntax(line_no, &line, e))?;
            Ok((net, asn))
        })
        .collect()
}

impl AsLookup for PrefixAsTable {
    fn asn_for(&self, addr: &IpAddr) -> Asn {
        self.search_best(addr).map_or(UNKNOWN_ASN, |(_, asn)| asn)
    }
}

impl AsLookup for HashMap<IpAddr, Asn> {
    fn asn_for(&self, addr: &IpAddr) -> Asn {
        self.get(addr).copied().unwrap_or(UNKNOWN_ASN)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use assertor::*;
    use tempfile::NamedTempFile;

    use crate::test_utils::addr;

    use super::*;

    fn net(input: &str) -> IpNet {
        input.parse().expect(input)
    }

    #[test]
    fn longest_prefix_wins() {
        // given
        let mut table = PrefixAsTable::default();
        table.insert(net("192.0.0.0/16"), 64500);
        table.insert(net("192.0.2.0/24"), 15169);
        // when
        let specific = table.asn_for(&addr("192.0.2.77"));
        let broad = table.asn_for(&addr("192.0.3.77"));
        let none = table.asn_for(&addr("198.51.100.1"));
        // then
        assert_that!(specific).is_equal_to(15169);
        assert_that!(broad).is_equal_to(64500);
        assert_that!(none).is_equal_to(UNKNOWN_ASN);
    }

    #[test]
    fn families_do_not_mix() {
        // given
        let mut table = PrefixAsTable::default();
        table.insert(net("2001:db8::/32"), 64501);
        // then
        assert_that!(table.asn_for(&addr("32.1.13.184"))).is_equal_to(UNKNOWN_ASN);
        assert_that!(table.asn_for(&addr("2001:db8::1"))).is_equal_to(64501);
    }

    #[test]
    fn ixp_prefix_gets_synthetic_asn() {
        // given
        let mut table = PrefixAsTable::default();
        table.insert(net("198.51.100.0/24"), 64502);
        // when
        let covered = table.insert_ixp(net("198.51.100.128/25"), 7);
        let added = table.insert_ixp(net("203.0.113.0/24"), 5);
        // then
        assert_that!(covered).is_false();
        assert_that!(added).is_true();
        assert_that!(table.asn_for(&addr("198.51.100.200"))).is_equal_to(64502);
        assert_that!(table.asn_for(&addr("203.0.113.9"))).is_equal_to(-105);
        assert_that!(AsnKind::of(-105)).is_equal_to(AsnKind::Ixp);
    }

    #[test]
    fn asn_kinds() {
        assert_that!(AsnKind::of(0)).is_equal_to(AsnKind::Real);
        assert_that!(AsnKind::of(UNKNOWN_ASN)).is_equal_to(AsnKind::Unknown);
        assert_that!(AsnKind::of(-99)).is_equal_to(AsnKind::Unknown);
        assert_that!(AsnKind::of(IXP_ASN_SENTINEL)).is_equal_to(AsnKind::Ixp);
    }

    #[test]
    fn reads_table_file() -> Result<()> {
        // given
        let mut file = NamedTempFile::new()?;
        writeln!(file, "# prefix asn")?;
        writeln!(file, "192.0.2.0/24 15169")?;
        writeln!(file, "2001:db8::/32\t64501")?;
        // when
        let table = PrefixAsTable::read(file.path())?;
        // then
        assert_that!(table.len()).is_equal_to(2);
        assert_that!(table.asn_for(&addr("2001:db8::9"))).is_equal_to(64501);
        Ok(())
    }

    #[test]
    fn rejects_bad_line() -> Result<()> {
        // given
        let mut file = NamedTempFile::new()?;
        writeln!(file, "192.0.2.0/24")?;
        // when
        let res = PrefixAsTable::read(file.path());
        // then
        assert!(matches!(res, Err(OracleReadError::Syntax { line_no: 1, .. })));
        Ok(())
    }
}
