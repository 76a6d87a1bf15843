use std::{
    collections::{BTreeSet, HashMap},
    net::IpAddr,
    path::Path,
};

use log::info;
use serde::Deserialize;

use super::read::{json_lines, OracleReadError};

#[derive(Deserialize, Debug)]
struct MemberRecord {
    asn: u32,
    #[serde(default)]
    ipv4: Vec<IpAddr>,
    #[serde(default)]
    ipv6: Vec<IpAddr>,
}

/// Which member ASes were assigned an address on an exchange point LAN.
#[derive(Debug, Default, Clone)]
pub struct IxpMembers {
    owners: HashMap<IpAddr, BTreeSet<u32>>,
}

impl IxpMembers {
    pub fn insert(&mut self, addr: IpAddr, asn: u32) {
        self.owners.entry(addr).or_default().insert(asn);
    }

    pub fn asns_of(&self, addr: &IpAddr) -> Option<&BTreeSet<u32>> {
        self.owners.get(addr)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn read(path: &Path) -> Result<Self, OracleReadError> {
        let mut members = Self::default();
        for record in json_lines::<MemberRecord>(path)? {
            for addr in record.ipv4.into_iter().chain(record.ipv6) {
                members.insert(addr, record.asn);
            }
        }
        info!("Read {} IXP member addresses from {:?}", members.len(), path);
        Ok(members)
    }
}
