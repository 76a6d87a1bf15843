use std::{collections::HashMap, fmt::Display, path::Path};

use log::info;

use super::{
    asn::{Asn, AsnKind},
    read::{data_lines, OracleReadError},
};

/// Owner of an AS. ASNs missing from the org file stand for themselves, so that two
/// unmapped ASNs only match if they are the same AS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Org {
    Named(String),
    Bare(u32),
}

impl Display for Org {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Org::Named(id) => write!(f, "{}", id),
            Org::Bare(asn) => write!(f, "AS{}", asn),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AsOrgs {
    orgs: HashMap<u32, String>,
}

impl AsOrgs {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, String)>) -> Self {
        Self {
            orgs: pairs.into_iter().collect(),
        }
    }

    /// Organization for a real ASN; `None` for unknown and IXP sentinels.
    pub fn org_of(&self, asn: Asn) -> Option<Org> {
        if AsnKind::of(asn) != AsnKind::Real {
            return None;
        }
        let asn = u32::try_from(asn).ok()?;
        Some(self.org_of_real(asn))
    }

    pub fn org_of_real(&self, asn: u32) -> Org {
        match self.orgs.get(&asn) {
            Some(id) => Org::Named(id.clone()),
            None => Org::Bare(asn),
        }
    }

    /// Reads CAIDA as-org `aut` records, `asn|changed|name|org_id|opaque_id|source`.
    /// Lines whose first field is not numeric (the org records) are skipped.
    pub fn read(path: &Path) -> Result<Self, OracleReadError> {
        let mut orgs = HashMap::new();
        for (line_no, line) in data_lines(path)? {
            let fields: Vec<&str> = line.split('|').collect();
            let Ok(asn) = fields[0].parse::<u32>() else {
                continue;
            };
            let Some(org_id) = fields.get(3).filter(|it| !it.is_empty()) else {
                return Err(OracleReadError::syntax(line_no, &line, "missing org id field"));
            };
            orgs.insert(asn, org_id.to_string());
        }
        info!("Read organizations for {} ASNs from {:?}", orgs.len(), path);
        Ok(Self { orgs })
    }
}
