use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    path::Path,
};

use log::info;

use super::read::{data_lines, OracleReadError};

/// Router alias groups: addresses that resolve to the same router identity.
#[derive(Debug, Default, Clone)]
pub struct Aliases {
    nodes: HashMap<String, HashSet<IpAddr>>,
    node_of: HashMap<IpAddr, String>,
}

impl Aliases {
    pub fn from_groups<I, A>(groups: I) -> Self
    where
        I: IntoIterator<Item = (String, A)>,
        A: IntoIterator<Item = IpAddr>,
    {
        let mut aliases = Self::default();
        for (node, addrs) in groups {
            for addr in addrs {
                aliases.insert(&node, addr);
            }
        }
        aliases
    }

    fn insert(&mut self, node: &str, addr: IpAddr) {
        self.node_of.insert(addr, node.to_string());
        self.nodes.entry(node.to_string()).or_default().insert(addr);
    }

    pub fn node_of(&self, addr: &IpAddr) -> Option<&str> {
        self.node_of.get(addr).map(String::as_str)
    }

    /// True only if both addresses are known and belong to the same router.
    /// Unknown addresses never alias anything.
    pub fn same_router(&self, a: &IpAddr, b: &IpAddr) -> bool {
        match (self.node_of(a), self.node_of(b)) {
            (Some(na), Some(nb)) => na == nb,
            _ => false,
        }
    }

    pub fn aliases(&self, addr: &IpAddr) -> Option<&HashSet<IpAddr>> {
        self.node_of(addr).and_then(|node| self.nodes.get(node))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Reads ITDK node lines, e.g. `node N12:  192.0.2.1 192.0.2.9`.
    pub fn read(path: &Path) -> Result<Self, OracleReadError> {
        let mut aliases = Self::default();
        for (line_no, line) in data_lines(path)? {
            let Some(rest) = line.strip_prefix("node ") else {
                return Err(OracleReadError::syntax(line_no, &line, "expected `node` record"));
            };
            let Some((node, addrs)) = rest.split_once(':') else {
                return Err(OracleReadError::syntax(line_no, &line, "missing `:` after node id"));
            };
            let node = node.trim();
            for token in addrs.split_whitespace() {
                let addr = token
                    .parse()
                    .map_err(|e| OracleReadError::syntax(line_no, &line, e))?;
                aliases.insert(node, addr);
            }
        }
        info!(
            "Read {} alias groups covering {} addresses from {:?}",
            aliases.node_count(),
            aliases.node_of.len(),
            path
        );
        Ok(aliases)
    }
}
