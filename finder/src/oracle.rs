use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use log::debug;

pub mod alias;
pub mod as_org;
pub mod asn;
pub mod evidence;
pub mod ixp;
pub mod liveness;
pub mod read;

pub use alias::Aliases;
pub use as_org::{AsOrgs, Org};
pub use asn::{AsLookup, Asn, AsnKind, PrefixAsTable, IXP_ASN_SENTINEL, UNKNOWN_ASN};
pub use evidence::Evidence;
pub use ixp::IxpMembers;
pub use liveness::Liveness;
pub use read::OracleReadError;

/// Locations of the external data sets. A missing data set means "no information" to
/// the pass that would consume it. Commands that map hops to ASNs need the AS table.
#[derive(Args, Clone, Debug)]
#[group(id = "oracle")]
pub struct Params {
    /// Longest-prefix-match table, one `prefix asn` pair per line
    #[arg(long, env = "FINDER_AS_TABLE")]
    pub as_table: Option<PathBuf>,

    /// Exchange point prefixes, one `prefix ixp_id` pair per line. These are mapped
    /// onto synthetic ASNs below the IXP sentinel.
    #[arg(long, env = "FINDER_IXP_PREFIXES")]
    pub ixp_prefixes: Option<PathBuf>,

    /// AS-to-organization records, `|`-separated with the ASN first and org id fourth
    #[arg(long, env = "FINDER_AS_ORGS")]
    pub as_orgs: Option<PathBuf>,

    /// Exchange point membership, JSON lines of `{"asn": .., "ipv4": [..], "ipv6": [..]}`
    #[arg(long, env = "FINDER_IXP_MEMBERS")]
    pub ixp_members: Option<PathBuf>,

    /// Router alias groups in ITDK `node N<id>:  addr addr ..` format
    #[arg(long, env = "FINDER_ALIASES")]
    pub aliases: Option<PathBuf>,

    /// Liveness codes per four-address candidate, as JSON object
    #[arg(long, env = "FINDER_LIVENESS")]
    pub liveness: Option<PathBuf>,

    /// Follow-up trace evidence about candidate partner addresses
    #[arg(long)]
    pub trace_evidence: Option<PathBuf>,

    /// Follow-up destination evidence about candidates themselves
    #[arg(long)]
    pub dest_evidence: Option<PathBuf>,
}

impl Params {
    /// AS table with the exchange prefixes merged in, if given.
    pub fn read_as_table(&self) -> Result<PrefixAsTable> {
        let path = self
            .as_table
            .as_deref()
            .ok_or_else(|| anyhow!("An AS table (--as-table) is required for this command"))?;
        let mut table = PrefixAsTable::read(path).with_context(|| "Failed to load AS table")?;
        if let Some(ixp_path) = &self.ixp_prefixes {
            table
                .read_ixp_prefixes(ixp_path)
                .with_context(|| "Failed to load IXP prefixes")?;
        }
        debug!("AS table holds {} prefixes", table.len());
        Ok(table)
    }
}
