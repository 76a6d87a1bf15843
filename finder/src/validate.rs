use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt::Display,
    net::IpAddr,
    path::Path,
};

use log::{debug, info};
use serde::Serialize;
use strum::Display as StrumDisplay;

use crate::{
    cfa::CfaKind,
    oracle::{read::address_set, AsLookup, AsOrgs, IxpMembers, Liveness, OracleReadError, Org},
    prune::{FinalStage, Pruned},
};

/// Known forwarding addresses of the target network, and known other addresses of it.
#[derive(Debug, Default, Clone)]
pub struct GroundTruth {
    pub positives: HashSet<IpAddr>,
    pub negatives: HashSet<IpAddr>,
}

impl GroundTruth {
    pub fn read(positives: &Path, negatives: &Path) -> Result<Self, OracleReadError> {
        let truth = Self {
            positives: address_set(positives)?,
            negatives: address_set(negatives)?,
        };
        info!(
            "Read ground truth with {} positives and {} negatives",
            truth.positives.len(),
            truth.negatives.len()
        );
        Ok(truth)
    }

    fn contains(&self, addr: &IpAddr) -> bool {
        self.positives.contains(addr) || self.negatives.contains(addr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Two,
    Four,
    Ixp,
    /// Not detected as a candidate.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Tp,
    Fp,
    Fn,
    Tn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownRow {
    pub addr: IpAddr,
    pub result: Outcome,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
    pub ppv: f64,
    pub recall: f64,
    pub total: usize,
}

/// Confusion matrix of one validation run, with the category each scored address was
/// detected as.
#[derive(Debug, Default, Clone)]
pub struct Verdicts {
    pub tps: BTreeSet<IpAddr>,
    pub fps: BTreeSet<IpAddr>,
    pub fns: BTreeSet<IpAddr>,
    pub tns: BTreeSet<IpAddr>,
    categories: BTreeMap<IpAddr, Category>,
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        f64::NAN
    } else {
        num as f64 / denom as f64
    }
}

impl Verdicts {
    /// Positive predictive value, NaN if nothing was detected.
    pub fn precision(&self) -> f64 {
        ratio(self.tps.len(), self.tps.len() + self.fps.len())
    }

    /// NaN if there were no positives to find.
    pub fn recall(&self) -> f64 {
        ratio(self.tps.len(), self.tps.len() + self.fns.len())
    }

    pub fn total(&self) -> usize {
        self.tps.len() + self.fps.len() + self.fns.len() + self.tns.len()
    }

    pub fn summary_row(&self) -> SummaryRow {
        SummaryRow {
            tp: self.tps.len(),
            fp: self.fps.len(),
            fn_: self.fns.len(),
            tn: self.tns.len(),
            ppv: self.precision(),
            recall: self.recall(),
            total: self.total(),
        }
    }

    pub fn breakdown(&self) -> Vec<BreakdownRow> {
        self.categories
            .iter()
            .filter_map(|(addr, category)| {
                let result = if self.tps.contains(addr) {
                    Outcome::Tp
                } else if self.fps.contains(addr) {
                    Outcome::Fp
                } else if self.fns.contains(addr) {
                    Outcome::Fn
                } else if self.tns.contains(addr) {
                    Outcome::Tn
                } else {
                    return None;
                };
                Some(BreakdownRow {
                    addr: *addr,
                    result,
                    category: *category,
                })
            })
            .collect()
    }
}

impl Display for Verdicts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TP {} TN {} FP {} FN {} PPV {:.2}% Recall {:.2}%",
            self.tps.len(),
            self.tns.len(),
            self.fps.len(),
            self.fns.len(),
            self.precision() * 100.0,
            self.recall() * 100.0
        )
    }
}

/// Scores a pruned candidate set against ground truth for one target network.
pub struct Validator<'a> {
    asns: &'a dyn AsLookup,
    orgs: &'a AsOrgs,
    ixp_members: Option<&'a IxpMembers>,
}

impl<'a> Validator<'a> {
    pub fn new(asns: &'a dyn AsLookup, orgs: &'a AsOrgs, ixp_members: Option<&'a IxpMembers>) -> Self {
        Self {
            asns,
            orgs,
            ixp_members,
        }
    }

    /// Only addresses seen in traces are scored, and only if one of their predecessors
    /// belongs to the target organization (by routing or exchange membership) or is
    /// itself part of the ground truth. Four-address candidates additionally need a
    /// passing liveness code if `liveness` is given.
    pub fn validate<S: FinalStage>(
        &self,
        pruned: &Pruned<S>,
        truth: &GroundTruth,
        prev: &HashMap<IpAddr, HashSet<IpAddr>>,
        target_asn: u32,
        liveness: Option<&Liveness>,
    ) -> Verdicts {
        let target_org = self.orgs.org_of_real(target_asn);
        let cfas = pruned.cfas();
        let seen = pruned.addresses();

        let mut verdicts = Verdicts::default();
        let mut irrelevant = 0;
        for addr in seen.iter().filter(|addr| truth.contains(addr)) {
            if !self.is_relevant(addr, &target_org, prev, truth) {
                irrelevant += 1;
                continue;
            }
            let category = detect(&cfas, addr, liveness);
            let detected = category != Category::Invalid;
            let bucket = match (truth.positives.contains(addr), detected) {
                (true, true) => &mut verdicts.tps,
                (true, false) => &mut verdicts.fns,
                (false, true) => &mut verdicts.fps,
                (false, false) => &mut verdicts.tns,
            };
            bucket.insert(*addr);
            verdicts.categories.insert(*addr, category);
        }
        debug!("Skipped {} ground truth addresses without relevant predecessor", irrelevant);
        info!("Validation for AS{}: {}", target_asn, verdicts);
        verdicts
    }

    fn is_relevant(
        &self,
        addr: &IpAddr,
        target_org: &Org,
        prev: &HashMap<IpAddr, HashSet<IpAddr>>,
        truth: &GroundTruth,
    ) -> bool {
        let Some(priors) = prev.get(addr) else {
            return false;
        };
        priors.iter().any(|prior| {
            self.orgs.org_of(self.asns.asn_for(prior)).as_ref() == Some(target_org)
                || self.is_member_of(prior, target_org)
                || truth.contains(prior)
        })
    }

    fn is_member_of(&self, addr: &IpAddr, target_org: &Org) -> bool {
        self.ixp_members
            .and_then(|members| members.asns_of(addr))
            .map_or(false, |asns| {
                asns.iter()
                    .any(|asn| &self.orgs.org_of_real(*asn) == target_org)
            })
    }
}

fn detect(cfas: &BTreeMap<IpAddr, CfaKind>, addr: &IpAddr, liveness: Option<&Liveness>) -> Category {
    match cfas.get(addr) {
        Some(CfaKind::Two) => Category::Two,
        Some(CfaKind::Four) if liveness.map_or(true, |it| !it.is_refuted(addr)) => Category::Four,
        Some(CfaKind::Ixp) => Category::Ixp,
        Some(CfaKind::Four) | None => Category::Invalid,
    }
}
