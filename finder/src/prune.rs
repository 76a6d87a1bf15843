//! Staged pruning of a merged accumulator.
//!
//! Each pass consumes a [Pruned] in the stage it expects and returns the next stage, so
//! passes can only be applied in this order:
//!
//! 1. [Pruned::prune_spoofing] on [Collected]
//! 2. [Pruned::fix_fours] on [SpoofingPruned]
//! 3. [Pruned::prune_pingtest] on [FoursFixed]
//! 4. [Pruned::prune_router_loops] on [PingTested]
//! 5. [Pruned::prune_ixps] (or [Pruned::keep_ixps]) on [LoopsPruned]
//! 6. optionally [Pruned::prune_tracetest] and [Pruned::prune_dests], any number of times
//!
//! Use [Pruned::duplicate] to keep the previous stage around for comparison.

use std::{fmt::Debug, marker::PhantomData, ops::Deref};

use log::{info, warn};

use crate::{
    info::FinderInfo,
    oracle::{self, Aliases, AsOrgs, Evidence, IxpMembers, Liveness, OracleReadError},
};

pub mod passes;
pub mod report;

pub use report::{PipelineReport, StageRow};

pub trait Stage {
    const NAME: &'static str;
}

/// Stages after which the candidate set is complete and may be evaluated.
pub trait FinalStage: Stage {}

macro_rules! stages {
    ($($stage:ident => $name:literal),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub enum $stage {}

            impl Stage for $stage {
                const NAME: &'static str = $name;
            }
        )*
    };
}

stages! {
    Collected => "collected",
    SpoofingPruned => "spoofing",
    FoursFixed => "fixfours",
    PingTested => "pingtest",
    LoopsPruned => "router_loops",
    IxpsPruned => "ixps",
    Reconciled => "reconciled",
}

impl FinalStage for IxpsPruned {}
impl FinalStage for Reconciled {}

pub struct Pruned<S: Stage> {
    info: FinderInfo,
    stage: PhantomData<S>,
}

impl<S: Stage> Pruned<S> {
    fn advance<T: Stage>(self, removed: usize) -> Pruned<T> {
        info!("{:<12} removed {:>8}  {}", T::NAME, removed, self.info.summary());
        Pruned {
            info: self.info,
            stage: PhantomData,
        }
    }

    /// Independent copy in the same stage, for running passes non-destructively.
    pub fn duplicate(&self) -> Self {
        Self {
            info: self.info.clone(),
            stage: PhantomData,
        }
    }

    pub fn stage_name(&self) -> &'static str {
        S::NAME
    }

    pub fn into_inner(self) -> FinderInfo {
        self.info
    }
}

impl<S: Stage> Clone for Pruned<S> {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}

impl<S: Stage> Debug for Pruned<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pruned")
            .field("stage", &S::NAME)
            .field("summary", &self.info.summary())
            .finish()
    }
}

impl<S: Stage> Deref for Pruned<S> {
    type Target = FinderInfo;

    fn deref(&self) -> &Self::Target {
        &self.info
    }
}

impl Pruned<Collected> {
    pub fn new(info: FinderInfo) -> Self {
        Self {
            info,
            stage: PhantomData,
        }
    }

    pub fn prune_spoofing(mut self) -> Pruned<SpoofingPruned> {
        let removed = passes::spoofing(&mut self.info);
        self.advance(removed)
    }
}

impl From<FinderInfo> for Pruned<Collected> {
    fn from(value: FinderInfo) -> Self {
        Self::new(value)
    }
}

impl Pruned<SpoofingPruned> {
    pub fn fix_fours(mut self) -> Pruned<FoursFixed> {
        let removed = passes::fix_fours(&mut self.info);
        self.advance(removed)
    }
}

impl Pruned<FoursFixed> {
    pub fn prune_pingtest(mut self, liveness: &Liveness) -> Pruned<PingTested> {
        let removed = passes::pingtest(&mut self.info, liveness);
        self.advance(removed)
    }
}

impl Pruned<PingTested> {
    pub fn prune_router_loops(mut self, aliases: &Aliases) -> Pruned<LoopsPruned> {
        let removed = passes::router_loops(&mut self.info, aliases);
        self.advance(removed)
    }
}

impl Pruned<LoopsPruned> {
    pub fn prune_ixps(mut self, members: &IxpMembers, orgs: &AsOrgs) -> Pruned<IxpsPruned> {
        let removed = passes::ixps(&mut self.info, members, orgs);
        self.advance(removed)
    }

    /// Without membership data every crossing would look unowned, so they are all kept.
    pub fn keep_ixps(self) -> Pruned<IxpsPruned> {
        warn!("No IXP membership data, keeping all {} crossings.", self.info.ixps.len());
        self.advance(0)
    }
}

impl<S: FinalStage> Pruned<S> {
    /// Applies evidence about subnet partners: a candidate whose partner was rejected
    /// (and not confirmed otherwise) is dropped.
    pub fn prune_tracetest(mut self, partner_evidence: &Evidence) -> Pruned<Reconciled> {
        let matched = partner_evidence.match_candidates(&self.info);
        let removed = passes::reject(&mut self.info, &matched.reject);
        self.advance(removed)
    }

    /// Applies evidence about the candidates themselves.
    pub fn prune_dests(mut self, evidence: &Evidence) -> Pruned<Reconciled> {
        let mut evidence = evidence.clone();
        evidence.subtract();
        let removed = passes::reject(&mut self.info, &evidence.reject);
        self.advance(removed)
    }
}

/// External data for the pipeline. Absent oracles mean "no information": the
/// corresponding pass keeps everything.
#[derive(Debug, Default)]
pub struct Oracles {
    pub liveness: Option<Liveness>,
    pub aliases: Option<Aliases>,
    pub ixp_members: Option<IxpMembers>,
    pub as_orgs: Option<AsOrgs>,
    pub trace_evidence: Option<Evidence>,
    pub dest_evidence: Option<Evidence>,
}

impl Oracles {
    pub fn read(params: &oracle::Params) -> Result<Self, OracleReadError> {
        Ok(Self {
            liveness: params.liveness.as_deref().map(Liveness::read).transpose()?,
            aliases: params.aliases.as_deref().map(Aliases::read).transpose()?,
            ixp_members: params.ixp_members.as_deref().map(IxpMembers::read).transpose()?,
            as_orgs: params.as_orgs.as_deref().map(AsOrgs::read).transpose()?,
            trace_evidence: params.trace_evidence.as_deref().map(Evidence::read).transpose()?,
            dest_evidence: params.dest_evidence.as_deref().map(Evidence::read).transpose()?,
        })
    }
}

/// Runs every pass in order, recording the candidate counts after each stage. The raw
/// role counters are made exclusive first, see [FinderInfo::dedup_roles].
pub fn run_pipeline(mut info: FinderInfo, oracles: &Oracles) -> (Pruned<Reconciled>, PipelineReport) {
    info.dedup_roles();
    let mut report = PipelineReport::default();
    let no_liveness = Liveness::default();
    let no_aliases = Aliases::default();
    let no_orgs = AsOrgs::default();
    let no_evidence = Evidence::default();

    let collected = Pruned::new(info);
    report.record(Collected::NAME, &collected);

    let spoofing = collected.prune_spoofing();
    report.record(SpoofingPruned::NAME, &spoofing);

    let fixed = spoofing.fix_fours();
    report.record(FoursFixed::NAME, &fixed);

    let pinged = fixed.prune_pingtest(oracles.liveness.as_ref().unwrap_or(&no_liveness));
    report.record(PingTested::NAME, &pinged);

    let unlooped = pinged.prune_router_loops(oracles.aliases.as_ref().unwrap_or(&no_aliases));
    report.record(LoopsPruned::NAME, &unlooped);

    let ixps = match &oracles.ixp_members {
        Some(members) => unlooped.prune_ixps(members, oracles.as_orgs.as_ref().unwrap_or(&no_orgs)),
        None => unlooped.keep_ixps(),
    };
    report.record(IxpsPruned::NAME, &ixps);

    let reconciled = ixps
        .prune_tracetest(oracles.trace_evidence.as_ref().unwrap_or(&no_evidence))
        .prune_dests(oracles.dest_evidence.as_ref().unwrap_or(&no_evidence));
    report.record(Reconciled::NAME, &reconciled);

    (reconciled, report)
}
