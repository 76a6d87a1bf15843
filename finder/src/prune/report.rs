use std::{collections::HashSet, fmt::Display, net::IpAddr};

use serde::Serialize;

use crate::info::FinderInfo;

/// Candidate counts after one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRow {
    pub stage: &'static str,
    pub twos: usize,
    pub fours: usize,
    pub ixps: usize,
    /// Distinct addresses over all three kinds.
    pub total: usize,
    /// Share of mid-path addresses that are candidates, in percent.
    pub middle_percent: f64,
}

impl StageRow {
    pub fn of(stage: &'static str, info: &FinderInfo) -> Self {
        let twos = info.twos();
        let fours = info.fours();
        let ixps = info.ixp_addrs();
        let all: HashSet<IpAddr> = twos
            .keys()
            .chain(fours.keys())
            .chain(ixps.iter())
            .copied()
            .collect();
        let covered = all.iter().filter(|addr| info.middle.contains(addr)).count();
        let middle_percent = if info.middle.is_empty() {
            0.0
        } else {
            covered as f64 * 100.0 / info.middle.len() as f64
        };
        Self {
            stage,
            twos: twos.len(),
            fours: fours.len(),
            ixps: ixps.len(),
            total: all.len(),
            middle_percent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub rows: Vec<StageRow>,
}

impl PipelineReport {
    pub fn record(&mut self, stage: &'static str, info: &FinderInfo) {
        self.rows.push(StageRow::of(stage, info));
    }
}

impl Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<16} {:>10} {:>10} {:>10} {:>10} {:>8}",
            "stage", "twos", "fours", "ixps", "total", "middle%"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<16} {:>10} {:>10} {:>10} {:>10} {:>8.2}",
                row.stage, row.twos, row.fours, row.ixps, row.total, row.middle_percent
            )?;
        }
        Ok(())
    }
}
