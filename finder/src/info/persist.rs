use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FinderInfo;

/// Bumped whenever the layout of [FinderInfo] changes. Dumps with another version are
/// rejected, never coerced.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error on `{path}`")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid accumulator dump `{path}`")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("accumulator dump has schema version {found}, but this build reads version {expected}")]
    IncompatibleVersion { found: u32, expected: u32 },

    #[error("expected a {expected} accumulator dump, found a {found} one")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// Aggregation result as persisted: either one accumulator for everything, or one per
/// vantage point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Aggregate {
    Global(FinderInfo),
    PerVantagePoint(BTreeMap<String, FinderInfo>),
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
enum PayloadRef<'a> {
    Global(&'a FinderInfo),
    PerVantagePoint(&'a BTreeMap<String, FinderInfo>),
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    version: u32,
    created_at: DateTime<Utc>,
    payload: PayloadRef<'a>,
}

/// Payload stays untyped until the version is known to match.
#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    created_at: DateTime<Utc>,
    payload: serde_json::Value,
}

impl Aggregate {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Aggregate::Global(_) => "global",
            Aggregate::PerVantagePoint(_) => "per_vantage_point",
        }
    }

    /// Collapses per-vantage-point accumulators into one.
    pub fn into_global(self) -> FinderInfo {
        match self {
            Aggregate::Global(info) => info,
            Aggregate::PerVantagePoint(by_vp) => {
                let mut merged = FinderInfo::default();
                for (_, info) in by_vp {
                    merged.merge(info);
                }
                merged
            }
        }
    }

    fn payload(&self) -> PayloadRef<'_> {
        match self {
            Aggregate::Global(info) => PayloadRef::Global(info),
            Aggregate::PerVantagePoint(by_vp) => PayloadRef::PerVantagePoint(by_vp),
        }
    }

    pub fn dump(&self, path: &Path) -> Result<(), PersistError> {
        write_envelope(path, self.payload())
    }

    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let io_err = |source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json_err = |source| PersistError::Json {
            path: path.to_path_buf(),
            source,
        };

        let reader = BufReader::new(File::open(path).map_err(io_err)?);
        let envelope: EnvelopeIn = serde_json::from_reader(reader).map_err(json_err)?;
        if envelope.version != SCHEMA_VERSION {
            return Err(PersistError::IncompatibleVersion {
                found: envelope.version,
                expected: SCHEMA_VERSION,
            });
        }
        let aggregate: Aggregate = serde_json::from_value(envelope.payload).map_err(json_err)?;
        debug!(
            "Loaded {} accumulator from {:?}, created at {}",
            aggregate.kind_name(),
            path,
            envelope.created_at
        );
        Ok(aggregate)
    }
}

fn write_envelope(path: &Path, payload: PayloadRef<'_>) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let envelope = EnvelopeOut {
        version: SCHEMA_VERSION,
        created_at: Utc::now(),
        payload,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer(&mut writer, &envelope).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    info!("Wrote accumulator to {:?}", path);
    Ok(())
}

impl FinderInfo {
    pub fn dump(&self, path: &Path) -> Result<(), PersistError> {
        write_envelope(path, PayloadRef::Global(self))
    }

    /// Loads a global dump. Per-vantage-point dumps are refused here; use
    /// [Aggregate::load] and [Aggregate::into_global] to collapse them explicitly.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        match Aggregate::load(path)? {
            Aggregate::Global(info) => Ok(info),
            other => Err(PersistError::UnexpectedKind {
                expected: "global",
                found: other.kind_name(),
            }),
        }
    }
}
