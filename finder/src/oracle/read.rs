use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    net::IpAddr,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleReadError {
    #[error("oracle file does not exist: `{0}`")]
    NoSuchFile(PathBuf),

    #[error("failed to open oracle file `{path}`")]
    FailedOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read a line from oracle file")]
    FailedRead { source: std::io::Error },

    #[error("invalid entry on line {line_no}: `{line}` ({reason})")]
    Syntax {
        line_no: usize,
        line: String,
        reason: String,
    },

    #[error("invalid JSON in oracle file `{path}`")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl OracleReadError {
    pub fn syntax(line_no: usize, line: &str, reason: impl ToString) -> Self {
        Self::Syntax {
            line_no,
            line: line.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn open(path: &Path) -> Result<File, OracleReadError> {
    use OracleReadError as E;

    if !path.is_file() {
        return Err(E::NoSuchFile(path.to_path_buf()));
    }
    File::open(path).map_err(|source| E::FailedOpen {
        path: path.to_path_buf(),
        source,
    })
}

/// Non-empty, non-comment lines (`#` at start) with their 1-based line numbers, trimmed.
pub fn data_lines(path: &Path) -> Result<Vec<(usize, String)>, OracleReadError> {
    let lines: Vec<(usize, String)> = BufReader::new(open(path)?)
        .lines()
        .enumerate()
        .map(|(idx, res)| res.map(|line| (idx + 1, line.trim().to_string())))
        .filter_ok(|(_, line)| !line.starts_with('#') && !line.is_empty())
        .try_collect()
        .map_err(|source| OracleReadError::FailedRead { source })?;
    Ok(lines)
}

pub fn json_file<T: DeserializeOwned>(path: &Path) -> Result<T, OracleReadError> {
    serde_json::from_reader(BufReader::new(open(path)?)).map_err(|source| OracleReadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OracleReadError> {
    data_lines(path)?
        .into_iter()
        .map(|(line_no, line)| {
            serde_json::from_str(&line).map_err(|e| OracleReadError::syntax(line_no, &line, e))
        })
        .collect()
}

/// One address per line, e.g. ground-truth sets or ping responses.
pub fn address_set(path: &Path) -> Result<HashSet<IpAddr>, OracleReadError> {
    data_lines(path)?
        .into_iter()
        .map(|(line_no, line)| {
            line.parse()
                .map_err(|e| OracleReadError::syntax(line_no, &line, e))
        })
        .collect()
}
