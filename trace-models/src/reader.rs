use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use log::trace;
use thiserror::Error;

use crate::Trace;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("failed to open capture file `{path}`")]
    FailedOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read line {line_no} of capture file")]
    FailedRead {
        line_no: usize,
        source: std::io::Error,
    },

    #[error("malformed trace on line {line_no}")]
    Malformed {
        line_no: usize,
        source: serde_json::Error,
    },
}

/// Reads a capture file with one JSON-encoded [Trace] per line. Empty lines and lines
/// starting with `#` are skipped. Any malformed line fails the whole file, since a
/// partially-read capture would silently skew the counts.
pub fn read_traces(path: &Path) -> Result<Vec<Trace>, ReadError> {
    use ReadError as E;

    let file = File::open(path).map_err(|source| E::FailedOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut traces = vec![];
    for (idx, line_res) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line_res.map_err(|source| E::FailedRead { line_no, source })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let trace = serde_json::from_str(line).map_err(|source| E::Malformed { line_no, source })?;
        traces.push(trace);
    }
    trace!("Read {} traces from {:?}", traces.len(), path);
    Ok(traces)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use assertor::*;
    use tempfile::NamedTempFile;

    use crate::IcmpKind;

    use super::*;

    #[test]
    fn reads_traces_and_skips_comments() -> Result<()> {
        // given
        let mut file = NamedTempFile::new()?;
        writeln!(file, "# vantage point: ams-nl")?;
        writeln!(
            file,
            r#"{{"dst":"192.0.2.9","hops":[{{"addr":"198.51.100.0","probe_ttl":3,"reply_ttl":252,"kind":"time_exceeded"}},{{"addr":"198.51.100.1","probe_ttl":4,"reply_ttl":60,"kind":"echo_reply"}}]}}"#
        )?;
        writeln!(file)?;
        writeln!(
            file,
            r#"{{"dst":"192.0.2.10","hops":[],"loop":[{{"addr":"198.51.100.4","probe_ttl":5,"reply_ttl":250,"kind":"time_exceeded"}}]}}"#
        )?;
        // when
        let traces = read_traces(file.path())?;
        // then
        assert_that!(traces).has_length(2);
        assert_that!(traces[0].hops[1].kind).is_equal_to(IcmpKind::EchoReply);
        assert_that!(traces[0].loop_hops).is_none();
        assert_that!(traces[1].loop_hops.as_ref().map(|it| it.len())).is_equal_to(Some(1));
        Ok(())
    }

    #[test]
    fn malformed_line_fails_file() -> Result<()> {
        // given
        let mut file = NamedTempFile::new()?;
        writeln!(file, r#"{{"dst":"192.0.2.9","hops":[]}}"#)?;
        writeln!(file, r#"{{"dst":"nope"}}"#)?;
        // when
        let res = read_traces(file.path());
        // then
        assert!(matches!(res, Err(ReadError::Malformed { line_no: 2, .. })));
        Ok(())
    }

    #[test]
    fn missing_file_fails_open() {
        // when
        let res = read_traces(Path::new("/nonexistent/capture.jsonl"));
        // then
        assert!(matches!(res, Err(ReadError::FailedOpen { .. })));
    }
}
