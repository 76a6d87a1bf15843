//! Finds candidate forwarding addresses (CFAs): router interfaces on point-to-point
//! links, inferred from consecutive traceroute hops that sit in the same /31 or /30
//! (or /127, /126), plus crossings of Internet exchange points.
//!
//! Data flows from capture files through [aggregate::Aggregator] (which runs a
//! [classify::TraceClassifier] per file) into one merged [info::FinderInfo], then through
//! the staged [prune::Pruned] pipeline and optionally into [validate::Validator].

pub mod aggregate;
pub mod cfa;
pub mod classify;
pub mod context;
pub mod geometry;
pub mod info;
pub mod oracle;
pub mod prune;
pub mod validate;

#[cfg(test)]
pub mod test_utils;
