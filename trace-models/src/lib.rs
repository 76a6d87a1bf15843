pub mod hop;
pub mod reader;
pub mod trace;

pub use hop::{Hop, IcmpKind};
pub use reader::{read_traces, ReadError};
pub use trace::Trace;
