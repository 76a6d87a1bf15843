use trace_models::{Hop, Trace};

/// Nearest hop before `idx` whose address differs from the address at `idx`. The same
/// router answering at several consecutive TTLs is not evidence of a separate prior
/// hop, so those repeats are skipped. `None` if the walk reaches the start of the trace
/// (or `idx` is out of range).
pub fn prior_distinct(trace: &Trace, idx: usize) -> Option<&Hop> {
    let current = trace.hops.get(idx)?;
    trace.hops[..idx]
        .iter()
        .rev()
        .find(|hop| hop.addr != current.addr)
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use crate::test_utils::{addr, trace_of};

    use super::*;

    #[test]
    fn skips_repeated_addresses() {
        // given
        let trace = trace_of(&["192.0.2.1", "192.0.2.9", "192.0.2.9", "192.0.2.9"]);
        // when
        let prior = prior_distinct(&trace, 3);
        // then
        assert_that!(prior.map(|it| it.addr)).is_equal_to(Some(addr("192.0.2.1")));
    }

    #[test]
    fn immediate_predecessor_if_distinct() {
        // given
        let trace = trace_of(&["192.0.2.1", "192.0.2.5", "192.0.2.6"]);
        // then
        assert_that!(prior_distinct(&trace, 2).map(|it| it.addr)).is_equal_to(Some(addr("192.0.2.5")));
    }

    #[test]
    fn none_at_start_of_trace() {
        // given
        let trace = trace_of(&["192.0.2.9", "192.0.2.9"]);
        // then
        assert_that!(prior_distinct(&trace, 0)).is_none();
        assert_that!(prior_distinct(&trace, 1)).is_none();
        assert_that!(prior_distinct(&trace, 7)).is_none();
    }
}
