//! Point-to-point subnet patterns between two consecutive hop addresses.
//!
//! Everything in here works on the packed byte form of addresses, so IPv4 and IPv6
//! share the same rules: a two-address subnet is a /31 (/127), a four-address subnet
//! a /30 (/126).

use std::net::IpAddr;

use cfa_crab::helpers::ip::{AddrBits, Pack};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Same length, equal on every byte except the last, last bytes differ by exactly one.
pub fn adjacent(b1: &[u8], b2: &[u8]) -> bool {
    let (Some((last1, head1)), Some((last2, head2))) = (b1.split_last(), b2.split_last()) else {
        return false;
    };
    b1.len() == b2.len() && head1 == head2 && last1.abs_diff(*last2) == 1
}

/// Subnet pattern of an adjacent pair. Magnitude 2 means a two-address subnet, 4 a
/// four-address subnet, 0 no point-to-point pattern at all. Only meaningful if
/// [adjacent] holds for the same inputs.
pub fn classify_pair(b1: &[u8], b2: &[u8]) -> i8 {
    let (Some(last1), Some(last2)) = (b1.last(), b2.last()) else {
        return 0;
    };
    match (last1 % 4, last2 % 4) {
        (0, 1) => 2,
        (0, _) => 0,
        (1, 0) => -2,
        (1, _) => 4,
        (2, 1) => -4,
        (2, _) => 2,
        (3, 2) => -2,
        _ => 0,
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Width {
    Two,
    Four,
}

impl Width {
    /// The sign of a pattern carries no meaning for bucketing, only its magnitude.
    pub fn from_pattern(pattern: i8) -> Option<Width> {
        match pattern.unsigned_abs() {
            2 => Some(Width::Two),
            4 => Some(Width::Four),
            _ => None,
        }
    }
}

/// Pattern width of hop `x` followed by hop `y`, if they form a point-to-point pair.
pub fn pattern_of(x: &IpAddr, y: &IpAddr) -> Option<Width> {
    let (px, py) = (x.packed(), y.packed());
    let (bx, by) = (px.as_bytes(), py.as_bytes());
    if !adjacent(bx, by) {
        return None;
    }
    Width::from_pattern(classify_pair(bx, by))
}

/// The other usable address of the point-to-point subnet `addr` is assumed to be in.
/// For a four-address subnet, network and broadcast addresses have no other side.
pub fn otherside(addr: &IpAddr, width: Width) -> Option<IpAddr> {
    let bits = addr.bits();
    match width {
        Width::Two => Some(addr.with_bits(bits ^ 1)),
        Width::Four => match addr.low_bits(2) {
            1 => Some(addr.with_bits(bits + 1)),
            2 => Some(addr.with_bits(bits - 1)),
            _ => None,
        },
    }
}

/// All four addresses of the /30 (/126) containing `addr`, in ascending order.
pub fn block_of_four(addr: &IpAddr) -> [IpAddr; 4] {
    let base = addr.bits() & !0b11;
    [0, 1, 2, 3].map(|offset| addr.with_bits(base | offset))
}

#[cfg(test)]
mod tests {
    use assertor::*;
    use strum::IntoEnumIterator;

    use crate::test_utils::addr;

    use super::*;

    fn with_last(last: u8) -> [u8; 4] {
        [192, 0, 2, last]
    }

    #[test]
    fn adjacency_is_symmetric() {
        for a in 0..=255u8 {
            for b in [a.wrapping_sub(1), a, a.wrapping_add(1), a.wrapping_add(2)] {
                let (b1, b2) = (with_last(a), with_last(b));
                assert_that!(adjacent(&b1, &b2)).is_equal_to(adjacent(&b2, &b1));
            }
        }
    }

    #[test]
    fn adjacency_needs_equal_prefix_and_length() {
        assert_that!(adjacent(&[10, 0, 0, 0], &[10, 0, 1, 1])).is_false();
        assert_that!(adjacent(&[10, 0, 0, 0], &[10, 0, 0, 0, 1])).is_false();
        assert_that!(adjacent(&[], &[])).is_false();
        assert_that!(adjacent(&[10, 0, 0, 255], &[10, 0, 1, 0])).is_false();
        assert_that!(adjacent(&[10, 0, 0, 4], &[10, 0, 0, 5])).is_true();
    }

    #[test]
    fn pattern_magnitude_is_known_on_adjacent_input() {
        for a in 0..255u8 {
            for (b1, b2) in [(with_last(a), with_last(a + 1)), (with_last(a + 1), with_last(a))] {
                assert_that!(adjacent(&b1, &b2)).is_true();
                let magnitude = classify_pair(&b1, &b2).unsigned_abs();
                assert_that!([0u8, 2, 4].contains(&magnitude)).is_true();
            }
        }
    }

    #[test]
    fn pattern_table() {
        // (last byte x, last byte y, expected)
        let cases = [
            (0, 1, 2),
            (1, 0, -2),
            (1, 2, 4),
            (2, 1, -4),
            (2, 3, 2),
            (3, 2, -2),
            (3, 4, 0),
            (4, 3, 0),
        ];
        for (x, y, expected) in cases {
            assert_that!(classify_pair(&with_last(x), &with_last(y))).is_equal_to(expected);
        }
    }

    #[test]
    fn scenario_two_address_subnet() {
        // given
        let (x, y) = (addr("192.0.2.0"), addr("192.0.2.1"));
        // when
        let pattern = classify_pair(x.packed().as_bytes(), y.packed().as_bytes());
        // then
        assert_that!(pattern).is_equal_to(2);
        assert_that!(pattern_of(&x, &y)).is_equal_to(Some(Width::Two));
    }

    #[test]
    fn scenario_not_adjacent() {
        // given
        let (x, y) = (addr("192.0.2.1"), addr("192.0.2.3"));
        // then
        assert_that!(adjacent(x.packed().as_bytes(), y.packed().as_bytes())).is_false();
        assert_that!(pattern_of(&x, &y)).is_none();
    }

    #[test]
    fn mixed_families_never_pair() {
        assert_that!(pattern_of(&addr("0.0.0.1"), &addr("::"))).is_none();
    }

    #[test]
    fn ipv6_follows_same_rules() {
        assert_that!(pattern_of(&addr("2001:db8::1"), &addr("2001:db8::2"))).is_equal_to(Some(Width::Four));
        assert_that!(pattern_of(&addr("2001:db8::2"), &addr("2001:db8::3"))).is_equal_to(Some(Width::Two));
    }

    #[test]
    fn otherside_of_two() {
        assert_that!(otherside(&addr("192.0.2.4"), Width::Two)).is_equal_to(Some(addr("192.0.2.5")));
        assert_that!(otherside(&addr("192.0.2.5"), Width::Two)).is_equal_to(Some(addr("192.0.2.4")));
        assert_that!(otherside(&addr("2001:db8::ff"), Width::Two)).is_equal_to(Some(addr("2001:db8::fe")));
    }

    #[test]
    fn otherside_of_four() {
        assert_that!(otherside(&addr("192.0.2.5"), Width::Four)).is_equal_to(Some(addr("192.0.2.6")));
        assert_that!(otherside(&addr("192.0.2.6"), Width::Four)).is_equal_to(Some(addr("192.0.2.5")));
        assert_that!(otherside(&addr("192.0.2.4"), Width::Four)).is_none();
        assert_that!(otherside(&addr("192.0.2.7"), Width::Four)).is_none();
    }

    #[test]
    fn otherside_is_an_involution() {
        for width in Width::iter() {
            let start = addr("198.51.100.1");
            let back = otherside(&start, width).and_then(|it| otherside(&it, width));
            assert_that!(back).is_equal_to(Some(start));
        }
    }

    #[test]
    fn block_of_four_is_aligned() {
        // when
        let block = block_of_four(&addr("192.0.2.6"));
        // then
        assert_that!(block).is_equal_to([
            addr("192.0.2.4"),
            addr("192.0.2.5"),
            addr("192.0.2.6"),
            addr("192.0.2.7"),
        ]);
    }
}
