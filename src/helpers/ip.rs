use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Fixed-width byte form of an address: 4 bytes for IPv4, 16 bytes for IPv6.
/// Comparisons between a V4 and a V6 form never consider them equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Packed {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl Packed {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Packed::V4(bytes) => bytes,
            Packed::V6(bytes) => bytes,
        }
    }

    pub fn last_byte(&self) -> u8 {
        match self {
            Packed::V4(bytes) => bytes[3],
            Packed::V6(bytes) => bytes[15],
        }
    }
}

pub trait Pack {
    fn packed(&self) -> Packed;
}

impl Pack for IpAddr {
    fn packed(&self) -> Packed {
        match self {
            IpAddr::V4(it) => Packed::V4(it.octets()),
            IpAddr::V6(it) => Packed::V6(it.octets()),
        }
    }
}

impl From<&IpAddr> for Packed {
    fn from(value: &IpAddr) -> Self {
        value.packed()
    }
}

/// Integer view of an address, used for the arithmetic on point-to-point subnets.
pub trait AddrBits: Sized {
    fn bits(&self) -> u128;

    /// Same address family as `self`, with the given value. For IPv4, only the low
    /// 32 bits are used.
    fn with_bits(&self, bits: u128) -> Self;

    /// Masks the lowest `count` bits of this address, i.e. the host part of a
    /// network that is `count` bits wide.
    fn low_bits(&self, count: u32) -> u128 {
        self.bits() & ((1u128 << count) - 1)
    }
}

impl AddrBits for IpAddr {
    fn bits(&self) -> u128 {
        match self {
            IpAddr::V4(it) => u32::from(*it) as u128,
            IpAddr::V6(it) => u128::from(*it),
        }
    }

    fn with_bits(&self, bits: u128) -> Self {
        match self {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::from(bits as u32)),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::from(bits)),
        }
    }
}
