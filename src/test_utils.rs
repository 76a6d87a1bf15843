use std::net::IpAddr;

pub fn addr(input: &str) -> IpAddr {
    input.parse().expect(input)
}
