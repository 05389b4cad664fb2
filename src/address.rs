use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::net::Ipv4Addr;
use thiserror::Error;

lazy_static! {
    static ref IPV4_SHAPE: Regex = Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}$").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error(r#""{0}" is not four dot-separated decimal groups"#)]
    Shape(String),
    #[error(r#"octet {octet} of "{address}" is larger than 255"#)]
    OctetOutOfRange { address: String, octet: u16 },
}

/// Parses a dotted-quad IPv4 address.
///
/// Every group must be 1-3 ASCII digits and at most 255. Leading zeros are
/// allowed, so `"08.8.8.8"` parses as `8.8.8.8`.
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, AddressError> {
    if !IPV4_SHAPE.is_match(s) {
        return Err(AddressError::Shape(s.to_owned()));
    }
    let mut octets = [0_u8; 4];
    for (octet, group) in octets.iter_mut().zip(s.split('.')) {
        // Shape check guarantees 1-3 digits
        let value: u16 = group
            .parse()
            .map_err(|_| AddressError::Shape(s.to_owned()))?;
        *octet = value
            .try_into()
            .map_err(|_| AddressError::OctetOutOfRange {
                address: s.to_owned(),
                octet: value,
            })?;
    }
    Ok(Ipv4Addr::from(octets))
}

/// IPv4 blocks which have no meaningful public location.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ReservedRange {
    ThisNetwork,
    Private10,
    Loopback,
    LinkLocal,
    Private172,
    Private192,
}

impl ReservedRange {
    pub const ALL: [ReservedRange; 6] = [
        Self::ThisNetwork,
        Self::Private10,
        Self::Loopback,
        Self::LinkLocal,
        Self::Private172,
        Self::Private192,
    ];

    pub fn network(self) -> (Ipv4Addr, u32) {
        match self {
            Self::ThisNetwork => (Ipv4Addr::new(0, 0, 0, 0), 8),
            Self::Private10 => (Ipv4Addr::new(10, 0, 0, 0), 8),
            Self::Loopback => (Ipv4Addr::new(127, 0, 0, 0), 8),
            Self::LinkLocal => (Ipv4Addr::new(169, 254, 0, 0), 16),
            Self::Private172 => (Ipv4Addr::new(172, 16, 0, 0), 12),
            Self::Private192 => (Ipv4Addr::new(192, 168, 0, 0), 16),
        }
    }

    pub fn contains(self, address: Ipv4Addr) -> bool {
        let (network, suffix) = self.network();
        let mask = u32::MAX << (u32::BITS - suffix);
        u32::from(address) & mask == u32::from(network)
    }

    pub fn find(address: Ipv4Addr) -> Option<Self> {
        Self::ALL.into_iter().find(|range| range.contains(address))
    }
}

impl From<ReservedRange> for &'static str {
    fn from(range: ReservedRange) -> Self {
        match range {
            ReservedRange::ThisNetwork => "0.0.0.0/8",
            ReservedRange::Private10 => "10.0.0.0/8",
            ReservedRange::Loopback => "127.0.0.0/8",
            ReservedRange::LinkLocal => "169.254.0.0/16",
            ReservedRange::Private172 => "172.16.0.0/12",
            ReservedRange::Private192 => "192.168.0.0/16",
        }
    }
}

impl fmt::Display for ReservedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).into())
    }
}
