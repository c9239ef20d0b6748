// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::primitives::Afi;
use nom::{bytes::complete::take, number::complete::u8 as parse_u8};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Number of bytes needed to carry `bits` bits of prefix on the wire.
pub fn wire_bytes(bits: u8) -> usize {
    usize::from(bits).div_ceil(8)
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, Eq, Hash, PartialEq, JsonSchema,
)]
pub struct Prefix4 {
    pub value: Ipv4Addr,
    pub length: u8,
}

impl PartialOrd for Prefix4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prefix4 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

impl Prefix4 {
    pub const HOST_MASK: u8 = 32;

    /// Create a new `Prefix4` from an IP address and net mask. Host bits are
    /// zeroed on creation and lengths beyond 32 are clamped.
    /// ```
    /// use bgp::prefix::Prefix4;
    /// use std::net::Ipv4Addr;
    /// let p4 = Prefix4::new(Ipv4Addr::new(10, 0, 0, 10), 24);
    /// assert_eq!(p4.value, Ipv4Addr::new(10, 0, 0, 0));
    /// ```
    pub fn new(ip: Ipv4Addr, length: u8) -> Self {
        let mut new = Self {
            value: ip,
            length: length.min(Self::HOST_MASK),
        };
        new.unset_host_bits();
        new
    }

    fn mask(&self) -> u32 {
        match self.length {
            0 => 0,
            l => (!0u32) << (Self::HOST_MASK - l.min(Self::HOST_MASK)),
        }
    }

    pub fn host_bits_are_unset(&self) -> bool {
        self.value.to_bits() & self.mask() == self.value.to_bits()
    }

    pub fn unset_host_bits(&mut self) {
        self.value = Ipv4Addr::from_bits(self.value.to_bits() & self.mask())
    }

    /// Serialize as length byte followed by the minimum number of address
    /// bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = vec![self.length];
        buf.extend_from_slice(&self.value.octets()[..wire_bytes(self.length)]);
        buf
    }

    pub fn from_wire(input: &[u8]) -> Result<(&[u8], Prefix4), Error> {
        let (input, length) = parse_u8(input)?;
        Self::from_bits(input, length)
    }

    /// Read the address bytes of a prefix whose length in bits is already
    /// known.
    pub fn from_bits(input: &[u8], length: u8) -> Result<(&[u8], Prefix4), Error> {
        if length > Self::HOST_MASK {
            return Err(Error::InvalidPrefixLength(length, Self::HOST_MASK));
        }
        let (input, bytes) = take(wire_bytes(length))(input)?;
        let mut octets = [0u8; 4];
        octets[..bytes.len()].copy_from_slice(bytes);
        Ok((input, Prefix4::new(Ipv4Addr::from(octets), length)))
    }
}

impl fmt::Display for Prefix4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix4 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) =
            s.split_once('/').ok_or("malformed prefix".to_string())?;
        let value: Ipv4Addr =
            value.parse().map_err(|_| "malformed ip addr".to_string())?;
        let length: u8 =
            length.parse().map_err(|_| "malformed length".to_string())?;
        if length > Self::HOST_MASK {
            return Err(format!("prefix length {length} exceeds 32"));
        }
        Ok(Prefix4::new(value, length))
    }
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, JsonSchema,
)]
pub struct Prefix6 {
    pub value: Ipv6Addr,
    pub length: u8,
}

impl PartialOrd for Prefix6 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prefix6 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

impl Prefix6 {
    pub const HOST_MASK: u8 = 128;

    /// Create a new `Prefix6` from an IP address and net mask. Host bits are
    /// zeroed on creation and lengths beyond 128 are clamped.
    /// ```
    /// use bgp::prefix::Prefix6;
    /// use std::net::Ipv6Addr;
    /// use std::str::FromStr;
    /// let p6 = Prefix6::new(Ipv6Addr::from_str("2001:db8::1").unwrap(), 64);
    /// assert_eq!(p6.value, Ipv6Addr::from_str("2001:db8::").unwrap());
    /// ```
    pub fn new(ip: Ipv6Addr, length: u8) -> Self {
        let mut new = Self {
            value: ip,
            length: length.min(Self::HOST_MASK),
        };
        new.unset_host_bits();
        new
    }

    fn mask(&self) -> u128 {
        match self.length {
            0 => 0,
            l => (!0u128) << (Self::HOST_MASK - l.min(Self::HOST_MASK)),
        }
    }

    pub fn host_bits_are_unset(&self) -> bool {
        self.value.to_bits() & self.mask() == self.value.to_bits()
    }

    pub fn unset_host_bits(&mut self) {
        self.value = Ipv6Addr::from_bits(self.value.to_bits() & self.mask())
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = vec![self.length];
        buf.extend_from_slice(&self.value.octets()[..wire_bytes(self.length)]);
        buf
    }

    pub fn from_wire(input: &[u8]) -> Result<(&[u8], Prefix6), Error> {
        let (input, length) = parse_u8(input)?;
        Self::from_bits(input, length)
    }

    pub fn from_bits(input: &[u8], length: u8) -> Result<(&[u8], Prefix6), Error> {
        if length > Self::HOST_MASK {
            return Err(Error::InvalidPrefixLength(length, Self::HOST_MASK));
        }
        let (input, bytes) = take(wire_bytes(length))(input)?;
        let mut octets = [0u8; 16];
        octets[..bytes.len()].copy_from_slice(bytes);
        Ok((input, Prefix6::new(Ipv6Addr::from(octets), length)))
    }
}

impl fmt::Display for Prefix6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix6 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) =
            s.split_once('/').ok_or("malformed prefix".to_string())?;
        let value: Ipv6Addr =
            value.parse().map_err(|_| "malformed ip addr".to_string())?;
        let length: u8 =
            length.parse().map_err(|_| "malformed length".to_string())?;
        if length > Self::HOST_MASK {
            return Err(format!("prefix length {length} exceeds 128"));
        }
        Ok(Prefix6::new(value, length))
    }
}

/// An IP prefix of either family.
#[derive(
    Debug,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    JsonSchema,
)]
pub enum Prefix {
    V4(Prefix4),
    V6(Prefix6),
}

impl Prefix {
    pub fn length(&self) -> u8 {
        match self {
            Self::V4(p) => p.length,
            Self::V6(p) => p.length,
        }
    }

    pub fn addr(&self) -> IpAddr {
        match self {
            Self::V4(p) => p.value.into(),
            Self::V6(p) => p.value.into(),
        }
    }

    pub fn afi(&self) -> Afi {
        match self {
            Self::V4(_) => Afi::Ipv4,
            Self::V6(_) => Afi::Ipv6,
        }
    }

    /// The address bytes of the prefix without the leading length byte.
    pub fn wire_bytes(&self) -> Vec<u8> {
        match self {
            Self::V4(p) => p.to_wire()[1..].to_vec(),
            Self::V6(p) => p.to_wire()[1..].to_vec(),
        }
    }

    pub fn to_wire(&self) -> Vec<u8> {
        match self {
            Self::V4(p) => p.to_wire(),
            Self::V6(p) => p.to_wire(),
        }
    }

    /// Read a prefix of the given address family whose bit length has already
    /// been consumed from the input.
    pub fn from_bits(
        input: &[u8],
        afi: Afi,
        length: u8,
    ) -> Result<(&[u8], Prefix), Error> {
        match afi {
            Afi::Ipv4 => {
                let (input, p) = Prefix4::from_bits(input, length)?;
                Ok((input, Prefix::V4(p)))
            }
            Afi::Ipv6 => {
                let (input, p) = Prefix6::from_bits(input, length)?;
                Ok((input, Prefix::V6(p)))
            }
            Afi::L2vpn => Err(Error::UnsupportedAddressFamily(afi as u16, 0)),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(p) => p.fmt(f),
            Self::V6(p) => p.fmt(f),
        }
    }
}

impl FromStr for Prefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(p) = s.parse::<Prefix4>() {
            return Ok(Prefix::V4(p));
        }
        Ok(Prefix::V6(s.parse::<Prefix6>()?))
    }
}

impl From<Prefix4> for Prefix {
    fn from(p: Prefix4) -> Self {
        Self::V4(p)
    }
}

impl From<Prefix6> for Prefix {
    fn from(p: Prefix6) -> Self {
        Self::V6(p)
    }
}
