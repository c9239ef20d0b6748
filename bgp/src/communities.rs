// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use nom::{bytes::complete::take, number::complete::be_u32};
use num_enum::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// A standard community value. Well known values get their own variant and
/// everything else is carried as a raw 32 bit value.
///
/// Ref: RFC 1997, IANA BGP Well-known Communities
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    PartialOrd,
    Ord,
    FromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u32)]
pub enum Community {
    /// All routes received carrying a communities attribute
    /// containing this value must set the local preference for
    /// the received routes to a low value, preferably zero.
    GracefulShutdown = 0xFFFF0000,

    AcceptOwn = 0xFFFF0001,

    /// Long lived graceful restart stale route. Such routes are only
    /// selected when nothing else is available.
    LlgrStale = 0xFFFF0006,

    NoLlgr = 0xFFFF0007,

    Blackhole = 0xFFFF029A,

    /// All routes received carrying a communities attribute
    /// containing this value MUST NOT be advertised outside a BGP
    /// confederation boundary.
    NoExport = 0xFFFFFF01,

    /// All routes received carrying a communities attribute
    /// containing this value MUST NOT be advertised to other BGP
    /// peers.
    NoAdvertise = 0xFFFFFF02,

    /// All routes received carrying a communities attribute
    /// containing this value MUST NOT be advertised to external BGP
    /// peers (this includes peers in other members autonomous
    /// systems inside a BGP confederation).
    NoExportSubConfed = 0xFFFFFF03,

    NoPeer = 0xFFFFFF04,

    #[num_enum(catch_all)]
    Other(u32),
}

impl From<Community> for u32 {
    fn from(c: Community) -> u32 {
        match c {
            Community::GracefulShutdown => 0xFFFF0000,
            Community::AcceptOwn => 0xFFFF0001,
            Community::LlgrStale => 0xFFFF0006,
            Community::NoLlgr => 0xFFFF0007,
            Community::Blackhole => 0xFFFF029A,
            Community::NoExport => 0xFFFFFF01,
            Community::NoAdvertise => 0xFFFFFF02,
            Community::NoExportSubConfed => 0xFFFFFF03,
            Community::NoPeer => 0xFFFFFF04,
            Community::Other(x) => x,
        }
    }
}

impl Community {
    /// Build a community from the conventional `asn:value` halves.
    pub fn new(asn: u16, value: u16) -> Self {
        Self::from((u32::from(asn) << 16) | u32::from(value))
    }

    pub fn from_wire(input: &[u8]) -> Result<(&[u8], Community), Error> {
        let (input, v) = be_u32(input)?;
        Ok((input, Community::from(v)))
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Community::Other(x) => write!(f, "{}:{}", x >> 16, x & 0xffff),
            known => write!(f, "{known:?}"),
        }
    }
}

/// High order type bits for extended communities.
///
/// Ref: RFC 4360 §3, RFC 5668, RFC 7153
pub mod ext_community_type {
    pub const TWO_OCTET_AS: u8 = 0x00;
    pub const IPV4_ADDRESS: u8 = 0x01;
    pub const FOUR_OCTET_AS: u8 = 0x02;
    pub const OPAQUE: u8 = 0x03;

    /// Set when the community must not cross an AS boundary.
    pub const NON_TRANSITIVE: u8 = 0x40;

    pub const SUBTYPE_ROUTE_TARGET: u8 = 0x02;
    pub const SUBTYPE_ROUTE_ORIGIN: u8 = 0x03;
}

/// An eight byte extended community.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum ExtendedCommunity {
    TwoOctetAs {
        transitive: bool,
        subtype: u8,
        asn: u16,
        local: u32,
    },
    Ipv4Address {
        transitive: bool,
        subtype: u8,
        addr: Ipv4Addr,
        local: u16,
    },
    FourOctetAs {
        transitive: bool,
        subtype: u8,
        asn: u32,
        local: u16,
    },
    Opaque {
        transitive: bool,
        subtype: u8,
        value: [u8; 6],
    },
    /// A type that is not decoded, kept byte for byte.
    Unknown([u8; 8]),
}

impl ExtendedCommunity {
    pub fn route_target_as2(asn: u16, local: u32) -> Self {
        Self::TwoOctetAs {
            transitive: true,
            subtype: ext_community_type::SUBTYPE_ROUTE_TARGET,
            asn,
            local,
        }
    }

    pub fn route_target_as4(asn: u32, local: u16) -> Self {
        Self::FourOctetAs {
            transitive: true,
            subtype: ext_community_type::SUBTYPE_ROUTE_TARGET,
            asn,
            local,
        }
    }

    pub fn route_origin_ipv4(addr: Ipv4Addr, local: u16) -> Self {
        Self::Ipv4Address {
            transitive: true,
            subtype: ext_community_type::SUBTYPE_ROUTE_ORIGIN,
            addr,
            local,
        }
    }

    fn subtype(&self) -> Option<u8> {
        match self {
            Self::TwoOctetAs { subtype, .. }
            | Self::Ipv4Address { subtype, .. }
            | Self::FourOctetAs { subtype, .. }
            | Self::Opaque { subtype, .. } => Some(*subtype),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_route_target(&self) -> bool {
        self.subtype() == Some(ext_community_type::SUBTYPE_ROUTE_TARGET)
    }

    pub fn is_route_origin(&self) -> bool {
        self.subtype() == Some(ext_community_type::SUBTYPE_ROUTE_ORIGIN)
    }

    pub fn is_transitive(&self) -> bool {
        match self {
            Self::TwoOctetAs { transitive, .. }
            | Self::Ipv4Address { transitive, .. }
            | Self::FourOctetAs { transitive, .. }
            | Self::Opaque { transitive, .. } => *transitive,
            Self::Unknown(raw) => {
                raw[0] & ext_community_type::NON_TRANSITIVE == 0
            }
        }
    }

    pub fn to_wire(&self) -> [u8; 8] {
        fn high(typ: u8, transitive: bool) -> u8 {
            if transitive {
                typ
            } else {
                typ | ext_community_type::NON_TRANSITIVE
            }
        }
        let mut buf = [0u8; 8];
        match self {
            Self::TwoOctetAs {
                transitive,
                subtype,
                asn,
                local,
            } => {
                buf[0] = high(ext_community_type::TWO_OCTET_AS, *transitive);
                buf[1] = *subtype;
                buf[2..4].copy_from_slice(&asn.to_be_bytes());
                buf[4..8].copy_from_slice(&local.to_be_bytes());
            }
            Self::Ipv4Address {
                transitive,
                subtype,
                addr,
                local,
            } => {
                buf[0] = high(ext_community_type::IPV4_ADDRESS, *transitive);
                buf[1] = *subtype;
                buf[2..6].copy_from_slice(&addr.octets());
                buf[6..8].copy_from_slice(&local.to_be_bytes());
            }
            Self::FourOctetAs {
                transitive,
                subtype,
                asn,
                local,
            } => {
                buf[0] = high(ext_community_type::FOUR_OCTET_AS, *transitive);
                buf[1] = *subtype;
                buf[2..6].copy_from_slice(&asn.to_be_bytes());
                buf[6..8].copy_from_slice(&local.to_be_bytes());
            }
            Self::Opaque {
                transitive,
                subtype,
                value,
            } => {
                buf[0] = high(ext_community_type::OPAQUE, *transitive);
                buf[1] = *subtype;
                buf[2..8].copy_from_slice(value);
            }
            Self::Unknown(raw) => buf = *raw,
        }
        buf
    }

    pub fn from_wire(
        input: &[u8],
    ) -> Result<(&[u8], ExtendedCommunity), Error> {
        let (input, raw) = take(8usize)(input)?;
        let mut b = [0u8; 8];
        b.copy_from_slice(raw);

        let transitive = b[0] & ext_community_type::NON_TRANSITIVE == 0;
        let subtype = b[1];
        let ec = match b[0] & !ext_community_type::NON_TRANSITIVE {
            ext_community_type::TWO_OCTET_AS => Self::TwoOctetAs {
                transitive,
                subtype,
                asn: u16::from_be_bytes([b[2], b[3]]),
                local: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
            },
            ext_community_type::IPV4_ADDRESS => Self::Ipv4Address {
                transitive,
                subtype,
                addr: Ipv4Addr::new(b[2], b[3], b[4], b[5]),
                local: u16::from_be_bytes([b[6], b[7]]),
            },
            ext_community_type::FOUR_OCTET_AS => Self::FourOctetAs {
                transitive,
                subtype,
                asn: u32::from_be_bytes([b[2], b[3], b[4], b[5]]),
                local: u16::from_be_bytes([b[6], b[7]]),
            },
            ext_community_type::OPAQUE => {
                let mut value = [0u8; 6];
                value.copy_from_slice(&b[2..]);
                Self::Opaque {
                    transitive,
                    subtype,
                    value,
                }
            }
            _ => Self::Unknown(b),
        };
        Ok((input, ec))
    }
}

impl fmt::Display for ExtendedCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_route_target() {
            "rt"
        } else if self.is_route_origin() {
            "ro"
        } else {
            "ext"
        };
        match self {
            Self::TwoOctetAs { asn, local, .. } => {
                write!(f, "{kind}:{asn}:{local}")
            }
            Self::Ipv4Address { addr, local, .. } => {
                write!(f, "{kind}:{addr}:{local}")
            }
            Self::FourOctetAs { asn, local, .. } => {
                write!(f, "{kind}:{asn}:{local}")
            }
            Self::Opaque { subtype, value, .. } => {
                write!(f, "opaque:{subtype}:{value:02x?}")
            }
            Self::Unknown(raw) => write!(f, "unknown:{raw:02x?}"),
        }
    }
}
