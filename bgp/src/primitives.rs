// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed width wire elements shared by the attribute and NLRI codecs.

use crate::error::Error;
use nom::{
    bytes::complete::take,
    number::complete::{be_u16, be_u24, be_u32, u8 as parse_u8},
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family identifiers understood by the codec.
///
/// Ref: IANA Address Family Numbers
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[repr(u16)]
pub enum Afi {
    Ipv4 = 1,
    Ipv6 = 2,
    L2vpn = 25,
}

/// Subsequent address family identifiers understood by the codec.
///
/// Ref: IANA SAFI namespace
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[repr(u8)]
pub enum Safi {
    /// RFC 4760
    Unicast = 1,
    Multicast = 2,

    /// RFC 8277
    MplsLabel = 4,

    /// RFC 6514
    Mvpn = 5,

    /// RFC 7432
    Evpn = 70,

    /// RFC 4364 / RFC 4659
    MplsVpn = 128,
}

/// The (AFI, SAFI) pair identifying a route table.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct AddressFamily {
    pub afi: Afi,
    pub safi: Safi,
}

impl AddressFamily {
    pub const IPV4_UNICAST: Self = Self::new(Afi::Ipv4, Safi::Unicast);
    pub const IPV6_UNICAST: Self = Self::new(Afi::Ipv6, Safi::Unicast);
    pub const IPV4_LABELED: Self = Self::new(Afi::Ipv4, Safi::MplsLabel);
    pub const IPV6_LABELED: Self = Self::new(Afi::Ipv6, Safi::MplsLabel);
    pub const IPV4_VPN: Self = Self::new(Afi::Ipv4, Safi::MplsVpn);
    pub const IPV6_VPN: Self = Self::new(Afi::Ipv6, Safi::MplsVpn);
    pub const IPV4_MVPN: Self = Self::new(Afi::Ipv4, Safi::Mvpn);
    pub const IPV6_MVPN: Self = Self::new(Afi::Ipv6, Safi::Mvpn);
    pub const L2VPN_EVPN: Self = Self::new(Afi::L2vpn, Safi::Evpn);

    pub const fn new(afi: Afi, safi: Safi) -> Self {
        Self { afi, safi }
    }

    /// Whether the NLRI codec knows how to handle this pair. EVPN is only
    /// defined under the L2VPN AFI and every other SAFI only under IPv4/IPv6.
    pub fn is_supported(&self) -> bool {
        match (self.afi, self.safi) {
            (Afi::L2vpn, Safi::Evpn) => true,
            (Afi::L2vpn, _) | (_, Safi::Evpn) => false,
            _ => true,
        }
    }

    pub fn to_wire(&self) -> [u8; 3] {
        let afi = u16::from(self.afi).to_be_bytes();
        [afi[0], afi[1], self.safi.into()]
    }

    pub fn from_wire(input: &[u8]) -> Result<(&[u8], AddressFamily), Error> {
        let (input, afi) = be_u16(input)?;
        let (input, safi) = parse_u8(input)?;
        let family = match (Afi::try_from(afi), Safi::try_from(safi)) {
            (Ok(afi), Ok(safi)) => AddressFamily { afi, safi },
            _ => return Err(Error::UnsupportedAddressFamily(afi, safi)),
        };
        if !family.is_supported() {
            return Err(Error::UnsupportedAddressFamily(afi, safi));
        }
        Ok((input, family))
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let afi = match self.afi {
            Afi::Ipv4 => "ipv4",
            Afi::Ipv6 => "ipv6",
            Afi::L2vpn => "l2vpn",
        };
        let safi = match self.safi {
            Safi::Unicast => "unicast",
            Safi::Multicast => "multicast",
            Safi::MplsLabel => "labeled-unicast",
            Safi::Mvpn => "mvpn",
            Safi::Evpn => "evpn",
            Safi::MplsVpn => "vpn",
        };
        write!(f, "{afi}-{safi}")
    }
}

/// Raw three byte label field announcing "no label" in withdrawn labeled
/// NLRI.
///
/// Ref: RFC 8277 §2.4
pub const WITHDRAW_LABEL: u32 = 0x800000;

const LABEL_BOTTOM_OF_STACK: u32 = 0x1;

/// Length of a single label stack entry on the wire.
pub const LABEL_WIRE_SIZE: usize = 3;

/// A 20 bit MPLS label value.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct MplsLabel(u32);

impl MplsLabel {
    pub const MAX: u32 = 0xFFFFF;

    pub fn new(value: u32) -> Result<Self, Error> {
        if value > Self::MAX {
            return Err(Error::InvalidLabel(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MplsLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of bytes a label stack occupies on the wire. An empty stack is
/// carried as the single withdraw label.
pub fn label_stack_wire_len(labels: &[MplsLabel]) -> usize {
    labels.len().max(1) * LABEL_WIRE_SIZE
}

/// Serialize a label stack, setting the bottom of stack bit on the last
/// entry. An empty stack serializes as [`WITHDRAW_LABEL`].
pub fn label_stack_to_wire(labels: &[MplsLabel]) -> Vec<u8> {
    if labels.is_empty() {
        return WITHDRAW_LABEL.to_be_bytes()[1..].to_vec();
    }
    let mut buf = Vec::with_capacity(labels.len() * LABEL_WIRE_SIZE);
    for (i, label) in labels.iter().enumerate() {
        let mut raw = label.value() << 4;
        if i == labels.len() - 1 {
            raw |= LABEL_BOTTOM_OF_STACK;
        }
        buf.extend_from_slice(&raw.to_be_bytes()[1..]);
    }
    buf
}

/// Parse label stack entries until one carries the bottom of stack bit. The
/// withdraw label terminates the stack and yields an empty stack.
pub fn label_stack_from_wire(
    mut input: &[u8],
) -> Result<(&[u8], Vec<MplsLabel>), Error> {
    let mut labels = Vec::new();
    loop {
        let (out, raw) = be_u24(input)?;
        input = out;
        if raw == WITHDRAW_LABEL {
            return Ok((input, Vec::new()));
        }
        labels.push(MplsLabel(raw >> 4));
        if raw & LABEL_BOTTOM_OF_STACK != 0 {
            return Ok((input, labels));
        }
    }
}

/// Route distinguisher type codes.
///
/// Ref: RFC 4364 §4.2
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive)]
#[repr(u16)]
pub enum RouteDistinguisherType {
    As2 = 0,
    Ipv4 = 1,
    As4 = 2,
}

/// An eight byte route distinguisher.
///
/// ```text
/// +-------+-------+-------+-------+-------+-------+-------+-------+
/// |     Type      |                  Value                        |
/// +-------+-------+-------+-------+-------+-------+-------+-------+
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum RouteDistinguisher {
    /// Two byte administrator ASN and a four byte assigned number.
    As2 { asn: u16, number: u32 },

    /// IPv4 administrator address and a two byte assigned number.
    Ipv4 { addr: Ipv4Addr, number: u16 },

    /// Four byte administrator ASN and a two byte assigned number.
    As4 { asn: u32, number: u16 },

    /// A type this implementation does not know. Kept so that the value can
    /// be carried and re-emitted unchanged.
    Unknown { typ: u16, value: [u8; 6] },
}

impl RouteDistinguisher {
    pub const WIRE_SIZE: usize = 8;

    pub fn to_wire(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        match self {
            Self::As2 { asn, number } => {
                buf[0..2].copy_from_slice(
                    &(RouteDistinguisherType::As2 as u16).to_be_bytes(),
                );
                buf[2..4].copy_from_slice(&asn.to_be_bytes());
                buf[4..8].copy_from_slice(&number.to_be_bytes());
            }
            Self::Ipv4 { addr, number } => {
                buf[0..2].copy_from_slice(
                    &(RouteDistinguisherType::Ipv4 as u16).to_be_bytes(),
                );
                buf[2..6].copy_from_slice(&addr.octets());
                buf[6..8].copy_from_slice(&number.to_be_bytes());
            }
            Self::As4 { asn, number } => {
                buf[0..2].copy_from_slice(
                    &(RouteDistinguisherType::As4 as u16).to_be_bytes(),
                );
                buf[2..6].copy_from_slice(&asn.to_be_bytes());
                buf[6..8].copy_from_slice(&number.to_be_bytes());
            }
            Self::Unknown { typ, value } => {
                buf[0..2].copy_from_slice(&typ.to_be_bytes());
                buf[2..8].copy_from_slice(value);
            }
        }
        buf
    }

    /// Decode a route distinguisher. Exactly eight bytes are consumed for
    /// every type, including types that are not recognized.
    pub fn from_wire(input: &[u8]) -> Result<(&[u8], RouteDistinguisher), Error> {
        let (input, rd) = take(Self::WIRE_SIZE)(input)?;
        let (value, typ) = be_u16(rd)?;
        let rd = match RouteDistinguisherType::try_from(typ) {
            Ok(RouteDistinguisherType::As2) => {
                let (v, asn) = be_u16(value)?;
                let (_, number) = be_u32(v)?;
                Self::As2 { asn, number }
            }
            Ok(RouteDistinguisherType::Ipv4) => {
                let (v, addr) = be_u32(value)?;
                let (_, number) = be_u16(v)?;
                Self::Ipv4 {
                    addr: Ipv4Addr::from(addr),
                    number,
                }
            }
            Ok(RouteDistinguisherType::As4) => {
                let (v, asn) = be_u32(value)?;
                let (_, number) = be_u16(v)?;
                Self::As4 { asn, number }
            }
            Err(_) => {
                let mut raw = [0u8; 6];
                raw.copy_from_slice(value);
                Self::Unknown { typ, value: raw }
            }
        };
        Ok((input, rd))
    }
}

impl fmt::Display for RouteDistinguisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::As2 { asn, number } => write!(f, "{asn}:{number}"),
            Self::Ipv4 { addr, number } => write!(f, "{addr}:{number}"),
            Self::As4 { asn, number } => write!(f, "{asn}:{number}"),
            Self::Unknown { typ, value } => {
                write!(f, "type{typ}:")?;
                for b in value {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// The next hop carried in a multiprotocol reachability attribute. The shape
/// is determined solely by the length of the next hop field.
///
/// Ref: RFC 4760 §3, RFC 2545 §3
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum BgpNexthop {
    Ipv4(Ipv4Addr),
    Ipv6Single(Ipv6Addr),
    /// Global and link-local addresses.
    Ipv6Double((Ipv6Addr, Ipv6Addr)),
}

impl BgpNexthop {
    /// The address used for reachability and IGP metric lookups.
    pub fn addr(&self) -> IpAddr {
        match self {
            Self::Ipv4(a) => (*a).into(),
            Self::Ipv6Single(a) => (*a).into(),
            Self::Ipv6Double((global, _)) => (*global).into(),
        }
    }

    /// Length of the next hop as carried for the given family.
    pub fn wire_len(&self, family: AddressFamily) -> usize {
        let base = match self {
            Self::Ipv4(_) => 4,
            Self::Ipv6Single(_) => 16,
            Self::Ipv6Double(_) => 32,
        };
        if family.safi != Safi::MplsVpn {
            return base;
        }
        match self {
            Self::Ipv6Double(_) => base + 2 * RouteDistinguisher::WIRE_SIZE,
            _ => base + RouteDistinguisher::WIRE_SIZE,
        }
    }

    pub fn to_wire(&self, family: AddressFamily) -> Vec<u8> {
        let vpn = family.safi == Safi::MplsVpn;
        let rd = [0u8; RouteDistinguisher::WIRE_SIZE];
        let mut buf = Vec::new();
        if vpn {
            buf.extend_from_slice(&rd);
        }
        match self {
            Self::Ipv4(a) => buf.extend_from_slice(&a.octets()),
            Self::Ipv6Single(a) => buf.extend_from_slice(&a.octets()),
            Self::Ipv6Double((global, link_local)) => {
                buf.extend_from_slice(&global.octets());
                if vpn {
                    buf.extend_from_slice(&rd);
                }
                buf.extend_from_slice(&link_local.octets());
            }
        }
        buf
    }

    /// Decode a next hop from the complete next hop field. VPN families carry
    /// a zero route distinguisher ahead of each address, which is discarded.
    pub fn from_wire(
        value: &[u8],
        family: AddressFamily,
    ) -> Result<BgpNexthop, Error> {
        let rd = RouteDistinguisher::WIRE_SIZE;
        if family.safi == Safi::MplsVpn {
            return match value.len() {
                12 | 24 => Self::from_addresses(&value[rd..]),
                48 => {
                    let mut buf = value[rd..rd + 16].to_vec();
                    buf.extend_from_slice(&value[2 * rd + 16..]);
                    Self::from_addresses(&buf)
                }
                n => Err(Error::InvalidNexthopLength(n)),
            };
        }
        Self::from_addresses(value)
    }

    fn from_addresses(value: &[u8]) -> Result<BgpNexthop, Error> {
        match value.len() {
            4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(value);
                Ok(Self::Ipv4(Ipv4Addr::from(octets)))
            }
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(value);
                Ok(Self::Ipv6Single(Ipv6Addr::from(octets)))
            }
            32 => {
                let mut global = [0u8; 16];
                let mut link_local = [0u8; 16];
                global.copy_from_slice(&value[..16]);
                link_local.copy_from_slice(&value[16..]);
                Ok(Self::Ipv6Double((
                    Ipv6Addr::from(global),
                    Ipv6Addr::from(link_local),
                )))
            }
            n => Err(Error::InvalidNexthopLength(n)),
        }
    }
}

impl fmt::Display for BgpNexthop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4(a) => write!(f, "{a}"),
            Self::Ipv6Single(a) => write!(f, "{a}"),
            Self::Ipv6Double((g, l)) => write!(f, "{g} ({l})"),
        }
    }
}

impl From<Ipv4Addr> for BgpNexthop {
    fn from(a: Ipv4Addr) -> Self {
        Self::Ipv4(a)
    }
}

impl From<Ipv6Addr> for BgpNexthop {
    fn from(a: Ipv6Addr) -> Self {
        Self::Ipv6Single(a)
    }
}

/// A ten byte ethernet segment identifier.
///
/// Ref: RFC 7432 §5
#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct EthernetSegmentId(pub [u8; 10]);

impl EthernetSegmentId {
    pub const WIRE_SIZE: usize = 10;

    pub fn from_wire(input: &[u8]) -> Result<(&[u8], Self), Error> {
        let (input, raw) = take(Self::WIRE_SIZE)(input)?;
        let mut esi = [0u8; 10];
        esi.copy_from_slice(raw);
        Ok((input, Self(esi)))
    }
}

impl fmt::Display for EthernetSegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> =
            self.0.iter().map(|b| format!("{b:02x}")).collect();
        write!(f, "{}", parts.join(":"))
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn from_wire(input: &[u8]) -> Result<(&[u8], Self), Error> {
        let (input, raw) = take(6usize)(input)?;
        let mut mac = [0u8; 6];
        mac.copy_from_slice(raw);
        Ok((input, Self(mac)))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Read an IP address whose length in bits precedes it, as used by EVPN and
/// MVPN route types. A zero length yields `None`.
pub fn ip_with_bit_length_from_wire(
    input: &[u8],
) -> Result<(&[u8], Option<IpAddr>), Error> {
    let (input, bits) = parse_u8(input)?;
    if bits % 8 != 0 {
        return Err(Error::InvalidAddressBitLength(bits));
    }
    ip_from_wire(input, usize::from(bits) / 8)
}

/// Read an IP address of the given byte length (0, 4 or 16).
pub fn ip_from_wire(
    input: &[u8],
    len: usize,
) -> Result<(&[u8], Option<IpAddr>), Error> {
    match len {
        0 => Ok((input, None)),
        4 => {
            let (input, v) = be_u32(input)?;
            Ok((input, Some(Ipv4Addr::from(v).into())))
        }
        16 => {
            let (input, raw) = take(16usize)(input)?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            Ok((input, Some(Ipv6Addr::from(octets).into())))
        }
        n => Err(Error::InvalidAddressLength(n)),
    }
}

pub fn ip_to_wire(addr: &IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(a) => a.octets().to_vec(),
        IpAddr::V6(a) => a.octets().to_vec(),
    }
}

pub fn ip_with_bit_length_to_wire(addr: Option<&IpAddr>) -> Vec<u8> {
    match addr {
        None => vec![0],
        Some(a) => {
            let raw = ip_to_wire(a);
            let mut buf = vec![(raw.len() * 8) as u8];
            buf.extend_from_slice(&raw);
            buf
        }
    }
}
