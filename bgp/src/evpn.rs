// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EVPN route types carried under L2VPN/EVPN.
//!
//! ```text
//! +-----------------------------------+
//! |    Route Type (1 octet)           |
//! +-----------------------------------+
//! |     Length (1 octet)              |
//! +-----------------------------------+
//! | Route Type specific (variable)    |
//! +-----------------------------------+
//! ```
//!
//! Ref: RFC 7432 §7, RFC 9136 §3

use crate::error::Error;
use crate::prefix::{Prefix, Prefix4, Prefix6};
use crate::primitives::{
    ip_from_wire, ip_to_wire, ip_with_bit_length_from_wire,
    ip_with_bit_length_to_wire, EthernetSegmentId, MacAddress,
    RouteDistinguisher,
};
use nom::{
    bytes::complete::take,
    number::complete::{be_u24, be_u32, u8 as parse_u8},
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EvpnRouteType {
    EthernetAutoDiscovery = 1,
    MacIpAdvertisement = 2,
    InclusiveMulticast = 3,
    EthernetSegment = 4,
    IpPrefix = 5,
}

const MAC_BITS: u8 = 48;

#[derive(
    Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EvpnRoute {
    EthernetAutoDiscovery {
        rd: RouteDistinguisher,
        esi: EthernetSegmentId,
        ethernet_tag: u32,
        label: u32,
    },
    MacIpAdvertisement {
        rd: RouteDistinguisher,
        esi: EthernetSegmentId,
        ethernet_tag: u32,
        mac: MacAddress,
        ip: Option<IpAddr>,
        label: u32,
        label2: Option<u32>,
    },
    InclusiveMulticast {
        rd: RouteDistinguisher,
        ethernet_tag: u32,
        originator: IpAddr,
    },
    EthernetSegment {
        rd: RouteDistinguisher,
        esi: EthernetSegmentId,
        originator: IpAddr,
    },
    IpPrefix {
        rd: RouteDistinguisher,
        esi: EthernetSegmentId,
        ethernet_tag: u32,
        prefix: Prefix,
        gateway: IpAddr,
        label: u32,
    },
    /// A route type without a decoder, carried verbatim.
    Opaque { route_type: u8, value: Vec<u8> },
}

impl EvpnRoute {
    pub fn route_type(&self) -> u8 {
        match self {
            Self::EthernetAutoDiscovery { .. } => {
                EvpnRouteType::EthernetAutoDiscovery.into()
            }
            Self::MacIpAdvertisement { .. } => {
                EvpnRouteType::MacIpAdvertisement.into()
            }
            Self::InclusiveMulticast { .. } => {
                EvpnRouteType::InclusiveMulticast.into()
            }
            Self::EthernetSegment { .. } => EvpnRouteType::EthernetSegment.into(),
            Self::IpPrefix { .. } => EvpnRouteType::IpPrefix.into(),
            Self::Opaque { route_type, .. } => *route_type,
        }
    }

    pub fn rd(&self) -> Option<RouteDistinguisher> {
        match self {
            Self::EthernetAutoDiscovery { rd, .. }
            | Self::MacIpAdvertisement { rd, .. }
            | Self::InclusiveMulticast { rd, .. }
            | Self::EthernetSegment { rd, .. }
            | Self::IpPrefix { rd, .. } => Some(*rd),
            Self::Opaque { .. } => None,
        }
    }

    /// The same route with label fields zeroed. Labels are not part of a
    /// route's identity, so withdrawals and route keys use this form.
    pub fn without_labels(&self) -> EvpnRoute {
        let mut route = self.clone();
        match &mut route {
            Self::EthernetAutoDiscovery { label, .. }
            | Self::IpPrefix { label, .. } => *label = 0,
            Self::MacIpAdvertisement { label, label2, .. } => {
                *label = 0;
                *label2 = None;
            }
            _ => {}
        }
        route
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        match self {
            Self::EthernetAutoDiscovery {
                rd,
                esi,
                ethernet_tag,
                label,
            } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&esi.0);
                body.extend_from_slice(&ethernet_tag.to_be_bytes());
                body.extend_from_slice(&label_to_wire(*label));
            }
            Self::MacIpAdvertisement {
                rd,
                esi,
                ethernet_tag,
                mac,
                ip,
                label,
                label2,
            } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&esi.0);
                body.extend_from_slice(&ethernet_tag.to_be_bytes());
                body.push(MAC_BITS);
                body.extend_from_slice(&mac.0);
                body.extend_from_slice(&ip_with_bit_length_to_wire(ip.as_ref()));
                body.extend_from_slice(&label_to_wire(*label));
                if let Some(l) = label2 {
                    body.extend_from_slice(&label_to_wire(*l));
                }
            }
            Self::InclusiveMulticast {
                rd,
                ethernet_tag,
                originator,
            } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&ethernet_tag.to_be_bytes());
                body.extend_from_slice(&ip_with_bit_length_to_wire(Some(
                    originator,
                )));
            }
            Self::EthernetSegment {
                rd,
                esi,
                originator,
            } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&esi.0);
                body.extend_from_slice(&ip_with_bit_length_to_wire(Some(
                    originator,
                )));
            }
            Self::IpPrefix {
                rd,
                esi,
                ethernet_tag,
                prefix,
                gateway,
                label,
            } => {
                if prefix.afi() != afi_of(gateway) {
                    return Err(Error::InvalidRouteLength {
                        route_type: "evpn ip prefix".into(),
                        length: 0,
                    });
                }
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&esi.0);
                body.extend_from_slice(&ethernet_tag.to_be_bytes());
                body.push(prefix.length());
                body.extend_from_slice(&ip_to_wire(&prefix.addr()));
                body.extend_from_slice(&ip_to_wire(gateway));
                body.extend_from_slice(&label_to_wire(*label));
            }
            Self::Opaque { value, .. } => body.extend_from_slice(value),
        }
        if body.len() > u8::MAX as usize {
            return Err(Error::TooLarge("evpn route".into()));
        }
        let mut buf = vec![self.route_type(), body.len() as u8];
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    pub fn from_wire(input: &[u8]) -> Result<(&[u8], EvpnRoute), Error> {
        let (input, route_type) = parse_u8(input)?;
        let (input, len) = parse_u8(input)?;
        let (input, body) = take(len)(input)?;

        let route = match EvpnRouteType::try_from(route_type) {
            Ok(typ) => Self::body_from_wire(typ, body)?,
            Err(_) => Self::Opaque {
                route_type,
                value: body.to_vec(),
            },
        };
        Ok((input, route))
    }

    fn body_from_wire(
        typ: EvpnRouteType,
        body: &[u8],
    ) -> Result<EvpnRoute, Error> {
        let invalid = || Error::InvalidRouteLength {
            route_type: format!("evpn {typ:?}"),
            length: body.len(),
        };

        let (input, rd) = RouteDistinguisher::from_wire(body)?;
        let (rest, route) = match typ {
            EvpnRouteType::EthernetAutoDiscovery => {
                let (input, esi) = EthernetSegmentId::from_wire(input)?;
                let (input, ethernet_tag) = be_u32(input)?;
                let (input, label) = be_u24(input)?;
                (
                    input,
                    Self::EthernetAutoDiscovery {
                        rd,
                        esi,
                        ethernet_tag,
                        label,
                    },
                )
            }
            EvpnRouteType::MacIpAdvertisement => {
                let (input, esi) = EthernetSegmentId::from_wire(input)?;
                let (input, ethernet_tag) = be_u32(input)?;
                let (input, mac_bits) = parse_u8(input)?;
                if mac_bits != MAC_BITS {
                    return Err(invalid());
                }
                let (input, mac) = MacAddress::from_wire(input)?;
                let (input, ip) = ip_with_bit_length_from_wire(input)?;
                let (input, label) = be_u24(input)?;
                let (input, label2) = if input.is_empty() {
                    (input, None)
                } else {
                    let (input, l) = be_u24(input)?;
                    (input, Some(l))
                };
                (
                    input,
                    Self::MacIpAdvertisement {
                        rd,
                        esi,
                        ethernet_tag,
                        mac,
                        ip,
                        label,
                        label2,
                    },
                )
            }
            EvpnRouteType::InclusiveMulticast => {
                let (input, ethernet_tag) = be_u32(input)?;
                let (input, originator) = ip_with_bit_length_from_wire(input)?;
                (
                    input,
                    Self::InclusiveMulticast {
                        rd,
                        ethernet_tag,
                        originator: originator.ok_or_else(invalid)?,
                    },
                )
            }
            EvpnRouteType::EthernetSegment => {
                let (input, esi) = EthernetSegmentId::from_wire(input)?;
                let (input, originator) = ip_with_bit_length_from_wire(input)?;
                (
                    input,
                    Self::EthernetSegment {
                        rd,
                        esi,
                        originator: originator.ok_or_else(invalid)?,
                    },
                )
            }
            EvpnRouteType::IpPrefix => {
                // The address width follows from the total length: 34 bytes
                // for IPv4 and 58 bytes for IPv6.
                let width = match body.len() {
                    34 => 4,
                    58 => 16,
                    _ => return Err(invalid()),
                };
                let (input, esi) = EthernetSegmentId::from_wire(input)?;
                let (input, ethernet_tag) = be_u32(input)?;
                let (input, length) = parse_u8(input)?;
                let (input, addr) = ip_from_wire(input, width)?;
                let (input, gateway) = ip_from_wire(input, width)?;
                let (input, label) = be_u24(input)?;
                let prefix = match addr.ok_or_else(invalid)? {
                    IpAddr::V4(a) => {
                        if length > Prefix4::HOST_MASK {
                            return Err(Error::InvalidPrefixLength(
                                length,
                                Prefix4::HOST_MASK,
                            ));
                        }
                        Prefix::V4(Prefix4::new(a, length))
                    }
                    IpAddr::V6(a) => {
                        if length > Prefix6::HOST_MASK {
                            return Err(Error::InvalidPrefixLength(
                                length,
                                Prefix6::HOST_MASK,
                            ));
                        }
                        Prefix::V6(Prefix6::new(a, length))
                    }
                };
                (
                    input,
                    Self::IpPrefix {
                        rd,
                        esi,
                        ethernet_tag,
                        prefix,
                        gateway: gateway.ok_or_else(invalid)?,
                        label,
                    },
                )
            }
        };
        if !rest.is_empty() {
            return Err(invalid());
        }
        Ok(route)
    }
}

fn label_to_wire(label: u32) -> [u8; 3] {
    let b = label.to_be_bytes();
    [b[1], b[2], b[3]]
}

fn afi_of(addr: &IpAddr) -> crate::primitives::Afi {
    match addr {
        IpAddr::V4(_) => crate::primitives::Afi::Ipv4,
        IpAddr::V6(_) => crate::primitives::Afi::Ipv6,
    }
}

impl fmt::Display for EvpnRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EthernetAutoDiscovery {
                rd,
                esi,
                ethernet_tag,
                ..
            } => write!(f, "[1]:[{rd}]:[{esi}]:[{ethernet_tag}]"),
            Self::MacIpAdvertisement {
                rd,
                ethernet_tag,
                mac,
                ip,
                ..
            } => match ip {
                Some(ip) => write!(f, "[2]:[{rd}]:[{ethernet_tag}]:[{mac}]:[{ip}]"),
                None => write!(f, "[2]:[{rd}]:[{ethernet_tag}]:[{mac}]"),
            },
            Self::InclusiveMulticast {
                rd,
                ethernet_tag,
                originator,
            } => write!(f, "[3]:[{rd}]:[{ethernet_tag}]:[{originator}]"),
            Self::EthernetSegment {
                rd,
                esi,
                originator,
            } => write!(f, "[4]:[{rd}]:[{esi}]:[{originator}]"),
            Self::IpPrefix {
                rd,
                ethernet_tag,
                prefix,
                ..
            } => write!(f, "[5]:[{rd}]:[{ethernet_tag}]:[{prefix}]"),
            Self::Opaque { route_type, value } => {
                write!(f, "[{route_type}]:{} bytes", value.len())
            }
        }
    }
}
