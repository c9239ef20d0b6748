// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multicast VPN route types.
//!
//! Ref: RFC 6514 §4

use crate::error::Error;
use crate::primitives::{
    ip_from_wire, ip_to_wire, ip_with_bit_length_from_wire,
    ip_with_bit_length_to_wire, RouteDistinguisher,
};
use nom::{
    bytes::complete::take,
    number::complete::{be_u32, u8 as parse_u8},
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum MvpnRouteType {
    IntraAsIpmsiAd = 1,
    InterAsIpmsiAd = 2,
    SpmsiAd = 3,
    LeafAd = 4,
    SourceActiveAd = 5,
    SharedTreeJoin = 6,
    SourceTreeJoin = 7,
}

/// The customer multicast flow carried by C-multicast routes. A `None`
/// source or group is the wildcard.
#[derive(
    Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CMulticast {
    pub rd: RouteDistinguisher,
    pub source_as: u32,
    pub source: Option<IpAddr>,
    pub group: Option<IpAddr>,
}

#[derive(
    Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MvpnRoute {
    IntraAsIpmsiAd {
        rd: RouteDistinguisher,
        originator: IpAddr,
    },
    InterAsIpmsiAd {
        rd: RouteDistinguisher,
        source_as: u32,
    },
    SpmsiAd {
        rd: RouteDistinguisher,
        source: Option<IpAddr>,
        group: Option<IpAddr>,
        originator: IpAddr,
    },
    /// The route key is the NLRI of the route that triggered the leaf A-D
    /// route and is kept in wire form.
    LeafAd {
        route_key: Vec<u8>,
        originator: IpAddr,
    },
    SourceActiveAd {
        rd: RouteDistinguisher,
        source: Option<IpAddr>,
        group: Option<IpAddr>,
    },
    SharedTreeJoin(CMulticast),
    SourceTreeJoin(CMulticast),
    Opaque {
        route_type: u8,
        value: Vec<u8>,
    },
}

impl MvpnRoute {
    pub fn route_type(&self) -> u8 {
        let typ = match self {
            Self::IntraAsIpmsiAd { .. } => MvpnRouteType::IntraAsIpmsiAd,
            Self::InterAsIpmsiAd { .. } => MvpnRouteType::InterAsIpmsiAd,
            Self::SpmsiAd { .. } => MvpnRouteType::SpmsiAd,
            Self::LeafAd { .. } => MvpnRouteType::LeafAd,
            Self::SourceActiveAd { .. } => MvpnRouteType::SourceActiveAd,
            Self::SharedTreeJoin(_) => MvpnRouteType::SharedTreeJoin,
            Self::SourceTreeJoin(_) => MvpnRouteType::SourceTreeJoin,
            Self::Opaque { route_type, .. } => return *route_type,
        };
        typ.into()
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        match self {
            Self::IntraAsIpmsiAd { rd, originator } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&ip_to_wire(originator));
            }
            Self::InterAsIpmsiAd { rd, source_as } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&source_as.to_be_bytes());
            }
            Self::SpmsiAd {
                rd,
                source,
                group,
                originator,
            } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&ip_with_bit_length_to_wire(
                    source.as_ref(),
                ));
                body.extend_from_slice(&ip_with_bit_length_to_wire(
                    group.as_ref(),
                ));
                body.extend_from_slice(&ip_to_wire(originator));
            }
            Self::LeafAd {
                route_key,
                originator,
            } => {
                body.extend_from_slice(route_key);
                body.extend_from_slice(&ip_to_wire(originator));
            }
            Self::SourceActiveAd { rd, source, group } => {
                body.extend_from_slice(&rd.to_wire());
                body.extend_from_slice(&ip_with_bit_length_to_wire(
                    source.as_ref(),
                ));
                body.extend_from_slice(&ip_with_bit_length_to_wire(
                    group.as_ref(),
                ));
            }
            Self::SharedTreeJoin(c) | Self::SourceTreeJoin(c) => {
                body.extend_from_slice(&c.rd.to_wire());
                body.extend_from_slice(&c.source_as.to_be_bytes());
                body.extend_from_slice(&ip_with_bit_length_to_wire(
                    c.source.as_ref(),
                ));
                body.extend_from_slice(&ip_with_bit_length_to_wire(
                    c.group.as_ref(),
                ));
            }
            Self::Opaque { value, .. } => body.extend_from_slice(value),
        }
        if body.len() > u8::MAX as usize {
            return Err(Error::TooLarge("mvpn route".into()));
        }
        let mut buf = vec![self.route_type(), body.len() as u8];
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    pub fn from_wire(input: &[u8]) -> Result<(&[u8], MvpnRoute), Error> {
        let (input, route_type) = parse_u8(input)?;
        let (input, len) = parse_u8(input)?;
        let (input, body) = take(len)(input)?;
        let route = match MvpnRouteType::try_from(route_type) {
            Ok(typ) => Self::body_from_wire(typ, body)?,
            Err(_) => Self::Opaque {
                route_type,
                value: body.to_vec(),
            },
        };
        Ok((input, route))
    }

    fn body_from_wire(
        typ: MvpnRouteType,
        body: &[u8],
    ) -> Result<MvpnRoute, Error> {
        let invalid = || Error::InvalidRouteLength {
            route_type: format!("mvpn {typ:?}"),
            length: body.len(),
        };
        // Originating router addresses fill the remainder of the route.
        let originator = |input: &[u8]| -> Result<IpAddr, Error> {
            ip_from_wire(input, input.len())?.1.ok_or_else(invalid)
        };

        let route = match typ {
            MvpnRouteType::IntraAsIpmsiAd => {
                let (input, rd) = RouteDistinguisher::from_wire(body)?;
                Self::IntraAsIpmsiAd {
                    rd,
                    originator: originator(input)?,
                }
            }
            MvpnRouteType::InterAsIpmsiAd => {
                let (input, rd) = RouteDistinguisher::from_wire(body)?;
                let (input, source_as) = be_u32(input)?;
                if !input.is_empty() {
                    return Err(invalid());
                }
                Self::InterAsIpmsiAd { rd, source_as }
            }
            MvpnRouteType::SpmsiAd => {
                let (input, rd) = RouteDistinguisher::from_wire(body)?;
                let (input, source) = ip_with_bit_length_from_wire(input)?;
                let (input, group) = ip_with_bit_length_from_wire(input)?;
                Self::SpmsiAd {
                    rd,
                    source,
                    group,
                    originator: originator(input)?,
                }
            }
            MvpnRouteType::LeafAd => {
                let key_len = match body.get(1) {
                    Some(len) => 2 + usize::from(*len),
                    None => return Err(invalid()),
                };
                if key_len > body.len() {
                    return Err(invalid());
                }
                let (route_key, input) = body.split_at(key_len);
                Self::LeafAd {
                    route_key: route_key.to_vec(),
                    originator: originator(input)?,
                }
            }
            MvpnRouteType::SourceActiveAd => {
                let (input, rd) = RouteDistinguisher::from_wire(body)?;
                let (input, source) = ip_with_bit_length_from_wire(input)?;
                let (input, group) = ip_with_bit_length_from_wire(input)?;
                if !input.is_empty() {
                    return Err(invalid());
                }
                Self::SourceActiveAd { rd, source, group }
            }
            MvpnRouteType::SharedTreeJoin | MvpnRouteType::SourceTreeJoin => {
                let (input, rd) = RouteDistinguisher::from_wire(body)?;
                let (input, source_as) = be_u32(input)?;
                let (input, source) = ip_with_bit_length_from_wire(input)?;
                let (input, group) = ip_with_bit_length_from_wire(input)?;
                if !input.is_empty() {
                    return Err(invalid());
                }
                let c = CMulticast {
                    rd,
                    source_as,
                    source,
                    group,
                };
                if typ == MvpnRouteType::SharedTreeJoin {
                    Self::SharedTreeJoin(c)
                } else {
                    Self::SourceTreeJoin(c)
                }
            }
        };
        Ok(route)
    }
}

impl fmt::Display for MvpnRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn wild(a: &Option<IpAddr>) -> String {
            a.map(|a| a.to_string()).unwrap_or_else(|| "*".into())
        }
        match self {
            Self::IntraAsIpmsiAd { rd, originator } => {
                write!(f, "[1]:[{rd}]:[{originator}]")
            }
            Self::InterAsIpmsiAd { rd, source_as } => {
                write!(f, "[2]:[{rd}]:[{source_as}]")
            }
            Self::SpmsiAd {
                rd,
                source,
                group,
                originator,
            } => write!(
                f,
                "[3]:[{rd}]:[{},{}]:[{originator}]",
                wild(source),
                wild(group)
            ),
            Self::LeafAd { originator, .. } => write!(f, "[4]:[{originator}]"),
            Self::SourceActiveAd { rd, source, group } => {
                write!(f, "[5]:[{rd}]:[{},{}]", wild(source), wild(group))
            }
            Self::SharedTreeJoin(c) | Self::SourceTreeJoin(c) => write!(
                f,
                "[{}]:[{}]:[{}]:[{},{}]",
                self.route_type(),
                c.rd,
                c.source_as,
                wild(&c.source),
                wild(&c.group)
            ),
            Self::Opaque { route_type, value } => {
                write!(f, "[{route_type}]:{} bytes", value.len())
            }
        }
    }
}
