// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reachability information for each supported address family.
//!
//! NLRI carry no count. Decoders consume the buffer they are handed until it
//! is empty, so callers slice the enclosing attribute or message section to
//! its declared length first.

use crate::error::Error;
use crate::evpn::EvpnRoute;
use crate::mvpn::MvpnRoute;
use crate::prefix::{Prefix, Prefix4, Prefix6};
use crate::primitives::{
    label_stack_from_wire, label_stack_to_wire, label_stack_wire_len,
    AddressFamily, Afi, MplsLabel, RouteDistinguisher, Safi,
};
use nom::number::complete::{be_u32, u8 as parse_u8};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A destination in the shape dictated by its address family.
#[derive(
    Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Destination {
    /// Unicast and multicast SAFIs.
    Unicast(Prefix),

    /// RFC 8277
    Labeled {
        labels: Vec<MplsLabel>,
        prefix: Prefix,
    },

    /// RFC 4364, RFC 4659
    Vpn {
        labels: Vec<MplsLabel>,
        rd: RouteDistinguisher,
        prefix: Prefix,
    },

    Evpn(EvpnRoute),

    Mvpn(MvpnRoute),
}

impl Destination {
    /// Encode the destination. Withdrawals carry the withdraw label in place
    /// of any label stack and EVPN label fields are zeroed.
    pub fn to_wire(&self, withdraw: bool) -> Result<Vec<u8>, Error> {
        match self {
            Self::Unicast(p) => Ok(p.to_wire()),
            Self::Labeled { labels, prefix } => {
                Self::labeled_to_wire(labels, None, prefix, withdraw)
            }
            Self::Vpn { labels, rd, prefix } => {
                Self::labeled_to_wire(labels, Some(rd), prefix, withdraw)
            }
            Self::Evpn(r) if withdraw => r.without_labels().to_wire(),
            Self::Evpn(r) => r.to_wire(),
            Self::Mvpn(r) => r.to_wire(),
        }
    }

    fn labeled_to_wire(
        labels: &[MplsLabel],
        rd: Option<&RouteDistinguisher>,
        prefix: &Prefix,
        withdraw: bool,
    ) -> Result<Vec<u8>, Error> {
        let labels = if withdraw {
            label_stack_to_wire(&[])
        } else {
            label_stack_to_wire(labels)
        };
        let rd_bits = if rd.is_some() {
            RouteDistinguisher::WIRE_SIZE * 8
        } else {
            0
        };
        let bits = labels.len() * 8 + rd_bits + usize::from(prefix.length());
        let bits = u8::try_from(bits)
            .map_err(|_| Error::TooLarge("labeled nlri".into()))?;

        let mut buf = vec![bits];
        buf.extend_from_slice(&labels);
        if let Some(rd) = rd {
            buf.extend_from_slice(&rd.to_wire());
        }
        buf.extend_from_slice(&prefix.wire_bytes());
        Ok(buf)
    }

    fn from_wire(
        input: &[u8],
        family: AddressFamily,
    ) -> Result<(&[u8], Destination), Error> {
        match family.safi {
            Safi::Unicast | Safi::Multicast => {
                let (input, length) = parse_u8(input)?;
                let (input, prefix) =
                    Prefix::from_bits(input, family.afi, length)?;
                Ok((input, Self::Unicast(prefix)))
            }
            Safi::MplsLabel => {
                let (input, length) = parse_u8(input)?;
                let (input, labels) = label_stack_from_wire(input)?;
                let bits = Self::remaining_bits(length, &labels, 0)?;
                let (input, prefix) =
                    Prefix::from_bits(input, family.afi, bits)?;
                Ok((input, Self::Labeled { labels, prefix }))
            }
            Safi::MplsVpn => {
                let (input, length) = parse_u8(input)?;
                let (input, labels) = label_stack_from_wire(input)?;
                let bits = Self::remaining_bits(
                    length,
                    &labels,
                    RouteDistinguisher::WIRE_SIZE * 8,
                )?;
                let (input, rd) = RouteDistinguisher::from_wire(input)?;
                let (input, prefix) =
                    Prefix::from_bits(input, family.afi, bits)?;
                Ok((input, Self::Vpn { labels, rd, prefix }))
            }
            Safi::Evpn => {
                let (input, route) = EvpnRoute::from_wire(input)?;
                Ok((input, Self::Evpn(route)))
            }
            Safi::Mvpn => {
                let (input, route) = MvpnRoute::from_wire(input)?;
                Ok((input, Self::Mvpn(route)))
            }
        }
    }

    /// Bits left for the prefix once the label stack (the withdraw label
    /// counts as one entry) and any route distinguisher are accounted for.
    fn remaining_bits(
        length: u8,
        labels: &[MplsLabel],
        extra_bits: usize,
    ) -> Result<u8, Error> {
        let used = label_stack_wire_len(labels) * 8 + extra_bits;
        usize::from(length)
            .checked_sub(used)
            .and_then(|b| u8::try_from(b).ok())
            .ok_or(Error::InvalidLabeledLength)
    }

    /// Storage key for this destination. Announcements and withdrawals of
    /// the same destination always produce the same key.
    pub fn route_key(&self) -> Result<RouteKey, Error> {
        Ok(RouteKey(self.to_wire(true)?))
    }

    /// The destination as it is stored: labels are dropped from labeled
    /// and VPN destinations, EVPN label fields are zeroed.
    pub fn canonical(&self) -> Destination {
        match self {
            Self::Labeled { prefix, .. } => Self::Labeled {
                labels: Vec::new(),
                prefix: *prefix,
            },
            Self::Vpn { rd, prefix, .. } => Self::Vpn {
                labels: Vec::new(),
                rd: *rd,
                prefix: *prefix,
            },
            Self::Evpn(r) => Self::Evpn(r.without_labels()),
            other => other.clone(),
        }
    }

    pub fn labels(&self) -> &[MplsLabel] {
        match self {
            Self::Labeled { labels, .. } | Self::Vpn { labels, .. } => labels,
            _ => &[],
        }
    }

    /// Whether this destination has the shape used by `family`.
    pub fn matches_family(&self, family: AddressFamily) -> bool {
        match (self, family.safi) {
            (Self::Unicast(p), Safi::Unicast | Safi::Multicast)
            | (Self::Labeled { prefix: p, .. }, Safi::MplsLabel)
            | (Self::Vpn { prefix: p, .. }, Safi::MplsVpn) => {
                p.afi() == family.afi
            }
            (Self::Evpn(_), Safi::Evpn) => family.afi == Afi::L2vpn,
            (Self::Mvpn(_), Safi::Mvpn) => family.afi != Afi::L2vpn,
            _ => false,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicast(p) => write!(f, "{p}"),
            Self::Labeled { labels, prefix } => {
                write!(f, "{prefix} labels {labels:?}")
            }
            Self::Vpn { labels, rd, prefix } => {
                write!(f, "{rd}:{prefix} labels {labels:?}")
            }
            Self::Evpn(r) => write!(f, "{r}"),
            Self::Mvpn(r) => write!(f, "{r}"),
        }
    }
}

impl From<Prefix4> for Destination {
    fn from(p: Prefix4) -> Self {
        Self::Unicast(p.into())
    }
}

impl From<Prefix6> for Destination {
    fn from(p: Prefix6) -> Self {
        Self::Unicast(p.into())
    }
}

/// A destination with the path identifier it was received or is sent with.
///
/// Ref: RFC 7911 §3
#[derive(
    Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Nlri {
    pub path_id: Option<u32>,
    pub destination: Destination,
}

impl Nlri {
    pub fn new(destination: Destination) -> Self {
        Self {
            path_id: None,
            destination,
        }
    }

    pub fn with_path_id(destination: Destination, path_id: u32) -> Self {
        Self {
            path_id: Some(path_id),
            destination,
        }
    }
}

impl From<Destination> for Nlri {
    fn from(destination: Destination) -> Self {
        Self::new(destination)
    }
}

impl fmt::Display for Nlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path_id {
            Some(id) => write!(f, "{} path-id {id}", self.destination),
            None => write!(f, "{}", self.destination),
        }
    }
}

/// Canonical byte encoding of a destination, used as the key of route
/// tables.
#[derive(
    Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RouteKey(pub Vec<u8>);

impl RouteKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The key qualified by a local path identifier, as advertised to peers
    /// that negotiated Add-Path.
    pub fn with_path_id(&self, path_id: u32) -> AddPathKey {
        let mut buf = path_id.to_be_bytes().to_vec();
        buf.extend_from_slice(&self.0);
        AddPathKey(buf)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// A [`RouteKey`] prefixed with a four byte path identifier.
#[derive(
    Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AddPathKey(pub Vec<u8>);

impl AddPathKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Per address family NLRI encoding and decoding.
pub struct NlriCodec;

impl NlriCodec {
    pub fn decode_reachable(
        input: &[u8],
        family: AddressFamily,
        path_ids: bool,
    ) -> Result<Vec<Nlri>, Error> {
        Self::decode(input, family, path_ids)
    }

    /// Decode withdrawn NLRI. Label values in withdrawals carry no meaning
    /// so the decoded destinations are in canonical form.
    pub fn decode_unreachable(
        input: &[u8],
        family: AddressFamily,
        path_ids: bool,
    ) -> Result<Vec<Nlri>, Error> {
        let mut nlri = Self::decode(input, family, path_ids)?;
        for n in nlri.iter_mut() {
            n.destination = n.destination.canonical();
        }
        Ok(nlri)
    }

    pub fn encode_reachable(
        nlri: &[Nlri],
        family: AddressFamily,
        path_ids: bool,
    ) -> Result<Vec<u8>, Error> {
        Self::encode(nlri, family, path_ids, false)
    }

    pub fn encode_unreachable(
        nlri: &[Nlri],
        family: AddressFamily,
        path_ids: bool,
    ) -> Result<Vec<u8>, Error> {
        Self::encode(nlri, family, path_ids, true)
    }

    fn decode(
        mut input: &[u8],
        family: AddressFamily,
        path_ids: bool,
    ) -> Result<Vec<Nlri>, Error> {
        if !family.is_supported() {
            return Err(Error::UnsupportedAddressFamily(
                family.afi.into(),
                family.safi.into(),
            ));
        }
        let mut result = Vec::new();
        while !input.is_empty() {
            let path_id = if path_ids {
                let (out, id) = be_u32(input)?;
                input = out;
                Some(id)
            } else {
                None
            };
            let (out, destination) = Destination::from_wire(input, family)?;
            result.push(Nlri {
                path_id,
                destination,
            });
            input = out;
        }
        Ok(result)
    }

    fn encode(
        nlri: &[Nlri],
        family: AddressFamily,
        path_ids: bool,
        withdraw: bool,
    ) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        for n in nlri {
            if !n.destination.matches_family(family) {
                return Err(Error::UnsupportedAddressFamily(
                    family.afi.into(),
                    family.safi.into(),
                ));
            }
            if path_ids {
                buf.extend_from_slice(&n.path_id.unwrap_or(0).to_be_bytes());
            }
            buf.extend_from_slice(&n.destination.to_wire(withdraw)?);
        }
        Ok(buf)
    }
}
