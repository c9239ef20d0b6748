// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UPDATE message bodies.
//!
//! [`UpdateCodec::decode`] turns a received body into a [`RouteUpdate`],
//! applying the revised error handling rules so that a malformed optional
//! attribute withdraws the affected routes instead of resetting the
//! session. [`UpdateMessage`] is the plain structural form used for
//! encoding.

use crate::attributes::{
    path_attribute_flags, Attributes, MpReachNlri, MpUnreachNlri,
    PathAttribute, PathAttributeTypeCode, PathAttributeValue,
};
use crate::error::Error;
use crate::log::codec_log;
use crate::nlri::{Nlri, NlriCodec};
use crate::primitives::{AddressFamily, BgpNexthop};
use crate::registry::{AttributeRegistry, DEFAULT_REGISTRY};
use nom::{
    bytes::complete::take,
    number::complete::{be_u16, u8 as parse_u8},
};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::collections::{BTreeMap, BTreeSet};

/// Largest UPDATE body that fits a standard 4096 byte message.
pub const MAX_UPDATE_BODY: usize = 4096 - 19;

/// Per session parameters negotiated by the session layer that change how
/// UPDATE messages are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecContext {
    /// Families for which NLRI carry a path identifier.
    pub path_ids: BTreeSet<AddressFamily>,

    /// Four octet AS numbers in AS_PATH and AGGREGATOR.
    pub four_octet_as: bool,
}

impl Default for CodecContext {
    fn default() -> Self {
        Self {
            path_ids: BTreeSet::new(),
            four_octet_as: true,
        }
    }
}

impl CodecContext {
    pub fn with_path_ids(mut self, family: AddressFamily) -> Self {
        self.path_ids.insert(family);
        self
    }

    pub fn path_ids(&self, family: AddressFamily) -> bool {
        self.path_ids.contains(&family)
    }
}

/// What to do with an UPDATE when an attribute is malformed, from least to
/// most severe.
///
/// Ref: RFC 7606 §2
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum UpdateErrorAction {
    AttributeDiscard,
    TreatAsWithdraw,
    SessionReset,
}

/// Routes announced with a shared next hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub family: AddressFamily,
    pub nexthop: BgpNexthop,
    pub nlri: Vec<Nlri>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub family: AddressFamily,
    pub nlri: Vec<Nlri>,
}

/// The routing content of a received UPDATE, ready for a route table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteUpdate {
    /// Attributes shared by every announced route. Next hops are carried by
    /// the announcements and multiprotocol attributes are not kept.
    pub attributes: Attributes,
    pub announced: Vec<Announcement>,
    pub withdrawn: Vec<Withdrawal>,

    /// Set when a malformed attribute turned every announcement into a
    /// withdrawal.
    pub treat_as_withdraw: bool,
}

impl RouteUpdate {
    pub fn is_empty(&self) -> bool {
        self.announced.iter().all(|a| a.nlri.is_empty())
            && self.withdrawn.iter().all(|w| w.nlri.is_empty())
    }
}

/// An UPDATE message body.
///
/// ```text
/// +-----------------------------------------------------+
/// |   Withdrawn Routes Length (2 octets)                |
/// +-----------------------------------------------------+
/// |   Withdrawn Routes (variable)                       |
/// +-----------------------------------------------------+
/// |   Total Path Attribute Length (2 octets)            |
/// +-----------------------------------------------------+
/// |   Path Attributes (variable)                        |
/// +-----------------------------------------------------+
/// |   Network Layer Reachability Information (variable) |
/// +-----------------------------------------------------+
/// ```
///
/// Ref: RFC 4271 §4.3
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub withdrawn: Vec<Nlri>,
    pub path_attributes: Vec<PathAttribute>,
    pub nlri: Vec<Nlri>,
}

impl UpdateMessage {
    /// Build the message announcing `nlri` with the given attributes. IPv4
    /// unicast routes with an IPv4 next hop use the classic NLRI field and
    /// NEXT_HOP attribute; everything else goes in MP_REACH_NLRI.
    pub fn announce(
        family: AddressFamily,
        nexthop: BgpNexthop,
        attributes: &Attributes,
        nlri: Vec<Nlri>,
    ) -> UpdateMessage {
        let attributes = attributes
            .without(PathAttributeTypeCode::NextHop)
            .without(PathAttributeTypeCode::MpReachNlri)
            .without(PathAttributeTypeCode::MpUnreachNlri);
        match (family, nexthop) {
            (AddressFamily::IPV4_UNICAST, BgpNexthop::Ipv4(nh)) => {
                let attributes =
                    attributes.with_value(PathAttributeValue::NextHop(nh));
                UpdateMessage {
                    withdrawn: Vec::new(),
                    path_attributes: attributes.iter().cloned().collect(),
                    nlri,
                }
            }
            _ => {
                let attributes = attributes.with_value(
                    PathAttributeValue::MpReachNlri(MpReachNlri {
                        family,
                        nexthop,
                        nlri,
                    }),
                );
                UpdateMessage {
                    withdrawn: Vec::new(),
                    path_attributes: attributes.iter().cloned().collect(),
                    nlri: Vec::new(),
                }
            }
        }
    }

    pub fn withdraw(family: AddressFamily, nlri: Vec<Nlri>) -> UpdateMessage {
        if family == AddressFamily::IPV4_UNICAST {
            return UpdateMessage {
                withdrawn: nlri,
                ..Default::default()
            };
        }
        UpdateMessage {
            path_attributes: vec![PathAttributeValue::MpUnreachNlri(
                MpUnreachNlri {
                    family,
                    withdrawn: nlri,
                },
            )
            .into()],
            ..Default::default()
        }
    }

    pub fn to_wire(
        &self,
        registry: &AttributeRegistry,
        ctx: &CodecContext,
    ) -> Result<Vec<u8>, Error> {
        let family = AddressFamily::IPV4_UNICAST;
        let path_ids = ctx.path_ids(family);
        let mut buf = Vec::new();

        // withdrawn
        let withdrawn =
            NlriCodec::encode_unreachable(&self.withdrawn, family, path_ids)?;
        if withdrawn.len() > u16::MAX as usize {
            return Err(Error::TooLarge(
                "update: too many withdrawn prefixes".into(),
            ));
        }
        buf.extend_from_slice(&(withdrawn.len() as u16).to_be_bytes());
        buf.extend_from_slice(&withdrawn);

        // path attributes
        let attrs = registry.encode_all(&self.path_attributes, ctx)?;
        if attrs.len() > u16::MAX as usize {
            return Err(Error::TooLarge(
                "update: too many path attributes".into(),
            ));
        }
        buf.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
        buf.extend_from_slice(&attrs);

        // nlri
        buf.extend_from_slice(&NlriCodec::encode_reachable(
            &self.nlri, family, path_ids,
        )?);

        if buf.len() > MAX_UPDATE_BODY {
            return Err(Error::TooLarge(
                "update exceeds max message size".into(),
            ));
        }
        Ok(buf)
    }
}

/// An attribute TLV split out of the attribute section but not decoded.
#[derive(Debug, Clone, Copy)]
struct RawAttribute<'a> {
    flags: u8,
    type_code: u8,
    value: &'a [u8],
}

/// Split an UPDATE body into its withdrawn, attribute and NLRI sections.
fn sections(input: &[u8]) -> Result<(&[u8], &[u8], &[u8]), Error> {
    let (input, len) = be_u16(input)?;
    if usize::from(len) > input.len() {
        return Err(Error::MalformedAttributeList(format!(
            "withdrawn routes length {len} exceeds message"
        )));
    }
    let (input, withdrawn) = take(len)(input)?;

    let (input, len) = be_u16(input)?;
    if usize::from(len) > input.len() {
        return Err(Error::MalformedAttributeList(format!(
            "path attribute length {len} exceeds message"
        )));
    }
    let (nlri, attrs) = take(len)(input)?;
    Ok((withdrawn, attrs, nlri))
}

fn raw_attributes(mut buf: &[u8]) -> Result<Vec<RawAttribute<'_>>, Error> {
    let mut result = Vec::new();
    while !buf.is_empty() {
        let (input, flags) = parse_u8(buf)?;
        let (input, type_code) = parse_u8(input)?;
        let (input, len) =
            if flags & path_attribute_flags::EXTENDED_LENGTH != 0 {
                let (input, len) = be_u16(input)?;
                (input, usize::from(len))
            } else {
                let (input, len) = parse_u8(input)?;
                (input, usize::from(len))
            };
        if len > input.len() {
            return Err(Error::MalformedAttributeList(format!(
                "attribute {type_code} length {len} exceeds remaining {}",
                input.len()
            )));
        }
        let (input, value) = take(len)(input)?;
        result.push(RawAttribute {
            flags,
            type_code,
            value,
        });
        buf = input;
    }
    Ok(result)
}

fn is_mp(type_code: u8) -> bool {
    type_code == u8::from(PathAttributeTypeCode::MpReachNlri)
        || type_code == u8::from(PathAttributeTypeCode::MpUnreachNlri)
}

/// Decodes and encodes UPDATE bodies against an attribute registry.
pub struct UpdateCodec<'a> {
    registry: &'a AttributeRegistry,
    log: Logger,
}

impl UpdateCodec<'static> {
    /// A codec backed by the standard attribute registry.
    pub fn new(log: Logger) -> Self {
        Self {
            registry: &DEFAULT_REGISTRY,
            log,
        }
    }
}

impl<'a> UpdateCodec<'a> {
    pub fn with_registry(registry: &'a AttributeRegistry, log: Logger) -> Self {
        Self { registry, log }
    }

    pub fn registry(&self) -> &AttributeRegistry {
        self.registry
    }

    pub fn encode(
        &self,
        msg: &UpdateMessage,
        ctx: &CodecContext,
    ) -> Result<Vec<u8>, Error> {
        msg.to_wire(self.registry, ctx)
    }

    /// Decode an UPDATE body exactly as received. Any malformed attribute
    /// is an error.
    pub fn decode_message(
        &self,
        input: &[u8],
        ctx: &CodecContext,
    ) -> Result<UpdateMessage, Error> {
        let family = AddressFamily::IPV4_UNICAST;
        let (withdrawn, attrs, nlri) = sections(input)?;
        let withdrawn = NlriCodec::decode_unreachable(
            withdrawn,
            family,
            ctx.path_ids(family),
        )?;

        let mut seen = BTreeSet::new();
        let mut path_attributes = Vec::new();
        for raw in raw_attributes(attrs)? {
            if !seen.insert(raw.type_code) {
                return Err(Error::MalformedAttributeList(format!(
                    "duplicate attribute {}",
                    raw.type_code
                )));
            }
            match self.registry.decode(raw.flags, raw.type_code, raw.value, ctx)
            {
                Ok(Some(attr)) => path_attributes.push(attr),
                Ok(None) => {}
                Err(e) => return Err(e.error),
            }
        }

        let nlri =
            NlriCodec::decode_reachable(nlri, family, ctx.path_ids(family))?;
        Ok(UpdateMessage {
            withdrawn,
            path_attributes,
            nlri,
        })
    }

    /// Decode an UPDATE body into routes. Errors returned from here are
    /// fatal for the session; everything recoverable is handled by
    /// discarding the attribute or withdrawing the announced routes.
    pub fn decode(
        &self,
        input: &[u8],
        ctx: &CodecContext,
    ) -> Result<RouteUpdate, Error> {
        let ipv4 = AddressFamily::IPV4_UNICAST;
        let (withdrawn_input, attrs_input, nlri_input) = sections(input)?;

        let mut withdrawn: BTreeMap<AddressFamily, Vec<Nlri>> = BTreeMap::new();
        let classic_withdrawn = NlriCodec::decode_unreachable(
            withdrawn_input,
            ipv4,
            ctx.path_ids(ipv4),
        )?;
        if !classic_withdrawn.is_empty() {
            withdrawn.entry(ipv4).or_default().extend(classic_withdrawn);
        }

        let mut treat_as_withdraw = false;
        let mut decoded: Vec<PathAttribute> = Vec::new();
        let mut seen = BTreeSet::new();

        for raw in raw_attributes(attrs_input)? {
            if !seen.insert(raw.type_code) {
                if is_mp(raw.type_code) {
                    return Err(Error::DuplicateMpAttribute);
                }
                codec_log!(self.log, warn,
                    "duplicate attribute {}, keeping first", raw.type_code;
                    "type_code" => raw.type_code
                );
                continue;
            }

            match self.registry.decode(raw.flags, raw.type_code, raw.value, ctx)
            {
                Ok(Some(attr)) => decoded.push(attr),
                Ok(None) => {
                    codec_log!(self.log, debug,
                        "dropping unrecognized non-transitive attribute {}",
                        raw.type_code;
                        "type_code" => raw.type_code
                    );
                }
                Err(e) if is_mp(e.type_code)
                    && matches!(e.error, Error::UnsupportedAddressFamily(..)) =>
                {
                    codec_log!(self.log, debug,
                        "ignoring multiprotocol attribute {} for unsupported \
                         family: {}", e.type_code, e.error;
                        "type_code" => e.type_code
                    );
                }
                Err(e) => match e.action {
                    UpdateErrorAction::SessionReset => return Err(e.error),
                    UpdateErrorAction::AttributeDiscard => {
                        codec_log!(self.log, warn,
                            "discarding malformed attribute {}: {}",
                            e.type_code, e.error;
                            "type_code" => e.type_code
                        );
                    }
                    UpdateErrorAction::TreatAsWithdraw => {
                        if e.type_code
                            == u8::from(PathAttributeTypeCode::MpReachNlri)
                        {
                            if let Some((family, nlri)) =
                                MpReachNlri::salvage(raw.value, ctx)
                            {
                                withdrawn.entry(family).or_default().extend(nlri);
                            }
                        }
                        codec_log!(self.log, warn,
                            "malformed attribute {}, treating update as \
                             withdraw: {}", e.type_code, e.error;
                            "type_code" => e.type_code
                        );
                        treat_as_withdraw = true;
                    }
                },
            }
        }

        let classic_nlri =
            NlriCodec::decode_reachable(nlri_input, ipv4, ctx.path_ids(ipv4))?;

        let mut attributes: Attributes = decoded.into_iter().collect();
        let mut announced = Vec::new();

        if let Some(PathAttributeValue::MpUnreachNlri(mp)) =
            attributes.value(PathAttributeTypeCode::MpUnreachNlri)
        {
            withdrawn
                .entry(mp.family)
                .or_default()
                .extend(mp.withdrawn.iter().cloned());
        }

        let next_hop = attributes.next_hop();
        if !classic_nlri.is_empty() {
            match next_hop {
                Some(nh) => announced.push(Announcement {
                    family: ipv4,
                    nexthop: BgpNexthop::Ipv4(nh),
                    nlri: classic_nlri,
                }),
                None if treat_as_withdraw => {
                    withdrawn.entry(ipv4).or_default().extend(classic_nlri);
                }
                None => {
                    return Err(Error::MissingWellKnownAttribute(
                        PathAttributeTypeCode::NextHop,
                    ))
                }
            }
        }
        if let Some(PathAttributeValue::MpReachNlri(mp)) =
            attributes.value(PathAttributeTypeCode::MpReachNlri)
        {
            if !mp.nlri.is_empty() {
                announced.push(Announcement {
                    family: mp.family,
                    nexthop: mp.nexthop,
                    nlri: mp.nlri.clone(),
                });
            }
        }

        if treat_as_withdraw {
            for a in announced.drain(..) {
                withdrawn
                    .entry(a.family)
                    .or_default()
                    .extend(a.nlri.into_iter().map(|n| Nlri {
                        path_id: n.path_id,
                        destination: n.destination.canonical(),
                    }));
            }
        } else if !announced.is_empty() {
            for code in
                [PathAttributeTypeCode::Origin, PathAttributeTypeCode::AsPath]
            {
                if !attributes.contains(code) {
                    return Err(Error::MissingWellKnownAttribute(code));
                }
            }
        }

        attributes = attributes
            .without(PathAttributeTypeCode::NextHop)
            .without(PathAttributeTypeCode::MpReachNlri)
            .without(PathAttributeTypeCode::MpUnreachNlri);

        // Four octet speakers carry the full path in AS_PATH already.
        if ctx.four_octet_as
            && (attributes.contains(PathAttributeTypeCode::As4Path)
                || attributes.contains(PathAttributeTypeCode::As4Aggregator))
        {
            codec_log!(self.log, debug,
                "discarding AS4 attributes from four octet speaker"
            );
            attributes = attributes
                .without(PathAttributeTypeCode::As4Path)
                .without(PathAttributeTypeCode::As4Aggregator);
        }

        Ok(RouteUpdate {
            attributes,
            announced,
            withdrawn: withdrawn
                .into_iter()
                .map(|(family, nlri)| Withdrawal { family, nlri })
                .collect(),
            treat_as_withdraw,
        })
    }
}
