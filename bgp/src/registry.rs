// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The path attribute registry maps a type code to the functions that decode
//! and encode its value, the flags it must carry and what to do when it is
//! malformed. The standard registry is built once and shared read only.

use crate::attributes::{
    path_attribute_flags, Aggregator, AsPath, MpReachNlri, MpUnreachNlri,
    PathAttribute, PathAttributeTypeCode, PathAttributeValue, PathOrigin,
};
use crate::communities::{Community, ExtendedCommunity};
use crate::error::Error;
use crate::update::{CodecContext, UpdateErrorAction};
use lazy_static::lazy_static;
use nom::number::complete::{be_u32, u8 as parse_u8};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

pub type DecodeFn = fn(&[u8], &CodecContext) -> Result<PathAttributeValue, Error>;
pub type EncodeFn = fn(&PathAttributeValue, &CodecContext) -> Result<Vec<u8>, Error>;

#[derive(Clone, Copy)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub type_code: PathAttributeTypeCode,
    /// Required optional/transitive bits.
    pub flags: u8,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
    /// Ref: RFC 7606 §7
    pub on_error: UpdateErrorAction,
}

impl std::fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("type_code", &self.type_code)
            .field("flags", &self.flags)
            .field("on_error", &self.on_error)
            .finish()
    }
}

/// A known attribute that failed to decode, with the action the UPDATE
/// handling must take.
#[derive(Debug)]
pub struct AttributeError {
    pub type_code: u8,
    pub action: UpdateErrorAction,
    pub error: Error,
}

lazy_static! {
    pub static ref DEFAULT_REGISTRY: AttributeRegistry =
        AttributeRegistry::standard();
}

#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    descriptors: BTreeMap<u8, AttributeDescriptor>,
}

impl AttributeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every attribute this crate knows.
    pub fn standard() -> Self {
        use PathAttributeTypeCode as T;
        use UpdateErrorAction::{AttributeDiscard, SessionReset, TreatAsWithdraw};

        let mut r = Self::empty();
        let entries: [(&'static str, T, DecodeFn, EncodeFn, UpdateErrorAction); 15] = [
            ("ORIGIN", T::Origin, decode_origin, encode_origin, TreatAsWithdraw),
            ("AS_PATH", T::AsPath, decode_as_path, encode_as_path, TreatAsWithdraw),
            ("NEXT_HOP", T::NextHop, decode_next_hop, encode_next_hop, TreatAsWithdraw),
            ("MULTI_EXIT_DISC", T::MultiExitDisc, decode_med, encode_med, TreatAsWithdraw),
            ("LOCAL_PREF", T::LocalPref, decode_local_pref, encode_local_pref, TreatAsWithdraw),
            (
                "ATOMIC_AGGREGATE",
                T::AtomicAggregate,
                decode_atomic_aggregate,
                encode_atomic_aggregate,
                AttributeDiscard,
            ),
            ("AGGREGATOR", T::Aggregator, decode_aggregator, encode_aggregator, AttributeDiscard),
            ("COMMUNITIES", T::Communities, decode_communities, encode_communities, TreatAsWithdraw),
            ("ORIGINATOR_ID", T::OriginatorId, decode_originator_id, encode_originator_id, TreatAsWithdraw),
            ("CLUSTER_LIST", T::ClusterList, decode_cluster_list, encode_cluster_list, TreatAsWithdraw),
            ("MP_REACH_NLRI", T::MpReachNlri, decode_mp_reach, encode_mp_reach, TreatAsWithdraw),
            ("MP_UNREACH_NLRI", T::MpUnreachNlri, decode_mp_unreach, encode_mp_unreach, SessionReset),
            (
                "EXTENDED_COMMUNITIES",
                T::ExtendedCommunities,
                decode_extended_communities,
                encode_extended_communities,
                TreatAsWithdraw,
            ),
            ("AS4_PATH", T::As4Path, decode_as4_path, encode_as4_path, AttributeDiscard),
            (
                "AS4_AGGREGATOR",
                T::As4Aggregator,
                decode_as4_aggregator,
                encode_as4_aggregator,
                AttributeDiscard,
            ),
        ];
        for (name, type_code, decode, encode, on_error) in entries {
            r.register(AttributeDescriptor {
                name,
                type_code,
                flags: type_code.flags(),
                decode,
                encode,
                on_error,
            });
        }
        r
    }

    pub fn register(&mut self, descriptor: AttributeDescriptor) {
        self.descriptors
            .insert(descriptor.type_code.into(), descriptor);
    }

    pub fn descriptor(&self, type_code: u8) -> Option<&AttributeDescriptor> {
        self.descriptors.get(&type_code)
    }

    /// Decode one attribute value. Unknown optional transitive attributes are
    /// kept opaque and other unknown attributes yield `None`.
    pub fn decode(
        &self,
        flags: u8,
        type_code: u8,
        value: &[u8],
        ctx: &CodecContext,
    ) -> Result<Option<PathAttribute>, AttributeError> {
        use path_attribute_flags::{CATEGORY, OPTIONAL, TRANSITIVE};

        let Some(desc) = self.descriptors.get(&type_code) else {
            if flags & OPTIONAL != 0 && flags & TRANSITIVE != 0 {
                return Ok(Some(PathAttribute {
                    flags,
                    value: PathAttributeValue::Unknown {
                        type_code,
                        value: value.to_vec(),
                    },
                }));
            }
            return Ok(None);
        };

        if flags & CATEGORY != desc.flags {
            let action = match desc.on_error {
                UpdateErrorAction::SessionReset => {
                    UpdateErrorAction::SessionReset
                }
                _ => UpdateErrorAction::TreatAsWithdraw,
            };
            return Err(AttributeError {
                type_code,
                action,
                error: Error::AttributeFlags { type_code, flags },
            });
        }

        match (desc.decode)(value, ctx) {
            Ok(value) => Ok(Some(PathAttribute { flags, value })),
            Err(error) => Err(AttributeError {
                type_code,
                action: desc.on_error,
                error,
            }),
        }
    }

    /// Encode a complete attribute TLV. The extended length flag is kept if
    /// present and set when the value does not fit a one byte length.
    pub fn encode(
        &self,
        attr: &PathAttribute,
        ctx: &CodecContext,
    ) -> Result<Vec<u8>, Error> {
        let type_code = attr.type_code();
        let value = match (&attr.value, self.descriptors.get(&type_code)) {
            (PathAttributeValue::Unknown { value, .. }, _) => value.clone(),
            (v, Some(desc)) => (desc.encode)(v, ctx)?,
            (_, None) => {
                return Err(Error::UnsupportedPathAttributeValue(type_code))
            }
        };
        if value.len() > u16::MAX as usize {
            return Err(Error::TooLarge(format!(
                "path attribute {type_code}"
            )));
        }

        let extended = attr.flags & path_attribute_flags::EXTENDED_LENGTH
            != 0
            || value.len() > u8::MAX as usize;
        let mut buf = Vec::with_capacity(value.len() + 4);
        if extended {
            buf.push(attr.flags | path_attribute_flags::EXTENDED_LENGTH);
            buf.push(type_code);
            buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
        } else {
            buf.push(attr.flags);
            buf.push(type_code);
            buf.push(value.len() as u8);
        }
        buf.extend_from_slice(&value);
        Ok(buf)
    }

    pub fn encode_all<'a, I>(
        &self,
        attrs: I,
        ctx: &CodecContext,
    ) -> Result<Vec<u8>, Error>
    where
        I: IntoIterator<Item = &'a PathAttribute>,
    {
        let mut buf = Vec::new();
        for a in attrs {
            buf.extend_from_slice(&self.encode(a, ctx)?);
        }
        Ok(buf)
    }
}

fn expect_len(
    code: PathAttributeTypeCode,
    value: &[u8],
    expected: usize,
) -> Result<(), Error> {
    if value.len() != expected {
        return Err(Error::AttributeLength {
            type_code: code.into(),
            expected,
            found: value.len(),
        });
    }
    Ok(())
}

fn expect_multiple(
    code: PathAttributeTypeCode,
    value: &[u8],
    unit: usize,
) -> Result<(), Error> {
    if value.len() % unit != 0 {
        return Err(Error::AttributeLength {
            type_code: code.into(),
            expected: value.len() - value.len() % unit,
            found: value.len(),
        });
    }
    Ok(())
}

fn mismatch(code: PathAttributeTypeCode) -> Error {
    Error::UnsupportedPathAttributeValue(code.into())
}

fn ipv4_list(mut input: &[u8]) -> Result<Vec<Ipv4Addr>, Error> {
    let mut result = Vec::with_capacity(input.len() / 4);
    while !input.is_empty() {
        let (out, v) = be_u32(input)?;
        result.push(Ipv4Addr::from(v));
        input = out;
    }
    Ok(result)
}

fn decode_origin(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_len(PathAttributeTypeCode::Origin, value, 1)?;
    let (_, origin) = parse_u8(value)?;
    Ok(PathAttributeValue::Origin(PathOrigin::try_from(origin)?))
}

fn encode_origin(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::Origin(o) => Ok(vec![u8::from(*o)]),
        _ => Err(mismatch(PathAttributeTypeCode::Origin)),
    }
}

fn decode_as_path(
    value: &[u8],
    ctx: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    Ok(PathAttributeValue::AsPath(AsPath::from_wire(
        value,
        ctx.four_octet_as,
    )?))
}

fn encode_as_path(
    value: &PathAttributeValue,
    ctx: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::AsPath(p) => p.to_wire(ctx.four_octet_as),
        _ => Err(mismatch(PathAttributeTypeCode::AsPath)),
    }
}

fn decode_next_hop(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_len(PathAttributeTypeCode::NextHop, value, 4)?;
    let (_, v) = be_u32(value)?;
    Ok(PathAttributeValue::NextHop(Ipv4Addr::from(v)))
}

fn encode_next_hop(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::NextHop(a) => Ok(a.octets().to_vec()),
        _ => Err(mismatch(PathAttributeTypeCode::NextHop)),
    }
}

fn decode_med(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_len(PathAttributeTypeCode::MultiExitDisc, value, 4)?;
    let (_, v) = be_u32(value)?;
    Ok(PathAttributeValue::MultiExitDisc(v))
}

fn encode_med(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::MultiExitDisc(v) => Ok(v.to_be_bytes().to_vec()),
        _ => Err(mismatch(PathAttributeTypeCode::MultiExitDisc)),
    }
}

fn decode_local_pref(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_len(PathAttributeTypeCode::LocalPref, value, 4)?;
    let (_, v) = be_u32(value)?;
    Ok(PathAttributeValue::LocalPref(v))
}

fn encode_local_pref(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::LocalPref(v) => Ok(v.to_be_bytes().to_vec()),
        _ => Err(mismatch(PathAttributeTypeCode::LocalPref)),
    }
}

fn decode_atomic_aggregate(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_len(PathAttributeTypeCode::AtomicAggregate, value, 0)?;
    Ok(PathAttributeValue::AtomicAggregate)
}

fn encode_atomic_aggregate(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::AtomicAggregate => Ok(Vec::new()),
        _ => Err(mismatch(PathAttributeTypeCode::AtomicAggregate)),
    }
}

fn decode_aggregator(
    value: &[u8],
    ctx: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    let len = if ctx.four_octet_as { 8 } else { 6 };
    expect_len(PathAttributeTypeCode::Aggregator, value, len)?;
    Ok(PathAttributeValue::Aggregator(Aggregator::from_wire(
        value,
        ctx.four_octet_as,
    )?))
}

fn encode_aggregator(
    value: &PathAttributeValue,
    ctx: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::Aggregator(a) => Ok(a.to_wire(ctx.four_octet_as)),
        _ => Err(mismatch(PathAttributeTypeCode::Aggregator)),
    }
}

fn decode_communities(
    mut value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_multiple(PathAttributeTypeCode::Communities, value, 4)?;
    let mut communities = Vec::with_capacity(value.len() / 4);
    while !value.is_empty() {
        let (out, c) = Community::from_wire(value)?;
        communities.push(c);
        value = out;
    }
    Ok(PathAttributeValue::Communities(communities))
}

fn encode_communities(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::Communities(communities) => {
            let mut buf = Vec::with_capacity(communities.len() * 4);
            for c in communities {
                buf.extend_from_slice(&u32::from(*c).to_be_bytes());
            }
            Ok(buf)
        }
        _ => Err(mismatch(PathAttributeTypeCode::Communities)),
    }
}

fn decode_originator_id(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_len(PathAttributeTypeCode::OriginatorId, value, 4)?;
    let (_, v) = be_u32(value)?;
    Ok(PathAttributeValue::OriginatorId(Ipv4Addr::from(v)))
}

fn encode_originator_id(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::OriginatorId(a) => Ok(a.octets().to_vec()),
        _ => Err(mismatch(PathAttributeTypeCode::OriginatorId)),
    }
}

fn decode_cluster_list(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_multiple(PathAttributeTypeCode::ClusterList, value, 4)?;
    Ok(PathAttributeValue::ClusterList(ipv4_list(value)?))
}

fn encode_cluster_list(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::ClusterList(ids) => {
            Ok(ids.iter().flat_map(|a| a.octets()).collect())
        }
        _ => Err(mismatch(PathAttributeTypeCode::ClusterList)),
    }
}

fn decode_mp_reach(
    value: &[u8],
    ctx: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    Ok(PathAttributeValue::MpReachNlri(MpReachNlri::from_wire(
        value, ctx,
    )?))
}

fn encode_mp_reach(
    value: &PathAttributeValue,
    ctx: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::MpReachNlri(mp) => mp.to_wire(ctx),
        _ => Err(mismatch(PathAttributeTypeCode::MpReachNlri)),
    }
}

fn decode_mp_unreach(
    value: &[u8],
    ctx: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    Ok(PathAttributeValue::MpUnreachNlri(MpUnreachNlri::from_wire(
        value, ctx,
    )?))
}

fn encode_mp_unreach(
    value: &PathAttributeValue,
    ctx: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::MpUnreachNlri(mp) => mp.to_wire(ctx),
        _ => Err(mismatch(PathAttributeTypeCode::MpUnreachNlri)),
    }
}

fn decode_extended_communities(
    mut value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_multiple(PathAttributeTypeCode::ExtendedCommunities, value, 8)?;
    let mut communities = Vec::with_capacity(value.len() / 8);
    while !value.is_empty() {
        let (out, c) = ExtendedCommunity::from_wire(value)?;
        communities.push(c);
        value = out;
    }
    Ok(PathAttributeValue::ExtendedCommunities(communities))
}

fn encode_extended_communities(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::ExtendedCommunities(communities) => {
            Ok(communities.iter().flat_map(|c| c.to_wire()).collect())
        }
        _ => Err(mismatch(PathAttributeTypeCode::ExtendedCommunities)),
    }
}

fn decode_as4_path(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    Ok(PathAttributeValue::As4Path(AsPath::from_wire(value, true)?))
}

fn encode_as4_path(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::As4Path(p) => p.to_wire(true),
        _ => Err(mismatch(PathAttributeTypeCode::As4Path)),
    }
}

fn decode_as4_aggregator(
    value: &[u8],
    _: &CodecContext,
) -> Result<PathAttributeValue, Error> {
    expect_len(PathAttributeTypeCode::As4Aggregator, value, 8)?;
    Ok(PathAttributeValue::As4Aggregator(Aggregator::from_wire(
        value, true,
    )?))
}

fn encode_as4_aggregator(
    value: &PathAttributeValue,
    _: &CodecContext,
) -> Result<Vec<u8>, Error> {
    match value {
        PathAttributeValue::As4Aggregator(a) => Ok(a.to_wire(true)),
        _ => Err(mismatch(PathAttributeTypeCode::As4Aggregator)),
    }
}
