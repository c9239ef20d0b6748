// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Path attribute types and the immutable attribute bag carried by routes.

use crate::communities::{Community, ExtendedCommunity};
use crate::error::Error;
use crate::nlri::{Nlri, NlriCodec};
use crate::primitives::{AddressFamily, BgpNexthop};
use crate::update::CodecContext;
use nom::{
    bytes::complete::take,
    number::complete::{be_u16, be_u32, u8 as parse_u8},
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

pub mod path_attribute_flags {
    pub const OPTIONAL: u8 = 0b10000000;
    pub const TRANSITIVE: u8 = 0b01000000;
    pub const PARTIAL: u8 = 0b00100000;
    pub const EXTENDED_LENGTH: u8 = 0b00010000;

    /// The flag bits that identify an attribute's category. Partial and
    /// extended length are properties of a particular encoding.
    pub const CATEGORY: u8 = OPTIONAL | TRANSITIVE;
}

/// AS number substituted for four octet AS numbers on two octet sessions.
///
/// Ref: RFC 6793 §9
pub const AS_TRANS: u16 = 23456;

#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum PathAttributeTypeCode {
    /// RFC 4271
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    MultiExitDisc = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,
    Communities = 8,

    /// RFC 4456
    OriginatorId = 9,
    ClusterList = 10,

    /// RFC 4760
    MpReachNlri = 14,
    MpUnreachNlri = 15,

    /// RFC 4360
    ExtendedCommunities = 16,

    /// RFC 6793
    As4Path = 17,
    As4Aggregator = 18,
}

impl PathAttributeTypeCode {
    /// The optional and transitive bits an attribute of this type must
    /// carry.
    pub fn flags(&self) -> u8 {
        use path_attribute_flags::{OPTIONAL, TRANSITIVE};
        match self {
            Self::Origin
            | Self::AsPath
            | Self::NextHop
            | Self::LocalPref
            | Self::AtomicAggregate => TRANSITIVE,
            Self::MultiExitDisc
            | Self::OriginatorId
            | Self::ClusterList
            | Self::MpReachNlri
            | Self::MpUnreachNlri => OPTIONAL,
            Self::Aggregator
            | Self::Communities
            | Self::ExtendedCommunities
            | Self::As4Path
            | Self::As4Aggregator => OPTIONAL | TRANSITIVE,
        }
    }
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum PathOrigin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum AsPathType {
    AsSet = 1,
    AsSequence = 2,

    /// RFC 5065
    AsConfedSequence = 3,
    AsConfedSet = 4,
}

impl AsPathType {
    pub fn is_confed(&self) -> bool {
        matches!(self, Self::AsConfedSequence | Self::AsConfedSet)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct AsPathSegment {
    pub typ: AsPathType,
    pub value: Vec<u32>,
}

impl AsPathSegment {
    pub fn sequence(value: Vec<u32>) -> Self {
        Self {
            typ: AsPathType::AsSequence,
            value,
        }
    }

    pub fn set(value: Vec<u32>) -> Self {
        Self {
            typ: AsPathType::AsSet,
            value,
        }
    }

    pub fn to_wire(&self, four_octet: bool) -> Result<Vec<u8>, Error> {
        if self.value.len() > u8::MAX as usize {
            return Err(Error::TooLarge("AS path segment".into()));
        }
        let mut buf = vec![self.typ as u8, self.value.len() as u8];
        for v in &self.value {
            if four_octet {
                buf.extend_from_slice(&v.to_be_bytes());
            } else {
                let asn = u16::try_from(*v).unwrap_or(AS_TRANS);
                buf.extend_from_slice(&asn.to_be_bytes());
            }
        }
        Ok(buf)
    }

    pub fn from_wire(
        input: &[u8],
        four_octet: bool,
    ) -> Result<(&[u8], AsPathSegment), Error> {
        let (input, typ) = parse_u8(input)?;
        let typ = AsPathType::try_from(typ)?;

        let (input, count) = parse_u8(input)?;
        let width = if four_octet { 4 } else { 2 };
        let (input, mut value_input) = take(usize::from(count) * width)(input)?;

        let mut segment = AsPathSegment {
            typ,
            value: Vec::with_capacity(usize::from(count)),
        };
        while !value_input.is_empty() {
            let (out, asn) = if four_octet {
                be_u32(value_input)?
            } else {
                let (out, asn) = be_u16(value_input)?;
                (out, u32::from(asn))
            };
            segment.value.push(asn);
            value_input = out;
        }
        Ok((input, segment))
    }
}

/// An ordered list of AS path segments.
#[derive(Debug, PartialEq, Eq, Clone, Default, Hash, Serialize, Deserialize)]
pub struct AsPath(pub Vec<AsPathSegment>);

impl AsPath {
    pub const MAX_SEGMENT_LEN: usize = u8::MAX as usize;

    pub fn segments(&self) -> &[AsPathSegment] {
        &self.0
    }

    /// Path length as used by the decision process. An AS set counts as one
    /// hop regardless of size and confederation segments do not count.
    ///
    /// Ref: RFC 4271 §9.1.2.2, RFC 5065 §5.3
    pub fn path_length(&self) -> usize {
        self.0
            .iter()
            .map(|s| match s.typ {
                AsPathType::AsSequence => s.value.len(),
                AsPathType::AsSet => 1,
                AsPathType::AsConfedSequence | AsPathType::AsConfedSet => 0,
            })
            .sum()
    }

    /// The neighboring AS: the leftmost AS of the first non-confederation
    /// segment when that segment is an AS sequence.
    pub fn first_as(&self) -> Option<u32> {
        let segment = self.0.iter().find(|s| !s.typ.is_confed())?;
        match segment.typ {
            AsPathType::AsSequence => segment.value.first().copied(),
            _ => None,
        }
    }

    pub fn contains(&self, asn: u32) -> bool {
        self.0.iter().any(|s| s.value.contains(&asn))
    }

    /// Prepend `asn`, merging into a leading AS sequence when it has room.
    pub fn prepend(&self, asn: u32) -> AsPath {
        let mut segments = self.0.clone();
        match segments.first_mut() {
            Some(first)
                if first.typ == AsPathType::AsSequence
                    && first.value.len() < Self::MAX_SEGMENT_LEN =>
            {
                first.value.insert(0, asn);
            }
            _ => segments.insert(0, AsPathSegment::sequence(vec![asn])),
        }
        AsPath(segments)
    }

    pub fn without_confed(&self) -> AsPath {
        AsPath(
            self.0
                .iter()
                .filter(|s| !s.typ.is_confed())
                .cloned()
                .collect(),
        )
    }

    pub fn to_wire(&self, four_octet: bool) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        for s in &self.0 {
            buf.extend_from_slice(&s.to_wire(four_octet)?);
        }
        Ok(buf)
    }

    pub fn from_wire(mut input: &[u8], four_octet: bool) -> Result<AsPath, Error> {
        let mut segments = Vec::new();
        while !input.is_empty() {
            let (out, seg) = AsPathSegment::from_wire(input, four_octet)?;
            segments.push(seg);
            input = out;
        }
        Ok(AsPath(segments))
    }
}

impl From<Vec<AsPathSegment>> for AsPath {
    fn from(segments: Vec<AsPathSegment>) -> Self {
        Self(segments)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct Aggregator {
    pub asn: u32,
    pub address: Ipv4Addr,
}

impl Aggregator {
    pub fn to_wire(&self, four_octet: bool) -> Vec<u8> {
        let mut buf = if four_octet {
            self.asn.to_be_bytes().to_vec()
        } else {
            u16::try_from(self.asn)
                .unwrap_or(AS_TRANS)
                .to_be_bytes()
                .to_vec()
        };
        buf.extend_from_slice(&self.address.octets());
        buf
    }

    pub fn from_wire(input: &[u8], four_octet: bool) -> Result<Aggregator, Error> {
        let (input, asn) = if four_octet {
            be_u32(input)?
        } else {
            let (input, asn) = be_u16(input)?;
            (input, u32::from(asn))
        };
        let (_, address) = be_u32(input)?;
        Ok(Aggregator {
            asn,
            address: Ipv4Addr::from(address),
        })
    }
}

/// Multiprotocol reachable NLRI.
///
/// ```text
/// +---------------------------------------------------------+
/// | Address Family Identifier (2 octets)                    |
/// +---------------------------------------------------------+
/// | Subsequent Address Family Identifier (1 octet)          |
/// +---------------------------------------------------------+
/// | Length of Next Hop Network Address (1 octet)            |
/// +---------------------------------------------------------+
/// | Network Address of Next Hop (variable)                  |
/// +---------------------------------------------------------+
/// | Reserved (1 octet)                                      |
/// +---------------------------------------------------------+
/// | Network Layer Reachability Information (variable)       |
/// +---------------------------------------------------------+
/// ```
///
/// Ref: RFC 4760 §3
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct MpReachNlri {
    pub family: AddressFamily,
    pub nexthop: BgpNexthop,
    pub nlri: Vec<Nlri>,
}

impl MpReachNlri {
    pub fn to_wire(&self, ctx: &CodecContext) -> Result<Vec<u8>, Error> {
        let mut buf = self.family.to_wire().to_vec();
        let nh = self.nexthop.to_wire(self.family);
        buf.push(nh.len() as u8);
        buf.extend_from_slice(&nh);
        buf.push(0);
        buf.extend_from_slice(&NlriCodec::encode_reachable(
            &self.nlri,
            self.family,
            ctx.path_ids(self.family),
        )?);
        Ok(buf)
    }

    pub fn from_wire(
        input: &[u8],
        ctx: &CodecContext,
    ) -> Result<MpReachNlri, Error> {
        let (input, family) = AddressFamily::from_wire(input)?;
        let (input, nh_len) = parse_u8(input)?;
        let (input, nh) = take(nh_len)(input)?;
        let nexthop = BgpNexthop::from_wire(nh, family)?;
        let (input, _reserved) = parse_u8(input)?;
        let nlri =
            NlriCodec::decode_reachable(input, family, ctx.path_ids(family))?;
        Ok(MpReachNlri {
            family,
            nexthop,
            nlri,
        })
    }

    /// Recover the address family and NLRI of an attribute whose next hop
    /// could not be decoded so that the routes can be withdrawn.
    pub fn salvage(
        input: &[u8],
        ctx: &CodecContext,
    ) -> Option<(AddressFamily, Vec<Nlri>)> {
        let (input, family) = AddressFamily::from_wire(input).ok()?;
        let (input, nh_len) = parse_u8::<_, (&[u8], nom::error::ErrorKind)>(
            input,
        )
        .ok()?;
        let (input, _nh) =
            take::<_, _, (&[u8], nom::error::ErrorKind)>(nh_len)(input).ok()?;
        let input = input.get(1..)?;
        let nlri =
            NlriCodec::decode_unreachable(input, family, ctx.path_ids(family))
                .ok()?;
        Some((family, nlri))
    }
}

/// Multiprotocol unreachable NLRI.
///
/// Ref: RFC 4760 §4
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct MpUnreachNlri {
    pub family: AddressFamily,
    pub withdrawn: Vec<Nlri>,
}

impl MpUnreachNlri {
    pub fn to_wire(&self, ctx: &CodecContext) -> Result<Vec<u8>, Error> {
        let mut buf = self.family.to_wire().to_vec();
        buf.extend_from_slice(&NlriCodec::encode_unreachable(
            &self.withdrawn,
            self.family,
            ctx.path_ids(self.family),
        )?);
        Ok(buf)
    }

    pub fn from_wire(
        input: &[u8],
        ctx: &CodecContext,
    ) -> Result<MpUnreachNlri, Error> {
        let (input, family) = AddressFamily::from_wire(input)?;
        let withdrawn =
            NlriCodec::decode_unreachable(input, family, ctx.path_ids(family))?;
        Ok(MpUnreachNlri { family, withdrawn })
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum PathAttributeValue {
    Origin(PathOrigin),
    AsPath(AsPath),
    NextHop(Ipv4Addr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator(Aggregator),
    Communities(Vec<Community>),
    OriginatorId(Ipv4Addr),
    ClusterList(Vec<Ipv4Addr>),
    MpReachNlri(MpReachNlri),
    MpUnreachNlri(MpUnreachNlri),
    ExtendedCommunities(Vec<ExtendedCommunity>),
    As4Path(AsPath),
    As4Aggregator(Aggregator),
    /// An optional transitive attribute this implementation does not
    /// understand, carried verbatim.
    Unknown { type_code: u8, value: Vec<u8> },
}

impl PathAttributeValue {
    pub fn type_code(&self) -> u8 {
        let code = match self {
            Self::Origin(_) => PathAttributeTypeCode::Origin,
            Self::AsPath(_) => PathAttributeTypeCode::AsPath,
            Self::NextHop(_) => PathAttributeTypeCode::NextHop,
            Self::MultiExitDisc(_) => PathAttributeTypeCode::MultiExitDisc,
            Self::LocalPref(_) => PathAttributeTypeCode::LocalPref,
            Self::AtomicAggregate => PathAttributeTypeCode::AtomicAggregate,
            Self::Aggregator(_) => PathAttributeTypeCode::Aggregator,
            Self::Communities(_) => PathAttributeTypeCode::Communities,
            Self::OriginatorId(_) => PathAttributeTypeCode::OriginatorId,
            Self::ClusterList(_) => PathAttributeTypeCode::ClusterList,
            Self::MpReachNlri(_) => PathAttributeTypeCode::MpReachNlri,
            Self::MpUnreachNlri(_) => PathAttributeTypeCode::MpUnreachNlri,
            Self::ExtendedCommunities(_) => {
                PathAttributeTypeCode::ExtendedCommunities
            }
            Self::As4Path(_) => PathAttributeTypeCode::As4Path,
            Self::As4Aggregator(_) => PathAttributeTypeCode::As4Aggregator,
            Self::Unknown { type_code, .. } => return *type_code,
        };
        code.into()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PathAttribute {
    pub flags: u8,
    pub value: PathAttributeValue,
}

impl PathAttribute {
    pub fn type_code(&self) -> u8 {
        self.value.type_code()
    }

    pub fn is_optional(&self) -> bool {
        self.flags & path_attribute_flags::OPTIONAL != 0
    }

    pub fn is_transitive(&self) -> bool {
        self.flags & path_attribute_flags::TRANSITIVE != 0
    }
}

impl From<PathAttributeValue> for PathAttribute {
    fn from(value: PathAttributeValue) -> Self {
        let flags = match &value {
            PathAttributeValue::Unknown { .. } => {
                path_attribute_flags::OPTIONAL
                    | path_attribute_flags::TRANSITIVE
            }
            v => PathAttributeTypeCode::try_from(v.type_code())
                .map(|c| c.flags())
                .unwrap_or(path_attribute_flags::OPTIONAL),
        };
        Self { flags, value }
    }
}

/// The path attributes of a route, keyed and ordered by type code. Values
/// are never changed in place; the `with*` methods return a new bag.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct Attributes(BTreeMap<u8, PathAttribute>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathAttribute> {
        self.0.values()
    }

    pub fn contains(&self, code: PathAttributeTypeCode) -> bool {
        self.0.contains_key(&u8::from(code))
    }

    pub fn get(&self, code: PathAttributeTypeCode) -> Option<&PathAttribute> {
        self.0.get(&u8::from(code))
    }

    pub fn get_raw(&self, code: u8) -> Option<&PathAttribute> {
        self.0.get(&code)
    }

    pub fn value(
        &self,
        code: PathAttributeTypeCode,
    ) -> Option<&PathAttributeValue> {
        self.get(code).map(|a| &a.value)
    }

    /// A copy of this bag with `attr` added, replacing any attribute of the
    /// same type.
    pub fn with(&self, attr: PathAttribute) -> Attributes {
        let mut map = self.0.clone();
        map.insert(attr.type_code(), attr);
        Attributes(map)
    }

    pub fn with_value(&self, value: PathAttributeValue) -> Attributes {
        self.with(value.into())
    }

    pub fn without(&self, code: PathAttributeTypeCode) -> Attributes {
        let mut map = self.0.clone();
        map.remove(&u8::from(code));
        Attributes(map)
    }

    pub fn retain<F>(&self, mut f: F) -> Attributes
    where
        F: FnMut(&PathAttribute) -> bool,
    {
        Attributes(
            self.0
                .iter()
                .filter(|(_, a)| f(a))
                .map(|(k, a)| (*k, a.clone()))
                .collect(),
        )
    }

    pub fn origin(&self) -> Option<PathOrigin> {
        match self.value(PathAttributeTypeCode::Origin) {
            Some(PathAttributeValue::Origin(o)) => Some(*o),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&AsPath> {
        match self.value(PathAttributeTypeCode::AsPath) {
            Some(PathAttributeValue::AsPath(p)) => Some(p),
            _ => None,
        }
    }

    pub fn next_hop(&self) -> Option<Ipv4Addr> {
        match self.value(PathAttributeTypeCode::NextHop) {
            Some(PathAttributeValue::NextHop(nh)) => Some(*nh),
            _ => None,
        }
    }

    pub fn med(&self) -> Option<u32> {
        match self.value(PathAttributeTypeCode::MultiExitDisc) {
            Some(PathAttributeValue::MultiExitDisc(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn local_pref(&self) -> Option<u32> {
        match self.value(PathAttributeTypeCode::LocalPref) {
            Some(PathAttributeValue::LocalPref(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn communities(&self) -> &[Community] {
        match self.value(PathAttributeTypeCode::Communities) {
            Some(PathAttributeValue::Communities(c)) => c,
            _ => &[],
        }
    }

    pub fn has_community(&self, community: Community) -> bool {
        self.communities().contains(&community)
    }

    pub fn extended_communities(&self) -> &[ExtendedCommunity] {
        match self.value(PathAttributeTypeCode::ExtendedCommunities) {
            Some(PathAttributeValue::ExtendedCommunities(c)) => c,
            _ => &[],
        }
    }

    pub fn originator_id(&self) -> Option<Ipv4Addr> {
        match self.value(PathAttributeTypeCode::OriginatorId) {
            Some(PathAttributeValue::OriginatorId(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn cluster_list(&self) -> &[Ipv4Addr] {
        match self.value(PathAttributeTypeCode::ClusterList) {
            Some(PathAttributeValue::ClusterList(c)) => c,
            _ => &[],
        }
    }
}

impl FromIterator<PathAttribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = PathAttribute>>(iter: I) -> Self {
        Attributes(iter.into_iter().map(|a| (a.type_code(), a)).collect())
    }
}

impl FromIterator<PathAttributeValue> for Attributes {
    fn from_iter<I: IntoIterator<Item = PathAttributeValue>>(iter: I) -> Self {
        iter.into_iter().map(PathAttribute::from).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use pretty_hex::*;

    #[test]
    fn as_path_length_rules() {
        let path = AsPath(vec![
            AsPathSegment {
                typ: AsPathType::AsConfedSequence,
                value: vec![64512, 64513],
            },
            AsPathSegment::sequence(vec![65000, 65001]),
            AsPathSegment::set(vec![1, 2, 3]),
        ]);
        assert_eq!(path.path_length(), 3);
        assert_eq!(path.first_as(), Some(65000));
        assert!(path.contains(2));
        assert_eq!(path.without_confed().segments().len(), 2);
    }

    #[test]
    fn first_as_of_leading_set_is_none() {
        let path = AsPath(vec![AsPathSegment::set(vec![65000])]);
        assert_eq!(path.first_as(), None);
        assert_eq!(AsPath::default().first_as(), None);
    }

    #[test]
    fn prepend_merges_into_sequence() {
        let path = AsPath(vec![AsPathSegment::sequence(vec![65001])]);
        assert_eq!(
            path.prepend(65000),
            AsPath(vec![AsPathSegment::sequence(vec![65000, 65001])])
        );

        let path = AsPath(vec![AsPathSegment::set(vec![65001])]);
        assert_eq!(
            path.prepend(65000),
            AsPath(vec![
                AsPathSegment::sequence(vec![65000]),
                AsPathSegment::set(vec![65001]),
            ])
        );

        let full = AsPath(vec![AsPathSegment::sequence(vec![1; 255])]);
        let prepended = full.prepend(2);
        assert_eq!(prepended.segments().len(), 2);
        assert_eq!(prepended.path_length(), 256);
    }

    #[test]
    fn as_path_two_and_four_octet() {
        let path = AsPath(vec![AsPathSegment::sequence(vec![65000, 4_200_000_000])]);
        let buf = path.to_wire(true).unwrap();
        println!("as4 path: {}", buf.hex_dump());
        assert_eq!(AsPath::from_wire(&buf, true).unwrap(), path);

        let buf = path.to_wire(false).unwrap();
        assert_eq!(buf, vec![2, 2, 0xfd, 0xe8, 0x5b, 0xa0]);
        assert_eq!(
            AsPath::from_wire(&buf, false).unwrap(),
            AsPath(vec![AsPathSegment::sequence(vec![65000, 23456])])
        );
    }

    #[test]
    fn as_path_truncated_segment() {
        assert!(AsPath::from_wire(&[2, 2, 0, 0, 0xfd, 0xe8], true).is_err());
        assert!(AsPath::from_wire(&[9, 1, 0, 0, 0, 1], true).is_err());
    }

    #[test]
    fn attributes_are_replaced_not_merged() {
        let attrs: Attributes = [
            PathAttributeValue::Origin(PathOrigin::Igp),
            PathAttributeValue::LocalPref(100),
        ]
        .into_iter()
        .collect();
        let updated = attrs.with_value(PathAttributeValue::LocalPref(200));
        assert_eq!(attrs.local_pref(), Some(100));
        assert_eq!(updated.local_pref(), Some(200));
        assert_eq!(updated.len(), 2);

        let stripped = updated.without(PathAttributeTypeCode::LocalPref);
        assert_eq!(stripped.local_pref(), None);
        assert_eq!(stripped.origin(), Some(PathOrigin::Igp));
    }

    #[test]
    fn canonical_flags_from_value() {
        let a = PathAttribute::from(PathAttributeValue::MultiExitDisc(5));
        assert_eq!(a.flags, path_attribute_flags::OPTIONAL);
        let a = PathAttribute::from(PathAttributeValue::Communities(vec![]));
        assert!(a.is_optional() && a.is_transitive());
        let a = PathAttribute::from(PathAttributeValue::Origin(PathOrigin::Egp));
        assert!(!a.is_optional() && a.is_transitive());
    }

    #[test]
    fn aggregator_widths() {
        let agg = Aggregator {
            asn: 65000,
            address: Ipv4Addr::new(192, 0, 2, 1),
        };
        assert_eq!(agg.to_wire(false).len(), 6);
        assert_eq!(Aggregator::from_wire(&agg.to_wire(true), true).unwrap(), agg);
        assert_eq!(
            Aggregator::from_wire(&agg.to_wire(false), false).unwrap(),
            agg
        );
    }
}
