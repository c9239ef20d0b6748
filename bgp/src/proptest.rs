// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for the UPDATE codec and policy
//!
//! These cover:
//! - Prefix and route distinguisher encoding
//! - NLRI encoding per address family, with and without path identifiers
//! - UPDATE bodies built from attribute bags
//! - Route reflection and loop suppression

use crate::attributes::{
    AsPath, AsPathSegment, Attributes, PathAttributeValue, PathOrigin,
};
use crate::communities::{Community, ExtendedCommunity};
use crate::nlri::{Destination, Nlri, NlriCodec};
use crate::policy::{PeerRole, Policy, PolicyConfig};
use crate::prefix::{Prefix, Prefix4, Prefix6};
use crate::primitives::{
    AddressFamily, BgpNexthop, MplsLabel, RouteDistinguisher,
};
use crate::update::{CodecContext, UpdateCodec, UpdateMessage};
use bgp_common::log::discard_logger;
use proptest::prelude::*;
use std::net::{Ipv4Addr, Ipv6Addr};

// =============================================================================
// Primitive Strategies
// =============================================================================

fn ipv4_prefix_strategy() -> impl Strategy<Value = Prefix4> {
    (any::<u32>(), 0u8..=32u8).prop_map(|(addr_bits, length)| {
        Prefix4::new(Ipv4Addr::from(addr_bits), length)
    })
}

fn ipv6_prefix_strategy() -> impl Strategy<Value = Prefix6> {
    (any::<u128>(), 0u8..=128u8).prop_map(|(addr_bits, length)| {
        Prefix6::new(Ipv6Addr::from(addr_bits), length)
    })
}

fn rd_strategy() -> impl Strategy<Value = RouteDistinguisher> {
    prop_oneof![
        (any::<u16>(), any::<u32>())
            .prop_map(|(asn, number)| RouteDistinguisher::As2 { asn, number }),
        (any::<u32>(), any::<u16>()).prop_map(|(addr, number)| {
            RouteDistinguisher::Ipv4 {
                addr: Ipv4Addr::from(addr),
                number,
            }
        }),
        (any::<u32>(), any::<u16>())
            .prop_map(|(asn, number)| RouteDistinguisher::As4 { asn, number }),
    ]
}

/// Labels below the range whose encoding collides with the withdraw
/// sentinel.
fn labels_strategy() -> impl Strategy<Value = Vec<MplsLabel>> {
    prop::collection::vec(
        (16u32..0x7FFFF).prop_map(|v| MplsLabel::new(v).unwrap()),
        1..3,
    )
}

// =============================================================================
// NLRI Strategies
// =============================================================================

/// A family together with a list of destinations shaped for it.
fn family_nlri_strategy(
) -> impl Strategy<Value = (AddressFamily, Vec<Destination>)> {
    prop_oneof![
        prop::collection::vec(ipv4_prefix_strategy(), 0..5).prop_map(|p| {
            (
                AddressFamily::IPV4_UNICAST,
                p.into_iter().map(Destination::from).collect(),
            )
        }),
        prop::collection::vec(ipv6_prefix_strategy(), 0..5).prop_map(|p| {
            (
                AddressFamily::IPV6_UNICAST,
                p.into_iter().map(Destination::from).collect(),
            )
        }),
        prop::collection::vec(
            (labels_strategy(), ipv4_prefix_strategy()),
            0..5
        )
        .prop_map(|v| {
            (
                AddressFamily::IPV4_LABELED,
                v.into_iter()
                    .map(|(labels, p)| Destination::Labeled {
                        labels,
                        prefix: p.into(),
                    })
                    .collect(),
            )
        }),
        prop::collection::vec(
            (labels_strategy(), rd_strategy(), ipv6_prefix_strategy()),
            0..5
        )
        .prop_map(|v| {
            (
                AddressFamily::IPV6_VPN,
                v.into_iter()
                    .map(|(labels, rd, p)| Destination::Vpn {
                        labels,
                        rd,
                        prefix: p.into(),
                    })
                    .collect(),
            )
        }),
    ]
}

// =============================================================================
// Attribute Strategies
// =============================================================================

fn path_origin_strategy() -> impl Strategy<Value = PathOrigin> {
    prop_oneof![
        Just(PathOrigin::Igp),
        Just(PathOrigin::Egp),
        Just(PathOrigin::Incomplete),
    ]
}

fn as_path_strategy() -> impl Strategy<Value = AsPath> {
    prop::collection::vec(
        prop_oneof![
            prop::collection::vec(any::<u32>(), 1..5)
                .prop_map(AsPathSegment::sequence),
            prop::collection::vec(any::<u32>(), 1..5)
                .prop_map(AsPathSegment::set),
        ],
        0..3,
    )
    .prop_map(AsPath)
}

/// Attribute bags that are valid on an announcement: ORIGIN and AS_PATH are
/// always present.
fn attributes_strategy() -> impl Strategy<Value = Attributes> {
    (
        path_origin_strategy(),
        as_path_strategy(),
        prop::option::of(any::<u32>()),
        prop::option::of(any::<u32>()),
        prop::collection::vec(any::<u32>().prop_map(Community::from), 0..4),
        prop::collection::vec(
            (any::<u16>(), any::<u32>()).prop_map(|(asn, local)| {
                ExtendedCommunity::route_target_as2(asn, local)
            }),
            0..3,
        ),
    )
        .prop_map(|(origin, path, med, local_pref, communities, ext)| {
            let mut attrs: Attributes = [
                PathAttributeValue::Origin(origin),
                PathAttributeValue::AsPath(path),
            ]
            .into_iter()
            .collect();
            if let Some(med) = med {
                attrs = attrs.with_value(PathAttributeValue::MultiExitDisc(med));
            }
            if let Some(lp) = local_pref {
                attrs = attrs.with_value(PathAttributeValue::LocalPref(lp));
            }
            if !communities.is_empty() {
                attrs = attrs
                    .with_value(PathAttributeValue::Communities(communities));
            }
            if !ext.is_empty() {
                attrs = attrs
                    .with_value(PathAttributeValue::ExtendedCommunities(ext));
            }
            attrs
        })
}

fn nexthop_for(family: AddressFamily, bits: u128) -> BgpNexthop {
    match family.afi {
        crate::primitives::Afi::Ipv4 => {
            BgpNexthop::Ipv4(Ipv4Addr::from(bits as u32))
        }
        _ => BgpNexthop::Ipv6Single(Ipv6Addr::from(bits)),
    }
}

fn role_strategy() -> impl Strategy<Value = PeerRole> {
    prop_oneof![
        Just(PeerRole::External),
        Just(PeerRole::Internal),
        Just(PeerRole::RouteReflectorClient),
        Just(PeerRole::InternalConfederation),
    ]
}

fn policy() -> Policy {
    Policy::new(
        PolicyConfig::new(64512, Ipv4Addr::new(192, 0, 2, 1)),
        discard_logger(),
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Property: prefixes survive a trip through the wire
    #[test]
    fn prop_prefix_round_trip(
        p4 in ipv4_prefix_strategy(),
        p6 in ipv6_prefix_strategy(),
    ) {
        let wire4 = p4.to_wire();
        let (rest, decoded) = Prefix4::from_wire(&wire4).unwrap();
        prop_assert!(rest.is_empty());
        prop_assert_eq!(decoded, p4);
        let wire6 = p6.to_wire();
        let (rest, decoded) = Prefix6::from_wire(&wire6).unwrap();
        prop_assert!(rest.is_empty());
        prop_assert_eq!(decoded, p6);
    }

    /// Property: route distinguishers always occupy eight bytes
    #[test]
    fn prop_rd_round_trip(rd in rd_strategy(), tail in any::<u8>()) {
        let mut buf = rd.to_wire().to_vec();
        buf.push(tail);
        let (rest, decoded) = RouteDistinguisher::from_wire(&buf).unwrap();
        prop_assert_eq!(rest, &[tail][..]);
        prop_assert_eq!(decoded, rd);
    }

    /// Property: reachable NLRI decode to what was encoded
    #[test]
    fn prop_nlri_round_trip(
        (family, dests) in family_nlri_strategy(),
        path_ids in any::<bool>(),
        base_id in any::<u32>(),
    ) {
        let nlri: Vec<Nlri> = dests
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                if path_ids {
                    Nlri::with_path_id(d, base_id.wrapping_add(i as u32))
                } else {
                    Nlri::new(d)
                }
            })
            .collect();
        let buf = NlriCodec::encode_reachable(&nlri, family, path_ids).unwrap();
        let decoded =
            NlriCodec::decode_reachable(&buf, family, path_ids).unwrap();
        prop_assert_eq!(decoded, nlri);
    }

    /// Property: withdrawn NLRI decode to their canonical form and share the
    /// route key of the announced destination
    #[test]
    fn prop_withdraw_matches_route_key(
        (family, dests) in family_nlri_strategy(),
    ) {
        let nlri: Vec<Nlri> = dests.into_iter().map(Nlri::new).collect();
        let buf = NlriCodec::encode_unreachable(&nlri, family, false).unwrap();
        let decoded =
            NlriCodec::decode_unreachable(&buf, family, false).unwrap();
        prop_assert_eq!(decoded.len(), nlri.len());
        for (d, n) in decoded.iter().zip(nlri.iter()) {
            prop_assert_eq!(&d.destination, &n.destination.canonical());
            prop_assert_eq!(
                d.destination.route_key().unwrap(),
                n.destination.route_key().unwrap()
            );
        }
    }

    /// Property: an announcement decodes to its attributes and routes
    #[test]
    fn prop_update_round_trip(
        (family, dests) in family_nlri_strategy(),
        attrs in attributes_strategy(),
        nh in any::<u128>(),
    ) {
        prop_assume!(!dests.is_empty());
        let ctx = CodecContext::default();
        let codec = UpdateCodec::new(discard_logger());
        let nlri: Vec<Nlri> = dests.into_iter().map(Nlri::new).collect();
        let nexthop = nexthop_for(family, nh);
        let msg = UpdateMessage::announce(family, nexthop, &attrs, nlri.clone());
        let buf = codec.encode(&msg, &ctx).unwrap();

        prop_assert_eq!(codec.decode_message(&buf, &ctx).unwrap(), msg);

        let update = codec.decode(&buf, &ctx).unwrap();
        prop_assert!(!update.treat_as_withdraw);
        prop_assert_eq!(update.attributes, attrs);
        prop_assert_eq!(update.announced.len(), 1);
        prop_assert_eq!(update.announced[0].family, family);
        prop_assert_eq!(update.announced[0].nexthop, nexthop);
        prop_assert_eq!(&update.announced[0].nlri, &nlri);
    }

    /// Property: reflecting an already reflected route changes nothing
    #[test]
    fn prop_reflection_idempotent(
        attrs in attributes_strategy(),
        from in prop_oneof![
            Just(PeerRole::Internal),
            Just(PeerRole::RouteReflectorClient),
        ],
        source in any::<u32>(),
    ) {
        let p = policy();
        let source = Ipv4Addr::from(source);
        let to = PeerRole::RouteReflectorClient;
        let once = p.apply_export(from, to, source, &attrs);
        prop_assume!(once.is_some());
        let once = once.unwrap();
        let twice = p.apply_export(from, to, source, &once).unwrap();
        prop_assert_eq!(twice.cluster_list(), once.cluster_list());
        prop_assert_eq!(twice.originator_id(), once.originator_id());
        prop_assert_eq!(
            once.cluster_list()
                .iter()
                .filter(|c| **c == p.cluster_id())
                .count(),
            1
        );
    }

    /// Property: routes carrying the local identifier as originator are
    /// never imported
    #[test]
    fn prop_import_rejects_own_originator(
        attrs in attributes_strategy(),
        role in role_strategy(),
    ) {
        let p = policy();
        let attrs = attrs.with_value(
            PathAttributeValue::OriginatorId(p.config.local_id),
        );
        prop_assert!(p.apply_import(role, &attrs).is_none());
    }
}
