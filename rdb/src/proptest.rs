// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for the decision process
//!
//! These verify that selection depends only on the candidate paths and the
//! environment, never on the order paths were received in.

use crate::bestpath::select_best;
use crate::config::{AddPathMode, DecisionConfig, MissingMed};
use crate::environment::Environment;
use crate::test::{path, peer, unicast, TestEnvironment};
use crate::types::{PeerId, RouteEntry};
use bgp::attributes::{
    AsPath, AsPathSegment, PathAttributeTypeCode, PathAttributeValue,
    PathOrigin,
};
use bgp::policy::PeerRole;
use bgp::primitives::{AddressFamily, BgpNexthop};
use proptest::prelude::*;
use std::net::Ipv4Addr;

// =============================================================================
// Strategies
// =============================================================================

#[derive(Debug, Clone)]
struct Candidate {
    host: u8,
    asn: u32,
    external: bool,
    path_len: usize,
    origin: PathOrigin,
    med: Option<u32>,
    local_pref: Option<u32>,
}

fn candidate_strategy() -> impl Strategy<Value = Candidate> {
    (
        prop::sample::select(vec![65001u32, 65002, 65003]),
        any::<bool>(),
        1usize..4,
        prop::sample::select(vec![
            PathOrigin::Igp,
            PathOrigin::Egp,
            PathOrigin::Incomplete,
        ]),
        prop::option::of(0u32..4),
        prop::option::of(prop::sample::select(vec![50u32, 100, 200])),
    )
        .prop_map(|(asn, external, path_len, origin, med, local_pref)| {
            Candidate {
                host: 0,
                asn,
                external,
                path_len,
                origin,
                med,
                local_pref,
            }
        })
}

/// Up to eight candidates from distinct peers, and the same candidates in
/// a shuffled order.
fn candidates_strategy(
) -> impl Strategy<Value = (Vec<Candidate>, Vec<Candidate>)> {
    prop::collection::vec(candidate_strategy(), 1..8)
        .prop_map(|mut cs| {
            for (i, c) in cs.iter_mut().enumerate() {
                c.host = i as u8 + 1;
            }
            cs
        })
        .prop_flat_map(|cs| {
            let shuffled = Just(cs.clone()).prop_shuffle();
            (Just(cs), shuffled)
        })
}

fn decision_strategy() -> impl Strategy<Value = DecisionConfig> {
    (
        any::<bool>(),
        prop::sample::select(vec![MissingMed::Zero, MissingMed::Worst]),
    )
        .prop_map(|(always_compare_med, missing_med)| DecisionConfig {
            always_compare_med,
            missing_med,
            ..Default::default()
        })
}

fn entry_of(candidates: &[Candidate]) -> RouteEntry {
    let destination = unicast("198.51.100.0/24").destination;
    let mut entry = RouteEntry::new(
        AddressFamily::IPV4_UNICAST,
        destination.route_key().unwrap(),
        destination,
    );
    for c in candidates {
        let addr = format!("192.0.2.{}", c.host);
        let (asn, role) = if c.external {
            (c.asn, PeerRole::External)
        } else {
            (65000, PeerRole::Internal)
        };
        let source = peer(&addr, asn, role);
        let mut p = path(&source, "198.51.100.0/24", 0);
        let mut attrs = p
            .attributes
            .without(PathAttributeTypeCode::MultiExitDisc)
            .with_value(PathAttributeValue::Origin(c.origin))
            .with_value(PathAttributeValue::AsPath(AsPath(vec![
                AsPathSegment::sequence(vec![c.asn; c.path_len]),
            ])));
        if let Some(med) = c.med {
            attrs = attrs.with_value(PathAttributeValue::MultiExitDisc(med));
        }
        if let Some(lp) = c.local_pref {
            attrs = attrs.with_value(PathAttributeValue::LocalPref(lp));
        }
        p.attributes = attrs;
        entry.upsert(p);
    }
    entry
}

fn selected(
    entry: &RouteEntry,
    config: &DecisionConfig,
    mode: AddPathMode,
    env: &TestEnvironment,
) -> Vec<(PeerId, Option<u32>)> {
    select_best(entry, config, mode, env)
        .paths
        .iter()
        .map(|p| (p.source.id, p.remote_path_id))
        .collect()
}

// =============================================================================
// Decision Process Properties
// =============================================================================

proptest! {
    /// Property: selection does not depend on insertion order
    #[test]
    fn prop_selection_order_independent(
        (cs, shuffled) in candidates_strategy(),
        config in decision_strategy(),
        limit in 1usize..4,
    ) {
        let env = TestEnvironment::default();
        let a = entry_of(&cs);
        let b = entry_of(&shuffled);
        for mode in [AddPathMode::Disabled, AddPathMode::All, AddPathMode::Best(limit)] {
            prop_assert_eq!(
                selected(&a, &config, mode, &env),
                selected(&b, &config, mode, &env),
                "mode {:?}", mode
            );
        }
    }

    /// Property: Add-Path selection starts with the single best path and
    /// returns at most the configured number of distinct paths
    #[test]
    fn prop_add_path_extends_best(
        (cs, _) in candidates_strategy(),
        config in decision_strategy(),
        limit in 1usize..4,
    ) {
        let env = TestEnvironment::default();
        let entry = entry_of(&cs);
        let best = selected(&entry, &config, AddPathMode::Disabled, &env);
        let multi = selected(&entry, &config, AddPathMode::Best(limit), &env);
        prop_assert_eq!(best.len(), 1);
        prop_assert_eq!(multi.len(), limit.min(cs.len()));
        prop_assert_eq!(&multi[0], &best[0]);

        let mut dedup = multi.clone();
        dedup.sort();
        dedup.dedup();
        prop_assert_eq!(dedup.len(), multi.len());

        let all = selected(&entry, &config, AddPathMode::All, &env);
        prop_assert_eq!(all.len(), cs.len());
    }

    /// Property: paths with unreachable next hops are never selected
    #[test]
    fn prop_unreachable_never_selected(
        (cs, _) in candidates_strategy(),
        config in decision_strategy(),
        down in prop::collection::vec(any::<bool>(), 8),
    ) {
        let env = TestEnvironment::default();
        for (c, d) in cs.iter().zip(&down) {
            if *d {
                env.set_reachable(
                    BgpNexthop::Ipv4(Ipv4Addr::new(192, 0, 2, c.host)),
                    false,
                );
            }
        }
        let entry = entry_of(&cs);
        let reachable = cs.iter().zip(&down).filter(|(_, d)| !**d).count();
        let all = select_best(&entry, &config, AddPathMode::All, &env);
        prop_assert_eq!(all.len(), reachable);
        for p in &all.paths {
            prop_assert!(env.is_next_hop_reachable(&p.nexthop));
        }
    }
}
