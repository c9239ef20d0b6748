// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turning best path changes into per peer advertisements.
//!
//! What a peer has been sent is a function of the previous best paths and
//! export policy, so nothing per peer is stored here. Both the previous and
//! the new best paths are run through export policy for each subscriber and
//! the two results are compared.

use crate::environment::Environment;
use crate::types::{
    AdvertizedRoute, BestPath, PeerId, PeerInfo, SelectedPath,
    StaleBestPathRoute,
};
use bgp::nlri::{Destination, Nlri, RouteKey};
use bgp::policy::Policy;
use bgp::primitives::AddressFamily;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advertisement {
    Advertise(AdvertizedRoute),
    Withdraw(StaleBestPathRoute),
}

impl Advertisement {
    pub fn peer(&self) -> PeerId {
        match self {
            Self::Advertise(a) => a.peer,
            Self::Withdraw(w) => w.peer,
        }
    }
}

/// The routes `peer` receives for a destination given its best paths,
/// keyed by the path identifier they are sent under. Peers without Add-Path
/// get the single best path under identifier 0.
pub fn exports(
    family: AddressFamily,
    best: &BestPath,
    peer: &PeerInfo,
    policy: &Policy,
    env: &dyn Environment,
) -> BTreeMap<u32, SelectedPath> {
    let add_path = env.negotiated_capabilities(&peer.id, family).add_path;
    let candidates = if add_path {
        &best.paths[..]
    } else {
        &best.paths[..best.paths.len().min(1)]
    };

    let mut result = BTreeMap::new();
    for path in candidates {
        // Never send a route back where it came from.
        if path.source.id == peer.id {
            continue;
        }
        let Some(attributes) = policy.apply_export(
            path.source.role,
            peer.role,
            path.source.bgp_id,
            &path.attributes,
        ) else {
            continue;
        };
        let slot = if add_path { path.local_path_id } else { 0 };
        result.insert(
            slot,
            SelectedPath {
                path_id: path.local_path_id,
                source: path.source.id,
                destination: path.destination.clone(),
                nexthop: path.nexthop,
                attributes,
            },
        );
    }
    result
}

/// Compare what each subscriber is sent under `previous` and `next` and
/// produce the advertisements and withdrawals that take it from one to the
/// other. `destination` is the canonical destination of the route entry.
#[allow(clippy::too_many_arguments)]
pub fn reconcile(
    family: AddressFamily,
    key: &RouteKey,
    destination: &Destination,
    previous: &BestPath,
    next: &BestPath,
    subscribers: &[PeerInfo],
    policy: &Policy,
    env: &dyn Environment,
) -> Vec<Advertisement> {
    let mut result = Vec::new();
    for peer in subscribers.iter().filter(|p| p.subscribes(family)) {
        let add_path = env.negotiated_capabilities(&peer.id, family).add_path;
        let before = exports(family, previous, peer, policy, env);
        let after = exports(family, next, peer, policy, env);
        let path_id = |id: u32| if add_path { Some(id) } else { None };

        for (slot, old) in &before {
            if after.contains_key(slot) {
                continue;
            }
            result.push(Advertisement::Withdraw(StaleBestPathRoute {
                peer: peer.id,
                family,
                key: key.clone(),
                add_path_key: key.with_path_id(old.path_id),
                nlri: Nlri {
                    path_id: path_id(old.path_id),
                    destination: destination.clone(),
                },
            }));
        }

        for (slot, new) in after {
            if before.get(&slot).is_some_and(|old| old.same_content(&new)) {
                continue;
            }
            result.push(Advertisement::Advertise(AdvertizedRoute {
                peer: peer.id,
                family,
                key: key.clone(),
                add_path_key: key.with_path_id(new.path_id),
                nlri: Nlri {
                    path_id: path_id(new.path_id),
                    destination: new.destination,
                },
                nexthop: new.nexthop,
                attributes: new.attributes,
            }));
        }
    }
    result
}
