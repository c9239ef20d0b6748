// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::{AddPathMode, DecisionConfig};
use crate::environment::Environment;
use crate::types::{BestPath, Path, RouteEntry};
use bgp::communities::Community;
use bgp::policy::PeerRole;
use itertools::Itertools;

/// The bestpath algorithm selects the preferred paths for a destination
/// from the paths held in its route entry. Only paths whose next hop is
/// reachable are candidates. The single best path is found by narrowing the
/// candidate set in the following ordered sequence of operations.
///
/// - if LLGR stale depreference is enabled, drop stale paths unless only
///   stale paths exist.
/// - filter to the paths with the largest local preference.
/// - filter to the paths with the smallest AS path length.
/// - filter to the paths with the lowest origin.
/// - filter to the paths with the smallest multi-exit discriminator (MED),
///   on a per neighboring AS basis unless MED is always compared.
/// - filter to externally learned paths if there are any.
/// - filter to the paths with the smallest IGP metric to their next hop.
/// - pick the path with the lowest originator BGP identifier, then the
///   shortest cluster list, then the lowest peer address.
///
/// With Add-Path the selection is repeated on the remaining candidates
/// until `mode` is satisfied, so the result is ordered by preference. The
/// result depends only on the contents of the entry, not on the order in
/// which paths were added.
pub fn select_best(
    entry: &RouteEntry,
    config: &DecisionConfig,
    mode: AddPathMode,
    env: &dyn Environment,
) -> BestPath {
    let mut candidates: Vec<&Path> = entry
        .paths
        .values()
        .filter(|p| env.is_next_hop_reachable(&p.nexthop))
        .collect();

    let mut paths = Vec::new();
    while paths.len() < mode.limit() {
        let Some(best) = best_of(&candidates, config, env) else {
            break;
        };
        candidates.retain(|p| p.key() != best.key());
        paths.push(best.clone());
    }
    BestPath { paths }
}

fn best_of<'a>(
    candidates: &[&'a Path],
    config: &DecisionConfig,
    env: &dyn Environment,
) -> Option<&'a Path> {
    // Short-circuit: if there's only 1 candidate, then it is the best
    if candidates.len() <= 1 {
        return candidates.first().copied();
    }

    // Paths tagged LLGR_STALE go in the `1` set and are only used when the
    // `0` set is empty.
    let candidates = if config.depreference_llgr_stale {
        candidates.iter().copied().min_set_by_key(|path| {
            usize::from(path.attributes.has_community(Community::LlgrStale))
        })
    } else {
        candidates.to_vec()
    };

    // Filter down to paths with the highest local preference
    let candidates = candidates.into_iter().max_set_by_key(|path| {
        path.attributes
            .local_pref()
            .unwrap_or(config.default_local_pref)
    });

    // Filter down to paths with the shortest AS-Path length
    let candidates = candidates.into_iter().min_set_by_key(|path| {
        path.attributes.as_path().map(|p| p.path_length()).unwrap_or(0)
    });

    // Filter down to paths with the lowest origin
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|path| path.attributes.origin());

    // Filter to paths with lowest MED, within each neighboring AS unless
    // configured to compare across ASes.
    let med = |path: &&Path| {
        path.attributes
            .med()
            .unwrap_or_else(|| config.missing_med.value())
    };
    let candidates: Vec<&Path> = if config.always_compare_med {
        candidates.into_iter().min_set_by_key(med)
    } else {
        candidates
            .into_iter()
            .into_group_map_by(|path| {
                path.attributes.as_path().and_then(|p| p.first_as())
            })
            .into_values()
            .flat_map(|paths| paths.into_iter().min_set_by_key(med))
            .collect()
    };

    // Prefer external paths over internal ones
    let candidates = if config.ebgp_over_ibgp {
        candidates.into_iter().min_set_by_key(|path| {
            usize::from(path.source.role != PeerRole::External)
        })
    } else {
        candidates
    };

    // Filter down to paths with the smallest IGP metric
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|path| env.igp_metric(&path.nexthop));

    // Final tie break, a total order over distinct paths
    candidates.into_iter().min_by_key(|path| {
        (
            path.originator(),
            path.attributes.cluster_list().len(),
            path.source.id,
            path.remote_path_id,
        )
    })
}
