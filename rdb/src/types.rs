// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bgp::attributes::Attributes;
use bgp::nlri::{AddPathKey, Destination, Nlri, RouteKey};
use bgp::policy::PeerRole;
use bgp::primitives::{AddressFamily, BgpNexthop};
use bgp::update::UpdateMessage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// A peer, identified by its transport address.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct PeerId(pub IpAddr);

impl PeerId {
    pub fn addr(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<IpAddr> for PeerId {
    fn from(addr: IpAddr) -> Self {
        Self(addr)
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct PeerInfo {
    pub id: PeerId,
    pub asn: u32,
    pub bgp_id: Ipv4Addr,
    pub role: PeerRole,

    /// Tables this peer exchanges routes for.
    pub families: BTreeSet<AddressFamily>,
}

impl PeerInfo {
    pub fn subscribes(&self, family: AddressFamily) -> bool {
        self.families.contains(&family)
    }
}

/// A route received from a peer, as held in the Adj-RIB-In.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// The peer the route was learned from, as known when it was received.
    pub source: PeerInfo,

    /// Path identifier received with the route, if any.
    pub remote_path_id: Option<u32>,

    /// Path identifier allocated by the route entry, used toward Add-Path
    /// peers.
    pub local_path_id: u32,

    /// The destination as received, labels included.
    pub destination: Destination,
    pub nexthop: BgpNexthop,
    pub attributes: Attributes,
}

impl Path {
    pub fn key(&self) -> PathKey {
        PathKey {
            peer: self.source.id,
            path_id: self.remote_path_id.unwrap_or(0),
        }
    }

    /// The BGP identifier used for the final tie break. Reflected routes
    /// use their ORIGINATOR_ID.
    ///
    /// Ref: RFC 4456 §9
    pub fn originator(&self) -> Ipv4Addr {
        self.attributes.originator_id().unwrap_or(self.source.bgp_id)
    }
}

/// Identifies one peer's contribution to a route entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct PathKey {
    pub peer: PeerId,
    pub path_id: u32,
}

/// The selected paths of a destination, most preferred first. Empty when
/// the destination has no usable path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BestPath {
    pub paths: Vec<Path>,
}

impl BestPath {
    pub fn best(&self) -> Option<&Path> {
        self.paths.first()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Everything known about one destination in one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub family: AddressFamily,
    pub key: RouteKey,

    /// The destination in canonical form.
    pub destination: Destination,
    pub paths: BTreeMap<PathKey, Path>,
    pub selected: BestPath,
    next_path_id: u32,
}

impl RouteEntry {
    pub fn new(
        family: AddressFamily,
        key: RouteKey,
        destination: Destination,
    ) -> Self {
        Self {
            family,
            key,
            destination: destination.canonical(),
            paths: BTreeMap::new(),
            selected: BestPath::default(),
            next_path_id: 1,
        }
    }

    /// Add or replace a peer's path. The local path identifier is kept when
    /// the path replaces an earlier one with the same key, otherwise a new
    /// one is allocated. Returns the local path identifier.
    pub fn upsert(&mut self, mut path: Path) -> u32 {
        let key = path.key();
        path.local_path_id = match self.paths.get(&key) {
            Some(existing) => existing.local_path_id,
            None => {
                let id = self.next_path_id;
                self.next_path_id = self.next_path_id.wrapping_add(1).max(1);
                id
            }
        };
        let id = path.local_path_id;
        self.paths.insert(key, path);
        id
    }

    pub fn remove(&mut self, key: &PathKey) -> Option<Path> {
        self.paths.remove(key)
    }

    /// Remove every path learned from `peer`.
    pub fn remove_peer(&mut self, peer: &PeerId) -> usize {
        let before = self.paths.len();
        self.paths.retain(|k, _| k.peer != *peer);
        before - self.paths.len()
    }

    pub fn has_peer(&self, peer: &PeerId) -> bool {
        self.paths.keys().any(|k| k.peer == *peer)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A path as sent to one peer after export policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPath {
    pub path_id: u32,
    pub source: PeerId,
    pub destination: Destination,
    pub nexthop: BgpNexthop,
    pub attributes: Attributes,
}

impl SelectedPath {
    /// Whether the peer would see the same route, ignoring which path it
    /// was derived from.
    pub fn same_content(&self, other: &SelectedPath) -> bool {
        self.destination == other.destination
            && self.nexthop == other.nexthop
            && self.attributes == other.attributes
    }
}

/// New or changed content to advertise to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertizedRoute {
    pub peer: PeerId,
    pub family: AddressFamily,
    pub key: RouteKey,
    pub add_path_key: AddPathKey,

    /// The NLRI to send, with a path identifier when the peer uses
    /// Add-Path for this family.
    pub nlri: Nlri,
    pub nexthop: BgpNexthop,
    pub attributes: Attributes,
}

/// Previously advertised content that must be withdrawn from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleBestPathRoute {
    pub peer: PeerId,
    pub family: AddressFamily,
    pub key: RouteKey,
    pub add_path_key: AddPathKey,
    pub nlri: Nlri,
}

/// Everything to send to one peer as the result of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerBatch {
    pub peer: PeerId,
    pub advertise: Vec<AdvertizedRoute>,
    pub withdraw: Vec<StaleBestPathRoute>,
}

impl PeerBatch {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            advertise: Vec::new(),
            withdraw: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.advertise.is_empty() && self.withdraw.is_empty()
    }

    /// Pack the batch into UPDATE messages: withdrawals first, one message
    /// per family, then one message per distinct family, next hop and
    /// attribute set.
    pub fn updates(&self) -> Vec<UpdateMessage> {
        let mut withdrawn: BTreeMap<AddressFamily, Vec<Nlri>> = BTreeMap::new();
        for w in &self.withdraw {
            withdrawn.entry(w.family).or_default().push(w.nlri.clone());
        }

        let mut announced: Vec<(AddressFamily, BgpNexthop, &Attributes, Vec<Nlri>)> =
            Vec::new();
        for a in &self.advertise {
            match announced.iter_mut().find(|(f, nh, attrs, _)| {
                *f == a.family && *nh == a.nexthop && **attrs == a.attributes
            }) {
                Some((_, _, _, nlri)) => nlri.push(a.nlri.clone()),
                None => announced.push((
                    a.family,
                    a.nexthop,
                    &a.attributes,
                    vec![a.nlri.clone()],
                )),
            }
        }

        withdrawn
            .into_iter()
            .map(|(family, nlri)| UpdateMessage::withdraw(family, nlri))
            .chain(announced.into_iter().map(|(family, nh, attrs, nlri)| {
                UpdateMessage::announce(family, nh, attrs, nlri)
            }))
            .collect()
    }
}
