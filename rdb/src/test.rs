// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test utilities for rdb tests.

use crate::config::RibConfig;
use crate::environment::{Capabilities, Environment};
use crate::types::{Path, PeerId, PeerInfo};
use crate::Db;
use bgp::attributes::{
    AsPath, AsPathSegment, Attributes, PathAttributeValue, PathOrigin,
};
use bgp::nlri::{Destination, Nlri};
use bgp::policy::{PeerRole, PolicyConfig};
use bgp::prefix::Prefix;
use bgp::primitives::{AddressFamily, BgpNexthop};
use bgp::update::{Announcement, RouteUpdate, Withdrawal};
use bgp_common::log::discard_logger;
use bgp_common::{read_lock, write_lock};
use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};
use std::ops::Deref;
use std::sync::{Arc, RwLock};

/// The local AS used by [`TestDb`].
pub const TEST_LOCAL_ASN: u32 = 65000;

/// The local router id used by [`TestEnvironment`].
pub const TEST_LOCAL_ID: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// An environment where every next hop is reachable at metric 0 and no
/// peer uses Add-Path, until told otherwise.
#[derive(Default)]
pub struct TestEnvironment {
    unreachable: RwLock<BTreeSet<BgpNexthop>>,
    metrics: RwLock<BTreeMap<BgpNexthop, u32>>,
    capabilities: RwLock<BTreeMap<(PeerId, AddressFamily), Capabilities>>,
}

impl TestEnvironment {
    pub fn set_reachable(&self, nexthop: BgpNexthop, reachable: bool) {
        let mut unreachable = write_lock!(self.unreachable);
        if reachable {
            unreachable.remove(&nexthop);
        } else {
            unreachable.insert(nexthop);
        }
    }

    pub fn set_igp_metric(&self, nexthop: BgpNexthop, metric: u32) {
        write_lock!(self.metrics).insert(nexthop, metric);
    }

    pub fn set_capabilities(
        &self,
        peer: PeerId,
        family: AddressFamily,
        caps: Capabilities,
    ) {
        write_lock!(self.capabilities).insert((peer, family), caps);
    }
}

impl Environment for TestEnvironment {
    fn is_next_hop_reachable(&self, nexthop: &BgpNexthop) -> bool {
        !read_lock!(self.unreachable).contains(nexthop)
    }

    fn igp_metric(&self, nexthop: &BgpNexthop) -> u32 {
        read_lock!(self.metrics).get(nexthop).copied().unwrap_or(0)
    }

    fn local_bgp_identifier(&self) -> Ipv4Addr {
        TEST_LOCAL_ID
    }

    fn negotiated_capabilities(
        &self,
        peer: &PeerId,
        family: AddressFamily,
    ) -> Capabilities {
        read_lock!(self.capabilities)
            .get(&(*peer, family))
            .copied()
            .unwrap_or_default()
    }
}

/// Build an IPv4 unicast peer whose router id is its address.
pub fn peer(addr: &str, asn: u32, role: PeerRole) -> PeerInfo {
    let bgp_id: Ipv4Addr = addr.parse().expect("parse peer address");
    PeerInfo {
        id: PeerId(IpAddr::V4(bgp_id)),
        asn,
        bgp_id,
        role,
        families: BTreeSet::from([AddressFamily::IPV4_UNICAST]),
    }
}

/// Attributes of a route from `source`: IGP origin, an AS path holding the
/// peer's AS for external peers and empty otherwise, and the given MED.
pub fn attributes(source: &PeerInfo, med: u32) -> Attributes {
    let asns = if source.role == PeerRole::External {
        vec![source.asn]
    } else {
        vec![]
    };
    let segments = if asns.is_empty() {
        vec![]
    } else {
        vec![AsPathSegment::sequence(asns)]
    };
    [
        PathAttributeValue::Origin(PathOrigin::Igp),
        PathAttributeValue::AsPath(AsPath(segments)),
        PathAttributeValue::MultiExitDisc(med),
    ]
    .into_iter()
    .collect()
}

fn nexthop_of(source: &PeerInfo) -> BgpNexthop {
    match source.id.addr() {
        IpAddr::V4(a) => BgpNexthop::Ipv4(a),
        IpAddr::V6(a) => BgpNexthop::Ipv6Single(a),
    }
}

/// An IPv4 unicast path from `source` for `prefix`, next hop at the peer.
pub fn path(source: &PeerInfo, prefix: &str, med: u32) -> Path {
    let prefix: Prefix = prefix.parse().expect("parse prefix");
    Path {
        source: source.clone(),
        remote_path_id: None,
        local_path_id: 0,
        destination: Destination::Unicast(prefix),
        nexthop: nexthop_of(source),
        attributes: attributes(source, med),
    }
}

/// A received update announcing `prefixes` with `attrs`, next hop at the
/// peer.
pub fn announce(
    source: &PeerInfo,
    prefixes: &[&str],
    attrs: Attributes,
) -> RouteUpdate {
    RouteUpdate {
        attributes: attrs,
        announced: vec![Announcement {
            family: AddressFamily::IPV4_UNICAST,
            nexthop: nexthop_of(source),
            nlri: prefixes.iter().map(|p| unicast(p)).collect(),
        }],
        withdrawn: Vec::new(),
        treat_as_withdraw: false,
    }
}

pub fn withdraw(prefixes: &[&str]) -> RouteUpdate {
    RouteUpdate {
        withdrawn: vec![Withdrawal {
            family: AddressFamily::IPV4_UNICAST,
            nlri: prefixes.iter().map(|p| unicast(p)).collect(),
        }],
        ..Default::default()
    }
}

pub fn unicast(prefix: &str) -> Nlri {
    let prefix: Prefix = prefix.parse().expect("parse prefix");
    Nlri::new(Destination::Unicast(prefix))
}

/// A database over a [`TestEnvironment`] that tests can keep adjusting.
///
/// The wrapper implements `Deref`, so it can be used exactly like a regular
/// `Db`.
#[derive(Clone)]
pub struct TestDb {
    db: Db,
    env: Arc<TestEnvironment>,
}

impl TestDb {
    pub fn new() -> Self {
        Self::with_config(RibConfig::new(PolicyConfig::new(
            TEST_LOCAL_ASN,
            TEST_LOCAL_ID,
        )))
    }

    pub fn with_config(config: RibConfig) -> Self {
        let env = Arc::new(TestEnvironment::default());
        let db = Db::new(config, env.clone(), discard_logger());
        Self { db, env }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn env(&self) -> &TestEnvironment {
        &self.env
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestDb {
    type Target = Db;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}
