// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The routing database (rdb).
//!
//! The database ties the Adj-RIB-In, the decision process, policy and
//! reconciliation together. Every operation returns the per peer batches
//! the transport layer must send; the database itself holds no per peer
//! output state and performs no I/O.
use crate::adj_rib_in::AdjRibIn;
use crate::bestpath::select_best;
use crate::config::RibConfig;
use crate::environment::Environment;
use crate::error::Error;
use crate::log::rdb_log;
use crate::reconcile::{reconcile, Advertisement};
use crate::types::*;
use bgp::nlri::{Destination, RouteKey};
use bgp::policy::Policy;
use bgp::primitives::AddressFamily;
use bgp::update::RouteUpdate;
use bgp_common::{read_lock, write_lock};
use slog::Logger;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct Db {
    rib: Arc<AdjRibIn>,

    /// Registered peers. Every peer is a subscriber for the families it
    /// lists.
    peers: Arc<RwLock<BTreeMap<PeerId, PeerInfo>>>,

    config: Arc<RibConfig>,
    policy: Arc<Policy>,
    env: Arc<dyn Environment>,
    log: Logger,
}

impl Db {
    /// Create a database. The local router and cluster identifiers come
    /// from `env`.
    pub fn new(
        config: RibConfig,
        env: Arc<dyn Environment>,
        log: Logger,
    ) -> Self {
        let mut policy = config.policy.clone();
        policy.local_id = env.local_bgp_identifier();
        policy.cluster_id = Some(env.local_cluster_id());
        Self {
            rib: Arc::new(AdjRibIn::new(log.clone())),
            peers: Arc::new(RwLock::new(BTreeMap::new())),
            config: Arc::new(config),
            policy: Arc::new(Policy::new(policy, log.clone())),
            env,
            log,
        }
    }

    pub fn rib(&self) -> &AdjRibIn {
        &self.rib
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn config(&self) -> &RibConfig {
        &self.config
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        read_lock!(self.peers).values().cloned().collect()
    }

    pub fn peer(&self, id: &PeerId) -> Option<PeerInfo> {
        read_lock!(self.peers).get(id).cloned()
    }

    /// Register a peer. Returns everything the peer must be sent to catch
    /// up with the current best paths.
    pub fn add_peer(&self, info: PeerInfo) -> Result<PeerBatch, Error> {
        {
            let mut peers = write_lock!(self.peers);
            if peers.contains_key(&info.id) {
                return Err(Error::PeerExists(info.id));
            }
            peers.insert(info.id, info.clone());
        }
        rdb_log!(self, info, "peer added";
            "peer" => info.id.to_string(),
            "asn" => info.asn,
            "role" => info.role.to_string()
        );

        let subscribers = [info.clone()];
        let mut advertisements = Vec::new();
        for family in self.rib.families() {
            if !info.subscribes(family) {
                continue;
            }
            for key in self.rib.keys(family) {
                let adv = self.rib.with_existing_entry(family, &key, |e| {
                    reconcile(
                        family,
                        &e.key,
                        &e.destination,
                        &BestPath::default(),
                        &e.selected,
                        &subscribers,
                        &self.policy,
                        self.env.as_ref(),
                    )
                });
                advertisements.extend(adv.unwrap_or_default());
            }
        }

        let mut batch = PeerBatch::new(info.id);
        for a in advertisements {
            match a {
                Advertisement::Advertise(a) => batch.advertise.push(a),
                Advertisement::Withdraw(w) => batch.withdraw.push(w),
            }
        }
        Ok(batch)
    }

    /// Unregister a peer and flush every route learned from it. Returns the
    /// resulting changes for the remaining peers.
    pub fn remove_peer(&self, id: &PeerId) -> Result<Vec<PeerBatch>, Error> {
        if write_lock!(self.peers).remove(id).is_none() {
            return Err(Error::UnknownPeer(*id));
        }

        // Updates from the peer that are still in flight check registration
        // under the entry lock, so nothing from it is added after this scan.
        let mut advertisements = Vec::new();
        for (family, key) in self.rib.keys_for_peer(id) {
            let adv = self.rib.with_existing_entry(family, &key, |e| {
                e.remove_peer(id);
                self.decide(e)
            });
            advertisements.extend(adv.unwrap_or_default());
        }
        rdb_log!(self, info, "peer removed";
            "peer" => id.to_string(),
            "changes" => advertisements.len()
        );
        Ok(batches(advertisements))
    }

    /// Apply a decoded UPDATE received from `from`. Withdrawals are
    /// processed before announcements. Routes rejected by import policy
    /// replace and so remove anything previously received for them.
    pub fn apply_update(
        &self,
        from: &PeerId,
        update: &RouteUpdate,
    ) -> Result<Vec<PeerBatch>, Error> {
        let source = self.peer(from).ok_or(Error::UnknownPeer(*from))?;
        let mut advertisements = Vec::new();

        for w in &update.withdrawn {
            let multi_path =
                self.env.negotiated_capabilities(from, w.family).multi_path;
            for nlri in &w.nlri {
                let pk = PathKey {
                    peer: *from,
                    path_id: if multi_path { nlri.path_id.unwrap_or(0) } else { 0 },
                };
                advertisements.extend(self.withdraw(
                    w.family,
                    &nlri.destination,
                    &pk,
                )?);
            }
        }

        let imported = self.policy.apply_import(source.role, &update.attributes);
        for a in &update.announced {
            let multi_path =
                self.env.negotiated_capabilities(from, a.family).multi_path;
            for nlri in &a.nlri {
                let remote_path_id =
                    if multi_path { nlri.path_id } else { None };
                let Some(attributes) = &imported else {
                    let pk = PathKey {
                        peer: *from,
                        path_id: remote_path_id.unwrap_or(0),
                    };
                    advertisements.extend(self.withdraw(
                        a.family,
                        &nlri.destination,
                        &pk,
                    )?);
                    continue;
                };
                let path = Path {
                    source: source.clone(),
                    remote_path_id,
                    local_path_id: 0,
                    destination: nlri.destination.clone(),
                    nexthop: a.nexthop,
                    attributes: attributes.clone(),
                };
                let adv = self.rib.with_entry(a.family, &nlri.destination, |e| {
                    if !read_lock!(self.peers).contains_key(from) {
                        return Vec::new();
                    }
                    e.upsert(path);
                    self.decide(e)
                })?;
                advertisements.extend(adv);
            }
        }

        Ok(batches(advertisements))
    }

    fn withdraw(
        &self,
        family: AddressFamily,
        destination: &Destination,
        pk: &PathKey,
    ) -> Result<Vec<Advertisement>, Error> {
        let key = destination.route_key()?;
        Ok(self
            .rib
            .with_existing_entry(family, &key, |e| {
                if e.remove(pk).is_none() {
                    return Vec::new();
                }
                self.decide(e)
            })
            .unwrap_or_default())
    }

    /// Run the decision process for every destination, for use after the
    /// environment changes next hop reachability or IGP metrics.
    pub fn recompute(&self) -> Vec<PeerBatch> {
        let mut advertisements = Vec::new();
        for family in self.rib.families() {
            for key in self.rib.keys(family) {
                let adv =
                    self.rib.with_existing_entry(family, &key, |e| self.decide(e));
                advertisements.extend(adv.unwrap_or_default());
            }
        }
        batches(advertisements)
    }

    /// Select the best paths of an entry, reconcile against the previous
    /// selection and store the new one. Runs under the entry lock, which
    /// also orders the subscriber list read here against `add_peer` dumps.
    fn decide(&self, entry: &mut RouteEntry) -> Vec<Advertisement> {
        let next = select_best(
            entry,
            &self.config.decision,
            self.config.add_path_mode(entry.family),
            self.env.as_ref(),
        );
        if next == entry.selected {
            return Vec::new();
        }
        let subscribers = self.peers();
        let adv = reconcile(
            entry.family,
            &entry.key,
            &entry.destination,
            &entry.selected,
            &next,
            &subscribers,
            &self.policy,
            self.env.as_ref(),
        );
        rdb_log!(self, debug, "best path changed for {}", entry.destination;
            "family" => entry.family.to_string(),
            "paths" => next.len(),
            "changes" => adv.len()
        );
        entry.selected = next;
        adv
    }

    pub fn snapshot(
        &self,
        family: AddressFamily,
        key: &RouteKey,
    ) -> Option<RouteEntry> {
        self.rib.snapshot(family, key)
    }

    /// The current best paths for `destination`.
    pub fn best_path(
        &self,
        family: AddressFamily,
        destination: &Destination,
    ) -> Result<BestPath, Error> {
        let key = destination.route_key()?;
        Ok(self
            .rib
            .snapshot(family, &key)
            .map(|e| e.selected)
            .unwrap_or_default())
    }
}

/// Group advertisements into one batch per peer, ordered by peer.
fn batches(advertisements: Vec<Advertisement>) -> Vec<PeerBatch> {
    let mut by_peer: BTreeMap<PeerId, PeerBatch> = BTreeMap::new();
    for a in advertisements {
        let batch = by_peer
            .entry(a.peer())
            .or_insert_with(|| PeerBatch::new(a.peer()));
        match a {
            Advertisement::Advertise(a) => batch.advertise.push(a),
            Advertisement::Withdraw(w) => batch.withdraw.push(w),
        }
    }
    by_peer.into_values().filter(|b| !b.is_empty()).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{AddPathMode, AddPathTable};
    use crate::environment::Capabilities;
    use crate::test::{
        announce, attributes, peer, unicast, withdraw, TestDb,
        TestEnvironment, TEST_LOCAL_ASN, TEST_LOCAL_ID,
    };
    use bgp::attributes::{PathAttributeTypeCode, PathAttributeValue};
    use bgp::communities::Community;
    use bgp::policy::{PeerRole, PolicyConfig};
    use bgp::primitives::{Afi, BgpNexthop, Safi};
    use bgp_common::log::discard_logger;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Barrier;
    use std::thread;

    const V4: AddressFamily = AddressFamily::IPV4_UNICAST;

    fn key(prefix: &str) -> RouteKey {
        unicast(prefix).destination.route_key().unwrap()
    }

    fn batch_for<'a>(batches: &'a [PeerBatch], id: &PeerId) -> &'a PeerBatch {
        batches
            .iter()
            .find(|b| b.peer == *id)
            .expect("batch for peer")
    }

    #[test]
    fn add_peer_twice() {
        let db = TestDb::new();
        let a = peer("203.0.113.1", 65001, PeerRole::External);
        db.add_peer(a.clone()).unwrap();
        assert!(matches!(db.add_peer(a), Err(Error::PeerExists(_))));
    }

    #[test]
    fn update_from_unknown_peer() {
        let db = TestDb::new();
        let a = peer("203.0.113.1", 65001, PeerRole::External);
        let r = db.apply_update(&a.id, &announce(&a, &["198.51.100.0/24"], attributes(&a, 0)));
        assert!(matches!(r, Err(Error::UnknownPeer(_))));
    }

    #[test]
    fn announcement_reaches_other_peers() {
        let db = TestDb::new();
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        let ext2 = peer("203.0.113.2", 65002, PeerRole::External);
        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        for p in [&ext, &ext2, &ibgp] {
            db.add_peer(p.clone()).unwrap();
        }

        let out = db
            .apply_update(
                &ext.id,
                &announce(&ext, &["198.51.100.0/24"], attributes(&ext, 5)),
            )
            .unwrap();
        assert_eq!(out.len(), 2);

        let to_ibgp = batch_for(&out, &ibgp.id);
        assert_eq!(to_ibgp.advertise.len(), 1);
        assert_eq!(to_ibgp.advertise[0].attributes.med(), Some(5));
        assert_eq!(to_ibgp.advertise[0].attributes.local_pref(), Some(100));

        let to_ext2 = batch_for(&out, &ext2.id);
        let attrs = &to_ext2.advertise[0].attributes;
        assert_eq!(attrs.med(), None);
        assert_eq!(attrs.local_pref(), None);
        assert_eq!(
            attrs.as_path().unwrap().segments()[0].value,
            vec![TEST_LOCAL_ASN, 65001]
        );

        let updates = to_ext2.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].nlri, vec![unicast("198.51.100.0/24")]);

        // The same announcement again changes nothing.
        let out = db
            .apply_update(
                &ext.id,
                &announce(&ext, &["198.51.100.0/24"], attributes(&ext, 5)),
            )
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn med_tie_break() {
        let db = TestDb::new();
        let a = peer("203.0.113.1", 65001, PeerRole::External);
        let b = peer("203.0.113.2", 65001, PeerRole::External);
        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        for p in [&a, &b, &ibgp] {
            db.add_peer(p.clone()).unwrap();
        }
        let path = |med| {
            attributes(&a, med).with_value(PathAttributeValue::AsPath(
                bgp::attributes::AsPath(vec![
                    bgp::attributes::AsPathSegment::sequence(vec![65001, 64500]),
                ]),
            ))
        };

        db.apply_update(&a.id, &announce(&a, &["198.51.100.0/24"], path(20)))
            .unwrap();
        let out = db
            .apply_update(&b.id, &announce(&b, &["198.51.100.0/24"], path(10)))
            .unwrap();

        let best = db
            .best_path(V4, &unicast("198.51.100.0/24").destination)
            .unwrap();
        assert_eq!(best.best().unwrap().source.id, b.id);
        assert_eq!(best.best().unwrap().attributes.med(), Some(10));

        let to_ibgp = batch_for(&out, &ibgp.id);
        assert_eq!(to_ibgp.advertise[0].attributes.med(), Some(10));
        // a now hears about b's path, b hears nothing new.
        assert_eq!(batch_for(&out, &a.id).advertise.len(), 1);
        let to_b = out.iter().find(|x| x.peer == b.id).unwrap();
        assert_eq!(to_b.withdraw.len(), 1);
    }

    #[test]
    fn withdraw_propagation() {
        let db = TestDb::new();
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        let ext2 = peer("203.0.113.2", 65002, PeerRole::External);
        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        for p in [&ext, &ext2, &ibgp] {
            db.add_peer(p.clone()).unwrap();
        }
        db.apply_update(
            &ext.id,
            &announce(&ext, &["198.51.100.0/24"], attributes(&ext, 0)),
        )
        .unwrap();
        assert!(db.snapshot(V4, &key("198.51.100.0/24")).is_some());

        let out = db
            .apply_update(&ext.id, &withdraw(&["198.51.100.0/24"]))
            .unwrap();
        assert!(db.snapshot(V4, &key("198.51.100.0/24")).is_none());
        assert_eq!(out.len(), 2);
        for id in [&ext2.id, &ibgp.id] {
            let b = batch_for(&out, id);
            assert!(b.advertise.is_empty());
            assert_eq!(b.withdraw.len(), 1);
            assert_eq!(b.withdraw[0].key, key("198.51.100.0/24"));
        }

        // Withdrawing something unknown is a no-op.
        let out = db
            .apply_update(&ext.id, &withdraw(&["198.51.100.0/24"]))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn internal_to_internal_suppressed() {
        let db = TestDb::new();
        let i1 = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        let i2 = peer("10.0.0.3", TEST_LOCAL_ASN, PeerRole::Internal);
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        for p in [&i1, &i2, &ext] {
            db.add_peer(p.clone()).unwrap();
        }
        let out = db
            .apply_update(
                &i1.id,
                &announce(&i1, &["198.51.100.0/24"], attributes(&i1, 0)),
            )
            .unwrap();
        assert!(out.iter().all(|b| b.peer != i2.id));
        assert_eq!(batch_for(&out, &ext.id).advertise.len(), 1);
    }

    #[test]
    fn import_loop_rejected_and_replaces() {
        let db = TestDb::new();
        let client =
            peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::RouteReflectorClient);
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        db.add_peer(client.clone()).unwrap();
        db.add_peer(ext.clone()).unwrap();

        db.apply_update(
            &client.id,
            &announce(&client, &["198.51.100.0/24"], attributes(&client, 0)),
        )
        .unwrap();
        assert!(db.snapshot(V4, &key("198.51.100.0/24")).is_some());

        let looped = attributes(&client, 0)
            .with_value(PathAttributeValue::OriginatorId(TEST_LOCAL_ID));
        let out = db
            .apply_update(
                &client.id,
                &announce(&client, &["198.51.100.0/24"], looped),
            )
            .unwrap();
        assert!(db.snapshot(V4, &key("198.51.100.0/24")).is_none());
        assert_eq!(batch_for(&out, &ext.id).withdraw.len(), 1);
    }

    #[test]
    fn add_peer_initial_dump() {
        let db = TestDb::new();
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        db.add_peer(ext.clone()).unwrap();
        db.apply_update(
            &ext.id,
            &announce(
                &ext,
                &["198.51.100.0/24", "192.0.2.0/24"],
                attributes(&ext, 0),
            ),
        )
        .unwrap();

        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        let batch = db.add_peer(ibgp.clone()).unwrap();
        assert_eq!(batch.peer, ibgp.id);
        assert_eq!(batch.advertise.len(), 2);
        assert!(batch.withdraw.is_empty());

        // A peer for another family hears nothing.
        let mut v6 = peer("10.0.0.3", TEST_LOCAL_ASN, PeerRole::Internal);
        v6.families = [AddressFamily::IPV6_UNICAST].into();
        assert!(db.add_peer(v6).unwrap().is_empty());
    }

    #[test]
    fn remove_peer_flushes_routes() {
        let db = TestDb::new();
        let a = peer("203.0.113.1", 65001, PeerRole::External);
        let b = peer("203.0.113.2", 65002, PeerRole::External);
        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        for p in [&a, &b, &ibgp] {
            db.add_peer(p.clone()).unwrap();
        }
        db.apply_update(&a.id, &announce(&a, &["198.51.100.0/24"], attributes(&a, 0)))
            .unwrap();
        db.apply_update(
            &b.id,
            &announce(&b, &["198.51.100.0/24", "192.0.2.0/24"], attributes(&b, 0)),
        )
        .unwrap();

        let out = db.remove_peer(&a.id).unwrap();
        // 198.51.100.0/24 moves to b's path. b stops receiving a's path and
        // is never sent its own.
        let to_ibgp = batch_for(&out, &ibgp.id);
        assert_eq!(to_ibgp.advertise.len(), 1);
        assert_eq!(
            to_ibgp.advertise[0].attributes.as_path().unwrap().first_as(),
            Some(65002)
        );
        assert!(out.iter().all(|x| x.peer != a.id));
        let to_b = out.iter().find(|x| x.peer == b.id).unwrap();
        assert_eq!(to_b.withdraw.len(), 1);

        assert!(matches!(db.remove_peer(&a.id), Err(Error::UnknownPeer(_))));
        assert!(db.peer(&a.id).is_none());
    }

    #[test]
    fn unreachable_next_hop_recompute() {
        let db = TestDb::new();
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        db.add_peer(ext.clone()).unwrap();
        db.add_peer(ibgp.clone()).unwrap();
        db.apply_update(
            &ext.id,
            &announce(&ext, &["198.51.100.0/24"], attributes(&ext, 0)),
        )
        .unwrap();

        db.env()
            .set_reachable(BgpNexthop::Ipv4(Ipv4Addr::new(203, 0, 113, 1)), false);
        let out = db.recompute();
        assert_eq!(batch_for(&out, &ibgp.id).withdraw.len(), 1);
        // The path stays in the table.
        assert!(db.snapshot(V4, &key("198.51.100.0/24")).is_some());

        db.env()
            .set_reachable(BgpNexthop::Ipv4(Ipv4Addr::new(203, 0, 113, 1)), true);
        let out = db.recompute();
        assert_eq!(batch_for(&out, &ibgp.id).advertise.len(), 1);
    }

    #[test]
    fn add_path_table() {
        let mut config = RibConfig::new(PolicyConfig::new(TEST_LOCAL_ASN, TEST_LOCAL_ID));
        config.add_path.push(AddPathTable {
            afi: Afi::Ipv4,
            safi: Safi::Unicast,
            mode: AddPathMode::All,
        });
        let db = TestDb::with_config(config);
        let a = peer("203.0.113.1", 65001, PeerRole::External);
        let b = peer("203.0.113.2", 65002, PeerRole::External);
        let ap = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        let plain = peer("10.0.0.3", TEST_LOCAL_ASN, PeerRole::Internal);
        db.env().set_capabilities(
            ap.id,
            V4,
            Capabilities {
                add_path: true,
                multi_path: false,
            },
        );
        for p in [&a, &b, &ap, &plain] {
            db.add_peer(p.clone()).unwrap();
        }

        db.apply_update(&a.id, &announce(&a, &["198.51.100.0/24"], attributes(&a, 0)))
            .unwrap();
        let out = db
            .apply_update(&b.id, &announce(&b, &["198.51.100.0/24"], attributes(&b, 0)))
            .unwrap();

        // The Add-Path peer gets b's path as a second path, the plain peer
        // keeps a's path.
        let to_ap = batch_for(&out, &ap.id);
        assert_eq!(to_ap.advertise.len(), 1);
        assert_eq!(to_ap.advertise[0].nlri.path_id, Some(2));
        assert!(out.iter().all(|x| x.peer != plain.id));

        let best = db
            .best_path(V4, &unicast("198.51.100.0/24").destination)
            .unwrap();
        assert_eq!(best.len(), 2);
    }

    #[test]
    fn graceful_shutdown_depreferences() {
        let db = TestDb::new();
        let a = peer("203.0.113.1", 65001, PeerRole::External);
        let b = peer("203.0.113.2", 65002, PeerRole::External);
        db.add_peer(a.clone()).unwrap();
        db.add_peer(b.clone()).unwrap();

        let gshut = attributes(&a, 0).with_value(PathAttributeValue::Communities(
            vec![Community::GracefulShutdown],
        ));
        db.apply_update(&a.id, &announce(&a, &["198.51.100.0/24"], gshut))
            .unwrap();
        db.apply_update(&b.id, &announce(&b, &["198.51.100.0/24"], attributes(&b, 0)))
            .unwrap();

        let best = db
            .best_path(V4, &unicast("198.51.100.0/24").destination)
            .unwrap();
        let best = best.best().unwrap();
        assert_eq!(best.source.id, b.id);
        assert!(!best.attributes.contains(PathAttributeTypeCode::LocalPref));
    }

    /// Parks the first capability lookup for one peer until the test
    /// releases it, holding an update between its peer lookup and its
    /// table changes.
    struct GatedEnvironment {
        inner: TestEnvironment,
        gated: PeerId,
        armed: AtomicBool,
        entered: Barrier,
        release: Barrier,
    }

    impl GatedEnvironment {
        fn new(gated: PeerId) -> Self {
            Self {
                inner: TestEnvironment::default(),
                gated,
                armed: AtomicBool::new(true),
                entered: Barrier::new(2),
                release: Barrier::new(2),
            }
        }
    }

    impl Environment for GatedEnvironment {
        fn is_next_hop_reachable(&self, nexthop: &BgpNexthop) -> bool {
            self.inner.is_next_hop_reachable(nexthop)
        }

        fn igp_metric(&self, nexthop: &BgpNexthop) -> u32 {
            self.inner.igp_metric(nexthop)
        }

        fn local_bgp_identifier(&self) -> Ipv4Addr {
            self.inner.local_bgp_identifier()
        }

        fn negotiated_capabilities(
            &self,
            peer: &PeerId,
            family: AddressFamily,
        ) -> Capabilities {
            if *peer == self.gated && self.armed.swap(false, Ordering::SeqCst)
            {
                self.entered.wait();
                self.release.wait();
            }
            self.inner.negotiated_capabilities(peer, family)
        }
    }

    fn gated_db(gated: PeerId) -> (Db, Arc<GatedEnvironment>) {
        let env = Arc::new(GatedEnvironment::new(gated));
        let config =
            RibConfig::new(PolicyConfig::new(TEST_LOCAL_ASN, TEST_LOCAL_ID));
        let db = Db::new(config, env.clone(), discard_logger());
        (db, env)
    }

    #[test]
    fn remove_peer_during_update() {
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        let (db, env) = gated_db(ext.id);
        db.add_peer(ext.clone()).unwrap();
        db.add_peer(ibgp.clone()).unwrap();

        let update =
            announce(&ext, &["198.51.100.0/24"], attributes(&ext, 0));
        let out = thread::scope(|s| {
            let h = s.spawn(|| db.apply_update(&ext.id, &update));
            env.entered.wait();
            assert!(db.remove_peer(&ext.id).unwrap().is_empty());
            env.release.wait();
            h.join().unwrap().unwrap()
        });

        assert!(out.is_empty());
        assert_eq!(db.peers(), vec![ibgp]);
        assert!(db.rib().keys_for_peer(&ext.id).is_empty());
        assert!(db.snapshot(V4, &key("198.51.100.0/24")).is_none());
    }

    #[test]
    fn add_peer_during_update() {
        let ext = peer("203.0.113.1", 65001, PeerRole::External);
        let ibgp = peer("10.0.0.2", TEST_LOCAL_ASN, PeerRole::Internal);
        let (db, env) = gated_db(ext.id);
        db.add_peer(ext.clone()).unwrap();

        let update =
            announce(&ext, &["198.51.100.0/24"], attributes(&ext, 0));
        let out = thread::scope(|s| {
            let h = s.spawn(|| db.apply_update(&ext.id, &update));
            env.entered.wait();
            // Nothing in the table yet, so the initial dump is empty.
            assert!(db.add_peer(ibgp.clone()).unwrap().is_empty());
            env.release.wait();
            h.join().unwrap().unwrap()
        });

        let to_ibgp = batch_for(&out, &ibgp.id);
        assert_eq!(to_ibgp.advertise.len(), 1);
        assert_eq!(to_ibgp.advertise[0].key, key("198.51.100.0/24"));
        assert_eq!(
            db.best_path(V4, &unicast("198.51.100.0/24").destination)
                .unwrap()
                .len(),
            1
        );
    }
}
