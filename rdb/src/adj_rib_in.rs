// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Received routes, per address family and destination.
//!
//! Each table maps route keys to individually locked entries. Work on one
//! destination holds only that entry's lock, so updates to different
//! destinations proceed in parallel while updates to the same destination
//! are serialized. Table level locks are only held long enough to find,
//! insert or unlink an entry, and are never taken while waiting on an
//! entry lock.

use crate::error::Error;
use crate::log::rib_log;
use crate::types::{PathKey, PeerId, Path, RouteEntry};
use bgp::nlri::{Destination, RouteKey};
use bgp::primitives::AddressFamily;
use bgp_common::{lock, read_lock, write_lock};
use slog::Logger;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

struct Slot {
    entry: RouteEntry,

    /// Set once the entry has been unlinked from its table. Anyone holding
    /// a stale handle must look the key up again.
    detached: bool,
}

type Table = RwLock<BTreeMap<RouteKey, Arc<Mutex<Slot>>>>;

pub struct AdjRibIn {
    tables: RwLock<BTreeMap<AddressFamily, Arc<Table>>>,
    log: Logger,
}

impl AdjRibIn {
    pub fn new(log: Logger) -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            log,
        }
    }

    fn table(&self, family: AddressFamily) -> Option<Arc<Table>> {
        read_lock!(self.tables).get(&family).cloned()
    }

    fn table_or_create(&self, family: AddressFamily) -> Arc<Table> {
        if let Some(t) = self.table(family) {
            return t;
        }
        write_lock!(self.tables)
            .entry(family)
            .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())))
            .clone()
    }

    /// Run `f` on the entry for `destination`, creating it if needed. The
    /// entry is removed from the table if `f` leaves it without paths.
    pub fn with_entry<F, R>(
        &self,
        family: AddressFamily,
        destination: &Destination,
        f: F,
    ) -> Result<R, Error>
    where
        F: FnOnce(&mut RouteEntry) -> R,
    {
        let key = destination.route_key()?;
        let table = self.table_or_create(family);
        loop {
            let slot = {
                let existing = read_lock!(table).get(&key).cloned();
                match existing {
                    Some(slot) => slot,
                    None => write_lock!(table)
                        .entry(key.clone())
                        .or_insert_with(|| {
                            Arc::new(Mutex::new(Slot {
                                entry: RouteEntry::new(
                                    family,
                                    key.clone(),
                                    destination.clone(),
                                ),
                                detached: false,
                            }))
                        })
                        .clone(),
                }
            };

            let mut guard = lock!(slot);
            if guard.detached {
                continue;
            }
            let result = f(&mut guard.entry);
            if guard.entry.is_empty() {
                self.unlink(family, &table, &key, &slot, &mut guard);
            }
            return Ok(result);
        }
    }

    /// Run `f` on the entry for `key` if there is one. The entry is removed
    /// from the table if `f` leaves it without paths.
    pub fn with_existing_entry<F, R>(
        &self,
        family: AddressFamily,
        key: &RouteKey,
        f: F,
    ) -> Option<R>
    where
        F: FnOnce(&mut RouteEntry) -> R,
    {
        let table = self.table(family)?;
        loop {
            let slot = read_lock!(table).get(key).cloned()?;
            let mut guard = lock!(slot);
            if guard.detached {
                continue;
            }
            let result = f(&mut guard.entry);
            if guard.entry.is_empty() {
                self.unlink(family, &table, key, &slot, &mut guard);
            }
            return Some(result);
        }
    }

    fn unlink(
        &self,
        family: AddressFamily,
        table: &Table,
        key: &RouteKey,
        slot: &Arc<Mutex<Slot>>,
        guard: &mut Slot,
    ) {
        let mut t = write_lock!(table);
        if t.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            t.remove(key);
        }
        guard.detached = true;
        rib_log!(self, trace, family, "removed empty entry";
            "key" => key.to_string()
        );
    }

    /// Add or replace `path` under its peer and remote path identifier.
    /// Returns the local path identifier assigned to it.
    pub fn upsert(
        &self,
        family: AddressFamily,
        path: Path,
    ) -> Result<u32, Error> {
        let destination = path.destination.clone();
        self.with_entry(family, &destination, |entry| entry.upsert(path))
    }

    /// Remove one path. Returns the removed path, if there was one.
    pub fn remove(
        &self,
        family: AddressFamily,
        destination: &Destination,
        peer: PeerId,
        path_id: Option<u32>,
    ) -> Result<Option<Path>, Error> {
        let key = destination.route_key()?;
        let pk = PathKey {
            peer,
            path_id: path_id.unwrap_or(0),
        };
        Ok(self
            .with_existing_entry(family, &key, |entry| entry.remove(&pk))
            .flatten())
    }

    pub fn snapshot(
        &self,
        family: AddressFamily,
        key: &RouteKey,
    ) -> Option<RouteEntry> {
        let table = self.table(family)?;
        let slot = read_lock!(table).get(key).cloned()?;
        let guard = lock!(slot);
        if guard.detached {
            return None;
        }
        Some(guard.entry.clone())
    }

    /// The keys of every entry in a table.
    pub fn keys(&self, family: AddressFamily) -> Vec<RouteKey> {
        match self.table(family) {
            Some(t) => read_lock!(t).keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn families(&self) -> Vec<AddressFamily> {
        read_lock!(self.tables).keys().copied().collect()
    }

    /// The keys of entries holding a path from `peer`, per family.
    pub fn keys_for_peer(
        &self,
        peer: &PeerId,
    ) -> Vec<(AddressFamily, RouteKey)> {
        let mut result = Vec::new();
        for family in self.families() {
            let Some(table) = self.table(family) else {
                continue;
            };
            let slots: Vec<(RouteKey, Arc<Mutex<Slot>>)> = read_lock!(table)
                .iter()
                .map(|(k, s)| (k.clone(), s.clone()))
                .collect();
            for (key, slot) in slots {
                if lock!(slot).entry.has_peer(peer) {
                    result.push((family, key));
                }
            }
        }
        result
    }

    /// Remove every path learned from `peer`. Returns the number of paths
    /// removed.
    pub fn remove_peer(&self, peer: &PeerId) -> usize {
        let mut removed = 0;
        for (family, key) in self.keys_for_peer(peer) {
            removed += self
                .with_existing_entry(family, &key, |e| e.remove_peer(peer))
                .unwrap_or(0);
        }
        removed
    }

    pub fn len(&self, family: AddressFamily) -> usize {
        match self.table(family) {
            Some(t) => read_lock!(t).len(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        read_lock!(self.tables).values().all(|t| read_lock!(t).is_empty())
    }
}
