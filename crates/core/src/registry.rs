//! The spot registry: five operations over the store behind one lock.
//!
//! Every operation holds the lock for its whole duration and follows the same
//! shape: rehydrate from disk, mutate the in-memory map, flush it back. When
//! the rehydrate step fails nothing is written, so a corrupt file is never
//! overwritten by an empty map.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::clock::{format_day, DateClock};
use crate::domain::spot::{composite_key, Spot};
use crate::errors::RegistryError;
use crate::store::{read_snapshot, SpotMap, Store};

#[derive(Debug)]
pub struct Registry {
    store: Mutex<Store>,
    path: PathBuf,
    clock: DateClock,
}

impl Registry {
    pub fn new(store: Store, clock: DateClock) -> Self {
        let path = store.file_path();
        Self { store: Mutex::new(store), path, clock }
    }

    pub fn open(
        data_dir: impl Into<PathBuf>,
        data_file: impl Into<String>,
        clock: DateClock,
    ) -> Result<Self, RegistryError> {
        Ok(Self::new(Store::open(data_dir, data_file)?, clock))
    }

    pub fn clock(&self) -> &DateClock {
        &self.clock
    }

    /// Resolved once at construction; does not take the store lock.
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Lists registrations open today, expiring anything older first.
    ///
    /// Registrations whose open date does not parse are expired with the stale ones.
    pub fn find(&self) -> Result<SpotMap, RegistryError> {
        self.transact(|store, clock| {
            let expired: Vec<String> = store
                .spots()
                .iter()
                .filter(|(_, spot)| clock.has_lapsed(&spot.open_date))
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                if let Some(spot) = store.delete(&key) {
                    info!(
                        event_name = "spot.registry.expired",
                        spot_id = %spot.id,
                        user_id = %spot.registered_by,
                        open_date = %spot.open_date,
                        "cleaning up old registration"
                    );
                }
            }

            let mut open_today = SpotMap::new();
            for (key, spot) in store.spots() {
                if clock.is_today(&spot.open_date) {
                    open_today.insert(key.clone(), spot.clone());
                } else {
                    debug!(
                        event_name = "spot.registry.skipped",
                        spot_id = %spot.id,
                        open_date = %spot.open_date,
                        "registration is not open today"
                    );
                }
            }

            if open_today.is_empty() {
                return Err(RegistryError::NoSpots);
            }
            Ok(open_today)
        })
    }

    /// `find`, flattened and ordered by spot id for display.
    pub fn find_sorted(&self) -> Result<Vec<Spot>, RegistryError> {
        let mut spots: Vec<Spot> = self.find()?.into_values().collect();
        spots.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(spots)
    }

    /// Consumes today's registration for `id`. Any user may claim, including the registrant.
    pub fn claim(&self, id: &str, user: &str) -> Result<Spot, RegistryError> {
        self.transact(|store, clock| {
            let claim_key = composite_key(id, &clock.today_string());
            match store.delete(&claim_key) {
                Some(spot) => {
                    info!(
                        event_name = "spot.registry.claimed",
                        spot_id = %spot.id,
                        user_id = %user,
                        registered_by = %spot.registered_by,
                        "spot claimed"
                    );
                    Ok(spot)
                }
                None => {
                    debug!(
                        event_name = "spot.registry.claim_missed",
                        spot_id = %id,
                        user_id = %user,
                        "spot not available today"
                    );
                    Err(RegistryError::NotAvailable { id: id.to_owned() })
                }
            }
        })
    }

    /// Registers `id` as open on `open_date`, or today when no date is given.
    pub fn register(
        &self,
        id: &str,
        user: &str,
        open_date: Option<NaiveDate>,
    ) -> Result<Spot, RegistryError> {
        self.transact(|store, clock| {
            let today = clock.today();
            let open_date = open_date.unwrap_or(today);
            if open_date < today {
                return Err(RegistryError::PastDate { date: format_day(open_date) });
            }

            let spot = Spot::new(id, user, open_date, today);
            if let Some(existing) = store.get(&spot.key()) {
                return Err(RegistryError::Duplicate { existing: existing.clone() });
            }

            info!(
                event_name = "spot.registry.registered",
                spot_id = %spot.id,
                user_id = %spot.registered_by,
                open_date = %spot.open_date,
                "spot registered"
            );
            store.insert(spot.clone());
            Ok(spot)
        })
    }

    /// Drops one registration of `id` owned by `user`, earliest open date first.
    ///
    /// Absent and not-owned registrations fail the same way so other users'
    /// registrations are not revealed.
    pub fn drop_one(&self, id: &str, user: &str) -> Result<(), RegistryError> {
        self.transact(|store, _| {
            let key = store
                .spots()
                .values()
                .filter(|spot| spot.id == id && spot.is_owned_by(user))
                .min_by(|left, right| left.open_date.cmp(&right.open_date))
                .map(Spot::key)
                .ok_or_else(|| RegistryError::DropDenied { id: id.to_owned() })?;

            if let Some(spot) = store.delete(&key) {
                info!(
                    event_name = "spot.registry.dropped",
                    spot_id = %spot.id,
                    user_id = %user,
                    open_date = %spot.open_date,
                    "registration dropped"
                );
            }
            Ok(())
        })
    }

    /// Drops every registration owned by `user` and returns how many went.
    pub fn drop_all(&self, user: &str) -> Result<usize, RegistryError> {
        self.transact(|store, _| {
            let owned: Vec<String> = store
                .spots()
                .iter()
                .filter(|(_, spot)| spot.is_owned_by(user))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &owned {
                store.delete(key);
            }

            info!(
                event_name = "spot.registry.dropped_all",
                user_id = %user,
                dropped = owned.len(),
                "all registrations dropped for user"
            );
            Ok(owned.len())
        })
    }

    /// Current contents of the store file. Never creates or rewrites the file
    /// and does not wait on the store lock; saves replace the file atomically.
    pub fn snapshot(&self) -> Result<SpotMap, RegistryError> {
        read_snapshot(&self.path)
    }

    fn transact<T>(
        &self,
        work: impl FnOnce(&mut Store, &DateClock) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut store = self.lock();
        store.load()?;
        let outcome = work(&mut store, &self.clock);
        store.save()?;
        outcome
    }

    // The map is rehydrated from disk at the start of every operation, so a
    // panic in a previous holder cannot leave state that outlives the guard.
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
