//! The authoritative city list.
//!
//! Invariants held after construction and after every operation:
//! - at most one record has `is_primary`, and it sits at index 0,
//! - `sort_order` equals the list index,
//! - the list holds at most `max_cities` records,
//! - no two non-primary records are closer than `duplicate_distance_km`
//!   (enforced on insert).
//!
//! Every successful mutation persists the whole list through the shared
//! data store and then asks the widget to reload. Rejected operations
//! change nothing and send nothing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cityclock_core::{CityRejection, Clock, Config, Coordinate};
use cityclock_store::{CityRecord, SharedDataStore, TimelineReloader};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::throttle::ReloadThrottle;

#[derive(Debug, Clone)]
pub struct RepositorySettings {
    pub max_cities: usize,
    pub duplicate_distance_km: f64,
    pub reload_cooldown: Duration,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RepositorySettings {
    fn from(config: &Config) -> Self {
        Self {
            max_cities: config.cities.max_count,
            duplicate_distance_km: config.cities.duplicate_distance_km,
            reload_cooldown: config.reload.cooldown(),
        }
    }
}

struct RepositoryState {
    cities: Vec<CityRecord>,
    throttle: ReloadThrottle,
}

/// How urgently the widget must see a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reload {
    Throttled,
    Forced,
}

pub struct CityRepository {
    store: SharedDataStore,
    reloader: Arc<dyn TimelineReloader>,
    clock: Arc<dyn Clock>,
    settings: RepositorySettings,
    state: Mutex<RepositoryState>,
}

impl CityRepository {
    /// Load the stored list, repairing it if it breaks an invariant.
    pub fn new(
        store: SharedDataStore,
        reloader: Arc<dyn TimelineReloader>,
        clock: Arc<dyn Clock>,
        settings: RepositorySettings,
    ) -> Self {
        let cities = normalize(store.read_cities(), settings.max_cities);
        tracing::info!("City repository loaded {} cities", cities.len());

        Self {
            store,
            reloader,
            clock,
            state: Mutex::new(RepositoryState {
                cities,
                throttle: ReloadThrottle::new(settings.reload_cooldown),
            }),
            settings,
        }
    }

    /// Snapshot of the list in display order.
    pub fn cities(&self) -> Vec<CityRecord> {
        self.state.lock().cities.clone()
    }

    pub fn primary(&self) -> Option<CityRecord> {
        self.state.lock().cities.first().filter(|c| c.is_primary).cloned()
    }

    pub fn city(&self, id: Uuid) -> Option<CityRecord> {
        self.state.lock().cities.iter().find(|c| c.id == id).cloned()
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// Re-read the list from the shared container.
    ///
    /// Picks up the widget's narrow temperature writes. Does not signal.
    pub fn reload(&self) {
        let cities = normalize(self.store.read_cities(), self.settings.max_cities);
        self.state.lock().cities = cities;
    }

    /// Append a user-chosen city.
    pub fn add_city(&self, candidate: CityRecord) -> Result<CityRecord, CityRejection> {
        if !candidate.coordinate().is_valid() {
            return Err(CityRejection::InvalidCoordinate);
        }

        let mut state = self.state.lock();

        if state.cities.len() >= self.settings.max_cities {
            tracing::warn!("Rejected {}: city list is full", candidate.name);
            return Err(CityRejection::CapacityReached {
                max: self.settings.max_cities,
            });
        }

        let coordinate = candidate.coordinate();
        if let Some(existing) = state.cities.iter().find(|c| {
            c.id == candidate.id
                || (!c.is_primary
                    && c.coordinate()
                        .is_within_km(&coordinate, self.settings.duplicate_distance_km))
        }) {
            tracing::info!("Rejected {}: duplicate of {}", candidate.name, existing.name);
            return Err(CityRejection::Duplicate {
                existing_id: existing.id.to_string(),
            });
        }

        let mut city = candidate;
        city.is_primary = false;
        city.sort_order = state.cities.len();
        state.cities.push(city.clone());

        tracing::info!("Added city {} ({})", city.name, city.id);
        self.commit(&mut state, Reload::Forced);
        Ok(city)
    }

    /// Remove a non-primary city.
    pub fn remove_city(&self, id: Uuid) -> Result<CityRecord, CityRejection> {
        let mut state = self.state.lock();

        let index = state
            .cities
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CityRejection::NotFound(id.to_string()))?;

        if state.cities[index].is_primary {
            return Err(CityRejection::PrimaryImmutable);
        }

        let removed = state.cities.remove(index);
        densify(&mut state.cities);

        tracing::info!("Removed city {} ({})", removed.name, removed.id);
        self.commit(&mut state, Reload::Forced);
        Ok(removed)
    }

    /// Move the cities at `offsets` so they land before `destination`.
    ///
    /// Offsets and destination index the current list. The primary record
    /// never moves: its offset is ignored and nothing can be placed before
    /// it. Returns whether the order changed.
    pub fn move_cities(&self, offsets: &[usize], destination: usize) -> bool {
        let mut state = self.state.lock();
        let has_primary = state.cities.first().is_some_and(|c| c.is_primary);
        let floor = usize::from(has_primary);

        let before: Vec<Uuid> = state.cities.iter().map(|c| c.id).collect();
        apply_move(&mut state.cities, offsets, destination, floor);
        let changed = state.cities.iter().map(|c| c.id).ne(before.iter().copied());

        if !changed {
            return false;
        }

        densify(&mut state.cities);
        tracing::info!("Reordered cities");
        self.commit(&mut state, Reload::Forced);
        true
    }

    /// Replace a city's contents by identifier, keeping its place and role.
    ///
    /// Used for routine weather refreshes; the widget reload is throttled.
    pub fn update_city(&self, record: CityRecord) -> Result<CityRecord, CityRejection> {
        let mut state = self.state.lock();

        let existing = state
            .cities
            .iter_mut()
            .find(|c| c.id == record.id)
            .ok_or_else(|| CityRejection::NotFound(record.id.to_string()))?;

        let updated = CityRecord {
            is_primary: existing.is_primary,
            sort_order: existing.sort_order,
            ..record
        };
        *existing = updated.clone();

        tracing::debug!("Updated city {} ({})", updated.name, updated.id);
        self.commit(&mut state, Reload::Throttled);
        Ok(updated)
    }

    /// Record a fetched temperature on a city that still sits at the
    /// coordinate the fetch was made for.
    ///
    /// Only `temperature` and `last_updated` change. Returns `Ok(None)`, and
    /// changes nothing, if the city moved since `fetched_at` was read. The
    /// widget reload is throttled.
    pub fn apply_reading(
        &self,
        id: Uuid,
        fetched_at: Coordinate,
        temperature: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<CityRecord>, CityRejection> {
        let mut state = self.state.lock();

        let existing = state
            .cities
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CityRejection::NotFound(id.to_string()))?;

        if existing.coordinate() != fetched_at {
            tracing::debug!("{} moved during weather fetch, dropping reading", existing.name);
            return Ok(None);
        }

        existing.temperature = Some(temperature);
        existing.last_updated = Some(at);
        let updated = existing.clone();

        tracing::debug!("Stored {:.1} for {} ({})", temperature, updated.name, updated.id);
        self.commit(&mut state, Reload::Throttled);
        Ok(Some(updated))
    }

    /// Replace the primary record, or establish one if there is none.
    ///
    /// An existing primary keeps its identifier whatever `record.id` says.
    /// The widget reload is always sent immediately.
    pub fn update_current_location(&self, record: CityRecord) -> Result<CityRecord, CityRejection> {
        if !record.coordinate().is_valid() {
            return Err(CityRejection::InvalidCoordinate);
        }

        let mut state = self.state.lock();

        let primary = match state.cities.first() {
            Some(current) if current.is_primary => {
                let primary = CityRecord {
                    id: current.id,
                    is_primary: true,
                    sort_order: 0,
                    ..record
                };
                state.cities[0] = primary.clone();
                primary
            }
            _ => {
                // Promote a matching record rather than duplicating it
                if let Some(index) = state.cities.iter().position(|c| c.id == record.id) {
                    state.cities.remove(index);
                } else if state.cities.len() >= self.settings.max_cities {
                    tracing::warn!(
                        "Cannot establish current location {}: city list is full",
                        record.name
                    );
                    return Err(CityRejection::CapacityReached {
                        max: self.settings.max_cities,
                    });
                }

                let primary = CityRecord {
                    is_primary: true,
                    sort_order: 0,
                    ..record
                };
                state.cities.insert(0, primary.clone());
                densify(&mut state.cities);
                primary
            }
        };

        tracing::info!("Current location is now {} ({})", primary.name, primary.id);
        self.commit(&mut state, Reload::Forced);
        Ok(primary)
    }

    /// Send a reload that was suppressed by the throttle, once the cooldown
    /// has passed. Returns whether a signal was sent.
    pub fn flush_pending_reload(&self) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now();
        if state.throttle.permit_pending(now) {
            self.reloader.reload_all_timelines();
            true
        } else {
            false
        }
    }

    fn commit(&self, state: &mut RepositoryState, reload: Reload) {
        self.store.write_cities(&state.cities);

        let now = self.clock.now();
        if state.throttle.permit(now, reload == Reload::Forced) {
            self.reloader.reload_all_timelines();
        } else {
            tracing::debug!("Widget reload suppressed by cooldown");
        }
    }
}

fn densify(cities: &mut [CityRecord]) {
    for (index, city) in cities.iter_mut().enumerate() {
        city.sort_order = index;
    }
}

/// Repair a list read from storage: stored order by `sort_order`, one
/// primary at the front, unique ids, capacity, dense sort orders.
fn normalize(mut cities: Vec<CityRecord>, max_cities: usize) -> Vec<CityRecord> {
    cities.sort_by_key(|c| c.sort_order);

    let mut ids = HashSet::new();
    cities.retain(|c| ids.insert(c.id));

    let mut seen_primary = false;
    for city in cities.iter_mut().filter(|c| c.is_primary) {
        if seen_primary {
            tracing::warn!("Demoting extra primary city {}", city.name);
            city.is_primary = false;
        }
        seen_primary = true;
    }

    if let Some(index) = cities.iter().position(|c| c.is_primary) {
        let primary = cities.remove(index);
        cities.insert(0, primary);
    }

    if cities.len() > max_cities {
        tracing::warn!("Dropping {} cities over capacity", cities.len() - max_cities);
        cities.truncate(max_cities);
    }

    densify(&mut cities);
    cities
}

/// Move semantics of a list-view drag: remove the elements at `offsets`,
/// then insert them, in their original relative order, before the element
/// that was at `destination`. Indices below `floor` are pinned.
fn apply_move<T>(items: &mut Vec<T>, offsets: &[usize], destination: usize, floor: usize) {
    let len = items.len();
    let mut selected: Vec<usize> = offsets
        .iter()
        .copied()
        .filter(|&i| i >= floor && i < len)
        .collect();
    selected.sort_unstable();
    selected.dedup();

    if selected.is_empty() {
        return;
    }

    let destination = destination.clamp(floor, len);
    let shift = selected.iter().filter(|&&i| i < destination).count();

    let mut moved = Vec::with_capacity(selected.len());
    for &index in selected.iter().rev() {
        moved.push(items.remove(index));
    }
    moved.reverse();

    let insert_at = destination - shift;
    for (offset, item) in moved.into_iter().enumerate() {
        items.insert(insert_at + offset, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{city_at, Harness};

    fn names(repo: &CityRepository) -> Vec<String> {
        repo.cities().into_iter().map(|c| c.name).collect()
    }

    fn assert_invariants(cities: &[CityRecord], max: usize) {
        assert!(cities.len() <= max);
        for (index, city) in cities.iter().enumerate() {
            assert_eq!(city.sort_order, index, "sort orders must be dense");
            if city.is_primary {
                assert_eq!(index, 0, "primary must be first");
            }
        }
        assert!(cities.iter().filter(|c| c.is_primary).count() <= 1);
    }

    #[test]
    fn add_assigns_next_sort_order_and_persists() {
        let h = Harness::new();
        let repo = h.repository();

        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        let paris = repo.add_city(city_at("Paris", 48.8566, 2.3522)).unwrap();

        assert_eq!(paris.sort_order, 1);
        assert_eq!(names(&repo), vec!["London", "Paris"]);
        assert_eq!(h.store().read_cities(), repo.cities());
        assert_eq!(h.reloads(), 2);
    }

    #[test]
    fn add_over_capacity_is_a_no_op() {
        let h = Harness::new();
        let repo = h.repository();
        for i in 0..5 {
            repo.add_city(city_at(&format!("City {i}"), 10.0 * i as f64, 0.0)).unwrap();
        }
        let reloads = h.reloads();

        let err = repo.add_city(city_at("Extra", -45.0, 90.0)).unwrap_err();

        assert_eq!(err, CityRejection::CapacityReached { max: 5 });
        assert_eq!(repo.cities().len(), 5);
        assert_eq!(h.store().read_cities().len(), 5);
        assert_eq!(h.reloads(), reloads);
    }

    #[test]
    fn add_within_a_kilometre_is_rejected() {
        let h = Harness::new();
        let repo = h.repository();
        let london = repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();

        let err = repo.add_city(city_at("Westminster", 51.5080, -0.1260)).unwrap_err();

        assert_eq!(
            err,
            CityRejection::Duplicate {
                existing_id: london.id.to_string()
            }
        );
        assert_eq!(repo.cities().len(), 1);
    }

    #[test]
    fn add_near_the_primary_city_is_allowed() {
        let h = Harness::new();
        let repo = h.repository();
        repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();

        repo.add_city(city_at("Tempe", 33.4256, -111.9401)).unwrap();

        assert_eq!(repo.cities().len(), 2);
    }

    #[test]
    fn add_rejects_invalid_coordinates() {
        let h = Harness::new();
        let repo = h.repository();
        let err = repo.add_city(city_at("Nowhere", 120.0, 0.0)).unwrap_err();
        assert_eq!(err, CityRejection::InvalidCoordinate);
        assert!(repo.cities().is_empty());
    }

    #[test]
    fn added_city_is_never_primary() {
        let h = Harness::new();
        let repo = h.repository();
        let mut candidate = city_at("Sneaky", 1.0, 1.0);
        candidate.is_primary = true;
        let added = repo.add_city(candidate).unwrap();
        assert!(!added.is_primary);
        assert!(repo.primary().is_none());
    }

    #[test]
    fn remove_redensifies_sort_orders() {
        let h = Harness::new();
        let repo = h.repository();
        repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        let paris = repo.add_city(city_at("Paris", 48.8566, 2.3522)).unwrap();
        repo.add_city(city_at("Tokyo", 35.6762, 139.6503)).unwrap();

        repo.remove_city(paris.id).unwrap();

        assert_eq!(names(&repo), vec!["Tempe", "London", "Tokyo"]);
        assert_invariants(&repo.cities(), 5);
        assert_eq!(h.store().read_cities(), repo.cities());
    }

    #[test]
    fn remove_primary_is_rejected() {
        let h = Harness::new();
        let repo = h.repository();
        let primary = repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();
        let reloads = h.reloads();

        assert_eq!(repo.remove_city(primary.id), Err(CityRejection::PrimaryImmutable));
        assert_eq!(repo.cities().len(), 1);
        assert_eq!(h.reloads(), reloads);
    }

    #[test]
    fn remove_unknown_id_is_not_found() {
        let h = Harness::new();
        let repo = h.repository();
        let id = Uuid::new_v4();
        assert_eq!(repo.remove_city(id), Err(CityRejection::NotFound(id.to_string())));
    }

    #[test]
    fn move_reorders_non_primary_cities() {
        let h = Harness::new();
        let repo = h.repository();
        repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        repo.add_city(city_at("Paris", 48.8566, 2.3522)).unwrap();
        repo.add_city(city_at("Tokyo", 35.6762, 139.6503)).unwrap();

        // Drag Tokyo above London
        assert!(repo.move_cities(&[3], 1));
        assert_eq!(names(&repo), vec!["Tempe", "Tokyo", "London", "Paris"]);

        // Drag London to the end
        assert!(repo.move_cities(&[2], 4));
        assert_eq!(names(&repo), vec!["Tempe", "Tokyo", "Paris", "London"]);
        assert_invariants(&repo.cities(), 5);
    }

    #[test]
    fn move_never_displaces_primary() {
        let h = Harness::new();
        let repo = h.repository();
        repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        repo.add_city(city_at("Paris", 48.8566, 2.3522)).unwrap();

        // Moving the primary itself does nothing
        assert!(!repo.move_cities(&[0], 3));
        // Moving something in front of the primary lands right after it
        assert!(repo.move_cities(&[2], 0));

        assert_eq!(names(&repo), vec!["Tempe", "Paris", "London"]);
        assert!(repo.cities()[0].is_primary);
    }

    #[test]
    fn move_without_primary_can_use_index_zero() {
        let h = Harness::new();
        let repo = h.repository();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        repo.add_city(city_at("Paris", 48.8566, 2.3522)).unwrap();

        assert!(repo.move_cities(&[1], 0));
        assert_eq!(names(&repo), vec!["Paris", "London"]);
    }

    #[test]
    fn move_with_out_of_range_offsets_is_a_no_op() {
        let h = Harness::new();
        let repo = h.repository();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        let reloads = h.reloads();

        assert!(!repo.move_cities(&[7], 0));
        assert!(!repo.move_cities(&[], 0));
        assert_eq!(h.reloads(), reloads);
    }

    #[test]
    fn update_city_keeps_role_and_position() {
        let h = Harness::new();
        let repo = h.repository();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        let paris = repo.add_city(city_at("Paris", 48.8566, 2.3522)).unwrap();

        let mut refreshed = paris.clone().with_temperature(61.0, h.now());
        refreshed.sort_order = 0;
        refreshed.is_primary = true;
        let updated = repo.update_city(refreshed).unwrap();

        assert_eq!(updated.sort_order, 1);
        assert!(!updated.is_primary);
        assert_eq!(repo.city(paris.id).unwrap().temperature, Some(61.0));
        assert_eq!(h.store().read_cities()[1].temperature, Some(61.0));
    }

    #[test]
    fn update_unknown_city_is_not_found() {
        let h = Harness::new();
        let repo = h.repository();
        let stray = city_at("Stray", 1.0, 1.0);
        assert_eq!(
            repo.update_city(stray.clone()),
            Err(CityRejection::NotFound(stray.id.to_string()))
        );
    }

    #[test]
    fn apply_reading_touches_only_the_reading() {
        let h = Harness::new();
        let repo = h.repository();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        let paris = repo.add_city(city_at("Paris", 48.8566, 2.3522)).unwrap();

        let updated = repo
            .apply_reading(paris.id, paris.coordinate(), 61.0, h.now())
            .unwrap()
            .unwrap();

        assert_eq!(updated, paris.clone().with_temperature(61.0, h.now()));
        assert_eq!(h.store().read_cities()[1], updated);
    }

    #[test]
    fn apply_reading_for_a_moved_city_is_dropped() {
        let h = Harness::new();
        let repo = h.repository();
        let chandler = repo
            .update_current_location(city_at("Chandler", 33.3062, -111.8413))
            .unwrap();
        let tempe = repo
            .update_current_location(city_at("Tempe", 33.4255, -111.94))
            .unwrap();
        let reloads = h.reloads();

        let result = repo.apply_reading(chandler.id, chandler.coordinate(), 99.0, h.now());

        assert_eq!(result, Ok(None));
        assert_eq!(repo.primary().unwrap(), tempe);
        assert_eq!(h.store().read_cities(), vec![tempe]);
        assert_eq!(h.reloads(), reloads);
    }

    #[test]
    fn apply_reading_for_unknown_city_is_not_found() {
        let h = Harness::new();
        let repo = h.repository();
        let stray = city_at("Stray", 1.0, 1.0);
        assert_eq!(
            repo.apply_reading(stray.id, stray.coordinate(), 10.0, h.now()),
            Err(CityRejection::NotFound(stray.id.to_string()))
        );
    }

    #[test]
    fn current_location_establishes_primary_at_front() {
        let h = Harness::new();
        let repo = h.repository();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();

        let primary = repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();

        assert!(primary.is_primary);
        assert_eq!(names(&repo), vec!["Tempe", "London"]);
        assert_invariants(&repo.cities(), 5);
    }

    #[test]
    fn current_location_keeps_existing_primary_id() {
        let h = Harness::new();
        let repo = h.repository();
        let first = repo.update_current_location(city_at("Chandler", 33.3062, -111.8413)).unwrap();

        let moved = repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();

        assert_eq!(moved.id, first.id);
        assert_eq!(repo.primary().unwrap().name, "Tempe");
        assert_eq!(repo.cities().len(), 1);
    }

    #[test]
    fn current_location_promotes_matching_record() {
        let h = Harness::new();
        let repo = h.repository();
        repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        let tempe = repo.add_city(city_at("Tempe", 33.4255, -111.94)).unwrap();

        repo.update_current_location(tempe.clone()).unwrap();

        assert_eq!(names(&repo), vec!["Tempe", "London"]);
        assert_eq!(repo.primary().unwrap().id, tempe.id);
    }

    #[test]
    fn current_location_at_capacity_without_primary_is_rejected() {
        let h = Harness::new();
        let repo = h.repository();
        for i in 0..5 {
            repo.add_city(city_at(&format!("City {i}"), 10.0 * i as f64, 0.0)).unwrap();
        }

        let err = repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap_err();

        assert_eq!(err, CityRejection::CapacityReached { max: 5 });
        assert!(repo.primary().is_none());
    }

    #[test]
    fn updates_inside_cooldown_signal_once_but_location_always_signals() {
        let h = Harness::new();
        let repo = h.repository();
        let primary = repo.update_current_location(city_at("Tempe", 33.4255, -111.94)).unwrap();
        let london = repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        h.clock().advance(chrono::TimeDelta::seconds(30));
        let baseline = h.reloads();

        repo.update_city(london.clone().with_temperature(50.0, h.now())).unwrap();
        h.clock().advance(chrono::TimeDelta::seconds(2));
        repo.update_city(london.clone().with_temperature(51.0, h.now())).unwrap();
        assert_eq!(h.reloads(), baseline + 1);

        // Forced, even though the window is still open
        repo.update_current_location(primary.clone()).unwrap();
        assert_eq!(h.reloads(), baseline + 2);

        // The forced signal restarted the window
        h.clock().advance(chrono::TimeDelta::seconds(2));
        repo.update_city(london.with_temperature(52.0, h.now())).unwrap();
        assert_eq!(h.reloads(), baseline + 2);
    }

    #[test]
    fn suppressed_reload_is_flushed_after_cooldown() {
        let h = Harness::new();
        let repo = h.repository();
        let london = repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();
        repo.update_city(london.clone().with_temperature(50.0, h.now())).unwrap();
        let baseline = h.reloads();

        assert!(!repo.flush_pending_reload());
        h.clock().advance(chrono::TimeDelta::seconds(10));
        assert!(repo.flush_pending_reload());
        assert!(!repo.flush_pending_reload());
        assert_eq!(h.reloads(), baseline + 1);
    }

    #[test]
    fn loading_repairs_broken_stored_lists() {
        let h = Harness::new();
        let mut a = city_at("A", 1.0, 1.0);
        a.sort_order = 7;
        let mut b = city_at("B", 2.0, 2.0);
        b.is_primary = true;
        b.sort_order = 3;
        let mut c = city_at("C", 3.0, 3.0);
        c.is_primary = true;
        c.sort_order = 5;
        h.store().write_cities(&[a, b, c]);

        let repo = h.repository();

        assert_eq!(names(&repo), vec!["B", "C", "A"]);
        assert_invariants(&repo.cities(), 5);
    }

    #[test]
    fn reload_picks_up_external_writes() {
        let h = Harness::new();
        let repo = h.repository();
        let london = repo.add_city(city_at("London", 51.5074, -0.1278)).unwrap();

        let mut stored = h.store().read_cities();
        stored[0].temperature = Some(48.0);
        h.store().write_cities(&stored);

        assert_eq!(repo.city(london.id).unwrap().temperature, None);
        repo.reload();
        assert_eq!(repo.city(london.id).unwrap().temperature, Some(48.0));
    }

    #[test]
    fn apply_move_matches_list_drag_semantics() {
        let mut v = vec!['a', 'b', 'c', 'd', 'e'];
        apply_move(&mut v, &[1, 3], 5, 0);
        assert_eq!(v, vec!['a', 'c', 'e', 'b', 'd']);

        let mut v = vec!['a', 'b', 'c', 'd', 'e'];
        apply_move(&mut v, &[3, 4], 1, 0);
        assert_eq!(v, vec!['a', 'd', 'e', 'b', 'c']);

        let mut v = vec!['a', 'b', 'c'];
        apply_move(&mut v, &[1], 1, 0);
        assert_eq!(v, vec!['a', 'b', 'c']);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add { lat: f64, lon: f64 },
            Remove(usize),
            Move(Vec<usize>, usize),
            Locate { lat: f64, lon: f64 },
            Refresh(usize, f64),
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (-80.0..80.0f64, -170.0..170.0f64).prop_map(|(lat, lon)| Op::Add { lat, lon }),
                (0usize..6).prop_map(Op::Remove),
                (prop::collection::vec(0usize..6, 0..3), 0usize..7)
                    .prop_map(|(offsets, to)| Op::Move(offsets, to)),
                (-80.0..80.0f64, -170.0..170.0f64).prop_map(|(lat, lon)| Op::Locate { lat, lon }),
                (0usize..6, -20.0..110.0f64).prop_map(|(i, t)| Op::Refresh(i, t)),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Property: every operation sequence leaves the list valid.
            #[test]
            fn prop_invariants_hold(ops in prop::collection::vec(arb_op(), 1..25)) {
                let h = Harness::new();
                let repo = h.repository();

                for op in ops {
                    let before = repo.cities();
                    match op {
                        Op::Add { lat, lon } => {
                            let result = repo.add_city(city_at("X", lat, lon));
                            if result.is_err() {
                                prop_assert_eq!(repo.cities(), before);
                            }
                        }
                        Op::Remove(i) => {
                            if let Some(city) = before.get(i) {
                                let _ = repo.remove_city(city.id);
                            }
                        }
                        Op::Move(offsets, to) => {
                            let primary = repo.primary().map(|c| c.id);
                            repo.move_cities(&offsets, to);
                            prop_assert_eq!(repo.primary().map(|c| c.id), primary);
                        }
                        Op::Locate { lat, lon } => {
                            let _ = repo.update_current_location(city_at("Here", lat, lon));
                        }
                        Op::Refresh(i, t) => {
                            if let Some(city) = before.get(i) {
                                let _ = repo.update_city(city.clone().with_temperature(t, h.now()));
                            }
                        }
                    }

                    let cities = repo.cities();
                    prop_assert!(cities.len() <= 5);
                    prop_assert!(cities.iter().filter(|c| c.is_primary).count() <= 1);
                    for (index, city) in cities.iter().enumerate() {
                        prop_assert_eq!(city.sort_order, index);
                        if city.is_primary {
                            prop_assert_eq!(index, 0);
                        }
                    }
                    prop_assert_eq!(h.store().read_cities(), cities);
                }
            }

            /// Property: a candidate within the duplicate radius of a
            /// non-primary city never grows the list.
            #[test]
            fn prop_near_duplicates_rejected(
                lat in -80.0..80.0f64,
                lon in -170.0..170.0f64,
                d_lat in -0.005..0.005f64,
                d_lon in -0.005..0.005f64,
            ) {
                let h = Harness::new();
                let repo = h.repository();
                repo.add_city(city_at("Original", lat, lon)).unwrap();

                let candidate = city_at("Copy", lat + d_lat, lon + d_lon);
                let near = Coordinate::new(lat, lon).distance_km(&candidate.coordinate()) < 1.0;
                let result = repo.add_city(candidate);

                if near {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(repo.cities().len(), 1);
                }
            }
        }
    }
}
