//! In-process datastore with the same contract as `PostGIS`.
//!
//! Transactions work on a private copy of the committed state and swap it
//! in on commit. Transactions are not isolated from each other: when two
//! overlap, the last one to commit wins. Geodesic lengths are computed on
//! the WGS84 ellipsoid with `geo`, so only EPSG:4326 geometries are
//! accepted.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use geo::{Geodesic, Length};
use ihike_database_models::{
    LengthUpdate, NewTrail, StoredTrail, TrailOrdering, TrailPage, TrailQuery, TrailRow,
    TrailUpdate,
};
use ihike_geometry::{DEFAULT_SRID, MultiLine};
use ihike_trail_models::{Difficulty, LengthKm, TrailKind};
use tokio::sync::Mutex;

use crate::DbError;
use crate::store::{TrailDatastore, TrailReader, TrailStore, TrailTransaction};

#[derive(Debug, Clone)]
struct MemoryTrail {
    kind: TrailKind,
    external_id: Option<i64>,
    name: String,
    category: String,
    difficulty: Difficulty,
    scale_raw: Option<String>,
    length_km: LengthKm,
    website: String,
    geometry: MultiLine,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    trails: BTreeMap<i64, MemoryTrail>,
}

impl MemoryState {
    fn find(&self, kind: TrailKind, external_id: i64) -> Option<(i64, &MemoryTrail)> {
        self.trails
            .iter()
            .find(|(_, t)| t.kind == kind && t.external_id == Some(external_id))
            .map(|(id, t)| (*id, t))
    }

    fn get_mut(&mut self, kind: TrailKind, id: i64) -> Result<&mut MemoryTrail, DbError> {
        self.trails
            .get_mut(&id)
            .filter(|t| t.kind == kind)
            .ok_or(DbError::NotFound { kind, id })
    }
}

fn geodesic_length(geometry: &MultiLine) -> Result<LengthKm, DbError> {
    let metres = Geodesic.length(&geometry.lines);
    LengthKm::from_km(metres / 1000.0).map_err(|e| DbError::Conversion {
        message: format!("Geodesic length out of range: {e}"),
    })
}

fn stored(id: i64, trail: &MemoryTrail) -> StoredTrail {
    StoredTrail {
        id,
        scale_raw: trail.scale_raw.clone(),
        length_km: Some(trail.length_km),
        website: trail.website.clone(),
        category: trail.category.clone(),
    }
}

fn row(id: i64, trail: &MemoryTrail) -> Result<TrailRow, DbError> {
    Ok(TrailRow {
        id,
        external_id: trail.external_id,
        name: trail.name.clone(),
        category: trail.category.clone(),
        difficulty: trail.difficulty,
        length_km: trail.length_km,
        website: trail.website.clone(),
        geometry: trail.geometry.to_geojson_value()?,
    })
}

fn matches(query: &TrailQuery, trail: &MemoryTrail) -> bool {
    if trail.kind != query.kind {
        return false;
    }
    if query.external_id.is_some() && trail.external_id != query.external_id {
        return false;
    }
    if !query.external_id_in.is_empty()
        && !trail
            .external_id
            .is_some_and(|id| query.external_id_in.contains(&id))
    {
        return false;
    }
    if query.difficulty.is_some_and(|d| d != trail.difficulty) {
        return false;
    }
    if !query.difficulty_in.is_empty() && !query.difficulty_in.contains(&trail.difficulty) {
        return false;
    }
    if query.category.as_ref().is_some_and(|c| *c != trail.category) {
        return false;
    }
    if !query.category_in.is_empty() && !query.category_in.contains(&trail.category) {
        return false;
    }
    if query.length_min.is_some_and(|min| trail.length_km < min) {
        return false;
    }
    if query.length_max.is_some_and(|max| trail.length_km > max) {
        return false;
    }
    if let Some(bbox) = &query.bbox {
        return trail
            .geometry
            .lines
            .0
            .iter()
            .flat_map(|line| line.coords())
            .all(|c| bbox.contains(c.x, c.y));
    }
    true
}

fn compare(ordering: TrailOrdering, a: (i64, &MemoryTrail), b: (i64, &MemoryTrail)) -> Ordering {
    let primary = match ordering {
        TrailOrdering::Name => a.1.name.cmp(&b.1.name),
        TrailOrdering::NameDesc => b.1.name.cmp(&a.1.name),
        TrailOrdering::Length => a.1.length_km.cmp(&b.1.length_km),
        TrailOrdering::LengthDesc => b.1.length_km.cmp(&a.1.length_km),
    };
    primary.then(a.0.cmp(&b.0))
}

/// Trail storage held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatastore {
    committed: Arc<Mutex<MemoryState>>,
}

impl MemoryDatastore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed records of `kind`.
    pub async fn count(&self, kind: TrailKind) -> usize {
        self.committed
            .lock()
            .await
            .trails
            .values()
            .filter(|t| t.kind == kind)
            .count()
    }

    /// The committed record of `kind` with this external id.
    pub async fn stored(&self, kind: TrailKind, external_id: i64) -> Option<StoredTrail> {
        let state = self.committed.lock().await;
        state
            .find(kind, external_id)
            .map(|(id, trail)| stored(id, trail))
    }
}

#[async_trait]
impl TrailDatastore for MemoryDatastore {
    async fn begin(&self) -> Result<Box<dyn TrailTransaction>, DbError> {
        let working = self.committed.lock().await.clone();
        Ok(Box::new(MemoryTransaction {
            committed: Arc::clone(&self.committed),
            working: Mutex::new(working),
        }))
    }
}

#[async_trait]
impl TrailReader for MemoryDatastore {
    async fn query_trails(&self, query: &TrailQuery) -> Result<TrailPage, DbError> {
        let state = self.committed.lock().await;

        let mut matched: Vec<(i64, &MemoryTrail)> = state
            .trails
            .iter()
            .filter(|(_, t)| matches(query, t))
            .map(|(id, t)| (*id, t))
            .collect();
        matched.sort_by(|a, b| compare(query.ordering, *a, *b));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let rows = matched
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(id, t)| row(*id, t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TrailPage {
            count: matched.len() as u64,
            rows,
        })
    }

    async fn get_trail(&self, kind: TrailKind, id: i64) -> Result<Option<TrailRow>, DbError> {
        let state = self.committed.lock().await;
        state
            .trails
            .get(&id)
            .filter(|t| t.kind == kind)
            .map(|t| row(id, t))
            .transpose()
    }
}

/// An open in-memory transaction.
pub struct MemoryTransaction {
    committed: Arc<Mutex<MemoryState>>,
    working: Mutex<MemoryState>,
}

#[async_trait]
impl TrailStore for MemoryTransaction {
    async fn find_by_external_id(
        &self,
        kind: TrailKind,
        external_id: i64,
    ) -> Result<Option<StoredTrail>, DbError> {
        let state = self.working.lock().await;
        Ok(state
            .find(kind, external_id)
            .map(|(id, trail)| stored(id, trail)))
    }

    async fn insert_trail(&self, kind: TrailKind, trail: &NewTrail) -> Result<i64, DbError> {
        if trail.geometry.srid != DEFAULT_SRID {
            return Err(DbError::UnsupportedSrid {
                srid: trail.geometry.srid,
            });
        }

        let mut state = self.working.lock().await;
        if let Some(external_id) = trail.external_id {
            if state.find(kind, external_id).is_some() {
                return Err(DbError::Conflict { kind, external_id });
            }
        }

        state.next_id += 1;
        let id = state.next_id;
        state.trails.insert(
            id,
            MemoryTrail {
                kind,
                external_id: trail.external_id,
                name: trail.name.clone(),
                category: trail.category.clone(),
                difficulty: trail.difficulty,
                scale_raw: trail.scale_raw.clone(),
                length_km: trail.length_km.unwrap_or(LengthKm::ZERO),
                website: trail.website.clone(),
                geometry: trail.geometry.clone(),
            },
        );

        Ok(id)
    }

    async fn update_trail(
        &self,
        kind: TrailKind,
        id: i64,
        update: &TrailUpdate,
    ) -> Result<(), DbError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut state = self.working.lock().await;
        let trail = state.get_mut(kind, id)?;

        if let Some(scale) = &update.scale {
            trail.scale_raw.clone_from(&scale.scale_raw);
            trail.difficulty = scale.difficulty;
        }
        match update.length {
            Some(LengthUpdate::Supplied(length)) => trail.length_km = length,
            Some(LengthUpdate::Geodesic) => trail.length_km = geodesic_length(&trail.geometry)?,
            None => {}
        }
        if let Some(website) = &update.website {
            trail.website.clone_from(website);
        }
        if let Some(category) = &update.category {
            trail.category.clone_from(category);
        }

        Ok(())
    }

    async fn backfill_geodesic_length(&self, kind: TrailKind, id: i64) -> Result<(), DbError> {
        let mut state = self.working.lock().await;
        let trail = state.get_mut(kind, id)?;
        trail.length_km = geodesic_length(&trail.geometry)?;
        Ok(())
    }
}

#[async_trait]
impl TrailTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let Self { committed, working } = *self;
        *committed.lock().await = working.into_inner();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiLineString};
    use ihike_database_models::BoundingBox;

    fn geometry(coords: Vec<(f64, f64)>) -> MultiLine {
        MultiLine {
            lines: MultiLineString::new(vec![LineString::from(coords)]),
            srid: DEFAULT_SRID,
        }
    }

    fn new_trail(external_id: Option<i64>, name: &str) -> NewTrail {
        NewTrail {
            external_id,
            name: name.to_string(),
            category: "hiking".to_string(),
            difficulty: Difficulty::Unknown,
            scale_raw: None,
            length_km: None,
            website: String::new(),
            geometry: geometry(vec![(7.0, 46.0), (7.0, 46.01)]),
        }
    }

    #[tokio::test]
    async fn writes_are_visible_only_after_commit() {
        let store = MemoryDatastore::new();
        let txn = store.begin().await.unwrap();
        txn.insert_trail(TrailKind::Route, &new_trail(Some(1), "a"))
            .await
            .unwrap();
        assert!(
            txn.find_by_external_id(TrailKind::Route, 1)
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(store.count(TrailKind::Route).await, 0);

        txn.commit().await.unwrap();
        assert_eq!(store.count(TrailKind::Route).await, 1);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = MemoryDatastore::new();
        let txn = store.begin().await.unwrap();
        txn.insert_trail(TrailKind::Ways, &new_trail(None, "a"))
            .await
            .unwrap();
        txn.rollback().await.unwrap();
        assert_eq!(store.count(TrailKind::Ways).await, 0);
    }

    #[tokio::test]
    async fn external_ids_are_unique_per_kind() {
        let store = MemoryDatastore::new();
        let txn = store.begin().await.unwrap();
        txn.insert_trail(TrailKind::Route, &new_trail(Some(7), "a"))
            .await
            .unwrap();
        txn.insert_trail(TrailKind::Ways, &new_trail(Some(7), "b"))
            .await
            .unwrap();
        let err = txn
            .insert_trail(TrailKind::Route, &new_trail(Some(7), "c"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Conflict {
                kind: TrailKind::Route,
                external_id: 7
            }
        ));
        txn.insert_trail(TrailKind::Route, &new_trail(None, "d"))
            .await
            .unwrap();
        txn.insert_trail(TrailKind::Route, &new_trail(None, "e"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn backfills_geodesic_length() {
        let store = MemoryDatastore::new();
        let txn = store.begin().await.unwrap();
        let id = txn
            .insert_trail(TrailKind::Route, &new_trail(Some(1), "a"))
            .await
            .unwrap();
        txn.backfill_geodesic_length(TrailKind::Route, id)
            .await
            .unwrap();
        txn.commit().await.unwrap();

        // 0.01 degrees of latitude at 46N is roughly 1.111 km.
        let length = store.stored(TrailKind::Route, 1).await.unwrap().length_km.unwrap();
        assert!((1_100..1_120).contains(&length.millis()), "{length}");
    }

    #[tokio::test]
    async fn rejects_projected_geometries() {
        let store = MemoryDatastore::new();
        let txn = store.begin().await.unwrap();
        let mut trail = new_trail(None, "a");
        trail.geometry.srid = 3857;
        assert!(matches!(
            txn.insert_trail(TrailKind::Route, &trail).await,
            Err(DbError::UnsupportedSrid { srid: 3857 })
        ));
    }

    #[tokio::test]
    async fn lists_with_filters_and_ordering() {
        let store = MemoryDatastore::new();
        let txn = store.begin().await.unwrap();
        for (id, name, millis) in [(1, "Charlie", 3_000), (2, "alpha", 1_000), (3, "Bravo", 2_000)] {
            let mut trail = new_trail(Some(id), name);
            trail.length_km = LengthKm::from_millis(millis).ok();
            txn.insert_trail(TrailKind::Route, &trail).await.unwrap();
        }
        let mut far = new_trail(Some(4), "Delta");
        far.geometry = geometry(vec![(10.0, 50.0), (10.1, 50.1)]);
        far.length_km = LengthKm::from_millis(4_000).ok();
        txn.insert_trail(TrailKind::Route, &far).await.unwrap();
        txn.commit().await.unwrap();

        let mut query = TrailQuery::new(TrailKind::Route, 2);
        query.ordering = TrailOrdering::LengthDesc;
        let page = store.query_trails(&query).await.unwrap();
        assert_eq!(page.count, 4);
        let names: Vec<&str> = page.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Delta", "Charlie"]);

        query.offset = 2;
        query.bbox = Some(BoundingBox::new(6.0, 45.0, 8.0, 47.0));
        query.ordering = TrailOrdering::Name;
        let page = store.query_trails(&query).await.unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.rows.len(), 1);

        let mut query = TrailQuery::new(TrailKind::Route, 10);
        query.length_min = LengthKm::from_millis(2_000).ok();
        query.length_max = LengthKm::from_millis(3_000).ok();
        let page = store.query_trails(&query).await.unwrap();
        assert_eq!(page.count, 2);

        assert!(store.get_trail(TrailKind::Ways, 1).await.unwrap().is_none());
        let row = store.get_trail(TrailKind::Route, 1).await.unwrap().unwrap();
        assert_eq!(row.geometry["type"], "MultiLineString");
    }
}
