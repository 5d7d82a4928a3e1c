//! Storage traits used by the importer and the query API, and their
//! `PostGIS` implementation.
//!
//! The importer only ever writes inside a [`TrailTransaction`]; the query
//! API only reads through a [`TrailReader`].

use std::sync::Arc;

use async_trait::async_trait;
use ihike_database_models::{NewTrail, StoredTrail, TrailPage, TrailQuery, TrailRow, TrailUpdate};
use ihike_trail_models::TrailKind;
use switchy_database::{Database, DatabaseTransaction};

use crate::{DbError, queries};

/// Record-level operations the importer needs.
#[async_trait]
pub trait TrailStore: Send + Sync {
    /// Looks up the record of `kind` with this external id.
    async fn find_by_external_id(
        &self,
        kind: TrailKind,
        external_id: i64,
    ) -> Result<Option<StoredTrail>, DbError>;

    /// Inserts a record and returns its id.
    async fn insert_trail(&self, kind: TrailKind, trail: &NewTrail) -> Result<i64, DbError>;

    /// Applies a partial update.
    async fn update_trail(
        &self,
        kind: TrailKind,
        id: i64,
        update: &TrailUpdate,
    ) -> Result<(), DbError>;

    /// Replaces the stored length with the geodesic length of the
    /// record's geometry.
    async fn backfill_geodesic_length(&self, kind: TrailKind, id: i64) -> Result<(), DbError>;
}

/// A [`TrailStore`] whose writes become visible only on commit.
#[async_trait]
pub trait TrailTransaction: TrailStore {
    /// Makes every write visible.
    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    /// Discards every write.
    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

/// Something that can open write transactions.
#[async_trait]
pub trait TrailDatastore: Send + Sync {
    /// Starts a transaction.
    async fn begin(&self) -> Result<Box<dyn TrailTransaction>, DbError>;
}

/// Read access for the query API.
#[async_trait]
pub trait TrailReader: Send + Sync {
    /// Counts the matches for `query` and returns the requested page.
    async fn query_trails(&self, query: &TrailQuery) -> Result<TrailPage, DbError>;

    /// Fetches one record by primary key.
    async fn get_trail(&self, kind: TrailKind, id: i64) -> Result<Option<TrailRow>, DbError>;
}

/// The `PostGIS`-backed datastore.
#[derive(Clone)]
pub struct PostgisDatastore {
    db: Arc<dyn Database>,
}

impl PostgisDatastore {
    /// Wraps an open connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TrailDatastore for PostgisDatastore {
    async fn begin(&self) -> Result<Box<dyn TrailTransaction>, DbError> {
        let txn = self.db.begin_transaction().await?;
        Ok(Box::new(PostgisTransaction { txn }))
    }
}

#[async_trait]
impl TrailReader for PostgisDatastore {
    async fn query_trails(&self, query: &TrailQuery) -> Result<TrailPage, DbError> {
        queries::query_trails(self.db.as_ref(), query).await
    }

    async fn get_trail(&self, kind: TrailKind, id: i64) -> Result<Option<TrailRow>, DbError> {
        queries::get_trail(self.db.as_ref(), kind, id).await
    }
}

/// An open `PostGIS` transaction.
pub struct PostgisTransaction {
    txn: Box<dyn DatabaseTransaction>,
}

#[async_trait]
impl TrailStore for PostgisTransaction {
    async fn find_by_external_id(
        &self,
        kind: TrailKind,
        external_id: i64,
    ) -> Result<Option<StoredTrail>, DbError> {
        queries::find_by_external_id(self.txn.as_ref(), kind, external_id).await
    }

    async fn insert_trail(&self, kind: TrailKind, trail: &NewTrail) -> Result<i64, DbError> {
        queries::insert_trail(self.txn.as_ref(), kind, trail).await
    }

    async fn update_trail(
        &self,
        kind: TrailKind,
        id: i64,
        update: &TrailUpdate,
    ) -> Result<(), DbError> {
        queries::update_trail(self.txn.as_ref(), kind, id, update).await
    }

    async fn backfill_geodesic_length(&self, kind: TrailKind, id: i64) -> Result<(), DbError> {
        queries::backfill_geodesic_length(self.txn.as_ref(), kind, id).await
    }
}

#[async_trait]
impl TrailTransaction for PostgisTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.txn.rollback().await?;
        Ok(())
    }
}
