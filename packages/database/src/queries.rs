//! Raw `PostGIS` queries over the `trails` table.
//!
//! Lengths cross the wire as integer thousandths (`BIGINT`) and are
//! converted to and from `NUMERIC(9,3)` in SQL so no floating point is
//! involved on either side.

use std::fmt::Write as _;

use ihike_database_models::{
    LengthUpdate, NewTrail, StoredTrail, TrailOrdering, TrailPage, TrailQuery, TrailRow,
    TrailUpdate,
};
use ihike_trail_models::{Difficulty, LengthKm, TrailKind};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;

/// Spheroidal length of the stored geometry in kilometres, rounded to
/// three decimals.
pub const GEODESIC_LENGTH_SQL: &str =
    "ROUND((ST_Length(geometry::geography, true) / 1000.0)::numeric, 3)";

const ROW_COLUMNS: &str = "id, external_id, name, category, difficulty,
    (ROUND(length_km * 1000))::BIGINT AS length_millis, website,
    ST_AsGeoJSON(geometry) AS geometry_json";

/// Appends `value` to `params` and returns its placeholder.
fn bind(params: &mut Vec<DatabaseValue>, value: DatabaseValue) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn kind_value(kind: TrailKind) -> DatabaseValue {
    DatabaseValue::String(kind.as_ref().to_string())
}

fn optional_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| DatabaseValue::String(s.to_string()))
}

fn length_from_millis(millis: Option<i64>) -> Result<Option<LengthKm>, DbError> {
    millis
        .map(LengthKm::from_millis)
        .transpose()
        .map_err(|e| DbError::Conversion {
            message: format!("Invalid stored length: {e}"),
        })
}

/// Looks up the record of `kind` with the given external id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_by_external_id(
    db: &dyn Database,
    kind: TrailKind,
    external_id: i64,
) -> Result<Option<StoredTrail>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, scale_raw, category, website,
                    (ROUND(length_km * 1000))::BIGINT AS length_millis
             FROM trails
             WHERE kind = $1 AND external_id = $2
             LIMIT 1",
            &[kind_value(kind), DatabaseValue::Int64(external_id)],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse trail id: {e}"),
    })?;
    let length_millis: Option<i64> = row.to_value("length_millis").unwrap_or(None);

    Ok(Some(StoredTrail {
        id,
        scale_raw: row.to_value("scale_raw").unwrap_or(None),
        length_km: length_from_millis(length_millis)?,
        website: row.to_value("website").unwrap_or_default(),
        category: row.to_value("category").unwrap_or_default(),
    }))
}

/// Inserts a new record and returns its id.
///
/// A missing length is stored as the zero sentinel. Geometries in a
/// reference other than EPSG:4326 are transformed by the database.
///
/// # Errors
///
/// Returns [`DbError`] if the geometry cannot be serialized or the insert
/// fails (including a `(kind, external_id)` uniqueness violation).
pub async fn insert_trail(
    db: &dyn Database,
    kind: TrailKind,
    trail: &NewTrail,
) -> Result<i64, DbError> {
    let srid = i32::try_from(trail.geometry.srid).map_err(|_| DbError::UnsupportedSrid {
        srid: trail.geometry.srid,
    })?;

    let rows = db
        .query_raw_params(
            "INSERT INTO trails (
                kind, external_id, name, category, difficulty, scale_raw,
                length_km, website, geometry
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                ($7::BIGINT)::numeric / 1000, $8,
                ST_Multi(ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON($9), $10::INTEGER), 4326))
            )
            RETURNING id",
            &[
                kind_value(kind),
                trail
                    .external_id
                    .map_or(DatabaseValue::Null, DatabaseValue::Int64),
                DatabaseValue::String(trail.name.clone()),
                DatabaseValue::String(trail.category.clone()),
                DatabaseValue::String(trail.difficulty.as_ref().to_string()),
                optional_string(trail.scale_raw.as_deref()),
                DatabaseValue::Int64(trail.length_km.unwrap_or(LengthKm::ZERO).millis()),
                DatabaseValue::String(trail.website.clone()),
                DatabaseValue::String(trail.geometry.to_geojson_string()?),
                DatabaseValue::Int32(srid),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Insert returned no id".to_string(),
    })?;

    row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse trail id: {e}"),
    })
}

/// Applies a partial update to one record. An empty update is a no-op.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no record of `kind` has this id, or
/// [`DbError`] if the update fails.
pub async fn update_trail(
    db: &dyn Database,
    kind: TrailKind,
    id: i64,
    update: &TrailUpdate,
) -> Result<(), DbError> {
    if update.is_empty() {
        return Ok(());
    }

    let mut params = Vec::new();
    let mut assignments = Vec::new();

    if let Some(scale) = &update.scale {
        let scale_raw = bind(&mut params, optional_string(scale.scale_raw.as_deref()));
        let difficulty = bind(
            &mut params,
            DatabaseValue::String(scale.difficulty.as_ref().to_string()),
        );
        assignments.push(format!("scale_raw = {scale_raw}"));
        assignments.push(format!("difficulty = {difficulty}"));
    }

    match update.length {
        Some(LengthUpdate::Supplied(length)) => {
            let millis = bind(&mut params, DatabaseValue::Int64(length.millis()));
            assignments.push(format!("length_km = ({millis}::BIGINT)::numeric / 1000"));
        }
        Some(LengthUpdate::Geodesic) => {
            assignments.push(format!("length_km = {GEODESIC_LENGTH_SQL}"));
        }
        None => {}
    }

    if let Some(website) = &update.website {
        let website = bind(&mut params, DatabaseValue::String(website.clone()));
        assignments.push(format!("website = {website}"));
    }

    if let Some(category) = &update.category {
        let category = bind(&mut params, DatabaseValue::String(category.clone()));
        assignments.push(format!("category = {category}"));
    }

    let id_param = bind(&mut params, DatabaseValue::Int64(id));
    let kind_param = bind(&mut params, kind_value(kind));
    let sql = format!(
        "UPDATE trails SET {} WHERE id = {id_param} AND kind = {kind_param}",
        assignments.join(", ")
    );

    let affected = db.exec_raw_params(&sql, &params).await?;
    if affected == 0 {
        return Err(DbError::NotFound { kind, id });
    }

    Ok(())
}

/// Sets the length of one record to the geodesic length of its geometry.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails or the record does not exist.
pub async fn backfill_geodesic_length(
    db: &dyn Database,
    kind: TrailKind,
    id: i64,
) -> Result<(), DbError> {
    let update = TrailUpdate {
        length: Some(LengthUpdate::Geodesic),
        ..TrailUpdate::default()
    };
    update_trail(db, kind, id, &update).await
}

/// Writes the `WHERE` clause for `query` into `sql`.
fn push_filters(sql: &mut String, params: &mut Vec<DatabaseValue>, query: &TrailQuery) {
    let kind = bind(params, kind_value(query.kind));
    write!(sql, " WHERE kind = {kind}").unwrap();

    if let Some(external_id) = query.external_id {
        let p = bind(params, DatabaseValue::Int64(external_id));
        write!(sql, " AND external_id = {p}").unwrap();
    }
    if !query.external_id_in.is_empty() {
        let list: Vec<String> = query
            .external_id_in
            .iter()
            .map(|id| bind(params, DatabaseValue::Int64(*id)))
            .collect();
        write!(sql, " AND external_id IN ({})", list.join(", ")).unwrap();
    }

    if let Some(difficulty) = query.difficulty {
        let p = bind(params, DatabaseValue::String(difficulty.as_ref().to_string()));
        write!(sql, " AND difficulty = {p}").unwrap();
    }
    if !query.difficulty_in.is_empty() {
        let list: Vec<String> = query
            .difficulty_in
            .iter()
            .map(|d| bind(params, DatabaseValue::String(d.as_ref().to_string())))
            .collect();
        write!(sql, " AND difficulty IN ({})", list.join(", ")).unwrap();
    }

    if let Some(category) = &query.category {
        let p = bind(params, DatabaseValue::String(category.clone()));
        write!(sql, " AND category = {p}").unwrap();
    }
    if !query.category_in.is_empty() {
        let list: Vec<String> = query
            .category_in
            .iter()
            .map(|c| bind(params, DatabaseValue::String(c.clone())))
            .collect();
        write!(sql, " AND category IN ({})", list.join(", ")).unwrap();
    }

    if let Some(min) = query.length_min {
        let p = bind(params, DatabaseValue::Int64(min.millis()));
        write!(sql, " AND length_km >= ({p}::BIGINT)::numeric / 1000").unwrap();
    }
    if let Some(max) = query.length_max {
        let p = bind(params, DatabaseValue::Int64(max.millis()));
        write!(sql, " AND length_km <= ({p}::BIGINT)::numeric / 1000").unwrap();
    }

    if let Some(bbox) = &query.bbox {
        let west = bind(params, DatabaseValue::Real64(bbox.west));
        let south = bind(params, DatabaseValue::Real64(bbox.south));
        let east = bind(params, DatabaseValue::Real64(bbox.east));
        let north = bind(params, DatabaseValue::Real64(bbox.north));
        write!(
            sql,
            " AND geometry @ ST_MakeEnvelope({west}, {south}, {east}, {north}, 4326)"
        )
        .unwrap();
    }
}

const fn order_clause(ordering: TrailOrdering) -> &'static str {
    match ordering {
        TrailOrdering::Name => " ORDER BY name ASC, id ASC",
        TrailOrdering::NameDesc => " ORDER BY name DESC, id ASC",
        TrailOrdering::Length => " ORDER BY length_km ASC, id ASC",
        TrailOrdering::LengthDesc => " ORDER BY length_km DESC, id ASC",
    }
}

fn trail_row(row: &Row) -> Result<TrailRow, DbError> {
    let difficulty: String = row.to_value("difficulty").unwrap_or_default();
    let length_millis: Option<i64> = row.to_value("length_millis").unwrap_or(None);
    let geometry_json: String = row.to_value("geometry_json").unwrap_or_default();
    let geometry = serde_json::from_str(&geometry_json).map_err(|e| DbError::Conversion {
        message: format!("Failed to parse stored geometry: {e}"),
    })?;

    Ok(TrailRow {
        id: row.to_value("id").unwrap_or(0),
        external_id: row.to_value("external_id").unwrap_or(None),
        name: row.to_value("name").unwrap_or_default(),
        category: row.to_value("category").unwrap_or_default(),
        difficulty: difficulty.parse().unwrap_or(Difficulty::Unknown),
        length_km: length_from_millis(length_millis)?.unwrap_or_default(),
        website: row.to_value("website").unwrap_or_default(),
        geometry,
    })
}

/// Counts the trails matching `query` and returns the requested page.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn query_trails(db: &dyn Database, query: &TrailQuery) -> Result<TrailPage, DbError> {
    let mut count_sql = String::from("SELECT COUNT(*) AS count FROM trails");
    let mut count_params = Vec::new();
    push_filters(&mut count_sql, &mut count_params, query);

    let rows = db.query_raw_params(&count_sql, &count_params).await?;
    let count: i64 = rows
        .first()
        .and_then(|row| row.to_value("count").ok())
        .unwrap_or(0);

    let mut sql = format!("SELECT {ROW_COLUMNS} FROM trails");
    let mut params = Vec::new();
    push_filters(&mut sql, &mut params, query);
    sql.push_str(order_clause(query.ordering));

    let offset = i64::try_from(query.offset).map_err(|_| DbError::Conversion {
        message: format!("Offset {} out of range", query.offset),
    })?;
    let limit = bind(&mut params, DatabaseValue::Int64(i64::from(query.limit)));
    let offset = bind(&mut params, DatabaseValue::Int64(offset));
    write!(sql, " LIMIT {limit} OFFSET {offset}").unwrap();

    let rows = db.query_raw_params(&sql, &params).await?;
    let rows = rows.iter().map(trail_row).collect::<Result<Vec<_>, _>>()?;

    Ok(TrailPage {
        count: u64::try_from(count).unwrap_or(0),
        rows,
    })
}

/// Fetches one record of `kind` by primary key.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_trail(
    db: &dyn Database,
    kind: TrailKind,
    id: i64,
) -> Result<Option<TrailRow>, DbError> {
    let sql = format!("SELECT {ROW_COLUMNS} FROM trails WHERE kind = $1 AND id = $2");
    let rows = db
        .query_raw_params(&sql, &[kind_value(kind), DatabaseValue::Int64(id)])
        .await?;

    rows.first().map(trail_row).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ihike_database_models::BoundingBox;

    #[test]
    fn filters_number_placeholders_in_order() {
        let mut query = TrailQuery::new(TrailKind::Route, 10);
        query.external_id_in = vec![1, 2];
        query.difficulty = Some(Difficulty::Hard);
        query.length_min = LengthKm::from_millis(5_000).ok();
        query.bbox = Some(BoundingBox::new(7.0, 46.0, 8.0, 47.0));

        let mut sql = String::new();
        let mut params = Vec::new();
        push_filters(&mut sql, &mut params, &query);

        assert_eq!(
            sql,
            " WHERE kind = $1 AND external_id IN ($2, $3) AND difficulty = $4 \
             AND length_km >= ($5::BIGINT)::numeric / 1000 \
             AND geometry @ ST_MakeEnvelope($6, $7, $8, $9, 4326)"
        );
        assert_eq!(params.len(), 9);
    }

    #[test]
    fn unfiltered_query_only_selects_kind() {
        let mut sql = String::new();
        let mut params = Vec::new();
        push_filters(&mut sql, &mut params, &TrailQuery::new(TrailKind::Ways, 10));
        assert_eq!(sql, " WHERE kind = $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn orderings_break_ties_by_id() {
        assert_eq!(
            order_clause(TrailOrdering::LengthDesc),
            " ORDER BY length_km DESC, id ASC"
        );
        assert!(order_clause(TrailOrdering::Name).ends_with("id ASC"));
    }
}
