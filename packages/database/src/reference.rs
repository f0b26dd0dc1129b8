//! Reference data reads: district geometry, the IMD district boundary
//! lookup, and the latest cyclone-impacted circles.

use std::collections::{BTreeMap, BTreeSet};

use duckdb::Connection;
use geo::MultiPolygon;
use hazard_models::{DistrictGeometry, HazardFeature};
use hazard_spatial::metric_centroid;
use hazard_spatial::normalize::parse_geojson_to_multipolygon;

use crate::DbError;

/// Loads the district reference, reducing each boundary to its centroid
/// (computed in a metric projection).
///
/// Rows without a circle or with an unreadable boundary are skipped. When
/// `circles` is given, only districts of those circles are returned.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn load_district_geometry(
    conn: &Connection,
    circles: Option<&[String]>,
) -> Result<Vec<DistrictGeometry>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT district, indus_circle, indus_circle_name, geometry
         FROM district_geometry
         WHERE indus_circle IS NOT NULL AND indus_circle <> ''",
    )?;
    let mut rows = stmt.query([])?;

    let mut districts = Vec::new();
    let mut skipped = 0usize;

    while let Some(row) = rows.next()? {
        let district: String = row.get(0)?;
        let indus_circle: String = row.get(1)?;
        let circle_name: Option<String> = row.get(2)?;
        let geometry: Option<String> = row.get(3)?;

        if let Some(filter) = circles
            && !filter.contains(&indus_circle)
        {
            continue;
        }

        let Some(boundary) = geometry.as_deref().and_then(parse_geojson_to_multipolygon) else {
            log::warn!("district_geometry: unreadable boundary for {district} ({indus_circle})");
            skipped += 1;
            continue;
        };
        let Some(point) = metric_centroid(&boundary) else {
            log::warn!("district_geometry: empty boundary for {district} ({indus_circle})");
            skipped += 1;
            continue;
        };

        districts.push(DistrictGeometry {
            district,
            indus_circle,
            circle_name,
            boundary: Some(boundary),
            point,
        });
    }

    log::info!(
        "Loaded {} reference districts ({skipped} skipped)",
        districts.len()
    );
    Ok(districts)
}

/// Fills in geometry for features that arrived without one, using the
/// `imd_district` boundary of their district id. Features that still have
/// no geometry are dropped.
///
/// # Errors
///
/// Returns [`DbError`] if the lookup query fails.
pub fn resolve_missing_geometry(
    conn: &Connection,
    features: Vec<HazardFeature>,
) -> Result<Vec<HazardFeature>, DbError> {
    let wanted: BTreeSet<i64> = features
        .iter()
        .filter(|f| f.geometry.is_none())
        .filter_map(|f| f.warning.district_id)
        .collect();

    if wanted.is_empty() && features.iter().all(|f| f.geometry.is_some()) {
        return Ok(features);
    }

    let boundaries = imd_district_boundaries(conn, &wanted)?;
    let total = features.len();

    let resolved: Vec<HazardFeature> = features
        .into_iter()
        .filter_map(|mut f| {
            if f.geometry.is_none() {
                f.geometry = f
                    .warning
                    .district_id
                    .and_then(|id| boundaries.get(&id).cloned());
            }
            if f.geometry.is_none() {
                log::warn!(
                    "No boundary for district {:?} (id {:?}); feature dropped",
                    f.warning.district,
                    f.warning.district_id
                );
                return None;
            }
            Some(f)
        })
        .collect();

    log::info!(
        "Resolved geometry for {} of {total} features via imd_district",
        resolved.len()
    );
    Ok(resolved)
}

fn imd_district_boundaries(
    conn: &Connection,
    ids: &BTreeSet<i64>,
) -> Result<BTreeMap<i64, MultiPolygon<f64>>, DbError> {
    let mut map = BTreeMap::new();
    if ids.is_empty() {
        return Ok(map);
    }

    let mut stmt = conn.prepare("SELECT district_id, geom FROM imd_district")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        if !ids.contains(&id) {
            continue;
        }
        let geom: String = row.get(1)?;
        if let Some(mp) = parse_geojson_to_multipolygon(&geom) {
            map.insert(id, mp);
        }
    }
    Ok(map)
}

/// Circles named in the most recent `cyclone_impacted_circles` insert.
///
/// `name` values are comma-separated lists; the result is de-duplicated
/// in first-seen order. An empty table yields an empty list.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn cyclone_impacted_circles(conn: &Connection) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM cyclone_impacted_circles
         WHERE inserted_at = (SELECT MAX(inserted_at) FROM cyclone_impacted_circles)",
    )?;
    let mut rows = stmt.query([])?;

    let mut seen = BTreeSet::new();
    let mut circles = Vec::new();
    while let Some(row) = rows.next()? {
        let name: Option<String> = row.get(0)?;
        for circle in name.iter().flat_map(|n| n.split(',')) {
            let circle = circle.trim();
            if !circle.is_empty() && seen.insert(circle.to_string()) {
                circles.push(circle.to_string());
            }
        }
    }

    log::info!("Latest cyclone-impacted circles: {circles:?}");
    Ok(circles)
}
