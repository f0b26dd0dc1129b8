//! Raw GeoJSON geometry to WGS84 `MultiPolygon` / `Point`.

use geo::{MultiPolygon, Point};
use geojson::GeoJson;
use serde_json::Value;

use crate::GeometryError;
use crate::projection::{EpsgTransform, from_web_mercator, multipolygon_from_web_mercator};

/// Coordinate reference system of an incoming payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// EPSG:4326 / OGC CRS84 longitude-latitude degrees.
    #[default]
    Wgs84,
    /// EPSG:3857 spherical Web Mercator metres.
    WebMercator,
    /// Any other EPSG code with a known PROJ.4 definition.
    Epsg(u16),
}

impl Crs {
    /// Reads the legacy GeoJSON `crs` member of a feature collection.
    ///
    /// A missing member means WGS84.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnsupportedCrs`] for a CRS with no known
    /// definition.
    pub fn from_crs_member(crs: Option<&Value>) -> Result<Self, GeometryError> {
        let Some(name) = crs
            .and_then(|c| c.get("properties"))
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
        else {
            return Ok(Self::Wgs84);
        };

        Self::from_name(name)
    }

    /// Parses a CRS name such as `EPSG:4326` or
    /// `urn:ogc:def:crs:EPSG::3857`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnsupportedCrs`] if the name carries no
    /// EPSG code or the code has no known definition.
    pub fn from_name(name: &str) -> Result<Self, GeometryError> {
        let code = name.rsplit(':').next().unwrap_or(name).trim();
        match code {
            "4326" | "CRS84" => Ok(Self::Wgs84),
            "3857" | "900913" => Ok(Self::WebMercator),
            _ => {
                let unsupported = || GeometryError::UnsupportedCrs {
                    name: name.to_string(),
                };
                let code = code.parse::<u16>().map_err(|_| unsupported())?;
                EpsgTransform::new(code).map_err(|_| unsupported())?;
                Ok(Self::Epsg(code))
            }
        }
    }
}

/// Returns `true` if a coordinate tree contains at least one position.
///
/// Catches `[]`, `[[]]`, and the `[[[]]]` sentinel some layers publish for
/// districts without a boundary.
#[must_use]
pub fn has_positions(coordinates: &Value) -> bool {
    match coordinates {
        Value::Array(items) => {
            if items.len() >= 2 && items.iter().all(Value::is_number) {
                return true;
            }
            items.iter().any(has_positions)
        }
        _ => false,
    }
}

/// Builds a WGS84 `MultiPolygon` from a raw GeoJSON geometry object.
///
/// `Polygon` is promoted to a single-member `MultiPolygon`.
///
/// # Errors
///
/// Returns a [`GeometryError`] if the geometry is missing, has no
/// coordinates, is not polygonal, cannot be decoded or cannot be
/// reprojected.
pub fn normalize_geometry(geometry: &Value, crs: Crs) -> Result<MultiPolygon<f64>, GeometryError> {
    let geo_geom = decode(geometry)?;

    let mp = match geo_geom {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        other => {
            return Err(GeometryError::Unsupported {
                geom_type: geometry_type_name(&other).to_string(),
            });
        }
    };

    if mp.0.is_empty() || mp.0.iter().all(|p| p.exterior().0.is_empty()) {
        return Err(GeometryError::Degenerate);
    }

    match crs {
        Crs::Wgs84 => Ok(mp),
        Crs::WebMercator => Ok(multipolygon_from_web_mercator(&mp)),
        Crs::Epsg(code) => EpsgTransform::new(code)?.multipolygon_to_wgs84(&mp),
    }
}

/// Builds a WGS84 `Point` from a raw GeoJSON geometry object.
///
/// # Errors
///
/// Returns a [`GeometryError`] if the geometry is missing, empty, not a
/// point, or cannot be reprojected.
pub fn normalize_point(geometry: &Value, crs: Crs) -> Result<Point<f64>, GeometryError> {
    match decode(geometry)? {
        geo::Geometry::Point(p) => match crs {
            Crs::Wgs84 => Ok(p),
            Crs::WebMercator => Ok(Point::from(from_web_mercator(p.0))),
            Crs::Epsg(code) => Ok(Point::from(EpsgTransform::new(code)?.to_wgs84(p.0)?)),
        },
        other => Err(GeometryError::Unsupported {
            geom_type: geometry_type_name(&other).to_string(),
        }),
    }
}

fn decode(geometry: &Value) -> Result<geo::Geometry<f64>, GeometryError> {
    if geometry.is_null() {
        return Err(GeometryError::Missing);
    }
    match geometry.get("coordinates") {
        Some(coords) if has_positions(coords) => {}
        _ => return Err(GeometryError::Degenerate),
    }

    let geom = geojson::Geometry::from_json_value(geometry.clone())?;
    Ok(geo::Geometry::<f64>::try_from(geom)?)
}

/// Parses a stored GeoJSON string into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
        match geo_geom {
            geo::Geometry::MultiPolygon(mp) => Some(mp),
            geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
            _ => None,
        }
    } else {
        None
    }
}

/// Serialises a multipolygon as a GeoJSON geometry string for storage.
#[must_use]
pub fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> String {
    geojson::Geometry::new(geojson::Value::from(mp)).to_string()
}

/// Serialises a point as a GeoJSON geometry string for storage.
#[must_use]
pub fn point_to_geojson(point: &Point<f64>) -> String {
    geojson::Geometry::new(geojson::Value::from(point)).to_string()
}

const fn geometry_type_name(geom: &geo::Geometry<f64>) -> &'static str {
    match geom {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn square() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[73.0, 18.0], [74.0, 18.0], [74.0, 19.0], [73.0, 19.0], [73.0, 18.0]]]
        })
    }

    #[test]
    fn promotes_polygon_to_multipolygon() {
        let mp = normalize_geometry(&square(), Crs::Wgs84).unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn keeps_multipolygon() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[73.0, 18.0], [74.0, 18.0], [74.0, 19.0], [73.0, 18.0]]],
                [[[75.0, 18.0], [76.0, 18.0], [76.0, 19.0], [75.0, 18.0]]]
            ]
        });
        let mp = normalize_geometry(&geometry, Crs::Wgs84).unwrap();
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn rejects_sentinel_and_missing_coordinates() {
        let sentinel = json!({"type": "Polygon", "coordinates": [[[]]]});
        assert!(matches!(
            normalize_geometry(&sentinel, Crs::Wgs84),
            Err(GeometryError::Degenerate)
        ));

        let empty = json!({"type": "MultiPolygon", "coordinates": []});
        assert!(matches!(
            normalize_geometry(&empty, Crs::Wgs84),
            Err(GeometryError::Degenerate)
        ));

        let no_coords = json!({"type": "Polygon"});
        assert!(matches!(
            normalize_geometry(&no_coords, Crs::Wgs84),
            Err(GeometryError::Degenerate)
        ));

        assert!(matches!(
            normalize_geometry(&Value::Null, Crs::Wgs84),
            Err(GeometryError::Missing)
        ));
    }

    #[test]
    fn rejects_point_as_hazard_coverage() {
        let point = json!({"type": "Point", "coordinates": [73.8, 18.5]});
        assert!(matches!(
            normalize_geometry(&point, Crs::Wgs84),
            Err(GeometryError::Unsupported { .. })
        ));
    }

    #[test]
    fn reprojects_web_mercator() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [111_319.490_793_273_57, 0.0], [111_319.490_793_273_57, 111_325.142_866_385_1], [0.0, 0.0]]]
        });
        let mp = normalize_geometry(&geometry, Crs::WebMercator).unwrap();
        let c = mp.0[0].exterior().0[2];
        assert!((c.x - 1.0).abs() < 1e-6);
        assert!((c.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reprojects_utm_zone_43n() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [[
                [370_000.0, 2_040_000.0],
                [390_000.0, 2_040_000.0],
                [390_000.0, 2_060_000.0],
                [370_000.0, 2_060_000.0],
                [370_000.0, 2_040_000.0]
            ]]
        });
        let crs = Crs::from_name("urn:ogc:def:crs:EPSG::32643").unwrap();
        let mp = normalize_geometry(&geometry, crs).unwrap();
        for c in &mp.0[0].exterior().0 {
            assert!((73.0..75.0).contains(&c.x), "lon {}", c.x);
            assert!((18.0..19.0).contains(&c.y), "lat {}", c.y);
        }

        let point = normalize_point(
            &json!({"type": "Point", "coordinates": [379_500.0, 2_048_000.0]}),
            crs,
        )
        .unwrap();
        assert!((point.x() - 73.86).abs() < 0.05);
        assert!((point.y() - 18.52).abs() < 0.05);
    }

    #[test]
    fn parses_crs_names() {
        assert_eq!(Crs::from_name("EPSG:4326").unwrap(), Crs::Wgs84);
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            Crs::Wgs84
        );
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:EPSG::3857").unwrap(),
            Crs::WebMercator
        );
        assert_eq!(Crs::from_name("EPSG:32643").unwrap(), Crs::Epsg(32643));
        assert!(Crs::from_name("EPSG:1").is_err());
        assert!(Crs::from_name("LOCAL_GRID").is_err());
        assert_eq!(Crs::from_crs_member(None).unwrap(), Crs::Wgs84);

        let member = json!({"type": "name", "properties": {"name": "EPSG:3857"}});
        assert_eq!(
            Crs::from_crs_member(Some(&member)).unwrap(),
            Crs::WebMercator
        );
    }

    #[test]
    fn point_round_trips_through_storage_string() {
        let p = normalize_point(
            &json!({"type": "Point", "coordinates": [73.85, 18.52]}),
            Crs::Wgs84,
        )
        .unwrap();
        let stored = point_to_geojson(&p);
        assert!(stored.contains("\"Point\""));

        let mp = normalize_geometry(&square(), Crs::Wgs84).unwrap();
        let back = parse_geojson_to_multipolygon(&multipolygon_to_geojson(&mp)).unwrap();
        assert_eq!(back, mp);
    }
}
