//! Spherical Web Mercator (EPSG:3857) projection, plus [`EpsgTransform`]
//! for every other published CRS.
//!
//! Web Mercator is used to compute polygon centroids in a metric space
//! before mapping them back to WGS84, and as the fast path for sources
//! that publish EPSG:3857.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Centroid, Coord, MapCoords, MultiPolygon, Point};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::GeometryError;

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// WGS84 semi-major axis in metres.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude bound of the Web Mercator square.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Projects a WGS84 coordinate (degrees) to Web Mercator metres.
#[must_use]
pub fn to_web_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: EARTH_RADIUS_M * coord.x.to_radians(),
        y: EARTH_RADIUS_M * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Inverse of [`to_web_mercator`].
#[must_use]
pub fn from_web_mercator(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

/// Reprojects a Web Mercator multipolygon to WGS84.
#[must_use]
pub fn multipolygon_from_web_mercator(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    mp.map_coords(from_web_mercator)
}

/// Centroid of a WGS84 multipolygon, computed in Web Mercator and mapped
/// back to WGS84.
///
/// Returns `None` for an empty multipolygon.
#[must_use]
pub fn metric_centroid(mp: &MultiPolygon<f64>) -> Option<Point<f64>> {
    let projected = mp.map_coords(to_web_mercator);
    let centroid = projected.centroid()?;
    Some(Point::from(from_web_mercator(centroid.0)))
}

/// PROJ.4 transform from an EPSG-coded CRS to WGS84 degrees.
pub struct EpsgTransform {
    code: u16,
    from: Proj,
    to: Proj,
}

impl EpsgTransform {
    /// Looks up the PROJ.4 definition for `code`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnsupportedCrs`] if no definition is known
    /// for `code`.
    pub fn new(code: u16) -> Result<Self, GeometryError> {
        let unsupported = |_| GeometryError::UnsupportedCrs {
            name: format!("EPSG:{code}"),
        };
        let from = Proj::from_epsg_code(code).map_err(unsupported)?;
        let to = Proj::from_proj_string(WGS84_PROJ4).map_err(unsupported)?;
        Ok(Self { code, from, to })
    }

    /// EPSG code of the source CRS.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Transforms one coordinate to WGS84 longitude/latitude degrees.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Reprojection`] if the coordinate falls
    /// outside the source projection's domain.
    pub fn to_wgs84(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
        // Geographic input is radians in, radians out.
        let mut point = if self.from.is_latlong() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point).map_err(|e| GeometryError::Reprojection {
            code: self.code,
            reason: e.to_string(),
        })?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    }

    /// Reprojects every vertex of `mp` to WGS84.
    ///
    /// # Errors
    ///
    /// Returns the first vertex that fails to transform.
    pub fn multipolygon_to_wgs84(
        &self,
        mp: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, GeometryError> {
        mp.try_map_coords(|c| self.to_wgs84(c))
    }
}
