#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry normalization and spatial assignment.
//!
//! [`normalize`] turns raw GeoJSON geometries into WGS84
//! [`geo::MultiPolygon`]s (promoting bare polygons and rejecting empty
//! coordinate arrays), [`projection`] provides the metric projection used
//! for centroids, and [`assign`] joins hazard coverage against district
//! reference geometry with R-tree accelerated point-in-polygon tests.
//!
//! Everything downstream of this crate may assume EPSG:4326.

pub mod assign;
pub mod normalize;
pub mod projection;

pub use assign::{DistrictIndex, JoinKind, assign_contains, assign_within};
pub use normalize::{Crs, normalize_geometry, normalize_point};
pub use projection::{EpsgTransform, metric_centroid};

/// Errors raised while constructing or reprojecting a geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// The feature carries no geometry at all.
    #[error("geometry is missing")]
    Missing,

    /// The coordinate array is empty or holds the `[[[]]]` sentinel.
    #[error("geometry has no coordinates")]
    Degenerate,

    /// The geometry type cannot be used in this position.
    #[error("unsupported geometry type: {geom_type}")]
    Unsupported {
        /// The offending GeoJSON type name.
        geom_type: String,
    },

    /// The coordinate reference system is not one we can reproject from.
    #[error("unsupported CRS: {name}")]
    UnsupportedCrs {
        /// CRS name as published by the source.
        name: String,
    },

    /// A coordinate could not be transformed out of the source CRS.
    #[error("failed to reproject from EPSG:{code}: {reason}")]
    Reprojection {
        /// EPSG code of the source CRS.
        code: u16,
        /// Message from the projection library.
        reason: String,
    },

    /// The GeoJSON could not be decoded.
    #[error("invalid GeoJSON geometry: {0}")]
    GeoJson(#[from] geojson::Error),
}
