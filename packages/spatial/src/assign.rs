//! Spatial assignment of hazard coverage to districts.
//!
//! Two join directions are supported, mirroring the two ways feeds carry
//! polygons:
//!
//! * [`assign_within`]: district point *within* hazard polygon. Iterates
//!   districts and keeps (optionally) those with no covering hazard.
//! * [`assign_contains`]: hazard polygon *contains* district point.
//!   Iterates hazards and keeps only intersecting districts.
//!
//! Both produce one [`DistrictHazardAssignment`] per satisfied
//! (district, hazard) pair, carrying the district point as geometry.

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use hazard_models::{
    DistrictGeometry, DistrictHazardAssignment, FloodObservation, HazardFeature,
    LocatedFloodObservation,
};
use rstar::{AABB, RTree, RTreeObject};

/// Whether districts with no covering hazard are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep every district; uncovered districts get `warning: None`.
    Left,
    /// Keep only districts covered by at least one hazard.
    Inner,
}

/// A polygon stored in an R-tree with the index of its owner.
struct PolygonEntry {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for PolygonEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A district point stored in an R-tree.
struct PointEntry {
    idx: usize,
    coords: [f64; 2],
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

fn assignment(district: &DistrictGeometry, feature: Option<&HazardFeature>) -> DistrictHazardAssignment {
    DistrictHazardAssignment {
        district: district.district.clone(),
        indus_circle: district.indus_circle.clone(),
        circle_name: district.circle_name.clone(),
        point: district.point,
        warning: feature.map(|f| f.warning.clone()),
    }
}

/// Joins districts to the hazard features whose polygon covers the
/// district point.
///
/// Output follows district order, then hazard order within a district.
/// Features without geometry never match.
#[must_use]
pub fn assign_within(
    features: &[HazardFeature],
    districts: &[DistrictGeometry],
    kind: JoinKind,
) -> Vec<DistrictHazardAssignment> {
    let entries: Vec<PolygonEntry> = features
        .iter()
        .enumerate()
        .filter_map(|(idx, f)| {
            f.geometry.as_ref().map(|g| PolygonEntry {
                idx,
                envelope: compute_envelope(g),
            })
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut out = Vec::new();
    for district in districts {
        let query_env = AABB::from_point([district.point.x(), district.point.y()]);
        let mut hits: Vec<usize> = tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| {
                features[entry.idx]
                    .geometry
                    .as_ref()
                    .is_some_and(|g| g.contains(&district.point))
            })
            .map(|entry| entry.idx)
            .collect();
        hits.sort_unstable();

        if hits.is_empty() {
            if kind == JoinKind::Left {
                out.push(assignment(district, None));
            }
            continue;
        }

        out.extend(
            hits.into_iter()
                .map(|idx| assignment(district, Some(&features[idx]))),
        );
    }

    log::debug!(
        "assign_within: {} districts x {} features -> {} rows",
        districts.len(),
        features.len(),
        out.len()
    );
    out
}

/// Joins hazard features to the districts whose point lies inside the
/// hazard polygon. Always an inner join.
///
/// Output follows hazard order, then district order within a hazard.
#[must_use]
pub fn assign_contains(
    features: &[HazardFeature],
    districts: &[DistrictGeometry],
) -> Vec<DistrictHazardAssignment> {
    let entries: Vec<PointEntry> = districts
        .iter()
        .enumerate()
        .map(|(idx, d)| PointEntry {
            idx,
            coords: [d.point.x(), d.point.y()],
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut out = Vec::new();
    for feature in features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let mut hits: Vec<usize> = tree
            .locate_in_envelope_intersecting(&compute_envelope(geometry))
            .filter(|entry| geometry.contains(&districts[entry.idx].point))
            .map(|entry| entry.idx)
            .collect();
        hits.sort_unstable();

        out.extend(
            hits.into_iter()
                .map(|idx| assignment(&districts[idx], Some(feature))),
        );
    }

    log::debug!(
        "assign_contains: {} features x {} districts -> {} rows",
        features.len(),
        districts.len(),
        out.len()
    );
    out
}

/// R-tree over district boundaries for locating arbitrary points.
///
/// Districts without a boundary polygon are not indexed.
pub struct DistrictIndex {
    districts: Vec<DistrictGeometry>,
    tree: RTree<PolygonEntry>,
}

impl DistrictIndex {
    /// Builds the index from district reference geometry.
    #[must_use]
    pub fn new(districts: Vec<DistrictGeometry>) -> Self {
        let entries: Vec<PolygonEntry> = districts
            .iter()
            .enumerate()
            .filter_map(|(idx, d)| {
                d.boundary.as_ref().map(|b| PolygonEntry {
                    idx,
                    envelope: compute_envelope(b),
                })
            })
            .collect();
        log::info!(
            "Loaded {} of {} district boundaries into spatial index",
            entries.len(),
            districts.len()
        );

        Self {
            districts,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Returns the district whose boundary contains the point.
    ///
    /// Boundaries tile the country without overlap, so the first match
    /// (lowest reference order) wins.
    #[must_use]
    pub fn locate(&self, point: &Point<f64>) -> Option<&DistrictGeometry> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| {
                self.districts[entry.idx]
                    .boundary
                    .as_ref()
                    .is_some_and(|b| b.contains(point))
            })
            .map(|entry| entry.idx)
            .min()
            .map(|idx| &self.districts[idx])
    }

    /// Locates flood sites in districts. Sites without a location or
    /// outside every district are dropped.
    #[must_use]
    pub fn locate_sites(&self, observations: Vec<FloodObservation>) -> Vec<LocatedFloodObservation> {
        let total = observations.len();
        let located: Vec<LocatedFloodObservation> = observations
            .into_iter()
            .filter_map(|observation| {
                let district = self.locate(observation.location.as_ref()?)?;
                Some(LocatedFloodObservation {
                    district: district.district.clone(),
                    indus_circle: district.indus_circle.clone(),
                    observation,
                })
            })
            .collect();

        log::info!("Located {} of {total} flood observations in districts", located.len());
        located
    }

    /// Every distinct circle known to the reference, sorted.
    #[must_use]
    pub fn circles(&self) -> Vec<String> {
        let mut circles: Vec<String> = self
            .districts
            .iter()
            .map(|d| d.indus_circle.clone())
            .collect();
        circles.sort();
        circles.dedup();
        circles
    }

    /// Number of districts in the reference.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.districts.len()
    }

    /// Whether the reference is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}
