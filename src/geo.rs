// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Geographic positions and nearest-node lookup.
//!
//! Distances are measured with the Manhattan (L1) metric on `(lat, lon)`,
//! which follows an orthogonal street grid much more closely than the
//! straight-line distance does.

use serde::{Deserialize, Serialize};

/// A position given as latitude and longitude, in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a new `GeoPoint`.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns the Manhattan (L1) distance to `other`.
    pub fn manhattan_distance(&self, other: &GeoPoint) -> f64 {
        (self.lat - other.lat).abs() + (self.lon - other.lon).abs()
    }

    /// Returns the centroid of the given points, or `None` if there are none.
    pub fn centroid<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<GeoPoint> {
        let (count, lat, lon) = points
            .into_iter()
            .fold((0usize, 0.0, 0.0), |(n, lat, lon), p| {
                (n + 1, lat + p.lat, lon + p.lon)
            });
        (count > 0).then(|| GeoPoint::new(lat / count as f64, lon / count as f64))
    }
}

/// Returns the id of the candidate closest to `point`.
///
/// Ties go to the candidate that comes first in iteration order. Returns
/// `None` when there are no candidates.
pub fn nearest<K>(
    point: &GeoPoint,
    candidates: impl IntoIterator<Item = (K, GeoPoint)>,
) -> Option<K> {
    let mut best: Option<(K, f64)> = None;
    for (key, position) in candidates {
        let distance = point.manhattan_distance(&position);
        if best.as_ref().map_or(true, |(_, d)| distance < *d) {
            best = Some((key, distance));
        }
    }
    best.map(|(key, _)| key)
}

/// A static set of candidate nodes that points can be assigned to.
///
/// The candidates keep the order they were given in, so that lookups are
/// reproducible. Queries scan the whole set, which is fine for tens of
/// substations and a few thousand feeders.
#[derive(Clone, Debug, Default)]
pub struct GeoIndex {
    candidates: Vec<(u64, GeoPoint)>,
}

impl GeoIndex {
    /// Creates a new index over the given `(node_id, position)` pairs.
    pub fn new(candidates: impl IntoIterator<Item = (u64, GeoPoint)>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
        }
    }

    /// Returns the id of the candidate closest to `point`.
    pub fn nearest(&self, point: &GeoPoint) -> Option<u64> {
        nearest(point, self.candidates.iter().copied())
    }

    /// Returns an iterator over the candidate ids, in index order.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.candidates.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
