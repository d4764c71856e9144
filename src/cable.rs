// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Orthogonal cable routing, for drawing the network.
//!
//! Routes only depend on the positions they are given and never on the state
//! of the network.

use serde::Serialize;

use crate::GeoPoint;

/// A cable from one node to a group of nodes it supplies.
///
/// The `trunk` runs from the source to the centroid of the destinations, and
/// one branch runs from the centroid to each destination.  Every segment is
/// parallel to one of the axes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CableRoute {
    pub trunk: Vec<GeoPoint>,
    pub branches: Vec<Vec<GeoPoint>>,
}

/// Routes a cable from `from` to every point in `to`.
///
/// With no destinations, the trunk is just `from`.
pub fn route(from: GeoPoint, to: &[GeoPoint]) -> CableRoute {
    let Some(centroid) = GeoPoint::centroid(to) else {
        return CableRoute {
            trunk: vec![from],
            branches: vec![],
        };
    };

    CableRoute {
        trunk: orthogonal_path(from, centroid),
        branches: to.iter().map(|&p| orthogonal_path(centroid, p)).collect(),
    }
}

/// Returns an axis-aligned path from `from` to `to`, with at most one bend.
///
/// The path runs along the dominant axis first: east-west if the longitude
/// difference is at least as large as the latitude difference, north-south
/// otherwise.
pub fn orthogonal_path(from: GeoPoint, to: GeoPoint) -> Vec<GeoPoint> {
    let corner = if (to.lon - from.lon).abs() >= (to.lat - from.lat).abs() {
        GeoPoint::new(from.lat, to.lon)
    } else {
        GeoPoint::new(to.lat, from.lon)
    };

    let mut path = vec![from];
    for point in [corner, to] {
        if path.last() != Some(&point) {
            path.push(point);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_axis_aligned(path: &[GeoPoint]) -> bool {
        path.windows(2)
            .all(|w| w[0].lat == w[1].lat || w[0].lon == w[1].lon)
    }

    #[test]
    fn test_dominant_axis() {
        let from = GeoPoint::new(0.0, 0.0);

        // Mostly east: horizontal leg first.
        assert_eq!(
            orthogonal_path(from, GeoPoint::new(1.0, 3.0)),
            vec![from, GeoPoint::new(0.0, 3.0), GeoPoint::new(1.0, 3.0)]
        );
        // Mostly north: vertical leg first.
        assert_eq!(
            orthogonal_path(from, GeoPoint::new(3.0, 1.0)),
            vec![from, GeoPoint::new(3.0, 0.0), GeoPoint::new(3.0, 1.0)]
        );
        // A tie goes horizontal.
        assert_eq!(
            orthogonal_path(from, GeoPoint::new(2.0, 2.0))[1],
            GeoPoint::new(0.0, 2.0)
        );
        // Straight lines and zero-length paths have no bend.
        assert_eq!(
            orthogonal_path(from, GeoPoint::new(0.0, 2.0)),
            vec![from, GeoPoint::new(0.0, 2.0)]
        );
        assert_eq!(orthogonal_path(from, from), vec![from]);
    }

    #[test]
    fn test_route() {
        let from = GeoPoint::new(0.0, 0.0);
        let to = [
            GeoPoint::new(1.0, 4.0),
            GeoPoint::new(-1.0, 4.0),
            GeoPoint::new(0.0, 5.0),
        ];
        let route = route(from, &to);

        let centroid = GeoPoint::new(0.0, 13.0 / 3.0);
        assert_eq!(route.trunk, vec![from, centroid]);
        assert_eq!(route.branches.len(), 3);
        for (branch, destination) in route.branches.iter().zip(to) {
            assert_eq!(branch.first(), Some(&centroid));
            assert_eq!(branch.last(), Some(&destination));
            assert!(is_axis_aligned(branch));
        }
        assert_eq!(super::route(from, &to), route);
    }

    #[test]
    fn test_route_without_destinations() {
        let from = GeoPoint::new(40.7, -74.0);
        let route = route(from, &[]);
        assert_eq!(route.trunk, vec![from]);
        assert!(route.branches.is_empty());
    }
}
