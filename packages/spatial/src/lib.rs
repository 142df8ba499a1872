#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Planar geometry primitives for the suitability engine.
//!
//! Layer data lives in EPSG:4326 lon/lat but every rule is written in
//! feet on the ground. This crate owns that unit boundary: geometries are
//! projected into a local equirectangular plane scaled in feet, offset or
//! measured there, and projected back. City-scale extents keep the
//! approximation error well under a foot.

pub mod buildings;

use geo::{Area, BooleanOps, Centroid, Coord, CoordsIter, Geometry, LineString, MultiPolygon, Point, Polygon};

/// Mean Earth radius in feet (6,371,008.8 m).
const EARTH_RADIUS_FEET: f64 = 6_371_008.8 * 3.280_839_895;

/// Vertices used to approximate a circular arc.
const CIRCLE_SEGMENTS: usize = 64;

/// A local planar frame in feet, centered on an anchor coordinate.
///
/// Equirectangular: one degree of latitude maps to a fixed number of feet,
/// one degree of longitude to that scaled by the cosine of the anchor
/// latitude.
#[derive(Debug, Clone, Copy)]
pub struct LocalPlane {
    origin: Coord<f64>,
    feet_per_deg_lat: f64,
    feet_per_deg_lon: f64,
}

impl LocalPlane {
    /// Creates a frame centered on the given lon/lat point.
    #[must_use]
    pub fn centered_on(origin: Point<f64>) -> Self {
        let feet_per_deg_lat = EARTH_RADIUS_FEET * std::f64::consts::PI / 180.0;
        Self {
            origin: origin.0,
            feet_per_deg_lat,
            feet_per_deg_lon: feet_per_deg_lat * origin.y().to_radians().cos(),
        }
    }

    /// Projects a lon/lat coordinate into the plane (feet).
    #[must_use]
    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (coord.x - self.origin.x) * self.feet_per_deg_lon,
            y: (coord.y - self.origin.y) * self.feet_per_deg_lat,
        }
    }

    /// Projects a planar coordinate (feet) back to lon/lat.
    #[must_use]
    pub fn unproject(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: coord.x / self.feet_per_deg_lon + self.origin.x,
            y: coord.y / self.feet_per_deg_lat + self.origin.y,
        }
    }
}

/// Produces the planar offset of a geometry by `distance_feet`.
///
/// Pure and deterministic: the same geometry and distance always yield the
/// same polygon. Points become discs; polygons grow outward from every
/// ring by the Minkowski sum with a disc (so holes shrink and edges offset
/// from the boundary, not the centroid). Any other geometry is reduced to
/// a disc around its centroid.
///
/// Callers are responsible for validating that the distance is positive.
#[must_use]
pub fn buffer(geometry: &Geometry<f64>, distance_feet: f64) -> Polygon<f64> {
    match geometry {
        Geometry::Point(point) => point_buffer(*point, distance_feet),
        Geometry::Polygon(polygon) => polygon_buffer(polygon, distance_feet),
        Geometry::MultiPolygon(multi) => multi
            .0
            .iter()
            .map(|polygon| polygon_buffer(polygon, distance_feet))
            .reduce(|acc, next| {
                largest_polygon(acc.union(&next)).unwrap_or_else(empty_polygon)
            })
            .unwrap_or_else(empty_polygon),
        other => other.centroid().map_or_else(empty_polygon, |anchor| {
            point_buffer(anchor, distance_feet)
        }),
    }
}

/// Great-circle distance between two lon/lat points, in feet.
#[must_use]
pub fn haversine_distance_feet(a: Point<f64>, b: Point<f64>) -> f64 {
    let (lat1, lat2) = (a.y().to_radians(), b.y().to_radians());
    let dlat = (b.y() - a.y()).to_radians();
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_FEET * h.sqrt().asin()
}

/// Distance in feet from a point to the nearest vertex of a geometry.
///
/// Exact for point geometries; a vertex approximation for polygons, which
/// is all the nearest-address ranking needs. Empty geometries are
/// infinitely far away.
#[must_use]
pub fn distance_to_geometry_feet(from: Point<f64>, to: &Geometry<f64>) -> f64 {
    to.coords_iter()
        .map(|coord| haversine_distance_feet(from, Point::from(coord)))
        .fold(f64::INFINITY, f64::min)
}

fn empty_polygon() -> Polygon<f64> {
    Polygon::new(LineString::new(Vec::new()), Vec::new())
}

/// Disc of the given radius around a lon/lat point.
fn point_buffer(point: Point<f64>, distance_feet: f64) -> Polygon<f64> {
    let plane = LocalPlane::centered_on(point);
    let center = plane.project(point.0);
    Polygon::new(
        LineString::from(
            circle_coords(center, distance_feet)
                .into_iter()
                .map(|coord| plane.unproject(coord))
                .collect::<Vec<_>>(),
        ),
        Vec::new(),
    )
}

/// Minkowski sum of a polygon with a disc: the original area unioned with
/// a capsule along every ring edge.
fn polygon_buffer(polygon: &Polygon<f64>, distance_feet: f64) -> Polygon<f64> {
    let Some(anchor) = polygon.centroid() else {
        return empty_polygon();
    };
    let plane = LocalPlane::centered_on(anchor);

    let project_ring = |ring: &LineString<f64>| {
        LineString::from(
            ring.coords()
                .map(|coord| plane.project(*coord))
                .collect::<Vec<_>>(),
        )
    };

    let planar = Polygon::new(
        project_ring(polygon.exterior()),
        polygon.interiors().iter().map(project_ring).collect(),
    );

    let mut acc = MultiPolygon::new(vec![planar.clone()]);
    let rings = std::iter::once(planar.exterior()).chain(planar.interiors().iter());
    for ring in rings {
        for line in ring.lines() {
            if let Some(quad) = edge_quad(line.start, line.end, distance_feet) {
                acc = acc.union(&MultiPolygon::new(vec![quad]));
            }
        }
        for coord in ring.coords() {
            let disc = Polygon::new(
                LineString::from(circle_coords(*coord, distance_feet)),
                Vec::new(),
            );
            acc = acc.union(&MultiPolygon::new(vec![disc]));
        }
    }

    let unioned = largest_polygon(acc).unwrap_or_else(empty_polygon);
    Polygon::new(
        LineString::from(
            unioned
                .exterior()
                .coords()
                .map(|coord| plane.unproject(*coord))
                .collect::<Vec<_>>(),
        ),
        unioned
            .interiors()
            .iter()
            .map(|ring| {
                LineString::from(
                    ring.coords()
                        .map(|coord| plane.unproject(*coord))
                        .collect::<Vec<_>>(),
                )
            })
            .collect(),
    )
}

/// Rectangle covering all points within `distance` of the segment,
/// perpendicular to it. `None` for degenerate (zero-length) edges.
fn edge_quad(start: Coord<f64>, end: Coord<f64>, distance: f64) -> Option<Polygon<f64>> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length = dx.hypot(dy);
    if length < f64::EPSILON {
        return None;
    }
    let nx = -dy / length * distance;
    let ny = dx / length * distance;

    Some(Polygon::new(
        LineString::from(vec![
            Coord {
                x: start.x + nx,
                y: start.y + ny,
            },
            Coord {
                x: end.x + nx,
                y: end.y + ny,
            },
            Coord {
                x: end.x - nx,
                y: end.y - ny,
            },
            Coord {
                x: start.x - nx,
                y: start.y - ny,
            },
        ]),
        Vec::new(),
    ))
}

#[allow(clippy::cast_precision_loss)]
fn circle_coords(center: Coord<f64>, radius: f64) -> Vec<Coord<f64>> {
    (0..=CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * (i as f64) / (CIRCLE_SEGMENTS as f64);
            Coord {
                x: radius.mul_add(angle.cos(), center.x),
                y: radius.mul_add(angle.sin(), center.y),
            }
        })
        .collect()
}

/// Unions are connected for our inputs, but keep the largest part if a
/// degenerate input ever splits the result.
fn largest_polygon(multi: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    multi
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Contains, polygon};

    const DENVER: (f64, f64) = (-104.99, 39.74);

    fn denver_point() -> Point<f64> {
        Point::new(DENVER.0, DENVER.1)
    }

    #[test]
    fn plane_round_trips() {
        let plane = LocalPlane::centered_on(denver_point());
        let coord = Coord {
            x: -104.985,
            y: 39.745,
        };
        let back = plane.unproject(plane.project(coord));
        assert!((back.x - coord.x).abs() < 1e-12);
        assert!((back.y - coord.y).abs() < 1e-12);
    }

    #[test]
    fn haversine_matches_known_scale() {
        // One degree of latitude is about 364,600 ft.
        let a = Point::new(-104.99, 39.0);
        let b = Point::new(-104.99, 40.0);
        let distance = haversine_distance_feet(a, b);
        assert!((distance - 364_800.0).abs() < 2_000.0, "got {distance}");
    }

    #[test]
    fn point_buffer_reaches_the_requested_distance() {
        let disc = buffer(&Geometry::Point(denver_point()), 1000.0);

        for coord in disc.exterior().coords() {
            let distance = haversine_distance_feet(denver_point(), Point::from(*coord));
            assert!(
                (distance - 1000.0).abs() < 5.0,
                "vertex at {distance}ft from center"
            );
        }
    }

    #[test]
    fn point_buffer_contains_its_center() {
        let disc = buffer(&Geometry::Point(denver_point()), 250.0);
        assert!(disc.contains(&denver_point()));
    }

    fn city_block() -> Polygon<f64> {
        // Roughly 360ft x 360ft at Denver's latitude.
        polygon![
            (x: -104.9910, y: 39.7400),
            (x: -104.9900, y: 39.7400),
            (x: -104.9900, y: 39.7410),
            (x: -104.9910, y: 39.7410),
            (x: -104.9910, y: 39.7400),
        ]
    }

    #[test]
    fn polygon_buffer_contains_the_original() {
        let block = city_block();
        let grown = buffer(&Geometry::Polygon(block.clone()), 500.0);

        for coord in block.exterior().coords() {
            assert!(grown.contains(&Point::from(*coord)));
        }
    }

    #[test]
    fn polygon_buffer_offsets_from_edges_not_centroid() {
        let block = city_block();
        let grown = buffer(&Geometry::Polygon(block.clone()), 100.0);

        // A point 50ft east of the east edge is inside a 100ft edge
        // offset, but ~230ft from the centroid.
        let plane = LocalPlane::centered_on(Point::new(-104.9900, 39.7405));
        let probe = Point::from(plane.unproject(Coord { x: 50.0, y: 0.0 }));
        assert!(grown.contains(&probe));
    }

    #[test]
    fn buffers_grow_monotonically() {
        let block = city_block();
        let small = buffer(&Geometry::Polygon(block.clone()), 200.0);
        let large = buffer(&Geometry::Polygon(block), 600.0);

        for coord in small.exterior().coords() {
            assert!(
                large.contains(&Point::from(*coord)),
                "small-buffer vertex {coord:?} escaped the large buffer"
            );
        }
    }

    #[test]
    fn buffer_is_deterministic() {
        let block = city_block();
        let a = buffer(&Geometry::Polygon(block.clone()), 1000.0);
        let b = buffer(&Geometry::Polygon(block), 1000.0);
        assert_eq!(a, b);
    }

    #[test]
    fn vertex_distance_picks_the_nearest() {
        let near = Point::new(-104.9901, 39.7401);
        let geometry = Geometry::Polygon(city_block());
        let d = distance_to_geometry_feet(near, &geometry);
        assert!(d < 100.0, "got {d}");

        let empty = Geometry::MultiPolygon(MultiPolygon::new(Vec::new()));
        assert!(distance_to_geometry_feet(near, &empty).is_infinite());
    }
}
