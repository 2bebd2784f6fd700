use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashSet;

/// Extent of the toroidal world. Every position lives in `[0, width) x [0, height)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Torus {
    pub width: f64,
    pub height: f64,
}

impl Torus {
    pub fn new(width: f64, height: f64) -> Self {
        assert!(
            width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0,
            "torus extent must be positive and finite"
        );
        Self { width, height }
    }

    /// Wrap a position back into world bounds.
    pub fn wrap(&self, position: [f64; 2]) -> [f64; 2] {
        [
            wrap_coord(position[0], self.width),
            wrap_coord(position[1], self.height),
        ]
    }

    /// Shortest displacement from `from` to `to`, taking the wraparound path when it is shorter.
    pub fn delta(&self, from: [f64; 2], to: [f64; 2]) -> [f64; 2] {
        [
            wrapped_delta(to[0] - from[0], self.width),
            wrapped_delta(to[1] - from[1], self.height),
        ]
    }

    pub fn distance(&self, a: [f64; 2], b: [f64; 2]) -> f64 {
        let d = self.delta(a, b);
        d[0].hypot(d[1])
    }

    /// Unit vector pointing from `from` toward `to` along the shortest path, with the distance.
    /// Returns `None` when the points coincide.
    pub fn direction(&self, from: [f64; 2], to: [f64; 2]) -> Option<([f64; 2], f64)> {
        let d = self.delta(from, to);
        let dist = d[0].hypot(d[1]);
        (dist > f64::EPSILON).then(|| ([d[0] / dist, d[1] / dist], dist))
    }

    /// Move `from` by `step` units toward `to`, never overshooting.
    pub fn step_toward(&self, from: [f64; 2], to: [f64; 2], step: f64) -> [f64; 2] {
        match self.direction(from, to) {
            Some((dir, dist)) => {
                let travel = step.min(dist);
                self.wrap([from[0] + dir[0] * travel, from[1] + dir[1] * travel])
            }
            None => from,
        }
    }

    pub fn half_diagonal(&self) -> f64 {
        (self.width / 2.0).hypot(self.height / 2.0)
    }
}

fn wrap_coord(v: f64, extent: f64) -> f64 {
    let w = v.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs.
    if w >= extent {
        0.0
    } else {
        w
    }
}

/// Map a raw coordinate delta into `[-extent/2, extent/2)`.
fn wrapped_delta(delta: f64, extent: f64) -> f64 {
    (delta + extent / 2.0).rem_euclid(extent) - extent / 2.0
}

/// Shortest distance from `point` to the segment `a`-`b`, all in one local frame.
pub fn point_segment_distance(point: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [point[0] - a[0], point[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq > 0.0 {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = [a[0] + ab[0] * t, a[1] + ab[1] * t];
    (point[0] - closest[0]).hypot(point[1] - closest[1])
}

/// Lightweight position-only entry for the overlap index, keyed by dense iteration index.
#[derive(Clone, Debug)]
pub struct AgentLocation {
    pub index: usize,
    pub position: [f64; 2],
}

impl RTreeObject for AgentLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Build an R*-tree from agent positions via bulk_load (O(n log n)).
pub fn build_index(positions: &[[f64; 2]]) -> RTree<AgentLocation> {
    let locations: Vec<AgentLocation> = positions
        .iter()
        .enumerate()
        .map(|(index, &position)| AgentLocation { index, position })
        .collect();
    RTree::bulk_load(locations)
}

/// Query indices of entries within toroidal `radius` of `center`, excluding `self_index`.
/// Results are sorted and unique.
pub fn query_neighbors(
    tree: &RTree<AgentLocation>,
    torus: &Torus,
    center: [f64; 2],
    radius: f64,
    self_index: usize,
) -> Vec<usize> {
    let (x_offsets, x_len) = wrap_offsets(center[0], radius, torus.width);
    let (y_offsets, y_len) = wrap_offsets(center[1], radius, torus.height);
    let r_sq = radius * radius;
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for &xoff in &x_offsets[..x_len] {
        for &yoff in &y_offsets[..y_len] {
            let translated = [center[0] + xoff, center[1] + yoff];
            let envelope = AABB::from_corners(
                [translated[0] - radius, translated[1] - radius],
                [translated[0] + radius, translated[1] + radius],
            );
            for loc in tree.locate_in_envelope(&envelope) {
                if loc.index == self_index {
                    continue;
                }
                let d = torus.delta(center, loc.position);
                if d[0] * d[0] + d[1] * d[1] <= r_sq && seen.insert(loc.index) {
                    result.push(loc.index);
                }
            }
        }
    }
    result.sort_unstable();
    result
}

fn wrap_offsets(coord: f64, radius: f64, extent: f64) -> ([f64; 3], usize) {
    let mut offsets = [0.0; 3];
    let mut len = 1usize;
    if coord < radius {
        offsets[len] = extent;
        len += 1;
    }
    if coord + radius >= extent {
        offsets[len] = -extent;
        len += 1;
    }
    (offsets, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn torus() -> Torus {
        Torus::new(100.0, 80.0)
    }

    #[test]
    fn delta_takes_wraparound_path() {
        let t = torus();
        let d = t.delta([99.0, 40.0], [1.0, 40.0]);
        assert!((d[0] - 2.0).abs() < 1e-9);
        assert!((t.distance([0.5, 0.5], [99.5, 79.5]) - 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn wrap_keeps_positions_in_bounds() {
        let t = torus();
        let p = t.wrap([-0.5, 160.25]);
        assert!((p[0] - 99.5).abs() < 1e-9);
        assert!((p[1] - 0.25).abs() < 1e-9);
        let tiny = t.wrap([-1e-18, 0.0]);
        assert!(tiny[0] < 100.0);
    }

    #[test]
    fn step_toward_does_not_overshoot() {
        let t = torus();
        assert_eq!(t.step_toward([10.0, 10.0], [12.0, 10.0], 5.0), [12.0, 10.0]);
        let p = t.step_toward([98.0, 10.0], [2.0, 10.0], 3.0);
        assert!((p[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn direction_is_none_for_coincident_points() {
        assert!(torus().direction([3.0, 3.0], [3.0, 3.0]).is_none());
    }

    #[test]
    fn point_segment_distance_clamps_to_endpoints() {
        assert_eq!(point_segment_distance([5.0, 3.0], [0.0, 0.0], [10.0, 0.0]), 3.0);
        assert_eq!(point_segment_distance([13.0, 4.0], [0.0, 0.0], [10.0, 0.0]), 5.0);
        assert_eq!(point_segment_distance([3.0, 4.0], [0.0, 0.0], [0.0, 0.0]), 5.0);
    }

    #[test]
    fn query_neighbors_wraps_at_corner() {
        let t = torus();
        let tree = build_index(&[[0.2, 0.2], [99.8, 79.8], [50.0, 40.0]]);
        assert_eq!(query_neighbors(&tree, &t, [0.2, 0.2], 1.0, 0), vec![1]);
    }

    #[test]
    fn query_neighbors_excludes_self_and_far_entries() {
        let t = torus();
        let tree = build_index(&[[5.0, 5.0], [6.0, 5.0], [50.0, 50.0]]);
        assert_eq!(query_neighbors(&tree, &t, [5.0, 5.0], 2.0, 0), vec![1]);
        assert_eq!(
            query_neighbors(&tree, &t, [5.0, 5.0], 2.0, usize::MAX),
            vec![0, 1]
        );
    }

    proptest! {
        #[test]
        fn distance_is_symmetric_and_bounded(
            ax in 0.0f64..100.0, ay in 0.0f64..80.0,
            bx in 0.0f64..100.0, by in 0.0f64..80.0,
        ) {
            let t = torus();
            let ab = t.distance([ax, ay], [bx, by]);
            let ba = t.distance([bx, by], [ax, ay]);
            prop_assert!((ab - ba).abs() < 1e-9);
            prop_assert!(ab <= t.half_diagonal() + 1e-9);
        }

        #[test]
        fn wrap_is_always_in_bounds(x in -1e4f64..1e4, y in -1e4f64..1e4) {
            let t = torus();
            let p = t.wrap([x, y]);
            prop_assert!(p[0] >= 0.0 && p[0] < t.width);
            prop_assert!(p[1] >= 0.0 && p[1] < t.height);
        }
    }
}
