#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static k-d tree over geographic coordinates with the haversine metric.
//!
//! The tree is built once over a corpus of (latitude, longitude) pairs and
//! answers k-nearest-neighbor queries in great-circle kilometers. Build is
//! a one-shot operation; no insertion or deletion is supported, so reads
//! need no locking.
//!
//! Internally each point is stored as a unit-sphere Cartesian triple and
//! the tree partitions on the three Cartesian axes in rotation. Pruning
//! compares squared chord distances, which is an exact Euclidean bound and
//! monotonic in the haversine distance, so result orderings match the
//! haversine metric everywhere — including across the ±180° antimeridian
//! and at the poles, where a raw lat/lon tree over-prunes. Reported
//! distances are always computed with the haversine formula itself.

use std::collections::BinaryHeap;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinate pairs in kilometers.
///
/// Haversine formula on a sphere of radius [`EARTH_RADIUS_KM`].
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Projects a coordinate pair onto the unit sphere.
#[inline]
fn to_unit_sphere(lat: f64, lon: f64) -> [f64; 3] {
    let phi = lat.to_radians();
    let lambda = lon.to_radians();
    [
        phi.cos() * lambda.cos(),
        phi.cos() * lambda.sin(),
        phi.sin(),
    ]
}

/// Squared chord distance between two unit-sphere points.
#[inline]
fn chord_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// A neighbor returned by [`KdTree::nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the matched point in the build input.
    pub index: usize,
    /// Haversine distance from the query in kilometers.
    pub distance_km: f64,
}

/// Tree node: the median point of its subtree plus child links.
#[derive(Debug, Clone, Copy)]
struct Node {
    /// Index into the original input (and the point/coordinate arrays).
    slot: u32,
    left: Option<u32>,
    right: Option<u32>,
}

/// Candidate on the bounded max-heap during a k-NN descent.
///
/// Ordered by squared chord distance, ties broken by insertion slot so
/// that equal-distance results come out in stable input order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    dist_sq: f64,
    slot: u32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.slot.cmp(&other.slot))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A static 2-D geographic k-d tree with haversine k-nearest queries.
pub struct KdTree {
    nodes: Vec<Node>,
    root: Option<u32>,
    points: Vec<[f64; 3]>,
    coords: Vec<(f64, f64)>,
}

impl KdTree {
    /// Builds the tree over a corpus of `(latitude, longitude)` pairs.
    ///
    /// The returned [`Neighbor::index`] values refer to positions in
    /// `coords`. Construction is median-split on rotating axes; points
    /// with equal coordinates keep their input order.
    ///
    /// # Panics
    ///
    /// Panics if `coords` holds more than `u32::MAX` points.
    #[must_use]
    pub fn build(coords: &[(f64, f64)]) -> Self {
        let points: Vec<[f64; 3]> = coords
            .iter()
            .map(|&(lat, lon)| to_unit_sphere(lat, lon))
            .collect();

        let mut tree = Self {
            nodes: Vec::with_capacity(coords.len()),
            root: None,
            points,
            coords: coords.to_vec(),
        };

        let count = u32::try_from(coords.len()).expect("corpus exceeds u32::MAX points");
        let mut order: Vec<u32> = (0..count).collect();
        tree.root = tree.build_recursive(&mut order, 0);
        tree
    }

    /// Number of points in the tree.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the tree holds no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn build_recursive(&mut self, order: &mut [u32], depth: usize) -> Option<u32> {
        if order.is_empty() {
            return None;
        }

        let axis = depth % 3;
        order.sort_by(|&a, &b| {
            self.points[a as usize][axis]
                .total_cmp(&self.points[b as usize][axis])
                .then(a.cmp(&b))
        });

        let median = order.len() / 2;
        let slot = order[median];

        #[allow(clippy::cast_possible_truncation)]
        let node_idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            slot,
            left: None,
            right: None,
        });

        let (left_half, rest) = order.split_at_mut(median);
        let right_half = &mut rest[1..];

        let left = self.build_recursive(left_half, depth + 1);
        let right = self.build_recursive(right_half, depth + 1);
        self.nodes[node_idx as usize].left = left;
        self.nodes[node_idx as usize].right = right;

        Some(node_idx)
    }

    /// Returns up to `k` nearest points to `(latitude, longitude)`,
    /// sorted nearest-first with haversine distances in kilometers.
    ///
    /// When the tree holds fewer than `k` points, all of them are
    /// returned.
    #[must_use]
    pub fn nearest(&self, latitude: f64, longitude: f64, k: usize) -> Vec<Neighbor> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let query = to_unit_sphere(latitude, longitude);
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        self.nearest_recursive(root, &query, 0, k, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| {
                let (lat, lon) = self.coords[c.slot as usize];
                Neighbor {
                    index: c.slot as usize,
                    distance_km: haversine_km(latitude, longitude, lat, lon),
                }
            })
            .collect()
    }

    fn nearest_recursive(
        &self,
        node_idx: u32,
        query: &[f64; 3],
        depth: usize,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = self.nodes[node_idx as usize];
        let point = &self.points[node.slot as usize];

        let candidate = Candidate {
            dist_sq: chord_sq(query, point),
            slot: node.slot,
        };
        heap.push(candidate);
        if heap.len() > k {
            heap.pop();
        }

        let axis = depth % 3;
        let diff = query[axis] - point[axis];

        let (near, far) = if diff <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.nearest_recursive(near, query, depth + 1, k, heap);
        }

        // The far branch can only hold a closer point when the splitting
        // plane is nearer than the current k-th best candidate.
        let worst = heap
            .peek()
            .map_or(f64::INFINITY, |c| c.dist_sq);
        if let Some(far) = far {
            if heap.len() < k || diff * diff <= worst {
                self.nearest_recursive(far, query, depth + 1, k, heap);
            }
        }
    }
}
