//! K-nearest-neighbour search over the bounding sphere tree
//!
//! Results are plain `(index, distance, unwrapped position)` values. Indices
//! refer to the particle array as ordered by the most recent tree build and are
//! meaningless after the next one.

use glam::DVec2;
use rayon::prelude::*;

use super::boundary::Periodicity;
use super::particle::{NeighborSet, Particle};
use super::tree::Cell;

/// Ghost image offsets for the configured periodic axes
///
/// Open axes contribute only the zero offset. The offset `(0, 0)` always comes
/// first so the real image seeds the heap.
pub fn image_offsets(x: Periodicity, y: Periodicity) -> Vec<DVec2> {
    let xs = x.image_shifts();
    let ys = y.image_shifts();
    let mut offsets = Vec::with_capacity(xs.len() * ys.len());
    for &dx in &xs {
        for &dy in &ys {
            offsets.push(DVec2::new(dx, dy));
        }
    }
    offsets.sort_by_key(|o| *o != DVec2::ZERO);
    offsets
}

/// Find the neighbours of `particles[index]` among all periodic images
///
/// The returned set is finalized (true distances).
pub fn find_neighbors(
    root: &Cell,
    particles: &[Particle],
    index: usize,
    offsets: &[DVec2],
) -> NeighborSet {
    let mut set = NeighborSet::new();
    let pos = particles[index].pos;
    for &offset in offsets {
        search(root, particles, index, pos + offset, offset, &mut set);
    }
    set.finalize();
    set
}

/// Query every particle and store the results on the particles
pub fn find_all_neighbors(root: &Cell, particles: &mut [Particle], offsets: &[DVec2]) {
    let sets: Vec<NeighborSet> = {
        let particles: &[Particle] = particles;
        (0..particles.len())
            .into_par_iter()
            .map(|i| find_neighbors(root, particles, i, offsets))
            .collect()
    };
    for (p, set) in particles.iter_mut().zip(sets) {
        p.neighbors = set;
    }
}

fn search(
    cell: &Cell,
    particles: &[Particle],
    index: usize,
    query: DVec2,
    offset: DVec2,
    set: &mut NeighborSet,
) {
    if cell.is_leaf() {
        for i in cell.range.clone() {
            if i == index {
                continue;
            }
            let candidate = particles[i].pos;
            let d2 = query.distance_squared(candidate);
            if d2 < set.worst() {
                set.insert(d2, i, candidate - offset);
            }
        }
        return;
    }

    match (cell.lower.as_deref(), cell.upper.as_deref()) {
        (Some(lower), Some(upper)) => {
            let d_lower = query.distance(lower.center);
            let d_upper = query.distance(upper.center);
            let (near, d_near, far, d_far) = if d_lower < d_upper {
                (lower, d_lower, upper, d_upper)
            } else {
                (upper, d_upper, lower, d_lower)
            };
            if d_near - near.radius < set.worst().sqrt() {
                search(near, particles, index, query, offset, set);
            }
            // The worst distance may have shrunk while visiting the near side
            if d_far - far.radius < set.worst().sqrt() {
                search(far, particles, index, query, offset, set);
            }
        }
        (Some(only), None) | (None, Some(only)) => {
            search(only, particles, index, query, offset, set);
        }
        (None, None) => unreachable!("internal cell without children"),
    }
}
