//! Particle record and its bounded neighbour set
//!
//! The neighbour set is a fixed-capacity max-heap keyed by squared distance.
//! While a query runs, slot 0 always holds the worst retained candidate; after
//! [`NeighborSet::finalize`] the keys are true distances and slot 0 is the
//! smoothing length.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::NEIGHBOR_COUNT;

/// A single resolved neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the particle array the query ran against
    pub index: usize,
    /// Distance (squared before finalisation)
    pub distance: f64,
    /// Neighbour position shifted by the periodic image it was found in
    pub pos: DVec2,
}

/// Bounded max-heap of the K nearest candidates found so far
#[derive(Debug, Clone)]
pub struct NeighborSet {
    dist: [f64; NEIGHBOR_COUNT],
    index: [Option<usize>; NEIGHBOR_COUNT],
    pos: [DVec2; NEIGHBOR_COUNT],
    len: usize,
    finalized: bool,
}

impl Default for NeighborSet {
    fn default() -> Self {
        Self::new()
    }
}

impl NeighborSet {
    /// All slots start as sentinels at infinite distance
    pub fn new() -> Self {
        Self {
            dist: [f64::INFINITY; NEIGHBOR_COUNT],
            index: [None; NEIGHBOR_COUNT],
            pos: [DVec2::ZERO; NEIGHBOR_COUNT],
            len: 0,
            finalized: false,
        }
    }

    /// Number of non-sentinel slots
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once every slot holds a real neighbour
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == NEIGHBOR_COUNT
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Current worst key (slot 0)
    #[inline]
    pub fn worst(&self) -> f64 {
        self.dist[0]
    }

    /// Offer a candidate. Returns true if it displaced the current worst.
    pub fn insert(&mut self, dist_sq: f64, index: usize, pos: DVec2) -> bool {
        assert!(!self.finalized, "insert into a finalized neighbour set");
        // Written negated so NaN candidates are rejected
        if !(dist_sq < self.dist[0]) {
            return false;
        }
        if self.index[0].is_none() {
            self.len += 1;
        }
        self.dist[0] = dist_sq;
        self.index[0] = Some(index);
        self.pos[0] = pos;
        self.sift_down(0);
        true
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            let mut largest = i;
            if l < NEIGHBOR_COUNT && self.dist[l] > self.dist[largest] {
                largest = l;
            }
            if r < NEIGHBOR_COUNT && self.dist[r] > self.dist[largest] {
                largest = r;
            }
            if largest == i {
                break;
            }
            self.dist.swap(i, largest);
            self.index.swap(i, largest);
            self.pos.swap(i, largest);
            i = largest;
        }
    }

    /// Convert squared keys to distances. No more inserts are accepted.
    pub fn finalize(&mut self) {
        assert!(!self.finalized, "neighbour set finalized twice");
        for d in &mut self.dist {
            *d = d.sqrt();
        }
        self.finalized = true;
    }

    /// Radius enclosing all retained neighbours
    ///
    /// With a full set this is slot 0. With fewer than K real neighbours the
    /// sentinels are skipped; an empty set has smoothing length 0.
    pub fn smoothing_length(&self) -> f64 {
        if self.is_full() {
            return self.dist[0];
        }
        self.iter().map(|n| n.distance).fold(0.0, f64::max)
    }

    /// Iterate the non-sentinel slots in heap order
    pub fn iter(&self) -> impl Iterator<Item = Neighbor> + '_ {
        (0..NEIGHBOR_COUNT).filter_map(move |i| {
            self.index[i].map(|index| Neighbor {
                index,
                distance: self.dist[i],
                pos: self.pos[i],
            })
        })
    }

    /// Raw keys including sentinels, slot 0 first
    pub fn keys(&self) -> &[f64; NEIGHBOR_COUNT] {
        &self.dist
    }
}

/// An SPH particle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    /// Stable identifier (array position changes every tree rebuild)
    pub id: u32,
    pub pos: DVec2,
    pub vel: DVec2,
    /// Velocity predicted at the half step
    pub vel_pred: DVec2,
    /// Density
    pub rho: f64,
    /// Sound speed
    pub c: f64,
    /// Specific internal energy
    pub e: f64,
    /// Internal energy predicted at the half step
    pub e_pred: f64,
    /// Rate of change of internal energy
    pub e_dot: f64,
    /// Acceleration
    pub acc: DVec2,
    /// Neighbours from the most recent query
    #[serde(skip)]
    pub neighbors: NeighborSet,
}

impl Particle {
    pub fn new(pos: DVec2, vel: DVec2, e: f64) -> Self {
        Self {
            id: 0,
            pos,
            vel,
            vel_pred: vel,
            rho: 0.0,
            c: 0.0,
            e,
            e_pred: e,
            e_dot: 0.0,
            acc: DVec2::ZERO,
            neighbors: NeighborSet::new(),
        }
    }

    /// Particle at rest with no internal energy
    pub fn at(pos: DVec2) -> Self {
        Self::new(pos, DVec2::ZERO, 0.0)
    }

    /// Smoothing length from the last finalized query
    #[inline]
    pub fn smoothing_length(&self) -> f64 {
        self.neighbors.smoothing_length()
    }

    /// Specific kinetic energy: 1/2 |v|^2
    #[inline]
    pub fn specific_kinetic_energy(&self) -> f64 {
        0.5 * self.vel.length_squared()
    }
}
