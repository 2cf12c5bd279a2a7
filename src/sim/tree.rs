//! Binary space partition over the particle array
//!
//! The tree never owns particles. Each cell records a contiguous index range
//! into the one particle array, which `partition` reorders in place while the
//! tree is built. The whole tree is rebuilt every step.

use std::ops::Range;

use glam::DVec2;

use super::particle::Particle;
use crate::consts::MAX_PARTICLES_PER_CELL;

/// Split axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// The orthogonal axis
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    /// Component of `v` along this axis
    #[inline]
    pub fn of(self, v: DVec2) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    /// Copy of `v` with the component along this axis replaced
    #[inline]
    pub fn with(self, v: DVec2, value: f64) -> DVec2 {
        match self {
            Axis::X => DVec2::new(value, v.y),
            Axis::Y => DVec2::new(v.x, value),
        }
    }
}

/// Partition `particles` in place around `split` on `axis`
///
/// Returns `(below_or_equal, above)`. NaN coordinates land in `above`.
pub fn partition(
    particles: &mut [Particle],
    axis: Axis,
    split: f64,
) -> (&mut [Particle], &mut [Particle]) {
    let mut i = 0;
    let mut j = particles.len();
    while i < j {
        if axis.of(particles[i].pos) <= split {
            i += 1;
        } else {
            j -= 1;
            particles.swap(i, j);
        }
    }
    particles.split_at_mut(i)
}

/// A tree node
#[derive(Debug, Clone)]
pub struct Cell {
    pub lower_left: DVec2,
    pub upper_right: DVec2,
    /// Indices into the particle array covered by this cell
    pub range: Range<usize>,
    /// Bounding sphere center (filled by `bounding_spheres`)
    pub center: DVec2,
    /// Bounding sphere radius
    pub radius: f64,
    /// Child holding coordinates at or below the split
    pub lower: Option<Box<Cell>>,
    /// Child holding coordinates above the split
    pub upper: Option<Box<Cell>>,
}

impl Cell {
    /// An unsplit cell
    pub fn new(lower_left: DVec2, upper_right: DVec2, range: Range<usize>) -> Self {
        Self {
            lower_left,
            upper_right,
            range,
            center: (lower_left + upper_right) * 0.5,
            radius: 0.0,
            lower: None,
            upper: None,
        }
    }

    /// Build a tree over all `particles`, starting with a split on `axis`
    ///
    /// Root bounds are the bounding box of the current positions.
    pub fn build(particles: &mut [Particle], axis: Axis, split_fraction: f64) -> Self {
        let (lower_left, upper_right) = bounding_box(particles);
        let mut root = Cell::new(lower_left, upper_right, 0..particles.len());
        if particles.len() > MAX_PARTICLES_PER_CELL {
            root.treebuild(particles, axis, split_fraction);
        }
        log::trace!(
            "tree built: {} particles, {} leaves, depth {}",
            particles.len(),
            root.leaf_count(),
            root.depth()
        );
        root
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// True if the bounds have zero extent on both axes
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.lower_left.x >= self.upper_right.x && self.lower_left.y >= self.upper_right.y
    }

    /// Recursively split this cell. `particles` is exactly this cell's range.
    ///
    /// If neither axis can shrink the cell (positions closer than the float
    /// spacing), the cell stays a leaf even when it is over capacity.
    pub fn treebuild(&mut self, particles: &mut [Particle], axis: Axis, split_fraction: f64) {
        assert_eq!(
            particles.len(),
            self.range.len(),
            "cell range does not match its particle slice"
        );
        if self.is_degenerate() {
            return;
        }
        if !self.split(particles, axis, split_fraction) {
            self.split(particles, axis.other(), split_fraction);
        }
    }

    /// Split once along `axis` and recurse into the children
    ///
    /// Returns false without attaching children when the split would hand all
    /// particles to a child with the parent's own bounds.
    fn split(&mut self, particles: &mut [Particle], axis: Axis, split_fraction: f64) -> bool {
        let lo = axis.of(self.lower_left);
        let hi = axis.of(self.upper_right);
        if lo >= hi {
            return false;
        }
        let split = lo + split_fraction * (hi - lo);

        let (below, above) = partition(particles, axis, split);
        if (above.is_empty() && split >= hi) || (below.is_empty() && split <= lo) {
            return false;
        }
        if (below.is_empty() || above.is_empty()) && all_coincident(particles_of(below, above)) {
            // Identical positions can never be separated
            return true;
        }

        let start = self.range.start;
        let mid = start + below.len();

        if !below.is_empty() {
            let mut child = Cell::new(
                self.lower_left,
                axis.with(self.upper_right, split),
                start..mid,
            );
            if child.len() > MAX_PARTICLES_PER_CELL {
                child.treebuild(below, axis.other(), split_fraction);
            }
            self.lower = Some(Box::new(child));
        }

        if !above.is_empty() {
            let mut child = Cell::new(
                axis.with(self.lower_left, split),
                self.upper_right,
                mid..self.range.end,
            );
            if child.len() > MAX_PARTICLES_PER_CELL {
                child.treebuild(above, axis.other(), split_fraction);
            }
            self.upper = Some(Box::new(child));
        }
        true
    }

    /// True if no split on either axis falls strictly inside the bounds
    pub fn is_unsplittable(&self, split_fraction: f64) -> bool {
        [Axis::X, Axis::Y].into_iter().all(|axis| {
            let lo = axis.of(self.lower_left);
            let hi = axis.of(self.upper_right);
            let split = lo + split_fraction * (hi - lo);
            !(lo < split && split < hi)
        })
    }

    /// Children that exist, lower first
    pub fn children(&self) -> impl Iterator<Item = &Cell> {
        self.lower.as_deref().into_iter().chain(self.upper.as_deref())
    }

    /// All leaves, depth first
    pub fn leaves(&self) -> Vec<&Cell> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(cell) = stack.pop() {
            if cell.is_leaf() {
                out.push(cell);
            } else {
                // Push upper first so lower leaves come out first
                stack.extend(cell.upper.as_deref());
                stack.extend(cell.lower.as_deref());
            }
        }
        out
    }

    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children().map(Cell::leaf_count).sum()
        }
    }

    /// Number of levels including this one
    pub fn depth(&self) -> usize {
        1 + self.children().map(Cell::depth).max().unwrap_or(0)
    }
}

/// Whichever side of a one-sided partition holds the particles
fn particles_of<'a>(below: &'a [Particle], above: &'a [Particle]) -> &'a [Particle] {
    if below.is_empty() { above } else { below }
}

fn all_coincident(particles: &[Particle]) -> bool {
    match particles.first() {
        Some(first) => particles.iter().all(|p| p.pos == first.pos),
        None => true,
    }
}

/// Axis-aligned bounding box of all positions
pub fn bounding_box(particles: &[Particle]) -> (DVec2, DVec2) {
    if particles.is_empty() {
        return (DVec2::ZERO, DVec2::ZERO);
    }
    particles.iter().fold(
        (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
        |(lo, hi), p| (lo.min(p.pos), hi.max(p.pos)),
    )
}
