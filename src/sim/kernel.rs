//! Radial interpolation kernels in 2-D
//!
//! Every kernel is written in terms of `q = r / h` on `[0, 1]`, with the
//! smoothing length `h` being the distance to the farthest retained neighbour.
//! The full kernel is `W(r, h) = weight_prefactor * weight(q) / h^2` and its
//! radial derivative `dW/dr = derivative_prefactor * derivative(q) / h^3`.

use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::particle::Particle;

/// Kernel choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// Constant weight over the support. Density only.
    TopHat,
    /// Monaghan M4 cubic spline
    #[default]
    CubicSpline,
    /// Wendland C2
    WendlandC2,
}

/// Panics unless `q` lies in `[0, 1]`
#[inline]
fn check_q(q: f64) {
    assert!(
        (0.0..=1.0).contains(&q),
        "kernel argument q = {q} outside [0, 1]"
    );
}

/// `r / h`, treating a zero-length separation as the kernel center
#[inline]
pub fn ratio(r: f64, h: f64) -> f64 {
    if r == 0.0 { 0.0 } else { r / h }
}

impl Kernel {
    pub fn name(self) -> &'static str {
        match self {
            Kernel::TopHat => "top-hat",
            Kernel::CubicSpline => "cubic-spline",
            Kernel::WendlandC2 => "wendland-c2",
        }
    }

    /// Whether `derivative` is defined, i.e. the kernel can drive forces
    pub fn has_derivative(self) -> bool {
        !matches!(self, Kernel::TopHat)
    }

    /// Shape function, normalised so that `weight(0)` is the peak
    pub fn weight(self, q: f64) -> f64 {
        check_q(q);
        match self {
            Kernel::TopHat => 1.0,
            Kernel::CubicSpline => {
                if q < 0.5 {
                    6.0 * q * q * q - 6.0 * q * q + 1.0
                } else {
                    let t = 1.0 - q;
                    2.0 * t * t * t
                }
            }
            Kernel::WendlandC2 => {
                let t = 1.0 - q;
                let t2 = t * t;
                t2 * t2 * (1.0 + 4.0 * q)
            }
        }
    }

    /// 2-D normalisation of `weight`
    pub fn weight_prefactor(self) -> f64 {
        match self {
            Kernel::TopHat => 1.0 / PI,
            Kernel::CubicSpline => 40.0 / (7.0 * PI),
            Kernel::WendlandC2 => 7.0 / PI,
        }
    }

    /// d weight / dq
    ///
    /// # Panics
    /// For the top-hat kernel, whose derivative is a delta at the support edge.
    pub fn derivative(self, q: f64) -> f64 {
        check_q(q);
        match self {
            Kernel::TopHat => panic!("top-hat kernel has no derivative"),
            Kernel::CubicSpline => {
                if q < 0.5 {
                    18.0 * q * q - 12.0 * q
                } else {
                    let t = 1.0 - q;
                    -6.0 * t * t
                }
            }
            Kernel::WendlandC2 => {
                let t = 1.0 - q;
                -20.0 * q * t * t * t
            }
        }
    }

    pub fn derivative_prefactor(self) -> f64 {
        self.weight_prefactor()
    }

    /// `W(r, h)`
    #[inline]
    pub fn w(self, r: f64, h: f64) -> f64 {
        self.weight_prefactor() * self.weight(ratio(r, h)) / (h * h)
    }

    /// `dW/dr (r, h)`
    #[inline]
    pub fn dw_dr(self, r: f64, h: f64) -> f64 {
        self.derivative_prefactor() * self.derivative(ratio(r, h)) / (h * h * h)
    }

    /// Gradient of `W` with respect to the first particle, along `r_ab`
    ///
    /// Zero for coincident particles, where the direction is undefined.
    pub fn gradient(self, r_ab: DVec2, h: f64) -> DVec2 {
        let r = r_ab.length();
        if r == 0.0 {
            return DVec2::ZERO;
        }
        r_ab * (self.dw_dr(r, h) / r)
    }

    /// Density from a particle's finalized neighbour set
    ///
    /// `rho = weight_prefactor * mass * sum(weight(r_i / h)) / h^2`.
    /// A particle without neighbours, or whose neighbours all sit on top of
    /// it (`h = 0`), has zero density.
    pub fn density(self, particle: &Particle, mass: f64) -> f64 {
        let set = &particle.neighbors;
        assert!(set.is_finalized(), "density needs a finalized neighbour set");
        let h = set.smoothing_length();
        if set.is_empty() || h <= 0.0 {
            return 0.0;
        }
        let sum: f64 = set.iter().map(|n| self.weight(ratio(n.distance, h))).sum();
        self.weight_prefactor() * mass * sum / (h * h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERNELS: [Kernel; 3] = [Kernel::TopHat, Kernel::CubicSpline, Kernel::WendlandC2];

    /// Integrate W over the unit disk (h = 1) with the midpoint rule
    fn disk_integral(kernel: Kernel) -> f64 {
        let n = 20_000;
        let dq = 1.0 / n as f64;
        (0..n)
            .map(|i| {
                let q = (i as f64 + 0.5) * dq;
                kernel.weight_prefactor() * kernel.weight(q) * 2.0 * PI * q * dq
            })
            .sum()
    }

    #[test]
    fn test_kernels_are_normalised() {
        for kernel in KERNELS {
            let total = disk_integral(kernel);
            assert!(
                (total - 1.0).abs() < 1e-6,
                "{} integrates to {total}",
                kernel.name()
            );
        }
    }

    #[test]
    fn test_smooth_kernels_vanish_at_support() {
        for kernel in [Kernel::CubicSpline, Kernel::WendlandC2] {
            assert!(kernel.weight(1.0).abs() < 1e-15);
            assert!(kernel.derivative(1.0).abs() < 1e-15);
            assert_eq!(kernel.weight(0.0), 1.0);
        }
    }

    #[test]
    fn test_cubic_spline_continuous_at_half() {
        let k = Kernel::CubicSpline;
        let below = k.weight(0.5 - 1e-12);
        let above = k.weight(0.5);
        assert!((below - above).abs() < 1e-9);
        let below = k.derivative(0.5 - 1e-12);
        let above = k.derivative(0.5);
        assert!((below - above).abs() < 1e-9);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        for kernel in [Kernel::CubicSpline, Kernel::WendlandC2] {
            for &q in &[0.1, 0.3, 0.6, 0.9] {
                let eps = 1e-6;
                let fd = (kernel.weight(q + eps) - kernel.weight(q - eps)) / (2.0 * eps);
                assert!((fd - kernel.derivative(q)).abs() < 1e-6, "{}", kernel.name());
            }
        }
    }

    #[test]
    fn test_gradient_points_inward() {
        // Kernel decreases with distance, so the gradient opposes r_ab
        let g = Kernel::CubicSpline.gradient(DVec2::new(0.3, 0.0), 1.0);
        assert!(g.x < 0.0);
        assert_eq!(g.y, 0.0);
        assert_eq!(Kernel::WendlandC2.gradient(DVec2::ZERO, 1.0), DVec2::ZERO);
    }

    #[test]
    #[should_panic(expected = "outside [0, 1]")]
    fn test_q_above_one_panics() {
        Kernel::CubicSpline.weight(1.5);
    }

    #[test]
    #[should_panic(expected = "outside [0, 1]")]
    fn test_nan_q_panics() {
        Kernel::WendlandC2.weight(f64::NAN);
    }

    #[test]
    #[should_panic(expected = "no derivative")]
    fn test_top_hat_derivative_panics() {
        Kernel::TopHat.derivative(0.5);
    }

    #[test]
    fn test_density_zero_smoothing_length() {
        let mut p = Particle::at(DVec2::new(0.5, 0.5));
        for i in 0..5 {
            p.neighbors.insert(0.0, i, p.pos);
        }
        p.neighbors.finalize();
        assert_eq!(p.smoothing_length(), 0.0);
        for kernel in KERNELS {
            assert_eq!(kernel.density(&p, 1.0), 0.0);
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Kernel::WendlandC2).unwrap();
        assert_eq!(json, "\"wendland_c2\"");
        let k: Kernel = serde_json::from_str("\"top_hat\"").unwrap();
        assert_eq!(k, Kernel::TopHat);
    }
}
