//! General-lattice geometry for periodic cells.
//!
//! A [`Lattice`] is built from the six crystallographic parameters and stores
//! the lattice vectors as the *rows* of a 3×3 matrix `A` in the canonical
//! orientation: `a` along x, `b` in the xy-plane, `c` completing a
//! right-handed triclinic basis. Points are treated as row vectors, so
//!
//! - fractional → Cartesian is `r = f · A`
//! - Cartesian → fractional is `f = r · A⁻¹`
//!
//! Degenerate parameter sets are rejected with an [`InvalidCellError`] instead
//! of producing a zero or near-singular matrix.

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

/// Smallest admissible `|sin γ|`.
pub const SIN_GAMMA_EPS: f64 = 1e-12;
/// Negative `cz²` values down to this bound are clamped to zero.
pub const CZ2_NEG_TOL: f64 = -1e-14;
/// Relative part of the singularity test, scaled by `a·b·c`.
pub const DET_REL_TOL: f64 = 1e-12;
/// Absolute part of the singularity test.
pub const DET_ABS_TOL: f64 = 1e-12;

/// Rejection reasons for lattice parameters or matrices.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidCellError {
    #[error("cell is not periodic")]
    NotPeriodic,

    #[error("lattice parameter '{name}' is not finite ({value})")]
    NonFinite { name: &'static str, value: f64 },

    #[error("lattice length '{name}' must be positive (got {value})")]
    NonPositiveLength { name: &'static str, value: f64 },

    #[error("degenerate cell: |sin(gamma)| < {SIN_GAMMA_EPS:e} (gamma = {gamma} deg)")]
    DegenerateGamma { gamma: f64 },

    #[error("inconsistent cell angles: cz^2 = {cz2:e} is negative")]
    NegativeCzSquared { cz2: f64 },

    #[error("lattice matrix is singular (det = {det:e})")]
    Singular { det: f64 },
}

/// Lattice vectors plus the cached inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl Lattice {
    /// Builds the canonical lattice matrix from `(a, b, c, alpha, beta, gamma)`.
    ///
    /// `a` lies along x, `b` in the xy-plane and `c` completes the triclinic
    /// basis. A slightly negative `cz²` (down to -1e-14) is clamped to zero.
    ///
    /// # Arguments
    ///
    /// * `a`, `b`, `c` - Cell lengths in Ångströms
    /// * `alpha`, `beta`, `gamma` - Cell angles in degrees
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidCellError`] for non-finite parameters, non-positive
    /// lengths, `|sin γ|` below 1e-12, a negative `cz²` beyond the clamp, or
    /// a determinant that is zero at the scale of `a·b·c`.
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, InvalidCellError> {
        for (name, value) in [
            ("a", a),
            ("b", b),
            ("c", c),
            ("alpha", alpha),
            ("beta", beta),
            ("gamma", gamma),
        ] {
            if !value.is_finite() {
                return Err(InvalidCellError::NonFinite { name, value });
            }
        }
        for (name, value) in [("a", a), ("b", b), ("c", c)] {
            if value <= 0.0 {
                return Err(InvalidCellError::NonPositiveLength { name, value });
            }
        }

        let (cos_a, cos_b) = (alpha.to_radians().cos(), beta.to_radians().cos());
        let (sin_g, cos_g) = gamma.to_radians().sin_cos();
        if sin_g.abs() < SIN_GAMMA_EPS {
            return Err(InvalidCellError::DegenerateGamma { gamma });
        }

        let cx = c * cos_b;
        let cy = c * (cos_a - cos_b * cos_g) / sin_g;
        let mut cz2 = c * c - cx * cx - cy * cy;
        if cz2 < 0.0 {
            if cz2 < CZ2_NEG_TOL {
                return Err(InvalidCellError::NegativeCzSquared { cz2 });
            }
            cz2 = 0.0;
        }
        let cz = cz2.sqrt();

        #[rustfmt::skip]
        let matrix = Matrix3::new(
            a,          0.0,        0.0,
            b * cos_g,  b * sin_g,  0.0,
            cx,         cy,         cz,
        );

        let det = matrix.determinant();
        if det.abs() <= DET_REL_TOL * (a * b * c) + DET_ABS_TOL {
            return Err(InvalidCellError::Singular { det });
        }

        let inverse = lattice_inverse(&matrix)?;
        Ok(Self { matrix, inverse })
    }

    /// Row-vector lattice matrix `A`.
    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Cached `A⁻¹`.
    #[inline]
    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    /// Lattice vector `i` (0 = a, 1 = b, 2 = c) in Cartesian coordinates.
    pub fn vector(&self, i: usize) -> [f64; 3] {
        let row = self.matrix.row(i);
        [row[0], row[1], row[2]]
    }

    /// Cell volume in Å³.
    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Converts one fractional point to Cartesian, `r = f · A`.
    ///
    /// # Arguments
    ///
    /// * `frac` - Fractional coordinates along the a, b and c vectors
    ///
    /// # Returns
    ///
    /// Cartesian position in Ångströms. Round-trips through
    /// [`cartesian_to_frac`](Self::cartesian_to_frac) within 1e-12.
    pub fn frac_to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let r = self.matrix.transpose() * Vector3::from(frac);
        [r.x, r.y, r.z]
    }

    /// Converts one Cartesian point to fractional, `f = r · A⁻¹`.
    ///
    /// # Arguments
    ///
    /// * `cart` - Cartesian position in Ångströms
    ///
    /// # Returns
    ///
    /// Fractional coordinates, not reduced into `[0, 1)`.
    pub fn cartesian_to_frac(&self, cart: [f64; 3]) -> [f64; 3] {
        let f = self.inverse.transpose() * Vector3::from(cart);
        [f.x, f.y, f.z]
    }

    /// Batched `F · A`. Output order matches input order.
    pub fn frac_to_cartesian_many(&self, frac: &[[f64; 3]]) -> Vec<[f64; 3]> {
        frac.iter().map(|&f| self.frac_to_cartesian(f)).collect()
    }

    /// Batched `R · A⁻¹`. Output order matches input order.
    pub fn cartesian_to_frac_many(&self, cart: &[[f64; 3]]) -> Vec<[f64; 3]> {
        cart.iter().map(|&r| self.cartesian_to_frac(r)).collect()
    }
}

/// Inverts a lattice matrix, rejecting singular input.
///
/// # Errors
///
/// Returns [`InvalidCellError::Singular`] when the determinant is not finite,
/// not above 1e-12 in magnitude, or the inversion itself fails.
pub fn lattice_inverse(matrix: &Matrix3<f64>) -> Result<Matrix3<f64>, InvalidCellError> {
    let det = matrix.determinant();
    if !det.is_finite() || det.abs() <= DET_ABS_TOL {
        return Err(InvalidCellError::Singular { det });
    }
    matrix
        .try_inverse()
        .ok_or(InvalidCellError::Singular { det })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RT_TOL: f64 = 1e-12;

    fn cells() -> Vec<[f64; 6]> {
        vec![
            [10.0, 10.0, 10.0, 90.0, 90.0, 90.0],
            [10.0, 12.0, 8.0, 90.0, 100.0, 90.0],
            [10.0, 10.0, 15.0, 90.0, 90.0, 120.0],
            [7.3, 8.1, 9.4, 78.0, 84.5, 101.2],
        ]
    }

    fn points() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [0.25, 0.5, 0.75],
            [-0.3, 1.7, 0.999],
            [2.0, -1.0, 0.5],
            [0.123456789, 0.987654321, 0.5],
        ]
    }

    fn assert_close(a: [f64; 3], b: [f64; 3], tol: f64) {
        for k in 0..3 {
            assert!(
                (a[k] - b[k]).abs() <= tol,
                "component {k}: {} vs {} (tol {tol:e})",
                a[k],
                b[k]
            );
        }
    }

    #[test]
    fn canonical_orientation() {
        let lat = Lattice::from_parameters(10.0, 10.0, 15.0, 90.0, 90.0, 120.0).unwrap();
        let [ax, ay, az] = lat.vector(0);
        assert_eq!((ax, ay, az), (10.0, 0.0, 0.0));
        let b = lat.vector(1);
        assert!((b[0] + 5.0).abs() < 1e-12);
        assert!((b[1] - 10.0 * 120f64.to_radians().sin()).abs() < 1e-12);
        assert_eq!(b[2], 0.0);
        let c = lat.vector(2);
        assert!(c[0].abs() < 1e-12 && c[1].abs() < 1e-12);
        assert!((c[2] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn frac_cart_round_trip_within_tolerance() {
        for [a, b, c, al, be, ga] in cells() {
            let lat = Lattice::from_parameters(a, b, c, al, be, ga).unwrap();
            for f in points() {
                let back = lat.cartesian_to_frac(lat.frac_to_cartesian(f));
                assert_close(back, f, RT_TOL);
            }
        }
    }

    #[test]
    fn cart_frac_round_trip_within_tolerance() {
        let lat = Lattice::from_parameters(7.3, 8.1, 9.4, 78.0, 84.5, 101.2).unwrap();
        let carts = lat.frac_to_cartesian_many(&points());
        let fracs = lat.cartesian_to_frac_many(&carts);
        let again = lat.frac_to_cartesian_many(&fracs);
        for (r, r2) in carts.iter().zip(&again) {
            assert_close(*r2, *r, RT_TOL * 10.0);
        }
    }

    #[test]
    fn cubic_volume_and_scale() {
        let lat = Lattice::from_parameters(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap();
        assert!((lat.volume() - 1000.0).abs() < 1e-9);
        assert_close(lat.frac_to_cartesian([0.5, 0.5, 0.5]), [5.0, 5.0, 5.0], 1e-12);
    }

    #[test]
    fn rejects_tiny_gamma() {
        let err = Lattice::from_parameters(10.0, 10.0, 10.0, 90.0, 90.0, 1e-14).unwrap_err();
        assert!(matches!(err, InvalidCellError::DegenerateGamma { .. }));
    }

    #[test]
    fn rejects_negative_cz_squared() {
        let err = Lattice::from_parameters(1.0, 1.0, 1.0, 0.0, 0.0, 60.0).unwrap_err();
        assert!(matches!(err, InvalidCellError::NegativeCzSquared { .. }));
    }

    #[test]
    fn rejects_non_finite_and_non_positive() {
        assert!(matches!(
            Lattice::from_parameters(f64::NAN, 1.0, 1.0, 90.0, 90.0, 90.0),
            Err(InvalidCellError::NonFinite { name: "a", .. })
        ));
        assert!(matches!(
            Lattice::from_parameters(1.0, 1.0, 1.0, 90.0, f64::INFINITY, 90.0),
            Err(InvalidCellError::NonFinite { name: "beta", .. })
        ));
        assert!(matches!(
            Lattice::from_parameters(1.0, 0.0, 1.0, 90.0, 90.0, 90.0),
            Err(InvalidCellError::NonPositiveLength { name: "b", .. })
        ));
    }

    #[test]
    fn inverse_rejects_zero_matrix() {
        let err = lattice_inverse(&Matrix3::zeros()).unwrap_err();
        assert!(matches!(err, InvalidCellError::Singular { .. }));
    }
}
