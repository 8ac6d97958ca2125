use serde::Serialize;

use crate::lattice::{InvalidCellError, Lattice};

/// Unit cell description. Lengths in Å, angles in degrees.
///
/// Validity is not checked at construction: a structure may carry a
/// partially known or degenerate cell. Operators that need a lattice call
/// [`Cell::lattice`] and decide how to treat the error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub pbc: bool,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub spacegroup: Option<String>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::none()
    }
}

impl Cell {
    /// A non-periodic cell with unknown parameters.
    pub fn none() -> Self {
        Self {
            pbc: false,
            a: f64::NAN,
            b: f64::NAN,
            c: f64::NAN,
            alpha: f64::NAN,
            beta: f64::NAN,
            gamma: f64::NAN,
            spacegroup: None,
        }
    }

    /// A periodic cell; lengths in Ångströms, angles in degrees. Validity is
    /// checked lazily by [`lattice`](Self::lattice).
    pub fn periodic(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            pbc: true,
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            spacegroup: None,
        }
    }

    pub fn with_spacegroup(mut self, spacegroup: impl Into<String>) -> Self {
        self.spacegroup = Some(spacegroup.into());
        self
    }

    #[inline]
    pub fn lengths(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    #[inline]
    pub fn angles(&self) -> [f64; 3] {
        [self.alpha, self.beta, self.gamma]
    }

    /// Builds the lattice for a periodic cell.
    pub fn lattice(&self) -> Result<Lattice, InvalidCellError> {
        if !self.pbc {
            return Err(InvalidCellError::NotPeriodic);
        }
        Lattice::from_parameters(self.a, self.b, self.c, self.alpha, self.beta, self.gamma)
    }

    /// `true` when periodic and the six parameters form a non-singular lattice.
    pub fn is_valid(&self) -> bool {
        self.lattice().is_ok()
    }

    /// Lengths multiplied per axis, angles unchanged.
    pub fn scaled(&self, na: u32, nb: u32, nc: u32) -> Self {
        Self {
            a: self.a * f64::from(na),
            b: self.b * f64::from(nb),
            c: self.c * f64::from(nc),
            ..self.clone()
        }
    }
}
