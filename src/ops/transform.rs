//! Rigid-body and periodic coordinate transforms.
//!
//! All operators here change positions only; identity, typing, bonds and
//! the cell pass through untouched. Atoms with NaN coordinates are skipped.

use nalgebra::{Rotation3, Unit, Vector3};

use super::error::Error;
use crate::model::structure::Structure;

/// Wrapped fractional components this close to 1.0 snap to 0.0.
pub const WRAP_TOL: f64 = 1e-12;

/// Round-off left below 0.0 by a Cartesian/fractional round trip of a
/// wrapped atom.
const FRAC_ROUNDOFF: f64 = 1e-14;

/// Reduces every atom into the home cell, `f - floor(f)` per fractional
/// component.
///
/// Returns an unchanged copy when the cell is non-periodic or does not form
/// a valid lattice. Atoms already inside the cell keep their exact
/// coordinates. Components at or within [`WRAP_TOL`] of 1.0, and any
/// negative beyond round-off, are reduced, with results that land within
/// [`WRAP_TOL`] of 1.0 snapped to 0.0. A second wrap changes nothing.
///
/// # Errors
///
/// [`Error::Schema`] if the rebuilt structure fails validation.
pub fn wrap_to_cell(structure: &Structure) -> Result<Structure, Error> {
    let lattice = match structure.cell().lattice() {
        Ok(lattice) => lattice,
        Err(e) => {
            log::debug!("wrap: skipped ({e})");
            return Ok(structure.clone());
        }
    };

    let mut parts = structure.clone().into_parts();
    let mut moved = 0usize;
    for atom in &mut parts.atoms {
        if !atom.has_position() {
            continue;
        }
        let frac = lattice.cartesian_to_frac(atom.position);
        if frac.iter().all(|&v| (-FRAC_ROUNDOFF..1.0 - WRAP_TOL).contains(&v)) {
            continue;
        }
        let wrapped = frac.map(|v| {
            let r = v - v.floor();
            if r >= 1.0 - WRAP_TOL { 0.0 } else { r }
        });
        atom.position = lattice.frac_to_cartesian(wrapped);
        moved += 1;
    }
    log::debug!("wrap: moved {moved} of {} atoms", parts.atoms.len());

    Ok(Structure::from_parts(parts)?)
}

/// Shifts every positioned atom by `vector`.
pub fn translate(structure: &Structure, vector: [f64; 3]) -> Result<Structure, Error> {
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid_argument(
            "vector",
            format!("translation {vector:?} is not finite"),
        ));
    }
    let mut parts = structure.clone().into_parts();
    for atom in &mut parts.atoms {
        for (p, d) in atom.position.iter_mut().zip(vector) {
            *p += d;
        }
    }
    Ok(Structure::from_parts(parts)?)
}

/// Rotates every positioned atom about the origin.
pub fn rotate(structure: &Structure, rotation: &Rotation3<f64>) -> Result<Structure, Error> {
    let mut parts = structure.clone().into_parts();
    for atom in &mut parts.atoms {
        if atom.has_position() {
            atom.position = apply(rotation, atom.position);
        }
    }
    Ok(Structure::from_parts(parts)?)
}

/// Right-handed rotation of `degrees` about `axis`.
pub fn rotation_from_axis_angle(axis: [f64; 3], degrees: f64) -> Result<Rotation3<f64>, Error> {
    if !degrees.is_finite() {
        return Err(Error::invalid_argument("degrees", format!("angle {degrees} is not finite")));
    }
    let axis = Unit::try_new(Vector3::from(axis), 1e-12).ok_or_else(|| {
        Error::invalid_argument("axis", format!("rotation axis {axis:?} has zero length"))
    })?;
    Ok(Rotation3::from_axis_angle(&axis, degrees.to_radians()))
}

fn apply(rotation: &Rotation3<f64>, point: [f64; 3]) -> [f64; 3] {
    let v = rotation * Vector3::from(point);
    [v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{atom::Atom, cell::Cell};

    fn structure(cell: Cell, positions: &[[f64; 3]]) -> Structure {
        let atoms = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| Atom::new("M", 1, format!("A{i}")).with_position(p))
            .collect();
        Structure::new(atoms, None, cell).unwrap()
    }

    fn cubic() -> Cell {
        Cell::periodic(10.0, 10.0, 10.0, 90.0, 90.0, 90.0)
    }

    #[test]
    fn wrap_reduces_into_home_cell() {
        let s = structure(cubic(), &[[12.0, -3.0, 5.0], [25.0, 0.0, -12.0]]);
        let w = wrap_to_cell(&s).unwrap();
        let p = w.atoms()[0].position;
        assert!((p[0] - 2.0).abs() < 1e-12);
        assert!((p[1] - 7.0).abs() < 1e-12);
        assert!((p[2] - 5.0).abs() < 1e-12);
        let q = w.atoms()[1].position;
        assert!((q[0] - 5.0).abs() < 1e-12);
        assert!((q[2] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn wrap_is_noop_without_valid_cell() {
        let s = structure(Cell::none(), &[[12.0, -3.0, 5.0]]);
        assert_eq!(wrap_to_cell(&s).unwrap().atoms()[0].position, [12.0, -3.0, 5.0]);

        let degenerate = Cell::periodic(10.0, 10.0, 10.0, 90.0, 90.0, 0.0);
        let s = structure(degenerate, &[[12.0, -3.0, 5.0]]);
        assert_eq!(wrap_to_cell(&s).unwrap().atoms()[0].position, [12.0, -3.0, 5.0]);
    }

    #[test]
    fn wrap_twice_changes_nothing() {
        let triclinic = Cell::periodic(7.3, 8.1, 9.4, 78.0, 84.5, 101.2);
        let s = structure(
            triclinic,
            &[[-4.2, 17.9, 3.3], [100.0, -55.5, 21.0], [0.1, 0.1, 0.1], [-1e-3, 9.0, 30.0]],
        );
        let once = wrap_to_cell(&s).unwrap();
        let twice = wrap_to_cell(&once).unwrap();
        assert_eq!(once.positions(), twice.positions());

        let lattice = once.cell().lattice().unwrap();
        for p in once.positions() {
            for f in lattice.cartesian_to_frac(p) {
                assert!((-FRAC_ROUNDOFF..1.0).contains(&f), "{f}");
            }
        }
    }

    #[test]
    fn wrap_moves_atoms_on_far_face_and_just_below_origin() {
        let s = structure(cubic(), &[[10.0, 5.0, 5.0], [-1e-12, 5.0, 5.0], [5.0, 10.0, -20.0]]);
        let w = wrap_to_cell(&s).unwrap();
        let lattice = w.cell().lattice().unwrap();
        for p in w.positions() {
            for f in lattice.cartesian_to_frac(p) {
                assert!((-FRAC_ROUNDOFF..1.0).contains(&f), "{p:?} has fractional {f}");
            }
        }
        let expected = [[0.0, 5.0, 5.0], [0.0, 5.0, 5.0], [5.0, 0.0, 0.0]];
        for (atom, want) in w.atoms().iter().zip(expected) {
            for k in 0..3 {
                assert!((atom.position[k] - want[k]).abs() < 1e-9, "{:?}", atom.position);
            }
        }
        assert_eq!(wrap_to_cell(&w).unwrap().positions(), w.positions());
    }

    #[test]
    fn wrap_leaves_nan_atoms_alone() {
        let mut parts = structure(cubic(), &[[12.0, 0.0, 0.0]]).into_parts();
        parts.atoms.push(Atom::new("M", 1, "Q"));
        let s = Structure::from_parts(parts).unwrap();
        let w = wrap_to_cell(&s).unwrap();
        assert!(!w.atoms()[1].has_position());
    }

    #[test]
    fn translate_and_rotate() {
        let s = structure(Cell::none(), &[[1.0, 0.0, 0.0]]);
        let t = translate(&s, [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(t.atoms()[0].position, [2.0, 2.0, 3.0]);

        let r = rotation_from_axis_angle([0.0, 0.0, 2.0], 90.0).unwrap();
        let p = rotate(&s, &r).unwrap().atoms()[0].position;
        assert!(p[0].abs() < 1e-12 && (p[1] - 1.0).abs() < 1e-12 && p[2].abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_arguments() {
        assert!(matches!(
            rotation_from_axis_angle([0.0; 3], 10.0),
            Err(Error::InvalidArgument { name: "axis", .. })
        ));
        let s = structure(Cell::none(), &[[1.0, 0.0, 0.0]]);
        assert!(translate(&s, [f64::NAN, 0.0, 0.0]).is_err());
    }
}
