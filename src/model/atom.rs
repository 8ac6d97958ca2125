use serde::Serialize;

/// Format carry-through fields. None of these affect geometry or topology;
/// they exist so that a structure read from one format can be written back
/// without losing columns the model does not interpret.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AtomExtras {
    /// Raw MDF connection tokens, space separated, as read.
    pub connections_raw: Option<String>,
    pub charge_group: Option<String>,
    pub isotope: Option<String>,
    /// Formal charge token as written in MDF (`0`, `1+`, `1/2+`, ...).
    pub formal_charge: Option<String>,
    pub switching_atom: Option<i32>,
    pub oop_flag: Option<i32>,
    pub chirality_flag: Option<i32>,
    pub occupancy: Option<f64>,
    pub xray_temp_factor: Option<f64>,
    /// Ordinal of the `end`-terminated CAR molecule block.
    pub car_block: Option<u32>,
    /// PDB record name (`ATOM` or `HETATM`).
    pub record: Option<String>,
    /// Supercell tile `(i, j, k)` this atom was replicated into.
    pub image: Option<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Atom {
    pub aid: usize,
    pub mol_label: Option<String>,
    pub mol_index: Option<i64>,
    pub name: Option<String>,
    pub element: Option<String>,
    pub atom_type: Option<String>,
    pub charge: Option<f64>,
    pub mass: Option<f64>,
    pub sigma: Option<f64>,
    pub epsilon: Option<f64>,
    pub position: [f64; 3],
    pub mol_block_name: Option<String>,
    pub extras: AtomExtras,
}

impl Default for Atom {
    fn default() -> Self {
        Self {
            aid: 0,
            mol_label: None,
            mol_index: None,
            name: None,
            element: None,
            atom_type: None,
            charge: None,
            mass: None,
            sigma: None,
            epsilon: None,
            position: [f64::NAN; 3],
            mol_block_name: None,
            extras: AtomExtras::default(),
        }
    }
}

impl Atom {
    /// Creates an atom carrying only its identity triple. Coordinates are NaN.
    pub fn new(mol_label: impl Into<String>, mol_index: i64, name: impl Into<String>) -> Self {
        Self {
            mol_label: Some(mol_label.into()),
            mol_index: Some(mol_index),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the Cartesian position in Ångströms.
    ///
    /// # Arguments
    ///
    /// * `position` - `[x, y, z]`; NaN marks an atom without coordinates
    pub fn with_position(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self
    }

    /// Sets the element symbol.
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Sets the force-field atom type label.
    pub fn with_atom_type(mut self, atom_type: impl Into<String>) -> Self {
        self.atom_type = Some(atom_type.into());
        self
    }

    /// Sets the partial charge in units of e.
    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }

    /// The `(mol_label, mol_index, name)` triple atoms are joined on.
    ///
    /// # Returns
    ///
    /// Borrowed parts, each `None` when the source format left it blank.
    pub fn identity(&self) -> (Option<&str>, Option<i64>, Option<&str>) {
        (
            self.mol_label.as_deref(),
            self.mol_index,
            self.name.as_deref(),
        )
    }

    /// `true` when all three coordinates are present (not NaN).
    #[inline]
    pub fn has_position(&self) -> bool {
        self.position.iter().all(|v| !v.is_nan())
    }

    /// Fills every field that is absent here from `other`. Identity and `aid`
    /// are left untouched.
    pub fn fill_missing_from(&mut self, other: &Atom) {
        fill(&mut self.element, &other.element);
        fill(&mut self.atom_type, &other.atom_type);
        fill(&mut self.charge, &other.charge);
        fill(&mut self.mass, &other.mass);
        fill(&mut self.sigma, &other.sigma);
        fill(&mut self.epsilon, &other.epsilon);
        fill(&mut self.mol_block_name, &other.mol_block_name);
        for (mine, theirs) in self.position.iter_mut().zip(other.position) {
            if mine.is_nan() {
                *mine = theirs;
            }
        }

        let (dst, src) = (&mut self.extras, &other.extras);
        fill(&mut dst.connections_raw, &src.connections_raw);
        fill(&mut dst.charge_group, &src.charge_group);
        fill(&mut dst.isotope, &src.isotope);
        fill(&mut dst.formal_charge, &src.formal_charge);
        fill(&mut dst.switching_atom, &src.switching_atom);
        fill(&mut dst.oop_flag, &src.oop_flag);
        fill(&mut dst.chirality_flag, &src.chirality_flag);
        fill(&mut dst.occupancy, &src.occupancy);
        fill(&mut dst.xray_temp_factor, &src.xray_temp_factor);
        fill(&mut dst.car_block, &src.car_block);
        fill(&mut dst.record, &src.record);
        fill(&mut dst.image, &src.image);
    }
}

fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if dst.is_none() {
        dst.clone_from(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_identity_and_nan_position() {
        let atom = Atom::new("XXXX", 1, "C1");
        assert_eq!(atom.identity(), (Some("XXXX"), Some(1), Some("C1")));
        assert!(atom.position.iter().all(|v| v.is_nan()));
        assert!(!atom.has_position());
        assert_eq!(atom.element, None);
    }

    #[test]
    fn fill_missing_keeps_present_values() {
        let mut coords = Atom::new("XXXX", 1, "O1")
            .with_position([1.0, 2.0, 3.0])
            .with_element("O");
        let mut topo = Atom::new("XXXX", 1, "O1")
            .with_element("N")
            .with_atom_type("o*")
            .with_charge(-0.82);
        topo.extras.formal_charge = Some("1/2+".into());

        coords.fill_missing_from(&topo);

        assert_eq!(coords.element.as_deref(), Some("O"));
        assert_eq!(coords.atom_type.as_deref(), Some("o*"));
        assert_eq!(coords.charge, Some(-0.82));
        assert_eq!(coords.position, [1.0, 2.0, 3.0]);
        assert_eq!(coords.extras.formal_charge.as_deref(), Some("1/2+"));
    }

    #[test]
    fn fill_missing_takes_coordinates_only_when_nan() {
        let mut topo = Atom::new("XXXX", 1, "O1");
        let coords = Atom::new("XXXX", 1, "O1").with_position([4.0, 5.0, 6.0]);
        topo.fill_missing_from(&coords);
        assert_eq!(topo.position, [4.0, 5.0, 6.0]);
    }
}
