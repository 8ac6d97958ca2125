use thiserror::Error;

/// Errors raised while deriving a term set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A bonded atom has no force-field type, so its terms have no key.
    #[error("atom {aid} ({}) takes part in bonded terms but has no atom_type", name.as_deref().unwrap_or("unnamed"))]
    UntypedAtom { aid: usize, name: Option<String> },
}

/// Atom types a parameter source does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no parameters for atom type(s): {}", missing.join(", "))]
pub struct MissingTypesError {
    /// Sorted, deduplicated.
    pub missing: Vec<String>,
}
