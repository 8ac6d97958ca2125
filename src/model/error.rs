use thiserror::Error;

/// Structure construction invariant violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("atom {aid}: coordinate '{axis}' is infinite")]
    InfiniteCoordinate { aid: usize, axis: char },

    #[error("atom {aid}: field '{field}' must be finite when present (got {value})")]
    NonFiniteField {
        aid: usize,
        field: &'static str,
        value: f64,
    },

    #[error("bond {bid}: endpoint {aid} is out of range for {n_atoms} atoms")]
    BondEndpointOutOfRange {
        bid: usize,
        aid: usize,
        n_atoms: usize,
    },

    #[error("bond {bid}: atom {aid} cannot be bonded to itself")]
    SelfBond { bid: usize, aid: usize },

    #[error("bond {bid}: field 'order' must be finite (got {order})")]
    NonFiniteBondOrder { bid: usize, order: f64 },
}
