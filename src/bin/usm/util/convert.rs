use usm::JoinField;
use usm::io::Format;
use usm::io::pdb::ConectPolicy;

use crate::cli;

impl From<cli::InputFormat> for Format {
    fn from(f: cli::InputFormat) -> Self {
        match f {
            cli::InputFormat::Car => Self::Car,
            cli::InputFormat::Mdf => Self::Mdf,
            cli::InputFormat::Pdb => Self::Pdb,
        }
    }
}

impl From<cli::OutputFormat> for Format {
    fn from(f: cli::OutputFormat) -> Self {
        match f {
            cli::OutputFormat::Car => Self::Car,
            cli::OutputFormat::Mdf => Self::Mdf,
            cli::OutputFormat::Pdb => Self::Pdb,
            cli::OutputFormat::Json => Self::Json,
        }
    }
}

impl From<cli::ConectMode> for ConectPolicy {
    fn from(m: cli::ConectMode) -> Self {
        match m {
            cli::ConectMode::None => Self::None,
            cli::ConectMode::Dedup => Self::Dedup,
            cli::ConectMode::Full => Self::Full,
        }
    }
}

impl From<cli::KeyField> for JoinField {
    fn from(k: cli::KeyField) -> Self {
        match k {
            cli::KeyField::MolLabel => Self::MolLabel,
            cli::KeyField::MolIndex => Self::MolIndex,
            cli::KeyField::Name => Self::Name,
            cli::KeyField::Element => Self::Element,
            cli::KeyField::AtomType => Self::AtomType,
            cli::KeyField::MolBlockName => Self::MolBlockName,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_fields_map_one_to_one() {
        let fields = [
            cli::KeyField::MolLabel,
            cli::KeyField::MolIndex,
            cli::KeyField::Name,
        ];
        let mapped: Vec<JoinField> = fields.into_iter().map(Into::into).collect();
        assert_eq!(mapped, JoinField::IDENTITY);
    }

    #[test]
    fn output_json_maps_to_json() {
        assert_eq!(Format::from(cli::OutputFormat::Json), Format::Json);
        assert_eq!(Format::from(cli::InputFormat::Mdf), Format::Mdf);
    }
}
