use thiserror::Error;

use crate::profile::LayoutVariant;

/// Everything that can go wrong while extracting one profile.
///
/// `FieldAbsent` and `StructuralMismatch` are recovered inside the section
/// extractors and never leave them. `InterstitialBlocked` is owned by the
/// assembler's resolution loop; `MandatoryFieldMissing` ends the pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("field `{field}` absent in section `{section}`")]
    FieldAbsent {
        section: &'static str,
        field: &'static str,
    },

    #[error("section `{section}` container not found")]
    StructuralMismatch { section: &'static str },

    #[error("page still blocked by an interstitial after {attempts} resolution attempts")]
    InterstitialBlocked { attempts: u32 },

    #[error("mandatory field `{field}` missing in {layout} layout")]
    MandatoryFieldMissing {
        layout: LayoutVariant,
        field: &'static str,
    },
}

impl ExtractError {
    /// Whether this error ends the whole extraction pass.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExtractError::InterstitialBlocked { .. } | ExtractError::MandatoryFieldMissing { .. }
        )
    }

    /// Short stable label, used as the failure kind in the store.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::FieldAbsent { .. } => "field_absent",
            ExtractError::StructuralMismatch { .. } => "structural_mismatch",
            ExtractError::InterstitialBlocked { .. } => "interstitial_blocked",
            ExtractError::MandatoryFieldMissing { .. } => "mandatory_field_missing",
        }
    }
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
