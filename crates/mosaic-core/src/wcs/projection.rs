use serde::{Deserialize, Serialize};

/// Zenithal projections a mosaic grid may be built on.
///
/// Input frames may carry any of these in their `CTYPEi` codes; the projection
/// math itself is done by the `wcs` crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Projection {
    /// Gnomonic.
    #[default]
    Tan,
    /// Orthographic (slant-free).
    Sin,
    /// Zenithal equidistant.
    Arc,
    /// Zenithal equal-area.
    Zea,
    /// Stereographic.
    Stg,
}

impl Projection {
    pub const ALL: [Projection; 5] = [Self::Tan, Self::Sin, Self::Arc, Self::Zea, Self::Stg];

    pub fn code(self) -> &'static str {
        match self {
            Self::Tan => "TAN",
            Self::Sin => "SIN",
            Self::Arc => "ARC",
            Self::Zea => "ZEA",
            Self::Stg => "STG",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code.trim())
    }
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
