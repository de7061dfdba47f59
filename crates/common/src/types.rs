use serde::{Deserialize, Serialize};

/// Identifier of a fitter assigned to a customer.
///
/// Fitters are a separate aggregate; customers only hold this value and never
/// a reference to the fitter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FitterId(i64);

impl FitterId {
    /// Creates a fitter ID from a raw column value.
    ///
    /// Legacy rows store `0` for "no fitter", so zero and negative values
    /// yield `None`.
    pub fn from_raw(value: i64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Returns the raw numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for FitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<FitterId> for i64 {
    fn from(id: FitterId) -> Self {
        id.0
    }
}
