//! Service-point identifier.
//!
//! Service points are keyed by the name the field-collection system assigns
//! them ("Block C bins", "Depot 12", …), so the identifier wraps a `String`
//! rather than a dense integer index.  `Ord + Hash` so it can key maps and
//! drive the stable (service point, date) sort the feature builder relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one physical service point (a named container location).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpId(pub String);

impl SpId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SpId {
    fn from(s: &str) -> Self {
        SpId(s.to_owned())
    }
}

impl From<String> for SpId {
    fn from(s: String) -> Self {
        SpId(s)
    }
}

impl fmt::Display for SpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
