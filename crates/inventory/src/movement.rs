//! Movement vocabulary: direction and signed deltas.

use serde::{Deserialize, Serialize};

/// Direction of a stock movement.
///
/// Serialized as `"IN"` / `"OUT"` (the canonical wire form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    /// Signed stock delta for a movement of `quantity` units in this direction.
    ///
    /// `quantity` is a magnitude (validated positive at the decision point);
    /// inbound movements add, outbound movements subtract.
    pub fn signed(self, quantity: i64) -> i64 {
        match self {
            MovementDirection::In => quantity,
            MovementDirection::Out => -quantity,
        }
    }
}

impl core::fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MovementDirection::In => f.write_str("IN"),
            MovementDirection::Out => f.write_str("OUT"),
        }
    }
}
