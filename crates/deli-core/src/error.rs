use crate::fixed::Cents;
use crate::id::{IngredientId, TrayId};

/// Errors from player and client commands on a running shift.
///
/// A wrong ingredient is not an error: it comes back as
/// [`Verdict::Wrong`](crate::tray::Verdict::Wrong).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShiftError {
    #[error("no tray {0:?} in this shift")]
    UnknownTray(TrayId),
    #[error("tray {0:?} is not completed")]
    TrayNotCompleted(TrayId),
    #[error("the shift is terminated")]
    Terminated,
    #[error("unknown ingredient {0:?}")]
    UnknownIngredient(IngredientId),
    #[error("insufficient funds: need {needed} cents, wallet holds {available}")]
    InsufficientFunds { needed: Cents, available: Cents },
}
