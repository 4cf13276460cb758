pub mod ordering;
pub mod prescription;
pub mod response;
pub mod session;
pub mod weight;

pub use ordering::{ContinuityError, OrderScope};
pub use prescription::{
    GroupPatch, GroupSettings, GroupType, NewPrescriptionExercise, NewPrescriptionGroup,
    PrescriptionExercise, PrescriptionGroup, PrescriptionPatch,
};
pub use response::{
    BlockResponse, ExerciseResponse, GroupResponse, PrescriptionResponse, SessionResponse,
    SessionSummary, SetResponse,
};
pub use session::{
    BlockTree, ExerciseTree, NewSession, NewSessionExercise, NewSessionSet, Progress,
    ProgressState, SessionBlock, SessionExercise, SessionPatch, SessionSet, SessionSetPatch,
    SessionTree, WorkoutSession,
};
pub use weight::{WeightField, WeightInput, WeightOutput};

use serde::{Deserialize, Deserializer};

/// Patch field helper: a missing key stays `None` (via `#[serde(default)]`),
/// an explicit `null` becomes `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
