//! Uniform portal kernel.
//!
//! Pure domain model and decision logic: sizes, request statuses, student
//! records, the policy message, the size summary, and the request lifecycle
//! engine that maps a record plus the modification policy to the view mode an
//! owner sees. Nothing in this crate performs I/O; stores, transports and
//! sessions live in `uniform-runtime`.

pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod record;
pub mod size;
pub mod status;
pub mod summary;

pub use error::{ErrorKind, PortalError};
pub use lifecycle::{
    decide, EditAction, LifecycleEvent, LifecycleInput, OwnerAction, OwnerState, ViewMode,
};
pub use policy::{ModificationPolicy, PolicyMessage};
pub use record::{PendingRequestRow, RowId, SizeRequest, StudentId, StudentProfile, StudentRecord};
pub use size::{Garment, SizeLabel, UniformSizes};
pub use status::RequestStatus;
pub use summary::SizeSummary;
