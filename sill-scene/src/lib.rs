//! Scene runtime for the Sill toolkit.
//!
//! Sill lets a managed host runtime drive a native scene toolkit. This crate
//! is the toolkit-facing half: value types that cross the boundary
//! ([`SceneText`], [`SceneUrl`]), dynamic classes registered from host
//! trampoline tables ([`ClassDef`]), live objects carrying opaque host
//! back-references ([`Instance`]), and the [`Manager`] whose loop thread owns
//! every window. The C ABI in `sill-host-core` is a thin shell over these
//! types.

pub mod backend;
pub mod class;
pub mod error;
pub mod manager;
pub mod object;
pub mod value;

pub use backend::{BackendLog, HeadlessBackend, SceneBackend};
pub use class::{ClassDef, ClassMember, MemberKind, ReleaseFn, UniformFn};
pub use error::SceneError;
pub use manager::{LoopState, Manager, ManagerConfig, SceneEvent, SceneWindow};
pub use object::{HostRef, Instance, PropertyAccess};
pub use value::{SceneText, SceneUrl};
