//! FFI bridge for sill-scene targeting managed host runtimes (C# P/Invoke,
//! JNA, GHC FFI).
//!
//! Exposes a C ABI (`extern "C"`) surface that a host runtime can call to
//! drive the scene toolkit: fixed-size string/URL handles, dynamic class
//! registration, object lifecycle, and the manager loop. Bridge instances
//! live in a global handle table of `BridgeCore`s; everything else is opaque
//! pointers the host carries but never inspects.
//!
//! The matching C declarations are in `include/sill_host.h`.

pub mod bridge;
pub mod core;
pub mod error;
pub mod event;
