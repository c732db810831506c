//! Live scene objects.
//!
//! An [`Instance`] pairs one opaque host back-reference with a shared
//! [`ClassDef`]. Instances are handed out as `Arc`s so the scene, open
//! windows and the embedding layer can hold the same object; when the last
//! holder drops, the class's release trampoline fires exactly once with the
//! back-reference.

use std::ffi::c_void;
use std::sync::Arc;

use crate::class::{ClassDef, MemberKind};
use crate::error::SceneError;

/// Opaque token identifying the host-side half of an object.
///
/// The scene stores and returns the token; it never dereferences it. A null
/// token is legal and means "no host state attached".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRef(*mut c_void);

// Safety: the token is never dereferenced on this side of the boundary. The
// host keeps the pointee alive until the release trampoline has run.
unsafe impl Send for HostRef {}
unsafe impl Sync for HostRef {}

impl HostRef {
    pub const NONE: HostRef = HostRef(std::ptr::null_mut());

    pub fn new(raw: *mut c_void) -> Self {
        Self(raw)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0.is_null()
    }
}

/// Direction tag written into `argv[0]` of a property trampoline, as an
/// `i32`, so the trampoline can branch without out-of-band state.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    Read = 0,
    Write = 1,
}

/// One live object: a host back-reference bound to a class table.
///
/// Identity is the `Arc` allocation itself; the address stays stable for the
/// object's whole life, so it doubles as the object handle across the
/// boundary.
pub struct Instance {
    class: Arc<ClassDef>,
    host_ref: HostRef,
}

impl Instance {
    pub fn new(class: Arc<ClassDef>, host_ref: HostRef) -> Arc<Self> {
        tracing::debug!("created `{}` instance", class.name());
        Arc::new(Self { class, host_ref })
    }

    pub fn class(&self) -> &Arc<ClassDef> {
        &self.class
    }

    pub fn host_ref(&self) -> HostRef {
        self.host_ref
    }

    /// Call method member `name`. By convention `argv[0]` is the result slot
    /// and `argv[1..]` the arguments; the trampoline owns the interpretation
    /// of every slot.
    pub fn invoke(&self, name: &str, argv: &mut [*mut c_void]) -> Result<(), SceneError> {
        let (_, member) = self
            .class
            .member_named(name)
            .ok_or_else(|| SceneError::UnknownMember(name.to_owned()))?;
        if member.kind != MemberKind::Method {
            return Err(SceneError::NotAMethod(name.to_owned()));
        }
        // Safety: the trampoline came from the host's registration table and
        // receives the back-reference it was registered against.
        unsafe { (member.func)(self.host_ref.as_ptr(), argv.as_mut_ptr()) };
        Ok(())
    }

    /// Access property member `name` in the given direction. The value slot
    /// is read from on writes and written through on reads.
    pub fn access_property(
        &self,
        name: &str,
        access: PropertyAccess,
        value_slot: *mut c_void,
    ) -> Result<(), SceneError> {
        let (_, member) = self
            .class
            .member_named(name)
            .ok_or_else(|| SceneError::UnknownMember(name.to_owned()))?;
        if member.kind != MemberKind::Property {
            return Err(SceneError::NotAProperty(name.to_owned()));
        }
        let mut tag = access as i32;
        let mut argv = [(&mut tag) as *mut i32 as *mut c_void, value_slot];
        // Safety: same contract as `invoke`; `tag` outlives the call.
        unsafe { (member.func)(self.host_ref.as_ptr(), argv.as_mut_ptr()) };
        Ok(())
    }

    pub fn read_property(&self, name: &str, out_slot: *mut c_void) -> Result<(), SceneError> {
        self.access_property(name, PropertyAccess::Read, out_slot)
    }

    pub fn write_property(&self, name: &str, value_slot: *mut c_void) -> Result<(), SceneError> {
        self.access_property(name, PropertyAccess::Write, value_slot)
    }

    /// Raw dispatch by registration index. The caller assembles the full
    /// argument vector, direction tag included; this is the path the scene's
    /// meta dispatch uses once a name has been resolved to an index.
    pub fn dispatch(&self, index: usize, argv: &mut [*mut c_void]) -> Result<(), SceneError> {
        let member = self
            .class
            .member(index)
            .ok_or_else(|| SceneError::UnknownMember(format!("#{index}")))?;
        // Safety: same contract as `invoke`.
        unsafe { (member.func)(self.host_ref.as_ptr(), argv.as_mut_ptr()) };
        Ok(())
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        tracing::debug!("dropping `{}` instance", self.class.name());
        if self.host_ref.is_none() {
            return;
        }
        if let Some(release) = self.class.release_fn() {
            // Safety: fires once, after the last holder is gone, with the
            // token the host handed in at creation.
            unsafe { release(self.host_ref.as_ptr()) };
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("host_ref", &self.host_ref)
            .finish()
    }
}
