//! Class registration and object lifecycle externs.
//!
//! A class handle owns one `Arc<ClassDef>`; every object of the class clones
//! that `Arc`, so `sill_host_finalise_class_handle` only drops the registry's
//! hold and live objects keep the class alive. An object handle is the raw
//! `Arc<Instance>` itself, which makes the pointer stable identity for the
//! object's whole life.

use std::ffi::{c_char, c_void};
use std::sync::Arc;

use sill_scene::{ClassDef, HostRef, Instance, PropertyAccess, ReleaseFn, UniformFn};

use crate::bridge::read_c_str;

/// Direction tag a property trampoline finds behind `argv[0]` on a read.
pub const SILL_HOST_PROPERTY_READ: i32 = PropertyAccess::Read as i32;

/// Direction tag a property trampoline finds behind `argv[0]` on a write.
pub const SILL_HOST_PROPERTY_WRITE: i32 = PropertyAccess::Write as i32;

/// Opaque class handle: the registry's hold on a class definition.
pub struct SillClassHandle {
    class: Arc<ClassDef>,
}

/// Opaque object handle. The pointer is the `Arc<Instance>` the host holds;
/// it is never a valid thing to dereference on the host side.
pub struct SillObjectHandle {
    _opaque: [u8; 0],
}

/// Borrow the instance behind an object handle without touching its
/// reference count.
unsafe fn instance_ref<'a>(obj: *const SillObjectHandle) -> Option<&'a Instance> {
    if obj.is_null() {
        return None;
    }
    Some(unsafe { &*(obj as *const Instance) })
}

/// Clone the `Arc<Instance>` behind an object handle, leaving the host's
/// hold in place. Used when a window takes a shared hold on a context object.
pub(crate) unsafe fn clone_instance(obj: *const SillObjectHandle) -> Option<Arc<Instance>> {
    if obj.is_null() {
        return None;
    }
    let ptr = obj as *const Instance;
    unsafe { Arc::increment_strong_count(ptr) };
    Some(unsafe { Arc::from_raw(ptr) })
}

// ─── Class registration ──────────────────────────────────────────────

/// Register a class from parallel member tables.
///
/// `member_names` holds `member_count` NUL-terminated UTF-8 names;
/// `method_fns` and `property_fns` are parallel arrays of the same length
/// where exactly one entry per index is non-null. `release_fn`, if non-null,
/// is called once per object of this class, with the object's host
/// back-reference, when that object is destroyed.
///
/// Returns a class handle, or null if the tables are malformed (logged).
/// Release the handle with `sill_host_finalise_class_handle` once no more
/// objects will be created from it.
///
/// # Safety
///
/// `name` must be a valid, NUL-terminated UTF-8 C string. The three arrays
/// must each hold `member_count` readable entries (they may be null only
/// when `member_count` is 0). The trampolines must stay callable for as long
/// as any object of the class is alive.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_create_class(
    name: *const c_char,
    member_count: u32,
    member_names: *const *const c_char,
    method_fns: *const Option<UniformFn>,
    property_fns: *const Option<UniformFn>,
    release_fn: Option<ReleaseFn>,
) -> *mut SillClassHandle {
    let Some(class_name) = (unsafe { read_c_str(name) }) else {
        tracing::error!("sill_host_create_class: null or invalid class name");
        return std::ptr::null_mut();
    };
    if member_count > 0 && (member_names.is_null() || method_fns.is_null() || property_fns.is_null())
    {
        tracing::error!("sill_host_create_class: `{class_name}`: null member table");
        return std::ptr::null_mut();
    }

    let count = member_count as usize;
    let mut names = Vec::with_capacity(count);
    let mut methods = Vec::with_capacity(count);
    let mut properties = Vec::with_capacity(count);
    for i in 0..count {
        let Some(member_name) = (unsafe { read_c_str(*member_names.add(i)) }) else {
            tracing::error!("sill_host_create_class: `{class_name}`: bad name at index {i}");
            return std::ptr::null_mut();
        };
        names.push(member_name);
        methods.push(unsafe { *method_fns.add(i) });
        properties.push(unsafe { *property_fns.add(i) });
    }

    match ClassDef::from_tables(class_name, names, methods, properties, release_fn) {
        Ok(class) => Box::into_raw(Box::new(SillClassHandle { class })),
        Err(e) => {
            tracing::error!("sill_host_create_class: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Drop the registry's hold on a class. Objects already created from it keep
/// it alive; creating new objects from the handle afterwards is invalid.
///
/// # Safety
///
/// `hndl` must be a value returned by `sill_host_create_class` that has not
/// been finalised before, or null (ignored).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_finalise_class_handle(hndl: *mut SillClassHandle) {
    if hndl.is_null() {
        return;
    }
    let handle = unsafe { Box::from_raw(hndl) };
    tracing::debug!(
        "sill_host_finalise_class_handle: released class `{}`",
        handle.class.name()
    );
    drop(handle);
}

// ─── Object lifecycle ────────────────────────────────────────────────

/// Create an object of `class` carrying the opaque `host_ref` token.
///
/// The token is stored and returned verbatim; it is never dereferenced. A
/// null token is legal and means "no host state attached". Returns null if
/// `class` is null or allocation fails.
///
/// # Safety
///
/// `class` must be a live class handle. The host must keep whatever
/// `host_ref` points at alive until the class's release trampoline has run
/// for this object.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_create_object(
    host_ref: *mut c_void,
    class: *const SillClassHandle,
) -> *mut SillObjectHandle {
    if class.is_null() {
        tracing::error!("sill_host_create_object: null class handle");
        return std::ptr::null_mut();
    }
    let class = unsafe { &(*class).class };
    let instance = Instance::new(Arc::clone(class), HostRef::new(host_ref));
    Arc::into_raw(instance) as *mut SillObjectHandle
}

/// The host back-reference stored in an object at creation. Total over live
/// handles: returns exactly the token `sill_host_create_object` received,
/// including null.
///
/// # Safety
///
/// `obj` must be a live object handle, or null (returns null).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_get_host_ref(obj: *const SillObjectHandle) -> *mut c_void {
    match unsafe { instance_ref(obj) } {
        Some(instance) => instance.host_ref().as_ptr(),
        None => std::ptr::null_mut(),
    }
}

/// Release the host's hold on an object. When the last hold is gone
/// (windows can share objects as context), the class's release trampoline
/// fires with the back-reference.
///
/// # Safety
///
/// `obj` must be a value returned by `sill_host_create_object` that has not
/// been released before, or null (ignored).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sill_host_release_object(obj: *mut SillObjectHandle) {
    if obj.is_null() {
        return;
    }
    drop(unsafe { Arc::from_raw(obj as *const Instance) });
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    struct NameTable {
        _owned: Vec<CString>,
        ptrs: Vec<*const c_char>,
    }

    fn name_table(names: &[&str]) -> NameTable {
        let owned: Vec<CString> = names.iter().map(|n| CString::new(*n).unwrap()).collect();
        let ptrs = owned.iter().map(|n| n.as_ptr()).collect();
        NameTable {
            _owned: owned,
            ptrs,
        }
    }

    unsafe extern "C" fn noop_member(_context: *mut c_void, _argv: *mut *mut c_void) {}

    #[test]
    fn test_create_class_and_objects() {
        let class_name = CString::new("Counter").unwrap();
        let names = name_table(&["increment", "value"]);
        let methods: Vec<Option<UniformFn>> = vec![Some(noop_member as UniformFn), None];
        let properties: Vec<Option<UniformFn>> = vec![None, Some(noop_member as UniformFn)];

        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                2,
                names.ptrs.as_ptr(),
                methods.as_ptr(),
                properties.as_ptr(),
                None,
            )
        };
        assert!(!class.is_null());

        // Three distinct tokens map back out unchanged, plus the null token.
        let tokens = [0x10usize, 0x20, 0x30];
        let mut objects = Vec::new();
        for token in tokens {
            let obj = unsafe { sill_host_create_object(token as *mut c_void, class) };
            assert!(!obj.is_null());
            objects.push(obj);
        }
        for (obj, token) in objects.iter().zip(tokens) {
            assert_eq!(unsafe { sill_host_get_host_ref(*obj) } as usize, token);
        }

        let anonymous = unsafe { sill_host_create_object(std::ptr::null_mut(), class) };
        assert!(!anonymous.is_null());
        assert!(unsafe { sill_host_get_host_ref(anonymous) }.is_null());

        for obj in objects {
            unsafe { sill_host_release_object(obj) };
        }
        unsafe { sill_host_release_object(anonymous) };
        unsafe { sill_host_finalise_class_handle(class) };
    }

    #[test]
    fn test_create_class_rejects_bad_tables() {
        let class_name = CString::new("Broken").unwrap();
        let names = name_table(&["both", "neither"]);
        let methods: Vec<Option<UniformFn>> =
            vec![Some(noop_member as UniformFn), None];
        let properties: Vec<Option<UniformFn>> =
            vec![Some(noop_member as UniformFn), None];

        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                2,
                names.ptrs.as_ptr(),
                methods.as_ptr(),
                properties.as_ptr(),
                None,
            )
        };
        assert!(class.is_null(), "both-set and neither-set entries reject");

        let class = unsafe {
            sill_host_create_class(
                std::ptr::null(),
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                None,
            )
        };
        assert!(class.is_null(), "null class name rejects");

        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                2,
                std::ptr::null(),
                methods.as_ptr(),
                properties.as_ptr(),
                None,
            )
        };
        assert!(class.is_null(), "null name array with nonzero count rejects");
    }

    #[test]
    fn test_empty_class_is_fine() {
        let class_name = CString::new("Marker").unwrap();
        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                None,
            )
        };
        assert!(!class.is_null());
        unsafe { sill_host_finalise_class_handle(class) };
    }

    #[test]
    fn test_null_object_boundaries() {
        assert!(unsafe { sill_host_get_host_ref(std::ptr::null()) }.is_null());
        unsafe { sill_host_release_object(std::ptr::null_mut()) };
        unsafe { sill_host_finalise_class_handle(std::ptr::null_mut()) };
        assert!(
            unsafe { sill_host_create_object(0x1 as *mut c_void, std::ptr::null()) }.is_null()
        );
    }

    #[test]
    fn test_release_trampoline_fires_once_per_object() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        static TOKEN_SUM: AtomicUsize = AtomicUsize::new(0);
        unsafe extern "C" fn on_release(host_ref: *mut c_void) {
            RELEASED.fetch_add(1, Ordering::SeqCst);
            TOKEN_SUM.fetch_add(host_ref as usize, Ordering::SeqCst);
        }

        let class_name = CString::new("Tracked").unwrap();
        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                Some(on_release as ReleaseFn),
            )
        };
        assert!(!class.is_null());

        let a = unsafe { sill_host_create_object(1 as *mut c_void, class) };
        let b = unsafe { sill_host_create_object(2 as *mut c_void, class) };

        unsafe { sill_host_release_object(a) };
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);

        unsafe { sill_host_release_object(b) };
        assert_eq!(RELEASED.load(Ordering::SeqCst), 2);
        assert_eq!(TOKEN_SUM.load(Ordering::SeqCst), 3);

        unsafe { sill_host_finalise_class_handle(class) };
    }

    #[test]
    fn test_objects_outlive_finalised_class() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        unsafe extern "C" fn on_release(_host_ref: *mut c_void) {
            RELEASED.fetch_add(1, Ordering::SeqCst);
        }

        let class_name = CString::new("Sticky").unwrap();
        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                Some(on_release as ReleaseFn),
            )
        };
        let obj = unsafe { sill_host_create_object(0x42 as *mut c_void, class) };

        // Registry hold gone; the object still works and still releases.
        unsafe { sill_host_finalise_class_handle(class) };
        assert_eq!(unsafe { sill_host_get_host_ref(obj) } as usize, 0x42);
        assert_eq!(RELEASED.load(Ordering::SeqCst), 0);

        unsafe { sill_host_release_object(obj) };
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shared_hold_defers_release() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        unsafe extern "C" fn on_release(_host_ref: *mut c_void) {
            RELEASED.fetch_add(1, Ordering::SeqCst);
        }

        let class_name = CString::new("Shared").unwrap();
        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                Some(on_release as ReleaseFn),
            )
        };
        let obj = unsafe { sill_host_create_object(0x9 as *mut c_void, class) };

        // A second hold, the way a window takes its context.
        let held = unsafe { clone_instance(obj) }.unwrap();

        unsafe { sill_host_release_object(obj) };
        assert_eq!(RELEASED.load(Ordering::SeqCst), 0, "window still holds it");

        drop(held);
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);

        unsafe { sill_host_finalise_class_handle(class) };
    }

    #[test]
    fn test_property_direction_constants() {
        static LAST_TAG: AtomicI32 = AtomicI32::new(-1);
        unsafe extern "C" fn level(_context: *mut c_void, argv: *mut *mut c_void) {
            unsafe { LAST_TAG.store(*(*argv.add(0) as *const i32), Ordering::SeqCst) };
        }

        let class_name = CString::new("Tagged").unwrap();
        let names = name_table(&["level"]);
        let methods: Vec<Option<UniformFn>> = vec![None];
        let properties: Vec<Option<UniformFn>> = vec![Some(level as UniformFn)];
        let class = unsafe {
            sill_host_create_class(
                class_name.as_ptr(),
                1,
                names.ptrs.as_ptr(),
                methods.as_ptr(),
                properties.as_ptr(),
                None,
            )
        };
        let obj = unsafe { sill_host_create_object(std::ptr::null_mut(), class) };
        let instance = unsafe { instance_ref(obj) }.unwrap();

        let mut slot = 0i32;
        instance
            .read_property("level", (&mut slot) as *mut i32 as *mut c_void)
            .unwrap();
        assert_eq!(LAST_TAG.load(Ordering::SeqCst), SILL_HOST_PROPERTY_READ);

        instance
            .write_property("level", (&mut slot) as *mut i32 as *mut c_void)
            .unwrap();
        assert_eq!(LAST_TAG.load(Ordering::SeqCst), SILL_HOST_PROPERTY_WRITE);

        unsafe { sill_host_release_object(obj) };
        unsafe { sill_host_finalise_class_handle(class) };
    }
}
