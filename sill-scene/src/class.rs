//! Dynamic class registration.
//!
//! Hosts describe their types at runtime as parallel tables of member names
//! and trampolines. [`ClassDef::from_tables`] validates a submission once and
//! freezes it; every instance of the class then shares the same immutable
//! dispatch table.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

use crate::error::SceneError;

/// Uniform trampoline signature shared by every registered member.
///
/// The first argument is the instance's opaque host back-reference, the
/// second an argument vector whose slot layout depends on the member kind:
/// methods receive `[result, arg0, arg1, ..]`, properties receive
/// `[direction_tag, value]` (see [`crate::object`]).
pub type UniformFn = unsafe extern "C" fn(context: *mut c_void, argv: *mut *mut c_void);

/// Called at most once per instance, with its back-reference, after the last
/// holder of the instance is gone. Hosts use it to drop their side of the
/// reference cycle.
pub type ReleaseFn = unsafe extern "C" fn(host_ref: *mut c_void);

/// What a registered member is callable as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Property,
}

/// One named member wired to its trampoline.
#[derive(Clone)]
pub struct ClassMember {
    pub name: String,
    pub kind: MemberKind,
    pub func: UniformFn,
}

/// Immutable class descriptor shared by all of its instances.
pub struct ClassDef {
    name: String,
    members: Vec<ClassMember>,
    by_name: HashMap<String, usize>,
    release: Option<ReleaseFn>,
}

impl ClassDef {
    /// Build a class from parallel registration tables.
    ///
    /// For member `i`, exactly one of `methods[i]` and `properties[i]` must
    /// be populated; the table is rejected outright otherwise, along with
    /// length mismatches and duplicate names. A valid table yields a handle
    /// ready to share between instances.
    pub fn from_tables(
        name: impl Into<String>,
        member_names: Vec<String>,
        methods: Vec<Option<UniformFn>>,
        properties: Vec<Option<UniformFn>>,
        release: Option<ReleaseFn>,
    ) -> Result<Arc<Self>, SceneError> {
        let name = name.into();
        if methods.len() != member_names.len() || properties.len() != member_names.len() {
            return Err(SceneError::ClassTable(format!(
                "`{}`: {} member names but {} method and {} property slots",
                name,
                member_names.len(),
                methods.len(),
                properties.len()
            )));
        }

        let mut members = Vec::with_capacity(member_names.len());
        let mut by_name = HashMap::with_capacity(member_names.len());
        for (index, member_name) in member_names.into_iter().enumerate() {
            let (kind, func) = match (methods[index], properties[index]) {
                (Some(func), None) => (MemberKind::Method, func),
                (None, Some(func)) => (MemberKind::Property, func),
                (Some(_), Some(_)) => {
                    return Err(SceneError::ClassTable(format!(
                        "`{name}`: member `{member_name}` registered as both method and property"
                    )));
                }
                (None, None) => {
                    return Err(SceneError::ClassTable(format!(
                        "`{name}`: member `{member_name}` has no trampoline"
                    )));
                }
            };
            if by_name.insert(member_name.clone(), index).is_some() {
                return Err(SceneError::ClassTable(format!(
                    "`{name}`: duplicate member name `{member_name}`"
                )));
            }
            members.push(ClassMember {
                name: member_name,
                kind,
                func,
            });
        }

        tracing::debug!(
            "registered class `{name}` with {} member(s)",
            members.len()
        );
        Ok(Arc::new(Self {
            name,
            members,
            by_name,
            release,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Member at registration index `index`.
    pub fn member(&self, index: usize) -> Option<&ClassMember> {
        self.members.get(index)
    }

    /// Member by name, together with its registration index.
    pub fn member_named(&self, name: &str) -> Option<(usize, &ClassMember)> {
        let index = *self.by_name.get(name)?;
        Some((index, &self.members[index]))
    }

    /// Name of the member at registration index `index`.
    pub fn member_name(&self, index: usize) -> Option<&str> {
        self.members.get(index).map(|m| m.name.as_str())
    }

    pub fn release_fn(&self) -> Option<ReleaseFn> {
        self.release
    }
}

impl std::fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.members.iter().map(|m| m.name.as_str()).collect();
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("members", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HITS_A: AtomicUsize = AtomicUsize::new(0);
    static HITS_B: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn tramp_a(_context: *mut c_void, _argv: *mut *mut c_void) {
        HITS_A.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn tramp_b(_context: *mut c_void, _argv: *mut *mut c_void) {
        HITS_B.fetch_add(1, Ordering::SeqCst);
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn table_builds_and_indexes_by_name() {
        let class = ClassDef::from_tables(
            "Player",
            names(&["play", "volume"]),
            vec![Some(tramp_a as UniformFn), None],
            vec![None, Some(tramp_b as UniformFn)],
            None,
        )
        .unwrap();

        assert_eq!(class.name(), "Player");
        assert_eq!(class.member_count(), 2);
        assert_eq!(class.member(0).unwrap().kind, MemberKind::Method);
        assert_eq!(class.member(1).unwrap().kind, MemberKind::Property);
        assert_eq!(class.member_name(1), Some("volume"));

        let (index, member) = class.member_named("volume").unwrap();
        assert_eq!(index, 1);
        assert_eq!(member.kind, MemberKind::Property);
        assert!(class.member_named("missing").is_none());
    }

    #[test]
    fn index_maps_to_registered_trampoline() {
        let class = ClassDef::from_tables(
            "Pair",
            names(&["first", "second"]),
            vec![Some(tramp_a as UniformFn), Some(tramp_b as UniformFn)],
            vec![None, None],
            None,
        )
        .unwrap();

        HITS_A.store(0, Ordering::SeqCst);
        HITS_B.store(0, Ordering::SeqCst);
        let member = class.member(1).unwrap();
        unsafe { (member.func)(std::ptr::null_mut(), std::ptr::null_mut()) };
        assert_eq!(HITS_A.load(Ordering::SeqCst), 0);
        assert_eq!(HITS_B.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn member_with_both_slots_is_rejected() {
        let err = ClassDef::from_tables(
            "Bad",
            names(&["x"]),
            vec![Some(tramp_a as UniformFn)],
            vec![Some(tramp_b as UniformFn)],
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both method and property"));
    }

    #[test]
    fn member_with_no_slot_is_rejected() {
        let err = ClassDef::from_tables("Bad", names(&["x"]), vec![None], vec![None], None)
            .unwrap_err();
        assert!(err.to_string().contains("no trampoline"));
    }

    #[test]
    fn mismatched_table_lengths_are_rejected() {
        let err = ClassDef::from_tables(
            "Bad",
            names(&["x", "y"]),
            vec![Some(tramp_a as UniformFn)],
            vec![None],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SceneError::ClassTable(_)));
    }

    #[test]
    fn duplicate_member_names_are_rejected() {
        let err = ClassDef::from_tables(
            "Bad",
            names(&["x", "x"]),
            vec![Some(tramp_a as UniformFn), Some(tramp_b as UniformFn)],
            vec![None, None],
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate member name"));
    }

    #[test]
    fn empty_class_is_valid() {
        let class = ClassDef::from_tables("Marker", vec![], vec![], vec![], None).unwrap();
        assert_eq!(class.member_count(), 0);
        assert!(class.member(0).is_none());
    }
}
