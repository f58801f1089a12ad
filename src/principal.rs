//! Scoped principal identities.
//!
//! A component mints a [`Principal`] once and enters a scope before
//! touching a [`crate::ProtectedCell`]; the cell inspects a bounded
//! window of the innermost scopes on the current thread.

use smallvec::SmallVec;
use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static SCOPES: RefCell<Vec<Principal>> = RefCell::new(Vec::new());
}

/// Runtime identity of an acting component: a unique instance id plus
/// the type it was minted for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Principal {
    instance: u64,
    type_id: TypeId,
    type_name: &'static str,
}

impl Principal {
    /// Mints a fresh principal for a value of type `T`. Two calls never
    /// compare equal, even for the same `T`.
    pub fn new<T: 'static>() -> Self {
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Short name of the type this principal was minted for.
    pub fn type_name(&self) -> &'static str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    /// Establishes this principal as the acting identity on the current
    /// thread until the guard drops.
    pub fn enter(&self) -> PrincipalScope {
        SCOPES.with(|scopes| scopes.borrow_mut().push(*self));
        PrincipalScope {
            _not_send: PhantomData,
        }
    }
}

/// Pops its principal when dropped. `!Send`, the scope stack is per
/// thread.
pub struct PrincipalScope {
    _not_send: PhantomData<*const ()>,
}

impl Drop for PrincipalScope {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

/// Innermost-first window of at most `k` active principals.
pub(crate) fn window(k: usize) -> SmallVec<[Principal; 3]> {
    SCOPES.with(|scopes| scopes.borrow().iter().rev().take(k).copied().collect())
}
