//! Principal-guarded map cells.

use crate::error::{Error, Result};
use crate::principal::{self, Principal};
use parking_lot::RwLock;
use std::any::TypeId;
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// How many of the innermost principal scopes [`ProtectedCell`]
/// operations inspect. Deep enough for façade → helper → cell, shallow
/// enough to block laundering through longer chains.
const AUTH_WINDOW: usize = 3;

/// Rule deciding which principals may touch a [`ProtectedCell`].
pub enum AccessPolicy {
    /// Only the exact principal value.
    Instance(Principal),
    /// Any principal minted for the given type.
    Type {
        /// Type id the principal must match.
        id: TypeId,
        /// Short type name, used in denial messages.
        name: &'static str,
    },
    /// Any principal whose short type name matches.
    Name(String),
    /// Custom check; `false` denies.
    Predicate(Box<dyn Fn(&Principal) -> bool + Send + Sync>),
}

impl AccessPolicy {
    /// Policy admitting any principal minted for `T`.
    pub fn of_type<T: 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: short_name(std::any::type_name::<T>()),
        }
    }

    fn allows(&self, principal: &Principal) -> bool {
        match self {
            Self::Instance(allowed) => allowed == principal,
            Self::Type { id, .. } => *id == principal.type_id(),
            Self::Name(name) => principal.type_name() == name,
            Self::Predicate(check) => check(principal),
        }
    }

    fn expected(&self) -> &str {
        match self {
            Self::Instance(allowed) => allowed.type_name(),
            Self::Type { name, .. } => name,
            Self::Name(name) => name,
            Self::Predicate(_) => "predicate accessor",
        }
    }
}

impl std::fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Instance(allowed) => f.debug_tuple("Instance").field(allowed).finish(),
            Self::Type { name, .. } => f.debug_tuple("Type").field(name).finish(),
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

fn short_name(name: &'static str) -> &'static str {
    name.rsplit("::").next().unwrap_or(name)
}

/// A map only authorized principals can touch.
///
/// Every operation checks the bounded window of principal scopes active
/// on the calling thread against the cell's policy before touching the
/// contents. The check is defense in depth against accidental misuse,
/// not a boundary against code that can mint arbitrary principals.
pub struct ProtectedCell<K, V> {
    policy: AccessPolicy,
    map: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord + Clone, V: Clone> ProtectedCell<K, V> {
    /// Creates an empty cell guarded by `policy`.
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            policy,
            map: RwLock::new(BTreeMap::new()),
        }
    }

    fn authorize(&self) -> Result<()> {
        let window = principal::window(AUTH_WINDOW);
        if window.is_empty() {
            return Err(Error::PermissionDenied(
                "no acting principal in scope".into(),
            ));
        }
        if window.iter().any(|principal| self.policy.allows(principal)) {
            return Ok(());
        }
        Err(Error::PermissionDenied(format!(
            "access only allowed from authorized accessor, expected {}",
            self.policy.expected()
        )))
    }

    /// Returns a clone of the value under `key`.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.authorize()?;
        Ok(self.map.read().get(key).cloned())
    }

    /// Inserts or replaces the value under `key`.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        self.authorize()?;
        self.map.write().insert(key, value);
        Ok(())
    }

    /// Removes `key`; absent keys are a no-op.
    pub fn remove<Q>(&self, key: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.authorize()?;
        self.map.write().remove(key);
        Ok(())
    }

    /// Whether `key` is present.
    pub fn contains<Q>(&self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.authorize()?;
        Ok(self.map.read().contains_key(key))
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize> {
        self.authorize()?;
        Ok(self.map.read().len())
    }

    /// Whether the cell holds no entries.
    pub fn is_empty(&self) -> Result<bool> {
        self.authorize()?;
        Ok(self.map.read().is_empty())
    }

    /// Drops every entry.
    pub fn clear(&self) -> Result<()> {
        self.authorize()?;
        self.map.write().clear();
        Ok(())
    }

    /// All keys, in order.
    pub fn keys(&self) -> Result<Vec<K>> {
        self.authorize()?;
        Ok(self.map.read().keys().cloned().collect())
    }

    /// All values, in key order.
    pub fn values(&self) -> Result<Vec<V>> {
        self.authorize()?;
        Ok(self.map.read().values().cloned().collect())
    }

    /// Independent clone of the contents; mutating it does not affect
    /// the cell.
    pub fn deep_copy(&self) -> Result<BTreeMap<K, V>> {
        self.authorize()?;
        Ok(self.map.read().clone())
    }
}
