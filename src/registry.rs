//! Credential issuance and validation.

use crate::cell::{AccessPolicy, ProtectedCell};
use crate::credential::{AccessLevel, Credential, Operation};
use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::resolver::CallerResolver;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Callback fired after each successful registration.
///
/// Errors are contained and logged; a callback must not call back into
/// the registry for the same caller, the registry lock is held across
/// the fan-out.
pub type RegisterCallback = dyn Fn(&Credential) -> Result<()> + Send + Sync;

/// Issues and validates caller credentials.
///
/// The credential table is itself a [`ProtectedCell`] bound to the
/// registry's own principal, so only the registry can touch its rows.
/// One row per caller name; re-registering overwrites the row and
/// invalidates the previous token.
pub struct CredentialRegistry {
    table: ProtectedCell<String, Credential>,
    resolver: CallerResolver,
    principal: Principal,
    callbacks: RwLock<Vec<Arc<RegisterCallback>>>,
    // registry-level lock: writers cover the row plus callback fan-out,
    // readers observe registration as a single step
    lock: RwLock<()>,
}

impl CredentialRegistry {
    /// Creates a registry over the given zone roots.
    pub fn new<P: AsRef<Path>>(zone_roots: &[P]) -> Result<Self> {
        let principal = Principal::new::<Self>();
        Ok(Self {
            table: ProtectedCell::new(AccessPolicy::Instance(principal)),
            resolver: CallerResolver::new(zone_roots)?,
            principal,
            callbacks: RwLock::new(Vec::new()),
            lock: RwLock::new(()),
        })
    }

    /// The resolver backing this registry.
    pub fn resolver(&self) -> &CallerResolver {
        &self.resolver
    }

    /// Registers the resolved caller at `level` and returns the issued
    /// credential.
    ///
    /// Admin registration is refused for admin-denied zones. Any prior
    /// credential for the same name is overwritten, its token becomes
    /// invalid.
    pub fn register(&self, level: AccessLevel) -> Result<Credential> {
        let identity = self.resolver.resolve()?;
        if level == AccessLevel::Admin && !zone_may_admin(identity.zone()) {
            return Err(Error::PermissionDenied(format!(
                "zone `{}` may not register at admin level",
                identity.zone()
            )));
        }
        let credential = Credential::issue(&identity, level);
        let _write = self.lock.write();
        {
            let _scope = self.principal.enter();
            self.table
                .set(identity.name().to_owned(), credential.clone())?;
        }
        let callbacks: Vec<_> = self.callbacks.read().clone();
        for callback in callbacks {
            if let Err(err) = callback(&credential) {
                tracing::warn!("register callback failed: {}", err);
            }
        }
        Ok(credential)
    }

    /// True iff the resolved caller holds a credential permitting `op`.
    ///
    /// Never fails and never mutates; every failure collapses to
    /// `false`.
    pub fn validate(&self, op: Operation) -> bool {
        self.lookup(op).is_ok()
    }

    fn lookup(&self, op: Operation) -> Result<Credential> {
        let identity = self.resolver.resolve()?;
        let _read = self.lock.read();
        let _scope = self.principal.enter();
        let credential = self.table.get(identity.name())?.ok_or_else(|| {
            Error::PermissionDenied(format!("no credential for caller `{}`", identity.name()))
        })?;
        if credential.level().permits(op) {
            Ok(credential)
        } else {
            Err(Error::PermissionDenied(format!(
                "credential `{}` does not permit {}",
                identity.name(),
                op
            )))
        }
    }

    /// Validates the resolved caller for `op` and returns the
    /// usage-bumped credential, replacing the stored row.
    pub fn fetch(&self, op: Operation) -> Result<Credential> {
        let identity = self.resolver.resolve()?;
        let _write = self.lock.write();
        let _scope = self.principal.enter();
        let credential = self.table.get(identity.name())?.ok_or_else(|| {
            Error::PermissionDenied(format!("no credential for caller `{}`", identity.name()))
        })?;
        if !credential.level().permits(op) {
            return Err(Error::PermissionDenied(format!(
                "credential `{}` does not permit {}",
                identity.name(),
                op
            )));
        }
        let used = credential.with_access();
        self.table.set(identity.name().to_owned(), used.clone())?;
        Ok(used)
    }

    /// Token of the resolved caller's credential.
    pub fn token_of(&self) -> Result<String> {
        let identity = self.resolver.resolve()?;
        let _read = self.lock.read();
        let _scope = self.principal.enter();
        self.table
            .get(identity.name())?
            .map(|credential| credential.token().to_owned())
            .ok_or_else(|| Error::NotRegistered(identity.name().to_owned()))
    }

    /// Adds `callback` to the post-register fan-out. Idempotent per
    /// callback value.
    pub fn register_callback(&self, callback: Arc<RegisterCallback>) {
        let mut callbacks = self.callbacks.write();
        if !callbacks.iter().any(|known| Arc::ptr_eq(known, &callback)) {
            callbacks.push(callback);
        }
    }

    /// Number of registered names.
    pub fn count(&self) -> usize {
        let _read = self.lock.read();
        let _scope = self.principal.enter();
        self.table.len().unwrap_or(0)
    }

    /// Whether `name` holds a credential.
    pub fn contains(&self, name: &str) -> bool {
        let _read = self.lock.read();
        let _scope = self.principal.enter();
        self.table.contains(name).unwrap_or(false)
    }
}

/// A zone may escalate to admin unless it contains `plugin` or is the
/// `unknown` fallback zone.
fn zone_may_admin(zone: &str) -> bool {
    !(zone.contains("plugin") || zone == "unknown")
}
