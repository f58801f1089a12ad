//! The key-value façade.

use crate::cell::{AccessPolicy, ProtectedCell};
use crate::credential::{AccessLevel, Credential, Operation};
use crate::error::{Error, Result};
use crate::principal::Principal;
use crate::registry::CredentialRegistry;
use std::sync::Arc;

type ValueCell = ProtectedCell<String, String>;

/// Key-value store with three namespaces: a private one per caller, a
/// shared read/write one, and a shared one only admins may mutate.
///
/// All backing cells are policy-bound to the `Store` type and never
/// handed out by reference. Each operation resolves the caller through
/// the registry's resolver and checks its credential level before
/// touching a cell.
pub struct Store {
    registry: Arc<CredentialRegistry>,
    principal: Principal,
    cells: Arc<ProtectedCell<String, Arc<ValueCell>>>,
    shared_rw: ValueCell,
    shared_admin: ValueCell,
}

impl Store {
    /// Creates the façade over `registry` and hooks private-cell
    /// creation into its registration fan-out.
    pub fn new(registry: Arc<CredentialRegistry>) -> Self {
        let principal = Principal::new::<Self>();
        let cells: Arc<ProtectedCell<String, Arc<ValueCell>>> =
            Arc::new(ProtectedCell::new(AccessPolicy::of_type::<Self>()));

        // every registration gets a fresh private cell; re-registering
        // discards the previous contents along with the old token
        let hook_cells = cells.clone();
        let hook: Arc<crate::registry::RegisterCallback> = Arc::new(move |credential: &Credential| {
            let cell = Arc::new(ValueCell::new(AccessPolicy::of_type::<Self>()));
            let _scope = principal.enter();
            hook_cells.set(credential.name().to_owned(), cell)
        });
        registry.register_callback(hook);

        Self {
            registry,
            principal,
            cells,
            shared_rw: ValueCell::new(AccessPolicy::of_type::<Self>()),
            shared_admin: ValueCell::new(AccessPolicy::of_type::<Self>()),
        }
    }

    fn caller_cell(&self) -> Result<Arc<ValueCell>> {
        let identity = self.registry.resolver().resolve()?;
        let _scope = self.principal.enter();
        self.cells
            .get(identity.name())?
            .ok_or_else(|| Error::NotRegistered(identity.name().to_owned()))
    }

    fn check(&self, op: Operation) -> Result<()> {
        if self.registry.validate(op) {
            Ok(())
        } else {
            tracing::debug!("{} denied for current caller", op);
            Err(Error::PermissionDenied(format!(
                "caller credential does not permit {}",
                op
            )))
        }
    }

    fn require_admin(&self) -> Result<()> {
        let credential = self
            .registry
            .fetch(Operation::Write)
            .map_err(|_| admin_denied())?;
        if credential.level() == AccessLevel::Admin {
            Ok(())
        } else {
            Err(admin_denied())
        }
    }

    /// Writes `value` under `key` in the caller's private namespace.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let cell = self.caller_cell()?;
        self.check(Operation::Write)?;
        let _scope = self.principal.enter();
        cell.set(key.to_owned(), value.to_owned())
    }

    /// Reads `key` from the caller's private namespace; `None` when
    /// absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let cell = self.caller_cell()?;
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        cell.get(key)
    }

    /// Whether `key` exists in the caller's private namespace.
    pub fn has(&self, key: &str) -> Result<bool> {
        let cell = self.caller_cell()?;
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        cell.contains(key)
    }

    /// Deletes `key` from the caller's private namespace; absent keys
    /// are a no-op.
    pub fn delete(&self, key: &str) -> Result<()> {
        let cell = self.caller_cell()?;
        self.check(Operation::Write)?;
        let _scope = self.principal.enter();
        cell.remove(key)
    }

    /// Clears the caller's private namespace.
    pub fn clear(&self) -> Result<()> {
        let cell = self.caller_cell()?;
        self.check(Operation::Write)?;
        let _scope = self.principal.enter();
        cell.clear()
    }

    /// Keys of the caller's private namespace.
    pub fn keys(&self) -> Result<Vec<String>> {
        let cell = self.caller_cell()?;
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        cell.keys()
    }

    /// Values of the caller's private namespace.
    pub fn values(&self) -> Result<Vec<String>> {
        let cell = self.caller_cell()?;
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        cell.values()
    }

    /// Writes to the shared read/write namespace.
    pub fn shared_set(&self, key: &str, value: &str) -> Result<()> {
        self.check(Operation::Write)?;
        let _scope = self.principal.enter();
        self.shared_rw.set(key.to_owned(), value.to_owned())
    }

    /// Reads from the shared read/write namespace.
    pub fn shared_get(&self, key: &str) -> Result<Option<String>> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_rw.get(key)
    }

    /// Whether `key` exists in the shared read/write namespace.
    pub fn shared_has(&self, key: &str) -> Result<bool> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_rw.contains(key)
    }

    /// Deletes from the shared read/write namespace.
    pub fn shared_delete(&self, key: &str) -> Result<()> {
        self.check(Operation::Write)?;
        let _scope = self.principal.enter();
        self.shared_rw.remove(key)
    }

    /// Clears the shared read/write namespace.
    pub fn shared_clear(&self) -> Result<()> {
        self.check(Operation::Write)?;
        let _scope = self.principal.enter();
        self.shared_rw.clear()
    }

    /// Keys of the shared read/write namespace.
    pub fn shared_keys(&self) -> Result<Vec<String>> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_rw.keys()
    }

    /// Values of the shared read/write namespace.
    pub fn shared_values(&self) -> Result<Vec<String>> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_rw.values()
    }

    /// Writes to the admin namespace. Requires an admin credential.
    pub fn readonly_set(&self, key: &str, value: &str) -> Result<()> {
        self.check(Operation::Write)?;
        self.require_admin()?;
        let _scope = self.principal.enter();
        self.shared_admin.set(key.to_owned(), value.to_owned())
    }

    /// Reads from the admin namespace; any registered reader may call
    /// this.
    pub fn readonly_get(&self, key: &str) -> Result<Option<String>> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_admin.get(key)
    }

    /// Whether `key` exists in the admin namespace.
    pub fn readonly_has(&self, key: &str) -> Result<bool> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_admin.contains(key)
    }

    /// Deletes from the admin namespace. Requires an admin credential.
    pub fn readonly_delete(&self, key: &str) -> Result<()> {
        self.check(Operation::Write)?;
        self.require_admin()?;
        let _scope = self.principal.enter();
        self.shared_admin.remove(key)
    }

    /// Clears the admin namespace. Requires an admin credential.
    pub fn readonly_clear(&self) -> Result<()> {
        self.check(Operation::Write)?;
        self.require_admin()?;
        let _scope = self.principal.enter();
        self.shared_admin.clear()
    }

    /// Keys of the admin namespace.
    pub fn readonly_keys(&self) -> Result<Vec<String>> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_admin.keys()
    }

    /// Values of the admin namespace.
    pub fn readonly_values(&self) -> Result<Vec<String>> {
        self.check(Operation::Read)?;
        let _scope = self.principal.enter();
        self.shared_admin.values()
    }
}

fn admin_denied() -> Error {
    Error::PermissionDenied("admin access required for writes to the read-only namespace".into())
}
