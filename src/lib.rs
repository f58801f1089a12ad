//! # Caller-scoped in-process key value store
//!
//! zonekv partitions a process-local key value store between the code
//! modules living inside it, without user identifiers. A caller is
//! whatever its source location says it is; what it may do is whatever
//! the credential issued to that location allows.
//!
//! ## Zones
//! Trust is laid out on the filesystem. A zone is a labeled top-level
//! directory tree (`core`, `engines`, `plugins`, ...); its label is the
//! directory's basename. The [`CallerResolver`] walks the thread's
//! call-site frames innermost-first and matches each frame's source
//! path against the configured zone roots; the first frame under any
//! root yields a [`CallerIdentity`]: the caller's name (the first path
//! segment under the root), its source path, and the zone label. With
//! nested roots the most specific root wins, so `services/auth` shades
//! `services`. A caller can only name itself; there is no way to
//! resolve as someone further out on the stack.
//!
//! Call-site frames come from a compile-time substrate rather than a
//! symbolicated backtrace: the [`callsite!`] macro captures `file!()`
//! and pushes it onto a thread-local stack for the lifetime of a guard.
//!
//! ## Credentials
//! The [`CredentialRegistry`] issues an immutable [`Credential`] per
//! caller name: an unpredictable token (name prefix plus at least 128
//! bits of URL-safe random), an [`AccessLevel`], the zone, and usage
//! statistics. One row per name; registering again overwrites the row,
//! which is also the revocation primitive. Zones whose label contains
//! `plugin`, and the `unknown` fallback zone, can never register at
//! admin level. Credentials never change in place; a fetch stores and
//! returns a bumped copy.
//!
//! ## Protected cells
//! All state lives in [`ProtectedCell`]s, maps that check the calling
//! thread's innermost principal scopes against an [`AccessPolicy`]
//! (instance, type, name or predicate) on every operation. The check
//! window is bounded: an authorized façade may proxy through a helper,
//! but deeper indirection is denied. This layer is defense in depth
//! against accidental misuse, not a boundary against hostile code in
//! the same address space.
//!
//! ## Namespaces
//! The [`Store`] façade owns three kinds of cells and routes every
//! operation after validating the caller's credential:
//!
//! - private: one cell per registered caller, invisible to everyone
//!   else. Created automatically when a credential is issued.
//! - shared read/write (`shared_*`): one cell all registered callers
//!   may read and write.
//! - shared admin (`readonly_*`): one cell all registered callers may
//!   read and only admin credentials may mutate.
//!
//! Everything is in-memory and process-lifetime; dropping the registry
//! drops every credential and cell. Persistence, networking and
//! cross-process access are out of scope.
#![warn(missing_docs)]
mod cell;
mod credential;
mod error;
pub mod frame;
mod principal;
mod registry;
mod resolver;
mod store;

pub use crate::cell::{AccessPolicy, ProtectedCell};
pub use crate::credential::{AccessLevel, Credential, Operation};
pub use crate::error::{Error, Result};
pub use crate::frame::FrameGuard;
pub use crate::principal::{Principal, PrincipalScope};
pub use crate::registry::{CredentialRegistry, RegisterCallback};
pub use crate::resolver::{CallerIdentity, CallerResolver};
pub use crate::store::Store;
