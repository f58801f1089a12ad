//! Capability credentials and access levels.

use crate::resolver::CallerIdentity;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Capability level granted to a caller at registration.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AccessLevel {
    /// Read and write everywhere, including the admin namespace.
    Admin,
    /// Read and write.
    ReadWrite,
    /// Write only.
    WriteOnly,
    /// Read only.
    ReadOnly,
}

impl AccessLevel {
    /// Whether this level permits `op`.
    pub fn permits(self, op: Operation) -> bool {
        match (self, op) {
            (AccessLevel::Admin, _) | (AccessLevel::ReadWrite, _) => true,
            (AccessLevel::WriteOnly, Operation::Write) => true,
            (AccessLevel::ReadOnly, Operation::Read) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            AccessLevel::Admin => "admin",
            AccessLevel::ReadWrite => "read_write",
            AccessLevel::WriteOnly => "write_only",
            AccessLevel::ReadOnly => "read_only",
        };
        f.write_str(name)
    }
}

/// The two operation classes a credential gates.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// Observing operations: get, has, keys, values.
    Read,
    /// Mutating operations: set, delete, clear.
    Write,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Operation::Read => "read",
            Operation::Write => "write",
        })
    }
}

const TOKEN_ENTROPY_BYTES: usize = 16;

fn mint_token(name: &str) -> String {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    getrandom::getrandom(&mut bytes).unwrap();
    format!(
        "{}_{}",
        name,
        base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
    )
}

/// An immutable capability bound to a caller name and zone.
///
/// Usage updates never mutate in place; [`Credential::with_access`]
/// returns the bumped copy that replaces the stored row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credential {
    name: String,
    token: String,
    level: AccessLevel,
    zone: String,
    path: PathBuf,
    enabled: bool,
    created_at: SystemTime,
    last_access: SystemTime,
    access_count: u64,
}

impl Credential {
    pub(crate) fn issue(identity: &CallerIdentity, level: AccessLevel) -> Self {
        let now = SystemTime::now();
        Self {
            name: identity.name().to_owned(),
            token: mint_token(identity.name()),
            level,
            zone: identity.zone().to_owned(),
            path: identity.path().to_owned(),
            enabled: false,
            created_at: now,
            last_access: now,
            access_count: 0,
        }
    }

    /// The usage-bumped copy handed out by a successful fetch.
    pub(crate) fn with_access(&self) -> Self {
        let mut credential = self.clone();
        credential.enabled = true;
        credential.last_access = SystemTime::now();
        credential.access_count += 1;
        credential
    }

    /// Caller name the credential is keyed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque token, `name` plus an unpredictable URL-safe suffix.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Level granted at issuance; never changes afterwards.
    pub fn level(&self) -> AccessLevel {
        self.level
    }

    /// Zone the caller registered from.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Source path of the registering call site.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False until the credential has been fetched for an operation.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Issuance time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Time of the most recent fetch.
    pub fn last_access(&self) -> SystemTime {
        self.last_access
    }

    /// Number of successful fetches.
    pub fn access_count(&self) -> u64 {
        self.access_count
    }
}
