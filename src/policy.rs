//! Access policy.
//!
//! A policy decides, per call, whether a principal may exercise a capability
//! on a target. Policies are injected into the store and consulted before
//! any lookup or cipher work. They must be pure: no side effects, no caching
//! of earlier decisions, since the role state they consult may change
//! between calls.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::SecretId;

/// The unit of authorisation. Capabilities are independent: holding `Write`
/// implies nothing about `Delete`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Delete,
    List,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

/// Authenticated identity of the caller, as supplied by an external
/// resolver. The store never authenticates credentials itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// What an operation acts on. Operations addressed by id are checked before
/// the record is loaded, so the policy sees the id rather than a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Path(&'a str),
    Id(&'a SecretId),
    Prefix(&'a str),
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path:{}", path),
            Self::Id(id) => write!(f, "id:{}", id),
            Self::Prefix(prefix) => write!(f, "prefix:{}", prefix),
        }
    }
}

/// Pluggable capability check.
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, principal: &Principal, target: Target<'_>, capability: Capability) -> bool;
}

impl<F> AccessPolicy for F
where
    F: Fn(&Principal, Target<'_>, Capability) -> bool + Send + Sync,
{
    fn allows(&self, principal: &Principal, target: Target<'_>, capability: Capability) -> bool {
        self(principal, target, capability)
    }
}

/// Build a policy from a closure. Passing the closure through here pins
/// its signature so the argument types need no annotations.
pub fn from_fn<F>(check: F) -> F
where
    F: Fn(&Principal, Target<'_>, Capability) -> bool + Send + Sync,
{
    check
}

/// The principal granted `Write` and `Delete` by the reference policy
/// when none is configured.
pub const DEFAULT_PRIVILEGED_PRINCIPAL: &str = "admin";

/// Reference policy: `Read` and `List` for everyone, `Write` and `Delete`
/// only for one designated principal. Targets are ignored.
#[derive(Debug, Clone)]
pub struct PrivilegedPrincipalPolicy {
    privileged: Principal,
}

impl PrivilegedPrincipalPolicy {
    pub fn new(privileged: impl Into<String>) -> Self {
        Self {
            privileged: Principal::new(privileged),
        }
    }

    pub fn privileged(&self) -> &Principal {
        &self.privileged
    }
}

impl Default for PrivilegedPrincipalPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRIVILEGED_PRINCIPAL)
    }
}

impl AccessPolicy for PrivilegedPrincipalPolicy {
    fn allows(&self, principal: &Principal, _target: Target<'_>, capability: Capability) -> bool {
        match capability {
            Capability::Read | Capability::List => true,
            Capability::Write | Capability::Delete => *principal == self.privileged,
        }
    }
}
