//! Identity & role model.
//!
//! - [`has_role`]: the one role predicate everything else builds on
//! - [`Session`]: an explicit login session passed to callers
//! - [`PasswordDigest`] / [`Password`]: credential handling for the desk
//!
//! Roles are checked by set membership, never by rank, so adding a role
//! cannot silently widen an existing rule.

use crate::types::{Principal, Role, UserId};
use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// `true` iff `principal` is present and its role is one of `allowed`.
///
/// An absent (unauthenticated) principal never has any role.
#[must_use]
pub fn has_role(principal: Option<&Principal>, allowed: &[Role]) -> bool {
    principal.is_some_and(|p| allowed.contains(&p.role))
}

/// Opaque bearer token identifying a [`Session`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh random token
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a token received from a client
    #[must_use]
    pub fn from_header(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token text, for the `Authorization` header
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionToken({prefix}…)")
    }
}

/// An authenticated session: created at login, destroyed at logout.
///
/// The principal is captured when the session opens and does not change for
/// its lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token
    pub token: SessionToken,
    /// Who is signed in
    pub principal: Principal,
    /// When the session was opened
    pub issued_at: DateTime<Utc>,
    /// When the session stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still accepted at `now`
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Role check on the session's principal
    #[must_use]
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        has_role(Some(&self.principal), allowed)
    }
}

/// Bearer token → session lookup held by the desk.
#[derive(Clone, Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionToken, Session>,
}

impl SessionRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under its token.
    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.token.clone(), session);
    }

    /// Forget `token`. Returns the session if it was known.
    pub fn remove(&mut self, token: &SessionToken) -> Option<Session> {
        self.sessions.remove(token)
    }

    /// The session for `token`, if it exists and has not expired at `now`.
    #[must_use]
    pub fn active(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<&Session> {
        self.sessions.get(token).filter(|s| s.is_active(now))
    }

    /// End every session of account `user`; returns how many were ended.
    pub fn revoke_account(&mut self, user: UserId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.principal.id != user);
        before - self.sessions.len()
    }

    /// Drop every session expired at `now`; returns how many were dropped.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.is_active(now));
        before - self.sessions.len()
    }

    /// Number of stored sessions, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Plain-text password in transit. Never printed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Wrap a password
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret itself
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

const SALT_LEN: usize = 16;

/// Salted SHA-256 digest of a password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    salt: [u8; SALT_LEN],
    digest: [u8; 32],
}

impl PasswordDigest {
    /// Digest `password` with a fresh random salt.
    #[must_use]
    pub fn generate(password: &Password) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(password, salt)
    }

    /// Digest `password` with a caller-chosen salt.
    #[must_use]
    pub fn with_salt(password: &Password, salt: [u8; SALT_LEN]) -> Self {
        let digest = Self::compute(&salt, password.expose());
        Self { salt, digest }
    }

    /// Constant-time comparison against a candidate password.
    #[must_use]
    pub fn verify(&self, candidate: &Password) -> bool {
        let digest = Self::compute(&self.salt, candidate.expose());
        constant_time_eq(&digest, &self.digest)
    }

    fn compute(salt: &[u8], password: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordDigest(salt={})", hex::encode(self.salt))
    }
}
