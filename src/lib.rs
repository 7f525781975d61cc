// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! buildgate - authentication, session management and authorization policy
//! engine for CI servers.
//!
//! For every inbound request carrying raw credentials or an opaque session
//! token, this library decides who the caller is, whether their claimed
//! identity is genuine, whether a prior session is still valid, and whether
//! that identity may perform a protected operation against a project. Every
//! decision, granted or denied, lands in the audit trail.
//!
//! # Core Modules
//!
//! - [`auth`] - pluggable authentication strategies (name-only,
//!   name+password, directory-backed) with wildcard identifiers
//! - [`session`] - token-to-user session stores with fixed or sliding
//!   expiry (volatile in-memory, durable file-backed)
//! - [`permission`] - three-state (allow/deny/inherit) permission objects,
//!   composable by reference
//! - [`authorization`] - resolves an ordered permission list plus defaults
//!   to a final allow/deny decision
//! - [`audit`] - fan-out audit logging with filtered, paged read-back
//! - [`manager`] - the security manager facade the hosting server consumes
//! - [`clock`] - injectable time source for deterministic expiry tests

pub mod audit;
pub mod auth;
pub mod authorization;
pub mod clock;
pub mod errors;
pub mod locks;
pub mod manager;
pub mod permission;
pub mod session;

// Re-export the error type
pub use errors::SecurityError;

// Re-export clock types
pub use clock::{Clock, ManualClock, SystemClock};

// Re-export authentication types
pub use auth::{
    wildcard_matches, AuthenticationStrategy, CredentialRequest, DirectoryAuthentication,
    DirectoryService, UserNameAuthentication, UserPasswordAuthentication, PASSWORD_CREDENTIAL,
    USERNAME_CREDENTIAL,
};

// Re-export session types
pub use session::{
    FileSessionStore, InMemorySessionStore, SessionConfig, SessionExpiry, SessionRecord,
    SessionStore,
};

// Re-export permission and authorization types
pub use authorization::DefaultAuthorization;
pub use permission::{
    Permission, PermissionKind, PermissionReference, PermissionRegistry, Right, RolePermission,
    UserPermission,
};

// Re-export audit types
pub use audit::{
    redact_secrets, AuditFilter, AuditLog, AuditLogger, AuditReader, AuditRecord,
    FileAuditLogger, FileAuditReader, InMemoryAuditLogger, SecurityEvent,
};

// Re-export the security manager facade
pub use manager::{
    CoreSecurityManager, NullSecurityManager, SecurityManager, UserDetails, DISPLAY_NAME_KEY,
};
