//! Security module for resource-ownership checks.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use scopecache::security::{ResourceRef, SecurityAudit};
//!
//! let audit = SecurityAudit::new(5, Duration::from_secs(3600));
//! let doc = ResourceRef::new("document", "doc-1", "user-42");
//!
//! assert!(audit.verify_ownership("user-42", &doc).is_ok());
//! assert!(audit.verify_ownership("user-7", &doc).is_err());
//! ```

mod audit;

pub use audit::{AuditEvent, AuditOutcome, ResourceRef, SecurityAudit, SecurityError};
