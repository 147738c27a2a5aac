//! Confluence page hierarchy reconciliation for cfsync.
//!
//! This crate mirrors a local navigation tree into a Confluence space:
//! - [`ConfluenceClient`]: REST API client with HTTP basic authentication
//! - [`RemoteDirectory`]: one method per remote call, implemented by the client
//! - [`HierarchyResolver`]: decides which ancestors must exist and plans the writes
//! - [`Reconciler`]: executes plans in navigation order, waiting out
//!   eventual consistency after creates
//! - [`AttachmentSynchronizer`]: uploads referenced files whose content changed
//! - [`MockDirectory`]: in-memory remote for tests (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use cfsync_confluence::{Ancestors, ConfluenceClient, PageNode, Reconciler};
//!
//! let client = ConfluenceClient::from_config(
//!     "https://wiki.example.com",
//!     "DOCS",
//!     "user",
//!     "token",
//! );
//!
//! let pages = vec![
//!     PageNode::new("Guide", Ancestors::None, "<p>Guide</p>"),
//!     PageNode::new("Install", Ancestors::nearest_first(["Guide"]), "<p>Install</p>"),
//! ];
//!
//! let report = Reconciler::new(&client, "Documentation").run(&pages);
//! println!("{} created, {} updated", report.created(), report.updated());
//! ```

// Attachment fingerprints
pub mod attachments;
pub use attachments::{AttachmentAction, AttachmentReport, AttachmentSynchronizer};

// API client
mod client;
pub use client::ConfluenceClient;

// Remote directory seam
mod directory;
pub use directory::{AttachmentUpload, PageId, RemoteAttachment, RemoteDirectory};

// Hierarchy resolution
pub mod hierarchy;
pub use hierarchy::{
    Ancestors, HierarchyResolver, NominalParents, PageNode, ParentRef, PlanStep,
    ReconciliationPlan, Stage,
};

// Reconciliation driver
pub mod sync;
pub use sync::{PageError, PageOutcome, PageReport, Reconciler, SyncContext, SyncError, SyncReport};

// Bounded waits
mod wait;
pub use wait::{Poll, RetryPolicy};

// Types (internal, exposed via the client)
mod types;

#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(any(test, feature = "mock"))]
pub use mock::{Call, MockDirectory, MockPage};

// Errors
pub mod error;
pub use error::ConfluenceError;
