//! Google Drive access for the validation service.
//!
//! Three concerns live here, each behind a narrow seam:
//!
//! - [`locator`]: turning a sharing URL into an opaque [`locator::FileId`];
//! - [`auth`]: the OAuth2 credential lifecycle (load → validate → refresh →
//!   interactive consent), serialized behind one manager;
//! - [`fetcher`]: the [`fetcher::DriveFetcher`] capability trait
//!   (`get_metadata` + `download`) so callers never depend on the concrete
//!   provider client.

pub mod auth;
pub mod error;
pub mod fetcher;
pub mod locator;
pub mod token;

pub use auth::{AuthorizedClient, ConsentFlow, DriveAuthManager, LocalServerConsent, DRIVE_SCOPE};
pub use error::DriveError;
pub use fetcher::{DriveFetcher, GoogleDriveFetcher};
pub use locator::{resolve, FileId};
pub use token::{StoredCredential, TokenStore};
