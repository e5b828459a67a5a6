//! Direct-to-storage uploads and backend API access.
//!
//! The orchestrator requests short-lived write URLs from the backend,
//! performs the PUT transfers with aggregate progress reporting, and calls
//! the finalize endpoints that register the uploaded files as an episode.

pub mod api;
pub mod orchestrator;
pub mod progress;

pub use api::ApiClient;
pub use orchestrator::{UploadFile, Uploader};
pub use progress::ProgressTracker;
