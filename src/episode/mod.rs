//! Episode domain types.
//!
//! `EpisodeDraft` is the form-level aggregate the user edits before
//! publishing; `entities` holds the server-owned records the pipeline reads.

pub mod draft;
pub mod entities;

pub use draft::{DraftPatch, EpisodeDraft, EpisodeStatus};
pub use entities::{Album, Episode};
