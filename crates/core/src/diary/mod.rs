//! The diary feature: capture and playback pipelines.
//!
//! ```text
//! capture:  catalog -> normalize -> edit -> fold -> POST
//! playback: GET by id -> detect layout -> filter answered -> view
//! ```

pub mod catalog;
pub mod editor;
pub mod fetch;
pub mod model;
pub mod playback;
pub mod session;
pub mod submission;
