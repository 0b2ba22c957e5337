// ABOUTME: Public library API for the onedown notebook exporter
// ABOUTME: Re-exports core modules for the binary and integration tests

pub mod api;
pub mod auth;
pub mod backoff;
pub mod cli;
pub mod error;
pub mod export;
pub mod media;
pub mod model;
pub mod paginate;
pub mod report;
pub mod transform;
pub mod writer;

pub use error::{Error, Result};
pub use model::{ListPage, MediaReference, MediaStatus, Notebook, Page, Section};
pub use report::ExportReport;
