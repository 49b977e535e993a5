//! Document generators for a social-media advertising agency.
//!
//! Campaign reports, invoices and contracts are described as renderer-independent
//! [`model::Document`] values by the [`templates`], then exported to PNG or PDF through one
//! of the [`export`] backends.  [`forms`] turns raw form input into validated records and
//! [`history`] remembers what was generated.

pub mod builder;
pub mod charts;
pub mod config;
pub mod elements;
pub mod error;
pub mod export;
pub mod fonts;
pub mod forms;
pub mod history;
pub mod model;
pub mod recommend;
pub mod records;
pub mod richtext;
pub mod session;
pub mod templates;

pub use error::{Error, Result};
