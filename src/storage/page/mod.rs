//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - Page bytes plus dirty owner and before-image
//! - [`PageRef`] - Shared handle the buffer pool hands out
//! - [`PageHeader`] - Metadata at the start of every heap page
//! - [`PageType`] - Discriminator for page formats

#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use page::{Page, PageRef};
pub use page_header::{PageHeader, PageType};
