pub mod page_driver;

#[cfg(test)]
pub(crate) mod fake;

pub use page_driver::{ChromePage, PageDriver};
