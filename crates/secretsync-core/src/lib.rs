pub mod apply;
pub mod bws;
pub mod config;
pub mod envfile;
pub mod error;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod plan;
pub mod reference;
pub mod registry;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Result, SyncError};
