//! Repository traits for asset store operations.

pub mod assets;

pub use assets::{AssetRepo, PayloadStream};
