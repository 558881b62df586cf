pub mod cache;
pub mod disk;
pub mod error;
pub mod index;
pub mod manager;
pub mod matcher;
pub mod pipeline;
pub mod queue;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::ArtStatus;
pub use error::ArtError;
pub use manager::{Art, ArtManager};
pub use worker::StatsSnapshot;
