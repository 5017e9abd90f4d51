//! Feed assembly and serialization
//!
//! [`assembler::assemble`] turns listings and enrichment outcomes into an
//! ordered [`crate::models::Feed`]; [`serializer::FeedSerializer`] writes it
//! out as an RSS document.

pub mod assembler;
pub mod serializer;

pub use assembler::{assemble, unzip_outcomes};
pub use serializer::{FeedSerializer, RSS_CONTENT_TYPE};
