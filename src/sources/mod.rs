//! Upstream collaborators of the feed pipeline
//!
//! The pipeline only talks to the outside world through the two traits in
//! [`traits`]. Production implementations are [`youtube::YouTubeClient`] for
//! the video provider and [`probe::HttpMediaProbe`] for media metadata.

pub mod probe;
pub mod traits;
pub mod youtube;

pub use probe::HttpMediaProbe;
pub use traits::{MediaProbe, VideoProvider};
pub use youtube::YouTubeClient;
