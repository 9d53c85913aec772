//! External API clients
//!
//! Every request goes through [`crate::http::RetryPolicy`] and honours the
//! caller's cancellation token.

pub mod coverart;
pub mod lastfm;
pub mod listenbrainz;
pub mod musicbrainz;
pub mod subsonic;

pub use coverart::CoverArtArchive;
pub use lastfm::LastFmClient;
pub use listenbrainz::ListenBrainzClient;
pub use musicbrainz::MusicBrainzClient;
pub use subsonic::SubsonicClient;
