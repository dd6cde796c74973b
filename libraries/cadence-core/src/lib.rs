//! Cadence Core
//!
//! Shared building blocks for the Cadence playback core.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Playlist`, `PlaylistEntry`, catalog results
//! - **Collaborator Traits**: `CatalogService` (remote music catalog) and
//!   `LibraryStore` (local library persistence)
//! - **Error Handling**: Unified `CadenceError` and `Result` types
//!
//! Nothing here performs I/O. Concrete collaborators live in
//! `cadence-catalog` (HTTP) and `cadence-storage` (SQLite).
//!
//! # Example
//!
//! ```rust
//! use cadence_core::types::{CatalogSong, Track, TrackId};
//!
//! let song = CatalogSong::new(TrackId::new("dQw4w9WgXcQ"), "Never Gonna Give You Up");
//! let track = Track::from(song);
//!
//! assert_eq!(track.id.as_str(), "dQw4w9WgXcQ");
//! assert!(track.liked_at.is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

pub use error::{CadenceError, Result};
pub use storage::{LibraryChange, LibraryStore, LibrarySubscription};
pub use traits::CatalogService;

pub use types::{
    CatalogAlbum, CatalogArtist, CatalogPlaylist, CatalogSong, Playlist, PlaylistEntry,
    PlaylistId, PlaylistPreview, RadioEndpoint, RadioPage, SearchFilter, SearchItem, SearchPage,
    StreamInfo, Track, TrackId,
};
