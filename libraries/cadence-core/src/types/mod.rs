mod catalog;
mod ids;
mod playlist;
mod track;

pub use catalog::{
    CatalogAlbum, CatalogArtist, CatalogPlaylist, CatalogSong, RadioEndpoint, RadioPage,
    SearchFilter, SearchItem, SearchPage, StreamInfo,
};
pub use ids::{PlaylistId, TrackId};
pub use playlist::{Playlist, PlaylistEntry, PlaylistPreview};
pub use track::Track;
