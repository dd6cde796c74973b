/// Track domain type
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CatalogSong, TrackId};

/// A song known to the local library
///
/// Identity (`id`) never changes. Display metadata may be refreshed from the
/// catalog; listening state is updated by playback events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Remote catalog id
    pub id: TrackId,

    /// Song title
    pub title: String,

    /// Artist credit as displayed ("A, B & C")
    pub artists_text: Option<String>,

    /// Duration as reported by the catalog ("3:45", "1:02:10")
    pub duration_text: String,

    /// Thumbnail URL
    pub thumbnail_url: Option<String>,

    /// Lyrics, if fetched
    pub lyrics: Option<String>,

    /// When the user liked the track (epoch millis), `None` if not liked
    pub liked_at: Option<i64>,

    /// Accumulated listening time; never decreases
    pub total_play_time_ms: u64,

    /// Loudness reported by the stream, used for normalisation
    pub loudness_db: Option<f32>,

    /// Expected byte size of the audio stream
    pub content_length: Option<u64>,
}

impl Track {
    /// Create a track with only identity and title set
    pub fn new(id: TrackId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            artists_text: None,
            duration_text: String::new(),
            thumbnail_url: None,
            lyrics: None,
            liked_at: None,
            total_play_time_ms: 0,
            loudness_db: None,
            content_length: None,
        }
    }

    /// Whether the track is liked
    pub fn is_liked(&self) -> bool {
        self.liked_at.is_some()
    }

    /// Return a copy with the like flag flipped
    ///
    /// Liking stamps the current time; unliking clears it.
    #[must_use]
    pub fn toggle_like(&self) -> Self {
        Self {
            liked_at: match self.liked_at {
                Some(_) => None,
                None => Some(Utc::now().timestamp_millis()),
            },
            ..self.clone()
        }
    }

    /// Parsed duration, if `duration_text` is `m:ss` or `h:mm:ss`
    pub fn duration(&self) -> Option<Duration> {
        parse_duration_text(&self.duration_text)
    }

    /// Compact play-time label: minutes under an hour, hours under a day,
    /// days beyond that
    pub fn formatted_total_play_time(&self) -> String {
        let seconds = self.total_play_time_ms / 1000;
        let hours = seconds / 3600;

        match hours {
            0 => format!("{}m", seconds / 60),
            1..=23 => format!("{}h", hours),
            _ => format!("{}d", hours / 24),
        }
    }
}

impl From<CatalogSong> for Track {
    fn from(song: CatalogSong) -> Self {
        Self {
            id: song.id,
            title: song.title,
            artists_text: song.artists_text,
            duration_text: song.duration_text.unwrap_or_default(),
            thumbnail_url: song.thumbnail_url,
            lyrics: None,
            liked_at: None,
            total_play_time_ms: 0,
            loudness_db: None,
            content_length: None,
        }
    }
}

fn parse_duration_text(text: &str) -> Option<Duration> {
    if text.is_empty() {
        return None;
    }

    let mut seconds = 0u64;
    for part in text.split(':') {
        let value: u64 = part.trim().parse().ok()?;
        seconds = seconds * 60 + value;
    }

    Some(Duration::from_secs(seconds))
}
