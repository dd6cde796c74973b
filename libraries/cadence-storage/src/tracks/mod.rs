use cadence_core::{error::Result, CadenceError, Track, TrackId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const TRACK_COLUMNS: &str = "s.id, s.title, s.artists_text, s.duration_text, s.thumbnail_url, \
     s.lyrics, s.liked_at, s.total_play_time_ms, s.loudness_db, s.content_length";

pub(crate) fn from_row(row: &SqliteRow) -> Result<Track> {
    Ok(Track {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        artists_text: row.try_get("artists_text")?,
        duration_text: row.try_get("duration_text")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        lyrics: row.try_get("lyrics")?,
        liked_at: row.try_get("liked_at")?,
        total_play_time_ms: row.try_get::<i64, _>("total_play_time_ms")?.max(0) as u64,
        loudness_db: row.try_get::<Option<f64>, _>("loudness_db")?.map(|db| db as f32),
        content_length: row
            .try_get::<Option<i64>, _>("content_length")?
            .map(|len| len.max(0) as u64),
    })
}

pub(crate) fn select_sql(tail: &str) -> String {
    format!("SELECT {TRACK_COLUMNS} FROM songs s {tail}")
}

/// Insert a track unless its id already exists
pub async fn insert<'e, E>(executor: E, track: &Track) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO songs
            (id, title, artists_text, duration_text, thumbnail_url, lyrics,
             liked_at, total_play_time_ms, loudness_db, content_length)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&track.id)
    .bind(&track.title)
    .bind(&track.artists_text)
    .bind(&track.duration_text)
    .bind(&track.thumbnail_url)
    .bind(&track.lyrics)
    .bind(track.liked_at)
    .bind(track.total_play_time_ms as i64)
    .bind(track.loudness_db.map(f64::from))
    .bind(track.content_length.map(|len| len as i64))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Update display metadata; listening state is left alone
pub async fn update(pool: &SqlitePool, track: &Track) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE songs
        SET title = ?, artists_text = ?, duration_text = ?, thumbnail_url = ?, lyrics = ?
        WHERE id = ?
        "#,
    )
    .bind(&track.title)
    .bind(&track.artists_text)
    .bind(&track.duration_text)
    .bind(&track.thumbnail_url)
    .bind(&track.lyrics)
    .bind(&track.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CadenceError::TrackNotFound(track.id.clone()));
    }
    Ok(())
}

/// Get track by ID
pub async fn get_by_id(pool: &SqlitePool, id: &TrackId) -> Result<Option<Track>> {
    let row = sqlx::query(&select_sql("WHERE s.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// All tracks, newest first
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Track>> {
    let rows = sqlx::query(&select_sql("ORDER BY s.rowid DESC"))
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Delete a track and close the gaps it leaves in every playlist
pub async fn delete(pool: &SqlitePool, id: &TrackId) -> Result<()> {
    let mut tx = pool.begin().await?;

    // Highest positions first so earlier shifts don't move later targets
    let memberships = sqlx::query(
        "SELECT playlist_id, position FROM playlist_entries WHERE song_id = ? ORDER BY position DESC",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    for row in &memberships {
        let playlist_id: i64 = row.try_get("playlist_id")?;
        let position: i64 = row.try_get("position")?;

        sqlx::query("DELETE FROM playlist_entries WHERE playlist_id = ? AND position = ?")
            .bind(playlist_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE playlist_entries SET position = position - 1 WHERE playlist_id = ? AND position > ?",
        )
        .bind(playlist_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;
    }

    let result = sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CadenceError::TrackNotFound(id.clone()));
    }

    tx.commit().await?;
    Ok(())
}

/// Flip the like flag
pub async fn toggle_like(pool: &SqlitePool, id: &TrackId) -> Result<Track> {
    let track = get_by_id(pool, id)
        .await?
        .ok_or_else(|| CadenceError::TrackNotFound(id.clone()))?
        .toggle_like();

    sqlx::query("UPDATE songs SET liked_at = ? WHERE id = ?")
        .bind(track.liked_at)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(track)
}

/// Add listened time
pub async fn add_play_time(pool: &SqlitePool, id: &TrackId, played_ms: u64) -> Result<()> {
    let result = sqlx::query(
        "UPDATE songs SET total_play_time_ms = total_play_time_ms + ? WHERE id = ?",
    )
    .bind(played_ms as i64)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CadenceError::TrackNotFound(id.clone()));
    }
    Ok(())
}

/// Record stream details; `None` keeps the stored value
pub async fn update_stream_details(
    pool: &SqlitePool,
    id: &TrackId,
    loudness_db: Option<f32>,
    content_length: Option<u64>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE songs
        SET loudness_db = COALESCE(?, loudness_db),
            content_length = COALESCE(?, content_length)
        WHERE id = ?
        "#,
    )
    .bind(loudness_db.map(f64::from))
    .bind(content_length.map(|len| len as i64))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CadenceError::TrackNotFound(id.clone()));
    }
    Ok(())
}
