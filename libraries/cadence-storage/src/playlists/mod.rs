use crate::tracks;
use cadence_core::{
    error::Result, CadenceError, Playlist, PlaylistId, PlaylistPreview, Track, TrackId,
};
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Create new playlist
pub async fn create(pool: &SqlitePool, name: &str) -> Result<Playlist> {
    let result = sqlx::query("INSERT INTO playlists (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(Playlist {
        id: result.last_insert_rowid(),
        name: name.to_string(),
    })
}

/// Delete playlist; entries go with it
pub async fn delete(pool: &SqlitePool, id: PlaylistId) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM playlist_entries WHERE playlist_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CadenceError::PlaylistNotFound(id));
    }

    tx.commit().await?;
    Ok(())
}

async fn entry_count(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<u32> {
    let exists = sqlx::query("SELECT 1 FROM playlists WHERE id = ?")
        .bind(playlist_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(CadenceError::PlaylistNotFound(playlist_id));
    }

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM playlist_entries WHERE playlist_id = ?")
            .bind(playlist_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count as u32)
}

/// Insert a track at `position` (append when `None`)
pub async fn insert_entry(
    pool: &SqlitePool,
    playlist_id: PlaylistId,
    track_id: &TrackId,
    position: Option<u32>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let count = entry_count(&mut tx, playlist_id).await?;
    let position = position.unwrap_or(count);
    if position > count {
        return Err(CadenceError::invalid_input(format!(
            "Position {} out of range for playlist {} with {} entries",
            position, playlist_id, count
        )));
    }

    let song_exists = sqlx::query("SELECT 1 FROM songs WHERE id = ?")
        .bind(track_id)
        .fetch_optional(&mut *tx)
        .await?;
    if song_exists.is_none() {
        return Err(CadenceError::TrackNotFound(track_id.clone()));
    }

    sqlx::query(
        "UPDATE playlist_entries SET position = position + 1 WHERE playlist_id = ? AND position >= ?",
    )
    .bind(playlist_id)
    .bind(i64::from(position))
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO playlist_entries (playlist_id, song_id, position) VALUES (?, ?, ?)")
        .bind(playlist_id)
        .bind(track_id)
        .bind(i64::from(position))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Remove the entry at `position` and shift later entries up
pub async fn remove_entry(pool: &SqlitePool, playlist_id: PlaylistId, position: u32) -> Result<()> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM playlist_entries WHERE playlist_id = ? AND position = ?")
        .bind(playlist_id)
        .bind(i64::from(position))
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CadenceError::not_found(
            "Playlist entry",
            format!("{}@{}", playlist_id, position),
        ));
    }

    sqlx::query(
        "UPDATE playlist_entries SET position = position - 1 WHERE playlist_id = ? AND position > ?",
    )
    .bind(playlist_id)
    .bind(i64::from(position))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Tracks of a playlist in position order
pub async fn tracks(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<Vec<Track>> {
    let rows = sqlx::query(&tracks::select_sql(
        "INNER JOIN playlist_entries pe ON pe.song_id = s.id \
         WHERE pe.playlist_id = ? ORDER BY pe.position",
    ))
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(tracks::from_row).collect()
}

/// All playlists with entry counts, by name
pub async fn previews(pool: &SqlitePool) -> Result<Vec<PlaylistPreview>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.name, COUNT(pe.id) AS track_count
        FROM playlists p
        LEFT JOIN playlist_entries pe ON pe.playlist_id = p.id
        GROUP BY p.id
        ORDER BY p.name COLLATE NOCASE, p.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(PlaylistPreview {
                playlist: Playlist {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                },
                track_count: row.try_get::<i64, _>("track_count")? as u32,
            })
        })
        .collect()
}

/// Create a playlist holding `tracks` at positions `0..n`
pub async fn import(pool: &SqlitePool, name: &str, songs: &[Track]) -> Result<Playlist> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("INSERT INTO playlists (name) VALUES (?)")
        .bind(name)
        .execute(&mut *tx)
        .await?;
    let playlist_id = result.last_insert_rowid();

    for (position, track) in songs.iter().enumerate() {
        tracks::insert(&mut *tx, track).await?;

        sqlx::query(
            "INSERT INTO playlist_entries (playlist_id, song_id, position) VALUES (?, ?, ?)",
        )
        .bind(playlist_id)
        .bind(&track.id)
        .bind(position as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Playlist {
        id: playlist_id,
        name: name.to_string(),
    })
}
