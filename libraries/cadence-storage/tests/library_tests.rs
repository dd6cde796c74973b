//! Integration tests for the SQLite library store
//!
//! Tests track and playlist operations including:
//! - Insert-or-ignore track creation and metadata updates
//! - Like toggling, play-time accounting and stream details
//! - Gap-free playlist positions on insert, remove and track deletion
//! - Playlist import and previews
//! - Change notifications


use cadence_core::{CadenceError, LibraryChange, LibraryStore, TrackId};
use test_helpers::*;

async fn playlist_ids(lib: &TestLibrary, playlist_id: i64) -> Vec<String> {
    lib.library
        .playlist_tracks(playlist_id)
        .await
        .expect("Failed to get playlist tracks")
        .into_iter()
        .map(|t| t.id.as_str().to_string())
        .collect()
}

// ============================================================================
// Track Tests
// ============================================================================

#[tokio::test]
async fn test_insert_track_ignores_duplicates() {
    let lib = TestLibrary::new().await;
    let track = test_track("t1", "Original");

    assert!(lib.library.insert_track(&track).await.unwrap());

    let mut renamed = track.clone();
    renamed.title = "Renamed".to_string();
    assert!(!lib.library.insert_track(&renamed).await.unwrap());

    let stored = lib
        .library
        .get_track(&track.id)
        .await
        .unwrap()
        .expect("Track not found");
    assert_eq!(stored.title, "Original");
    assert_eq!(stored.artists_text.as_deref(), Some("Test Artist"));
}

#[tokio::test]
async fn test_update_missing_track_fails() {
    let lib = TestLibrary::new().await;
    let err = lib
        .library
        .update_track(&test_track("ghost", "Ghost"))
        .await
        .unwrap_err();

    assert!(matches!(err, CadenceError::TrackNotFound(_)));
}

#[tokio::test]
async fn test_toggle_like_round_trip() {
    let lib = TestLibrary::new().await;
    let track = test_track("t1", "Song");
    lib.library.insert_track(&track).await.unwrap();

    let liked = lib.library.toggle_like(&track.id).await.unwrap();
    assert!(liked.is_liked());

    let stored = lib.library.get_track(&track.id).await.unwrap().unwrap();
    assert_eq!(stored.liked_at, liked.liked_at);

    let unliked = lib.library.toggle_like(&track.id).await.unwrap();
    assert!(!unliked.is_liked());
}

#[tokio::test]
async fn test_play_time_accumulates() {
    let lib = TestLibrary::new().await;
    let track = test_track("t1", "Song");
    lib.library.insert_track(&track).await.unwrap();

    lib.library.add_play_time(&track.id, 90_000).await.unwrap();
    lib.library.add_play_time(&track.id, 30_000).await.unwrap();

    let stored = lib.library.get_track(&track.id).await.unwrap().unwrap();
    assert_eq!(stored.total_play_time_ms, 120_000);
    assert_eq!(stored.formatted_total_play_time(), "2m");
}

#[tokio::test]
async fn test_stream_details_keep_known_values() {
    let lib = TestLibrary::new().await;
    let track = test_track("t1", "Song");
    lib.library.insert_track(&track).await.unwrap();

    lib.library
        .update_stream_details(&track.id, Some(-6.5), Some(4_000_000))
        .await
        .unwrap();
    lib.library
        .update_stream_details(&track.id, None, None)
        .await
        .unwrap();

    let stored = lib.library.get_track(&track.id).await.unwrap().unwrap();
    assert_eq!(stored.loudness_db, Some(-6.5));
    assert_eq!(stored.content_length, Some(4_000_000));
}

// ============================================================================
// Playlist Tests
// ============================================================================

#[tokio::test]
async fn test_insert_entries_append_and_at_position() {
    let lib = TestLibrary::new().await;
    for id in ["a", "b", "c"] {
        lib.library.insert_track(&test_track(id, id)).await.unwrap();
    }
    let playlist = lib.library.create_playlist("Mix").await.unwrap();

    lib.library
        .insert_playlist_entry(playlist.id, &TrackId::new("a"), None)
        .await
        .unwrap();
    lib.library
        .insert_playlist_entry(playlist.id, &TrackId::new("c"), None)
        .await
        .unwrap();
    lib.library
        .insert_playlist_entry(playlist.id, &TrackId::new("b"), Some(1))
        .await
        .unwrap();

    assert_eq!(playlist_ids(&lib, playlist.id).await, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_insert_entry_past_end_is_rejected() {
    let lib = TestLibrary::new().await;
    lib.library.insert_track(&test_track("a", "A")).await.unwrap();
    let playlist = lib.library.create_playlist("Mix").await.unwrap();

    let err = lib
        .library
        .insert_playlist_entry(playlist.id, &TrackId::new("a"), Some(3))
        .await
        .unwrap_err();
    assert!(matches!(err, CadenceError::InvalidInput(_)));
}

#[tokio::test]
async fn test_insert_entry_into_missing_playlist() {
    let lib = TestLibrary::new().await;
    lib.library.insert_track(&test_track("a", "A")).await.unwrap();

    let err = lib
        .library
        .insert_playlist_entry(999, &TrackId::new("a"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CadenceError::PlaylistNotFound(999)));
}

#[tokio::test]
async fn test_remove_entry_decrements_later_positions() {
    let lib = TestLibrary::new().await;
    let tracks: Vec<_> = ["a", "b", "c", "d"]
        .iter()
        .map(|id| test_track(id, id))
        .collect();
    let playlist = lib.library.import_playlist("Four", &tracks).await.unwrap();

    lib.library
        .remove_playlist_entry(playlist.id, 1)
        .await
        .unwrap();
    assert_eq!(playlist_ids(&lib, playlist.id).await, vec!["a", "c", "d"]);

    // Positions stay contiguous: the new position 1 is "c"
    lib.library
        .remove_playlist_entry(playlist.id, 1)
        .await
        .unwrap();
    assert_eq!(playlist_ids(&lib, playlist.id).await, vec!["a", "d"]);

    let err = lib
        .library
        .remove_playlist_entry(playlist.id, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, CadenceError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_track_purges_memberships() {
    let lib = TestLibrary::new().await;
    let tracks: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|id| test_track(id, id))
        .collect();
    let first = lib.library.import_playlist("First", &tracks).await.unwrap();
    let second = lib
        .library
        .import_playlist("Second", &[tracks[1].clone(), tracks[0].clone(), tracks[1].clone()])
        .await
        .unwrap();

    lib.library.delete_track(&TrackId::new("b")).await.unwrap();

    assert!(lib.library.get_track(&TrackId::new("b")).await.unwrap().is_none());
    assert_eq!(playlist_ids(&lib, first.id).await, vec!["a", "c"]);
    assert_eq!(playlist_ids(&lib, second.id).await, vec!["a"]);

    // Gap-free: appending lands right after the remaining entry
    lib.library
        .insert_playlist_entry(second.id, &TrackId::new("c"), None)
        .await
        .unwrap();
    assert_eq!(playlist_ids(&lib, second.id).await, vec!["a", "c"]);
}

#[tokio::test]
async fn test_import_reuses_existing_tracks() {
    let lib = TestLibrary::new().await;
    let mut liked = test_track("a", "A");
    lib.library.insert_track(&liked).await.unwrap();
    liked = lib.library.toggle_like(&liked.id).await.unwrap();

    let imported = vec![test_track("a", "A (import)"), test_track("b", "B")];
    let playlist = lib.library.import_playlist("Imported", &imported).await.unwrap();

    let tracks = lib.library.playlist_tracks(playlist.id).await.unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].title, "A");
    assert_eq!(tracks[0].liked_at, liked.liked_at);
}

#[tokio::test]
async fn test_playlist_previews_count_entries() {
    let lib = TestLibrary::new().await;
    let tracks: Vec<_> = ["a", "b"].iter().map(|id| test_track(id, id)).collect();

    lib.library.import_playlist("beta", &tracks).await.unwrap();
    lib.library.create_playlist("Alpha").await.unwrap();

    let previews = lib.library.playlist_previews().await.unwrap();
    assert_eq!(previews.len(), 2);
    assert_eq!(previews[0].playlist.name, "Alpha");
    assert_eq!(previews[0].track_count, 0);
    assert_eq!(previews[1].playlist.name, "beta");
    assert_eq!(previews[1].track_count, 2);
}

#[tokio::test]
async fn test_delete_playlist() {
    let lib = TestLibrary::new().await;
    let tracks = vec![test_track("a", "A")];
    let playlist = lib.library.import_playlist("Gone", &tracks).await.unwrap();

    lib.library.delete_playlist(playlist.id).await.unwrap();

    assert!(lib.library.playlist_previews().await.unwrap().is_empty());
    assert!(lib.library.get_track(&TrackId::new("a")).await.unwrap().is_some());

    let err = lib.library.delete_playlist(playlist.id).await.unwrap_err();
    assert!(matches!(err, CadenceError::PlaylistNotFound(_)));
}

// ============================================================================
// Change Notification Tests
// ============================================================================

#[tokio::test]
async fn test_subscription_sees_committed_changes() {
    let lib = TestLibrary::new().await;
    let mut subscription = lib.library.subscribe();

    let track = test_track("a", "A");
    lib.library.insert_track(&track).await.unwrap();
    lib.library.create_playlist("P").await.unwrap();

    assert_eq!(
        subscription.next().await,
        Some(LibraryChange::TrackUpserted(track.id.clone()))
    );
    assert_eq!(subscription.next().await, Some(LibraryChange::PlaylistsChanged));
}

#[tokio::test]
async fn test_failed_mutation_publishes_nothing() {
    let lib = TestLibrary::new().await;
    let mut subscription = lib.library.subscribe();

    assert!(lib.library.delete_playlist(42).await.is_err());
    lib.library.create_playlist("P").await.unwrap();

    // The first notification is the successful create, not the failed delete
    assert_eq!(subscription.next().await, Some(LibraryChange::PlaylistsChanged));
}
