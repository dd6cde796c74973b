//! Tests for the catalog client against a mock server.

use cadence_catalog::{
    resolve_uri, CatalogConfig, CatalogError, HttpCatalog, PageOutcome, SearchPager,
};
use cadence_core::{CadenceError, CatalogService, RadioEndpoint, SearchFilter, TrackId};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn catalog_for(server: &MockServer) -> HttpCatalog {
    HttpCatalog::new(CatalogConfig::new(server.uri())).expect("valid config")
}

// =============================================================================
// Client Creation Tests
// =============================================================================

mod client_creation {
    use super::*;

    #[test]
    fn test_empty_url_rejected() {
        match HttpCatalog::new(CatalogConfig::new("")).unwrap_err() {
            CatalogError::InvalidUrl(msg) => assert!(msg.contains("empty")),
            other => panic!("Expected InvalidUrl error, got {other:?}"),
        }
    }

    #[test]
    fn test_url_without_scheme_rejected() {
        let result = HttpCatalog::new(CatalogConfig::new("catalog.example.com"));
        assert!(matches!(result, Err(CatalogError::InvalidUrl(_))));
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let catalog = HttpCatalog::new(CatalogConfig::new("https://example.com/v1//")).unwrap();
        assert_eq!(catalog.base_url(), "https://example.com/v1/");
    }
}

// =============================================================================
// Search Tests
// =============================================================================

mod search {
    use super::*;

    #[tokio::test]
    async fn test_search_sends_filter_and_continuation() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("query", "daft punk"))
            .and(query_param("filter", "song"))
            .and(query_param("continuation", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"type": "song", "id": "s1", "title": "One More Time", "duration_text": "5:20"},
                    {"type": "song", "id": "s2", "title": "Digital Love"}
                ],
                "continuation": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let page = catalog
            .search("daft punk", SearchFilter::Song, Some("page2"))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(page.continuation.is_none());
        let first = page.items[0].as_song().unwrap();
        assert_eq!(first.duration_text.as_deref(), Some("5:20"));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_network() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"message": "overloaded"})),
            )
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let err = CatalogService::search(&catalog, "x", SearchFilter::Album, None)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_pager_appends_pages_until_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("continuation", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"type": "artist", "id": "a2", "name": "Justice"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"type": "artist", "id": "a1", "name": "Daft Punk"}],
                "continuation": "c1"
            })))
            .mount(&server)
            .await;

        let pager = SearchPager::new(Arc::new(catalog_for(&server).await));
        pager.set_query("french", SearchFilter::Artist).await;

        assert_eq!(pager.load_more().await.unwrap(), PageOutcome::Appended(1));
        assert!(pager.has_more().await);
        assert_eq!(pager.load_more().await.unwrap(), PageOutcome::Appended(1));
        assert!(!pager.has_more().await);
        assert_eq!(pager.load_more().await.unwrap(), PageOutcome::Exhausted);
        assert_eq!(pager.items().await.len(), 2);
    }
}

// =============================================================================
// Song / Queue / Stream Tests
// =============================================================================

mod lookups {
    use super::*;

    #[tokio::test]
    async fn test_unknown_song_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/songs/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let song = catalog.song(&TrackId::new("missing")).await.unwrap();
        assert!(song.is_none());
    }

    #[tokio::test]
    async fn test_stream_info() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/songs/abc/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://cdn.example.com/abc.webm",
                "content_length": 3_145_728,
                "loudness_db": -7.5,
                "mime_type": "audio/webm"
            })))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let info = catalog.stream_info(&TrackId::new("abc")).await.unwrap();

        assert_eq!(info.content_length, Some(3_145_728));
        assert_eq!(info.loudness_db, Some(-7.5));
    }

    #[tokio::test]
    async fn test_missing_stream_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/songs/gone/stream"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let err = CatalogService::stream_info(&catalog, &TrackId::new("gone"))
            .await
            .unwrap_err();

        assert!(matches!(err, CadenceError::NotFound { .. }));
        assert!(!err.is_transient());
    }
}

// =============================================================================
// Radio Tests
// =============================================================================

mod radio {
    use super::*;

    #[tokio::test]
    async fn test_next_posts_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/next"))
            .and(body_partial_json(json!({
                "endpoint": {"video_id": "seed", "playlist_id": null}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "seed", "title": "Seed"},
                    {"id": "r1", "title": "Radio 1"}
                ],
                "continuation": "more"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let page = catalog
            .next(&RadioEndpoint::watch(TrackId::new("seed"), None), None)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.continuation.as_deref(), Some("more"));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_rejected_without_request() {
        let server = MockServer::start().await;
        let catalog = catalog_for(&server).await;

        let endpoint = RadioEndpoint {
            video_id: None,
            playlist_id: None,
            params: None,
        };
        let err = catalog.next(&endpoint, None).await.unwrap_err();

        assert!(matches!(err, CatalogError::InvalidEndpoint));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}

// =============================================================================
// Share Link Tests
// =============================================================================

mod share_links {
    use super::*;

    #[tokio::test]
    async fn test_playlist_link_resolves_queue() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/playlists/PL42/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "a", "title": "A"},
                {"id": "b", "title": "B"}
            ])))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let songs = resolve_uri(&catalog, "https://music.example.com/playlist?list=PL42")
            .await
            .unwrap();

        let ids: Vec<_> = songs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unknown_song_link_resolves_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/songs/zzz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server).await;
        let songs = resolve_uri(&catalog, "https://music.example.com/watch?v=zzz")
            .await
            .unwrap();
        assert!(songs.is_empty());
    }

    #[tokio::test]
    async fn test_link_without_parameters_is_invalid_input() {
        let server = MockServer::start().await;
        let catalog = catalog_for(&server).await;

        let err = resolve_uri(&catalog, "https://music.example.com/")
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::InvalidInput(_)));
    }
}
