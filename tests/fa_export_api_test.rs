//! Tests for the export API client using mock servers.

use std::path::PathBuf;

use fa_search_bot::api::SearchSource;
use fa_search_bot::api::UserFolder;
use fa_search_bot::api::error::ApiError;
use fa_search_bot::api::fa_export_api::FaExportApi;
use fa_search_bot::submission::Rating;
use fa_search_bot::submission::ResultKind;
use fa_search_bot::submission::SubmissionId;
use httpmock::Method::GET;
use httpmock::MockServer;

/// Loads a test response file from the responses directory.
fn get_response(filename: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/responses");
    path.push(filename);
    std::fs::read_to_string(path).expect("Failed to read response file")
}

#[tokio::test]
async fn test_search_returns_results_newest_first() {
    let server = MockServer::start();
    let api = FaExportApi::new(&server.url(""), 600).unwrap();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/search.json")
            .query_param("q", "dragon")
            .query_param("page", "1")
            .query_param("perpage", "48");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("fa_search_dragon.json"));
    });

    let results = api.search("dragon", 1).await.expect("Failed to search");

    mock.assert();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, SubmissionId(19925704));
    assert_eq!(results[1].id, SubmissionId(19925612));
    assert_eq!(
        results[0].thumbnail_url,
        "https://t.furaffinity.net/19925704@1600-1462660206.jpg"
    );
    assert_eq!(results[0].link(), "https://furaffinity.net/view/19925704/");
}

#[tokio::test]
async fn test_search_server_error_is_upstream_unavailable() {
    let server = MockServer::start();
    let api = FaExportApi::new(&server.url(""), 600).unwrap();

    server.mock(|when, then| {
        when.method(GET).path("/search.json");
        then.status(502).body("Bad Gateway");
    });

    let err = api.search("dragon", 1).await.unwrap_err();

    assert!(matches!(err, ApiError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn test_search_garbage_body_is_malformed() {
    let server = MockServer::start();
    let api = FaExportApi::new(&server.url(""), 600).unwrap();

    server.mock(|when, then| {
        when.method(GET).path("/search.json");
        then.status(200)
            .header("content-type", "application/json")
            .body("<html>maintenance</html>");
    });

    let err = api.search("dragon", 1).await.unwrap_err();

    assert!(err.is_malformed());
}

#[tokio::test]
async fn test_fetch_submission() {
    let server = MockServer::start();
    let api = FaExportApi::new(&server.url(""), 600).unwrap();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/submission/19925704.json");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("fa_submission_19925704.json"));
    });

    let full = api
        .fetch_submission(SubmissionId(19925704))
        .await
        .expect("Failed to fetch submission");

    mock.assert();
    assert_eq!(full.base.id, SubmissionId(19925704));
    assert_eq!(full.base.title, "Pouncing");
    assert_eq!(full.base.author.profile_name, "deer-spangle");
    assert_eq!(full.rating, Rating::General);
    assert!(full.is_image());
    assert_eq!(full.keywords, vec!["deer", "pounce"]);
}

#[tokio::test]
async fn test_fetch_missing_submission_is_not_found() {
    let server = MockServer::start();
    let api = FaExportApi::new(&server.url(""), 600).unwrap();

    server.mock(|when, then| {
        when.method(GET).path("/submission/1.json");
        then.status(404).body("{\"error\": \"not found\"}");
    });

    let err = api.fetch_submission(SubmissionId(1)).await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound { .. }));
}

#[tokio::test]
async fn test_user_favorites_carry_fav_ids() {
    let server = MockServer::start();
    let api = FaExportApi::new(&server.url(""), 600).unwrap();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/user/fender/favorites.json")
            .query_param("full", "1")
            .query_param("page", "2");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("fa_favorites_fender.json"));
    });

    let results = api
        .user_folder("fender", UserFolder::Favorites, 2)
        .await
        .expect("Failed to fetch favorites");

    mock.assert();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, SubmissionId(32052941));
    assert_eq!(
        results[0].kind,
        ResultKind::Favorite {
            fav_id: "1094874541".to_string()
        }
    );
    assert_eq!(results[1].author.profile_name, "zephyr");
}

#[tokio::test]
async fn test_user_gallery_of_unknown_user_is_not_found() {
    let server = MockServer::start();
    let api = FaExportApi::new(&server.url(""), 600).unwrap();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/user/nobody/gallery.json");
        then.status(404).body("{\"error\": \"not found\"}");
    });

    let err = api
        .user_folder("nobody", UserFolder::Gallery, 1)
        .await
        .unwrap_err();
    mock.assert();
    assert!(matches!(err, ApiError::NotFound { .. }));

    let err = api.user_folder("  ", UserFolder::Gallery, 1).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    // Blank names never reach the server.
    mock.assert_hits(1);
}
