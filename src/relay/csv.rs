use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{Error, RelayState};

/// Used when the URL has no final path segment.
const DEFAULT_FILE_NAME: &str = "remote-data.csv";

#[derive(Debug, Deserialize)]
pub(super) struct FetchCsvRequest {
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FetchCsvResponse {
    csv_text: String,
    file_name: String,
}

fn file_name(url: &str) -> String {
    match url.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_FILE_NAME.to_string(),
    }
}

/// Fetches a CSV export from an open data portal on behalf of the frontend.
pub(super) async fn fetch_csv(
    State(state): State<RelayState>,
    Json(request): Json<FetchCsvRequest>,
) -> Result<Json<FetchCsvResponse>, Error> {
    if request.url.is_empty() {
        return Err(Error::CsvUrlRequired);
    }

    if state.csv_app_token.is_empty() {
        return Err(Error::CsvTokenMissing);
    }

    let res = state
        .csv_client
        .get(&request.url)
        .header(header::ACCEPT, "text/csv")
        .header("X-App-Token", &*state.csv_app_token)
        .send()
        .await
        .map_err(Error::CsvRequest)?;

    let status = res.status();

    if status != StatusCode::OK {
        return Err(Error::CsvUpstream {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let csv_text = res.text().await.map_err(Error::CsvRequest)?;

    tracing::info!(url = %request.url, bytes = csv_text.len(), "fetched CSV");

    Ok(Json(FetchCsvResponse {
        csv_text,
        file_name: file_name(&request.url),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::testing::{fake_resolver, Listing};
    use crate::relay::router;
    use crate::relay::testing::{json, post_json};
    use serde_json::json;
    use std::path::Path;
    use wiremock::matchers::{header as has_header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(token: &str) -> RelayState {
        RelayState::for_tests(fake_resolver(
            Listing::Models(vec![]),
            "http://ollama.invalid/v1",
            Listing::Models(vec![]),
            "http://lmstudio.invalid/v1",
        ))
        .with_csv_app_token(token)
    }

    async fn fetch(state: RelayState, url: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = post_json(
            router(state, "*", Path::new("/nonexistent")),
            "/api/csv/fetch",
            json!({ "url": url }),
        )
        .await;

        (status, json(&body))
    }

    #[test]
    fn file_name_is_the_last_segment() {
        assert_eq!(
            file_name("https://data.example.gov/api/views/abcd-1234/rows.csv"),
            "rows.csv"
        );
        assert_eq!(file_name("https://data.example.gov/export/"), DEFAULT_FILE_NAME);
    }

    #[tokio::test]
    async fn fetches_with_token_and_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resource/trees.csv"))
            .and(has_header("accept", "text/csv"))
            .and(has_header("x-app-token", "app-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("species,count\noak,3\n"))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = fetch(
            state("app-token"),
            &format!("{}/resource/trees.csv", server.uri()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["csvText"], "species,count\noak,3\n");
        assert_eq!(body["fileName"], "trees.csv");
    }

    #[tokio::test]
    async fn upstream_status_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (status, body) = fetch(state("app-token"), &format!("{}/missing.csv", server.uri())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Failed to fetch CSV: Not Found");
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let (status, body) = fetch(state("app-token"), "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "URL is required");
    }

    #[tokio::test]
    async fn missing_token_is_a_server_error() {
        let (status, body) = fetch(state(""), "https://data.example.gov/rows.csv").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["detail"],
            "SOCRATA_APP_TOKEN not configured. Please set it in the environment."
        );
    }
}
