use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, QrCode, ScanEvent, Stats};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn scan_request(slug: &str, user_agent: &str, visitor: &str, country: &str) -> Request<String> {
    Request::builder()
        .uri(format!("/r/{slug}"))
        .header(http::header::USER_AGENT, user_agent)
        .header(http::header::REFERER, "https://news.example.com")
        .header("x-forwarded-for", visitor)
        .header("x-country", country)
        .body(String::new())
        .unwrap()
}

/// Send one request through a router that keeps its state between calls.
async fn send(app: &mut Router, request: Request<String>) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

async fn create(app: &mut Router, destination: &str) -> QrCode {
    let body = format!(r#"{{"destination_url":"{destination}"}}"#);
    let resp = send(app, json_request("POST", "/api/qrcodes", &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- list ---

#[tokio::test]
async fn list_empty() {
    let resp = app().oneshot(get_request("/api/qrcodes")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let codes: Vec<QrCode> = body_json(resp).await;
    assert!(codes.is_empty());
}

#[tokio::test]
async fn list_is_newest_first() {
    let mut app = app();
    let first = create(&mut app, "https://one.example.com").await;
    let second = create(&mut app, "https://two.example.com").await;

    let resp = send(&mut app, get_request("/api/qrcodes")).await;
    let codes: Vec<QrCode> = body_json(resp).await;
    assert_eq!(
        codes.iter().map(|qr| qr.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
}

// --- create ---

#[tokio::test]
async fn create_returns_201_with_generated_identity() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/qrcodes",
            r#"{"destination_url":"https://example.com","utm_source":"flyer"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let qr: QrCode = body_json(resp).await;
    assert_eq!(qr.id, 1);
    assert_eq!(qr.slug.len(), 8);
    assert_eq!(qr.redirect_url, format!("/r/{}", qr.slug));
    assert_eq!(qr.utm_source.as_deref(), Some("flyer"));
    assert_eq!(qr.total_scans, 0);
}

#[tokio::test]
async fn create_without_destination_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/api/qrcodes", r#"{"name":"No target"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"], "destination_url is required");
}

// --- get ---

#[tokio::test]
async fn get_not_found() {
    let resp = app().oneshot(get_request("/api/qrcodes/99")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"], "QR code not found");
}

#[tokio::test]
async fn get_bad_id_returns_400() {
    let resp = app().oneshot(get_request("/api/qrcodes/abc")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- update ---

#[tokio::test]
async fn update_not_found() {
    let resp = app()
        .oneshot(json_request("PUT", "/api/qrcodes/5", r#"{"name":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_applies_only_present_fields() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com").await;

    let resp = send(
        &mut app,
        json_request("PUT", &format!("/api/qrcodes/{}", qr.id), r#"{"name":"Renamed"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: QrCode = body_json(resp).await;
    assert_eq!(updated.name.as_deref(), Some("Renamed"));
    assert_eq!(updated.destination_url, "https://example.com");
    assert_eq!(updated.slug, qr.slug);
}

#[tokio::test]
async fn update_blank_destination_returns_error_list() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com").await;

    let resp = send(
        &mut app,
        json_request(
            "PUT",
            &format!("/api/qrcodes/{}", qr.id),
            r#"{"destination_url":" "}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["errors"][0], "destination_url must not be empty");
}

// --- delete ---

#[tokio::test]
async fn delete_returns_204_then_404() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com").await;
    let uri = format!("/api/qrcodes/{}", qr.id);

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(String::new())
            .unwrap()
    };

    let resp = send(&mut app, delete()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&mut app, delete()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- scans and stats ---

#[tokio::test]
async fn redirect_records_scans_most_recent_first() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com/landing").await;

    let resp = send(
        &mut app,
        scan_request(&qr.slug, "Mozilla/5.0 (iPhone) Mobile Safari/604.1", "1.1.1.1", "DE"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        resp.headers()[http::header::LOCATION],
        "https://example.com/landing"
    );

    send(
        &mut app,
        scan_request(&qr.slug, "Mozilla/5.0 (X11) Firefox/121.0", "2.2.2.2", "FR"),
    )
    .await;

    let resp = send(&mut app, get_request(&format!("/api/qrcodes/{}/scans", qr.id))).await;
    let scans: Vec<ScanEvent> = body_json(resp).await;
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0].browser, "Firefox");
    assert_eq!(scans[0].device_type, "desktop");
    assert_eq!(scans[1].device_type, "mobile");
    assert_eq!(scans[1].referrer.as_deref(), Some("https://news.example.com"));

    let resp = send(
        &mut app,
        get_request(&format!("/api/qrcodes/{}/scans?limit=1", qr.id)),
    )
    .await;
    let scans: Vec<ScanEvent> = body_json(resp).await;
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].browser, "Firefox");

    let resp = send(&mut app, get_request(&format!("/api/qrcodes/{}", qr.id))).await;
    let fetched: QrCode = body_json(resp).await;
    assert_eq!(fetched.total_scans, 2);
}

#[tokio::test]
async fn scan_ids_stay_unique_after_delete() {
    let mut app = app();
    let a = create(&mut app, "https://a.example.com").await;
    let b = create(&mut app, "https://b.example.com").await;

    send(&mut app, scan_request(&a.slug, "curl/8.0", "1.1.1.1", "DE")).await;
    send(&mut app, scan_request(&a.slug, "curl/8.0", "1.1.1.1", "DE")).await;
    send(&mut app, scan_request(&b.slug, "curl/8.0", "2.2.2.2", "FR")).await;

    let resp = send(
        &mut app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/qrcodes/{}", a.id))
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    send(&mut app, scan_request(&b.slug, "curl/8.0", "2.2.2.2", "FR")).await;
    send(&mut app, scan_request(&b.slug, "curl/8.0", "2.2.2.2", "FR")).await;

    let resp = send(&mut app, get_request(&format!("/api/qrcodes/{}/scans", b.id))).await;
    let scans: Vec<ScanEvent> = body_json(resp).await;
    let mut ids: Vec<u64> = scans.iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), 3);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, vec![3, 4, 5]);
}

#[tokio::test]
async fn redirect_unknown_slug_returns_404() {
    let resp = app().oneshot(get_request("/r/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_aggregate_recorded_scans() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com").await;

    let chrome = "Mozilla/5.0 (X11) Chrome/120.0 Safari/537.36";
    send(&mut app, scan_request(&qr.slug, chrome, "1.1.1.1", "DE")).await;
    send(&mut app, scan_request(&qr.slug, chrome, "1.1.1.1", "DE")).await;
    send(&mut app, scan_request(&qr.slug, "Mozilla/5.0 (iPhone) Mobile", "3.3.3.3", "US")).await;

    let resp = send(&mut app, get_request(&format!("/api/qrcodes/{}/stats", qr.id))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Stats = body_json(resp).await;
    assert_eq!(stats.total_scans, 3);
    assert_eq!(stats.unique_scans, 2);
    assert_eq!(stats.top_countries[0].country, "DE");
    assert_eq!(stats.top_countries[0].scans, 2);
    assert_eq!(stats.device_breakdown["desktop"], 2);
    assert_eq!(stats.device_breakdown["mobile"], 1);
    assert_eq!(stats.browser_breakdown["Chrome"], 2);
    assert_eq!(stats.daily_series.iter().map(|d| d.scans).sum::<u64>(), 3);
}

#[tokio::test]
async fn stats_range_excludes_other_days() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com").await;
    send(&mut app, scan_request(&qr.slug, "curl/8.0", "1.1.1.1", "DE")).await;

    let resp = send(
        &mut app,
        get_request(&format!(
            "/api/qrcodes/{}/stats?startDate=2000-01-01&endDate=2000-01-31",
            qr.id
        )),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Stats = body_json(resp).await;
    assert_eq!(stats.total_scans, 0);
    assert!(stats.daily_series.is_empty());
}

#[tokio::test]
async fn stats_range_includes_both_bounds() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com").await;
    send(&mut app, scan_request(&qr.slug, "curl/8.0", "1.1.1.1", "DE")).await;

    let day = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let resp = send(
        &mut app,
        get_request(&format!(
            "/api/qrcodes/{}/stats?startDate={day}&endDate={day}",
            qr.id
        )),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Stats = body_json(resp).await;
    assert_eq!(stats.total_scans, 1);
    assert_eq!(stats.daily_series.len(), 1);
    assert_eq!(stats.daily_series[0].scans, 1);
}

#[tokio::test]
async fn stats_inverted_range_returns_field_errors() {
    let mut app = app();
    let qr = create(&mut app, "https://example.com").await;

    let resp = send(
        &mut app,
        get_request(&format!(
            "/api/qrcodes/{}/stats?startDate=2024-02-01&endDate=2024-01-01",
            qr.id
        )),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["errors"]["startDate"][0], "must precede endDate");
}
