use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QrCode {
    pub id: u64,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub destination_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcm_impression_tag: Option<String>,
    pub created_at: String,
    #[serde(rename = "redirectUrl")]
    pub redirect_url: String,
    #[serde(rename = "totalScans")]
    pub total_scans: u64,
}

/// Shared by create and update; create additionally requires `destination_url`.
#[derive(Deserialize, Default)]
pub struct QrCodeFields {
    pub name: Option<String>,
    pub destination_url: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub dcm_impression_tag: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: u64,
    pub scanned_at: String,
    pub device_type: String,
    pub browser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_scans: u64,
    pub unique_scans: u64,
    pub daily_series: Vec<DailyPoint>,
    pub top_countries: Vec<CountryScans>,
    pub device_breakdown: BTreeMap<String, u64>,
    pub browser_breakdown: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub scans: u64,
    pub unique_scans: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CountryScans {
    pub country: String,
    pub scans: u64,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ScansQuery {
    pub limit: Option<usize>,
}

struct Scan {
    qr_id: u64,
    at: DateTime<Utc>,
    visitor: String,
    country: String,
    event: ScanEvent,
}

#[derive(Default)]
pub struct Registry {
    next_id: u64,
    next_scan_id: u64,
    codes: BTreeMap<u64, QrCode>,
    scans: Vec<Scan>,
}

impl Registry {
    fn scan_count(&self, qr_id: u64) -> u64 {
        self.scans.iter().filter(|s| s.qr_id == qr_id).count() as u64
    }

    fn with_total(&self, qr: &QrCode) -> QrCode {
        QrCode {
            total_scans: self.scan_count(qr.id),
            ..qr.clone()
        }
    }
}

pub type Db = Arc<RwLock<Registry>>;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Registry::default()));
    Router::new()
        .route("/api/qrcodes", get(list_qr_codes).post(create_qr_code))
        .route(
            "/api/qrcodes/{id}",
            get(get_qr_code).put(update_qr_code).delete(delete_qr_code),
        )
        .route("/api/qrcodes/{id}/stats", get(get_stats))
        .route("/api/qrcodes/{id}/scans", get(get_scans))
        .route("/r/{slug}", get(follow_redirect))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "QR code not found"})))
}

fn bad_request(body: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(body))
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

async fn list_qr_codes(State(db): State<Db>) -> Json<Vec<QrCode>> {
    let registry = db.read().await;
    Json(
        registry
            .codes
            .values()
            .rev()
            .map(|qr| registry.with_total(qr))
            .collect(),
    )
}

async fn create_qr_code(
    State(db): State<Db>,
    Json(input): Json<QrCodeFields>,
) -> ApiResult<(StatusCode, Json<QrCode>)> {
    if is_blank(input.destination_url.as_deref()) {
        return Err(bad_request(json!({"error": "destination_url is required"})));
    }

    let mut registry = db.write().await;
    registry.next_id += 1;
    let slug = Uuid::new_v4().simple().to_string()[..8].to_string();
    let qr = QrCode {
        id: registry.next_id,
        redirect_url: format!("/r/{slug}"),
        slug,
        name: input.name,
        destination_url: input.destination_url.unwrap_or_default(),
        utm_source: input.utm_source,
        utm_medium: input.utm_medium,
        utm_campaign: input.utm_campaign,
        utm_term: input.utm_term,
        utm_content: input.utm_content,
        dcm_impression_tag: input.dcm_impression_tag,
        created_at: Utc::now().to_rfc3339(),
        total_scans: 0,
    };
    registry.codes.insert(qr.id, qr.clone());
    tracing::info!(id = qr.id, slug = %qr.slug, "created QR code");
    Ok((StatusCode::CREATED, Json(qr)))
}

async fn get_qr_code(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult<Json<QrCode>> {
    let registry = db.read().await;
    registry
        .codes
        .get(&id)
        .map(|qr| Json(registry.with_total(qr)))
        .ok_or_else(not_found)
}

async fn update_qr_code(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<QrCodeFields>,
) -> ApiResult<Json<QrCode>> {
    if input.destination_url.is_some() && is_blank(input.destination_url.as_deref()) {
        return Err(bad_request(json!({"errors": ["destination_url must not be empty"]})));
    }

    let mut registry = db.write().await;
    let qr = registry.codes.get_mut(&id).ok_or_else(not_found)?;
    let QrCodeFields {
        name,
        destination_url,
        utm_source,
        utm_medium,
        utm_campaign,
        utm_term,
        utm_content,
        dcm_impression_tag,
    } = input;
    let fields = [
        (&mut qr.name, name),
        (&mut qr.utm_source, utm_source),
        (&mut qr.utm_medium, utm_medium),
        (&mut qr.utm_campaign, utm_campaign),
        (&mut qr.utm_term, utm_term),
        (&mut qr.utm_content, utm_content),
        (&mut qr.dcm_impression_tag, dcm_impression_tag),
    ];
    for (slot, value) in fields {
        if value.is_some() {
            *slot = value;
        }
    }
    if let Some(destination_url) = destination_url {
        qr.destination_url = destination_url;
    }
    let qr = qr.clone();
    Ok(Json(registry.with_total(&qr)))
}

async fn delete_qr_code(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult<StatusCode> {
    let mut registry = db.write().await;
    registry.codes.remove(&id).ok_or_else(not_found)?;
    registry.scans.retain(|s| s.qr_id != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_stats(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Stats>> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(bad_request(
                json!({"errors": {"startDate": ["must precede endDate"]}}),
            ));
        }
    }

    let registry = db.read().await;
    if !registry.codes.contains_key(&id) {
        return Err(not_found());
    }

    let in_range = |date: NaiveDate| {
        query.start_date.map_or(true, |start| date >= start)
            && query.end_date.map_or(true, |end| date <= end)
    };
    let scans: Vec<&Scan> = registry
        .scans
        .iter()
        .filter(|s| s.qr_id == id && in_range(s.at.date_naive()))
        .collect();

    let mut daily: BTreeMap<NaiveDate, (u64, HashSet<&str>)> = BTreeMap::new();
    let mut countries: HashMap<&str, u64> = HashMap::new();
    let mut device_breakdown: BTreeMap<String, u64> = BTreeMap::new();
    let mut browser_breakdown: BTreeMap<String, u64> = BTreeMap::new();
    for scan in &scans {
        let day = daily.entry(scan.at.date_naive()).or_default();
        day.0 += 1;
        day.1.insert(scan.visitor.as_str());
        *countries.entry(scan.country.as_str()).or_default() += 1;
        *device_breakdown.entry(scan.event.device_type.clone()).or_default() += 1;
        *browser_breakdown.entry(scan.event.browser.clone()).or_default() += 1;
    }

    let mut top_countries: Vec<CountryScans> = countries
        .into_iter()
        .map(|(country, scans)| CountryScans {
            country: country.to_string(),
            scans,
        })
        .collect();
    top_countries.sort_by(|a, b| b.scans.cmp(&a.scans).then_with(|| a.country.cmp(&b.country)));

    let unique: HashSet<&str> = scans.iter().map(|s| s.visitor.as_str()).collect();
    Ok(Json(Stats {
        total_scans: scans.len() as u64,
        unique_scans: unique.len() as u64,
        daily_series: daily
            .into_iter()
            .map(|(date, (scans, visitors))| DailyPoint {
                date,
                scans,
                unique_scans: visitors.len() as u64,
            })
            .collect(),
        top_countries,
        device_breakdown,
        browser_breakdown,
    }))
}

async fn get_scans(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(query): Query<ScansQuery>,
) -> ApiResult<Json<Vec<ScanEvent>>> {
    let registry = db.read().await;
    if !registry.codes.contains_key(&id) {
        return Err(not_found());
    }
    let limit = query.limit.unwrap_or(usize::MAX);
    Ok(Json(
        registry
            .scans
            .iter()
            .rev()
            .filter(|s| s.qr_id == id)
            .take(limit)
            .map(|s| s.event.clone())
            .collect(),
    ))
}

async fn follow_redirect(
    State(db): State<Db>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Redirect> {
    let mut registry = db.write().await;
    let (qr_id, destination) = registry
        .codes
        .values()
        .find(|qr| qr.slug == slug)
        .map(|qr| (qr.id, qr.destination_url.clone()))
        .ok_or_else(not_found)?;

    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let user_agent = text(header::USER_AGENT.as_str()).unwrap_or_default();
    let at = Utc::now();
    registry.next_scan_id += 1;
    let scan_id = registry.next_scan_id;
    registry.scans.push(Scan {
        qr_id,
        at,
        visitor: text("x-forwarded-for").unwrap_or_else(|| "unknown".to_string()),
        country: text("x-country").unwrap_or_else(|| "Unknown".to_string()),
        event: ScanEvent {
            id: scan_id,
            scanned_at: at.to_rfc3339(),
            device_type: device_type(&user_agent).to_string(),
            browser: browser(&user_agent).to_string(),
            referrer: text(header::REFERER.as_str()),
        },
    });
    Ok(Redirect::temporary(&destination))
}

fn device_type(user_agent: &str) -> &'static str {
    if user_agent.contains("iPad") || user_agent.contains("Tablet") {
        "tablet"
    } else if ["Mobile", "Android", "iPhone"]
        .iter()
        .any(|m| user_agent.contains(m))
    {
        "mobile"
    } else {
        "desktop"
    }
}

fn browser(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg/") {
        "Edge"
    } else if user_agent.contains("Chrome/") {
        "Chrome"
    } else if user_agent.contains("Firefox/") {
        "Firefox"
    } else if user_agent.contains("Safari/") {
        "Safari"
    } else {
        "Other"
    }
}
