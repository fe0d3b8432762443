//! End-to-end tests for the HTTP API with in-process fake backends

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agri_advisor::api::ErrorResponse;
use agri_advisor::config::ServerConfig;
use agri_advisor::prediction::{ModelCache, ModelSource};
use agri_advisor::{
    Advisor, AdvisorError, AppState, ArtifactFetcher, ArtifactLocator, ArtifactProvisioner,
    ChatService, FileModelSource, GenerativeBackend, Part, PricePredictor, RegressionModel,
    TextBridge, TranslationBackend, WeatherProvider, WeatherSnapshot, web,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use tower::ServiceExt;

type Result<T> = agri_advisor::Result<T>;

struct FakeWeather;

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current_conditions(&self, location: &str) -> Result<WeatherSnapshot> {
        match location.trim() {
            "" => Err(AdvisorError::missing_input("City name is required")),
            "Atlantis" => Err(AdvisorError::weather_unavailable(
                "No matching location found.",
            )),
            city => Ok(WeatherSnapshot {
                location: city.to_string(),
                temperature_c: 29.04,
                humidity_pct: 62.0,
                wind_kph: 14.4,
                rain_chance_pct: 75.0,
                condition_text: "Moderate rain".to_string(),
            }),
        }
    }
}

/// Replies with a fixed text and records how often it was called
struct FakeModel {
    reply: String,
    fail: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl FakeModel {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeBackend for FakeModel {
    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = parts.into_iter().find_map(|part| match part {
            Part::Text(text) => Some(text),
            Part::Image { .. } => None,
        });
        *self.last_prompt.lock().unwrap() = prompt;

        if self.fail {
            return Err(AdvisorError::upstream("Gemini", "status 503"));
        }
        Ok(self.reply.clone())
    }
}

struct UnreachableTranslator;

#[async_trait]
impl TranslationBackend for UnreachableTranslator {
    async fn detect(&self, _text: &str) -> Result<String> {
        Err(AdvisorError::upstream("Translate", "connection refused"))
    }

    async fn translate(&self, _text: &str, _target_lang: &str) -> Result<String> {
        Err(AdvisorError::upstream("Translate", "connection refused"))
    }
}

struct FixedModel;

impl ModelSource for FixedModel {
    fn load(&self) -> Result<RegressionModel> {
        Ok(RegressionModel::Linear {
            intercept: 0.37,
            coefficients: vec![0.0, 0.5, 0.5],
        })
    }
}

fn state_with(model: Arc<FakeModel>, cache: Arc<ModelCache>) -> AppState {
    AppState {
        weather: Arc::new(FakeWeather),
        advisor: Arc::new(Advisor::new(model.clone())),
        chat: Arc::new(ChatService::new(
            Arc::new(TextBridge::new(Arc::new(UnreachableTranslator))),
            model,
        )),
        predictor: Arc::new(PricePredictor::new(cache)),
    }
}

fn app(model: Arc<FakeModel>) -> Router {
    let cache = Arc::new(ModelCache::new(Arc::new(FixedModel)));
    web::app(state_with(model, cache), &ServerConfig::default())
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    });
    (status, body)
}

fn error_code(body: Value) -> String {
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    error.code
}

fn multipart_request(fields: &[(&str, Option<&str>, Vec<u8>)]) -> Request<Body> {
    let boundary = "agri-test-boundary";
    let mut body = Vec::new();
    for (name, filename, data) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/analyze-crop")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn leaf_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, Rgb([40, 150, 60]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(FakeModel::replying("")), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_weather_report_from_bare_string_and_object() {
    for payload in [json!("Pune"), json!({"city": "Pune"})] {
        let (status, body) =
            send(app(FakeModel::replying("")), json_request("/weather", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "Current Weather in": "Pune",
                "temperature": "29.0°C",
                "humidity": "62%",
                "windSpeed": "14.4 km/h",
                "rainChance": "75%",
                "forecast": "Moderate rain"
            })
        );
    }
}

#[tokio::test]
async fn test_weather_errors() {
    let (status, body) = send(
        app(FakeModel::replying("")),
        json_request("/weather", json!({"city": "Atlantis"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unable to fetch weather data");
    assert_eq!(error_code(body), "WEATHER_UNAVAILABLE");

    let (status, body) = send(
        app(FakeModel::replying("")),
        json_request("/weather", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(body), "MISSING_INPUT");
}

#[tokio::test]
async fn test_malformed_json_is_invalid_input() {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(FakeModel::replying("")), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_predict_price() {
    let (status, body) = send(
        app(FakeModel::replying("")),
        json_request(
            "/predict",
            json!({"dayOfYear": 100, "minPrice": 10.0, "maxPrice": 20.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predictedPrice": 15.37}));
}

#[tokio::test]
async fn test_predict_price_rejects_bad_input() {
    let (status, body) = send(
        app(FakeModel::replying("")),
        json_request(
            "/predict",
            json!({"dayOfYear": "soon", "minPrice": 10.0, "maxPrice": 20.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_farming_insights() {
    let model = FakeModel::replying("1. Sow after the first rains.");
    let (status, body) = send(
        app(model.clone()),
        json_request(
            "/farming-insights",
            json!({
                "city": "Nagpur",
                "weather_summary": {"temperature": "31.4°C"},
                "language": "Marathi"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"farming_insights": "1. Sow after the first rains."})
    );

    let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Nagpur"));
    assert!(prompt.contains("Marathi"));
}

#[tokio::test]
async fn test_farming_insights_backend_failure_is_bad_gateway() {
    let (status, body) = send(
        app(FakeModel::failing()),
        json_request(
            "/farming-insights",
            json!({"city": "Nagpur", "weather_summary": "hot"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(body), "UPSTREAM_SERVICE_ERROR");
}

#[tokio::test]
async fn test_analyze_crop() {
    let model = FakeModel::replying("Early blight. Remove affected leaves.");
    let request = multipart_request(&[
        ("image", Some("leaf.png"), leaf_png()),
        ("language", None, b"Hindi".to_vec()),
    ]);

    let (status, body) = send(app(model.clone()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"analysis": "Early blight. Remove affected leaves."})
    );
    assert!(
        model
            .last_prompt
            .lock()
            .unwrap()
            .as_deref()
            .unwrap()
            .contains("Hindi")
    );
}

#[tokio::test]
async fn test_analyze_crop_without_image() {
    let model = FakeModel::replying("unused");

    let request = multipart_request(&[("language", None, b"Hindi".to_vec())]);
    let (status, body) = send(app(model.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(body), "MISSING_INPUT");

    let request = multipart_request(&[("image", Some("empty.png"), Vec::new())]);
    let (status, body) = send(app(model.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(body), "MISSING_INPUT");

    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_analyze_crop_with_corrupt_image() {
    let model = FakeModel::replying("unused");
    let request = multipart_request(&[("image", Some("leaf.png"), b"not an image".to_vec())]);

    let (status, body) = send(app(model.clone()), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(body), "ANALYSIS_ERROR");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_chat_survives_translation_outage() {
    let model = FakeModel::replying("Irrigate in the early morning.");
    let (status, body) = send(
        app(model.clone()),
        json_request("/chat", json!({"message": "सिंचाई कब करें?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "Irrigate in the early morning."}));
    assert_eq!(
        model.last_prompt.lock().unwrap().as_deref(),
        Some("सिंचाई कब करें?")
    );
}

#[tokio::test]
async fn test_chat_requires_message() {
    let model = FakeModel::replying("unused");
    let (status, body) = send(app(model.clone()), json_request("/chat", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(body), "MISSING_INPUT");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_predict_weather() {
    let model = FakeModel::replying("  Day 1: light showers.\n");
    let (status, body) = send(
        app(model.clone()),
        json_request("/predict-weather", json!({"city": "Indore"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": "Day 1: light showers."}));
    assert_eq!(
        model.last_prompt.lock().unwrap().as_deref(),
        Some("Predict the weather for Indore for the next 3 days.")
    );
}

#[tokio::test]
async fn test_predict_weather_blank_city() {
    let model = FakeModel::replying("unused");
    let (status, body) = send(
        app(model.clone()),
        json_request("/predict-weather", json!({"city": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(body), "MISSING_INPUT");
    assert_eq!(model.calls(), 0);
}

struct StaticFetcher {
    bytes: Vec<u8>,
    calls: AtomicUsize,
}

#[async_trait]
impl ArtifactFetcher for StaticFetcher {
    async fn fetch(&self, _remote_reference: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bytes.clone())
    }
}

#[tokio::test]
async fn test_startup_provisions_artifact_and_serves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("price.json");

    let artifact = json!({
        "feature_names": ["DayOfYear", "Min Price", "Max Price"],
        "model": {"kind": "linear", "intercept": 0.37, "coefficients": [0.0, 0.5, 0.5]}
    });
    let fetcher = Arc::new(StaticFetcher {
        bytes: artifact.to_string().into_bytes(),
        calls: AtomicUsize::new(0),
    });

    let provisioner = ArtifactProvisioner::new(
        ArtifactLocator {
            remote_reference: "https://example.org/price.json".to_string(),
            local_path: path.clone(),
        },
        fetcher.clone(),
    );
    provisioner.ensure_artifact().await.unwrap();
    provisioner.ensure_artifact().await.unwrap();
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(path.exists());

    let cache = Arc::new(ModelCache::new(Arc::new(FileModelSource::new(&path))));
    cache.get_model().await.unwrap();
    assert!(cache.is_loaded());

    let router = web::app(
        state_with(FakeModel::replying(""), cache),
        &ServerConfig::default(),
    );
    let (status, body) = send(
        router,
        json_request(
            "/predict",
            json!({"dayOfYear": "100", "minPrice": "10", "maxPrice": "20"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predictedPrice": 15.37}));
}
