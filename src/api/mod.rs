//! HTTP handlers for the advisory endpoints

use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::advisory::{Advisor, DEFAULT_LANGUAGE};
use crate::chat::ChatService;
use crate::models::WeatherReport;
use crate::prediction::{PriceInput, PricePredictor};
use crate::weather::WeatherProvider;
use crate::{AdvisorError, Result};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<dyn WeatherProvider>,
    pub advisor: Arc<Advisor>,
    pub chat: Arc<ChatService>,
    pub predictor: Arc<PricePredictor>,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl AdvisorError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            return StatusCode::BAD_REQUEST;
        }
        match self {
            AdvisorError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: self.user_message(),
            code: self.code().as_str().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, reporting malformed bodies as invalid input
fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AdvisorError::invalid_input(rejection.body_text()))
}

/// `/weather` accepts a bare JSON string or an object with a `city` field
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WeatherRequest {
    City(String),
    Lookup { city: Option<String> },
}

impl WeatherRequest {
    fn city(&self) -> &str {
        match self {
            WeatherRequest::City(city) => city,
            WeatherRequest::Lookup { city } => city.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub city: Option<String>,
    #[serde(default)]
    pub weather_summary: Value,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CityRequest {
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsightResponse {
    pub farming_insights: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceResponse {
    #[serde(rename = "predictedPrice")]
    pub predicted_price: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather", post(get_weather))
        .route("/farming-insights", post(farming_insights))
        .route("/analyze-crop", post(analyze_crop))
        .route("/predict", post(predict_price))
        .route("/chat", post(chat))
        .route("/predict-weather", post(predict_weather))
        .with_state(state)
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// POST /weather - current conditions as display strings
async fn get_weather(
    State(state): State<AppState>,
    body: std::result::Result<Json<WeatherRequest>, JsonRejection>,
) -> Result<Json<WeatherReport>> {
    let request = json_body(body)?;
    let snapshot = state.weather.current_conditions(request.city()).await?;
    Ok(Json(snapshot.to_report()))
}

/// POST /farming-insights - advice for a weather summary
async fn farming_insights(
    State(state): State<AppState>,
    body: std::result::Result<Json<InsightRequest>, JsonRejection>,
) -> Result<Json<InsightResponse>> {
    let request = json_body(body)?;
    let city = request.city.as_deref().unwrap_or_default().trim();
    if city.is_empty() {
        return Err(AdvisorError::missing_input("City name is required"));
    }

    let language = request.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);
    let insights = state
        .advisor
        .farming_insight(city, &request.weather_summary, language)
        .await?;

    Ok(Json(InsightResponse {
        farming_insights: insights,
    }))
}

/// POST /analyze-crop - multipart upload with an `image` file and optional `language`
async fn analyze_crop(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>> {
    let mut multipart =
        multipart.map_err(|rejection| AdvisorError::invalid_input(rejection.body_text()))?;

    let mut image = None;
    let mut language = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AdvisorError::invalid_input(format!("malformed upload: {e}")))?
    {
        match field.name() {
            Some("image") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AdvisorError::invalid_input(format!("unreadable upload: {e}")))?;
                debug!("Received image upload of {} bytes", bytes.len());
                image = Some(bytes);
            }
            Some("language") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AdvisorError::invalid_input(format!("unreadable field: {e}")))?;
                language = Some(text);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let image = image.ok_or_else(|| AdvisorError::missing_input("No file uploaded"))?;
    let language = language.as_deref().unwrap_or(DEFAULT_LANGUAGE);

    let analysis = state.advisor.analyze_crop_image(&image, language).await?;
    Ok(Json(AnalysisResponse { analysis }))
}

/// POST /predict - crop price for a day of year and a price range
async fn predict_price(
    State(state): State<AppState>,
    body: std::result::Result<Json<PriceInput>, JsonRejection>,
) -> Result<Json<PriceResponse>> {
    let input = json_body(body)?;
    let predicted_price = state.predictor.predict_input(&input).await?;
    info!("Predicted price {}", predicted_price);
    Ok(Json(PriceResponse { predicted_price }))
}

/// POST /chat - one conversational turn
async fn chat(
    State(state): State<AppState>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let request = json_body(body)?;
    let response = state
        .chat
        .chat(request.message.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(ChatResponse { response }))
}

/// POST /predict-weather - three day outlook in prose
async fn predict_weather(
    State(state): State<AppState>,
    body: std::result::Result<Json<CityRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let request = json_body(body)?;
    let prediction = state
        .advisor
        .weather_narrative(request.city.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(PredictionResponse { prediction }))
}
