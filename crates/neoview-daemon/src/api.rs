//! REST API handlers

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use neoview_core::extract::extract_signal;
use neoview_core::summary::{summarize_block, summarize_segment, summarize_spike_trains};
use neoview_core::{
    classify_segment, Block, BlockResponse, DownSampleFactor, ExtractError, Segment,
    SegmentSummary, SpikeTrainData,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters shared by the recording endpoints
#[derive(Debug, Default, Deserialize)]
pub struct RecordingParams {
    url: Option<String>,
    /// Reader to force instead of detecting one from the extension
    #[serde(rename = "type")]
    io_type: Option<String>,
    segment_id: Option<String>,
    analog_signal_id: Option<String>,
    down_sample_factor: Option<String>,
}

impl RecordingParams {
    fn url(&self) -> ApiResult<&str> {
        non_empty(&self.url).ok_or(ApiError::MissingParameter("url"))
    }

    fn io_type(&self) -> Option<&str> {
        non_empty(&self.io_type)
    }

    fn segment_id(&self) -> ApiResult<i64> {
        required_index("segment_id", self.segment_id.as_deref())
    }

    fn analog_signal_id(&self) -> ApiResult<i64> {
        required_index("analog_signal_id", self.analog_signal_id.as_deref())
    }

    fn down_sample_factor(&self) -> DownSampleFactor {
        DownSampleFactor::parse(self.down_sample_factor.as_deref())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required_index(param: &'static str, raw: Option<&str>) -> ApiResult<i64> {
    let raw = raw.ok_or(ApiError::MissingParameter(param))?;
    raw.trim()
        .parse()
        .map_err(|_| ApiError::invalid(param, format!("not an integer: {:?}", raw)))
}

/// Index into a collection; negative or too-large indices are rejected
fn checked_index(param: &'static str, index: i64, len: usize) -> ApiResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(ApiError::InvalidIndex(param))
}

fn select_segment(block: &Block, segment_id: i64) -> ApiResult<&Segment> {
    let index = checked_index("segment_id", segment_id, block.segments.len())?;
    Ok(&block.segments[index])
}

/// Fetch the recording behind `url` and decode it off the async runtime
async fn load_block(
    state: &Arc<AppState>,
    url: &str,
    io_type: Option<&str>,
) -> ApiResult<(Block, PathBuf)> {
    let file = state.fetcher.fetch(url).await?;

    let decode_state = state.clone();
    let path = file.clone();
    let io_type = io_type.map(str::to_string);
    let block = tokio::task::spawn_blocking(move || {
        decode_state.readers.read_block(&path, io_type.as_deref())
    })
    .await
    .map_err(|e| ApiError::internal(format!("decoder task failed: {}", e)))??;

    debug!(
        file = %file.display(),
        segments = block.segments.len(),
        "Decoded recording"
    );
    Ok((block, file))
}

/// Block metadata with the block-level consistency verdict
pub async fn block_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordingParams>,
) -> ApiResult<Json<BlockResponse>> {
    let url = params.url()?;
    info!(url = %url, io_type = ?params.io_type(), "Block requested");

    let (block, file) = load_block(&state, url, params.io_type()).await?;
    let verdict = state.block_verdict(&block.segments);

    Ok(Json(summarize_block(
        &block,
        &file.to_string_lossy(),
        verdict,
        &state.config.serializer,
    )))
}

/// One segment with its segment-level consistency verdict
pub async fn segment_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordingParams>,
) -> ApiResult<Json<SegmentSummary>> {
    let url = params.url()?;
    let segment_id = params.segment_id()?;

    let (block, _) = load_block(&state, url, params.io_type()).await?;
    let segment = select_segment(&block, segment_id)?;

    Ok(Json(summarize_segment(
        segment,
        classify_segment(segment),
        &state.config.serializer,
    )))
}

/// Sample values of one signal, optionally down-sampled
pub async fn analog_signal_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordingParams>,
) -> ApiResult<Response> {
    let url = params.url()?;
    let segment_id = params.segment_id()?;
    let signal_id = params.analog_signal_id()?;
    let factor = params.down_sample_factor();

    let (block, _) = load_block(&state, url, params.io_type()).await?;
    let segment = select_segment(&block, segment_id)?;
    let signal_index =
        usize::try_from(signal_id).map_err(|_| ApiError::InvalidIndex("analog_signal_id"))?;

    match extract_signal(segment, signal_index, factor) {
        Ok(Some(data)) => Ok(Json(data).into_response()),
        Ok(None) => Ok(Json(serde_json::json!({})).into_response()),
        Err(ExtractError::SignalIndex { .. }) => Err(ApiError::InvalidIndex("analog_signal_id")),
    }
}

/// Spike times of every spike train in a segment, keyed by index
pub async fn spike_train_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordingParams>,
) -> ApiResult<Json<BTreeMap<usize, SpikeTrainData>>> {
    let url = params.url()?;
    let segment_id = params.segment_id()?;

    let (block, _) = load_block(&state, url, params.io_type()).await?;
    let segment = select_segment(&block, segment_id)?;

    Ok(Json(summarize_spike_trains(segment)))
}

/// Liveness check
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::build_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Redirect;
    use axum::routing::get;
    use axum::Router;
    use neoview_core::DownloadCache;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Ten samples per column; column 1 is column 0 scaled by ten
    fn recording() -> String {
        (0..10).map(|i| format!("{}\t{}\n", i, i * 10)).collect()
    }

    async fn spawn_origin() -> String {
        let app = Router::new()
            .route("/data/rec.txt", get(|| async { recording() }))
            .route(
                "/data/rec_about.json",
                get(|| async { r#"{"units": "mV", "sampling_rate": 1000.0}"# }),
            )
            .route("/data/spikes.txt", get(|| async { "0.1 0.5\n0.2 0.3 0.9\n" }))
            .route("/data/File_axon_1.abf", get(|| async { vec![0u8, 159, 146, 150] }))
            .route("/latest", get(|| async { Redirect::temporary("/data/rec.txt") }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn test_app(temp_dir: &TempDir) -> Router {
        let mut config = Config::default();
        config.cache.dir = temp_dir.path().join("cache");
        build_router(AppState::new(config).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Origin that is never contacted; requests must fail validation first
    const UNREACHABLE: &str = "http://127.0.0.1:9/data/rec.txt";

    #[tokio::test]
    async fn test_missing_url() {
        let temp_dir = TempDir::new().unwrap();
        let (status, body) = get_json(test_app(&temp_dir), "/blockdata").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "URL parameter is missing");
        assert_eq!(body["message"], "");

        let (status, _) = get_json(test_app(&temp_dir), "/blockdata?url=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_segment_id() {
        let temp_dir = TempDir::new().unwrap();
        for endpoint in ["segmentdata", "analogsignaldata", "spiketraindata"] {
            let uri = format!("/{}?url={}", endpoint, UNREACHABLE);
            let (status, body) = get_json(test_app(&temp_dir), &uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", endpoint);
            assert_eq!(body["error"], "segment_id parameter is missing");
        }
    }

    #[tokio::test]
    async fn test_invalid_identifiers() {
        let temp_dir = TempDir::new().unwrap();

        let uri = format!("/segmentdata?url={}&segment_id=first", UNREACHABLE);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "segment_id parameter is invalid");

        let uri = format!("/analogsignaldata?url={}&segment_id=0", UNREACHABLE);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "analog_signal_id parameter is missing");

        let (status, body) = get_json(test_app(&temp_dir), "/blockdata?url=no-scheme.txt").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "URL parameter is invalid");
    }

    #[tokio::test]
    async fn test_block_data() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!("/api/blockdata/?url={}/data/rec.txt", origin);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;

        assert_eq!(status, StatusCode::OK);
        let block = &body["block"][0];
        assert!(block["file_name"].as_str().unwrap().ends_with("rec.txt"));
        assert_eq!(block["file_origin"], "rec.txt");
        assert_eq!(block["segments"].as_array().unwrap().len(), 1);
        assert_eq!(block["segments"][0]["analogsignals"].as_array().unwrap().len(), 2);
        // A single segment has nothing to compare against
        assert!(block.get("consistency").is_none());
        assert!(block.get("channels").is_none());
        assert!(block.get("spike_trains").is_none());
    }

    #[tokio::test]
    async fn test_redirect_cached_under_resolved_url() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!("/blockdata?url={}/latest", origin);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;
        assert_eq!(status, StatusCode::OK);

        let resolved = url::Url::parse(&format!("{}/data/rec.txt", origin)).unwrap();
        let expected = temp_dir
            .path()
            .join("cache")
            .join(DownloadCache::directory_key(&resolved))
            .join("rec.txt");
        assert_eq!(body["block"][0]["file_name"], expected.to_string_lossy().as_ref());
        assert!(expected.with_file_name("rec_about.json").is_file());
    }

    #[tokio::test]
    async fn test_segment_data() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!("/segmentdata?url={}/data/rec.txt&segment_id=0", origin);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analogsignals"], serde_json::json!([{}, {}]));
        assert_eq!(body["consistency"], "consistent");
    }

    #[tokio::test]
    async fn test_segment_out_of_range() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        for id in ["5", "-1"] {
            let uri = format!("/segmentdata?url={}/data/rec.txt&segment_id={}", origin, id);
            let (status, body) = get_json(test_app(&temp_dir), &uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "IndexError on segment_id");
        }
    }

    #[tokio::test]
    async fn test_analog_signal_down_sampled() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!(
            "/analogsignaldata?url={}/data/rec.txt&segment_id=0&analog_signal_id=1&down_sample_factor=3",
            origin
        );
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["values"], serde_json::json!([0.0, 30.0, 60.0, 90.0]));
        assert!((body["sampling_period"].as_f64().unwrap() - 0.003).abs() < 1e-12);
        assert_eq!(body["t_start"], 0.0);
        assert!((body["t_stop"].as_f64().unwrap() - 0.01).abs() < 1e-12);
        assert_eq!(body["values_units"], "mV");
        assert_eq!(body["times_dimensionality"], "s");
    }

    #[tokio::test]
    async fn test_analog_signal_bad_factor_and_index() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!(
            "/analogsignaldata?url={}/data/rec.txt&segment_id=0&analog_signal_id=0&down_sample_factor=fast",
            origin
        );
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["values"].as_array().unwrap().len(), 10);

        let uri = format!(
            "/analogsignaldata?url={}/data/rec.txt&segment_id=0&analog_signal_id=2",
            origin
        );
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "IndexError on analog_signal_id");
    }

    #[tokio::test]
    async fn test_spike_train_data_with_forced_reader() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!(
            "/spiketraindata?url={}/data/spikes.txt&segment_id=0&type=AsciiSpikeTrainIO",
            origin
        );
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["0"]["times"], serde_json::json!([0.1, 0.5]));
        assert_eq!(body["1"]["t_stop"], 0.9);
        assert_eq!(body["1"]["units"], "s");
    }

    #[tokio::test]
    async fn test_unknown_reader_type() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!("/blockdata?url={}/data/rec.txt&type=Spike2IO", origin);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "type parameter is invalid");
    }

    #[tokio::test]
    async fn test_unsupported_file_type() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!("/blockdata?url={}/data/File_axon_1.abf", origin);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"], "incorrect file type");
    }

    #[tokio::test]
    async fn test_upstream_not_found() {
        let origin = spawn_origin().await;
        let temp_dir = TempDir::new().unwrap();

        let uri = format!("/blockdata?url={}/data/missing.txt", origin);
        let (status, body) = get_json(test_app(&temp_dir), &uri).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "failed to fetch file");
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let (status, body) = get_json(test_app(&temp_dir), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
