//! 可观测性模块
//!
//! 提供解析指标、结构化日志和健康检查。

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;
use crate::services::ResponseCache;

// ===== Resolver Metrics =====

/// 解析引擎指标
#[derive(Debug, Default)]
pub struct ResolverMetrics {
    pub resolve_requests_total: AtomicU64,
    pub resolve_latency_ms_sum: AtomicU64,
    pub cache_hits_total: AtomicU64,
    pub cache_misses_total: AtomicU64,
    pub search_requests_total: AtomicU64,
    pub content_fetches_total: AtomicU64,
    pub errors_total: AtomicU64,
}

impl ResolverMetrics {
    /// 记录一次解析
    pub fn record_resolve(&self, duration_ms: u64, cache_hit: bool) {
        self.resolve_requests_total.fetch_add(1, Ordering::Relaxed);
        self.resolve_latency_ms_sum
            .fetch_add(duration_ms, Ordering::Relaxed);
        if cache_hit {
            self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 记录搜索请求
    pub fn record_search(&self) {
        self.search_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录内容获取
    pub fn record_fetch(&self) {
        self.content_fetches_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let resolves = self.resolve_requests_total.load(Ordering::Relaxed);
        format!(
            r#"# HELP resolve_requests_total Total resolve calls
# TYPE resolve_requests_total counter
resolve_requests_total {}
# HELP resolve_latency_seconds Resolve latency in seconds
# TYPE resolve_latency_seconds summary
resolve_latency_seconds_sum {}
resolve_latency_seconds_count {}
# HELP cache_hits_total Resolve calls answered from cache
# TYPE cache_hits_total counter
cache_hits_total {}
# HELP cache_misses_total Resolve calls that went upstream
# TYPE cache_misses_total counter
cache_misses_total {}
# HELP search_requests_total Search collaborator calls
# TYPE search_requests_total counter
search_requests_total {}
# HELP content_fetches_total Content fetch collaborator calls
# TYPE content_fetches_total counter
content_fetches_total {}
# HELP errors_total Failed resolve calls
# TYPE errors_total counter
errors_total {}
"#,
            resolves,
            self.resolve_latency_ms_sum.load(Ordering::Relaxed) as f64 / 1000.0,
            resolves,
            self.cache_hits_total.load(Ordering::Relaxed),
            self.cache_misses_total.load(Ordering::Relaxed),
            self.search_requests_total.load(Ordering::Relaxed),
            self.content_fetches_total.load(Ordering::Relaxed),
            self.errors_total.load(Ordering::Relaxed),
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub cache_entries: Option<usize>,
}

/// 可观测性状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<ResolverMetrics>,
    pub cache: Option<Arc<ResponseCache>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: String, metrics: Arc<ResolverMetrics>) -> Self {
        Self {
            metrics,
            cache: None,
            start_time: Utc::now(),
            version,
        }
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

/// 获取完整健康状态
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        cache_entries: state.cache.as_ref().map(|cache| cache.len()),
    })
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let mut output = state.metrics.gather();
    if let Some(cache) = &state.cache {
        let stats = cache.stats();
        output.push_str(&format!(
            "# HELP cache_entries Entries held by the response cache\n# TYPE cache_entries gauge\ncache_entries {}\n# HELP cache_evictions_total Entries evicted from the response cache\n# TYPE cache_evictions_total counter\ncache_evictions_total {}\n",
            stats.entries, stats.evictions
        ));
    }
    (axum::http::StatusCode::OK, output)
}

/// 版本信息端点
pub async fn version(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(liveness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// `RUST_LOG` overrides the configured level. The returned guard must be
/// held for the lifetime of the process when file logging is enabled.
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dialog-resolver.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.structured {
        registry
            .with(fmt::layer().json().with_target(true))
            .with(file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w)))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_metrics_gather() {
        let metrics = ResolverMetrics::default();
        metrics.record_resolve(120, false);
        metrics.record_resolve(3, true);
        metrics.record_search();
        metrics.record_fetch();
        metrics.record_error();

        let output = metrics.gather();
        assert!(output.contains("resolve_requests_total 2"));
        assert!(output.contains("cache_hits_total 1"));
        assert!(output.contains("cache_misses_total 1"));
        assert!(output.contains("search_requests_total 1"));
        assert!(output.contains("content_fetches_total 1"));
        assert!(output.contains("errors_total 1"));
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let metrics = Arc::new(ResolverMetrics::default());
        metrics.record_search();
        let state = Arc::new(ObservabilityState::new("0.1.0".into(), metrics));
        let app = create_observability_router(state);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("search_requests_total 1"));
    }

    #[tokio::test]
    async fn test_liveness_route() {
        let state = Arc::new(ObservabilityState::new(
            "0.1.0".into(),
            Arc::new(ResolverMetrics::default()),
        ));
        let response = create_observability_router(state)
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
