// SPDX-License-Identifier: Apache-2.0

use crate::*;

const METRIC_SUBSYSTEM: &str = "backend";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

#[derive(Default)]
pub(crate) struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
    sqlite_latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(latency.as_nanos() as u64);
    }

    pub(crate) async fn observe_sqlite_query(&self, query_type: &str, latency: Duration) {
        let mut q = self.sqlite_latency_ns.lock().await;
        q.entry(query_type.to_string())
            .or_insert_with(Vec::new)
            .push(latency.as_nanos() as u64);
    }

    pub(crate) async fn render(&self) -> String {
        let mut body = String::new();
        let counts = self.counts.lock().await.clone();
        for ((route, status), count) in counts {
            body.push_str(&format!(
                "mldegrees_http_requests_total{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",route=\"{route}\",status=\"{status}\"}} {count}\n"
            ));
        }
        let req_lat = self.latency_ns.lock().await.clone();
        for (route, vals) in req_lat {
            body.push_str(&format!(
                "mldegrees_http_request_latency_p95_seconds{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",route=\"{route}\"}} {:.6}\n",
                percentile_ns(&vals, 0.95) as f64 / 1_000_000_000.0
            ));
        }
        let sql_lat = self.sqlite_latency_ns.lock().await.clone();
        for (query_type, vals) in sql_lat {
            body.push_str(&format!(
                "mldegrees_sqlite_query_latency_p95_seconds{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",query_type=\"{query_type}\"}} {:.6}\n",
                percentile_ns(&vals, 0.95) as f64 / 1_000_000_000.0
            ));
        }
        body
    }
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let request_id = handlers::make_request_id(&state);
    let started = Instant::now();
    let body = state.metrics.render().await;
    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    handlers::with_request_id(resp, &request_id)
}
