use serde::Serialize;

/// Cumulative router counters.
///
/// Updated after every attempt, including retries, so the totals expose
/// retry amplification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub total_cost: f64,
}

impl RouterMetrics {
    pub fn record_success(&mut self, tokens_in: u64, tokens_out: u64, cost: f64) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.total_tokens_in += tokens_in;
        self.total_tokens_out += tokens_out;
        self.total_cost += cost;
    }

    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}
