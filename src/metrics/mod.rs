//! Token usage accounting across generation and analysis calls

use crate::api::Usage;
use serde::{Deserialize, Serialize};

/// Running totals of reported usage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Calls that reported usage
    pub request_count: u64,
    /// Calls that finished without a usage report
    pub unreported_count: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Sum of the server's own totals, which may differ from input + output
    pub reported_total_tokens: u64,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage (or lack of it) from one call
    pub fn record(&mut self, usage: Option<&Usage>) {
        match usage {
            Some(usage) => {
                self.request_count = self.request_count.saturating_add(1);
                self.total_input_tokens = self.total_input_tokens.saturating_add(usage.input_tokens);
                self.total_output_tokens =
                    self.total_output_tokens.saturating_add(usage.output_tokens);
                self.reported_total_tokens =
                    self.reported_total_tokens.saturating_add(usage.total_tokens);
            }
            None => self.unreported_count = self.unreported_count.saturating_add(1),
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens.saturating_add(self.total_output_tokens)
    }

    pub fn average_tokens_per_request(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.total_tokens() as f64 / self.request_count as f64
    }
}

impl std::fmt::Display for UsageMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Token Usage ===")?;
        writeln!(f, "Input tokens: {}", self.total_input_tokens)?;
        writeln!(f, "Output tokens: {}", self.total_output_tokens)?;
        writeln!(f, "Reported total: {}", self.reported_total_tokens)?;
        writeln!(f, "Requests with usage: {}", self.request_count)?;
        if self.unreported_count > 0 {
            writeln!(f, "Requests without usage: {}", self.unreported_count)?;
        }
        writeln!(f, "Avg tokens/request: {:.1}", self.average_tokens_per_request())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut metrics = UsageMetrics::new();
        metrics.record(Some(&Usage::new(10, 5, 15)));
        metrics.record(Some(&Usage::new(4, 1, 6)));
        metrics.record(None);

        assert_eq!(metrics.request_count, 2);
        assert_eq!(metrics.unreported_count, 1);
        assert_eq!(metrics.total_tokens(), 20);
        assert_eq!(metrics.reported_total_tokens, 21);
        assert!((metrics.average_tokens_per_request() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_huge_server_counts_saturate() {
        let usage = Usage::from_value(&serde_json::json!({
            "inputTokens": 1e30,
            "outputTokens": "1e30",
            "totalTokens": u64::MAX
        }));
        assert_eq!(usage.input_tokens, u64::MAX);
        assert_eq!(usage.output_tokens, u64::MAX);

        let mut metrics = UsageMetrics::new();
        metrics.record(Some(&usage));
        metrics.record(Some(&usage));

        assert_eq!(metrics.total_input_tokens, u64::MAX);
        assert_eq!(metrics.reported_total_tokens, u64::MAX);
        assert_eq!(metrics.total_tokens(), u64::MAX);
        assert!(metrics.average_tokens_per_request() > 0.0);
        assert!(metrics.to_string().contains("Requests with usage: 2"));
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(UsageMetrics::new().average_tokens_per_request(), 0.0);
    }

    #[test]
    fn test_display() {
        let mut metrics = UsageMetrics::new();
        metrics.record(Some(&Usage::new(1, 2, 3)));
        let text = metrics.to_string();
        assert!(text.contains("Input tokens: 1"));
        assert!(!text.contains("without usage"));
    }
}
