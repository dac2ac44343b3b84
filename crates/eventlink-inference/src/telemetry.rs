//! Metric names and descriptions

/// Classifications by top-1 label
pub const CLASSIFICATIONS_TOTAL: &str = "eventlink_classifications_total";

/// Predictions rerouted to the reserved label
pub const GATE_FALLBACKS_TOTAL: &str = "eventlink_gate_fallbacks_total";

pub const RECOMMENDATIONS_TOTAL: &str = "eventlink_recommendations_total";

/// Model loads by outcome (`ok` or `error`)
pub const MODEL_LOADS_TOTAL: &str = "eventlink_model_loads_total";

/// Inference latency by operation (`classify` or `recommend`)
pub const INFERENCE_LATENCY_US: &str = "eventlink_inference_latency_us";

/// Register descriptions with the installed recorder
///
/// Call once after installing a recorder; without one this is a no-op.
pub fn describe_metrics() {
    metrics::describe_counter!(CLASSIFICATIONS_TOTAL, "Total number of intent classifications by label");
    metrics::describe_counter!(
        GATE_FALLBACKS_TOTAL,
        "Total number of predictions gated to the reserved label"
    );
    metrics::describe_counter!(RECOMMENDATIONS_TOTAL, "Total number of recommendation requests");
    metrics::describe_counter!(MODEL_LOADS_TOTAL, "Total number of model loads by outcome");
    metrics::describe_histogram!(
        INFERENCE_LATENCY_US,
        metrics::Unit::Microseconds,
        "Inference latency in microseconds by operation"
    );
}
