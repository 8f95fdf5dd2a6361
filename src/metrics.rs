//! SDK metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.

/// Record a control-plane action
pub fn record_api_call(action: &'static str, success: bool) {
    metrics::counter!("mlp_sdk_api_calls_total",
        "action" => action,
        "outcome" => if success { "success" } else { "error" }
    )
    .increment(1);
}

/// Record an uploaded object
pub fn record_object_uploaded(bytes: u64) {
    metrics::counter!("mlp_sdk_objects_uploaded_total").increment(1);
    metrics::counter!("mlp_sdk_bytes_uploaded_total").increment(bytes);
}

/// Record a downloaded object
pub fn record_object_downloaded(bytes: u64) {
    metrics::counter!("mlp_sdk_objects_downloaded_total").increment(1);
    metrics::counter!("mlp_sdk_bytes_downloaded_total").increment(bytes);
}

/// Record a listing page request
pub fn record_list_page() {
    metrics::counter!("mlp_sdk_list_pages_total").increment(1);
}

/// Record a model lifecycle operation failure
pub fn record_operation_failure(operation: &'static str) {
    metrics::counter!("mlp_sdk_operation_failures_total",
        "operation" => operation
    )
    .increment(1);
}
