//! Execution errors recorded in a trace, flattened to `"pluginId - methodName: message"`.

use crate::domain::trace::Trace;

/// Every recorded error in level and record order, or `None` when the trace has none.
pub fn collect_errors(trace: &Trace) -> Option<Vec<String>> {
    let errors: Vec<String> = trace
        .records()
        .filter_map(|(_, record)| {
            record
                .error
                .as_ref()
                .map(|message| format!("{}: {}", record.method.id(), message))
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}
