use probe_core::PipelineOutcome;

/// Renders one outcome as a JSON document.
pub(crate) fn render(
    outcome: &PipelineOutcome,
    minimal: bool,
    pretty: bool,
) -> serde_json::Result<String> {
    match (minimal, pretty) {
        (true, true) => serde_json::to_string_pretty(&outcome.minimal()),
        (true, false) => serde_json::to_string(&outcome.minimal()),
        (false, true) => serde_json::to_string_pretty(outcome),
        (false, false) => serde_json::to_string(outcome),
    }
}
