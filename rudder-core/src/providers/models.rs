//! Per-model pricing used to cost synthesis calls.

/// Look up per-model pricing (USD per million tokens).
///
/// Returns `(input_cost_per_million, output_cost_per_million)` for known models
/// and `None` for unknown ones. Dated model ids (`claude-sonnet-4-20250514`) match
/// their family entry.
pub fn model_pricing(model: &str) -> Option<(f64, f64)> {
    let normalized = model.to_lowercase();

    // Anthropic models: check more specific variants before less specific ones
    if normalized.contains("claude-opus-4-6") || normalized.contains("claude-opus-4-5") {
        return Some((5.00, 25.00));
    }
    if normalized.contains("claude-opus-4") || normalized.contains("claude-3-opus") {
        return Some((15.0, 75.0));
    }
    if normalized.contains("claude-sonnet-4")
        || normalized.contains("claude-3-7-sonnet")
        || normalized.contains("claude-3-5-sonnet")
        || normalized.contains("claude-3.5-sonnet")
    {
        return Some((3.0, 15.0));
    }
    if normalized.contains("claude-haiku-4-5") {
        return Some((1.00, 5.00));
    }
    if normalized.contains("claude-3-5-haiku") || normalized.contains("claude-3.5-haiku") {
        return Some((0.80, 4.0));
    }
    if normalized.contains("claude-3-haiku") {
        return Some((0.25, 1.25));
    }

    // OpenAI models: check more specific prefixes before less specific ones
    if normalized.starts_with("gpt-4o-mini") {
        return Some((0.15, 0.60));
    }
    if normalized.starts_with("gpt-4o") {
        return Some((2.50, 10.0));
    }
    if normalized.starts_with("gpt-4.1-mini") {
        return Some((0.40, 1.60));
    }
    if normalized.starts_with("gpt-4.1") {
        return Some((2.00, 8.00));
    }

    // Test doubles are free
    if normalized.starts_with("mock") {
        return Some((0.0, 0.0));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_pricing() {
        assert_eq!(model_pricing("claude-sonnet-4-20250514"), Some((3.0, 15.0)));
        assert_eq!(model_pricing("claude-haiku-4-5"), Some((1.0, 5.0)));
        assert_eq!(model_pricing("claude-3-5-haiku-20241022"), Some((0.80, 4.0)));
        assert_eq!(model_pricing("claude-opus-4-1"), Some((15.0, 75.0)));
        assert_eq!(model_pricing("claude-opus-4-5"), Some((5.0, 25.0)));
    }

    #[test]
    fn test_openai_specific_prefix_wins() {
        assert_eq!(model_pricing("gpt-4o-mini-2024-07-18"), Some((0.15, 0.60)));
        assert_eq!(model_pricing("gpt-4o"), Some((2.50, 10.0)));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(model_pricing("Claude-Sonnet-4"), Some((3.0, 15.0)));
    }

    #[test]
    fn test_unknown_model() {
        assert_eq!(model_pricing("some-private-model"), None);
        assert_eq!(model_pricing("mock-model"), Some((0.0, 0.0)));
    }
}
