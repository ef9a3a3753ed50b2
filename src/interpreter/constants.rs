// Limits for the evaluator

/// Deepest nesting of script function calls before evaluation fails with
/// `RecursionLimit`
pub const MAX_CALL_DEPTH: usize = 128;
