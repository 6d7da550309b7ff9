//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. This is a
//! fixed, tokenizer-agnostic approximation; budgets are advisory, so being
//! off by a few percent is acceptable while staying deterministic.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
///
/// "Characters" are Unicode scalar values, not bytes and not UTF-16 code
/// units. A character outside the Basic Multilingual Plane (most emoji,
/// for instance) counts once here, where a UTF-16 length would count it
/// twice, so such text estimates slightly lower than a UTF-16 count.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
