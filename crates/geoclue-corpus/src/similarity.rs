/// Lengths of two vectors that were expected to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Cosine similarity of `query` and `other`.
///
/// Vectors of different length are rejected rather than truncated. A
/// zero-magnitude vector has no direction and scores `0.0`.
pub fn cosine_similarity(query: &[f32], other: &[f32]) -> Result<f32, LengthMismatch> {
    if query.len() != other.len() {
        return Err(LengthMismatch { expected: query.len(), actual: other.len() });
    }
    let (mut dot, mut norm_q, mut norm_o) = (0f32, 0f32, 0f32);
    for (q, o) in query.iter().zip(other) {
        dot += q * o;
        norm_q += q * q;
        norm_o += o * o;
    }
    if norm_q == 0.0 || norm_o == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_q.sqrt() * norm_o.sqrt()))
}
