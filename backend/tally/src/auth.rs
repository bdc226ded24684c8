/// Accepts the raw token or `Bearer <token>`. An empty expected token never matches.
pub fn token_matches(provided: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let provided = provided
        .strip_prefix("Bearer ")
        .unwrap_or(provided)
        .trim();

    provided.len() == expected.len()
        && provided
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
