//! Edit-distance similarity.
//!
//! Both functions work on Unicode scalar values, not bytes, so Thai text is
//! compared character by character.  Case folding and trimming are the
//! caller's job.

/// Levenshtein distance between `a` and `b`.
///
/// Uses a single rolling row, so memory is `O(len(b))`.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b_chars.len()]
}

/// `(max_len - distance) / max_len`, in `[0.0, 1.0]`.
///
/// Two empty strings are identical and score `1.0`.
///
/// ```
/// use kiosk_knowledge::similarity::similarity;
///
/// assert_eq!(similarity("counter", "counter"), 1.0);
/// assert_eq!(similarity("", ""), 1.0);
/// assert_eq!(similarity("abc", ""), 0.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    (longest - distance) as f32 / longest as f32
}
