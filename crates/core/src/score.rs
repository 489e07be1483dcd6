//! Word-level alignment scoring between reference and hypothesis text.

use crate::text;

/// Alignment counts and the standard derived ASR error metrics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WordMetrics {
    pub wer: f64,
    pub mer: f64,
    pub wil: f64,
    pub wip: f64,
    pub hits: usize,
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
}

/// Normalize both sides and score hypothesis lines against reference lines.
pub fn score_lines<R: AsRef<str>, H: AsRef<str>>(
    reference: &[R],
    hypothesis: &[H],
) -> WordMetrics {
    process_words(
        &text::normalize_lines(reference),
        &text::normalize_lines(hypothesis),
    )
}

/// Word-level Levenshtein alignment over whitespace-separated tokens.
///
/// `wer` may exceed 1.0 when insertions dominate. An empty reference is
/// undefined input; callers must guarantee non-empty reference text.
pub fn process_words(reference: &str, hypothesis: &str) -> WordMetrics {
    let r: Vec<&str> = reference.split_whitespace().collect();
    let h: Vec<&str> = hypothesis.split_whitespace().collect();
    let m = r.len();
    let n = h.len();

    let mut d = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        d[0][j] = j;
    }
    for i in 1..=m {
        for j in 1..=n {
            let cost = usize::from(r[i - 1] != h[j - 1]);
            d[i][j] = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
        }
    }

    let (mut i, mut j) = (m, n);
    let (mut hits, mut substitutions, mut insertions, mut deletions) = (0, 0, 0, 0);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && r[i - 1] == h[j - 1] && d[i][j] == d[i - 1][j - 1] {
            hits += 1;
            i -= 1;
            j -= 1;
        } else if i > 0 && j > 0 && d[i][j] == d[i - 1][j - 1] + 1 {
            substitutions += 1;
            i -= 1;
            j -= 1;
        } else if i > 0 && d[i][j] == d[i - 1][j] + 1 {
            deletions += 1;
            i -= 1;
        } else {
            insertions += 1;
            j -= 1;
        }
    }

    let hf = hits as f64;
    let s = substitutions as f64;
    let del = deletions as f64;
    let ins = insertions as f64;
    let edits = s + del + ins;
    let ref_len = hf + s + del;
    let hyp_len = hf + s + ins;

    let wer = if ref_len > 0.0 { edits / ref_len } else { 0.0 };
    let mer = if ref_len + ins > 0.0 {
        edits / (ref_len + ins)
    } else {
        0.0
    };
    let wip = if ref_len > 0.0 && hyp_len > 0.0 {
        (hf / ref_len) * (hf / hyp_len)
    } else {
        0.0
    };
    let wil = 1.0 - wip;

    WordMetrics {
        wer,
        mer,
        wil,
        wip,
        hits,
        substitutions,
        insertions,
        deletions,
    }
}
