//! Text similarity measures used for practice FAQ matching. All scores lie
//! in `[0, 1]`.

use std::collections::{HashMap, HashSet};

const MIN_COMMON_SUBSTRING: usize = 3;

/// Best FAQ score for a question: the maximum of the three measures.
pub fn faq_similarity(transcript: &str, question: &str) -> f64 {
    sequence_ratio(transcript, question)
        .max(keyword_similarity(transcript, question))
        .max(substring_similarity(transcript, question))
}

/// Ratcliff/Obershelp ratio: `2 * matched / (len(a) + len(b))`, where matched
/// counts characters in recursively found longest matching blocks.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(&a, &b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    2.0 * matched as f64 / total as f64
}

// Earliest longest block of a[alo..ahi] and b[blo..bhi], as (i, j, size).
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut next: HashMap<usize, usize> = HashMap::new();
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            let previous = if j > 0 {
                run_ending_at.get(&(j - 1)).copied().unwrap_or(0)
            } else {
                0
            };
            let size = previous + 1;
            next.insert(j, size);
            if size > best_size {
                best_i = i + 1 - size;
                best_j = j + 1 - size;
                best_size = size;
            }
        }
        run_ending_at = next;
    }

    (best_i, best_j, best_size)
}

/// `|common words| / max(|words1|, |words2|)` over whitespace-split word sets.
pub fn keyword_similarity(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let common = words_a.intersection(&words_b).count();
    common as f64 / words_a.len().max(words_b.len()) as f64
}

/// Longest common substring (at least three characters) over the longer
/// input's length.
pub fn substring_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut longest = 0;
    let mut previous = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        let mut current = vec![0usize; b.len() + 1];
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                current[j] = previous[j - 1] + 1;
                longest = longest.max(current[j]);
            }
        }
        previous = current;
    }

    if longest < MIN_COMMON_SUBSTRING {
        return 0.0;
    }
    longest as f64 / a.len().max(b.len()) as f64
}
