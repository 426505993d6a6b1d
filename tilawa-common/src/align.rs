//! Word-level edit alignment
//!
//! Levenshtein distance over token sequences with unit costs. [`distance`]
//! keeps two DP rows and is used for scoring every verse; [`align`] keeps the
//! full table and backtraces it for the matched verse only. Both evaluate the
//! same recurrence, so `align(a, b).distance() == distance(a, b)`.

/// One alignment step between canonical and recognized tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Tokens are equal
    Match { canonical: usize, query: usize },
    /// Canonical token recognized as a different word
    Substitution { canonical: usize, query: usize },
    /// Canonical token missing from the recitation
    Deletion { canonical: usize },
    /// Extra recognized word; `at` is the count of canonical tokens before it
    Insertion { query: usize, at: usize },
}

impl EditOp {
    pub fn is_edit(&self) -> bool {
        !matches!(self, EditOp::Match { .. })
    }
}

/// Full alignment of a query token sequence against a canonical one
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    ops: Vec<EditOp>,
    distance: usize,
    canonical_len: usize,
    query_len: usize,
}

impl Alignment {
    /// Steps in left-to-right order
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    pub fn distance(&self) -> usize {
        self.distance
    }

    /// `1 - distance / max(len)`, in [0, 1]
    pub fn similarity(&self) -> f64 {
        similarity_from_distance(self.distance, self.canonical_len, self.query_len)
    }
}

/// Convert an edit distance to a bounded similarity ratio
///
/// Two empty sequences are identical (1.0).
pub fn similarity_from_distance(distance: usize, a_len: usize, b_len: usize) -> f64 {
    let longest = a_len.max(b_len);
    if longest == 0 {
        return 1.0;
    }
    1.0 - distance as f64 / longest as f64
}

/// Edit distance between two token sequences
pub fn distance<A, B>(canonical: &[A], query: &[B]) -> usize
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut prev: Vec<usize> = (0..=query.len()).collect();
    let mut curr = vec![0; query.len() + 1];

    for (i, c) in canonical.iter().enumerate() {
        curr[0] = i + 1;
        for (j, q) in query.iter().enumerate() {
            let cost = usize::from(c.as_ref() != q.as_ref());
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[query.len()]
}

/// Align two token sequences and recover the edit script
///
/// On equal cost the backtrace prefers match/substitution, then deletion,
/// then insertion.
pub fn align<A, B>(canonical: &[A], query: &[B]) -> Alignment
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let (n, m) = (canonical.len(), query.len());
    let width = m + 1;
    let mut table = vec![0usize; (n + 1) * width];

    for j in 0..=m {
        table[j] = j;
    }
    for i in 1..=n {
        table[i * width] = i;
        for j in 1..=m {
            let cost = usize::from(canonical[i - 1].as_ref() != query[j - 1].as_ref());
            table[i * width + j] = (table[(i - 1) * width + j - 1] + cost)
                .min(table[(i - 1) * width + j] + 1)
                .min(table[i * width + j - 1] + 1);
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let here = table[i * width + j];
        if i > 0 && j > 0 {
            let equal = canonical[i - 1].as_ref() == query[j - 1].as_ref();
            if here == table[(i - 1) * width + j - 1] + usize::from(!equal) {
                ops.push(if equal {
                    EditOp::Match { canonical: i - 1, query: j - 1 }
                } else {
                    EditOp::Substitution { canonical: i - 1, query: j - 1 }
                });
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && here == table[(i - 1) * width + j] + 1 {
            ops.push(EditOp::Deletion { canonical: i - 1 });
            i -= 1;
        } else {
            ops.push(EditOp::Insertion { query: j - 1, at: i });
            j -= 1;
        }
    }
    ops.reverse();

    Alignment {
        ops,
        distance: table[n * width + m],
        canonical_len: n,
        query_len: m,
    }
}
