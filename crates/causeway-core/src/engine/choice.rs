//! Lazy enumeration of fixed-size index subsets.

use smallvec::SmallVec;

/// Inline capacity for a single choice; conditioning sets rarely exceed it.
pub const INLINE_CHOICE: usize = 8;

pub type Choice = SmallVec<[usize; INLINE_CHOICE]>;

/// Iterates over all `k`-element subsets of `0..n` in lexicographic order.
///
/// `k == 0` yields exactly one empty subset; `k > n` yields nothing. The only
/// state is the current combination, so [`reset`](Self::reset) restarts the
/// enumeration from the beginning.
///
/// ```rust
/// use causeway_core::engine::choice::ChoiceGenerator;
///
/// let all: Vec<Vec<usize>> = ChoiceGenerator::new(4, 2).map(|c| c.to_vec()).collect();
/// assert_eq!(all[0], vec![0, 1]);
/// assert_eq!(all.len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct ChoiceGenerator {
    n: usize,
    k: usize,
    current: Choice,
    started: bool,
    done: bool,
}

impl ChoiceGenerator {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            current: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.n, self.k);
    }

    /// Number of subsets this generator yields in total.
    pub fn count_total(&self) -> u128 {
        binomial(self.n, self.k)
    }

    fn advance(&mut self) -> bool {
        let k = self.k;
        let n = self.n;
        // Rightmost position that can still be incremented.
        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.current[i] < n - k + i {
                self.current[i] += 1;
                for j in i + 1..k {
                    self.current[j] = self.current[j - 1] + 1;
                }
                return true;
            }
        }
        false
    }
}

impl Iterator for ChoiceGenerator {
    type Item = Choice;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.current.clone());
        }
        if self.advance() {
            Some(self.current.clone())
        } else {
            self.done = true;
            None
        }
    }
}

/// `n choose k`, saturating at `u128::MAX`.
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = match acc.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    acc
}
