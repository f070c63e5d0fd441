//! Line diff: the edit script sent to a buffer sink.
//!
//! A [`Patch`] is read by walking a cursor over the old lines from the top:
//!
//! - [`PatchOp::Keep`] leaves the line under the cursor and advances.
//! - [`PatchOp::Delete`] removes the line under the cursor; the cursor stays.
//! - [`PatchOp::Set`] overwrites the line under the cursor and advances, or
//!   appends once the old lines are exhausted.
//!
//! [`diff_lines`] produces the patch with the fewest non-`Keep` entries. Ties
//! prefer `Keep`, then `Set`, then `Delete`.

use serde::{Deserialize, Serialize};

/// Largest alignment table [`diff_lines`] will build before falling back to
/// a positional patch.
pub const DEFAULT_MAX_DIFF_CELLS: usize = 1_000_000;

/// One entry of a [`Patch`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    /// Sentinel: leave the line as is.
    Keep,
    /// Deletion marker: drop the line.
    Delete,
    /// New content for the line (or an appended line).
    Set(String),
}

impl PatchOp {
    pub fn is_keep(&self) -> bool {
        matches!(self, PatchOp::Keep)
    }
}

/// An ordered edit script over a destination's lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<PatchOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when applying the patch leaves the lines untouched.
    pub fn is_unchanged(&self) -> bool {
        self.ops.iter().all(PatchOp::is_keep)
    }

    /// Number of `Set` and `Delete` entries.
    pub fn change_count(&self) -> usize {
        self.ops.iter().filter(|op| !op.is_keep()).count()
    }

    /// Apply the patch to `old`, returning the resulting lines.
    ///
    /// Old lines past the end of the script are carried over unchanged. A
    /// `Keep` or `Delete` past the end of `old` is malformed: it is skipped
    /// with a warning, and debug builds panic.
    pub fn apply<S: AsRef<str>>(&self, old: &[S]) -> Vec<String> {
        let mut out = Vec::with_capacity(old.len().max(self.ops.len()));
        let mut cursor = 0;
        for (index, op) in self.ops.iter().enumerate() {
            match op {
                PatchOp::Keep | PatchOp::Delete if cursor >= old.len() => {
                    tracing::warn!(
                        index,
                        old_len = old.len(),
                        op = ?op,
                        "patch entry past end of lines"
                    );
                    debug_assert!(
                        false,
                        "{op:?} at entry {index} is past the end of {} lines",
                        old.len()
                    );
                }
                PatchOp::Keep => {
                    out.push(old[cursor].as_ref().to_owned());
                    cursor += 1;
                }
                PatchOp::Delete => cursor += 1,
                PatchOp::Set(line) => {
                    out.push(line.clone());
                    if cursor < old.len() {
                        cursor += 1;
                    }
                }
            }
        }
        out.extend(old[cursor..].iter().map(|line| line.as_ref().to_owned()));
        out
    }
}

impl From<Vec<PatchOp>> for Patch {
    fn from(ops: Vec<PatchOp>) -> Self {
        Self::new(ops)
    }
}

impl IntoIterator for Patch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a PatchOp;
    type IntoIter = std::slice::Iter<'a, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Minimal patch turning `old` into `new`.
pub fn diff_lines<A: AsRef<str>, B: AsRef<str>>(old: &[A], new: &[B]) -> Patch {
    diff_lines_bounded(old, new, DEFAULT_MAX_DIFF_CELLS)
}

/// Like [`diff_lines`], but emits a positional patch when the alignment table
/// for the lines after the common prefix would exceed `max_cells`.
pub fn diff_lines_bounded<A: AsRef<str>, B: AsRef<str>>(
    old: &[A],
    new: &[B],
    max_cells: usize,
) -> Patch {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a.as_ref() == b.as_ref())
        .count();

    let mut ops = vec![PatchOp::Keep; prefix];
    let (old, new) = (&old[prefix..], &new[prefix..]);

    let cells = (old.len() + 1).checked_mul(new.len() + 1);
    match cells {
        Some(cells) if cells <= max_cells => align(old, new, &mut ops),
        _ => {
            tracing::debug!(
                old = old.len(),
                new = new.len(),
                max_cells,
                "diff table too large, using positional patch"
            );
            positional(old, new, &mut ops);
        }
    }
    Patch::new(ops)
}

/// Line-by-line patch with no alignment.
pub fn positional_patch<A: AsRef<str>, B: AsRef<str>>(old: &[A], new: &[B]) -> Patch {
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    positional(old, new, &mut ops);
    Patch::new(ops)
}

fn positional<A: AsRef<str>, B: AsRef<str>>(old: &[A], new: &[B], ops: &mut Vec<PatchOp>) {
    for (a, b) in old.iter().zip(new) {
        if a.as_ref() == b.as_ref() {
            ops.push(PatchOp::Keep);
        } else {
            ops.push(PatchOp::Set(b.as_ref().to_owned()));
        }
    }
    if old.len() > new.len() {
        ops.extend(std::iter::repeat(PatchOp::Delete).take(old.len() - new.len()));
    } else {
        ops.extend(new[old.len()..].iter().map(|b| PatchOp::Set(b.as_ref().to_owned())));
    }
}

/// Dynamic-programming alignment.
///
/// `cost[i][j]` is the fewest non-`Keep` entries needed to turn `old[i..]`
/// into `new[j..]`. Appends are only possible once `i == old.len()`.
fn align<A: AsRef<str>, B: AsRef<str>>(old: &[A], new: &[B], ops: &mut Vec<PatchOp>) {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;
    let mut cost = vec![0u32; (n + 1) * width];
    let at = |i: usize, j: usize| i * width + j;

    for j in 0..=m {
        cost[at(n, j)] = (m - j) as u32;
    }
    for i in (0..n).rev() {
        cost[at(i, m)] = (n - i) as u32;
        for j in (0..m).rev() {
            let diagonal = cost[at(i + 1, j + 1)];
            let mut best = diagonal + 1;
            if old[i].as_ref() == new[j].as_ref() {
                best = diagonal;
            }
            best = best.min(cost[at(i + 1, j)] + 1);
            cost[at(i, j)] = best;
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        let here = cost[at(i, j)];
        let diagonal = cost[at(i + 1, j + 1)];
        if old[i].as_ref() == new[j].as_ref() && here == diagonal {
            ops.push(PatchOp::Keep);
            i += 1;
            j += 1;
        } else if here == diagonal + 1 {
            ops.push(PatchOp::Set(new[j].as_ref().to_owned()));
            i += 1;
            j += 1;
        } else {
            ops.push(PatchOp::Delete);
            i += 1;
        }
    }
    ops.extend(std::iter::repeat(PatchOp::Delete).take(n - i));
    ops.extend(new[j..].iter().map(|b| PatchOp::Set(b.as_ref().to_owned())));
}

// ===========================================================================
// Tests
// ===========================================================================
