//! Scratch buffers reused across solver operations to avoid repeated allocation.

/// Temporary state, sized by the number of active decision levels.
#[derive(Default)]
pub struct TmpData {
    /// Scratch flags indexed by decision level, used by glue computation.
    pub flags: Vec<bool>,
}

impl TmpData {
    /// Ensure `flags` can be indexed by every level up to `level_count`.
    pub fn ensure_level_count(&mut self, level_count: usize) {
        if self.flags.len() < level_count {
            self.flags.resize(level_count, false);
        }
    }
}
