/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    /// Zero-based index of the question on screen; equals `total` once complete.
    pub position: usize,
    pub answered: usize,
    pub is_complete: bool,
}
