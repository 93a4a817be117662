use crate::foundation::error::RunesResult;

/// Drawing capability consumed by modifiers and the orchestrator.
///
/// Canvases are immutable values: every operation returns a new canvas and leaves its inputs
/// untouched. Only [`DrawingEngine::show`] has an observable side effect.
pub trait DrawingEngine: Send + Sync {
    type Canvas: Clone + Send + Sync + 'static;

    /// Recolor `canvas` with a color chosen at random. Output varies between calls.
    fn random_color(&self, canvas: &Self::Canvas) -> Self::Canvas;

    /// `count` copies of `canvas` stacked vertically in equal bands.
    fn stack_n(&self, count: u32, canvas: &Self::Canvas) -> Self::Canvas;

    /// `left` occupies the leftmost `frac` of the width, `right` the remainder.
    fn beside_frac(&self, frac: f64, left: &Self::Canvas, right: &Self::Canvas) -> Self::Canvas;

    fn beside(&self, left: &Self::Canvas, right: &Self::Canvas) -> Self::Canvas {
        self.beside_frac(0.5, left, right)
    }

    /// Terminal sink for a finished canvas.
    fn show(&self, canvas: &Self::Canvas) -> RunesResult<()>;
}
