//! Caller-side frame loop with a cached arc-length table.
//!
//! The table depends only on the control points and the sample step, so
//! rebuilding it every frame is wasted work while nothing is being
//! edited. [`FrameDriver`] keeps the last table together with the
//! revision and step it was built for and reuses it until either one
//! changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::arc_length::ArcLengthTable;
use crate::diagnostics::FrameDiagnostics;
use crate::placer::ObjectPlacer;
use crate::spline::SplineEvaluator;
use crate::types::{ControlPointSet, EngineConfig, EngineError, Placement};

/// Output of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// One placement per object, leader first.
    pub placements: Vec<Placement>,
    /// Timing and counts for this frame.
    pub diagnostics: FrameDiagnostics,
}

#[derive(Debug, Clone)]
struct CachedTable {
    revision: u64,
    step: f64,
    segments: usize,
    table: ArcLengthTable,
}

impl CachedTable {
    const fn matches(&self, revision: u64, step: f64, segments: usize) -> bool {
        self.revision == revision
            && self.step.to_bits() == step.to_bits()
            && self.segments == segments
    }
}

/// Drives one control-point set frame by frame.
///
/// A driver follows a single [`ControlPointSet`]: the cache is keyed on
/// that set's revision counter, so feeding it unrelated sets that happen
/// to share a revision requires an [`invalidate`](Self::invalidate) in
/// between.
///
/// # Examples
///
/// ```
/// use trackline_engine::{ControlPointSet, EngineConfig, FrameDriver};
///
/// let mut points = ControlPointSet::default_track();
/// let config = EngineConfig { object_count: 3, ..EngineConfig::default() };
/// let mut driver = FrameDriver::new();
///
/// let first = driver.frame(&points, 0.0, &config)?;
/// assert_eq!(first.placements.len(), 3);
/// assert!(first.diagnostics.rebuilt);
///
/// // Same revision: the table is reused.
/// let second = driver.frame(&points, 0.05, &config)?;
/// assert!(!second.diagnostics.rebuilt);
///
/// // Editing a point bumps the revision and forces a rebuild.
/// points.move_point(0, trackline_engine::Point::new(4.0, 0.0));
/// assert!(driver.frame(&points, 0.1, &config)?.diagnostics.rebuilt);
/// # Ok::<(), trackline_engine::EngineError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameDriver {
    cache: Option<CachedTable>,
    rebuilds: u64,
}

impl FrameDriver {
    /// A driver with an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cache: None,
            rebuilds: 0,
        }
    }

    /// Compute one frame: rebuild the table if needed, then place every
    /// object at `drive`.
    ///
    /// # Errors
    ///
    /// Returns the [`EngineError`] of the first failing step unchanged.
    /// A failure while building the curve or the table also drops the
    /// cached table; a failure in the placement pass keeps it.
    pub fn frame(
        &mut self,
        points: &ControlPointSet,
        drive: f64,
        config: &EngineConfig,
    ) -> Result<Frame, EngineError> {
        let result = self.compute(points, drive, config);
        if let Err(err) = &result {
            log::warn!(
                "skipping frame at drive {drive} (revision {}): {err}",
                points.revision()
            );
        }
        result
    }

    fn compute(
        &mut self,
        points: &ControlPointSet,
        drive: f64,
        config: &EngineConfig,
    ) -> Result<Frame, EngineError> {
        config.validate()?;
        let spline = SplineEvaluator::new(points).inspect_err(|_| self.cache = None)?;

        let build_start = Instant::now();
        let (table, rebuilt) = self.ensure_table(&spline, points.revision(), config.sample_step)?;
        let table_build = if rebuilt {
            build_start.elapsed()
        } else {
            Duration::ZERO
        };

        let place_start = Instant::now();
        let placements = ObjectPlacer::new(spline, table, config)?.place_all(drive)?;
        let placement = place_start.elapsed();

        Ok(Frame {
            diagnostics: FrameDiagnostics {
                rebuilt,
                table_build,
                placement,
                sample_count: table.len(),
                total_length: table.total_length(),
                placement_count: placements.len(),
                revision: points.revision(),
            },
            placements,
        })
    }

    /// Return the table for this revision and step, building it unless
    /// the cached one matches, and whether a rebuild happened.
    ///
    /// The cache stays empty if the build fails.
    fn ensure_table(
        &mut self,
        spline: &SplineEvaluator<'_>,
        revision: u64,
        step: f64,
    ) -> Result<(&ArcLengthTable, bool), EngineError> {
        let segments = spline.segment_count();
        let (cached, rebuilt) = match self.cache.take() {
            Some(cached) if cached.matches(revision, step, segments) => (cached, false),
            _ => {
                let table = ArcLengthTable::build(spline, step)?;
                log::debug!(
                    "rebuilt arc-length table for revision {revision}: {} rows, length {:.3}",
                    table.len(),
                    table.total_length(),
                );
                self.rebuilds += 1;
                let cached = CachedTable {
                    revision,
                    step,
                    segments,
                    table,
                };
                (cached, true)
            }
        };
        Ok((&self.cache.insert(cached).table, rebuilt))
    }

    /// Drop the cached table so the next frame rebuilds it.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// The cached table, if any.
    #[must_use]
    pub fn table(&self) -> Option<&ArcLengthTable> {
        self.cache.as_ref().map(|cached| &cached.table)
    }

    /// Number of table builds performed so far.
    #[must_use]
    pub const fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
