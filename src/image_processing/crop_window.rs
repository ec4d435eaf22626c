//! Vertical crop window selection.
//!
//! The frame has already been resized to the target width, so only a row range
//! has to be chosen. The solver works in whole pixels on the resized frame:
//!
//! 1. bound the primary subjects and pad the box (asymmetrically for portraits,
//!    leaving room for shoulders below a face),
//! 2. grow the padded box around the weighted centroid, or shrink it, until it
//!    is exactly the target height,
//! 3. verify that no primary subject got clipped, and if one did, rebuild the
//!    window straight from the primary bounding box.
//!
//! When the primary subjects are taller than the target together, the window
//! is anchored on the topmost one and the solution is flagged as truncated.

use tracing::debug;

use super::subject::{Orientation, Subject};
use super::weighting::{SubjectRanking, WeightedSubject, COMPOSITION_TARGET_RATIO};
use super::CropConfig;

/// Share of the repair growth placed above the subjects of a portrait frame.
const PORTRAIT_REPAIR_UP_SHARE: i64 = 3;

/// Row range `[y_min, y_max)` kept from the resized frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub y_min: u32,
    pub y_max: u32,
}

impl CropWindow {
    pub fn new(y_min: u32, y_max: u32) -> Self {
        Self { y_min, y_max }
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// Whether the subject's rows, clipped to a frame of `frame_height`, fit
    /// inside the window.
    pub fn contains_subject(&self, subject: &Subject, frame_height: u32) -> bool {
        let top = subject.y.max(0.0);
        let bottom = subject.bottom().min(frame_height as f64);
        top >= self.y_min as f64 && bottom <= self.y_max as f64
    }
}

/// How the final window was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// The padded subject box already had the target height.
    Padded,
    /// The padded box was grown around the weighted centroid.
    Expanded,
    /// The padded box was shrunk to the target height.
    Shrunk,
    /// The geometric window clipped a primary subject and was rebuilt from the
    /// primary bounding box.
    Repaired,
    /// The primary subjects do not fit in the target height; the window is
    /// anchored on the topmost one.
    Truncated,
    /// The frame is not taller than the target; the whole frame is kept.
    FullFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSolution {
    pub window: CropWindow,
    pub method: SolveMethod,
}

impl CropSolution {
    pub fn truncated(&self) -> bool {
        self.method == SolveMethod::Truncated
    }
}

/// Window centered on the frame, used when there is nothing to keep in view.
///
/// Frames no taller than `target` are kept whole.
pub fn center_window(frame_height: u32, target: u32) -> CropWindow {
    if frame_height <= target {
        return CropWindow::new(0, frame_height);
    }

    let h = frame_height as i64;
    let t = target as i64;
    let y_min = shift_into_frame(h / 2 - t / 2, t, h);
    window_at(y_min, t)
}

/// Solve the crop window for ranked subjects.
///
/// Returns `None` when there are no subjects; callers fall back to
/// [`center_window`].
pub fn solve_crop_window(
    ranking: &SubjectRanking,
    frame_height: u32,
    target: u32,
    orientation: Orientation,
    config: &CropConfig,
) -> Option<CropSolution> {
    let primary = ranking.primary();
    if primary.is_empty() {
        return None;
    }

    if frame_height <= target {
        return Some(CropSolution {
            window: CropWindow::new(0, frame_height),
            method: SolveMethod::FullFrame,
        });
    }

    let h = frame_height as i64;
    let t = target as i64;
    let bounds = PrimaryBounds::of(primary, h);

    let (pad_top, pad_bottom) = padding(primary, orientation, config);
    let padded_top = (bounds.top - pad_top).max(0);
    let padded_bottom = (bounds.bottom + pad_bottom).min(h);
    let padded_height = padded_bottom - padded_top;
    let centroid = ranking.weighted_center_y.round() as i64;

    let (y_min, method) = if padded_height < t {
        let up_share = match orientation {
            Orientation::Portrait => COMPOSITION_TARGET_RATIO,
            Orientation::Landscape => 0.5,
        };
        let desired = centroid - (t as f64 * up_share).round() as i64;
        // never let the centroid placement push the padded box out of the window
        (desired.clamp(padded_bottom - t, padded_top), SolveMethod::Expanded)
    } else if padded_height > t {
        let anchored = match orientation {
            Orientation::Landscape => centroid - t / 2,
            Orientation::Portrait => padded_top,
        };
        (anchored, SolveMethod::Shrunk)
    } else {
        (padded_top, SolveMethod::Padded)
    };

    let window = window_at(shift_into_frame(y_min, t, h), t);

    if primary
        .iter()
        .all(|s| window.contains_subject(&s.subject, frame_height))
    {
        debug!(
            "crop window {}..{} ({:?}) for {} primary subjects",
            window.y_min,
            window.y_max,
            method,
            primary.len()
        );
        return Some(CropSolution { window, method });
    }

    let solution = repair(&bounds, t, h, orientation);
    debug!(
        "crop window {}..{} clipped a primary subject, rebuilt as {}..{} ({:?})",
        window.y_min, window.y_max, solution.window.y_min, solution.window.y_max, solution.method
    );
    Some(solution)
}

/// Rebuild the window directly from the primary bounding box.
fn repair(bounds: &PrimaryBounds, t: i64, h: i64, orientation: Orientation) -> CropSolution {
    let box_height = bounds.bottom - bounds.top;

    if box_height > t {
        return CropSolution {
            window: window_at(shift_into_frame(bounds.top, t, h), t),
            method: SolveMethod::Truncated,
        };
    }

    let growth = t - box_height;
    let up = match orientation {
        Orientation::Portrait => growth / PORTRAIT_REPAIR_UP_SHARE,
        Orientation::Landscape => growth / 2,
    };

    CropSolution {
        window: window_at(shift_into_frame(bounds.top - up, t, h), t),
        method: SolveMethod::Repaired,
    }
}

/// Tight row bounds of the primary subjects, rounded outwards and clipped to
/// the frame.
struct PrimaryBounds {
    top: i64,
    bottom: i64,
}

impl PrimaryBounds {
    fn of(primary: &[WeightedSubject], h: i64) -> Self {
        let top = primary
            .iter()
            .map(|s| s.subject.y)
            .fold(f64::INFINITY, f64::min);
        let bottom = primary
            .iter()
            .map(|s| s.subject.bottom())
            .fold(f64::NEG_INFINITY, f64::max);

        Self {
            top: (top.floor() as i64).clamp(0, h),
            bottom: (bottom.ceil() as i64).clamp(0, h),
        }
    }
}

/// Adaptive padding `(above, below)` in pixels.
fn padding(primary: &[WeightedSubject], orientation: Orientation, config: &CropConfig) -> (i64, i64) {
    let avg_height =
        primary.iter().map(|s| s.subject.height).sum::<f64>() / primary.len() as f64;
    let padding = (avg_height * config.face_padding_ratio as f64).min(config.max_face_padding_px as f64);

    match orientation {
        Orientation::Portrait => (
            (padding * config.portrait_top_padding_ratio as f64).round() as i64,
            (padding * config.portrait_bottom_padding_ratio as f64).round() as i64,
        ),
        Orientation::Landscape => {
            let p = padding.round() as i64;
            (p, p)
        }
    }
}

/// Slide a window of height `t` so it lies inside `[0, h]`; the edge it would
/// cross absorbs nothing, the opposite side takes the growth.
fn shift_into_frame(y_min: i64, t: i64, h: i64) -> i64 {
    y_min.clamp(0, (h - t).max(0))
}

fn window_at(y_min: i64, t: i64) -> CropWindow {
    CropWindow::new(y_min as u32, (y_min + t) as u32)
}
