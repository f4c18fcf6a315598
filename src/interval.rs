use serde::{Deserialize, Serialize};

use crate::TemporalError;

/// Comparison tolerance for time values.
///
/// Two values closer than this are treated as equal everywhere in the
/// crate: relation determination, completion checks, consistency checks.
pub const EPSILON: f64 = 1e-6;

/// A named time interval with partially known values.
///
/// Any two of `start`, `end` and `duration` determine the third; callers
/// may supply one, two or all three. Values are plain numbers in whatever
/// unit the caller chose (the crate performs no unit conversion).
///
/// ```
/// use hybrid_temporal_reasoner::TimeInterval;
///
/// let mut interval = TimeInterval::with_duration("surgery", 2.5);
/// interval.start = Some(9.0);
/// interval.normalize().unwrap();
///
/// assert_eq!(interval.end, Some(11.5));
/// assert!(interval.is_complete());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    /// Stable name, unique within a solver.
    pub name: String,
    /// Start of the interval, if known.
    pub start: Option<f64>,
    /// End of the interval, if known.
    pub end: Option<f64>,
    /// Width of the interval, if known.
    pub duration: Option<f64>,
}

impl TimeInterval {
    /// Creates an interval with no known values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            end: None,
            duration: None,
        }
    }

    /// Creates a complete interval from both endpoints.
    pub fn with_bounds(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            name: name.into(),
            start: Some(start),
            end: Some(end),
            duration: Some(end - start),
        }
    }

    /// Creates an interval of known width but unknown position.
    pub fn with_duration(name: impl Into<String>, duration: f64) -> Self {
        Self {
            name: name.into(),
            start: None,
            end: None,
            duration: Some(duration),
        }
    }

    /// Returns `true` iff both endpoints are known.
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Completes the third value when two of the three are known, and
    /// checks the arithmetic invariant `end = start + duration`.
    ///
    /// Fails with [`TemporalError::IllFormedInterval`] when all three
    /// values are present but disagree beyond [`EPSILON`], or when the
    /// completed interval would have negative width.
    pub fn normalize(&mut self) -> Result<(), TemporalError> {
        match (self.start, self.end, self.duration) {
            (Some(start), Some(end), None) => self.duration = Some(end - start),
            (Some(start), None, Some(duration)) => self.end = Some(start + duration),
            (None, Some(end), Some(duration)) => self.start = Some(end - duration),
            (Some(start), Some(end), Some(duration)) => {
                if ((end - start) - duration).abs() > EPSILON {
                    return Err(TemporalError::IllFormedInterval {
                        name: self.name.clone(),
                        detail: format!(
                            "end - start = {} but duration = {}",
                            end - start,
                            duration
                        ),
                    });
                }
            }
            _ => return Ok(()),
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start - EPSILON {
                return Err(TemporalError::IllFormedInterval {
                    name: self.name.clone(),
                    detail: format!("end {} precedes start {}", end, start),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_missing_value() {
        let mut interval = TimeInterval::new("a");
        interval.start = Some(2.0);
        interval.end = Some(5.0);
        interval.normalize().unwrap();
        assert_eq!(interval.duration, Some(3.0));

        let mut interval = TimeInterval::with_duration("b", 4.0);
        interval.end = Some(10.0);
        interval.normalize().unwrap();
        assert_eq!(interval.start, Some(6.0));
    }

    #[test]
    fn partial_intervals_stay_partial() {
        let mut interval = TimeInterval::with_duration("b", 4.0);
        interval.normalize().unwrap();
        assert!(!interval.is_complete());
        assert_eq!(interval.start, None);
        assert_eq!(interval.end, None);
    }

    #[test]
    fn rejects_contradictory_values() {
        let mut interval = TimeInterval::with_bounds("a", 0.0, 5.0);
        interval.duration = Some(7.0);
        assert!(matches!(
            interval.normalize(),
            Err(TemporalError::IllFormedInterval { .. })
        ));
    }

    #[test]
    fn rejects_negative_width() {
        let mut interval = TimeInterval::new("a");
        interval.start = Some(5.0);
        interval.end = Some(1.0);
        assert!(matches!(
            interval.normalize(),
            Err(TemporalError::IllFormedInterval { .. })
        ));
    }
}
