//! The contract a natural-language extractor must satisfy, and the
//! adapter that lifts its (untrusted, stringly-typed) output into solver
//! state.
//!
//! The extractor is a black box to the core: anything that can turn text
//! into events, relations and a raw answer fits behind [`Extractor`] — a
//! deterministic scripted fixture in tests, an actual LLM client in
//! production.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{Relation, Solver, TemporalError, TimeInterval};

/// Seconds per time unit accepted by [`parse_duration`].
const UNITS: [(&str, f64); 5] = [
    ("second", 1.0),
    ("minute", 60.0),
    ("hour", 3600.0),
    ("day", 86400.0),
    ("week", 604800.0),
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// How deep a question requires the extractor to reason.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtractionLevel {
    /// Level 1: extract events and basic temporal information.
    Extraction,
    /// Level 2: order events temporally.
    Ordering,
    /// Level 3: calculate durations and specific times.
    Calculation,
}

impl ExtractionLevel {
    /// The numeric level, `1..=3`.
    pub const fn level(&self) -> u8 {
        match self {
            Self::Extraction => 1,
            Self::Ordering => 2,
            Self::Calculation => 3,
        }
    }

    /// Detects the required level from the question text.
    ///
    /// Calculation keywords win over ordering keywords; anything else is
    /// plain extraction.
    pub fn detect(question: &str) -> Self {
        let question = question.to_lowercase();

        if ["how long", "duration", "calculate", "total time"]
            .iter()
            .any(|keyword| question.contains(keyword))
        {
            return Self::Calculation;
        }

        if ["order", "sequence", "before", "after", "when"]
            .iter()
            .any(|keyword| question.contains(keyword))
        {
            return Self::Ordering;
        }

        Self::Extraction
    }
}

impl fmt::Display for ExtractionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

impl Serialize for ExtractionLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

impl<'de> Deserialize<'de> for ExtractionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            1 => Ok(Self::Extraction),
            2 => Ok(Self::Ordering),
            3 => Ok(Self::Calculation),
            other => Err(serde::de::Error::custom(format!(
                "extraction level must be 1..=3, got {other}"
            ))),
        }
    }
}

/// An event the extractor found in the text.
///
/// The time fields are raw strings straight from the extractor; whether
/// they parse is the adapter's problem, not the extractor's.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalEvent {
    /// Event name, used as the interval name.
    pub name: String,
    /// What the event is.
    pub description: String,
    /// Raw start time, if the extractor found one.
    pub start_time: Option<String>,
    /// Raw end time, if the extractor found one.
    pub end_time: Option<String>,
    /// Raw duration, if the extractor found one.
    pub duration: Option<String>,
    /// Raw absolute time, if the extractor found one.
    pub absolute_time: Option<String>,
}

impl TemporalEvent {
    /// Creates an event with no time information.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Converts the event into a (possibly partial) interval by parsing
    /// whatever time fields parse; the rest stay unknown.
    pub fn to_interval(&self) -> TimeInterval {
        TimeInterval {
            name: self.name.clone(),
            start: self
                .start_time
                .as_deref()
                .and_then(|raw| TimeValue::parse(raw).as_number()),
            end: self
                .end_time
                .as_deref()
                .and_then(|raw| TimeValue::parse(raw).as_number()),
            duration: self.duration.as_deref().and_then(parse_duration),
        }
    }
}

/// A pairwise temporal relation the extractor asserted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    /// Name of the first event.
    pub event1: String,
    /// Name of the second event.
    pub event2: String,
    /// Relation tag; canonical hyphen or underscore spelling, any case.
    pub relation: String,
    /// The extractor's confidence in this relation, in `[0, 1]`.
    pub confidence: f64,
}

impl ExtractedRelation {
    /// Creates a relation assertion.
    pub fn new(
        event1: impl Into<String>,
        event2: impl Into<String>,
        relation: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            event1: event1.into(),
            event2: event2.into(),
            relation: relation.into(),
            confidence,
        }
    }
}

/// Everything the extractor returns for one piece of text.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Extraction {
    /// Extracted events.
    pub events: Vec<TemporalEvent>,
    /// Extracted pairwise relations.
    pub relations: Vec<ExtractedRelation>,
    /// The extractor's own natural-language answer.
    pub raw_answer: String,
    /// The level the extraction was performed at.
    pub level: ExtractionLevel,
    /// Free-form metadata; an optional numeric `confidence` is honored.
    pub metadata: Value,
}

impl Extraction {
    /// The extractor's self-reported confidence, or `default` when the
    /// metadata carries none.
    pub fn confidence(&self, default: f64) -> f64 {
        self.metadata
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }
}

/// The capability a pluggable extractor must provide.
pub trait Extractor {
    /// Extracts events, relations and a raw answer from `text` at the
    /// given reasoning level.
    fn extract(&mut self, text: &str, level: ExtractionLevel)
        -> Result<Extraction, TemporalError>;

    /// Answers `text` directly, without symbolic help. Used for the
    /// pure-extractor comparison path.
    fn query(&mut self, text: &str) -> String;
}

/// A time value parsed from an extractor string.
///
/// The solver consumes only the numeric forms; whether an `Unparsed`
/// value counts as a conflict is the orchestrator's decision.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeValue {
    /// A plain number, in the caller's time unit.
    Numeric(f64),
    /// A weekday, mapped onto `monday = 0 … sunday = 6`.
    Weekday(u8),
    /// Something the grammar does not cover.
    Unparsed(String),
}

impl TimeValue {
    /// Parses a raw time string: first a decimal number, failing that a
    /// weekday name; anything else is kept verbatim as `Unparsed`.
    pub fn parse(raw: &str) -> Self {
        if let Some(number) = leading_number(raw) {
            return Self::Numeric(number);
        }

        let lowered = raw.to_lowercase();
        for (index, day) in WEEKDAYS.iter().enumerate() {
            if lowered.contains(day) {
                return Self::Weekday(index as u8);
            }
        }

        Self::Unparsed(raw.to_owned())
    }

    /// The numeric value the solver can work with, if there is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Weekday(index) => Some(f64::from(*index)),
            Self::Unparsed(_) => None,
        }
    }
}

/// Parses a duration string into seconds.
///
/// Accepts `"<number> <unit>"` with unit ∈ {second, minute, hour, day,
/// week}, singular or plural, e.g. `"45 minutes"`. A bare number is
/// taken to mean hours. Returns `None` when nothing numeric is found.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let lowered = raw.to_lowercase();
    let bytes = lowered.as_bytes();

    let mut first_number = None;
    let mut cursor = 0;

    while cursor < bytes.len() {
        if !bytes[cursor].is_ascii_digit() {
            cursor += 1;
            continue;
        }

        let (number, end) = read_number(&lowered, cursor);
        if first_number.is_none() {
            first_number = Some(number);
        }

        let rest = lowered[end..].trim_start();
        let unit: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        let unit = unit.strip_suffix('s').unwrap_or(&unit);

        if let Some((_, seconds)) = UNITS.iter().find(|(name, _)| *name == unit) {
            return Some(number * seconds);
        }

        cursor = end;
    }

    // A bare number defaults to hours.
    first_number.map(|hours| hours * 3600.0)
}

/// What [`lift_extraction`] managed to transfer into the solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiftReport {
    /// Intervals registered.
    pub num_intervals: usize,
    /// Constraints added.
    pub num_constraints: usize,
    /// Relations dropped because their tag or event names were unusable.
    pub skipped: usize,
}

/// Lifts an extraction into solver state: one interval per event, one
/// singleton constraint per parseable relation.
///
/// Relations with unknown tags or unregistered event names are dropped
/// with a logged skip; ill-formed intervals abort the lift (the
/// orchestrator folds that into "inconsistent").
pub fn lift_extraction(
    extraction: &Extraction,
    solver: &mut Solver,
) -> Result<LiftReport, TemporalError> {
    let mut report = LiftReport::default();

    for event in &extraction.events {
        solver.add_interval(event.to_interval())?;
        report.num_intervals += 1;
    }

    for relation in &extraction.relations {
        let parsed: Relation = match relation.relation.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(tag = %relation.relation, "skipping relation with unknown tag");
                report.skipped += 1;
                continue;
            }
        };

        match solver.add_single_relation(&relation.event1, &relation.event2, parsed) {
            Ok(()) => report.num_constraints += 1,
            Err(TemporalError::UnknownInterval { name }) => {
                warn!(name = %name, "skipping constraint over unknown event");
                report.skipped += 1;
            }
            Err(other) => return Err(other),
        }
    }

    Ok(report)
}

fn leading_number(raw: &str) -> Option<f64> {
    let bytes = raw.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let (number, _) = read_number(raw, start);
    Some(number)
}

/// Reads the decimal number starting at `start` (which must sit on an
/// ASCII digit); returns the value and the byte offset one past it.
fn read_number(text: &str, start: usize) -> (f64, usize) {
    let bytes = text.as_bytes();
    let mut end = start;

    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len()
        && bytes[end] == b'.'
        && end + 1 < bytes.len()
        && bytes[end + 1].is_ascii_digit()
    {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    let value = text[start..end].parse().unwrap_or(0.0);
    (value, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Consistency;

    #[test]
    fn detects_reasoning_levels() {
        assert_eq!(
            ExtractionLevel::detect("How long was the hospital stay?"),
            ExtractionLevel::Calculation
        );
        assert_eq!(
            ExtractionLevel::detect("What is the order of events?"),
            ExtractionLevel::Ordering
        );
        assert_eq!(
            ExtractionLevel::detect("When does the keynote start?"),
            ExtractionLevel::Ordering
        );
        assert_eq!(
            ExtractionLevel::detect("List the events."),
            ExtractionLevel::Extraction
        );
        // Calculation keywords win over ordering keywords.
        assert_eq!(
            ExtractionLevel::detect("How long after lunch was the talk?"),
            ExtractionLevel::Calculation
        );
    }

    #[test]
    fn parses_numeric_and_weekday_times() {
        assert_eq!(TimeValue::parse("9.5"), TimeValue::Numeric(9.5));
        assert_eq!(TimeValue::parse("at 14"), TimeValue::Numeric(14.0));
        assert_eq!(TimeValue::parse("Monday"), TimeValue::Weekday(0));
        assert_eq!(TimeValue::parse("next friday"), TimeValue::Weekday(4));
        assert_eq!(TimeValue::parse("friday").as_number(), Some(4.0));
        assert_eq!(
            TimeValue::parse("someday"),
            TimeValue::Unparsed("someday".to_owned())
        );
        assert_eq!(TimeValue::parse("someday").as_number(), None);
    }

    #[test]
    fn parses_durations_with_units() {
        assert_eq!(parse_duration("45 minutes"), Some(2700.0));
        assert_eq!(parse_duration("1 minute"), Some(60.0));
        assert_eq!(parse_duration("2 hours"), Some(7200.0));
        assert_eq!(parse_duration("1.5 days"), Some(129600.0));
        assert_eq!(parse_duration("3 weeks"), Some(1814400.0));
        assert_eq!(parse_duration("10 seconds"), Some(10.0));
    }

    #[test]
    fn bare_numbers_default_to_hours() {
        assert_eq!(parse_duration("2"), Some(7200.0));
        assert_eq!(parse_duration("about 1.5"), Some(5400.0));
        assert_eq!(parse_duration("no numbers here"), None);
    }

    #[test]
    fn events_become_partial_intervals() {
        let mut event = TemporalEvent::new("admission", "patient admitted");
        event.start_time = Some("monday".to_owned());

        let interval = event.to_interval();
        assert_eq!(interval.start, Some(0.0));
        assert_eq!(interval.end, None);
        assert_eq!(interval.duration, None);

        let mut event = TemporalEvent::new("talk", "the talk");
        event.duration = Some("45 minutes".to_owned());
        assert_eq!(event.to_interval().duration, Some(2700.0));
    }

    #[test]
    fn lift_adds_intervals_and_constraints() {
        let extraction = Extraction {
            events: vec![
                TemporalEvent::new("a", "first"),
                TemporalEvent::new("b", "second"),
            ],
            relations: vec![ExtractedRelation::new("a", "b", "before", 0.9)],
            raw_answer: String::new(),
            level: ExtractionLevel::Ordering,
            metadata: Value::Null,
        };

        let mut solver = Solver::new();
        let report = lift_extraction(&extraction, &mut solver).unwrap();

        assert_eq!(report.num_intervals, 2);
        assert_eq!(report.num_constraints, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(solver.propagate(), Consistency::Consistent);
    }

    #[test]
    fn lift_accepts_underscore_tags_and_skips_unknown() {
        let extraction = Extraction {
            events: vec![
                TemporalEvent::new("a", "first"),
                TemporalEvent::new("b", "second"),
            ],
            relations: vec![
                ExtractedRelation::new("a", "b", "Met_By", 0.9),
                ExtractedRelation::new("a", "b", "shortly-after", 0.9),
                ExtractedRelation::new("a", "ghost", "before", 0.9),
            ],
            raw_answer: String::new(),
            level: ExtractionLevel::Ordering,
            metadata: Value::Null,
        };

        let mut solver = Solver::new();
        let report = lift_extraction(&extraction, &mut solver).unwrap();

        assert_eq!(report.num_constraints, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(
            solver.relation("a", "b"),
            Some(crate::RelationSet::singleton(Relation::Meets {
                is_inverted: true
            }))
        );
    }

    #[test]
    fn extraction_confidence_falls_back_to_default() {
        let mut extraction = Extraction {
            events: Vec::new(),
            relations: Vec::new(),
            raw_answer: String::new(),
            level: ExtractionLevel::Extraction,
            metadata: Value::Null,
        };
        assert_eq!(extraction.confidence(0.8), 0.8);

        extraction.metadata = serde_json::json!({ "confidence": 0.65 });
        assert_eq!(extraction.confidence(0.8), 0.65);
    }
}
