use serde_json::json;

use hybrid_temporal_reasoner::*;

const BEFORE: Relation = Relation::Precedes { is_inverted: false };
const AFTER: Relation = Relation::Precedes { is_inverted: true };
const MEETS: Relation = Relation::Meets { is_inverted: false };
const MET_BY: Relation = Relation::Meets { is_inverted: true };
const DURING: Relation = Relation::Contains { is_inverted: true };
const CONTAINS: Relation = Relation::Contains { is_inverted: false };
const EQUALS: Relation = Relation::Equals;
const FINISHES: Relation = Relation::Finishes { is_inverted: false };
const FINISHED_BY: Relation = Relation::Finishes { is_inverted: true };

/// Replays a canned extraction, whatever the question.
struct ScriptedExtractor {
    extraction: Extraction,
}

impl ScriptedExtractor {
    fn new(
        events: Vec<TemporalEvent>,
        relations: Vec<ExtractedRelation>,
        raw_answer: &str,
    ) -> Self {
        Self {
            extraction: Extraction {
                events,
                relations,
                raw_answer: raw_answer.to_owned(),
                level: ExtractionLevel::Extraction,
                metadata: json!({ "confidence": 0.9 }),
            },
        }
    }
}

impl Extractor for ScriptedExtractor {
    fn extract(
        &mut self,
        _text: &str,
        level: ExtractionLevel,
    ) -> Result<Extraction, TemporalError> {
        let mut extraction = self.extraction.clone();
        extraction.level = level;
        Ok(extraction)
    }

    fn query(&mut self, _text: &str) -> String {
        self.extraction.raw_answer.clone()
    }
}

fn event(name: &str) -> TemporalEvent {
    TemporalEvent::new(name, name)
}

fn event_with_start(name: &str, start: &str) -> TemporalEvent {
    let mut event = event(name);
    event.start_time = Some(start.to_owned());
    event
}

fn event_with_duration(name: &str, duration: &str) -> TemporalEvent {
    let mut event = event(name);
    event.duration = Some(duration.to_owned());
    event
}

#[test]
fn converses() {
    // Symmetric relations:

    let symmetric_relations = [Relation::Equals];

    for relation in symmetric_relations {
        let first_converse = relation.as_converse();
        assert_eq!(relation, first_converse);

        let second_converse = first_converse.as_converse();
        assert_eq!(relation, second_converse);
    }

    // Asymmetric relations:

    let asymmetric_relations = [
        Relation::Precedes { is_inverted: false },
        Relation::Meets { is_inverted: false },
        Relation::Overlaps { is_inverted: false },
        Relation::Finishes { is_inverted: false },
        Relation::Contains { is_inverted: false },
        Relation::Starts { is_inverted: false },
    ];

    for relation in asymmetric_relations {
        let first_converse = relation.as_converse();
        assert_ne!(relation, first_converse);

        let second_converse = first_converse.as_converse();
        assert_eq!(relation, second_converse);
    }
}

// S1: a hospital stay spanning weekday-named events. No duration is
// derivable, so the answer falls back to naming the intervals.
#[test]
fn weekday_timeline_pipeline() {
    let extractor = ScriptedExtractor::new(
        vec![
            event_with_start("admission", "monday"),
            event_with_start("discharge", "friday"),
        ],
        vec![ExtractedRelation::new("admission", "discharge", "before", 0.9)],
        "The patient was in hospital from Monday to Friday.",
    );
    let mut reasoner = HybridReasoner::new(extractor);

    let result = reasoner.reason("How long was the hospital stay?", None);

    assert!(result.used_symbolic);
    assert_eq!(
        result.verified_answer,
        "The temporal sequence involves: admission, discharge."
    );
    assert!(result.conflicts_detected.is_empty());
}

// S2: three meeting segments chained by `meets`; every duration must
// survive the lift and the first one drives the answer.
#[test]
fn sequential_durations_pipeline() {
    let extractor = ScriptedExtractor::new(
        vec![
            event_with_duration("presentation", "45 minutes"),
            event_with_duration("qa", "30 minutes"),
            event_with_duration("wrapup", "15 minutes"),
        ],
        vec![
            ExtractedRelation::new("presentation", "qa", "meets", 0.95),
            ExtractedRelation::new("qa", "wrapup", "meets", 0.95),
        ],
        "The presentation took 45 minutes.",
    );
    let mut reasoner = HybridReasoner::new(extractor);

    let result = reasoner.reason("How long did the presentation take?", None);

    assert_eq!(result.verified_answer, "The duration is 45 minutes.");
    assert!(result.used_symbolic);
    assert_eq!(result.confidence, 1.0);
}

// S3: determination on a concrete schedule.
#[test]
fn overlap_detection() {
    let conference = TimeInterval::with_bounds("conference", 9.0, 12.0);
    let keynote = TimeInterval::with_bounds("keynote", 9.5, 10.5);

    assert_eq!(
        Relation::try_from_intervals(&keynote, &conference).unwrap(),
        DURING
    );
    assert_eq!(
        Relation::try_from_intervals(&conference, &keynote).unwrap(),
        CONTAINS
    );
}

// S4: contradictory constraints surface as the inconsistency sentence.
#[test]
fn inconsistent_constraints_pipeline() {
    let extractor = ScriptedExtractor::new(
        vec![event("a"), event("b")],
        vec![
            ExtractedRelation::new("a", "b", "before", 0.9),
            ExtractedRelation::new("a", "b", "after", 0.9),
        ],
        "",
    );
    let mut reasoner = HybridReasoner::new(extractor);

    let result = reasoner.reason("What is the order of events?", None);

    assert_eq!(
        result.verified_answer,
        "The temporal constraints are inconsistent."
    );
    assert!(!result.used_symbolic);
}

// S4, solver level: `propagate` itself reports the contradiction.
#[test]
fn inconsistent_constraints_solver() {
    let mut solver = Solver::new();
    solver.add_interval(TimeInterval::new("a")).unwrap();
    solver.add_interval(TimeInterval::new("b")).unwrap();
    solver.add_single_relation("a", "b", BEFORE).unwrap();
    solver.add_single_relation("a", "b", AFTER).unwrap();

    assert_eq!(solver.propagate(), Consistency::Inconsistent);
}

// S5: `A = [0, 10]`, `B` of duration 5, `A meets B`.
#[test]
fn meets_bound_inference() {
    let mut solver = Solver::new();
    solver
        .add_interval(TimeInterval::with_bounds("a", 0.0, 10.0))
        .unwrap();
    solver
        .add_interval(TimeInterval::with_duration("b", 5.0))
        .unwrap();
    solver.add_single_relation("a", "b", MEETS).unwrap();

    assert!(solver.propagate().is_consistent());
    solver.compute_interval_values().unwrap();

    let b = solver.interval("b").unwrap();
    assert_eq!(b.start, Some(10.0));
    assert_eq!(b.end, Some(15.0));
    assert_eq!(b.duration, Some(5.0));
}

// S6: composition spot checks. `meets ∘ met-by` is the sound Allen cell
// (the operands need only share their end point).
#[test]
fn composition_spot_checks() {
    assert_eq!(
        BEFORE.compose(MEETS),
        RelationSet::singleton(BEFORE)
    );
    assert_eq!(
        BEFORE.compose(BEFORE),
        RelationSet::singleton(BEFORE)
    );
    assert_eq!(
        MEETS.compose(MET_BY),
        RelationSet::of(&[FINISHED_BY, EQUALS, FINISHES])
    );
}

#[test]
fn provenance_survives_export_and_import() {
    let extractor = ScriptedExtractor::new(
        vec![event_with_duration("meeting", "2 hours")],
        Vec::new(),
        "The duration is 2.0 hours.",
    );
    let mut reasoner = HybridReasoner::new(extractor);

    let result = reasoner.reason("How long was the meeting?", None);
    let exported = reasoner.export_provenance(&result.provenance_id).unwrap();

    let mut log = ProvenanceLog::new();
    let imported_id = log.import_chain(&exported).unwrap();

    let chain = log.chain(&imported_id).unwrap();
    assert_eq!(chain.task_id, result.provenance_id);
    assert_eq!(chain.final_answer.as_deref(), Some("The duration is 2.0 hours."));
    assert!(chain.success);
    assert_eq!(chain.nodes.len(), 4);
}

#[test]
fn explanations_render_in_both_formats() {
    let extractor = ScriptedExtractor::new(
        vec![event_with_duration("meeting", "2 hours")],
        Vec::new(),
        "The duration is 2.0 hours.",
    );
    let mut reasoner = HybridReasoner::new(extractor);

    let result = reasoner.reason("How long was the meeting?", None);

    let text = reasoner
        .explanation(&result.provenance_id, ExplanationFormat::Text)
        .unwrap();
    assert!(text.contains("REASONING EXPLANATION: How long was the meeting?"));
    assert!(text.contains("LLM EXTRACTION"));
    assert!(text.contains("FINAL ANSWER: The duration is 2.0 hours."));
    assert_eq!(result.explanation, text);

    let html = reasoner
        .explanation(&result.provenance_id, ExplanationFormat::Html)
        .unwrap();
    assert!(html.contains("<div class='provenance-explanation'>"));
}

#[test]
fn confidence_rollup_reflects_recorded_steps() {
    let extractor = ScriptedExtractor::new(
        vec![event_with_duration("meeting", "2 hours")],
        Vec::new(),
        "The duration is 2.0 hours.",
    );
    let mut reasoner = HybridReasoner::new(extractor);

    let result = reasoner.reason("How long was the meeting?", None);

    // extraction 0.9 × 0.3, constraint 1.0 × 0.2, solving 1.0 × 0.3,
    // verification 1.0 × 0.2
    let expected = (0.9 * 0.3 + 0.2 + 0.3 + 0.2) / (0.3 + 0.2 + 0.3 + 0.2);
    let score = reasoner.provenance().confidence_score(&result.provenance_id);
    assert!((score - expected).abs() < 1e-12);
}
