use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    lift_extraction, Consistency, ExplanationFormat, ExtractionLevel, Extractor, ProvenanceLog,
    Solver, SolverConfig, TemporalError,
};

/// Confidence assumed for extractions whose metadata carries none.
const DEFAULT_EXTRACTOR_CONFIDENCE: f64 = 0.8;

/// The outcome of one hybrid reasoning task.
#[derive(Clone, Debug, Serialize)]
pub struct HybridResult {
    /// The question that was asked.
    pub question: String,
    /// The extractor's raw answer.
    pub llm_answer: String,
    /// The answer synthesized from solver state, when solving ran.
    pub symbolic_answer: Option<String>,
    /// The answer selected after reconciliation.
    pub verified_answer: String,
    /// Overall confidence in the verified answer.
    pub confidence: f64,
    /// The extractor's self-reported confidence.
    pub llm_confidence: f64,
    /// Confidence in the symbolic side (1.0 consistent, 0.5 otherwise).
    pub symbolic_confidence: f64,
    /// Whether the symbolic answer won.
    pub used_symbolic: bool,
    /// Disagreements found between the two sides.
    pub conflicts_detected: Vec<String>,
    /// Rendered provenance explanation.
    pub explanation: String,
    /// Task id of the provenance chain behind this answer.
    pub provenance_id: String,
}

/// Side-by-side comparison of the hybrid pipeline against the bare
/// extractor on the same question.
#[derive(Clone, Debug, Serialize)]
pub struct ExtractorComparison {
    /// The question that was asked.
    pub question: String,
    /// What the extractor answers on its own.
    pub pure_extractor_answer: String,
    /// What the hybrid pipeline answers.
    pub hybrid_answer: String,
    /// The hybrid pipeline's confidence.
    pub hybrid_confidence: f64,
    /// Whether symbolic verification was available.
    pub used_symbolic_verification: bool,
    /// How many conflicts the hybrid pipeline detected.
    pub conflicts_found: usize,
}

/// The hybrid orchestrator: couples a pluggable extractor with the
/// symbolic solver and reconciles the two into a verified answer.
///
/// Per question it extracts, lifts events into a fresh [`Solver`],
/// propagates, synthesizes a symbolic answer, compares it against the
/// extractor's raw answer, and selects whichever side the evidence
/// favors — recording every step in its [`ProvenanceLog`].
///
/// A reasoner is single-threaded and carries mutable state (the task
/// counter and the log); construct one reasoner per worker when
/// parallelizing batches.
#[derive(Debug)]
pub struct HybridReasoner<E> {
    extractor: E,
    provenance: ProvenanceLog,
    solver_config: SolverConfig,
    task_counter: u64,
}

impl<E: Extractor> HybridReasoner<E> {
    /// Creates a reasoner over the given extractor with default solver
    /// configuration.
    pub fn new(extractor: E) -> Self {
        Self::with_config(extractor, SolverConfig::default())
    }

    /// Creates a reasoner with an explicit solver configuration.
    pub fn with_config(extractor: E, solver_config: SolverConfig) -> Self {
        Self {
            extractor,
            provenance: ProvenanceLog::new(),
            solver_config,
            task_counter: 0,
        }
    }

    /// Answers a natural-language temporal question.
    ///
    /// When `level` is `None` it is detected from the question text.
    /// Never returns an error: any failure inside the pipeline is caught
    /// at this boundary and reported as a degraded [`HybridResult`] with
    /// zero confidence and the error listed under `conflicts_detected`.
    pub fn reason(&mut self, question: &str, level: Option<ExtractionLevel>) -> HybridResult {
        let level = level.unwrap_or_else(|| ExtractionLevel::detect(question));

        self.task_counter += 1;
        let task_id = format!("task_{:04}", self.task_counter);
        info!(task_id = %task_id, level = %level, "hybrid reasoning task started");

        if let Err(err) = self.provenance.start_task(&task_id, question) {
            return self.error_result(question, &task_id, &err);
        }

        match self.run_pipeline(question, level, &task_id) {
            Ok(result) => result,
            Err(err) => {
                let error_msg = format!("Error in reasoning: {err}");
                self.provenance
                    .end_task(&task_id, "", false, Some(error_msg.clone()));
                self.error_result(question, &task_id, &err)
            }
        }
    }

    /// Runs the same question through the bare extractor and the hybrid
    /// pipeline and reports both answers.
    pub fn compare_with_pure_extractor(&mut self, question: &str) -> ExtractorComparison {
        let hybrid = self.reason(question, None);
        let pure_extractor_answer = self.extractor.query(question);

        ExtractorComparison {
            question: question.to_owned(),
            pure_extractor_answer,
            hybrid_answer: hybrid.verified_answer,
            hybrid_confidence: hybrid.confidence,
            used_symbolic_verification: hybrid.used_symbolic,
            conflicts_found: hybrid.conflicts_detected.len(),
        }
    }

    /// The provenance log accumulated over this reasoner's tasks.
    pub fn provenance(&self) -> &ProvenanceLog {
        &self.provenance
    }

    /// Renders the provenance explanation for an earlier task.
    pub fn explanation(
        &self,
        task_id: &str,
        format: ExplanationFormat,
    ) -> Result<String, TemporalError> {
        self.provenance.generate_explanation(task_id, format)
    }

    /// Exports the provenance chain of an earlier task as JSON.
    pub fn export_provenance(&self, task_id: &str) -> Result<String, TemporalError> {
        self.provenance.export_chain(task_id)
    }

    /// Clears all recorded provenance and restarts task numbering.
    pub fn reset(&mut self) {
        self.provenance.clear();
        self.task_counter = 0;
    }

    fn run_pipeline(
        &mut self,
        question: &str,
        level: ExtractionLevel,
        task_id: &str,
    ) -> Result<HybridResult, TemporalError> {
        // Extraction.
        let extraction = self.extractor.extract(question, level)?;
        let llm_confidence = extraction.confidence(DEFAULT_EXTRACTOR_CONFIDENCE);
        let extraction_step = self.provenance.record_llm_extraction(
            question,
            serde_json::to_value(&extraction.events)?,
            serde_json::to_value(&extraction.relations)?,
            llm_confidence,
            json!({ "level": level.level(), "raw_answer": extraction.raw_answer }),
        )?;

        // Lift into a fresh solver.
        let mut solver = Solver::with_config(self.solver_config);
        let report = lift_extraction(&extraction, &mut solver)?;
        let constraint_step = self.provenance.record_symbolic_constraint(
            &format!(
                "Converted {} extractor relations to Allen's algebra",
                extraction.relations.len()
            ),
            json!({
                "num_intervals": report.num_intervals,
                "num_constraints": report.num_constraints,
                "skipped": report.skipped,
            }),
            vec![extraction_step.clone()],
            1.0,
        )?;

        // Solve.
        let verdict = solver.propagate();
        let consistent = verdict.is_consistent();
        if consistent {
            solver.compute_interval_values()?;
        }
        let symbolic_answer = synthesize_answer(&solver, question, consistent);

        let mut solution = json!({
            "consistent": consistent,
            "intervals": intervals_snapshot(&solver),
            "answer": symbolic_answer,
        });
        if verdict == Consistency::Undecided {
            // Keep the cap exhaustion on record even though the verdict
            // is folded into "inconsistent" for answer selection.
            solution["error"] = Value::String(
                TemporalError::IterationCapExceeded {
                    cap: self.solver_config.max_propagation_passes,
                }
                .to_string(),
            );
        }
        let solving_step = self.provenance.record_symbolic_solving(
            &format!("Symbolic temporal reasoning (level {level})"),
            solution,
            vec![extraction_step.clone(), constraint_step],
            consistent,
        )?;

        // Verification.
        let llm_answer = extraction.raw_answer.clone();
        let mut conflicts = Vec::new();
        if !consistent {
            conflicts.push(
                "Symbolic constraints are inconsistent - extractor may have produced conflicting information"
                    .to_owned(),
            );
        }
        let llm_numbers = integer_substrings(&llm_answer);
        let symbolic_numbers = integer_substrings(&symbolic_answer);
        if !llm_numbers.is_empty()
            && !symbolic_numbers.is_empty()
            && llm_numbers != symbolic_numbers
        {
            conflicts.push(format!(
                "Numerical mismatch: extractor found {llm_numbers:?}, symbolic found {symbolic_numbers:?}"
            ));
        }

        let verified = conflicts.is_empty();
        let verification_step = self.provenance.record_verification(
            "Compare extractor and symbolic answers",
            verified,
            json!({
                "llm_answer": llm_answer,
                "symbolic_answer": symbolic_answer,
                "conflicts": conflicts,
            }),
            vec![solving_step],
        )?;

        // Reconciliation: prefer the symbolic side whenever it is
        // consistent; fall back to the extractor otherwise.
        let verified_answer = if verified {
            if consistent {
                symbolic_answer.clone()
            } else {
                llm_answer.clone()
            }
        } else if consistent {
            self.provenance.record_conflict_resolution(
                "Resolved using symbolic reasoning (more reliable)",
                json!({ "chosen": "symbolic", "reason": "Symbolic constraints are consistent" }),
                vec![verification_step],
            )?;
            symbolic_answer.clone()
        } else {
            // The symbolic side failed; fall back to whatever the
            // extractor said, or to the inconsistency report when it
            // said nothing at all.
            self.provenance.record_conflict_resolution(
                "Using extractor answer (symbolic inconsistent)",
                json!({ "chosen": "llm", "reason": "Symbolic constraints inconsistent" }),
                vec![verification_step],
            )?;
            if llm_answer.is_empty() {
                symbolic_answer.clone()
            } else {
                llm_answer.clone()
            }
        };

        // Confidence.
        let symbolic_confidence = if consistent { 1.0 } else { 0.5 };
        let confidence = if verified && consistent {
            llm_confidence.max(symbolic_confidence)
        } else if consistent {
            symbolic_confidence
        } else {
            llm_confidence * 0.7
        };

        self.provenance
            .end_task(task_id, verified_answer.clone(), true, None);
        let explanation = self
            .provenance
            .generate_explanation(task_id, ExplanationFormat::Text)?;

        Ok(HybridResult {
            question: question.to_owned(),
            llm_answer,
            symbolic_answer: Some(symbolic_answer),
            verified_answer,
            confidence,
            llm_confidence,
            symbolic_confidence,
            used_symbolic: consistent,
            conflicts_detected: conflicts,
            explanation,
            provenance_id: task_id.to_owned(),
        })
    }

    fn error_result(&self, question: &str, task_id: &str, err: &TemporalError) -> HybridResult {
        let error_msg = format!("Error in reasoning: {err}");

        HybridResult {
            question: question.to_owned(),
            llm_answer: "Error occurred".to_owned(),
            symbolic_answer: None,
            verified_answer: format!("Could not determine answer: {error_msg}"),
            confidence: 0.0,
            llm_confidence: 0.0,
            symbolic_confidence: 0.0,
            used_symbolic: false,
            conflicts_detected: vec![error_msg.clone()],
            explanation: error_msg,
            provenance_id: task_id.to_owned(),
        }
    }
}

/// Synthesizes a short natural-language sentence from solver state,
/// steered by the question's intent.
fn synthesize_answer(solver: &Solver, question: &str, consistent: bool) -> String {
    if !consistent {
        return "The temporal constraints are inconsistent.".to_owned();
    }

    let question = question.to_lowercase();
    let names: Vec<&str> = solver
        .intervals_in_order()
        .map(|interval| interval.name.as_str())
        .collect();

    if question.contains("how long") || question.contains("duration") {
        for interval in solver.intervals_in_order() {
            if let Some(duration) = interval.duration {
                return format_duration(duration);
            }
        }
        // No duration could be pinned down; name the intervals instead.
        if !names.is_empty() {
            return format!("The temporal sequence involves: {}.", names.join(", "));
        }
    }

    if question.contains("order") || question.contains("sequence") {
        return format!("The temporal sequence involves: {}.", names.join(", "));
    }

    if question.contains("when") {
        for interval in solver.intervals_in_order() {
            if let Some(start) = interval.start {
                return format!("{} starts at time {}.", interval.name, start);
            }
        }
    }

    "Symbolic reasoning completed successfully.".to_owned()
}

/// Formats a duration in seconds as minutes, hours or days, whichever
/// reads most naturally.
fn format_duration(seconds: f64) -> String {
    let hours = seconds / 3600.0;
    if hours < 1.0 {
        format!("The duration is {:.0} minutes.", seconds / 60.0)
    } else if hours < 24.0 {
        format!("The duration is {hours:.1} hours.")
    } else {
        format!("The duration is {:.1} days.", hours / 24.0)
    }
}

fn intervals_snapshot(solver: &Solver) -> Value {
    let mut intervals = serde_json::Map::new();
    for interval in solver.intervals_in_order() {
        intervals.insert(
            interval.name.clone(),
            json!({
                "start": interval.start,
                "end": interval.end,
                "duration": interval.duration,
            }),
        );
    }
    Value::Object(intervals)
}

/// The set of maximal digit runs in `text`, used as a crude numerical
/// fingerprint when comparing the two answers.
fn integer_substrings(text: &str) -> BTreeSet<String> {
    let mut numbers = BTreeSet::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            numbers.insert(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        numbers.insert(current);
    }

    numbers
}
