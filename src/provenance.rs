use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::TemporalError;

/// Characters of an input/output snapshot shown per explanation line.
const SNAPSHOT_TRUNCATION: usize = 100;

/// The kind of reasoning step a provenance node records.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// The extractor turned text into events and relations.
    LlmExtraction,
    /// The extractor inferred something beyond plain extraction.
    LlmInference,
    /// A constraint was added to the symbolic solver.
    SymbolicConstraint,
    /// The solver propagated constraints.
    SymbolicPropagation,
    /// The solver produced a verdict and interval values.
    SymbolicSolving,
    /// Extractor and solver outputs were compared.
    Verification,
    /// A disagreement between the two sides was resolved.
    ConflictResolution,
    /// The final answer was selected.
    FinalAnswer,
}

impl StepKind {
    /// The serialized snake_case tag, e.g. `llm_extraction`.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::LlmExtraction => "llm_extraction",
            Self::LlmInference => "llm_inference",
            Self::SymbolicConstraint => "symbolic_constraint",
            Self::SymbolicPropagation => "symbolic_propagation",
            Self::SymbolicSolving => "symbolic_solving",
            Self::Verification => "verification",
            Self::ConflictResolution => "conflict_resolution",
            Self::FinalAnswer => "final_answer",
        }
    }

    /// Weight of this step kind in the confidence rollup.
    const fn confidence_weight(&self) -> f64 {
        match self {
            Self::LlmExtraction => 0.3,
            Self::SymbolicConstraint => 0.2,
            Self::SymbolicSolving => 0.3,
            Self::Verification => 0.2,
            _ => 0.1,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One reasoning step, immutable once recorded.
///
/// Parent links are by id rather than by pointer, so chains serialize
/// without cycles and survive export/import unchanged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvenanceNode {
    /// Unique id within the chain, `"{task_id}_step_{n}"`.
    pub step_id: String,
    /// What kind of step this was.
    pub step_type: StepKind,
    /// When the step was recorded.
    pub timestamp: DateTime<Utc>,
    /// Human-readable description.
    pub description: String,
    /// Snapshot of the step's input.
    pub input_data: Value,
    /// Snapshot of the step's output.
    pub output_data: Value,
    /// Confidence in this step, in `[0, 1]`.
    pub confidence: f64,
    /// Ids of earlier steps this one depends on.
    pub parent_ids: Vec<String>,
    /// Free-form extra data.
    pub metadata: Value,
}

/// The complete provenance chain for one reasoning task.
///
/// Append-only while the task runs; frozen once
/// [`ProvenanceLog::end_task`] stamps it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvenanceChain {
    /// The owning task's id.
    pub task_id: String,
    /// The question or job the task answered.
    pub task_description: String,
    /// When the task started.
    pub start_time: DateTime<Utc>,
    /// When the task ended, if it has.
    pub end_time: Option<DateTime<Utc>>,
    /// Recorded steps, in pipeline order.
    pub nodes: Vec<ProvenanceNode>,
    /// The answer the task settled on.
    pub final_answer: Option<String>,
    /// Whether the task completed without error.
    pub success: bool,
    /// The error that ended the task, if any.
    pub error_message: Option<String>,
}

impl ProvenanceChain {
    /// Looks a node up by step id.
    pub fn node(&self, step_id: &str) -> Option<&ProvenanceNode> {
        self.nodes.iter().find(|node| node.step_id == step_id)
    }

    /// All nodes of the given kind, in recording order.
    pub fn nodes_by_type(&self, step_type: StepKind) -> Vec<&ProvenanceNode> {
        self.nodes
            .iter()
            .filter(|node| node.step_type == step_type)
            .collect()
    }

    /// Serializes the chain as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, TemporalError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reconstructs a chain from its JSON export.
    pub fn from_json(json: &str) -> Result<Self, TemporalError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Output format for [`ProvenanceLog::generate_explanation`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExplanationFormat {
    /// A numbered plain-text step list.
    #[default]
    Text,
    /// The same content in a minimal tagged hypertext form.
    Html,
}

/// Records provenance chains for reasoning tasks, one chain per task.
///
/// A log owns every chain it ever recorded, which is what makes post-hoc
/// explanation of earlier answers possible. Only one task is active at a
/// time; step ids count up monotonically within each chain.
#[derive(Clone, Debug, Default)]
pub struct ProvenanceLog {
    chains: HashMap<String, ProvenanceChain>,
    current: Option<String>,
    step_counter: u64,
}

impl ProvenanceLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and activates a chain for a new task.
    ///
    /// Fails with [`TemporalError::DuplicateTask`] if a chain under the
    /// same id already exists.
    pub fn start_task(
        &mut self,
        task_id: impl Into<String>,
        task_description: impl Into<String>,
    ) -> Result<(), TemporalError> {
        let task_id = task_id.into();
        if self.chains.contains_key(&task_id) {
            return Err(TemporalError::DuplicateTask { task_id });
        }

        info!(task_id = %task_id, "provenance task started");

        let chain = ProvenanceChain {
            task_id: task_id.clone(),
            task_description: task_description.into(),
            start_time: Utc::now(),
            end_time: None,
            nodes: Vec::new(),
            final_answer: None,
            success: true,
            error_message: None,
        };
        self.chains.insert(task_id.clone(), chain);
        self.current = Some(task_id);
        self.step_counter = 0;
        Ok(())
    }

    /// Stamps a chain as terminal with its final answer and outcome.
    ///
    /// Unknown task ids are ignored.
    pub fn end_task(
        &mut self,
        task_id: &str,
        final_answer: impl Into<String>,
        success: bool,
        error_message: Option<String>,
    ) {
        if let Some(chain) = self.chains.get_mut(task_id) {
            chain.end_time = Some(Utc::now());
            chain.final_answer = Some(final_answer.into());
            chain.success = success;
            chain.error_message = error_message;
            info!(task_id = %task_id, success, "provenance task ended");
        }
        if self.current.as_deref() == Some(task_id) {
            self.current = None;
        }
    }

    /// Appends a step to the active chain and returns its id.
    ///
    /// Fails with [`TemporalError::NoActiveTask`] when no task is open.
    #[allow(clippy::too_many_arguments)]
    pub fn record_step(
        &mut self,
        step_type: StepKind,
        description: impl Into<String>,
        input_data: Value,
        output_data: Value,
        confidence: f64,
        parent_ids: Vec<String>,
        metadata: Value,
    ) -> Result<String, TemporalError> {
        let task_id = self.current.clone().ok_or(TemporalError::NoActiveTask)?;
        let chain = self
            .chains
            .get_mut(&task_id)
            .ok_or(TemporalError::NoActiveTask)?;

        self.step_counter += 1;
        let step_id = format!("{}_step_{}", task_id, self.step_counter);

        chain.nodes.push(ProvenanceNode {
            step_id: step_id.clone(),
            step_type,
            timestamp: Utc::now(),
            description: description.into(),
            input_data,
            output_data,
            confidence,
            parent_ids,
            metadata,
        });

        Ok(step_id)
    }

    /// Records an extraction step with the standard payload shape.
    pub fn record_llm_extraction(
        &mut self,
        query: &str,
        events: Value,
        relations: Value,
        confidence: f64,
        metadata: Value,
    ) -> Result<String, TemporalError> {
        let num_events = events.as_array().map_or(0, Vec::len);
        let num_relations = relations.as_array().map_or(0, Vec::len);

        self.record_step(
            StepKind::LlmExtraction,
            format!("LLM extracted {num_events} events and {num_relations} relations"),
            serde_json::json!({ "query": query }),
            serde_json::json!({ "events": events, "relations": relations }),
            confidence,
            Vec::new(),
            metadata,
        )
    }

    /// Records a constraint-addition step.
    pub fn record_symbolic_constraint(
        &mut self,
        constraint_desc: &str,
        constraint_data: Value,
        parent_ids: Vec<String>,
        confidence: f64,
    ) -> Result<String, TemporalError> {
        self.record_step(
            StepKind::SymbolicConstraint,
            format!("Added symbolic constraint: {constraint_desc}"),
            serde_json::json!({ "constraint_description": constraint_desc }),
            serde_json::json!({ "constraint": constraint_data }),
            confidence,
            parent_ids,
            Value::Null,
        )
    }

    /// Records a solving step; its confidence is 1.0 on success, 0.0
    /// otherwise.
    pub fn record_symbolic_solving(
        &mut self,
        problem_desc: &str,
        solution: Value,
        parent_ids: Vec<String>,
        success: bool,
    ) -> Result<String, TemporalError> {
        self.record_step(
            StepKind::SymbolicSolving,
            format!("Solved symbolic constraints: {problem_desc}"),
            serde_json::json!({ "problem": problem_desc }),
            serde_json::json!({ "solution": solution, "success": success }),
            if success { 1.0 } else { 0.0 },
            parent_ids,
            Value::Null,
        )
    }

    /// Records a verification step; its confidence is 1.0 when verified,
    /// 0.5 otherwise.
    pub fn record_verification(
        &mut self,
        verification_desc: &str,
        verified: bool,
        details: Value,
        parent_ids: Vec<String>,
    ) -> Result<String, TemporalError> {
        self.record_step(
            StepKind::Verification,
            format!("Verification: {verification_desc}"),
            serde_json::json!({ "verification_type": verification_desc }),
            serde_json::json!({ "verified": verified, "details": details }),
            if verified { 1.0 } else { 0.5 },
            parent_ids,
            Value::Null,
        )
    }

    /// Records a conflict-resolution step at the fixed 0.9 confidence.
    pub fn record_conflict_resolution(
        &mut self,
        conflict_desc: &str,
        resolution: Value,
        parent_ids: Vec<String>,
    ) -> Result<String, TemporalError> {
        self.record_step(
            StepKind::ConflictResolution,
            format!("Resolved conflict: {conflict_desc}"),
            serde_json::json!({ "conflict": conflict_desc }),
            serde_json::json!({ "resolution": resolution }),
            0.9,
            parent_ids,
            Value::Null,
        )
    }

    /// Looks a chain up by task id.
    pub fn chain(&self, task_id: &str) -> Option<&ProvenanceChain> {
        self.chains.get(task_id)
    }

    /// Number of recorded chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Returns `true` iff no chain has been recorded.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Drops every chain and deactivates the current task.
    pub fn clear(&mut self) {
        self.chains.clear();
        self.current = None;
        self.step_counter = 0;
    }

    /// Renders a chain as a deterministic human-readable explanation.
    pub fn generate_explanation(
        &self,
        task_id: &str,
        format: ExplanationFormat,
    ) -> Result<String, TemporalError> {
        let chain = self.chains.get(task_id).ok_or(TemporalError::UnknownTask {
            task_id: task_id.to_owned(),
        })?;

        Ok(match format {
            ExplanationFormat::Text => text_explanation(chain),
            ExplanationFormat::Html => html_explanation(chain),
        })
    }

    /// Weighted mean of node confidences for a task.
    ///
    /// Extraction and solving steps weigh 0.3 each, constraint and
    /// verification steps 0.2, everything else 0.1; kinds absent from
    /// the chain contribute no weight. Unknown tasks and empty chains
    /// score 0.0.
    pub fn confidence_score(&self, task_id: &str) -> f64 {
        let Some(chain) = self.chains.get(task_id) else {
            return 0.0;
        };
        if chain.nodes.is_empty() {
            return 0.0;
        }

        let mut total_weight = 0.0;
        let mut weighted_confidence = 0.0;
        for node in &chain.nodes {
            let weight = node.step_type.confidence_weight();
            weighted_confidence += node.confidence * weight;
            total_weight += weight;
        }

        if total_weight == 0.0 {
            0.0
        } else {
            weighted_confidence / total_weight
        }
    }

    /// The complete reasoning path leading to a step: the transitive
    /// closure of its parents, in chronological order, each node at most
    /// once.
    pub fn reasoning_path(&self, task_id: &str, step_id: &str) -> Vec<&ProvenanceNode> {
        let Some(chain) = self.chains.get(task_id) else {
            return Vec::new();
        };
        let Some(target) = chain.node(step_id) else {
            return Vec::new();
        };

        let mut path = vec![target];
        let mut visited: HashSet<&str> = HashSet::from([target.step_id.as_str()]);
        let mut to_process: VecDeque<&str> =
            target.parent_ids.iter().map(String::as_str).collect();

        while let Some(parent_id) = to_process.pop_front() {
            if !visited.insert(parent_id) {
                continue;
            }
            if let Some(parent) = chain.node(parent_id) {
                path.push(parent);
                to_process.extend(parent.parent_ids.iter().map(String::as_str));
            }
        }

        path.reverse();
        path
    }

    /// Exports a chain as pretty-printed JSON.
    pub fn export_chain(&self, task_id: &str) -> Result<String, TemporalError> {
        self.chains
            .get(task_id)
            .ok_or(TemporalError::UnknownTask {
                task_id: task_id.to_owned(),
            })?
            .to_json()
    }

    /// Imports a chain from its JSON export, keyed by its `task_id`,
    /// which is returned. An existing chain under the same id is
    /// replaced.
    pub fn import_chain(&mut self, json: &str) -> Result<String, TemporalError> {
        let chain = ProvenanceChain::from_json(json)?;
        let task_id = chain.task_id.clone();
        self.chains.insert(task_id.clone(), chain);
        Ok(task_id)
    }
}

fn summarize(value: &Value) -> String {
    let summary = value.to_string();
    if summary.chars().count() > SNAPSHOT_TRUNCATION {
        let truncated: String = summary.chars().take(SNAPSHOT_TRUNCATION).collect();
        format!("{truncated}...")
    } else {
        summary
    }
}

fn text_explanation(chain: &ProvenanceChain) -> String {
    let mut lines = Vec::new();
    let rule = "=".repeat(80);
    let thin_rule = "-".repeat(80);

    lines.push(rule.clone());
    lines.push(format!("REASONING EXPLANATION: {}", chain.task_description));
    lines.push(rule.clone());
    lines.push(format!("Task ID: {}", chain.task_id));
    lines.push(format!("Started: {}", chain.start_time.to_rfc3339()));
    lines.push(format!(
        "Completed: {}",
        chain
            .end_time
            .map_or_else(|| "In Progress".to_owned(), |end| end.to_rfc3339())
    ));
    lines.push(format!(
        "Status: {}",
        if chain.success { "SUCCESS" } else { "FAILED" }
    ));
    if let Some(error) = &chain.error_message {
        lines.push(format!("Error: {error}"));
    }
    lines.push(String::new());

    lines.push("REASONING STEPS:".to_owned());
    lines.push(thin_rule.clone());

    for (i, node) in chain.nodes.iter().enumerate() {
        lines.push(format!(
            "\n{}. {}",
            i + 1,
            node.step_type.tag().to_uppercase().replace('_', " ")
        ));
        lines.push(format!("   ID: {}", node.step_id));
        lines.push(format!("   Description: {}", node.description));
        lines.push(format!("   Confidence: {:.2}", node.confidence));
        if !node.parent_ids.is_empty() {
            lines.push(format!("   Depends on: {}", node.parent_ids.join(", ")));
        }
        if !node.input_data.is_null() {
            lines.push(format!("   Input: {}", summarize(&node.input_data)));
        }
        if !node.output_data.is_null() {
            lines.push(format!("   Output: {}", summarize(&node.output_data)));
        }
    }

    lines.push(String::new());
    lines.push(thin_rule);
    lines.push(format!(
        "FINAL ANSWER: {}",
        chain
            .final_answer
            .clone()
            .unwrap_or_else(|| "Not yet determined".to_owned())
    ));
    lines.push(rule);

    lines.join("\n")
}

fn html_explanation(chain: &ProvenanceChain) -> String {
    let mut html = Vec::new();
    html.push("<div class='provenance-explanation'>".to_owned());
    html.push(format!(
        "<h2>Reasoning Explanation: {}</h2>",
        chain.task_description
    ));
    html.push(format!("<p><strong>Task ID:</strong> {}</p>", chain.task_id));
    html.push(format!(
        "<p><strong>Status:</strong> {}</p>",
        if chain.success { "SUCCESS" } else { "FAILED" }
    ));

    html.push("<ol class='reasoning-steps'>".to_owned());
    for node in &chain.nodes {
        let confidence_class = if node.confidence > 0.8 {
            "high"
        } else if node.confidence > 0.5 {
            "medium"
        } else {
            "low"
        };
        html.push(format!("<li class='step step-{}'>", node.step_type.tag()));
        html.push(format!(
            "<h4>{}</h4>",
            node.step_type.tag().replace('_', " ")
        ));
        html.push(format!("<p>{}</p>", node.description));
        html.push(format!(
            "<p class='confidence confidence-{confidence_class}'>Confidence: {:.2}</p>",
            node.confidence
        ));
        html.push("</li>".to_owned());
    }
    html.push("</ol>".to_owned());

    html.push("<div class='final-answer'>".to_owned());
    html.push("<h3>Final Answer</h3>".to_owned());
    html.push(format!(
        "<p>{}</p>",
        chain
            .final_answer
            .clone()
            .unwrap_or_else(|| "Not yet determined".to_owned())
    ));
    html.push("</div>".to_owned());

    html.push("</div>".to_owned());
    html.join("\n")
}
