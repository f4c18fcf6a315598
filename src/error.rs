/// Error type covering every failure the reasoning pipeline can surface.
///
/// All variants are recoverable: the orchestrator catches them at the
/// pipeline boundary and degrades the answer rather than panicking.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum TemporalError {
    /// The supplied `start`/`end`/`duration` values contradict each other,
    /// or the interval would be degenerate (zero or negative width).
    #[error("ill-formed interval `{name}`: {detail}")]
    IllFormedInterval {
        /// Name of the offending interval.
        name: String,
        /// What the contradiction was.
        detail: String,
    },
    /// A constraint referenced an interval name that was never registered.
    #[error("unknown interval `{name}`")]
    UnknownInterval {
        /// The unregistered name.
        name: String,
    },
    /// Path consistency emptied some relation set.
    #[error("temporal constraints are inconsistent")]
    InconsistentConstraints,
    /// A fixpoint loop did not converge within its configured pass cap.
    #[error("iteration cap of {cap} passes exceeded")]
    IterationCapExceeded {
        /// The cap that was exhausted.
        cap: usize,
    },
    /// A provenance step was recorded while no task was active.
    #[error("no active task; call start_task first")]
    NoActiveTask,
    /// A provenance task was started under an id that is already in use.
    #[error("task `{task_id}` already exists")]
    DuplicateTask {
        /// The colliding task id.
        task_id: String,
    },
    /// A provenance operation referenced a task id with no recorded chain.
    #[error("no provenance chain found for task `{task_id}`")]
    UnknownTask {
        /// The unknown task id.
        task_id: String,
    },
    /// A time or relation string did not match the expected grammar.
    #[error("could not parse `{text}`")]
    ParseFailure {
        /// The offending input.
        text: String,
    },
    /// The extractor raised, or returned a payload the adapter could not use.
    #[error("extractor failure: {0}")]
    ExtractorFailure(String),
    /// Provenance export or import could not (de)serialize.
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TemporalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
