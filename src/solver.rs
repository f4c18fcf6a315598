use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{Relation, RelationSet, TemporalError, TimeInterval};

/// Tuning knobs for the solver's fixpoint loops.
///
/// The caps guard against non-termination; both loops converge in a
/// handful of passes on realistic constraint graphs. `gap` is the margin
/// used when bound inference places an interval strictly before or after
/// a known one (there is no unique answer, so the solver picks the
/// closest point at this distance).
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    /// Maximum outer passes of the path-consistency closure. Default 100.
    pub max_propagation_passes: usize,
    /// Maximum passes of the numeric bound-inference loop. Default 50.
    pub max_inference_passes: usize,
    /// Margin for strict before/after bound inference. Default 1.0.
    pub gap: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_propagation_passes: 100,
            max_inference_passes: 50,
            gap: 1.0,
        }
    }
}

/// Verdict of the path-consistency closure.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Consistency {
    /// The constraint graph is path-consistent and every relation set is
    /// non-empty.
    ///
    /// Path consistency is necessary but not sufficient for full
    /// consistency over the Allen algebra; this verdict is the accepted
    /// approximation.
    Consistent,
    /// Some relation set was emptied; the constraints contradict each
    /// other.
    Inconsistent,
    /// The closure did not converge within the configured pass cap.
    /// Callers treat this as inconsistent for answer selection.
    Undecided,
}

impl Consistency {
    /// Returns `true` only for [`Consistency::Consistent`].
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent)
    }
}

/// A temporal constraint-satisfaction problem: named intervals plus
/// pairwise disjunctive Allen constraints.
///
/// Constraints are stored once per unordered pair, keyed in lexicographic
/// name order; lookups on the reverse orientation return the pointwise
/// converse set. [`Solver::propagate`] closes the graph under path
/// consistency, and [`Solver::compute_interval_values`] fills in numeric
/// bounds that singleton constraints against complete intervals
/// determine.
///
/// ```
/// use hybrid_temporal_reasoner::{Relation, Solver, TimeInterval};
///
/// let mut solver = Solver::new();
/// solver.add_interval(TimeInterval::with_bounds("setup", 0.0, 10.0)).unwrap();
/// solver.add_interval(TimeInterval::with_duration("run", 5.0)).unwrap();
/// solver
///     .add_single_relation("setup", "run", Relation::Meets { is_inverted: false })
///     .unwrap();
///
/// assert!(solver.propagate().is_consistent());
/// solver.compute_interval_values().unwrap();
///
/// let run = solver.interval("run").unwrap();
/// assert_eq!((run.start, run.end), (Some(10.0), Some(15.0)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Solver {
    config: SolverConfig,
    intervals: HashMap<String, TimeInterval>,
    order: Vec<String>,
    constraints: HashMap<(String, String), RelationSet>,
}

impl Solver {
    /// Creates an empty solver with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Creates an empty solver with an explicit configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config,
            intervals: HashMap::new(),
            order: Vec::new(),
            constraints: HashMap::new(),
        }
    }

    /// Registers an interval by name, normalizing it first.
    ///
    /// A second interval under the same name replaces the first (names
    /// are unique per task by caller contract).
    pub fn add_interval(&mut self, mut interval: TimeInterval) -> Result<(), TemporalError> {
        interval.normalize()?;
        if self.intervals.insert(interval.name.clone(), interval.clone()).is_none() {
            self.order.push(interval.name);
        }
        Ok(())
    }

    /// Constrains the ordered pair `(a, b)` to the given relation set,
    /// intersecting with any constraint already recorded for the pair.
    ///
    /// An intersection that comes up empty is *not* an error here: the
    /// solver is merely marked provisionally inconsistent, and the next
    /// [`Solver::propagate`] reports it.
    pub fn add_constraint(
        &mut self,
        a: &str,
        b: &str,
        relations: RelationSet,
    ) -> Result<(), TemporalError> {
        for name in [a, b] {
            if !self.intervals.contains_key(name) {
                return Err(TemporalError::UnknownInterval {
                    name: name.to_owned(),
                });
            }
        }

        let (key, oriented) = self.orient(a, b, relations);
        let entry = self.constraints.entry(key).or_insert(RelationSet::FULL);
        *entry = entry.intersection(oriented);

        if entry.is_empty() {
            debug!(a = %a, b = %b, "constraint intersection emptied; solver is now inconsistent");
        }

        Ok(())
    }

    /// Shorthand for [`Solver::add_constraint`] with a singleton set.
    pub fn add_single_relation(
        &mut self,
        a: &str,
        b: &str,
        relation: Relation,
    ) -> Result<(), TemporalError> {
        self.add_constraint(a, b, RelationSet::singleton(relation))
    }

    /// Returns the recorded relation set for the ordered pair `(a, b)`,
    /// or `None` if no constraint has been recorded.
    pub fn relation(&self, a: &str, b: &str) -> Option<RelationSet> {
        let key = canonical_key(a, b);
        let stored = self.constraints.get(&key)?;
        if key.0 == a {
            Some(*stored)
        } else {
            Some(stored.converse())
        }
    }

    /// Looks an interval up by name.
    pub fn interval(&self, name: &str) -> Option<&TimeInterval> {
        self.intervals.get(name)
    }

    /// The interval map (names to possibly partial intervals).
    pub fn intervals(&self) -> &HashMap<String, TimeInterval> {
        &self.intervals
    }

    /// Iterates the intervals in registration order.
    pub fn intervals_in_order(&self) -> impl Iterator<Item = &TimeInterval> {
        self.order.iter().filter_map(|name| self.intervals.get(name))
    }

    /// Number of registered intervals.
    pub fn num_intervals(&self) -> usize {
        self.intervals.len()
    }

    /// Number of recorded pairwise constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Closes the constraint graph under path consistency.
    ///
    /// Repeats until fixpoint: for every ordered triple `(i, j, k)` of
    /// constrained names, tightens `R_ik` by intersecting it with
    /// `compose(R_ij, R_jk)`. Returns
    /// [`Consistency::Inconsistent`] as soon as any relation set empties,
    /// and [`Consistency::Undecided`] if the configured pass cap runs out
    /// before the fixpoint is reached.
    ///
    /// The closure is idempotent: a second call on a consistent solver
    /// leaves every constraint set unchanged.
    pub fn propagate(&mut self) -> Consistency {
        if self.constraints.values().any(RelationSet::is_empty) {
            return Consistency::Inconsistent;
        }

        let names: Vec<String> = self
            .order
            .iter()
            .filter(|name| {
                self.constraints
                    .keys()
                    .any(|(a, b)| a == *name || b == *name)
            })
            .cloned()
            .collect();

        for pass in 0..self.config.max_propagation_passes {
            let mut changed = false;

            for i in &names {
                for j in &names {
                    if i == j {
                        continue;
                    }
                    for k in &names {
                        if k == i || k == j {
                            continue;
                        }

                        let (Some(r_ij), Some(r_jk)) = (self.relation(i, j), self.relation(j, k))
                        else {
                            continue;
                        };
                        let Some(r_ik) = self.relation(i, k) else {
                            continue;
                        };

                        let composed = r_ij.compose(r_jk);
                        let tightened = r_ik.intersection(composed);

                        if tightened.is_empty() {
                            debug!(i = %i, k = %k, "relation set emptied during propagation");
                            return Consistency::Inconsistent;
                        }

                        if tightened.len() < r_ik.len() {
                            trace!(i = %i, k = %k, from = %r_ik, to = %tightened, "tightened constraint");
                            let (key, oriented) = self.orient(i, k, tightened);
                            self.constraints.insert(key, oriented);
                            changed = true;
                        }
                    }
                }
            }

            if !changed {
                debug!(passes = pass + 1, "path consistency reached fixpoint");
                return Consistency::Consistent;
            }
        }

        debug!(
            cap = self.config.max_propagation_passes,
            "path consistency exhausted its pass cap"
        );
        Consistency::Undecided
    }

    /// Fills numeric values of incomplete intervals using singleton
    /// constraints against already complete partners.
    ///
    /// Only `None` fields are ever written; previously known values are
    /// never overwritten, so repeated calls are monotonic. Disjunctive
    /// (non-singleton) relations never drive inference. Returns the
    /// interval map, which may still contain partial intervals.
    pub fn compute_interval_values(
        &mut self,
    ) -> Result<&HashMap<String, TimeInterval>, TemporalError> {
        let gap = self.config.gap;

        for _ in 0..self.config.max_inference_passes {
            let mut changed = false;

            let complete: Vec<TimeInterval> = self
                .intervals_in_order()
                .filter(|interval| interval.is_complete())
                .cloned()
                .collect();
            let incomplete: Vec<String> = self
                .order
                .iter()
                .filter(|name| {
                    self.intervals
                        .get(*name)
                        .is_some_and(|interval| !interval.is_complete())
                })
                .cloned()
                .collect();

            if incomplete.is_empty() {
                return Ok(&self.intervals);
            }

            for name in &incomplete {
                for partner in &complete {
                    if *name == partner.name {
                        continue;
                    }
                    let Some(relation) =
                        self.relation(name, &partner.name).and_then(|set| set.as_singleton())
                    else {
                        continue;
                    };

                    let Some(interval) = self.intervals.get_mut(name) else {
                        continue;
                    };
                    if infer_bounds(interval, partner, relation, gap) {
                        interval.normalize()?;
                        trace!(
                            name = %name,
                            partner = %partner.name,
                            relation = %relation,
                            "inferred interval bounds"
                        );
                        changed = true;
                    }

                    if self.intervals.get(name).is_some_and(TimeInterval::is_complete) {
                        break;
                    }
                }
            }

            if !changed {
                return Ok(&self.intervals);
            }
        }

        // The loop is monotonic (fields only go from unknown to known),
        // so running out of passes means the cap is set far too low for
        // the problem size.
        Err(TemporalError::IterationCapExceeded {
            cap: self.config.max_inference_passes,
        })
    }

    fn orient(&self, a: &str, b: &str, relations: RelationSet) -> ((String, String), RelationSet) {
        let key = canonical_key(a, b);
        if key.0 == a {
            (key, relations)
        } else {
            (key, relations.converse())
        }
    }
}

fn canonical_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

/// Applies the single-relation inference rules; returns `true` iff a
/// field was filled in.
fn infer_bounds(
    interval: &mut TimeInterval,
    partner: &TimeInterval,
    relation: Relation,
    gap: f64,
) -> bool {
    let (partner_start, partner_end) = match (partner.start, partner.end) {
        (Some(start), Some(end)) => (start, end),
        _ => return false,
    };

    match relation {
        // The interval ends somewhere strictly before the partner
        // starts; gap picks the concrete point.
        Relation::Precedes { is_inverted: false } if interval.end.is_none() => {
            interval.end = Some(partner_start - gap);
            true
        }
        Relation::Precedes { is_inverted: true } if interval.start.is_none() => {
            interval.start = Some(partner_end + gap);
            true
        }
        Relation::Meets { is_inverted: false } if interval.end.is_none() => {
            interval.end = Some(partner_start);
            true
        }
        Relation::Meets { is_inverted: true } if interval.start.is_none() => {
            interval.start = Some(partner_end);
            true
        }
        Relation::Equals => {
            let mut filled = false;
            if interval.start.is_none() {
                interval.start = Some(partner_start);
                filled = true;
            }
            if interval.end.is_none() {
                interval.end = Some(partner_end);
                filled = true;
            }
            filled
        }
        Relation::Starts { is_inverted: false } if interval.start.is_none() => {
            interval.start = Some(partner_start);
            true
        }
        Relation::Finishes { is_inverted: false } if interval.end.is_none() => {
            interval.end = Some(partner_end);
            true
        }
        _ => false,
    }
}
