//! In 1983 James F. Allen published a paper in which he proposed [thirteen basic relations between time intervals][allen-interval-algebra]
//! that are distinct, exhaustive, and qualitative:
//!
//! > Allen, J. F. (1983).
//! > Maintaining knowledge about temporal intervals.
//! > Communications of the ACM, 26(11), 832-843.
//!
//! This crate couples that algebra with an imprecise natural-language
//! extractor to answer temporal-reasoning questions verifiably:
//!
//! - [`Relation`] and [`RelationSet`] model the thirteen relations and
//!   disjunctive sets of them, with converse and sound composition;
//! - [`Solver`] maintains named [`TimeInterval`]s plus pairwise
//!   disjunctive constraints, closes them under path consistency and
//!   infers concrete bounds where a unique answer exists;
//! - [`ProvenanceLog`] records every reasoning step as an append-only
//!   DAG for explanation, replay and auditing;
//! - [`HybridReasoner`] runs the pipeline end to end: extract → lift →
//!   solve → verify → reconcile → answer, behind any [`Extractor`].
//!
//! # Examples
//!
//! Determining the relation between two concrete intervals:
//!
//! ```
//! use hybrid_temporal_reasoner::{Relation, TimeInterval};
//!
//! let conference = TimeInterval::with_bounds("conference", 9.0, 12.0);
//! let keynote = TimeInterval::with_bounds("keynote", 9.5, 10.5);
//!
//! assert_eq!(
//!     Relation::try_from_intervals(&keynote, &conference).unwrap(),
//!     Relation::Contains { is_inverted: true }, // "during"
//! );
//! ```
//!
//! Solving for bounds a constraint network only implies:
//!
//! ```
//! use hybrid_temporal_reasoner::{Relation, Solver, TimeInterval};
//!
//! let mut solver = Solver::new();
//! solver.add_interval(TimeInterval::with_bounds("briefing", 0.0, 10.0)).unwrap();
//! solver.add_interval(TimeInterval::with_duration("mission", 5.0)).unwrap();
//! solver
//!     .add_single_relation("briefing", "mission", Relation::Meets { is_inverted: false })
//!     .unwrap();
//!
//! assert!(solver.propagate().is_consistent());
//! solver.compute_interval_values().unwrap();
//!
//! let mission = solver.interval("mission").unwrap();
//! assert_eq!((mission.start, mission.end), (Some(10.0), Some(15.0)));
//! ```
//!
//! [allen-interval-algebra]: https://en.wikipedia.org/wiki/Allen%27s_interval_algebra

#![warn(missing_docs)]

mod composition;
mod error;
mod extract;
mod interval;
mod provenance;
mod reasoner;
mod relation;
mod relation_set;
mod solver;

pub use self::{
    error::*, extract::*, interval::*, provenance::*, reasoner::*, relation::*, relation_set::*,
    solver::*,
};
