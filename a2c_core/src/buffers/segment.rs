//! Fixed-length on-policy segment.
//!
//! Key characteristics:
//! - Owned arena of flat columns, one row per transition
//! - Interleaved step-major layout (`index = t * n_envs + env`)
//! - Explicit cursor and phase; consumed once per learning pass
//! - Full-segment views are borrowed, mini-batches are gathered copies

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::algorithms::gae::{compute_advantages, AdvantageInputs};
use crate::config::A2CConfig;
use crate::core::transition::{StepShape, TransitionStep};
use crate::error::{ensure_len, A2CError, Result};

/// Segment parameters, usually derived from [`A2CConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    /// Timesteps per segment (N).
    pub capacity: usize,
    /// Mini-batches yielded by [`Segment::get`].
    pub batch_iterations: usize,
    /// Transitions per mini-batch; `None` takes the whole segment.
    pub batch_size: Option<usize>,
    pub discount_factor: f32,
    pub trace_decay: f32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self::from(&A2CConfig::default())
    }
}

impl From<&A2CConfig> for SegmentConfig {
    fn from(config: &A2CConfig) -> Self {
        Self {
            capacity: config.segment_size,
            batch_iterations: config.batch_iterations,
            batch_size: config.batch_size,
            discount_factor: config.discount_factor,
            trace_decay: config.trace_decay,
        }
    }
}

/// Lifecycle of the current segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Cursor below capacity.
    Filling,
    /// Cursor at capacity, returns not computed yet.
    Full,
    /// Advantages and returns are valid until `finish()`.
    ReturnsComputed,
}

/// Named column of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Observations,
    Actions,
    NextObservations,
    Rewards,
    Resets,
    Terminations,
    LogProbs,
    Values,
    NextValues,
    Advantages,
    Returns,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Observations => "observations",
            Field::Actions => "actions",
            Field::NextObservations => "next_observations",
            Field::Rewards => "rewards",
            Field::Resets => "resets",
            Field::Terminations => "terminations",
            Field::LogProbs => "log_probs",
            Field::Values => "values",
            Field::NextValues => "next_values",
            Field::Advantages => "advantages",
            Field::Returns => "returns",
        }
    }

    /// Fields only written by `compute_returns`.
    fn is_derived(&self) -> bool {
        matches!(
            self,
            Field::Values | Field::NextValues | Field::Advantages | Field::Returns
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column data of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Column<'a> {
    /// `width` floats per row.
    Floats { data: Cow<'a, [f32]>, width: usize },
    Flags(Cow<'a, [bool]>),
}

/// Requested fields for a set of transitions, keyed by [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<'a> {
    columns: BTreeMap<Field, Column<'a>>,
    len: usize,
}

/// A gathered mini-batch that owns its data.
pub type OwnedBatch = Batch<'static>;

impl<'a> Batch<'a> {
    fn column(&self, field: Field) -> Result<&Column<'a>> {
        self.columns
            .get(&field)
            .ok_or(A2CError::MissingField { field })
    }

    /// Float column of `field`, `len() * width(field)` values.
    pub fn floats(&self, field: Field) -> Result<&[f32]> {
        match self.column(field)? {
            Column::Floats { data, .. } => Ok(data.as_ref()),
            Column::Flags(_) => Err(A2CError::FieldKind {
                field,
                expected: "float",
            }),
        }
    }

    pub fn flags(&self, field: Field) -> Result<&[bool]> {
        match self.column(field)? {
            Column::Flags(data) => Ok(data.as_ref()),
            Column::Floats { .. } => Err(A2CError::FieldKind {
                field,
                expected: "flag",
            }),
        }
    }

    /// Floats per row of `field`; flag columns have width 1.
    pub fn width(&self, field: Field) -> Result<usize> {
        Ok(match self.column(field)? {
            Column::Floats { width, .. } => *width,
            Column::Flags(_) => 1,
        })
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Number of transitions (rows).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn floats(data: &[f32], width: usize) -> Column<'_> {
    Column::Floats {
        data: Cow::Borrowed(data),
        width,
    }
}

/// Column storage, split from the segment's RNG so both can be borrowed at once.
#[derive(Debug, Default)]
struct Arena {
    observations: Vec<f32>,
    actions: Vec<f32>,
    next_observations: Vec<f32>,
    rewards: Vec<f32>,
    resets: Vec<bool>,
    terminations: Vec<bool>,
    log_probs: Vec<f32>,
    values: Vec<f32>,
    next_values: Vec<f32>,
    advantages: Vec<f32>,
    returns: Vec<f32>,
}

impl Arena {
    fn allocate(capacity: usize, shape: &StepShape) -> Self {
        let rows = capacity * shape.n_envs;
        Self {
            observations: vec![0.0; rows * shape.obs_dim],
            actions: vec![0.0; rows * shape.act_dim],
            next_observations: vec![0.0; rows * shape.obs_dim],
            rewards: vec![0.0; rows],
            resets: vec![false; rows],
            terminations: vec![false; rows],
            log_probs: vec![0.0; rows],
            values: vec![0.0; rows],
            next_values: vec![0.0; rows],
            advantages: vec![0.0; rows],
            returns: vec![0.0; rows],
        }
    }

    fn view(&self, field: Field, shape: &StepShape) -> Column<'_> {
        match field {
            Field::Observations => floats(&self.observations, shape.obs_dim),
            Field::Actions => floats(&self.actions, shape.act_dim),
            Field::NextObservations => floats(&self.next_observations, shape.obs_dim),
            Field::Rewards => floats(&self.rewards, 1),
            Field::Resets => Column::Flags(Cow::Borrowed(&self.resets)),
            Field::Terminations => Column::Flags(Cow::Borrowed(&self.terminations)),
            Field::LogProbs => floats(&self.log_probs, 1),
            Field::Values => floats(&self.values, 1),
            Field::NextValues => floats(&self.next_values, 1),
            Field::Advantages => floats(&self.advantages, 1),
            Field::Returns => floats(&self.returns, 1),
        }
    }

    fn gather(&self, field: Field, shape: &StepShape, indices: &[usize]) -> Column<'static> {
        match self.view(field, shape) {
            Column::Floats { data, width } => {
                let mut out = Vec::with_capacity(indices.len() * width);
                for &i in indices {
                    out.extend_from_slice(&data[i * width..(i + 1) * width]);
                }
                Column::Floats {
                    data: Cow::Owned(out),
                    width,
                }
            }
            Column::Flags(data) => {
                Column::Flags(Cow::Owned(indices.iter().map(|&i| data[i]).collect()))
            }
        }
    }
}

/// Trajectory buffer holding one segment of `capacity` timesteps.
///
/// ```ignore
/// let mut segment = Segment::new(SegmentConfig::from(&config));
/// segment.initialize(Some(0));
/// while !segment.ready() {
///     segment.store(step)?;
/// }
/// segment.compute_returns(&values, &next_values)?;
/// for batch in segment.get(&[Field::Observations, Field::Returns])? {
///     // ...
/// }
/// segment.finish();
/// ```
#[derive(Debug)]
pub struct Segment {
    config: SegmentConfig,
    rng: StdRng,
    /// Row widths, fixed by the first store after `initialize`.
    shape: Option<StepShape>,
    arena: Arena,
    cursor: usize,
    phase: Phase,
    /// Reused permutation of `0..len()`.
    indices: Vec<usize>,
}

impl Segment {
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
            shape: None,
            arena: Arena::default(),
            cursor: 0,
            phase: Phase::Filling,
            indices: Vec::new(),
        }
    }

    /// Reseed the shuffling RNG and drop all storage.
    ///
    /// With `None` the RNG is seeded from the operating system.
    pub fn initialize(&mut self, seed: Option<u64>) {
        self.rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.shape = None;
        self.arena = Arena::default();
        self.indices.clear();
        self.cursor = 0;
        self.phase = Phase::Filling;
    }

    /// Write one timestep at the cursor and advance it.
    ///
    /// # Errors
    /// - `SegmentFull` once `capacity` steps are stored and `finish()` has not run
    /// - `ShapeMismatch` when a column disagrees with the first stored step
    pub fn store(&mut self, step: TransitionStep<'_>) -> Result<()> {
        if self.phase != Phase::Filling {
            return Err(A2CError::SegmentFull {
                capacity: self.config.capacity,
            });
        }

        let shape = match self.shape {
            Some(shape) => {
                step.check(&shape)?;
                shape
            }
            None => {
                let shape = step.shape()?;
                self.arena = Arena::allocate(self.config.capacity, &shape);
                self.shape = Some(shape);
                shape
            }
        };

        let n = shape.n_envs;
        let rows = self.cursor * n..(self.cursor + 1) * n;
        let obs = rows.start * shape.obs_dim..rows.end * shape.obs_dim;
        let act = rows.start * shape.act_dim..rows.end * shape.act_dim;

        let arena = &mut self.arena;
        arena.observations[obs.clone()].copy_from_slice(step.observations);
        arena.next_observations[obs].copy_from_slice(step.next_observations);
        arena.actions[act].copy_from_slice(step.actions);
        arena.rewards[rows.clone()].copy_from_slice(step.rewards);
        arena.resets[rows.clone()].copy_from_slice(step.resets);
        arena.terminations[rows.clone()].copy_from_slice(step.terminations);
        arena.log_probs[rows].copy_from_slice(step.log_probs);

        self.cursor += 1;
        if self.cursor == self.config.capacity {
            self.phase = Phase::Full;
        }
        Ok(())
    }

    /// True exactly when `capacity` steps were stored since the last reset.
    pub fn ready(&self) -> bool {
        self.cursor == self.config.capacity
    }

    /// Borrowed views of `fields` over the whole segment, in storage order.
    ///
    /// # Errors
    /// - `NotReady` before the segment is full
    /// - `StaleReturns` for derived fields before `compute_returns`
    pub fn get_full(&self, fields: &[Field]) -> Result<Batch<'_>> {
        let shape = self.check_readable(fields)?;
        let columns = fields
            .iter()
            .map(|&field| (field, self.arena.view(field, &shape)))
            .collect();
        Ok(Batch {
            columns,
            len: self.len(),
        })
    }

    /// Compute advantages and return targets from critic values.
    ///
    /// `values[i]` is V(observation i) and `next_values[i]` is V(next
    /// observation i), both in storage order. Calling it again on the same
    /// segment recomputes everything from the new values.
    pub fn compute_returns(&mut self, values: &[f32], next_values: &[f32]) -> Result<()> {
        let shape = match (self.phase, self.shape) {
            (Phase::Filling, _) | (_, None) => return Err(self.not_ready()),
            (_, Some(shape)) => shape,
        };
        let total = self.len();
        ensure_len("values", total, values.len())?;
        ensure_len("next_values", total, next_values.len())?;

        let (advantages, returns) = compute_advantages(
            AdvantageInputs {
                rewards: &self.arena.rewards,
                values,
                next_values,
                resets: &self.arena.resets,
                terminations: &self.arena.terminations,
                n_envs: shape.n_envs,
            },
            self.config.discount_factor,
            self.config.trace_decay,
        )?;

        self.arena.values.copy_from_slice(values);
        self.arena.next_values.copy_from_slice(next_values);
        self.arena.advantages = advantages;
        self.arena.returns = returns;
        self.phase = Phase::ReturnsComputed;
        Ok(())
    }

    /// Lazily yield `batch_iterations` shuffled mini-batches of `fields`.
    ///
    /// Every batch is drawn from a fresh permutation of the whole segment and
    /// holds the first `batch_size` indices of it (capped at `len()`).
    pub fn get(&mut self, fields: &[Field]) -> Result<MiniBatches<'_>> {
        let shape = self.check_readable(fields)?;
        let total = self.len();
        let batch_size = self.config.batch_size.unwrap_or(total).min(total);

        if self.indices.len() != total {
            self.indices = (0..total).collect();
        }

        Ok(MiniBatches {
            rng: &mut self.rng,
            arena: &self.arena,
            indices: &mut self.indices,
            shape,
            fields: fields.to_vec(),
            batch_size,
            remaining: self.config.batch_iterations,
        })
    }

    /// Mark the segment consumed: cursor back to 0, phase `Filling`.
    ///
    /// Row widths are kept, so later stores must match them.
    pub fn finish(&mut self) {
        self.cursor = 0;
        self.phase = Phase::Filling;
    }

    fn check_readable(&self, fields: &[Field]) -> Result<StepShape> {
        let shape = match (self.phase, self.shape) {
            (Phase::Filling, _) | (_, None) => return Err(self.not_ready()),
            (_, Some(shape)) => shape,
        };
        if self.phase != Phase::ReturnsComputed {
            if let Some(&field) = fields.iter().find(|f| f.is_derived()) {
                return Err(A2CError::StaleReturns { field });
            }
        }
        Ok(shape)
    }

    fn not_ready(&self) -> A2CError {
        A2CError::NotReady {
            stored: self.cursor,
            capacity: self.config.capacity,
        }
    }

    /// Transitions stored (timesteps times environments).
    pub fn len(&self) -> usize {
        self.cursor * self.shape.map_or(0, |s| s.n_envs)
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Timesteps stored since the last reset.
    pub fn steps(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn n_envs(&self) -> Option<usize> {
        self.shape.map(|s| s.n_envs)
    }

    pub fn shape(&self) -> Option<StepShape> {
        self.shape
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }
}

/// Finite iterator over the mini-batches of one [`Segment::get`] call.
pub struct MiniBatches<'a> {
    rng: &'a mut StdRng,
    arena: &'a Arena,
    indices: &'a mut Vec<usize>,
    shape: StepShape,
    fields: Vec<Field>,
    batch_size: usize,
    remaining: usize,
}

impl Iterator for MiniBatches<'_> {
    type Item = OwnedBatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        self.indices.shuffle(&mut *self.rng);
        let picked = &self.indices[..self.batch_size];

        let columns = self
            .fields
            .iter()
            .map(|&field| (field, self.arena.gather(field, &self.shape, picked)))
            .collect();
        Some(Batch {
            columns,
            len: self.batch_size,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for MiniBatches<'_> {}
