//! Compute backend trait and its CPU implementations.
//!
//! A [`ComputeBackend`] runs the middle of a tick over a
//! [`FlattenedTree`]:
//!
//! 1. composites, level by level, then the roots
//! 2. de-articulation flags (no topology change; the caller frees them)
//! 3. joint solve, skipping flagged joints
//! 4. kinematics, levels in reverse, skipping flagged bodies
//!
//! [`CpuFallback`] walks every unit sequentially and is the reference.
//! [`RayonBackend`] dispatches the units of one level on a thread pool;
//! results are committed only after the whole level finished, so both
//! produce identical output.

use arbor_math::EigenMethod;
use arbor_solver::joints::solve_joint;
use arbor_solver::kinematics::propagate;
use arbor_solver::SimulatorConfig;
use arbor_tree::CompositeBody;
use arbor_types::{ArborError, ArborResult, JointId};
use rayon::prelude::*;

use crate::buffers::{FlatBody, FlatJoint, FlattenedTree};

/// Inputs of one backend step.
#[derive(Debug, Clone)]
pub struct StepParams {
    pub dt: f32,
    pub config: SimulatorConfig,
}

/// What a backend step produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    /// Flat indices of bodies whose joint is overloaded.
    pub overloaded: Vec<usize>,
    pub joints_solved: usize,
    /// Joints whose eigendecomposition needed the QL fallback.
    pub eigen_fallbacks: u32,
}

/// Trait for compute backends of the tick.
///
/// # Implementations
/// - [`CpuFallback`]: Sequential reference (always available)
/// - [`RayonBackend`]: Level-parallel CPU execution
pub trait ComputeBackend: Send {
    /// Initialize the backend. Called once before the first step.
    fn init(&mut self) -> ArborResult<()>;

    /// Returns the backend name (e.g., "cpu_fallback", "rayon").
    fn name(&self) -> &str;

    /// Runs composites, overload detection, joints and kinematics on
    /// `tree` in place.
    fn step(&self, tree: &mut FlattenedTree, params: &StepParams) -> ArborResult<StepOutput>;

    /// Returns true if the backend runs units of a level concurrently.
    fn is_parallel(&self) -> bool;
}

/// CPU fallback backend: sequential reference implementation.
pub struct CpuFallback {
    initialized: bool,
}

impl CpuFallback {
    pub fn new() -> Self {
        Self { initialized: false }
    }
}

impl Default for CpuFallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuFallback {
    fn init(&mut self) -> ArborResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "cpu_fallback"
    }

    fn step(&self, tree: &mut FlattenedTree, params: &StepParams) -> ArborResult<StepOutput> {
        ensure_initialized(self.initialized, self.name())?;
        run_step(tree, params, &Sequential)
    }

    fn is_parallel(&self) -> bool {
        false
    }
}

/// Rayon backend: units of one level run on a dedicated thread pool.
pub struct RayonBackend {
    threads: Option<usize>,
    pool: Option<rayon::ThreadPool>,
}

impl RayonBackend {
    /// Uses rayon's default thread count.
    pub fn new() -> Self {
        Self {
            threads: None,
            pool: None,
        }
    }

    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            pool: None,
        }
    }

    /// Worker threads of the pool, once initialized.
    pub fn thread_count(&self) -> Option<usize> {
        self.pool.as_ref().map(rayon::ThreadPool::current_num_threads)
    }
}

impl Default for RayonBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for RayonBackend {
    fn init(&mut self) -> ArborResult<()> {
        if self.threads == Some(0) {
            return Err(ArborError::InvalidConfig(
                "rayon backend needs at least one thread".into(),
            ));
        }
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| ArborError::InvalidConfig(format!("rayon pool: {e}")))?;
        tracing::debug!(threads = pool.current_num_threads(), "rayon backend initialized");
        self.pool = Some(pool);
        Ok(())
    }

    fn name(&self) -> &str {
        "rayon"
    }

    fn step(&self, tree: &mut FlattenedTree, params: &StepParams) -> ArborResult<StepOutput> {
        let pool = self.pool.as_ref().ok_or_else(|| not_initialized(self.name()))?;
        pool.install(|| run_step(tree, params, &Parallel))
    }

    fn is_parallel(&self) -> bool {
        true
    }
}

fn not_initialized(name: &str) -> ArborError {
    ArborError::InvalidArgument(format!("backend {name} used before init"))
}

fn ensure_initialized(initialized: bool, name: &str) -> ArborResult<()> {
    if initialized {
        Ok(())
    } else {
        Err(not_initialized(name))
    }
}

// ─── Dispatch ────────────────────────────────────────────────

/// How a batch of independent work items is executed.
trait Dispatch: Sync {
    fn map<T, F>(&self, items: std::ops::Range<usize>, f: F) -> ArborResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> ArborResult<T> + Sync + Send;
}

struct Sequential;

impl Dispatch for Sequential {
    fn map<T, F>(&self, items: std::ops::Range<usize>, f: F) -> ArborResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> ArborResult<T> + Sync + Send,
    {
        items.map(f).collect()
    }
}

struct Parallel;

impl Dispatch for Parallel {
    fn map<T, F>(&self, items: std::ops::Range<usize>, f: F) -> ArborResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> ArborResult<T> + Sync + Send,
    {
        items.into_par_iter().map(f).collect()
    }
}

// ─── Kernels ─────────────────────────────────────────────────

fn run_step<D: Dispatch>(
    tree: &mut FlattenedTree,
    params: &StepParams,
    dispatch: &D,
) -> ArborResult<StepOutput> {
    compose_all(tree, dispatch)?;
    let overloaded = overloaded_bodies(tree);
    let mut flagged = vec![false; tree.body_count()];
    for &i in &overloaded {
        flagged[i] = true;
    }
    let (joints_solved, eigen_fallbacks) = solve_joints(tree, params, &flagged, dispatch)?;
    propagate_all(tree, &flagged, dispatch)?;

    Ok(StepOutput {
        overloaded,
        joints_solved,
        eigen_fallbacks,
    })
}

/// Composite of `index` from its own state and its children's
/// composites; children found in `fresh` take precedence over the buffer.
fn compose(tree: &FlattenedTree, index: usize, fresh: &[(usize, CompositeBody)]) -> CompositeBody {
    let mut composite = tree.bodies[index].own_composite();
    for &child in tree.children(index) {
        let child = child as usize;
        let child_composite = match fresh.iter().rev().find(|(c, _)| *c == child) {
            Some((_, c)) => *c,
            None => tree.bodies[child].composite.decode(),
        };
        composite.accumulate(tree.joints[child].position(), &child_composite);
    }
    composite
}

fn compose_all<D: Dispatch>(tree: &mut FlattenedTree, dispatch: &D) -> ArborResult<()> {
    for level in 0..tree.level_count() {
        let shared: &FlattenedTree = tree;
        let results = dispatch.map(shared.level(level), |head| {
            let mut out = Vec::with_capacity(1 + shared.climbers(head).len());
            for index in std::iter::once(head).chain(shared.climbers(head)) {
                let composite = compose(shared, index, &out);
                out.push((index, composite));
            }
            Ok(out)
        })?;
        commit_composites(tree, results.into_iter().flatten());
    }

    let shared: &FlattenedTree = tree;
    let roots = dispatch.map(shared.roots(), |root| Ok((root, compose(shared, root, &[]))))?;
    commit_composites(tree, roots);
    Ok(())
}

fn commit_composites(
    tree: &mut FlattenedTree,
    results: impl IntoIterator<Item = (usize, CompositeBody)>,
) {
    for (index, composite) in results {
        tree.bodies[index].composite = crate::buffers::FlatComposite::encode(&composite);
    }
}

fn overloaded_bodies(tree: &FlattenedTree) -> Vec<usize> {
    (0..tree.root_start as usize)
        .filter(|&i| tree.bodies[i].torque_magnitude() > tree.joints[i].torque_threshold)
        .collect()
}

fn solve_joints<D: Dispatch>(
    tree: &mut FlattenedTree,
    params: &StepParams,
    flagged: &[bool],
    dispatch: &D,
) -> ArborResult<(usize, u32)> {
    let shared: &FlattenedTree = tree;
    let solutions = dispatch.map(0..shared.joint_count(), |i| {
        if flagged[i] {
            return Ok(None);
        }
        let flat = &shared.joints[i];
        let joint = flat.decode();
        let parent = shared.bodies[flat.parent as usize].decode(flat.parent as usize);
        let child = shared.bodies[i].decode(i);
        let solution = solve_joint(&joint, &parent, &child, &params.config, params.dt)
            .map_err(|e| e.in_joint(shared.joint_id(i).unwrap_or(JointId(i as u32))))?;
        Ok(Some(solution))
    })?;

    let mut solved = 0;
    let mut fallbacks = 0;
    for (i, solution) in solutions.into_iter().enumerate() {
        let Some(solution) = solution else { continue };
        if solution.method == EigenMethod::QlFallback {
            fallbacks += 1;
            tracing::trace!(joint = i, "eigen decomposition fell back to QL");
        }
        tree.joints[i].set_state(solution.state);
        solved += 1;
    }
    Ok((solved, fallbacks))
}

fn propagate_all<D: Dispatch>(
    tree: &mut FlattenedTree,
    flagged: &[bool],
    dispatch: &D,
) -> ArborResult<()> {
    for level in (0..tree.level_count()).rev() {
        let shared: &FlattenedTree = tree;
        let results = dispatch.map(shared.level(level), |head| {
            let mut out: Vec<(usize, FlatJoint, FlatBody)> = Vec::new();
            for index in shared.climbers(head).rev().chain(std::iter::once(head)) {
                if flagged[index] {
                    continue;
                }
                let flat = &shared.joints[index];
                let parent_index = flat.parent as usize;
                let parent = match out.iter().rev().find(|(i, _, _)| *i == parent_index) {
                    Some((_, _, p)) => p.decode(parent_index),
                    None => shared.bodies[parent_index].decode(parent_index),
                };
                let mut joint = flat.decode();
                let mut child = shared.bodies[index].decode(index);
                propagate(&mut joint, &parent, &mut child);

                let mut flat_joint = *flat;
                flat_joint.set_state(joint.theta);
                flat_joint.orientation = joint.orientation.to_array();
                flat_joint.position = joint.position.to_array();
                flat_joint.acceleration = joint.acceleration.to_array();
                out.push((index, flat_joint, FlatBody::encode(&child, flat.parent as i32)));
            }
            Ok(out)
        })?;
        for (index, joint, body) in results.into_iter().flatten() {
            tree.joints[index] = joint;
            tree.bodies[index] = body;
        }
    }
    Ok(())
}
