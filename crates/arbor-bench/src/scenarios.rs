//! Benchmark scenarios: a procedural world plus the config to tick it.
//!
//! Six canonical scenarios for regression testing:
//! 1. **Single segment**: One internode on a tilted joint under gravity
//! 2. **Two-segment chain**: The smallest tree where torques propagate
//! 3. **Binary tree**: Depth-5 tree, all fictitious torques on
//! 4. **Windy tree**: Depth-4 tree in fbm wind
//! 5. **Overload break**: Outer joints too weak for their load
//! 6. **Falling leaves**: Free leaves tumbling in wind next to a tree

use std::f32::consts::{FRAC_PI_4, FRAC_PI_6};

use arbor_fields::WindField;
use arbor_math::{Quat, Vec3};
use arbor_solver::{PhysicsWorld, SimulatorConfig};
use arbor_tree::generators::{binary_tree, chain, tip_offset, BranchParams};
use arbor_tree::{JointConfig, RigidBody};
use arbor_types::constants::{GRAVITY, UNIT_DENSITY};
use arbor_types::{ArborError, ArborResult};
use serde::{Deserialize, Serialize};

/// Which benchmark scenario to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioKind {
    SingleSegment,
    TwoSegmentChain,
    BinaryTree,
    WindyTree,
    OverloadBreak,
    FallingLeaves,
}

impl ScenarioKind {
    pub fn all() -> &'static [ScenarioKind] {
        &[
            ScenarioKind::SingleSegment,
            ScenarioKind::TwoSegmentChain,
            ScenarioKind::BinaryTree,
            ScenarioKind::WindyTree,
            ScenarioKind::OverloadBreak,
            ScenarioKind::FallingLeaves,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::SingleSegment => "single_segment",
            ScenarioKind::TwoSegmentChain => "two_segment_chain",
            ScenarioKind::BinaryTree => "binary_tree",
            ScenarioKind::WindyTree => "windy_tree",
            ScenarioKind::OverloadBreak => "overload_break",
            ScenarioKind::FallingLeaves => "falling_leaves",
        }
    }

    /// Parses a name produced by [`ScenarioKind::name`].
    pub fn from_name(name: &str) -> ArborResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ArborError::InvalidArgument(format!("unknown scenario '{name}'")))
    }
}

/// A fully specified benchmark scenario.
pub struct Scenario {
    pub kind: ScenarioKind,
    pub world: PhysicsWorld,
    pub config: SimulatorConfig,
    /// Number of ticks to simulate.
    pub timesteps: u32,
    /// Tick length (seconds).
    pub dt: f32,
}

fn gravity() -> [f32; 3] {
    [0.0, -GRAVITY, 0.0]
}

impl Scenario {
    pub fn from_kind(kind: ScenarioKind) -> ArborResult<Self> {
        match kind {
            ScenarioKind::SingleSegment => Self::single_segment(),
            ScenarioKind::TwoSegmentChain => Self::two_segment_chain(),
            ScenarioKind::BinaryTree => Self::binary_tree(),
            ScenarioKind::WindyTree => Self::windy_tree(),
            ScenarioKind::OverloadBreak => Self::overload_break(),
            ScenarioKind::FallingLeaves => Self::falling_leaves(),
        }
    }

    /// A unit internode on a unit joint tilted 45°, swinging under
    /// gravity for 2 seconds at 60fps.
    pub fn single_segment() -> ArborResult<Self> {
        let mut world = PhysicsWorld::new();
        let root = world.add_root(RigidBody::static_root());
        let segment = world.insert(RigidBody::internode(1.0, 1.0, UNIT_DENSITY));
        world.attach(
            root,
            segment,
            JointConfig::unit().rotated(Quat::from_rotation_z(FRAC_PI_4)),
        )?;

        Ok(Self {
            kind: ScenarioKind::SingleSegment,
            world,
            config: SimulatorConfig {
                gravity: gravity(),
                ..SimulatorConfig::debug()
            },
            timesteps: 120,
            dt: 1.0 / 60.0,
        })
    }

    /// Two unit internodes, the upper one bent −45° at the tip of the
    /// lower.
    pub fn two_segment_chain() -> ArborResult<Self> {
        let mut world = PhysicsWorld::new();
        let root = world.add_root(RigidBody::static_root());
        let lower = world.insert(RigidBody::internode(1.0, 1.0, UNIT_DENSITY));
        world.attach(root, lower, JointConfig::unit())?;
        let upper = world.insert(RigidBody::internode(1.0, 1.0, UNIT_DENSITY));
        world.attach(
            lower,
            upper,
            JointConfig::unit()
                .at(Vec3::Y)
                .rotated(Quat::from_rotation_z(-FRAC_PI_4)),
        )?;

        Ok(Self {
            kind: ScenarioKind::TwoSegmentChain,
            world,
            config: SimulatorConfig {
                gravity: gravity(),
                ..SimulatorConfig::with_fictitious()
            },
            timesteps: 120,
            dt: 1.0 / 60.0,
        })
    }

    /// 63 tapered internodes, sagging under gravity with every fictitious
    /// torque enabled.
    pub fn binary_tree() -> ArborResult<Self> {
        let mut world = PhysicsWorld::new();
        let root = world.add_root(RigidBody::static_root());
        binary_tree(world.arena_mut(), root, 5, &BranchParams::default())?;

        Ok(Self {
            kind: ScenarioKind::BinaryTree,
            world,
            config: SimulatorConfig {
                gravity: gravity(),
                ..SimulatorConfig::with_fictitious()
            },
            timesteps: 120,
            dt: 1.0 / 60.0,
        })
    }

    /// 31 internodes in gusty wind along +X for 3 seconds.
    pub fn windy_tree() -> ArborResult<Self> {
        let mut world = PhysicsWorld::new();
        let root = world.add_root(RigidBody::static_root());
        binary_tree(world.arena_mut(), root, 4, &BranchParams::default())?;
        world.add_field(Box::new(WindField::new(Vec3::X, 3.0).with_base(1.0)));

        Ok(Self {
            kind: ScenarioKind::WindyTree,
            world,
            config: SimulatorConfig {
                gravity: gravity(),
                parallel: true,
                ..SimulatorConfig::with_fictitious()
            },
            timesteps: 180,
            dt: 1.0 / 60.0,
        })
    }

    /// A four-segment chain whose two outer joints hold at most 0.05 N·m.
    /// The tilted outer segments carry more than that under gravity and
    /// break off on the first tick.
    pub fn overload_break() -> ArborResult<Self> {
        let params = BranchParams::default();
        let mut world = PhysicsWorld::new();
        let root = world.add_root(RigidBody::static_root());
        let trunk = chain(world.arena_mut(), root, 2, &params)?;

        let mut parent = trunk[1];
        for generation in 2..4 {
            let child = world.insert(params.internode(generation));
            let offset = tip_offset(world.body(parent)?);
            let joint = params
                .joint
                .at(offset)
                .rotated(Quat::from_rotation_z(FRAC_PI_6))
                .with_threshold(0.05);
            world.attach(parent, child, joint)?;
            parent = child;
        }

        Ok(Self {
            kind: ScenarioKind::OverloadBreak,
            world,
            config: SimulatorConfig {
                gravity: gravity(),
                ..SimulatorConfig::debug()
            },
            timesteps: 60,
            dt: 1.0 / 60.0,
        })
    }

    /// 24 leaves released in a ring 3 m up, next to a small tree, in wind.
    pub fn falling_leaves() -> ArborResult<Self> {
        let mut world = PhysicsWorld::new();
        let root = world.add_root(RigidBody::static_root());
        binary_tree(world.arena_mut(), root, 2, &BranchParams::default())?;

        let count = 24;
        for i in 0..count {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            let position = Vec3::new(1.5 * angle.cos(), 3.0 + 0.1 * i as f32, 1.5 * angle.sin());
            let leaf = RigidBody::leaf(0.1, 0.002, UNIT_DENSITY * 1000.0)
                .with_orientation(Quat::from_rotation_x(angle))
                .with_pivot_at(position);
            world.add_root(leaf);
        }
        world.add_field(Box::new(WindField::new(Vec3::new(1.0, 0.0, 0.3), 0.02)));

        Ok(Self {
            kind: ScenarioKind::FallingLeaves,
            world,
            config: SimulatorConfig {
                gravity: gravity(),
                ..SimulatorConfig::debug()
            },
            timesteps: 120,
            dt: 1.0 / 60.0,
        })
    }
}
