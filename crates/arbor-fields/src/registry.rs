//! Field registry.

use std::collections::BTreeMap;

use arbor_tree::RigidBody;
use arbor_types::{ArborError, ArborResult, FieldId};

use crate::field::PhysicsField;

/// Owns the active fields, keyed by dense [`FieldId`]s.
///
/// Iteration follows insertion order so force accumulation is
/// deterministic.
#[derive(Default)]
pub struct FieldRegistry {
    fields: BTreeMap<FieldId, Box<dyn PhysicsField>>,
    next_id: u32,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: Box<dyn PhysicsField>) -> FieldId {
        let id = FieldId(self.next_id);
        self.next_id += 1;
        self.fields.insert(id, field);
        id
    }

    pub fn remove(&mut self, id: FieldId) -> ArborResult<Box<dyn PhysicsField>> {
        self.fields.remove(&id).ok_or(ArborError::UnknownField(id))
    }

    pub fn get(&self, id: FieldId) -> ArborResult<&dyn PhysicsField> {
        self.fields
            .get(&id)
            .map(|f| f.as_ref())
            .ok_or(ArborError::UnknownField(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &dyn PhysicsField)> {
        self.fields.iter().map(|(&id, f)| (id, f.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Applies every field whose region holds `body`'s centre of mass.
    /// Returns how many did.
    pub fn apply_to(&self, body: &mut RigidBody, time: f32) -> usize {
        let mut applied = 0;
        for field in self.fields.values() {
            if field.applies_to(body.center_of_mass) {
                field.apply(body, time);
                applied += 1;
            }
        }
        applied
    }
}

impl std::fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(id, field)| (id, field.name())))
            .finish()
    }
}
