//! Named-object scene backed by an ECS world.
//!
//! Effects and the weather controller never hold object references directly.
//! They look objects up by name through [`SceneLookup`] and re-query positions
//! every frame, so an object that disappears simply stops resolving.

use crate::Transform;
use glam::Vec3;
use hecs::{Entity, World};
use std::collections::HashMap;

/// Handle to an object in the scene.
pub type ObjectId = Entity;

/// Object name used for lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

/// Visibility toggle for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible(pub bool);

/// A value stored on an object for cross-session inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    Text(String),
    Float(f32),
}

impl Property {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Property::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Property::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Free-form key/value properties attached to an object.
#[derive(Debug, Clone, Default)]
pub struct Properties(pub HashMap<String, Property>);

/// Read-only object lookup, as consumed by effect instances.
pub trait SceneLookup {
    /// Find the first object with exactly this name.
    fn find_object_by_name(&self, name: &str) -> Option<ObjectId>;

    /// World transform of an object, `None` if it no longer exists.
    fn world_transform(&self, id: ObjectId) -> Option<Transform>;

    fn object_name(&self, id: ObjectId) -> Option<String>;

    /// The camera used for screen-aligned billboards.
    fn active_camera(&self) -> Option<ObjectId>;

    fn world_position(&self, id: ObjectId) -> Option<Vec3> {
        self.world_transform(id).map(|t| t.position)
    }
}

/// Scene of named objects.
pub struct Scene {
    world: World,
    active_camera: Option<Entity>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            active_camera: None,
        }
    }

    /// Spawn a visible object with an empty property set.
    pub fn spawn_object(&mut self, name: &str, transform: Transform) -> ObjectId {
        self.world.spawn((
            Name(name.to_string()),
            transform,
            Visible(true),
            Properties::default(),
        ))
    }

    /// Remove an object. Returns false if it was already gone.
    pub fn despawn(&mut self, id: ObjectId) -> bool {
        self.world.despawn(id).is_ok()
    }

    pub fn set_active_camera(&mut self, id: Option<ObjectId>) {
        self.active_camera = id;
    }

    pub fn set_position(&mut self, id: ObjectId, position: Vec3) -> bool {
        match self.world.get::<&mut Transform>(id) {
            Ok(mut transform) => {
                transform.position = position;
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_transform(&mut self, id: ObjectId, value: Transform) -> bool {
        match self.world.get::<&mut Transform>(id) {
            Ok(mut transform) => {
                *transform = value;
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> bool {
        match self.world.get::<&mut Visible>(id) {
            Ok(mut v) => {
                v.0 = visible;
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_visible(&self, id: ObjectId) -> Option<bool> {
        self.world.get::<&Visible>(id).ok().map(|v| v.0)
    }

    pub fn property(&self, id: ObjectId, key: &str) -> Option<Property> {
        let props = self.world.get::<&Properties>(id).ok()?;
        props.0.get(key).cloned()
    }

    pub fn set_property(&mut self, id: ObjectId, key: &str, value: Property) -> bool {
        match self.world.get::<&mut Properties>(id) {
            Ok(mut props) => {
                props.0.insert(key.to_string(), value);
                true
            }
            Err(_) => false,
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> u32 {
        self.world.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }
}

impl SceneLookup for Scene {
    fn find_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.world
            .query::<&Name>()
            .iter()
            .find(|(_, n)| n.0 == name)
            .map(|(id, _)| id)
    }

    fn world_transform(&self, id: ObjectId) -> Option<Transform> {
        self.world.get::<&Transform>(id).ok().map(|t| *t)
    }

    fn object_name(&self, id: ObjectId) -> Option<String> {
        self.world.get::<&Name>(id).ok().map(|n| n.0.clone())
    }

    fn active_camera(&self) -> Option<ObjectId> {
        self.active_camera.filter(|id| self.world.contains(*id))
    }
}
