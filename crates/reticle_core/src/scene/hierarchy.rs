//! Entity hierarchy with transform and collision queries.

use glam::{Mat4, Vec3};
use parking_lot::RwLock;

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::math::{ray_obb_distance, Aabb, Ray};
use crate::providers::{CollisionProvider, CollisionResult, TransformProvider};

/// Upper bound on parent walks, guards against a corrupted hierarchy.
const MAX_DEPTH: usize = 256;

#[derive(Clone, Debug)]
struct Node {
    id: EntityId,
    alive: bool,
    parent: EntityId,
    local: Mat4,
    enabled: bool,
    aabb: Option<Aabb>,
    collidable: bool,
    interactive: bool,
}

impl Node {
    fn dead() -> Self {
        Self {
            id: EntityId::new(0, 0),
            alive: false,
            parent: EntityId::NULL,
            local: Mat4::IDENTITY,
            enabled: false,
            aabb: None,
            collidable: false,
            interactive: false,
        }
    }
}

#[derive(Default)]
struct SceneData {
    nodes: Vec<Node>,
    free_indices: Vec<u32>,
}

impl SceneData {
    fn node(&self, id: EntityId) -> Option<&Node> {
        if id.is_null() {
            return None;
        }
        self.nodes
            .get(id.index() as usize)
            .filter(|node| node.alive && node.id == id)
    }

    fn node_mut(&mut self, id: EntityId) -> Option<&mut Node> {
        if id.is_null() {
            return None;
        }
        self.nodes
            .get_mut(id.index() as usize)
            .filter(|node| node.alive && node.id == id)
    }

    fn world_matrix(&self, id: EntityId) -> Option<Mat4> {
        let mut node = self.node(id)?;
        let mut world = node.local;
        for _ in 0..MAX_DEPTH {
            match self.node(node.parent) {
                Some(parent) => {
                    world = parent.local * world;
                    node = parent;
                }
                None => return Some(world),
            }
        }
        None
    }

    fn is_enabled(&self, id: EntityId) -> bool {
        let mut current = id;
        for _ in 0..MAX_DEPTH {
            match self.node(current) {
                Some(node) if node.enabled => current = node.parent,
                Some(_) => return false,
                None => return current != id,
            }
        }
        false
    }

    fn is_ancestor(&self, ancestor: EntityId, of: EntityId) -> bool {
        let mut current = of;
        for _ in 0..MAX_DEPTH {
            if current == ancestor {
                return true;
            }
            match self.node(current) {
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        true
    }
}

/// In-memory scene hierarchy.
///
/// Entity slots are recycled with a generation counter, so a stale id
/// never resolves to a newer entity.
///
/// # Example
///
/// ```rust,ignore
/// let scene = Scene::new();
/// let parent = scene.spawn();
/// let child = scene.spawn_child(parent)?;
/// scene.set_local_matrix(child, Mat4::from_translation(Vec3::X))?;
/// scene.set_aabb(child, Some(Aabb::from_half_extents(Vec3::splat(0.5))))?;
/// ```
#[derive(Default)]
pub struct Scene {
    data: RwLock<SceneData>,
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().nodes.iter().filter(|node| node.alive).count()
    }

    /// True when the scene has no live entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns an enabled root entity with an identity transform.
    pub fn spawn(&self) -> EntityId {
        let mut data = self.data.write();

        let (index, generation) = match data.free_indices.pop() {
            // Increment generation to invalidate old references
            Some(index) => {
                let generation = data
                    .nodes
                    .get(index as usize)
                    .map_or(0, |node| node.id.generation().wrapping_add(1));
                (index, generation)
            }
            None => {
                let Ok(index) = u32::try_from(data.nodes.len()) else {
                    return EntityId::NULL;
                };
                data.nodes.push(Node::dead());
                (index, 0)
            }
        };

        let Some(node) = data.nodes.get_mut(index as usize) else {
            return EntityId::NULL;
        };
        let id = EntityId::new(index, generation);
        *node = Node {
            id,
            alive: true,
            enabled: true,
            interactive: true,
            collidable: true,
            ..Node::dead()
        };
        id
    }

    /// Spawns an entity under `parent`.
    ///
    /// # Errors
    ///
    /// [`CoreError::EntityNotFound`] if the parent is not alive.
    pub fn spawn_child(&self, parent: EntityId) -> CoreResult<EntityId> {
        if !self.contains(parent) {
            return Err(CoreError::EntityNotFound(parent));
        }
        let child = self.spawn();
        self.set_parent(child, parent)?;
        Ok(child)
    }

    /// Removes an entity. Its children become roots.
    pub fn despawn(&self, id: EntityId) -> bool {
        let mut data = self.data.write();
        let Some(node) = data.node_mut(id) else {
            return false;
        };
        node.alive = false;
        data.free_indices.push(id.index());

        for node in data.nodes.iter_mut().filter(|node| node.alive) {
            if node.parent == id {
                node.parent = EntityId::NULL;
            }
        }
        true
    }

    /// Checks if an entity is alive.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.data.read().node(id).is_some()
    }

    /// Re-parents `child`. The local matrix is kept as is.
    ///
    /// # Errors
    ///
    /// Fails if either entity is missing, or if `parent` is a descendant of
    /// `child`.
    pub fn set_parent(&self, child: EntityId, parent: EntityId) -> CoreResult<()> {
        let mut data = self.data.write();
        if data.node(child).is_none() {
            return Err(CoreError::EntityNotFound(child));
        }
        if !parent.is_null() {
            if data.node(parent).is_none() {
                return Err(CoreError::EntityNotFound(parent));
            }
            if data.is_ancestor(child, parent) {
                return Err(CoreError::HierarchyCycle { child, parent });
            }
        }
        if let Some(node) = data.node_mut(child) {
            node.parent = parent;
        }
        Ok(())
    }

    /// Sets the transform relative to the parent.
    ///
    /// # Errors
    ///
    /// [`CoreError::EntityNotFound`] if the entity is not alive.
    pub fn set_local_matrix(&self, id: EntityId, local: Mat4) -> CoreResult<()> {
        self.update(id, |node| node.local = local)
    }

    /// Transform relative to the parent.
    #[must_use]
    pub fn local_matrix(&self, id: EntityId) -> Option<Mat4> {
        self.data.read().node(id).map(|node| node.local)
    }

    /// Sets or clears the local bounding box.
    ///
    /// # Errors
    ///
    /// [`CoreError::EntityNotFound`] if the entity is not alive.
    pub fn set_aabb(&self, id: EntityId, aabb: Option<Aabb>) -> CoreResult<()> {
        self.update(id, |node| node.aabb = aabb)
    }

    /// Includes or excludes the entity from ray casts.
    ///
    /// # Errors
    ///
    /// [`CoreError::EntityNotFound`] if the entity is not alive.
    pub fn set_collidable(&self, id: EntityId, collidable: bool) -> CoreResult<()> {
        self.update(id, |node| node.collidable = collidable)
    }

    /// Sets the flag reported by `is_interaction_enabled`.
    ///
    /// # Errors
    ///
    /// [`CoreError::EntityNotFound`] if the entity is not alive.
    pub fn set_interaction_enabled(&self, id: EntityId, interactive: bool) -> CoreResult<()> {
        self.update(id, |node| node.interactive = interactive)
    }

    fn update(&self, id: EntityId, apply: impl FnOnce(&mut Node)) -> CoreResult<()> {
        let mut data = self.data.write();
        let node = data.node_mut(id).ok_or(CoreError::EntityNotFound(id))?;
        apply(node);
        Ok(())
    }
}

impl TransformProvider for Scene {
    fn world_matrix(&self, entity: EntityId) -> Option<Mat4> {
        self.data.read().world_matrix(entity)
    }

    fn parent(&self, entity: EntityId) -> EntityId {
        self.data
            .read()
            .node(entity)
            .map_or(EntityId::NULL, |node| node.parent)
    }

    fn local_translation(&self, entity: EntityId) -> Option<Vec3> {
        self.local_matrix(entity)
            .map(|local| local.w_axis.truncate())
    }

    fn set_world_matrix(&self, entity: EntityId, matrix: &Mat4) {
        let mut data = self.data.write();
        let Some(parent) = data.node(entity).map(|node| node.parent) else {
            tracing::warn!(entity = ?entity, "set_world_matrix on unknown entity");
            return;
        };
        let parent_world = data.world_matrix(parent).unwrap_or(Mat4::IDENTITY);
        let local = parent_world.inverse() * *matrix;
        if let Some(node) = data.node_mut(entity) {
            node.local = local;
        }
    }

    fn is_enabled(&self, entity: EntityId) -> bool {
        self.data.read().is_enabled(entity)
    }

    fn enable(&self, entity: EntityId) {
        if let Some(node) = self.data.write().node_mut(entity) {
            node.enabled = true;
        }
    }

    fn disable(&self, entity: EntityId) {
        if let Some(node) = self.data.write().node_mut(entity) {
            node.enabled = false;
        }
    }

    fn aabb(&self, entity: EntityId) -> Option<Aabb> {
        self.data.read().node(entity).and_then(|node| node.aabb)
    }
}

impl CollisionProvider for Scene {
    fn check_for_collision(&self, ray: &Ray) -> CollisionResult {
        if ray.is_degenerate() {
            return CollisionResult::MISS;
        }
        let data = self.data.read();
        let mut nearest = CollisionResult::MISS;

        for node in data.nodes.iter().filter(|node| node.alive && node.collidable) {
            let Some(aabb) = node.aabb else { continue };
            if !data.is_enabled(node.id) {
                continue;
            }
            let Some(world) = data.world_matrix(node.id) else {
                continue;
            };
            if let Some(distance) = ray_obb_distance(ray, &world, &aabb) {
                if !nearest.is_hit() || distance < nearest.distance {
                    nearest = CollisionResult::hit(node.id, distance);
                }
            }
        }
        nearest
    }

    fn is_interaction_enabled(&self, entity: EntityId) -> bool {
        let data = self.data.read();
        data.node(entity).is_some_and(|node| node.interactive) && data.is_enabled(entity)
    }
}
