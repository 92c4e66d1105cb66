use glam::{Mat4, Quat, Vec3};

use crate::geometry::GeometryId;
use crate::material::MaterialId;

/// Position, Euler rotation in radians and scale. The rotation matrix is
/// `Rx * Ry * Rz` (intrinsic XYZ order).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn rotation_quat(&self) -> Quat {
        Quat::from_rotation_x(self.rotation.x)
            * Quat::from_rotation_y(self.rotation.y)
            * Quat::from_rotation_z(self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation_quat(), self.translation)
    }
}

/// Handle to a node in a [`SceneGraph`].
///
/// Ids are indices into the graph's arena, assigned in insertion order with
/// the root at zero. They are only meaningful for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in insertion order.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drawable {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: &'static str,
    pub transform: Transform,
    pub drawable: Option<Drawable>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A drawable node resolved to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub world: Mat4,
    pub drawable: Drawable,
}

/// Arena of transform nodes. Nodes are only ever appended; ids stay valid
/// for the lifetime of the graph.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    pub fn new(root_name: &'static str) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name,
                transform: Transform::default(),
                drawable: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The root node created by [`SceneGraph::new`].
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a child of `parent` and returns its id.
    pub fn add(
        &mut self,
        parent: NodeId,
        name: &'static str,
        transform: Transform,
        drawable: Option<Drawable>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            transform,
            drawable,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Borrows the node behind `id`.
    ///
    /// Panics if `id` was issued by a different graph with fewer nodes; ids
    /// from this graph are always valid since nodes are never removed.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn transform_mut(&mut self, id: NodeId) -> &mut Transform {
        &mut self.nodes[id.0].transform
    }

    /// Looks up a node by name.
    ///
    /// Names are not required to be unique; the first node added under
    /// `name` wins. Returns `None` when no node carries the name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    /// Local transform of `id` composed with every ancestor's, root first.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.node(id);
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// Every drawable node in depth-first order, children after parents.
    pub fn draw_list(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        let mut stack = vec![(self.root(), Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let node = self.node(id);
            let world = parent_world * node.transform.matrix();
            if let Some(drawable) = node.drawable {
                items.push(DrawItem {
                    node: id,
                    world,
                    drawable,
                });
            }
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
        items
    }
}
