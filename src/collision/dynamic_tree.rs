use crate::core::config::{AABB_EXTENSION, AABB_MULTIPLIER};
use crate::math::{Aabb, RayCastInput, Vec2};

/// Sentinel for a missing node reference
pub const NULL_NODE: i32 = -1;

/// A node in the dynamic tree, allocated from a growable pool
#[derive(Debug, Clone)]
struct TreeNode<T: Copy> {
    /// Fat AABB enclosing this subtree
    aabb: Aabb,

    /// User data attached to leaves
    user_data: Option<T>,

    /// Parent node, or the free-list link while the node is unused
    parent: i32,

    child1: i32,
    child2: i32,

    /// Leaf = 0, free node = -1
    height: i32,
}

impl<T: Copy> TreeNode<T> {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// A dynamic AABB tree broad-phase structure.
///
/// Every leaf is a user proxy; every internal node's AABB encloses its
/// children's. Leaves store a fat AABB, the user AABB inflated by
/// [`AABB_EXTENSION`], so small motions do not require reinsertion.
/// Insertion uses a surface-area heuristic; an AVL-style balancing pass
/// keeps the tree height logarithmic. Nodes are recycled through a free
/// list, so proxy ids stay stable until destroyed.
pub struct DynamicTree<T: Copy> {
    nodes: Vec<TreeNode<T>>,
    root: i32,
    free_list: i32,
}

impl<T: Copy> DynamicTree<T> {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: NULL_NODE,
        }
    }

    fn allocate_node(&mut self) -> i32 {
        if self.free_list == NULL_NODE {
            self.nodes.push(TreeNode {
                aabb: Aabb::default(),
                user_data: None,
                parent: NULL_NODE,
                child1: NULL_NODE,
                child2: NULL_NODE,
                height: -1,
            });
            return (self.nodes.len() - 1) as i32;
        }

        let node_id = self.free_list;
        let node = &mut self.nodes[node_id as usize];
        self.free_list = node.parent;
        node.parent = NULL_NODE;
        node.child1 = NULL_NODE;
        node.child2 = NULL_NODE;
        node.height = 0;
        node.user_data = None;
        node_id
    }

    fn free_node(&mut self, node_id: i32) {
        let node = &mut self.nodes[node_id as usize];
        node.parent = self.free_list;
        node.height = -1;
        node.user_data = None;
        self.free_list = node_id;
    }

    /// Creates a proxy for a user AABB and returns its stable id
    pub fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> i32 {
        let proxy_id = self.allocate_node();

        let node = &mut self.nodes[proxy_id as usize];
        node.aabb = aabb.extend(AABB_EXTENSION);
        node.user_data = Some(user_data);
        node.height = 0;

        self.insert_leaf(proxy_id);
        proxy_id
    }

    /// Destroys a proxy and rebalances
    pub fn destroy_proxy(&mut self, proxy_id: i32) {
        debug_assert!(self.nodes[proxy_id as usize].is_leaf());
        self.remove_leaf(proxy_id);
        self.free_node(proxy_id);
    }

    /// Moves a proxy to a new user AABB.
    ///
    /// Returns false without restructuring when the new AABB still fits the
    /// leaf's fat AABB. Otherwise the leaf is reinserted with a fat AABB
    /// grown in the direction of `displacement` to predict further motion.
    pub fn move_proxy(&mut self, proxy_id: i32, aabb: Aabb, displacement: Vec2) -> bool {
        if self.nodes[proxy_id as usize].aabb.contains(&aabb) {
            return false;
        }

        self.remove_leaf(proxy_id);

        let mut fat = aabb.extend(AABB_EXTENSION);

        let d = displacement * AABB_MULTIPLIER;
        if d.x < 0.0 {
            fat.lower.x += d.x;
        } else {
            fat.upper.x += d.x;
        }
        if d.y < 0.0 {
            fat.lower.y += d.y;
        } else {
            fat.upper.y += d.y;
        }

        self.nodes[proxy_id as usize].aabb = fat;
        self.insert_leaf(proxy_id);
        true
    }

    /// Returns the user data attached to a proxy
    pub fn user_data(&self, proxy_id: i32) -> Option<T> {
        self.nodes[proxy_id as usize].user_data
    }

    /// Returns the fat AABB of a proxy
    pub fn fat_aabb(&self, proxy_id: i32) -> Aabb {
        self.nodes[proxy_id as usize].aabb
    }

    /// Returns the height of the tree
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Returns the total node perimeter divided by the root perimeter,
    /// a measure of tree quality
    pub fn area_ratio(&self) -> f64 {
        if self.root == NULL_NODE {
            return 0.0;
        }

        let root_area = self.nodes[self.root as usize].aabb.perimeter();
        let mut total_area = 0.0;
        for node in &self.nodes {
            if node.height < 0 {
                continue;
            }
            total_area += node.aabb.perimeter();
        }

        total_area / root_area
    }

    /// Queries the tree for proxies whose fat AABB overlaps `aabb`.
    /// The callback may return false to stop the traversal.
    pub fn query(&self, aabb: &Aabb, mut callback: impl FnMut(i32) -> bool) {
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(node_id) = stack.pop() {
            if node_id == NULL_NODE {
                continue;
            }

            let node = &self.nodes[node_id as usize];
            if node.aabb.overlaps(aabb) {
                if node.is_leaf() {
                    if !callback(node_id) {
                        return;
                    }
                } else {
                    stack.push(node.child1);
                    stack.push(node.child2);
                }
            }
        }
    }

    /// Ray casts against the proxies in the tree.
    ///
    /// Internal nodes are pruned with a conservative segment test bounded by
    /// the running max fraction. At each leaf the callback returns a new max
    /// fraction: 0 stops the cast, the current value continues unchanged,
    /// and smaller values shrink the ray.
    pub fn ray_cast(&self, input: &RayCastInput, mut callback: impl FnMut(&RayCastInput, i32) -> f64) {
        let p1 = input.p1;
        let p2 = input.p2;
        let mut r = p2 - p1;
        debug_assert!(r.length_squared() > 0.0);
        r = r.normalize();

        // v is perpendicular to the segment.
        let v = r.perpendicular();
        let abs_v = v.abs();

        let mut max_fraction = input.max_fraction;

        // Segment bounding box, shrunk as hits clip the ray.
        let mut segment_aabb = {
            let t = p1 + (p2 - p1) * max_fraction;
            Aabb::new(p1.min(&t), p1.max(&t))
        };

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(node_id) = stack.pop() {
            if node_id == NULL_NODE {
                continue;
            }

            let node = &self.nodes[node_id as usize];
            if !node.aabb.overlaps(&segment_aabb) {
                continue;
            }

            // Separating axis test on |dot(v, p1 - center)| > dot(|v|, h)
            // from "Real-time Collision Detection", p. 179.
            let c = node.aabb.center();
            let h = node.aabb.half_extents();
            let separation = (v.dot(&(p1 - c))).abs() - abs_v.dot(&h);
            if separation > 0.0 {
                continue;
            }

            if node.is_leaf() {
                let sub_input = RayCastInput {
                    p1,
                    p2,
                    max_fraction,
                };

                let value = callback(&sub_input, node_id);
                if value == 0.0 {
                    // The client has terminated the ray cast.
                    return;
                }

                if value > 0.0 {
                    max_fraction = value;
                    let t = p1 + (p2 - p1) * max_fraction;
                    segment_aabb = Aabb::new(p1.min(&t), p1.max(&t));
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    fn insert_leaf(&mut self, leaf: i32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // Descend toward the cheapest sibling by surface-area cost:
        // perimeter of the combined box plus the inherited enlargement of
        // every ancestor.
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut index = self.root;
        while !self.nodes[index as usize].is_leaf() {
            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;

            let area = self.nodes[index as usize].aabb.perimeter();

            let combined_aabb = self.nodes[index as usize].aabb.combine(&leaf_aabb);
            let combined_area = combined_aabb.perimeter();

            // Cost of creating a new parent for this node and the new leaf.
            let cost = 2.0 * combined_area;

            // Minimum cost of pushing the leaf further down the tree.
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost1 = self.descend_cost(child1, &leaf_aabb) + inheritance_cost;
            let cost2 = self.descend_cost(child2, &leaf_aabb) + inheritance_cost;

            if cost < cost1 && cost < cost2 {
                break;
            }

            index = if cost1 < cost2 { child1 } else { child2 };
        }

        let sibling = index;

        // Create a new parent.
        let old_parent = self.nodes[sibling as usize].parent;
        let sibling_aabb = self.nodes[sibling as usize].aabb;
        let sibling_height = self.nodes[sibling as usize].height;
        let new_parent = self.allocate_node();
        {
            let node = &mut self.nodes[new_parent as usize];
            node.parent = old_parent;
            node.aabb = leaf_aabb.combine(&sibling_aabb);
            node.height = sibling_height + 1;
        }

        if old_parent != NULL_NODE {
            if self.nodes[old_parent as usize].child1 == sibling {
                self.nodes[old_parent as usize].child1 = new_parent;
            } else {
                self.nodes[old_parent as usize].child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }

        self.nodes[new_parent as usize].child1 = sibling;
        self.nodes[new_parent as usize].child2 = leaf;
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        // Walk back up refitting AABBs and restoring balance.
        let mut index = self.nodes[leaf as usize].parent;
        while index != NULL_NODE {
            index = self.balance(index);

            let child1 = self.nodes[index as usize].child1;
            let child2 = self.nodes[index as usize].child2;

            self.nodes[index as usize].height = 1 + self.nodes[child1 as usize]
                .height
                .max(self.nodes[child2 as usize].height);
            self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                .aabb
                .combine(&self.nodes[child2 as usize].aabb);

            index = self.nodes[index as usize].parent;
        }
    }

    fn descend_cost(&self, child: i32, leaf_aabb: &Aabb) -> f64 {
        let child_aabb = &self.nodes[child as usize].aabb;
        let combined = leaf_aabb.combine(child_aabb);
        if self.nodes[child as usize].is_leaf() {
            combined.perimeter()
        } else {
            combined.perimeter() - child_aabb.perimeter()
        }
    }

    fn remove_leaf(&mut self, leaf: i32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grand_parent != NULL_NODE {
            // Destroy the parent and connect the sibling to the grandparent.
            if self.nodes[grand_parent as usize].child1 == parent {
                self.nodes[grand_parent as usize].child1 = sibling;
            } else {
                self.nodes[grand_parent as usize].child2 = sibling;
            }
            self.nodes[sibling as usize].parent = grand_parent;
            self.free_node(parent);

            // Adjust ancestor bounds.
            let mut index = grand_parent;
            while index != NULL_NODE {
                index = self.balance(index);

                let child1 = self.nodes[index as usize].child1;
                let child2 = self.nodes[index as usize].child2;

                self.nodes[index as usize].aabb = self.nodes[child1 as usize]
                    .aabb
                    .combine(&self.nodes[child2 as usize].aabb);
                self.nodes[index as usize].height = 1 + self.nodes[child1 as usize]
                    .height
                    .max(self.nodes[child2 as usize].height);

                index = self.nodes[index as usize].parent;
            }
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Performs a left or right rotation if node A is imbalanced.
    /// Returns the new root of the rotated subtree.
    fn balance(&mut self, a: i32) -> i32 {
        if self.nodes[a as usize].is_leaf() || self.nodes[a as usize].height < 2 {
            return a;
        }

        let b = self.nodes[a as usize].child1;
        let c = self.nodes[a as usize].child2;

        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        // Rotate C up.
        if balance > 1 {
            let f = self.nodes[c as usize].child1;
            let g = self.nodes[c as usize].child2;

            // Swap A and C.
            self.nodes[c as usize].child1 = a;
            self.nodes[c as usize].parent = self.nodes[a as usize].parent;
            self.nodes[a as usize].parent = c;

            // A's old parent should point to C.
            let c_parent = self.nodes[c as usize].parent;
            if c_parent != NULL_NODE {
                if self.nodes[c_parent as usize].child1 == a {
                    self.nodes[c_parent as usize].child1 = c;
                } else {
                    debug_assert!(self.nodes[c_parent as usize].child2 == a);
                    self.nodes[c_parent as usize].child2 = c;
                }
            } else {
                self.root = c;
            }

            // Rotate.
            if self.nodes[f as usize].height > self.nodes[g as usize].height {
                self.nodes[c as usize].child2 = f;
                self.nodes[a as usize].child2 = g;
                self.nodes[g as usize].parent = a;
                self.refit_pair(a, b, g);
                self.refit_pair(c, a, f);
            } else {
                self.nodes[c as usize].child2 = g;
                self.nodes[a as usize].child2 = f;
                self.nodes[f as usize].parent = a;
                self.refit_pair(a, b, f);
                self.refit_pair(c, a, g);
            }

            return c;
        }

        // Rotate B up.
        if balance < -1 {
            let d = self.nodes[b as usize].child1;
            let e = self.nodes[b as usize].child2;

            // Swap A and B.
            self.nodes[b as usize].child1 = a;
            self.nodes[b as usize].parent = self.nodes[a as usize].parent;
            self.nodes[a as usize].parent = b;

            let b_parent = self.nodes[b as usize].parent;
            if b_parent != NULL_NODE {
                if self.nodes[b_parent as usize].child1 == a {
                    self.nodes[b_parent as usize].child1 = b;
                } else {
                    debug_assert!(self.nodes[b_parent as usize].child2 == a);
                    self.nodes[b_parent as usize].child2 = b;
                }
            } else {
                self.root = b;
            }

            if self.nodes[d as usize].height > self.nodes[e as usize].height {
                self.nodes[b as usize].child2 = d;
                self.nodes[a as usize].child1 = e;
                self.nodes[e as usize].parent = a;
                self.refit_pair(a, e, c);
                self.refit_pair(b, a, d);
            } else {
                self.nodes[b as usize].child2 = e;
                self.nodes[a as usize].child1 = d;
                self.nodes[d as usize].parent = a;
                self.refit_pair(a, d, c);
                self.refit_pair(b, a, e);
            }

            return b;
        }

        a
    }

    fn refit_pair(&mut self, node: i32, child1: i32, child2: i32) {
        self.nodes[node as usize].aabb = self.nodes[child1 as usize]
            .aabb
            .combine(&self.nodes[child2 as usize].aabb);
        self.nodes[node as usize].height = 1 + self.nodes[child1 as usize]
            .height
            .max(self.nodes[child2 as usize].height);
    }

    /// Checks the structural invariants of the tree. Used by tests and
    /// internal sanity checks; panics on corruption.
    pub fn validate(&self) {
        self.validate_structure(self.root);
        self.validate_metrics(self.root);

        let mut free_count = 0;
        let mut free_index = self.free_list;
        while free_index != NULL_NODE {
            free_index = self.nodes[free_index as usize].parent;
            free_count += 1;
        }

        let live: usize = self.nodes.iter().filter(|n| n.height >= 0).count();
        assert_eq!(live + free_count, self.nodes.len(), "node pool leak");
    }

    fn validate_structure(&self, index: i32) {
        if index == NULL_NODE {
            return;
        }

        if index == self.root {
            assert_eq!(self.nodes[index as usize].parent, NULL_NODE);
        }

        let node = &self.nodes[index as usize];
        let child1 = node.child1;
        let child2 = node.child2;

        if node.is_leaf() {
            assert_eq!(child1, NULL_NODE);
            assert_eq!(child2, NULL_NODE);
            assert_eq!(node.height, 0);
            return;
        }

        assert_eq!(self.nodes[child1 as usize].parent, index);
        assert_eq!(self.nodes[child2 as usize].parent, index);

        self.validate_structure(child1);
        self.validate_structure(child2);
    }

    fn validate_metrics(&self, index: i32) {
        if index == NULL_NODE {
            return;
        }

        let node = &self.nodes[index as usize];
        if node.is_leaf() {
            return;
        }

        let child1 = node.child1;
        let child2 = node.child2;

        let height1 = self.nodes[child1 as usize].height;
        let height2 = self.nodes[child2 as usize].height;
        assert_eq!(node.height, 1 + height1.max(height2));

        let combined = self.nodes[child1 as usize]
            .aabb
            .combine(&self.nodes[child2 as usize].aabb);
        assert!(node.aabb.contains(&combined), "parent AABB does not enclose children");

        self.validate_metrics(child1);
        self.validate_metrics(child2);
    }
}

impl<T: Copy> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
