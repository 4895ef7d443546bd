use crate::collision::dynamic_tree::{DynamicTree, NULL_NODE};
use crate::math::{Aabb, RayCastInput, Vec2};

/// A candidate proxy pair, canonically ordered with `a < b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProxyPair {
    pub a: i32,
    pub b: i32,
}

impl ProxyPair {
    /// Creates a pair with consistent ordering
    pub fn new(a: i32, b: i32) -> Self {
        if a < b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// The broad phase: a dynamic tree plus a buffer of moved proxies.
///
/// Proxy mutations record the proxy in the move buffer; `update_pairs`
/// queries the tree once per moved proxy and reports each unique
/// overlapping pair exactly once, in ascending order, so downstream
/// contact creation is deterministic.
pub struct BroadPhase<T: Copy> {
    tree: DynamicTree<T>,
    move_buffer: Vec<i32>,
}

impl<T: Copy> BroadPhase<T> {
    /// Creates an empty broad phase
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            move_buffer: Vec::new(),
        }
    }

    /// Creates a proxy and schedules it for pair generation
    pub fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> i32 {
        let proxy_id = self.tree.create_proxy(aabb, user_data);
        self.buffer_move(proxy_id);
        proxy_id
    }

    /// Destroys a proxy and removes any pending move entry
    pub fn destroy_proxy(&mut self, proxy_id: i32) {
        self.unbuffer_move(proxy_id);
        self.tree.destroy_proxy(proxy_id);
    }

    /// Moves a proxy; if the tree required a reinsertion the proxy is
    /// scheduled for pair generation
    pub fn move_proxy(&mut self, proxy_id: i32, aabb: Aabb, displacement: Vec2) {
        if self.tree.move_proxy(proxy_id, aabb, displacement) {
            self.buffer_move(proxy_id);
        }
    }

    /// Forces a proxy to be reconsidered for pairs on the next update
    pub fn touch_proxy(&mut self, proxy_id: i32) {
        self.buffer_move(proxy_id);
    }

    /// Returns the fat AABB of a proxy
    pub fn fat_aabb(&self, proxy_id: i32) -> Aabb {
        self.tree.fat_aabb(proxy_id)
    }

    /// Returns the user data attached to a proxy
    pub fn user_data(&self, proxy_id: i32) -> Option<T> {
        self.tree.user_data(proxy_id)
    }

    /// Returns whether the fat AABBs of two proxies overlap
    pub fn test_overlap(&self, proxy_a: i32, proxy_b: i32) -> bool {
        self.tree.fat_aabb(proxy_a).overlaps(&self.tree.fat_aabb(proxy_b))
    }

    /// Returns the number of proxies scheduled for pair generation
    pub fn move_count(&self) -> usize {
        self.move_buffer.len()
    }

    /// Returns the height of the underlying tree
    pub fn tree_height(&self) -> i32 {
        self.tree.height()
    }

    /// Gives access to the underlying tree for queries and validation
    pub fn tree(&self) -> &DynamicTree<T> {
        &self.tree
    }

    fn buffer_move(&mut self, proxy_id: i32) {
        self.move_buffer.push(proxy_id);
    }

    fn unbuffer_move(&mut self, proxy_id: i32) {
        for entry in self.move_buffer.iter_mut() {
            if *entry == proxy_id {
                *entry = NULL_NODE;
            }
        }
    }

    /// Emits the unique set of overlapping pairs touching the move buffer.
    ///
    /// For each moved proxy the tree is queried with its fat AABB. Pairs are
    /// canonicalized, deduplicated, sorted ascending, and reported through
    /// `callback(user_data_a, user_data_b)`. The move buffer is cleared.
    pub fn update_pairs(&mut self, mut callback: impl FnMut(T, T)) {
        let mut pairs: Vec<ProxyPair> = Vec::new();

        let moves = std::mem::take(&mut self.move_buffer);
        for &query_proxy in &moves {
            if query_proxy == NULL_NODE {
                continue;
            }

            let fat_aabb = self.tree.fat_aabb(query_proxy);
            self.tree.query(&fat_aabb, |proxy_id| {
                // A proxy does not pair with itself.
                if proxy_id == query_proxy {
                    return true;
                }
                pairs.push(ProxyPair::new(query_proxy, proxy_id));
                true
            });
        }

        // Sort for deterministic behavior, then skip duplicates produced by
        // both endpoints having moved.
        pairs.sort_unstable();
        pairs.dedup();

        for pair in pairs {
            let user_data_a = self.tree.user_data(pair.a);
            let user_data_b = self.tree.user_data(pair.b);
            if let (Some(a), Some(b)) = (user_data_a, user_data_b) {
                callback(a, b);
            }
        }
    }

    /// Ray casts against the tree; see [`DynamicTree::ray_cast`]
    pub fn ray_cast(&self, input: &RayCastInput, callback: impl FnMut(&RayCastInput, i32) -> f64) {
        self.tree.ray_cast(input, callback)
    }

    /// Queries the tree for proxies overlapping `aabb`
    pub fn query(&self, aabb: &Aabb, callback: impl FnMut(i32) -> bool) {
        self.tree.query(aabb, callback)
    }
}

impl<T: Copy> Default for BroadPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}
