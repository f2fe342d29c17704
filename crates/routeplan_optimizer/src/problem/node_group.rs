use std::{cmp::Reverse, collections::BinaryHeap};

use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    define_index_newtype,
    problem::node_layout::{DEPOT, NodeIdx, NodeLayout, TaskIdx},
};

define_index_newtype!(GroupIdx, NodeGroup);

/// Nodes linked by tasks. A group is served by a single vehicle and is inserted into and
/// removed from routes as a whole.
#[derive(Debug, Clone)]
pub struct NodeGroup {
    /// Origins come before destinations when `is_ordered`
    nodes: SmallVec<[NodeIdx; 4]>,
    tasks: SmallVec<[TaskIdx; 4]>,
    is_ordered: bool,
}

impl NodeGroup {
    pub fn nodes(&self) -> &[NodeIdx] {
        &self.nodes
    }

    pub fn tasks(&self) -> &[TaskIdx] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `false` when the tasks of the group require both `a` before `b` and `b` before `a`.
    pub fn is_ordered(&self) -> bool {
        self.is_ordered
    }
}

struct UnionFind {
    parents: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        UnionFind {
            parents: (0..len).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parents[index] != index {
            self.parents[index] = self.parents[self.parents[index]];
            index = self.parents[index];
        }
        index
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        // smallest index as root, keeps group numbering stable
        if a < b {
            self.parents[b] = a;
        } else if b < a {
            self.parents[a] = b;
        }
    }
}

/// Precedence edges `origin -> destination` between two distinct non-depot nodes.
pub fn precedence_edges(layout: &NodeLayout) -> Vec<(NodeIdx, NodeIdx)> {
    let mut edges = layout
        .pickup_delivery_pairs()
        .filter(|&(origin, destination)| {
            origin != DEPOT && destination != DEPOT && origin != destination
        })
        .collect::<Vec<_>>();
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Topological order of `nodes`, smallest index first among ready nodes.
fn topological_order(
    nodes: &[NodeIdx],
    edges: &[(NodeIdx, NodeIdx)],
) -> Option<SmallVec<[NodeIdx; 4]>> {
    let mut in_degree: FxHashMap<NodeIdx, usize> = nodes.iter().map(|&node| (node, 0)).collect();
    for (_, destination) in edges {
        if let Some(degree) = in_degree.get_mut(destination) {
            *degree += 1;
        }
    }

    let mut ready = nodes
        .iter()
        .filter(|node| in_degree[*node] == 0)
        .map(|&node| Reverse(node))
        .collect::<BinaryHeap<_>>();

    let mut order = SmallVec::new();
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &(_, destination) in edges.iter().filter(|(origin, _)| *origin == node) {
            if let Some(degree) = in_degree.get_mut(&destination) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(destination));
                }
            }
        }
    }

    (order.len() == nodes.len()).then_some(order)
}

/// Partitions the non-depot nodes into groups, returns the groups and the group of each
/// node (`None` for the depot).
pub fn build_node_groups(layout: &NodeLayout) -> (Vec<NodeGroup>, Vec<Option<GroupIdx>>) {
    let num_nodes = layout.num_nodes();
    let mut union_find = UnionFind::new(num_nodes);

    for (origin, destination) in layout.pickup_delivery_pairs() {
        if origin != DEPOT && destination != DEPOT {
            union_find.union(origin.get(), destination.get());
        }
    }

    let mut groups: Vec<NodeGroup> = Vec::new();
    let mut group_of_root: FxHashMap<usize, GroupIdx> = FxHashMap::default();
    let mut node_groups: Vec<Option<GroupIdx>> = vec![None; num_nodes];

    for node in NodeIdx::range(num_nodes).skip(1) {
        let root = union_find.find(node.get());
        let group = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(NodeGroup {
                nodes: SmallVec::new(),
                tasks: SmallVec::new(),
                is_ordered: true,
            });
            GroupIdx::new(groups.len() - 1)
        });

        groups[group].nodes.push(node);
        node_groups[node.get()] = Some(group);
    }

    for (index, (origin, destination)) in layout.pickup_delivery_pairs().enumerate() {
        let node = if origin == DEPOT { destination } else { origin };
        if let Some(group) = node_groups[node.get()] {
            groups[group].tasks.push(TaskIdx::new(index));
        }
    }

    let edges = precedence_edges(layout);
    for group in groups.iter_mut() {
        match topological_order(&group.nodes, &edges) {
            Some(order) => group.nodes = order,
            None => group.is_ordered = false,
        }
    }

    (groups, node_groups)
}
