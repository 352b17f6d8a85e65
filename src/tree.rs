//! Drainage trees over D8 pointer grids.
//!
//! Every valid cell becomes a node whose parent is the cell it drains into. Outlets (sinks,
//! cells draining off-grid or into nodata) are the roots, so the result is a forest with one
//! tree per outlet.  Nodes live in a flat arena indexed by [`NodeId`]; all traversals use
//! explicit stacks so large grids do not exhaust the call stack.

use log::debug;
use ndarray::Array2;
use num::ToPrimitive;

use crate::direction::{Flow, FlowDirectionGrid};
use crate::error::{Error, Result};
use crate::geotransform::GeoTransform;
use crate::seeds::{Seed, SeedKind, SeedSet};

/// Index of a node in [`DrainageTree::nodes`].  Ids follow the row-major order of the cells.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub row: usize,
    pub col: usize,
    pub accumulation: f64,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    pub fn cell(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Options for [`build_tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams<T> {
    /// Cells with accumulation at or above this are channel cells.
    pub threshold: T,
    /// Georeferencing of the grids, used for stream lengths.
    pub transform: Option<GeoTransform>,
    /// Reject accumulation grids that decrease along a flow path.
    pub check_accumulation: bool,
}

impl<T> TreeParams<T> {
    pub fn new(threshold: T) -> Self {
        Self { threshold, transform: None, check_accumulation: true }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_accumulation_check(mut self, check: bool) -> Self {
        self.check_accumulation = check;
        self
    }
}

impl<T: num::Zero> Default for TreeParams<T> {
    fn default() -> Self {
        Self::new(T::zero())
    }
}

/// An immutable forest of drainage trees.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainageTree {
    nodes: Vec<Node>,
    index: Array2<Option<NodeId>>,
    roots: Vec<NodeId>,
    transform: Option<GeoTransform>,
}

/// Builds the drainage tree of `direction` and picks its seeds.
///
/// Fails with [`Error::DimensionMismatch`] when the grids differ in shape,
/// [`Error::CyclicFlowPath`] when some flow path loops, and
/// [`Error::AccumulationDecreases`] when `params.check_accumulation` is set and the accumulation
/// drops from a cell to its downstream neighbour.
///
/// ```
/// use ndarray::array;
/// use drainage_tree::{build_tree, FlowDirectionGrid, PointerScheme, SeedKind, TreeParams};
///
/// // two rows draining east into a sink in the bottom-right corner
/// let dir = FlowDirectionGrid::new(array![[1, 1, 4], [1, 1, 0]], PointerScheme::Esri).unwrap();
/// let acc = array![[0u32, 1, 2], [0, 1, 5]];
/// let (tree, seeds) = build_tree(&acc, &dir, &TreeParams::new(0)).unwrap();
/// assert_eq!(tree.roots().len(), 1);
/// assert_eq!(seeds.len(), 3);
/// assert_eq!(seeds.get(2).unwrap().kind, SeedKind::Confluence);
/// ```
pub fn build_tree<T>(
    accumulation: &Array2<T>,
    direction: &FlowDirectionGrid,
    params: &TreeParams<T>,
) -> Result<(DrainageTree, SeedSet)>
where
    T: Copy + PartialOrd + ToPrimitive,
{
    let (rows, columns) = direction.shape();
    if accumulation.dim() != (rows, columns) {
        return Err(Error::DimensionMismatch {
            er: rows,
            ec: columns,
            ar: accumulation.nrows(),
            ac: accumulation.ncols(),
        });
    }

    let flows = direction.flows();
    check_acyclic(&flows, columns)?;

    if params.check_accumulation {
        for (k, f) in flows.iter().enumerate() {
            if let Flow::To(rn, cn) = *f {
                let (row, col) = (k / columns, k % columns);
                if accumulation[[rn, cn]] < accumulation[[row, col]] {
                    return Err(Error::AccumulationDecreases { row, col, downstream: (rn, cn) });
                }
            }
        }
    }

    let mut index = Array2::from_elem((rows, columns), None);
    let mut nodes = Vec::new();
    for (k, f) in flows.iter().enumerate() {
        if *f == Flow::NoData {
            continue;
        }
        let (row, col) = (k / columns, k % columns);
        index[[row, col]] = Some(nodes.len());
        nodes.push(Node {
            row,
            col,
            accumulation: accumulation[[row, col]].to_f64().unwrap_or(f64::NAN),
            parent: None,
            first_child: None,
            next_sibling: None,
        });
    }

    let mut roots = Vec::new();
    for id in 0..nodes.len() {
        let (row, col) = nodes[id].cell();
        match flows[row * columns + col] {
            Flow::To(rn, cn) => nodes[id].parent = index[[rn, cn]],
            _ => roots.push(id),
        }
    }
    // prepend in reverse so every child list ends up in row-major order
    for id in (0..nodes.len()).rev() {
        if let Some(p) = nodes[id].parent {
            nodes[id].next_sibling = nodes[p].first_child;
            nodes[p].first_child = Some(id);
        }
    }

    let tree = DrainageTree { nodes, index, roots, transform: params.transform };

    let is_channel = |id: NodeId| {
        let (row, col) = tree.nodes[id].cell();
        accumulation[[row, col]] >= params.threshold
    };
    let mut seeds = Vec::new();
    for id in 0..tree.len() {
        if !is_channel(id) {
            continue;
        }
        let kind = match tree.upstream(id).filter(|&c| is_channel(c)).count() {
            0 => SeedKind::ChannelHead,
            1 => continue,
            _ => SeedKind::Confluence,
        };
        let node = &tree.nodes[id];
        seeds.push(Seed { row: node.row, col: node.col, kind, accumulation: node.accumulation });
    }

    debug!(
        "drainage tree over {rows}x{columns} grid: {} nodes, {} outlets, {} seeds",
        tree.len(),
        tree.roots.len(),
        seeds.len()
    );
    Ok((tree, SeedSet::new(seeds)))
}

/// Walks every flow path once; a path that runs back into itself is a cycle.
fn check_acyclic(flows: &[Flow], columns: usize) -> Result<()> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; flows.len()];
    let mut path = Vec::new();
    for start in 0..flows.len() {
        if flows[start] == Flow::NoData || state[start] != UNSEEN {
            continue;
        }
        path.clear();
        let mut k = start;
        loop {
            state[k] = ON_PATH;
            path.push(k);
            let Flow::To(rn, cn) = flows[k] else {
                break;
            };
            let kn = rn * columns + cn;
            match state[kn] {
                ON_PATH => return Err(Error::CyclicFlowPath { row: rn, col: cn }),
                DONE => break,
                _ => k = kn,
            }
        }
        for &k in &path {
            state[k] = DONE;
        }
    }
    Ok(())
}

impl DrainageTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// (rows, cols) of the grid the tree was built from.
    pub fn shape(&self) -> (usize, usize) {
        self.index.dim()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Node of cell (`row`, `col`), `None` for nodata or out-of-bounds cells.
    pub fn node_at(&self, row: usize, col: usize) -> Option<NodeId> {
        self.index.get([row, col]).copied().flatten()
    }

    /// Outlet nodes in row-major order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The transform given at build time, or unit cells when there was none.
    pub fn transform(&self) -> GeoTransform {
        self.transform.unwrap_or_default()
    }

    pub fn downstream(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Nodes draining directly into `id`, in row-major order.
    pub fn upstream(&self, id: NodeId) -> Upstream<'_> {
        Upstream { tree: self, next: self.nodes[id].first_child }
    }

    pub fn is_outlet(&self, id: NodeId) -> bool {
        self.nodes[id].parent.is_none()
    }

    pub fn is_headwater(&self, id: NodeId) -> bool {
        self.nodes[id].first_child.is_none()
    }

    pub fn is_confluence(&self, id: NodeId) -> bool {
        self.upstream(id).nth(1).is_some()
    }

    /// `id` followed by every node downstream of it, ending at its outlet.
    pub fn path_to_outlet(&self, id: NodeId) -> DownstreamPath<'_> {
        DownstreamPath { tree: self, next: Some(id) }
    }

    /// All nodes with every node listed after everything upstream of it.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, bool)> = Vec::new();
        for &root in self.roots.iter() {
            stack.push((root, false));
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    order.push(id);
                    continue;
                }
                stack.push((id, true));
                for child in self.upstream(id) {
                    stack.push((child, false));
                }
            }
        }
        order
    }

    /// Number of cells draining through each node, the node itself included.
    pub fn contributing_cells(&self) -> Vec<usize> {
        let mut counts = vec![1usize; self.nodes.len()];
        for id in self.postorder() {
            if let Some(p) = self.nodes[id].parent {
                counts[p] += counts[id];
            }
        }
        counts
    }
}

/// Iterator over the upstream neighbours of a node.
pub struct Upstream<'a> {
    tree: &'a DrainageTree,
    next: Option<NodeId>,
}

impl Iterator for Upstream<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.nodes[id].next_sibling;
        Some(id)
    }
}

/// Iterator following flow from a node to its outlet.
pub struct DownstreamPath<'a> {
    tree: &'a DrainageTree,
    next: Option<NodeId>,
}

impl Iterator for DownstreamPath<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.nodes[id].parent;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::PointerScheme;
    use ndarray::array;

    fn esri(data: Array2<u8>) -> FlowDirectionGrid {
        FlowDirectionGrid::new(data, PointerScheme::Esri).unwrap()
    }

    #[test]
    fn test_children_in_row_major_order() {
        // everything drains into the centre sink
        let dir = esri(array![
            [2, 4, 8],
            [1, 0, 16],
            [128, 64, 32],
        ]);
        let acc = array![[0, 0, 0], [0, 8, 0], [0, 0, 0]];
        let (tree, _) = build_tree(&acc, &dir, &TreeParams::new(0)).unwrap();
        let centre = tree.node_at(1, 1).unwrap();
        assert_eq!(tree.roots(), &[centre]);
        let kids: Vec<_> = tree.upstream(centre).map(|id| tree.node(id).cell()).collect();
        assert_eq!(kids, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1), (2, 2)]);
        assert!(tree.is_confluence(centre));
        assert_eq!(tree.contributing_cells()[centre], 9);
    }

    #[test]
    fn test_postorder_puts_upstream_first() {
        let dir = esri(array![[1, 1, 1, 4], [0, 16, 16, 16]]);
        let acc = array![[0, 1, 2, 3], [7, 6, 5, 4]];
        let (tree, _) = build_tree(&acc, &dir, &TreeParams::new(0)).unwrap();
        let order = tree.postorder();
        assert_eq!(order.len(), 8);
        let mut seen = vec![false; tree.len()];
        for id in order {
            for up in tree.upstream(id) {
                assert!(seen[up]);
            }
            seen[id] = true;
        }
        let path: Vec<_> = tree.path_to_outlet(0).map(|id| tree.node(id).cell()).collect();
        assert_eq!(path.len(), 8);
        assert_eq!(path.last(), Some(&(1, 0)));
    }

    #[test]
    fn test_long_path_without_recursion() {
        let n = 200_000;
        let mut data = Array2::from_elem((1, n), 1u8);
        data[[0, n - 1]] = 0;
        let acc = Array2::from_shape_fn((1, n), |(_, c)| c as u32);
        let (tree, seeds) = build_tree(&acc, &esri(data), &TreeParams::new(0)).unwrap();
        assert_eq!(tree.postorder().len(), n);
        assert_eq!(tree.contributing_cells()[n - 1], n);
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn test_accumulation_check() {
        let dir = esri(array![[1, 0]]);
        let acc = array![[3, 1]];
        assert_eq!(
            build_tree(&acc, &dir, &TreeParams::new(0)),
            Err(Error::AccumulationDecreases { row: 0, col: 0, downstream: (0, 1) })
        );
        let params = TreeParams::new(0).with_accumulation_check(false);
        assert!(build_tree(&acc, &dir, &params).is_ok());
    }

    #[test]
    fn test_nodata_not_in_tree() {
        let dir = esri(array![[1, 255], [0, 0]]);
        let acc = array![[0.0, 0.0], [0.0, 0.0]];
        let (tree, _) = build_tree(&acc, &dir, &TreeParams::new(0.0)).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.node_at(0, 1), None);
        assert_eq!(tree.node_at(5, 5), None);
        // (0, 0) points into nodata so it is an outlet
        assert_eq!(tree.roots().len(), 3);
    }
}
