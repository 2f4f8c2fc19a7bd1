//! Binary space-partition rectangle packer.
//!
//! [`RectPacker`] divides a fixed root rectangle into a binary tree of cells.
//! Each insertion walks the tree left-first, depth-first, and claims the first
//! free leaf large enough for the padded request, splitting it when the fit is
//! not exact. Packed cells are never freed or moved.
//!
//! The tree is stored as an arena: nodes live in a `Vec` and refer to their
//! children by [`NodeId`]. Every node except the root has exactly one parent,
//! so the arena never contains cycles.
//!
//! # Example
//!
//! ```
//! use mosaic_core::packer::RectPacker;
//! use mosaic_core::Rect;
//!
//! let mut packer = RectPacker::new(100, 100);
//! assert_eq!(packer.insert(40, 40, 2), Some(Rect::new(2, 2, 40, 40)));
//! assert_eq!(packer.insert(40, 40, 2), Some(Rect::new(2, 46, 40, 40)));
//! assert_eq!(packer.insert(200, 1, 0), None);
//! ```

use crate::rect::Rect;

/// Index of a node inside a [`RectPacker`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node of every packer.
    pub const ROOT: NodeId = NodeId(0);

    /// Get the raw arena index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A node of the packing tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackerNode {
    /// A cell that has not been split. Occupancy is tracked only here.
    Leaf {
        /// Area covered by this cell, including any border.
        rect: Rect,
        /// Whether an image has been placed in this cell.
        occupied: bool,
    },
    /// A cell split into two children that exactly partition `rect`.
    Split {
        /// Area covered by this cell.
        rect: Rect,
        /// Top child (horizontal split) or left child (vertical split).
        left: NodeId,
        /// Bottom child (horizontal split) or right child (vertical split).
        right: NodeId,
    },
}

impl PackerNode {
    /// The area covered by this node.
    pub fn rect(&self) -> Rect {
        match self {
            Self::Leaf { rect, .. } | Self::Split { rect, .. } => *rect,
        }
    }

    /// Returns true if this is a leaf holding an image.
    pub fn is_occupied(&self) -> bool {
        matches!(self, Self::Leaf { occupied: true, .. })
    }
}

/// Rectangle packer over a fixed-size area.
///
/// # Thread Safety
///
/// `RectPacker` has no internal locking. Wrap it in a mutex to share it.
#[derive(Debug, Clone)]
pub struct RectPacker {
    nodes: Vec<PackerNode>,
}

impl RectPacker {
    /// Create a packer covering `width` x `height` texels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            nodes: vec![PackerNode::Leaf {
                rect: Rect::from_size(width, height),
                occupied: false,
            }],
        }
    }

    /// Width of the packing area.
    pub fn width(&self) -> u32 {
        self.root_rect().width
    }

    /// Height of the packing area.
    pub fn height(&self) -> u32 {
        self.root_rect().height
    }

    /// The root rectangle.
    pub fn root_rect(&self) -> Rect {
        self.nodes[NodeId::ROOT.index()].rect()
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&PackerNode> {
        self.nodes.get(id.index())
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of cells holding an image.
    pub fn occupied_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_occupied()).count()
    }

    /// Iterate the padded cells that hold images.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Rect> + '_ {
        self.nodes
            .iter()
            .filter(|n| n.is_occupied())
            .map(PackerNode::rect)
    }

    /// Reserve space for a `width` x `height` image surrounded by `border`
    /// texels of padding on every side.
    ///
    /// Returns the content rectangle (border excluded), or `None` if no free
    /// cell can hold the padded request.
    pub fn insert(&mut self, width: u32, height: u32, border: u32) -> Option<Rect> {
        let padded_width = padded(width, border)?;
        let padded_height = padded(height, border)?;
        let request = Request {
            width,
            height,
            padded_width,
            padded_height,
        };

        // Left-first depth-first walk: push right before left.
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            match self.nodes[id.index()] {
                PackerNode::Split { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                PackerNode::Leaf { occupied: true, .. } => {}
                PackerNode::Leaf { rect, .. } => {
                    if let Some(cell) = self.place(id, rect, &request) {
                        log::trace!(
                            "RectPacker: placed {width}x{height} (border {border}) at {cell:?}"
                        );
                        return cell.shrink(border);
                    }
                }
            }
        }

        None
    }

    /// Try to place the request in the free leaf `id`, splitting as needed.
    fn place(&mut self, mut id: NodeId, mut rect: Rect, request: &Request) -> Option<Rect> {
        loop {
            if request.padded_width > rect.width || request.padded_height > rect.height {
                return None;
            }

            if request.padded_width == rect.width && request.padded_height == rect.height {
                self.nodes[id.index()] = PackerNode::Leaf {
                    rect,
                    occupied: true,
                };
                return Some(rect);
            }

            let (first, second) = if rect.width - request.width < rect.height - request.height {
                // Horizontal cut: top keeps the full width.
                (
                    Rect::new(rect.x, rect.y, rect.width, request.padded_height),
                    Rect::new(
                        rect.x,
                        rect.y + request.padded_height,
                        rect.width,
                        rect.height - request.padded_height,
                    ),
                )
            } else {
                // Vertical cut: left keeps the full height.
                (
                    Rect::new(rect.x, rect.y, request.padded_width, rect.height),
                    Rect::new(
                        rect.x + request.padded_width,
                        rect.y,
                        rect.width - request.padded_width,
                        rect.height,
                    ),
                )
            };

            let left = self.push_leaf(first);
            let right = self.push_leaf(second);
            self.nodes[id.index()] = PackerNode::Split { rect, left, right };

            // The first child was sized for this request and always accepts it.
            id = left;
            rect = first;
        }
    }

    fn push_leaf(&mut self, rect: Rect) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PackerNode::Leaf {
            rect,
            occupied: false,
        });
        id
    }
}

struct Request {
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
}

fn padded(size: u32, border: u32) -> Option<u32> {
    size.checked_add(border.checked_mul(2)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_disjoint_and_inside(packer: &RectPacker, rects: &[Rect]) {
        let root = packer.root_rect();
        for (i, a) in rects.iter().enumerate() {
            assert!(root.contains_rect(a), "{a:?} escapes {root:?}");
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_first_insert_at_origin() {
        let mut packer = RectPacker::new(100, 100);
        assert_eq!(packer.insert(40, 40, 2), Some(Rect::new(2, 2, 40, 40)));
    }

    #[test]
    fn test_second_insert_packs_below_first() {
        let mut packer = RectPacker::new(100, 100);
        packer.insert(40, 40, 2).unwrap();
        assert_eq!(packer.insert(40, 40, 2), Some(Rect::new(2, 46, 40, 40)));
    }

    #[test]
    fn test_exact_fit_takes_root_without_split() {
        let mut packer = RectPacker::new(64, 32);
        assert_eq!(packer.insert(64, 32, 0), Some(Rect::new(0, 0, 64, 32)));
        assert_eq!(packer.node_count(), 1);
        assert_eq!(packer.insert(1, 1, 0), None);
    }

    #[test]
    fn test_horizontal_split_when_width_slack_is_smaller() {
        let mut packer = RectPacker::new(50, 100);
        packer.insert(40, 10, 0).unwrap();
        // Root was cut into a 50x10 top strip and a 50x90 bottom.
        match packer.node(NodeId::ROOT) {
            Some(PackerNode::Split { left, right, .. }) => {
                assert_eq!(packer.node(*left).unwrap().rect(), Rect::new(0, 0, 50, 10));
                assert_eq!(packer.node(*right).unwrap().rect(), Rect::new(0, 10, 50, 90));
            }
            other => panic!("expected split root, got {other:?}"),
        }
    }

    #[test]
    fn test_vertical_split_on_equal_slack() {
        let mut packer = RectPacker::new(100, 100);
        packer.insert(10, 10, 0).unwrap();
        match packer.node(NodeId::ROOT) {
            Some(PackerNode::Split { left, right, .. }) => {
                assert_eq!(packer.node(*left).unwrap().rect(), Rect::new(0, 0, 10, 100));
                assert_eq!(packer.node(*right).unwrap().rect(), Rect::new(10, 0, 90, 100));
            }
            other => panic!("expected split root, got {other:?}"),
        }
    }

    #[rstest]
    #[case(101, 10, 0)]
    #[case(10, 101, 0)]
    #[case(101, 101, 0)]
    #[case(101, 10, 5)]
    #[case(200, 200, 0)]
    fn test_oversized_request_fails(#[case] width: u32, #[case] height: u32, #[case] border: u32) {
        let mut packer = RectPacker::new(100, 100);
        assert_eq!(packer.insert(width, height, border), None);
        assert_eq!(packer.node_count(), 1);
    }

    #[test]
    fn test_border_pushes_request_over_capacity() {
        let mut packer = RectPacker::new(100, 100);
        assert_eq!(packer.insert(98, 98, 2), None);
        assert_eq!(packer.insert(96, 96, 2), Some(Rect::new(2, 2, 96, 96)));
    }

    #[test]
    fn test_huge_border_fails_instead_of_overflowing() {
        let mut packer = RectPacker::new(100, 100);
        assert_eq!(packer.insert(1, 1, u32::MAX), None);
        assert_eq!(packer.insert(u32::MAX, 1, 1), None);
    }

    #[test]
    fn test_zero_size_request() {
        let mut packer = RectPacker::new(16, 16);
        let rect = packer.insert(0, 0, 0).unwrap();
        assert_eq!((rect.width, rect.height), (0, 0));
        // The zero-width cut leaves the whole area in the right child.
        assert_eq!(packer.insert(16, 16, 0), Some(Rect::new(0, 0, 16, 16)));
        assert_eq!(packer.insert(1, 1, 0), None);
    }

    #[test]
    fn test_full_packer_rejects_everything() {
        let mut packer = RectPacker::new(4, 4);
        for _ in 0..16 {
            assert!(packer.insert(1, 1, 0).is_some());
        }
        assert_eq!(packer.insert(1, 1, 0), None);
        assert_eq!(packer.occupied_count(), 16);
    }

    #[test]
    fn test_returned_size_matches_request() {
        let mut packer = RectPacker::new(512, 512);
        let sizes = [(17, 9), (64, 64), (3, 120), (100, 7), (33, 33), (1, 1)];
        for (i, (w, h)) in sizes.into_iter().enumerate() {
            let border = i as u32 % 3;
            let rect = packer.insert(w, h, border).unwrap();
            assert_eq!((rect.width, rect.height), (w, h));
        }
    }

    #[test]
    fn test_rects_are_disjoint_and_inside() {
        let mut packer = RectPacker::new(256, 256);
        let mut placed = Vec::new();
        // Deterministic pseudo-random sizes.
        let mut seed = 0x2545_f491_u32;
        for _ in 0..200 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let w = seed % 24;
            let h = (seed >> 8) % 24;
            let border = (seed >> 16) % 3;
            if let Some(rect) = packer.insert(w, h, border) {
                placed.push(rect);
            }
        }
        assert!(!placed.is_empty());
        assert_disjoint_and_inside(&packer, &placed);

        let cells: Vec<Rect> = packer.occupied_cells().collect();
        assert_disjoint_and_inside(&packer, &cells);
    }

    #[test]
    fn test_split_children_partition_parent() {
        let mut packer = RectPacker::new(128, 64);
        for (w, h) in [(30, 20), (10, 40), (60, 5), (8, 8)] {
            packer.insert(w, h, 1);
        }
        for index in 0..packer.node_count() {
            if let Some(PackerNode::Split { rect, left, right }) =
                packer.node(NodeId(index as u32))
            {
                let l = packer.node(*left).unwrap().rect();
                let r = packer.node(*right).unwrap().rect();
                assert!(rect.contains_rect(&l) && rect.contains_rect(&r));
                assert!(!l.intersects(&r));
                assert_eq!(l.area() + r.area(), rect.area());
            }
        }
    }
}
