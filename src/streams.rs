//! Main-stem decomposition of a drainage tree.
//!
//! Cells are taken from largest to smallest accumulation.  A cell not yet on a stream becomes
//! the mouth of a new one, which then climbs upstream, always into the unclaimed tributary with
//! the largest accumulation, until it reaches a headwater.

use std::cmp::Ordering;
use std::cmp::Ordering::Equal;
use std::collections::BinaryHeap;

use log::debug;
use ndarray::Array2;

use crate::tree::{DrainageTree, NodeId};

/// Mean earth radius in metres.
const RADIUS: f64 = 6371000.0;

#[derive(PartialEq, Debug)]
struct GridCell {
    id: NodeId,
    priority: f64,
}

impl Eq for GridCell {}

impl PartialOrd for GridCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridCell {
    // largest accumulation first, then row-major order
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// How to measure the distance between two cell centres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Euclidean distance in the units of the transform.
    #[default]
    Planar,
    /// Great-circle distance in metres, reading x as longitude and y as latitude in degrees.
    Geodesic,
}

impl DistanceMetric {
    pub fn distance(self, from: (f64, f64), to: (f64, f64)) -> f64 {
        match self {
            DistanceMetric::Planar => (to.0 - from.0).hypot(to.1 - from.1),
            DistanceMetric::Geodesic => {
                let (lon1, lat1) = (from.0.to_radians(), from.1.to_radians());
                let (lon2, lat2) = (to.0.to_radians(), to.1.to_radians());
                let dlon = lon2 - lon1;
                // Vincenty's formula on a sphere, well behaved for neighbouring cells
                let x = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * dlon.cos();
                let y1 = (lat2.cos() * dlon.sin()).powi(2);
                let y2 = (lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos()).powi(2);
                RADIUS * (y1 + y2).sqrt().atan2(x)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// 1-based; 0 marks "no stream" in [`StreamSet::labels`].
    pub id: u32,
    /// Most upstream cell.
    pub head: (usize, usize),
    /// Most downstream cell.
    pub mouth: (usize, usize),
    pub cells: usize,
    /// Accumulation at the mouth.
    pub accumulation: f64,
    /// Distance from head to mouth along the stream.
    pub length: f64,
}

/// Streams ordered by decreasing mouth accumulation, with a raster of stream ids.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSet {
    streams: Vec<Stream>,
    labels: Array2<u32>,
}

impl StreamSet {
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn as_slice(&self) -> &[Stream] {
        &self.streams
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stream> {
        self.streams.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Stream> {
        self.streams.get((id as usize).checked_sub(1)?)
    }

    /// Stream id of every cell, 0 for nodata.
    pub fn labels(&self) -> &Array2<u32> {
        &self.labels
    }

    pub fn stream_at(&self, row: usize, col: usize) -> Option<&Stream> {
        self.get(*self.labels.get([row, col])?)
    }
}

impl DrainageTree {
    /// Splits the tree into streams; lengths are measured between cell centres with `metric`.
    pub fn streams(&self, metric: DistanceMetric) -> StreamSet {
        let gt = self.transform();
        let mut labels = vec![0u32; self.len()];
        let mut streams = Vec::new();

        let mut heap: BinaryHeap<GridCell> = self
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, n)| GridCell { id, priority: n.accumulation })
            .collect();

        while let Some(cell) = heap.pop() {
            if labels[cell.id] != 0 {
                continue;
            }
            let sid = streams.len() as u32 + 1;
            let mouth = cell.id;
            let mut current = mouth;
            let mut cells = 1;
            let mut length = 0.0;
            labels[current] = sid;

            loop {
                let mut best: Option<NodeId> = None;
                for up in self.upstream(current) {
                    if labels[up] != 0 {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some(b) => self.node(up).accumulation > self.node(b).accumulation,
                    };
                    if better {
                        best = Some(up);
                    }
                }
                let Some(next) = best else {
                    break;
                };
                let (r0, c0) = self.node(current).cell();
                let (r1, c1) = self.node(next).cell();
                length += metric.distance(gt.pixel_to_world(r0, c0), gt.pixel_to_world(r1, c1));
                cells += 1;
                current = next;
                labels[current] = sid;
            }

            streams.push(Stream {
                id: sid,
                head: self.node(current).cell(),
                mouth: self.node(mouth).cell(),
                cells,
                accumulation: self.node(mouth).accumulation,
                length,
            });
        }

        let mut grid = Array2::<u32>::zeros(self.shape());
        for (id, n) in self.nodes().iter().enumerate() {
            grid[[n.row, n.col]] = labels[id];
        }
        debug!("{} streams over {} cells", streams.len(), self.len());

        StreamSet { streams, labels: grid }
    }
}
