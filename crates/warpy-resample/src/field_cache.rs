//! Transformation-field cache
//!
//! Evaluating a spline or an iterative inverse for every output pixel is
//! expensive. [`TransformFieldCache`] evaluates the transform only at the
//! nodes of a coarse grid over full-resolution output space, spaced
//! `spacing` pixels apart, and bilinearly interpolates between the four
//! nodes around each query. Nodes are computed on first use.
//!
//! The grid covers `ceil(width / spacing) + 2` by
//! `ceil(height / spacing) + 2` nodes; node `(i, j)` sits at output position
//! `(i * spacing, j * spacing)`. Queries whose cell is not fully inside the
//! grid are evaluated exactly.
//!
//! Nodes are stored as `f64` bit patterns in atomics with NaN marking an
//! unset node, so the cache can be shared between threads without locks.
//! Two threads racing on the same node both compute it and store identical
//! values.
//!
//! The approximation error is `O(spacing^2)` times the transform's second
//! derivative; affine transforms are reproduced up to rounding.

use crate::{ResampleError, ResampleResult};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use warpy_transform::{RealPoint, Transform};

/// Lazily evaluated grid approximation of a 2D transform
#[derive(Debug)]
pub struct TransformFieldCache {
    transform: Transform,
    spacing: u32,
    cols: usize,
    rows: usize,
    // x and y of node (i, j) at 2 * (j * cols + i) and the next slot
    nodes: Vec<AtomicU64>,
    computed: AtomicUsize,
}

impl TransformFieldCache {
    /// Create an empty cache for an output of `width` x `height` pixels
    ///
    /// # Arguments
    ///
    /// * `transform` - Output-to-source mapping; evaluated on plane z = 0
    /// * `width`, `height` - Full-resolution output dimensions
    /// * `spacing` - Grid cell size in output pixels
    ///
    /// # Errors
    ///
    /// Returns `ResampleError::Core` with `Error::InvalidParameter` for a
    /// zero spacing.
    pub fn new(transform: Transform, width: u32, height: u32, spacing: u32) -> ResampleResult<Self> {
        if spacing == 0 {
            return Err(ResampleError::Core(warpy_core::Error::InvalidParameter(
                "field cache grid spacing must be positive".to_string(),
            )));
        }
        let cols = width.div_ceil(spacing) as usize + 2;
        let rows = height.div_ceil(spacing) as usize + 2;
        let unset = f64::NAN.to_bits();
        let nodes = (0..cols * rows * 2).map(|_| AtomicU64::new(unset)).collect();
        tracing::debug!(cols, rows, spacing, "allocated transformation field grid");
        Ok(TransformFieldCache {
            transform,
            spacing,
            cols,
            rows,
            nodes,
            computed: AtomicUsize::new(0),
        })
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn spacing(&self) -> u32 {
        self.spacing
    }

    /// Grid size as (columns, rows) of nodes
    pub fn grid_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Number of node evaluations performed so far
    pub fn cached_nodes(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }

    /// Approximate source position of full-resolution output point (x, y)
    pub fn lookup(&self, x: f64, y: f64) -> (f64, f64) {
        let s = self.spacing as f64;
        let gx = x / s;
        let gy = y / s;
        let cx = gx.floor();
        let cy = gy.floor();
        if !(cx >= 0.0
            && cy >= 0.0
            && cx + 1.0 < self.cols as f64
            && cy + 1.0 < self.rows as f64)
        {
            let p = self.transform.apply(RealPoint::new_2d(x, y));
            return (p.x, p.y);
        }

        let i = cx as usize;
        let j = cy as usize;
        let tx = gx - cx;
        let ty = gy - cy;
        let (x00, y00) = self.node(i, j);
        let (x10, y10) = self.node(i + 1, j);
        let (x01, y01) = self.node(i, j + 1);
        let (x11, y11) = self.node(i + 1, j + 1);

        let top_x = x00 + tx * (x10 - x00);
        let bot_x = x01 + tx * (x11 - x01);
        let top_y = y00 + tx * (y10 - y00);
        let bot_y = y01 + tx * (y11 - y01);
        (top_x + ty * (bot_x - top_x), top_y + ty * (bot_y - top_y))
    }

    fn node(&self, i: usize, j: usize) -> (f64, f64) {
        let k = 2 * (j * self.cols + i);
        let x = f64::from_bits(self.nodes[k].load(Ordering::Relaxed));
        let y = f64::from_bits(self.nodes[k + 1].load(Ordering::Relaxed));
        if !x.is_nan() && !y.is_nan() {
            return (x, y);
        }

        let s = self.spacing as f64;
        let p = self
            .transform
            .apply(RealPoint::new_2d(i as f64 * s, j as f64 * s));
        self.nodes[k].store(p.x.to_bits(), Ordering::Relaxed);
        self.nodes[k + 1].store(p.y.to_bits(), Ordering::Relaxed);
        self.computed.fetch_add(1, Ordering::Relaxed);
        (p.x, p.y)
    }
}
