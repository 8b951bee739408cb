//! Autodiff bridge.
//!
//! Each differentiable stage is a [`Function`]: `forward` returns its outputs
//! plus whatever it must remember, `backward` turns output gradients into one
//! [`SlotGrad`] per input slot. A [`Node`] owns that remembered context and is
//! consumed by its backward pass, so a context is used at most once.
//!
//! [`Tape`] records heterogeneous nodes as [`GraphNode`]s in forward order and
//! runs their backward passes in reverse.

mod ops;

pub use ops::{
    ComputeCov3d, ComputeSh, Cov3dInputs, Cov3dOutputGrads, Cov3dSaved, ProjectInputs, ProjectOutputGrads,
    ProjectPoints, ProjectSaved, ShadeInputs, ShadeOutputGrads, ShadeSaved,
};

use crate::backend::NumericalBackend;
use crate::core::ShCoeffs;
use crate::error::{check_len, Result, SplatError};
use log::trace;
use nalgebra::{Vector3, Vector4};

/// Gradient for one input slot of a [`Function`].
#[derive(Clone, Debug, PartialEq)]
pub enum SlotGrad {
    Positions(Vec<Vector3<f32>>),
    ShCoeffs(ShCoeffs),
    ViewDirs(Vec<Vector3<f32>>),
    Scales(Vec<Vector3<f32>>),
    Quats(Vec<Vector4<f32>>),
    /// Slot is not differentiable (matrices, image size, thresholds, masks...).
    None,
}

impl SlotGrad {
    pub fn is_none(&self) -> bool {
        matches!(self, SlotGrad::None)
    }
}

/// A differentiable stage.
pub trait Function {
    /// Stage name used in logs and errors.
    const NAME: &'static str;
    /// Input slot names, in the order backward reports gradients.
    const SLOTS: &'static [&'static str];

    type Inputs;
    type Outputs;
    type Saved;
    type OutputGrads;

    fn forward<B: NumericalBackend + ?Sized>(
        backend: &B,
        inputs: &Self::Inputs,
    ) -> Result<(Self::Outputs, Self::Saved)>;

    fn backward<B: NumericalBackend + ?Sized>(
        backend: &B,
        saved: Self::Saved,
        grads: Self::OutputGrads,
    ) -> Result<Vec<SlotGrad>>;
}

/// One forward invocation of `F` together with its saved context.
pub struct Node<F: Function> {
    saved: F::Saved,
}

impl<F: Function> Node<F> {
    pub fn forward<B: NumericalBackend + ?Sized>(backend: &B, inputs: &F::Inputs) -> Result<(F::Outputs, Self)> {
        let (outputs, saved) = F::forward(backend, inputs)?;
        trace!("{}: forward on {} backend", F::NAME, backend.name());
        Ok((outputs, Node { saved }))
    }

    pub fn saved(&self) -> &F::Saved {
        &self.saved
    }

    /// Run the backward pass, releasing the saved context.
    pub fn backward<B: NumericalBackend + ?Sized>(self, backend: &B, grads: F::OutputGrads) -> Result<Vec<SlotGrad>> {
        let slot_grads = F::backward(backend, self.saved, grads)?;
        if slot_grads.len() != F::SLOTS.len() {
            return Err(SplatError::InternalFault(format!(
                "{} returned {} slot gradients for {} slots",
                F::NAME,
                slot_grads.len(),
                F::SLOTS.len()
            )));
        }
        trace!("{}: backward on {} backend", F::NAME, backend.name());
        Ok(slot_grads)
    }
}

/// Type-erased node, one variant per stage.
pub enum GraphNode {
    Project(Node<ProjectPoints>),
    Shade(Node<ComputeSh>),
    Cov3d(Node<ComputeCov3d>),
}

/// Output gradient matching a [`GraphNode`] variant.
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamGrad {
    Project(ProjectOutputGrads),
    Shade(ShadeOutputGrads),
    Cov3d(Cov3dOutputGrads),
}

impl GraphNode {
    pub fn name(&self) -> &'static str {
        match self {
            GraphNode::Project(_) => ProjectPoints::NAME,
            GraphNode::Shade(_) => ComputeSh::NAME,
            GraphNode::Cov3d(_) => ComputeCov3d::NAME,
        }
    }

    pub fn slots(&self) -> &'static [&'static str] {
        match self {
            GraphNode::Project(_) => ProjectPoints::SLOTS,
            GraphNode::Shade(_) => ComputeSh::SLOTS,
            GraphNode::Cov3d(_) => ComputeCov3d::SLOTS,
        }
    }

    pub fn backward<B: NumericalBackend + ?Sized>(self, backend: &B, upstream: UpstreamGrad) -> Result<Vec<SlotGrad>> {
        match (self, upstream) {
            (GraphNode::Project(node), UpstreamGrad::Project(g)) => node.backward(backend, g),
            (GraphNode::Shade(node), UpstreamGrad::Shade(g)) => node.backward(backend, g),
            (GraphNode::Cov3d(node), UpstreamGrad::Cov3d(g)) => node.backward(backend, g),
            (node, upstream) => Err(SplatError::InvalidArgument(format!(
                "{} node cannot take a {} gradient",
                node.name(),
                upstream.name()
            ))),
        }
    }
}

impl UpstreamGrad {
    pub fn name(&self) -> &'static str {
        match self {
            UpstreamGrad::Project(_) => ProjectPoints::NAME,
            UpstreamGrad::Shade(_) => ComputeSh::NAME,
            UpstreamGrad::Cov3d(_) => ComputeCov3d::NAME,
        }
    }
}

impl From<Node<ProjectPoints>> for GraphNode {
    fn from(node: Node<ProjectPoints>) -> Self {
        GraphNode::Project(node)
    }
}

impl From<Node<ComputeSh>> for GraphNode {
    fn from(node: Node<ComputeSh>) -> Self {
        GraphNode::Shade(node)
    }
}

impl From<Node<ComputeCov3d>> for GraphNode {
    fn from(node: Node<ComputeCov3d>) -> Self {
        GraphNode::Cov3d(node)
    }
}

/// Position of a node on a [`Tape`], in recording order.
pub type NodeId = usize;

/// Forward-order record of graph nodes.
#[derive(Default)]
pub struct Tape {
    nodes: Vec<GraphNode>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn record(&mut self, node: impl Into<GraphNode>) -> NodeId {
        self.nodes.push(node.into());
        self.nodes.len() - 1
    }

    /// Run `F` forward and record it.
    pub fn forward<F, B>(&mut self, backend: &B, inputs: &F::Inputs) -> Result<(F::Outputs, NodeId)>
    where
        F: Function,
        Node<F>: Into<GraphNode>,
        B: NumericalBackend + ?Sized,
    {
        let (outputs, node) = Node::<F>::forward(backend, inputs)?;
        Ok((outputs, self.record(node)))
    }

    /// Backward over every node, last recorded first.
    ///
    /// `upstream` holds one gradient per node in recording order. The result
    /// is indexed the same way.
    pub fn backward<B: NumericalBackend + ?Sized>(
        self,
        backend: &B,
        upstream: Vec<UpstreamGrad>,
    ) -> Result<Vec<Vec<SlotGrad>>> {
        check_len("upstream gradients", self.nodes.len(), upstream.len())?;
        let mut upstream: Vec<Option<UpstreamGrad>> = upstream.into_iter().map(Some).collect();
        self.backward_with(backend, |id, _| {
            upstream[id]
                .take()
                .ok_or_else(|| SplatError::InternalFault(format!("node {id} visited twice")))
        })
    }

    /// Backward over every node, last recorded first, asking `upstream` for
    /// each node's output gradient as it is reached.
    pub fn backward_with<B, U>(self, backend: &B, mut upstream: U) -> Result<Vec<Vec<SlotGrad>>>
    where
        B: NumericalBackend + ?Sized,
        U: FnMut(NodeId, &GraphNode) -> Result<UpstreamGrad>,
    {
        let n = self.nodes.len();
        let mut grads: Vec<Vec<SlotGrad>> = vec![Vec::new(); n];
        for (id, node) in self.nodes.into_iter().enumerate().rev() {
            let g = upstream(id, &node)?;
            trace!("tape: backward node {id} ({})", node.name());
            grads[id] = node.backward(backend, g)?;
        }
        Ok(grads)
    }
}
