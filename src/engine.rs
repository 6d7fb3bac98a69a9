//! The mind-map facade: owns the surface, the node forest and the gesture
//! state, and wires the layout engine and the connector router together.

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::interaction::{Gesture, InteractionState};
use crate::ir::{NodeId, NodeRecord, NodeTree};
use crate::layout::routing::LineRouter;
use crate::layout::{ElementKeys, LayoutEngine};
use crate::surface::{ElementId, PointerKind, Surface, SurfaceError};

/// Operations a diagram engine exposes to its host.
pub trait Engine {
    /// Installs instance-wide definitions (the connector end marker).
    fn render_style(&mut self) -> Result<()>;

    /// Lays out `nodes` (top-level roots) and draws their connectors,
    /// replacing whatever a previous call drew.
    fn render_body(&mut self, nodes: Vec<NodeRecord>) -> LocalBoxFuture<'_, Result<()>>;
}

/// Interactive bidirectional mind map bound to one surface.
pub struct MindEngine<S: Surface> {
    pub(crate) surface: S,
    pub(crate) config: Config,
    pub(crate) keys: ElementKeys,
    pub(crate) tree: NodeTree,
    pub(crate) interaction: InteractionState,
    render_group: ElementId,
}

impl<S: Surface> MindEngine<S> {
    /// Creates the instance groups on `surface`.
    ///
    /// Fails with [`EngineError::SurfaceInitialized`] when another engine with
    /// the same token already owns the surface.
    pub fn new(mut surface: S, config: Config, token: impl Into<String>) -> Result<Self> {
        let keys = ElementKeys::new(token)?;
        let group_root = keys.group_root();
        if surface.contains(&group_root) {
            return Err(EngineError::SurfaceInitialized(group_root.to_string()));
        }
        let claim = |err: SurfaceError| match err {
            SurfaceError::DuplicateElement(id) => EngineError::SurfaceInitialized(id.to_string()),
            other => other.into(),
        };
        // Connectors paint beneath the nodes.
        surface.create_group(None, keys.line_group()).map_err(claim)?;
        let group_root = surface.create_group(None, group_root).map_err(claim)?;
        let render_group = surface
            .create_group(Some(&group_root), keys.render_group())
            .map_err(claim)?;
        for kind in [
            PointerKind::Down,
            PointerKind::Move,
            PointerKind::Up,
            PointerKind::Enter,
        ] {
            surface.listen(&group_root, kind)?;
        }
        let interaction = InteractionState::new(config.layout.drag_threshold);
        info!(token = keys.token(), "mind map engine attached");
        Ok(Self {
            surface,
            config,
            keys,
            tree: NodeTree::default(),
            interaction,
            render_group,
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn keys(&self) -> &ElementKeys {
        &self.keys
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn gesture(&self) -> Gesture {
        self.interaction.gesture()
    }

    /// Redraws every connector from the current element positions.
    pub fn redraw_lines(&mut self, rerender: bool) -> Result<()> {
        LineRouter::new(&mut self.surface, &self.keys, &self.config.theme).render_lines(
            self.tree.roots(),
            1,
            rerender,
        )
    }

    /// Looks a rendered node up by id.
    pub fn node(&self, id: &NodeId) -> Result<&NodeRecord> {
        self.tree
            .find(id.as_str())
            .ok_or_else(|| EngineError::NodeNotFound(id.clone()))
    }

    fn clear(&mut self) -> Result<()> {
        let roots = std::mem::take(&mut self.tree);
        for root in roots.roots() {
            LineRouter::new(&mut self.surface, &self.keys, &self.config.theme)
                .remove_subtree_lines(root)?;
            LayoutEngine::new(
                &mut self.surface,
                &self.keys,
                &self.config.layout,
                &self.config.theme,
            )
            .remove_node(root)?;
        }
        self.interaction.reset();
        Ok(())
    }
}

impl<S: Surface> Engine for MindEngine<S> {
    fn render_style(&mut self) -> Result<()> {
        let marker = self.keys.marker();
        if self.surface.contains(&marker) {
            return Ok(());
        }
        self.surface.create_marker(
            marker,
            self.config.layout.marker_radius,
            &self.config.theme.marker_fill,
        )?;
        Ok(())
    }

    fn render_body(&mut self, nodes: Vec<NodeRecord>) -> LocalBoxFuture<'_, Result<()>> {
        async move {
            self.clear()?;
            self.tree = NodeTree::new(nodes);
            for root in self.tree.roots_mut() {
                if root.parent_id.is_empty() {
                    root.parent_id = NodeId::root_parent();
                }
            }

            let mut placed = Vec::with_capacity(self.tree.roots().len());
            let mut layout = LayoutEngine::new(
                &mut self.surface,
                &self.keys,
                &self.config.layout,
                &self.config.theme,
            );
            for root in self.tree.roots_mut() {
                layout
                    .render_single_node(1, &self.render_group, root, None)
                    .await?;
                placed.push(self.keys.node_root(&root.id));
            }
            layout.stack(&placed, false)?;

            self.redraw_lines(false)?;
            debug!(
                roots = self.tree.roots().len(),
                nodes = self.tree.len(),
                "mind map rendered"
            );
            Ok(())
        }
        .boxed_local()
    }
}
