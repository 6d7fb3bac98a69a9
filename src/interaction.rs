//! Drag and pan gestures.
//!
//! The secondary button pans the whole drawing; the primary button on a node's
//! content zone drags that node's subtree. Releasing a dragged second-level
//! node on the far side of its parent moves it to the parent's other zone.
//! Failures here are logged and the gesture step is dropped; nothing is
//! returned to the host.

use tracing::{debug, trace, warn};

use crate::engine::MindEngine;
use crate::ir::{Direction, NodeId};
use crate::layout::routing::LineRouter;
use crate::layout::{DATA_NODE_ID, DATA_SECTION, DATA_ZONE, LayoutEngine, Zone};
use crate::surface::{
    ElementId, PointerButton, PointerEvent, PointerKind, Surface, Translate,
};

/// Current gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gesture {
    #[default]
    Idle,
    PanningCanvas,
    DraggingNode,
}

/// Node being dragged, resolved from its root element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MovingNode {
    pub element: ElementId,
    pub node: NodeId,
    pub parent: Option<NodeId>,
    pub parent_level: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    gesture: Gesture,
    threshold: f32,
    down_at: Option<(f32, f32)>,
    /// Group-root translation when a pan started.
    pan_start: Option<Translate>,
    /// Node-root translation when a drag started.
    drag_start: Option<Translate>,
    dragging: Option<ElementId>,
    /// Set once the pointer first leaves the threshold square.
    moved: bool,
    moving: Option<MovingNode>,
    z_counter: u64,
}

impl InteractionState {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Highest z-order handed out so far.
    pub fn z_order(&self) -> u64 {
        self.z_counter
    }

    pub(crate) fn begin_pan(&mut self, at: (f32, f32), start: Translate) {
        self.gesture = Gesture::PanningCanvas;
        self.down_at = Some(at);
        self.moved = false;
        self.pan_start = Some(start);
    }

    /// Starts a drag and returns the z-order to raise the element to.
    pub(crate) fn begin_drag(
        &mut self,
        at: (f32, f32),
        element: ElementId,
        start: Translate,
    ) -> u64 {
        if self
            .moving
            .as_ref()
            .is_some_and(|moving| moving.element != element)
        {
            self.moving = None;
        }
        self.gesture = Gesture::DraggingNode;
        self.down_at = Some(at);
        self.moved = false;
        self.drag_start = Some(start);
        self.dragging = Some(element);
        self.z_counter += 1;
        self.z_counter
    }

    /// Pointer travel since the press. Nothing until it first exceeds the
    /// threshold on either axis, every move after that.
    pub(crate) fn displacement(&mut self, at: (f32, f32)) -> Option<(f32, f32)> {
        let origin = self.down_at?;
        let dx = at.0 - origin.0;
        let dy = at.1 - origin.1;
        if !self.moved {
            self.moved = dx.abs() > self.threshold || dy.abs() > self.threshold;
        }
        self.moved.then_some((dx, dy))
    }

    pub(crate) fn pan_start(&self) -> Option<Translate> {
        self.pan_start
    }

    pub(crate) fn drag_start(&self) -> Option<(ElementId, Translate)> {
        Some((self.dragging.clone()?, self.drag_start?))
    }

    pub(crate) fn moving_for(&self, element: &ElementId) -> Option<&MovingNode> {
        self.moving.as_ref().filter(|moving| moving.element == *element)
    }

    pub(crate) fn remember(&mut self, moving: MovingNode) {
        self.moving = Some(moving);
    }

    /// Ends the gesture and hands back the dragged element, if any.
    pub(crate) fn release(&mut self) -> Option<ElementId> {
        self.gesture = Gesture::Idle;
        self.down_at = None;
        self.moved = false;
        self.pan_start = None;
        self.drag_start = None;
        self.dragging.take()
    }

    pub(crate) fn forget_moving(&mut self) {
        self.moving = None;
    }

    /// Back to idle without any side effects.
    pub fn reset(&mut self) {
        self.release();
        self.forget_moving();
    }
}

impl<S: Surface> MindEngine<S> {
    /// Feeds one pointer event to the gesture state machine.
    pub async fn handle_pointer(&mut self, event: PointerEvent) {
        trace!(kind = ?event.kind, x = event.position.0, y = event.position.1, "pointer");
        match event.kind {
            PointerKind::Down => self.on_pointer_down(&event),
            PointerKind::Move => self.on_pointer_move(&event),
            PointerKind::Up => self.on_pointer_up().await,
            PointerKind::Enter => self.on_pointer_enter(&event),
        }
    }

    fn on_pointer_down(&mut self, event: &PointerEvent) {
        if self.interaction.gesture() != Gesture::Idle {
            return;
        }
        match event.button {
            Some(PointerButton::Secondary) => {
                let group_root = self.keys.group_root();
                match self.surface.translate(&group_root) {
                    Ok(start) => self.interaction.begin_pan(event.position, start),
                    Err(err) => warn!(error = %err, "pan not started"),
                }
            }
            Some(PointerButton::Primary) => {
                let Some(element) = event
                    .target
                    .as_ref()
                    .and_then(|target| self.node_root_of(target))
                else {
                    return;
                };
                let start = match self.surface.translate(&element) {
                    Ok(start) => start,
                    Err(err) => {
                        warn!(error = %err, "drag not started");
                        return;
                    }
                };
                let z = self
                    .interaction
                    .begin_drag(event.position, element.clone(), start);
                if let Err(err) = self.surface.set_z_order(&element, z) {
                    warn!(error = %err, "could not raise dragged node");
                }
                debug!(element = %element, "drag started");
            }
            _ => {}
        }
    }

    /// Walks up from a hit element to the root of the node whose content zone
    /// contains it.
    fn node_root_of(&self, target: &ElementId) -> Option<ElementId> {
        let mut cursor = Some(target.clone());
        while let Some(id) = cursor {
            if self.surface.data(&id, DATA_ZONE).as_deref() == Some(Zone::Content.as_str()) {
                let root = self.surface.parent(&id)?;
                return self.surface.data(&root, DATA_NODE_ID).map(|_| root);
            }
            if self.surface.data(&id, DATA_NODE_ID).is_some() {
                // Reached a node root without passing a content zone.
                return None;
            }
            cursor = self.surface.parent(&id);
        }
        None
    }

    fn on_pointer_move(&mut self, event: &PointerEvent) {
        let Some((dx, dy)) = self.interaction.displacement(event.position) else {
            return;
        };
        match self.interaction.gesture() {
            Gesture::Idle => {}
            Gesture::PanningCanvas => {
                let Some(start) = self.interaction.pan_start() else {
                    return;
                };
                let group_root = self.keys.group_root();
                if let Err(err) = self.surface.set_translate(&group_root, start.offset(dx, dy)) {
                    warn!(error = %err, "pan step dropped");
                    return;
                }
                if let Err(err) = self.redraw_lines(true) {
                    warn!(error = %err, "connectors not refreshed after pan");
                }
            }
            Gesture::DraggingNode => {
                let Some((element, start)) = self.interaction.drag_start() else {
                    return;
                };
                if let Err(err) = self.surface.set_translate(&element, start.offset(dx, dy)) {
                    warn!(error = %err, "drag step dropped");
                    return;
                }
                let Some(moving) = self.resolve_moving(&element) else {
                    return;
                };
                self.redraw_parent_line(&moving);
            }
        }
    }

    fn resolve_moving(&mut self, element: &ElementId) -> Option<MovingNode> {
        if let Some(moving) = self.interaction.moving_for(element) {
            return Some(moving.clone());
        }
        let node = NodeId::new(self.surface.data(element, DATA_NODE_ID)?);
        let Some(location) = self.tree.locate(node.as_str()) else {
            debug!(node = %node, "dragged element has no record");
            return None;
        };
        let moving = MovingNode {
            element: element.clone(),
            node,
            parent: location.parent,
            parent_level: location.level.saturating_sub(1),
        };
        self.interaction.remember(moving.clone());
        Some(moving)
    }

    fn redraw_parent_line(&mut self, moving: &MovingNode) {
        let Some(parent_id) = &moving.parent else {
            return;
        };
        let (Some(parent), Some(node)) = (
            self.tree.find(parent_id.as_str()),
            self.tree.find(moving.node.as_str()),
        ) else {
            return;
        };
        if let Err(err) = LineRouter::new(&mut self.surface, &self.keys, &self.config.theme)
            .render_two_node_line(parent, node, moving.parent_level, true)
        {
            warn!(error = %err, "parent connector not refreshed");
        }
    }

    async fn on_pointer_up(&mut self) {
        if let Some(element) = self.interaction.release() {
            if let Some(moving) = self.resolve_moving(&element) {
                if !self.switch_side(&moving).await {
                    self.refresh_descendant_lines(&moving);
                }
            }
        }
        self.interaction.forget_moving();
    }

    fn refresh_descendant_lines(&mut self, moving: &MovingNode) {
        let Some(node) = self.tree.find(moving.node.as_str()) else {
            return;
        };
        if let Err(err) = LineRouter::new(&mut self.surface, &self.keys, &self.config.theme)
            .render_one_node_line(node, moving.parent_level + 1, true)
        {
            warn!(error = %err, "descendant connectors not refreshed");
        }
    }

    /// Moves a second-level node whose content center crossed its parent's to
    /// the parent's opposite zone. If that render fails the node is rendered
    /// back into its old zone. Returns whether the subtree was re-laid out.
    async fn switch_side(&mut self, moving: &MovingNode) -> bool {
        let Some(parent_id) = &moving.parent else {
            return false;
        };
        if moving.parent_level != 1 {
            return false;
        }
        let Some(direction) = self
            .tree
            .find(moving.node.as_str())
            .map(|node| node.direction)
        else {
            return false;
        };
        let (Some(node_box), Some(parent_box)) = (
            self.surface.bounding_box(&self.keys.content(&moving.node)),
            self.surface.bounding_box(&self.keys.content(parent_id)),
        ) else {
            return false;
        };
        let node_x = node_box.center().0;
        let parent_x = parent_box.center().0;
        let crossed = match direction {
            Direction::Left => node_x > parent_x,
            Direction::Right => node_x < parent_x,
            Direction::Unset => false,
        };
        if !crossed {
            return false;
        }
        let flipped = direction.opposite();
        let (Some(zone), Some(home)) = (
            Zone::for_direction(flipped).map(|zone| self.keys.zone(zone, parent_id)),
            Zone::for_direction(direction).map(|zone| self.keys.zone(zone, parent_id)),
        ) else {
            return false;
        };
        let section = self
            .surface
            .data(&moving.element, DATA_SECTION)
            .and_then(|raw| raw.parse::<usize>().ok());

        if let Some(node) = self.tree.find(moving.node.as_str()) {
            let mut router = LineRouter::new(&mut self.surface, &self.keys, &self.config.theme);
            let detached = router
                .remove_subtree_lines(node)
                .and_then(|_| router.remove_line(parent_id, &node.id));
            if let Err(err) = detached {
                warn!(error = %err, "connectors not removed before side switch");
                return false;
            }
            if let Err(err) = LayoutEngine::new(
                &mut self.surface,
                &self.keys,
                &self.config.layout,
                &self.config.theme,
            )
            .remove_node(node)
            {
                warn!(error = %err, "node not removed before side switch");
                return false;
            }
        }

        let Some(node) = self.tree.find_mut(moving.node.as_str()) else {
            return false;
        };
        node.set_direction_deep(flipped);
        let mut layout = LayoutEngine::new(
            &mut self.surface,
            &self.keys,
            &self.config.layout,
            &self.config.theme,
        );
        let rendered = layout.render_single_node(2, &zone, node, section).await;
        let placed = rendered.and_then(|()| layout.land_content(node, node_box));
        let side = match placed {
            Ok(()) => flipped,
            Err(err) => {
                warn!(error = %err, "side switch failed; restoring the node where it was");
                if let Err(err) = layout.remove_node(node) {
                    debug!(error = %err, "partial render not cleared");
                }
                node.set_direction_deep(direction);
                let rendered = layout.render_single_node(2, &home, node, section).await;
                if let Err(err) = rendered.and_then(|()| layout.land_content(node, node_box)) {
                    warn!(error = %err, "node could not be restored");
                    return true;
                }
                direction
            }
        };

        if let (Some(parent), Some(node)) = (
            self.tree.find(parent_id.as_str()),
            self.tree.find(moving.node.as_str()),
        ) {
            let mut router = LineRouter::new(&mut self.surface, &self.keys, &self.config.theme);
            let redrawn = router
                .render_two_node_line(parent, node, 1, true)
                .and_then(|_| router.render_one_node_line(node, 2, true));
            if let Err(err) = redrawn {
                warn!(error = %err, "connectors not redrawn after side switch");
            }
        }
        debug!(node = %moving.node, side = ?side, "node re-laid out after release");
        true
    }

    fn on_pointer_enter(&mut self, event: &PointerEvent) {
        if event.pressed.primary || event.pressed.secondary {
            return;
        }
        if self.interaction.gesture() != Gesture::Idle {
            debug!("pointer re-entered with no button held; gesture dropped");
        }
        self.interaction.reset();
    }
}
