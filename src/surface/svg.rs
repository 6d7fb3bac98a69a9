use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::rc::Rc;

use super::text::measure_text;
use super::{BBox, ElementId, PointerKind, Shape, Surface, SurfaceError, TextStyle, Translate};
use crate::render::escape_xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Group,
    Rect,
    Path,
    Text,
}

#[derive(Debug, Clone)]
struct TextContent {
    text: String,
    font_size: f32,
    font_family: String,
    line_height: f32,
}

#[derive(Debug, Clone)]
struct SvgElement {
    kind: ElementKind,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attrs: BTreeMap<String, String>,
    data: BTreeMap<String, String>,
    z: u64,
    text: Option<TextContent>,
}

impl SvgElement {
    fn new(kind: ElementKind, parent: Option<ElementId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            attrs: BTreeMap::new(),
            data: BTreeMap::new(),
            z: 0,
            text: None,
        }
    }

    fn attr_f32(&self, name: &str) -> f32 {
        self.attrs
            .get(name)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
struct Marker {
    radius: f32,
    fill: String,
}

/// In-memory SVG document implementing [`Surface`].
///
/// Text becomes measurable once the future from [`Surface::realized`] is first
/// polled, which mirrors a browser laying the text out on the next frame.
#[derive(Debug)]
pub struct SvgSurface {
    width: f32,
    height: f32,
    background: String,
    fast_text_metrics: bool,
    elements: HashMap<ElementId, SvgElement>,
    roots: Vec<ElementId>,
    markers: BTreeMap<ElementId, Marker>,
    listeners: BTreeMap<ElementId, BTreeSet<PointerKind>>,
    realized: Rc<RefCell<HashSet<ElementId>>>,
}

impl SvgSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            background: "#FFFFFF".to_string(),
            fast_text_metrics: false,
            elements: HashMap::new(),
            roots: Vec::new(),
            markers: BTreeMap::new(),
            listeners: BTreeMap::new(),
            realized: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Measure with calibrated character widths instead of system fonts.
    pub fn with_fast_text_metrics(mut self, fast: bool) -> Self {
        self.fast_text_metrics = fast;
        self
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn children(&self, id: &ElementId) -> Vec<ElementId> {
        self.elements
            .get(id)
            .map(|element| element.children.clone())
            .unwrap_or_default()
    }

    pub fn listeners(&self, id: &ElementId) -> BTreeSet<PointerKind> {
        self.listeners.get(id).cloned().unwrap_or_default()
    }

    /// Ids of every element whose id starts with `prefix`.
    pub fn ids_with_prefix(&self, prefix: &str) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self
            .elements
            .keys()
            .filter(|id| id.as_str().starts_with(prefix))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Topmost painted primitive under `point`.
    pub fn element_at(&self, point: (f32, f32)) -> Option<ElementId> {
        let mut hit = None;
        for root in self.paint_order(&self.roots) {
            self.hit_walk(&root, point, &mut hit);
        }
        hit
    }

    fn hit_walk(&self, id: &ElementId, point: (f32, f32), hit: &mut Option<ElementId>) {
        let Some(element) = self.elements.get(id) else {
            return;
        };
        if element.kind == ElementKind::Group {
            for child in self.paint_order(&element.children) {
                self.hit_walk(&child, point, hit);
            }
        } else if self
            .bounding_box(id)
            .is_some_and(|bbox| bbox.contains(point))
        {
            *hit = Some(id.clone());
        }
    }

    fn paint_order(&self, ids: &[ElementId]) -> Vec<ElementId> {
        let mut ordered = ids.to_vec();
        ordered.sort_by_key(|id| self.elements.get(id).map(|element| element.z).unwrap_or(0));
        ordered
    }

    fn get(&self, id: &ElementId) -> Result<&SvgElement, SurfaceError> {
        self.elements
            .get(id)
            .ok_or_else(|| SurfaceError::MissingElement(id.clone()))
    }

    fn get_mut(&mut self, id: &ElementId) -> Result<&mut SvgElement, SurfaceError> {
        self.elements
            .get_mut(id)
            .ok_or_else(|| SurfaceError::MissingElement(id.clone()))
    }

    fn insert(
        &mut self,
        parent: Option<&ElementId>,
        id: ElementId,
        mut element: SvgElement,
    ) -> Result<ElementId, SurfaceError> {
        if self.elements.contains_key(&id) || self.markers.contains_key(&id) {
            return Err(SurfaceError::DuplicateElement(id));
        }
        match parent {
            Some(parent_id) => {
                let parent = self.get_mut(parent_id)?;
                if parent.kind != ElementKind::Group {
                    return Err(SurfaceError::NotAContainer(parent_id.clone()));
                }
                parent.children.push(id.clone());
                element.parent = Some(parent_id.clone());
            }
            None => self.roots.push(id.clone()),
        }
        self.elements.insert(id.clone(), element);
        Ok(id)
    }

    fn own_translate(&self, element: &SvgElement) -> Translate {
        element
            .attrs
            .get("transform")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    /// Box in the parent's coordinate frame, own translation included.
    fn local_bbox(&self, id: &ElementId) -> Option<BBox> {
        let element = self.elements.get(id)?;
        let own = self.own_translate(element);
        let bbox = match element.kind {
            ElementKind::Group => element
                .children
                .iter()
                .filter_map(|child| self.local_bbox(child))
                .reduce(|acc, next| acc.union(&next))?,
            ElementKind::Rect => BBox::new(
                element.attr_f32("x"),
                element.attr_f32("y"),
                element.attr_f32("width"),
                element.attr_f32("height"),
            ),
            ElementKind::Text => {
                if !self.realized.borrow().contains(id) {
                    return None;
                }
                let content = element.text.as_ref()?;
                let extent = measure_text(
                    &content.text,
                    content.font_size,
                    &content.font_family,
                    content.line_height,
                    self.fast_text_metrics,
                );
                BBox::new(
                    element.attr_f32("x"),
                    element.attr_f32("y"),
                    extent.width,
                    extent.height,
                )
            }
            ElementKind::Path => path_bbox(element.attrs.get("d")?)?,
        };
        Some(bbox.offset(own.x, own.y))
    }

    fn ancestor_offset(&self, id: &ElementId) -> (f32, f32) {
        let mut offset = (0.0, 0.0);
        let mut cursor = self.elements.get(id).and_then(|element| element.parent.clone());
        while let Some(parent_id) = cursor {
            let Some(parent) = self.elements.get(&parent_id) else {
                break;
            };
            let translate = self.own_translate(parent);
            offset.0 += translate.x;
            offset.1 += translate.y;
            cursor = parent.parent.clone();
        }
        offset
    }

    fn collect_subtree(&self, id: &ElementId, out: &mut Vec<ElementId>) {
        out.push(id.clone());
        if let Some(element) = self.elements.get(id) {
            for child in &element.children {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Serializes the retained tree as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let width = self.width.max(1.0);
        let height = self.height.max(1.0);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
        );
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&self.background)
        );
        if !self.markers.is_empty() {
            svg.push_str("<defs>");
            for (id, marker) in &self.markers {
                let r = marker.radius;
                let _ = write!(
                    svg,
                    "<marker id=\"{}\" orient=\"auto\" refX=\"{r}\" refY=\"0\" viewBox=\"{} {} {} {}\" markerWidth=\"{}\" markerHeight=\"{}\" markerUnits=\"userSpaceOnUse\"><path fill=\"{}\" stroke=\"none\" d=\"M{r},0A{r},{r},0,1,1,-{r},0A{r},{r},0,1,1,{r},0\"/></marker>",
                    escape_xml(id.as_str()),
                    -(r + 1.0),
                    -(r + 1.0),
                    2.0 * (r + 1.0),
                    2.0 * (r + 1.0),
                    r + 1.0,
                    r + 1.0,
                    escape_xml(&marker.fill),
                );
            }
            svg.push_str("</defs>");
        }
        for root in self.paint_order(&self.roots) {
            self.write_element(&root, &mut svg);
        }
        svg.push_str("</svg>");
        svg
    }

    fn write_element(&self, id: &ElementId, svg: &mut String) {
        let Some(element) = self.elements.get(id) else {
            return;
        };
        let tag = match element.kind {
            ElementKind::Group => "g",
            ElementKind::Rect => "rect",
            ElementKind::Path => "path",
            ElementKind::Text => "text",
        };
        let _ = write!(svg, "<{tag} id=\"{}\"", escape_xml(id.as_str()));
        for (name, value) in &element.attrs {
            let _ = write!(svg, " {name}=\"{}\"", escape_xml(value));
        }
        for (key, value) in &element.data {
            let _ = write!(svg, " data-{key}=\"{}\"", escape_xml(value));
        }
        match element.kind {
            ElementKind::Group => {
                svg.push('>');
                for child in self.paint_order(&element.children) {
                    self.write_element(&child, svg);
                }
                svg.push_str("</g>");
            }
            ElementKind::Text => {
                svg.push('>');
                if let Some(content) = &element.text {
                    let x = element.attr_f32("x");
                    let dy = content.font_size * content.line_height;
                    for (idx, line) in super::text::split_lines(&content.text).iter().enumerate() {
                        let step = if idx == 0 { 0.0 } else { dy };
                        let _ = write!(
                            svg,
                            "<tspan x=\"{x}\" dy=\"{step}\">{}</tspan>",
                            escape_xml(line)
                        );
                    }
                }
                svg.push_str("</text>");
            }
            _ => svg.push_str("/>"),
        }
    }
}

impl Surface for SvgSurface {
    fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id) || self.markers.contains_key(id)
    }

    fn create_group(
        &mut self,
        parent: Option<&ElementId>,
        id: ElementId,
    ) -> Result<ElementId, SurfaceError> {
        self.insert(parent, id, SvgElement::new(ElementKind::Group, None))
    }

    fn create_shape(
        &mut self,
        parent: &ElementId,
        id: ElementId,
        shape: Shape,
    ) -> Result<ElementId, SurfaceError> {
        let element = match shape {
            Shape::Rect {
                width,
                height,
                radius,
            } => {
                let mut element = SvgElement::new(ElementKind::Rect, None);
                element.attrs.insert("width".into(), width.to_string());
                element.attrs.insert("height".into(), height.to_string());
                if radius > 0.0 {
                    element.attrs.insert("rx".into(), radius.to_string());
                    element.attrs.insert("ry".into(), radius.to_string());
                }
                element
            }
            Shape::Path { d } => {
                let mut element = SvgElement::new(ElementKind::Path, None);
                element.attrs.insert("d".into(), d);
                element
            }
        };
        self.insert(Some(parent), id, element)
    }

    fn create_text(
        &mut self,
        parent: &ElementId,
        id: ElementId,
        text: &str,
        style: &TextStyle,
    ) -> Result<ElementId, SurfaceError> {
        let mut element = SvgElement::new(ElementKind::Text, None);
        element.attrs.insert("x".into(), "0".into());
        element.attrs.insert("y".into(), "0".into());
        element
            .attrs
            .insert("font-family".into(), style.font_family.clone());
        element
            .attrs
            .insert("font-size".into(), style.font_size.to_string());
        element.attrs.insert("fill".into(), style.fill.clone());
        element
            .attrs
            .insert("dominant-baseline".into(), "text-before-edge".into());
        element.text = Some(TextContent {
            text: text.to_string(),
            font_size: style.font_size,
            font_family: style.font_family.clone(),
            line_height: style.line_height,
        });
        self.insert(Some(parent), id, element)
    }

    fn create_marker(
        &mut self,
        id: ElementId,
        radius: f32,
        fill: &str,
    ) -> Result<ElementId, SurfaceError> {
        if self.contains(&id) {
            return Err(SurfaceError::DuplicateElement(id));
        }
        self.markers.insert(
            id.clone(),
            Marker {
                radius,
                fill: fill.to_string(),
            },
        );
        Ok(id)
    }

    fn remove(&mut self, id: &ElementId) -> Result<(), SurfaceError> {
        if self.markers.remove(id).is_some() {
            return Ok(());
        }
        let parent = self.get(id)?.parent.clone();
        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.elements.get_mut(&parent_id) {
                    parent.children.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|root| root != id),
        }
        let mut doomed = Vec::new();
        self.collect_subtree(id, &mut doomed);
        let mut realized = self.realized.borrow_mut();
        for gone in doomed {
            self.elements.remove(&gone);
            self.listeners.remove(&gone);
            realized.remove(&gone);
        }
        Ok(())
    }

    fn set_attribute(
        &mut self,
        id: &ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError> {
        if name == "transform" {
            value.parse::<Translate>()?;
        }
        self.get_mut(id)?
            .attrs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn attribute(&self, id: &ElementId, name: &str) -> Option<String> {
        self.elements.get(id)?.attrs.get(name).cloned()
    }

    fn set_data(&mut self, id: &ElementId, key: &str, value: &str) -> Result<(), SurfaceError> {
        self.get_mut(id)?
            .data
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn data(&self, id: &ElementId, key: &str) -> Option<String> {
        self.elements.get(id)?.data.get(key).cloned()
    }

    fn parent(&self, id: &ElementId) -> Option<ElementId> {
        self.elements.get(id)?.parent.clone()
    }

    fn set_z_order(&mut self, id: &ElementId, z: u64) -> Result<(), SurfaceError> {
        self.get_mut(id)?.z = z;
        Ok(())
    }

    fn bounding_box(&self, id: &ElementId) -> Option<BBox> {
        let element = self.elements.get(id)?;
        let local = self.local_bbox(id).or_else(|| {
            // Empty groups report a zero-size box at their own origin.
            (element.kind == ElementKind::Group).then(|| {
                let own = self.own_translate(element);
                BBox::new(own.x, own.y, 0.0, 0.0)
            })
        })?;
        let (dx, dy) = self.ancestor_offset(id);
        Some(local.offset(dx, dy))
    }

    fn listen(&mut self, id: &ElementId, kind: PointerKind) -> Result<(), SurfaceError> {
        if !self.elements.contains_key(id) {
            return Err(SurfaceError::MissingElement(id.clone()));
        }
        self.listeners.entry(id.clone()).or_default().insert(kind);
        Ok(())
    }

    fn unlisten(&mut self, id: &ElementId, kind: PointerKind) -> Result<(), SurfaceError> {
        if let Some(kinds) = self.listeners.get_mut(id) {
            kinds.remove(&kind);
            if kinds.is_empty() {
                self.listeners.remove(id);
            }
        }
        Ok(())
    }

    fn realized(&mut self, id: &ElementId) -> LocalBoxFuture<'static, ()> {
        let realized = Rc::clone(&self.realized);
        let id = id.clone();
        async move {
            realized.borrow_mut().insert(id);
        }
        .boxed_local()
    }
}

/// Bounds of the end points (and control points) of an `M/L/C/A` path.
fn path_bbox(d: &str) -> Option<BBox> {
    let mut points: Vec<(f32, f32)> = Vec::new();
    let mut command = ' ';
    let mut args: Vec<f32> = Vec::new();
    let mut flush = |command: char, args: &mut Vec<f32>| {
        let stride = match command.to_ascii_uppercase() {
            'M' | 'L' => 2,
            'C' => 6,
            'A' => 7,
            _ => 0,
        };
        if stride > 0 {
            for chunk in args.chunks(stride).filter(|chunk| chunk.len() == stride) {
                match stride {
                    7 => points.push((chunk[5], chunk[6])),
                    _ => points.extend(chunk.chunks(2).map(|pair| (pair[0], pair[1]))),
                }
            }
        }
        args.clear();
    };
    let mut token = String::new();
    for ch in d.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_alphabetic() && ch != 'e' && ch != 'E' {
            if let Ok(value) = token.parse() {
                args.push(value);
            }
            token.clear();
            flush(command, &mut args);
            command = ch;
        } else if ch == ','
            || ch.is_whitespace()
            || (ch == '-' && !token.is_empty() && !token.ends_with('e'))
        {
            if let Ok(value) = token.parse() {
                args.push(value);
            }
            token.clear();
            if ch == '-' {
                token.push(ch);
            }
        } else {
            token.push(ch);
        }
    }
    flush(command, &mut args);
    let (first, rest) = points.split_first()?;
    let bbox = rest.iter().fold(BBox::new(first.0, first.1, 0.0, 0.0), |acc, point| {
        acc.union(&BBox::new(point.0, point.1, 0.0, 0.0))
    });
    Some(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn text_style() -> TextStyle {
        TextStyle {
            font_family: "sans-serif".into(),
            font_size: 10.0,
            fill: "#000".into(),
            line_height: 1.2,
        }
    }

    #[test]
    fn nested_translations_accumulate() {
        let mut surface = SvgSurface::new(100.0, 100.0);
        let outer = surface.create_group(None, "outer".into()).unwrap();
        let inner = surface.create_group(Some(&outer), "inner".into()).unwrap();
        let rect = surface
            .create_shape(
                &inner,
                "rect".into(),
                Shape::Rect {
                    width: 10.0,
                    height: 5.0,
                    radius: 0.0,
                },
            )
            .unwrap();
        surface.set_translate(&outer, Translate::new(100.0, 0.0)).unwrap();
        surface.set_translate(&inner, Translate::new(0.0, 20.0)).unwrap();
        assert_eq!(surface.bounding_box(&rect), Some(BBox::new(100.0, 20.0, 10.0, 5.0)));
        assert_eq!(surface.bounding_box(&outer), Some(BBox::new(100.0, 20.0, 10.0, 5.0)));
        assert_eq!(surface.translate(&inner), Ok(Translate::new(0.0, 20.0)));
    }

    #[test]
    fn empty_group_is_zero_sized_at_origin() {
        let mut surface = SvgSurface::new(100.0, 100.0);
        let group = surface.create_group(None, "g".into()).unwrap();
        surface.set_translate(&group, Translate::new(4.0, 6.0)).unwrap();
        assert_eq!(surface.bounding_box(&group), Some(BBox::new(4.0, 6.0, 0.0, 0.0)));
    }

    #[test]
    fn text_is_unmeasurable_until_realized() {
        let mut surface = SvgSurface::new(100.0, 100.0).with_fast_text_metrics(true);
        let group = surface.create_group(None, "g".into()).unwrap();
        let text = surface
            .create_text(&group, "t".into(), "hello", &text_style())
            .unwrap();
        assert!(surface.bounding_box(&text).is_none());
        block_on(surface.realized(&text));
        let bbox = surface.bounding_box(&text).expect("measured");
        assert!(bbox.width > 0.0);
        assert!((bbox.height - 12.0).abs() < 0.001);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut surface = SvgSurface::new(100.0, 100.0);
        surface.create_group(None, "g".into()).unwrap();
        assert_eq!(
            surface.create_group(None, "g".into()),
            Err(SurfaceError::DuplicateElement("g".into()))
        );
    }

    #[test]
    fn remove_drops_subtree_and_listeners() {
        let mut surface = SvgSurface::new(100.0, 100.0);
        let outer = surface.create_group(None, "outer".into()).unwrap();
        let inner = surface.create_group(Some(&outer), "inner".into()).unwrap();
        surface.listen(&inner, PointerKind::Down).unwrap();
        surface.remove(&outer).unwrap();
        assert!(!surface.contains(&inner));
        assert!(surface.listeners(&inner).is_empty());
        assert!(surface.is_empty());
    }

    #[test]
    fn invalid_transform_is_rejected() {
        let mut surface = SvgSurface::new(100.0, 100.0);
        let group = surface.create_group(None, "g".into()).unwrap();
        assert!(surface.set_attribute(&group, "transform", "rotate(4)").is_err());
    }

    #[test]
    fn path_bbox_reads_arc_and_cubic_endpoints() {
        assert_eq!(path_bbox("M0 0L10 5"), Some(BBox::new(0.0, 0.0, 10.0, 5.0)));
        assert_eq!(
            path_bbox("M0 0A20 10 0 0 1 10 -5"),
            Some(BBox::new(0.0, -5.0, 10.0, 5.0))
        );
        assert_eq!(
            path_bbox("M0 0C4.2 0, 5.8 8, 10 8"),
            Some(BBox::new(0.0, 0.0, 10.0, 8.0))
        );
    }

    #[test]
    fn serializes_groups_with_transforms_and_data() {
        let mut surface = SvgSurface::new(50.0, 50.0);
        let group = surface.create_group(None, "g".into()).unwrap();
        surface.set_translate(&group, Translate::new(1.0, 2.0)).unwrap();
        surface.set_data(&group, "did", "n<1>").unwrap();
        let svg = surface.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("transform=\"translate( 1 2 )\""));
        assert!(svg.contains("data-did=\"n&lt;1&gt;\""));
        assert!(svg.ends_with("</svg>"));
    }
}
