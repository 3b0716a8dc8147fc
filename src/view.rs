//! Declarative view templates for hosted app windows.
//!
//! A template describes the chrome and content layout of one window kind.
//! Templates are validated before any window is built: the first child
//! must be the header region (the drag handle) and the header must carry
//! a button marked as the close affordance. Validation turns a missing
//! region into a construction-time [`TemplateError`] instead of a lookup
//! failure at runtime.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Span;

use crate::error::TemplateError;
use crate::window::Size;

/// Semantic role attached to a header button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Close,
}

/// Index of a button within the header region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AffordanceId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    /// Drag handle region. Must be the first child of a template.
    Header(Vec<ViewNode>),
    Title(String),
    Button {
        label: String,
        marker: Option<Marker>,
    },
    /// Named slice of the content region, stacked top to bottom.
    Section { name: String, height: Constraint },
}

impl ViewNode {
    pub fn header(children: impl IntoIterator<Item = ViewNode>) -> Self {
        Self::Header(children.into_iter().collect())
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self::Title(text.into())
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::Button {
            label: label.into(),
            marker: None,
        }
    }

    pub fn close_button(label: impl Into<String>) -> Self {
        Self::Button {
            label: label.into(),
            marker: Some(Marker::Close),
        }
    }

    pub fn section(name: impl Into<String>, height: Constraint) -> Self {
        Self::Section {
            name: name.into(),
            height,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ViewNode::Header(_) => "header",
            ViewNode::Title(_) => "title",
            ViewNode::Button { .. } => "button",
            ViewNode::Section { .. } => "section",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTemplate {
    size: Size,
    children: Vec<ViewNode>,
}

impl ViewTemplate {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            children: Vec::new(),
        }
    }

    pub fn child(mut self, node: ViewNode) -> Self {
        self.children.push(node);
        self
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn children(&self) -> &[ViewNode] {
        &self.children
    }

    /// Check the structural requirements and freeze the template.
    pub fn validate(self) -> Result<ValidatedTemplate, TemplateError> {
        let header = match self.children.first() {
            Some(ViewNode::Header(children)) => children,
            Some(other) => {
                return Err(TemplateError::HeaderNotFirst {
                    found: other.label(),
                });
            }
            None => return Err(TemplateError::MissingHeader),
        };
        let has_close = header.iter().any(|node| {
            matches!(
                node,
                ViewNode::Button {
                    marker: Some(Marker::Close),
                    ..
                }
            )
        });
        if !has_close {
            return Err(TemplateError::MissingCloseAffordance);
        }
        if self
            .children
            .iter()
            .skip(1)
            .any(|node| matches!(node, ViewNode::Header(_)))
        {
            return Err(TemplateError::DuplicateHeader);
        }
        if self.size.width < 4 || self.size.height < 3 {
            return Err(TemplateError::TooSmall {
                width: self.size.width,
                height: self.size.height,
            });
        }
        // Buttons sit between the two border cells and must not overlap.
        let needed = header
            .iter()
            .filter_map(|node| match node {
                ViewNode::Button { label, .. } => Some(button_width(label)),
                _ => None,
            })
            .fold(2u16, u16::saturating_add);
        if needed > self.size.width {
            return Err(TemplateError::HeaderOverflow {
                needed,
                width: self.size.width,
            });
        }
        Ok(ValidatedTemplate { inner: self })
    }
}

/// Header cells taken by a `[label]` button.
pub fn button_width(label: &str) -> u16 {
    u16::try_from(Span::raw(label).width())
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

/// A template that passed [`ViewTemplate::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTemplate {
    inner: ViewTemplate,
}

impl ValidatedTemplate {
    pub fn size(&self) -> Size {
        self.inner.size
    }

    fn header_nodes(&self) -> &[ViewNode] {
        match self.inner.children.first() {
            Some(ViewNode::Header(children)) => children,
            _ => &[],
        }
    }

    pub fn title(&self) -> String {
        self.header_nodes()
            .iter()
            .filter_map(|node| match node {
                ViewNode::Title(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Header buttons in declaration order, paired with their ids.
    pub fn buttons(&self) -> impl Iterator<Item = (AffordanceId, &str, Option<Marker>)> {
        self.header_nodes()
            .iter()
            .filter_map(|node| match node {
                ViewNode::Button { label, marker } => Some((label.as_str(), *marker)),
                _ => None,
            })
            .enumerate()
            .map(|(idx, (label, marker))| (AffordanceId(idx), label, marker))
    }

    /// Locate the first header button carrying `marker`.
    pub fn affordance(&self, marker: Marker) -> Option<AffordanceId> {
        self.buttons()
            .find(|(_, _, m)| *m == Some(marker))
            .map(|(id, _, _)| id)
    }

    /// Split the content region into the template's named sections.
    pub fn layout_sections(&self, content: Rect) -> SectionLayout {
        let sections: Vec<(&str, Constraint)> = self
            .inner
            .children
            .iter()
            .filter_map(|node| match node {
                ViewNode::Section { name, height } => Some((name.as_str(), *height)),
                _ => None,
            })
            .collect();
        if sections.is_empty() {
            return SectionLayout {
                content,
                regions: Vec::new(),
            };
        }
        let rects = Layout::default()
            .direction(Direction::Vertical)
            .constraints(sections.iter().map(|(_, c)| *c))
            .split(content);
        let regions = sections
            .iter()
            .zip(rects.iter())
            .map(|((name, _), rect)| ((*name).to_string(), *rect))
            .collect();
        SectionLayout { content, regions }
    }
}

/// Resolved section rectangles for one render pass.
#[derive(Debug, Clone, Default)]
pub struct SectionLayout {
    content: Rect,
    regions: Vec<(String, Rect)>,
}

impl SectionLayout {
    pub fn content(&self) -> Rect {
        self.content
    }

    /// Rectangle of the named section, or an empty rect when undeclared.
    pub fn get(&self, name: &str) -> Rect {
        self.regions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rect)| *rect)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> Size {
        Size::new(20, 8)
    }

    #[test]
    fn valid_template_exposes_title_and_close() {
        let template = ViewTemplate::new(size())
            .child(ViewNode::header([
                ViewNode::title("Timer"),
                ViewNode::close_button("X"),
            ]))
            .child(ViewNode::section("body", Constraint::Min(1)))
            .validate()
            .unwrap();
        assert_eq!(template.title(), "Timer");
        assert_eq!(template.affordance(Marker::Close), Some(AffordanceId(0)));
    }

    #[test]
    fn empty_template_is_missing_header() {
        let err = ViewTemplate::new(size()).validate().unwrap_err();
        assert_eq!(err, TemplateError::MissingHeader);
    }

    #[test]
    fn header_must_be_first_child() {
        let err = ViewTemplate::new(size())
            .child(ViewNode::section("body", Constraint::Min(1)))
            .child(ViewNode::header([ViewNode::close_button("X")]))
            .validate()
            .unwrap_err();
        assert_eq!(err, TemplateError::HeaderNotFirst { found: "section" });
    }

    #[test]
    fn header_without_close_marker_is_rejected() {
        let err = ViewTemplate::new(size())
            .child(ViewNode::header([
                ViewNode::title("Chat"),
                ViewNode::button("?"),
            ]))
            .validate()
            .unwrap_err();
        assert_eq!(err, TemplateError::MissingCloseAffordance);
    }

    #[test]
    fn header_buttons_wider_than_frame_are_rejected() {
        let err = ViewTemplate::new(Size::new(8, 6))
            .child(ViewNode::header([
                ViewNode::button("help"),
                ViewNode::close_button("X"),
            ]))
            .validate()
            .unwrap_err();
        assert_eq!(err, TemplateError::HeaderOverflow { needed: 11, width: 8 });
    }

    #[test]
    fn button_width_counts_display_cells() {
        assert_eq!(button_width("X"), 3);
        assert_eq!(button_width("😀"), 4);
        let fits = ViewTemplate::new(Size::new(11, 6))
            .child(ViewNode::header([
                ViewNode::button("help"),
                ViewNode::close_button("X"),
            ]))
            .validate();
        assert!(fits.is_ok());
    }

    #[test]
    fn sections_split_content_top_to_bottom() {
        let template = ViewTemplate::new(size())
            .child(ViewNode::header([ViewNode::close_button("X")]))
            .child(ViewNode::section("top", Constraint::Length(2)))
            .child(ViewNode::section("rest", Constraint::Min(1)))
            .validate()
            .unwrap();
        let content = Rect::new(0, 0, 10, 6);
        let layout = template.layout_sections(content);
        assert_eq!(layout.get("top"), Rect::new(0, 0, 10, 2));
        assert_eq!(layout.get("rest"), Rect::new(0, 2, 10, 4));
        assert_eq!(layout.get("missing"), Rect::default());
    }

    #[test]
    fn second_close_button_keeps_first_affordance() {
        let template = ViewTemplate::new(size())
            .child(ViewNode::header([
                ViewNode::button("?"),
                ViewNode::close_button("X"),
                ViewNode::close_button("x"),
            ]))
            .validate()
            .unwrap();
        assert_eq!(template.affordance(Marker::Close), Some(AffordanceId(1)));
    }
}
