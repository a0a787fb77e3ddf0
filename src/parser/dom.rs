use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements whose text never counts as page content.
const SKIPPED_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// A markup node as the extractors see it: an element or a run of text.
#[derive(Debug, Clone, Copy)]
pub enum DomNode<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
}

impl<'a> DomNode<'a> {
    pub fn tag(&self) -> Option<&'a str> {
        match self {
            DomNode::Element(el) => Some(el.value().name()),
            DomNode::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match self {
            DomNode::Element(el) => el.value().attr(name),
            DomNode::Text(_) => None,
        }
    }

    /// Site header or page footer region.
    fn is_boilerplate(&self) -> bool {
        self.tag() == Some("header") || self.attr("data-elementor-type") == Some("footer")
    }

    /// Element and text children; comments and other node kinds are skipped.
    pub fn children(&self) -> Vec<DomNode<'a>> {
        let DomNode::Element(el) = self else {
            return Vec::new();
        };
        el.children()
            .filter_map(|child| match child.value() {
                Node::Element(_) => ElementRef::wrap(child).map(DomNode::Element),
                Node::Text(text) => Some(DomNode::Text(&**text)),
                _ => None,
            })
            .collect()
    }

    fn collect_text(&self, out: &mut Vec<&'a str>) {
        match self {
            DomNode::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed);
                }
            }
            DomNode::Element(_) => {
                if self.tag().is_some_and(|t| SKIPPED_TEXT_TAGS.contains(&t)) {
                    return;
                }
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Trimmed descendant text nodes of `el`, joined by `separator`.
pub fn flatten_text(el: ElementRef<'_>, separator: &str) -> String {
    let mut parts = Vec::new();
    DomNode::Element(el).collect_text(&mut parts);
    parts.join(separator)
}

/// Parsed page markup.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// Parse and drop `<header>` elements and footer regions in one step.
    pub fn parse_content(markup: &str) -> Self {
        let mut doc = Self::parse(markup);
        doc.strip_boilerplate();
        doc
    }

    /// Detach every `<header>` and `data-elementor-type="footer"` region from the tree.
    pub fn strip_boilerplate(&mut self) -> usize {
        let ids: Vec<_> = self
            .elements()
            .into_iter()
            .filter(|el| DomNode::Element(*el).is_boilerplate())
            .map(|el| el.id())
            .collect();
        let mut removed = 0;
        for id in ids {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
        removed
    }

    /// Matches under the document root. Detached regions are not visited.
    pub fn select<'a, 'b>(
        &'a self,
        selector: &'b Selector,
    ) -> scraper::element_ref::Select<'a, 'b> {
        self.html.root_element().select(selector)
    }

    pub fn find<'a>(&'a self, selector: &Selector) -> Option<ElementRef<'a>> {
        self.select(selector).next()
    }

    /// All elements in document (pre-order) order, root included.
    pub fn elements(&self) -> Vec<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect()
    }
}
