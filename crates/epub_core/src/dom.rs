use ego_tree::NodeRef;
use scraper::node::Node as HtmlNode;
use scraper::Html;

/// HTML elements that never have content and are serialized without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => escape_text(text, out),
            Node::Element(element) => element.write_html(out),
        }
    }
}

/// Owned element node. Names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// True if any element below this one (not the element itself) has one of `names`.
    pub fn has_descendant(&self, names: &[&str]) -> bool {
        self.children.iter().any(|child| match child {
            Node::Element(element) => {
                names.iter().any(|n| element.is(n)) || element.has_descendant(names)
            }
            Node::Text(_) => false,
        })
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_attr(value, out);
            out.push('"');
        }
        out.push('>');
        if is_void_element(&self.name) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// An article body: the ordered top-level nodes of a parsed HTML fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub children: Vec<Node>,
}

impl Fragment {
    /// Parse an HTML fragment as the children of `<body>`.
    ///
    /// Comments, doctypes and processing instructions are dropped.
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_fragment(html);
        let mut children = Vec::new();
        convert_children(*document.root_element(), &mut children);
        Self { children }
    }

    /// Direct element children in document order, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Remove every element for which `should_remove` returns true, together with
    /// its subtree. Parents are judged before their children.
    pub fn remove_elements<F>(&mut self, should_remove: F)
    where
        F: Fn(&Element) -> bool,
    {
        remove_from(&mut self.children, &should_remove);
    }

    /// Visit every element in document order.
    pub fn for_each_element<F>(&self, mut visit: F)
    where
        F: FnMut(&Element),
    {
        walk(&self.children, &mut visit);
    }
}

fn remove_from<F>(nodes: &mut Vec<Node>, should_remove: &F)
where
    F: Fn(&Element) -> bool,
{
    nodes.retain(|node| match node {
        Node::Element(element) => !should_remove(element),
        Node::Text(_) => true,
    });
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            remove_from(&mut element.children, should_remove);
        }
    }
}

fn walk<F>(nodes: &[Node], visit: &mut F)
where
    F: FnMut(&Element),
{
    for node in nodes {
        if let Node::Element(element) = node {
            visit(element);
            walk(&element.children, visit);
        }
    }
}

fn convert_children(node: NodeRef<'_, HtmlNode>, out: &mut Vec<Node>) {
    for child in node.children() {
        match child.value() {
            HtmlNode::Text(text) => push_text(out, &text.text),
            HtmlNode::Element(element) => {
                let mut converted = Element::new(element.name());
                converted.attrs = element
                    .attrs()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect();
                convert_children(child, &mut converted.children);
                out.push(Node::Element(converted));
            }
            _ => {}
        }
    }
}

fn push_text(out: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(previous)) = out.last_mut() {
        previous.push_str(text);
    } else {
        out.push(Node::Text(text.to_string()));
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("&quot;"),
            c => escape_text(c.encode_utf8(&mut [0; 4]), out),
        }
    }
}
