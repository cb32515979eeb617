//! HTML comment bodies to document paragraph content.
//!
//! The converter walks an HTML fragment and produces a flat list of
//! [`ContentInstruction`]s describing a single document paragraph: text
//! runs, line breaks and inline images. It never touches a document itself;
//! the template writer applies the instructions.
//!
//! Only a handful of tags carry meaning:
//!
//! | Node | Output |
//! |---|---|
//! | text | each line as a text run followed by a line break |
//! | `<br>` | a line break |
//! | `<p>` | its children, then a line break |
//! | `<li>` | a bullet run, its children, then a line break unless the children already ended with one |
//! | `<img src>` | the fetched image, or nothing when the fetch fails |
//! | anything else | its children |
//!
//! A list item never adds a break of its own after content that already
//! ended with one, so `<li><p>x</p></li>` gives two breaks (the text's and
//! the paragraph's) rather than three.
//!
//! # Example
//!
//! ```rust
//! use ticket_report_core::{ContentInstruction, convert};
//!
//! let instructions = convert("<li>Item</li>", |_| None);
//! assert_eq!(
//!     instructions,
//!     vec![
//!         ContentInstruction::text("• "),
//!         ContentInstruction::text("Item"),
//!         ContentInstruction::InsertLineBreak,
//!     ]
//! );
//! ```

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};
use tracing::debug;

/// One step in building a document paragraph.
#[derive(Clone, PartialEq, Eq)]
pub enum ContentInstruction {
    /// Append a text run.
    AppendText(String),
    /// Insert a line break inside the paragraph.
    InsertLineBreak,
    /// Insert an inline picture from raw image bytes.
    InsertImage(Vec<u8>),
}

impl ContentInstruction {
    /// Shorthand for [`ContentInstruction::AppendText`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::AppendText(text.into())
    }

    /// Returns true for [`ContentInstruction::InsertLineBreak`].
    pub fn is_line_break(&self) -> bool {
        matches!(self, Self::InsertLineBreak)
    }
}

impl std::fmt::Debug for ContentInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppendText(text) => f.debug_tuple("AppendText").field(text).finish(),
            Self::InsertLineBreak => f.write_str("InsertLineBreak"),
            Self::InsertImage(bytes) => write!(f, "InsertImage({} bytes)", bytes.len()),
        }
    }
}

/// Configuration for HTML conversion.
///
/// The defaults reproduce the established report layout, including the
/// double break after a paragraph that ends in a text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Text run emitted before each list item (default: `"• "`).
    pub bullet: String,

    /// Emit the bullet for `<li>` elements directly inside `<ul>` (default: true).
    pub bullet_in_unordered_list: bool,

    /// Skip a paragraph's trailing break when the paragraph already ended
    /// with one (default: false).
    pub collapse_paragraph_break: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self { bullet: "• ".to_string(), bullet_in_unordered_list: true, collapse_paragraph_break: false }
    }
}

impl ConvertConfig {
    /// Creates a new builder for ConvertConfig.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ticket_report_core::ConvertConfig;
    ///
    /// let config = ConvertConfig::builder().collapse_paragraph_break(true).build();
    /// assert!(config.collapse_paragraph_break);
    /// ```
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder::new()
    }
}

/// Builder for ConvertConfig.
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ConvertConfig::default() }
    }

    /// Sets the bullet prefix.
    pub fn bullet(mut self, value: impl Into<String>) -> Self {
        self.config.bullet = value.into();
        self
    }

    /// Sets whether `<ul>` items get the bullet prefix.
    pub fn bullet_in_unordered_list(mut self, value: bool) -> Self {
        self.config.bullet_in_unordered_list = value;
        self
    }

    /// Sets whether paragraph breaks collapse into a preceding break.
    pub fn collapse_paragraph_break(mut self, value: bool) -> Self {
        self.config.collapse_paragraph_break = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ConvertConfig {
        self.config
    }
}

impl Default for ConvertConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What a visited tree node is, as far as conversion cares.
enum NodeKind<'a> {
    Text(&'a str),
    Element(ElementRef<'a>),
    /// Comments, doctypes and processing instructions.
    Ignored,
}

impl<'a> NodeKind<'a> {
    fn of(node: NodeRef<'a, Node>) -> Self {
        match node.value() {
            Node::Text(text) => Self::Text(&**text),
            Node::Element(_) => ElementRef::wrap(node).map_or(Self::Ignored, Self::Element),
            _ => Self::Ignored,
        }
    }
}

/// How an element contributes to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagRule {
    LineBreak,
    Paragraph,
    ListItem,
    Image,
    Container,
}

impl TagRule {
    fn for_tag(name: &str) -> Self {
        match name {
            "br" => Self::LineBreak,
            "p" => Self::Paragraph,
            "li" => Self::ListItem,
            "img" => Self::Image,
            _ => Self::Container,
        }
    }
}

struct Converter<'c, F> {
    config: &'c ConvertConfig,
    fetch_image: F,
    output: Vec<ContentInstruction>,
}

impl<F> Converter<'_, F>
where
    F: FnMut(&str) -> Option<Vec<u8>>,
{
    fn visit(&mut self, node: NodeRef<'_, Node>) {
        match NodeKind::of(node) {
            NodeKind::Text(text) => {
                for line in text.lines() {
                    self.output.push(ContentInstruction::text(line));
                    self.output.push(ContentInstruction::InsertLineBreak);
                }
            }
            NodeKind::Element(element) => self.visit_element(element),
            NodeKind::Ignored => {}
        }
    }

    fn visit_children(&mut self, node: NodeRef<'_, Node>) {
        for child in node.children() {
            self.visit(child);
        }
    }

    fn visit_element(&mut self, element: ElementRef<'_>) {
        match TagRule::for_tag(element.value().name()) {
            TagRule::LineBreak => self.output.push(ContentInstruction::InsertLineBreak),
            TagRule::Paragraph => {
                self.visit_children(*element);
                if !(self.config.collapse_paragraph_break && self.ends_with_break()) {
                    self.output.push(ContentInstruction::InsertLineBreak);
                }
            }
            TagRule::ListItem => {
                if self.wants_bullet(element) {
                    self.output.push(ContentInstruction::text(self.config.bullet.as_str()));
                }
                self.visit_children(*element);
                if !self.ends_with_break() {
                    self.output.push(ContentInstruction::InsertLineBreak);
                }
            }
            TagRule::Image => {
                let Some(src) = element.value().attr("src") else {
                    debug!("Skipping <img> without src");
                    return;
                };
                match (self.fetch_image)(src) {
                    Some(bytes) => self.output.push(ContentInstruction::InsertImage(bytes)),
                    None => debug!(src, "Image unavailable, leaving it out"),
                }
            }
            TagRule::Container => self.visit_children(*element),
        }
    }

    fn ends_with_break(&self) -> bool {
        self.output.last().is_some_and(ContentInstruction::is_line_break)
    }

    fn wants_bullet(&self, item: ElementRef<'_>) -> bool {
        if self.config.bullet_in_unordered_list {
            return true;
        }
        let in_unordered_list = item
            .parent()
            .and_then(ElementRef::wrap)
            .is_some_and(|parent| parent.value().name() == "ul");
        !in_unordered_list
    }
}

/// Converts an HTML fragment with the default configuration.
///
/// `fetch_image` is called once per `<img src>`, in document order. When it
/// returns `None` the image is left out and conversion continues.
pub fn convert<F>(html: &str, fetch_image: F) -> Vec<ContentInstruction>
where
    F: FnMut(&str) -> Option<Vec<u8>>,
{
    convert_with_config(html, &ConvertConfig::default(), fetch_image)
}

/// Converts an HTML fragment with a custom configuration.
///
/// The fragment's top-level nodes are visited in order and their output
/// concatenated.
pub fn convert_with_config<F>(html: &str, config: &ConvertConfig, fetch_image: F) -> Vec<ContentInstruction>
where
    F: FnMut(&str) -> Option<Vec<u8>>,
{
    let fragment = Html::parse_fragment(html);
    let mut converter = Converter { config, fetch_image, output: Vec::new() };

    converter.visit_children(*fragment.root_element());

    converter.output
}
