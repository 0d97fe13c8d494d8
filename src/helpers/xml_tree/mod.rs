use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Minimal owned element tree. OpenNebula pools and XML-RPC envelopes carry
/// neither attributes nor mixed content we care about, so only element names,
/// text and children are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child called `name`, if it is not empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Walk `path` through first-match children.
    pub fn descend(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parse `input` and return its root element.
pub fn parse_document(input: &str) -> Result<XmlNode, XmlTreeError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlTreeError::Malformed(e.to_string()))?;
        match event {
            Event::Start(e) => {
                stack.push(XmlNode::new(String::from_utf8_lossy(e.name().as_ref()).into_owned()));
            }
            Event::Empty(e) => {
                let node = XmlNode::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| XmlTreeError::Malformed(e.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or(XmlTreeError::Unbalanced)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlTreeError::Unbalanced);
    }
    root.ok_or(XmlTreeError::Empty)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<(), XmlTreeError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(XmlTreeError::MultipleRoots),
    }
    Ok(())
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum XmlTreeError {
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("unbalanced XML elements")]
    Unbalanced,
    #[error("XML document has more than one root element")]
    MultipleRoots,
    #[error("empty XML document")]
    Empty,
}
