use serde::{Deserialize, Serialize};

/// Inline image atom. Content nodes materialize as Markdown image text, so
/// inserting one is an ordinary text edit and round-trips losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    pub src: String,
    pub alt: String,
}

impl ImageNode {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: String::new(),
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }

    pub fn to_markdown(&self) -> String {
        format!("![{}]({})", self.alt, self.src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_markdown() {
        assert_eq!(ImageNode::new("img://1").to_markdown(), "![](img://1)");
        assert_eq!(
            ImageNode::new("a.png").with_alt("logo").to_markdown(),
            "![logo](a.png)"
        );
    }
}
