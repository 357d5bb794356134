use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Opaque handle to an element that has already been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the caller asked to drag: a selector still to resolve, or a resolved element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Selector(String),
    Element(ElementRef),
}

impl From<&str> for DragTarget {
    fn from(selector: &str) -> Self {
        DragTarget::Selector(selector.to_string())
    }
}

impl From<ElementRef> for DragTarget {
    fn from(element: ElementRef) -> Self {
        DragTarget::Element(element)
    }
}

pub trait ElementResolver: Send + Sync {
    fn query_selector(&self, selector: &str) -> Option<ElementRef>;
}

/// Renders an element into an encoded still image. Knows nothing about sessions.
#[async_trait]
pub trait Snapshotter: Send + Sync {
    async fn capture(&self, element: &ElementRef) -> Result<CapturedImage, String>;
}

/// Encoded PNG bitmap of the dragged element.
///
/// Moved into the native request; the controller never keeps a copy.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    png: Vec<u8>,
}

impl CapturedImage {
    pub fn from_png_bytes(png: Vec<u8>) -> Result<Self, String> {
        if png.is_empty() {
            return Err("empty image".to_string());
        }
        Ok(Self { png })
    }

    /// Accepts the `data:image/png;base64,...` form produced by canvas encoders.
    pub fn from_data_url(data_url: &str) -> Result<Self, String> {
        let encoded = data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or("invalid base64, expected image/png format")?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| format!("invalid base64 image data: {}", e))?;
        Self::from_png_bytes(png)
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("bytes", &self.png.len())
            .finish()
    }
}
