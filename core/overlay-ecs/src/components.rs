/// A mounted element standing for a document token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenElement {
    pub index: u32,
    /// Length of the token text in chars, used to estimate the caret offset
    /// from a hit position.
    pub chars: u32,
}

/// A mounted element standing for a token the document does not have.
/// It is not selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub index: u32,
}

/// Which render unit an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountedIn {
    pub unit: usize,
}

/// Layout box reported by the host after the element was laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// What to mount for one slot of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Token { index: u32, chars: u32 },
    Placeholder { index: u32 },
}
