/// Browse window position.
///
/// The API is always asked for `index = 1` with a `limit` covering every page
/// seen so far, so each request re-fetches the whole window from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    index: u32,
    page_size: u32,
}

impl PaginationCursor {
    /// A `page_size` of 0 is treated as 1.
    pub fn new(page_size: u32) -> Self {
        Self {
            index: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items requested for the current window.
    pub fn window(&self) -> u32 {
        self.index.saturating_mul(self.page_size)
    }

    pub fn advance(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.index = 1;
    }

    /// Query parameters for `/article/list`.
    pub fn request_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("index", "1".to_string()),
            ("limit", self.window().to_string()),
        ]
    }
}

/// A window that came back the same size as the one already held means the
/// server has nothing more to give.
pub(crate) fn is_exhausted(held: usize, received: usize) -> bool {
    held == received
}
