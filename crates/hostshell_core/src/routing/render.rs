//! Render contracts between extension pages and the host renderer.

use crate::extension::params::PageParams;
use serde::Serialize;

/// Output tree handed to the external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderOutput {
    /// Opaque view produced by an extension page.
    View { content: String },
    /// Shared tab shell wrapping one page of a sibling group.
    SiblingsInTabLayout {
        tabs: Vec<TabEntry>,
        content: Box<RenderOutput>,
    },
}

impl RenderOutput {
    pub fn view(content: impl Into<String>) -> Self {
        Self::View {
            content: content.into(),
        }
    }

    /// Returns true when this output is wrapped in the sibling tab shell.
    pub fn is_tab_layout(&self) -> bool {
        matches!(self, Self::SiblingsInTabLayout { .. })
    }

    /// Innermost page output, with any layout shell removed.
    pub fn page_content(&self) -> &RenderOutput {
        match self {
            Self::View { .. } => self,
            Self::SiblingsInTabLayout { content, .. } => content.page_content(),
        }
    }
}

/// One tab in the sibling tab shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabEntry {
    pub page_id: String,
    pub title: String,
    pub path: String,
    pub active: bool,
}

/// Renderable page definition contributed by an extension.
pub trait PageComponent {
    fn render(&self, params: &PageParams) -> RenderOutput;
}

impl<F> PageComponent for F
where
    F: Fn(&PageParams) -> RenderOutput,
{
    fn render(&self, params: &PageParams) -> RenderOutput {
        self(params)
    }
}
