//! Extension declarations read by the routing core.
//!
//! # Responsibility
//! - Describe an activated extension: its pages and its cluster page menus.
//! - Derive the stable sanitized extension id from the package name.
//! - Validate page declarations before any route is synthesized.
//!
//! # Invariants
//! - `Extension::id` is sanitized and matches the extension id grammar.
//! - Page ids are unique across global and cluster pages of one extension.

use crate::routing::render::PageComponent;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

static EXTENSION_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9._~-]*[a-z0-9])?$").expect("extension id pattern is valid")
});

static PAGE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("page id pattern is valid"));

/// Turns a package name such as `@acme/kube-tools` into `acme--kube-tools`.
pub fn sanitize_extension_name(name: &str) -> String {
    name.trim().replace('@', "").replace('/', "--")
}

fn is_valid_extension_id(value: &str) -> bool {
    EXTENSION_ID_PATTERN.is_match(value)
}

fn is_valid_page_id(value: &str) -> bool {
    value.is_empty() || PAGE_ID_PATTERN.is_match(value)
}

/// Loaded plugin package, as seen by the routing core.
#[derive(Debug, Clone)]
pub struct Extension {
    /// Sanitized identifier, e.g. `acme--kube-tools`.
    pub id: String,
    /// Package name the id was derived from.
    pub name: String,
    pub global_pages: Vec<PageRegistration>,
    pub cluster_pages: Vec<PageRegistration>,
    pub cluster_page_menus: Vec<MenuEntry>,
}

impl Extension {
    /// Creates an extension with no declarations.
    pub fn new(name: &str) -> Result<Self, ExtensionModelError> {
        if name.trim().is_empty() {
            return Err(ExtensionModelError::EmptyName);
        }
        let id = sanitize_extension_name(name);
        if !is_valid_extension_id(&id) {
            return Err(ExtensionModelError::InvalidId(id));
        }

        Ok(Self {
            id,
            name: name.trim().to_string(),
            global_pages: Vec::new(),
            cluster_pages: Vec::new(),
            cluster_page_menus: Vec::new(),
        })
    }

    pub fn with_global_page(mut self, page: PageRegistration) -> Self {
        self.global_pages.push(page);
        self
    }

    pub fn with_cluster_page(mut self, page: PageRegistration) -> Self {
        self.cluster_pages.push(page);
        self
    }

    pub fn with_menu_entry(mut self, entry: MenuEntry) -> Self {
        self.cluster_page_menus.push(entry);
        self
    }

    /// Global pages followed by cluster pages, each tagged with its
    /// cluster-frame flag.
    pub fn pages(&self) -> impl Iterator<Item = (&PageRegistration, bool)> {
        self.global_pages
            .iter()
            .map(|page| (page, false))
            .chain(self.cluster_pages.iter().map(|page| (page, true)))
    }

    pub fn page_count(&self) -> usize {
        self.global_pages.len() + self.cluster_pages.len()
    }

    /// Validates page ids across both page lists.
    pub fn validate_pages(&self) -> Result<(), ExtensionModelError> {
        let mut seen = BTreeSet::<&str>::new();
        for (page, _) in self.pages() {
            if !is_valid_page_id(&page.id) {
                return Err(ExtensionModelError::InvalidPageId(page.id.clone()));
            }
            if !seen.insert(page.id.as_str()) {
                return Err(ExtensionModelError::DuplicatePageId(page.id.clone()));
            }
        }
        Ok(())
    }
}

/// Page contributed by an extension.
#[derive(Clone)]
pub struct PageRegistration {
    /// Unique within the extension; empty for the default page.
    pub id: String,
    pub component: Rc<dyn PageComponent>,
    /// Declared parameters in declaration order.
    pub params: Vec<ParamDeclaration>,
}

impl PageRegistration {
    pub fn new(id: impl Into<String>, component: impl PageComponent + 'static) -> Self {
        Self {
            id: id.into(),
            component: Rc::new(component),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, default_value: ParamValue) -> Self {
        self.params.push(ParamDeclaration {
            name: name.into(),
            default_value,
        });
        self
    }
}

impl Debug for PageRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRegistration")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One declared page parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDeclaration {
    pub name: String,
    pub default_value: ParamValue,
}

/// Typed parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::List(_) => None,
        }
    }
}

/// Sidebar entry of a cluster page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub id: Option<String>,
    /// Entries sharing a non-null parent id are siblings.
    pub parent_id: Option<String>,
    pub target_page_id: String,
    pub title: String,
}

impl MenuEntry {
    pub fn new(target_page_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            parent_id: None,
            target_page_id: target_page_id.into(),
            title: title.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Extension declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionModelError {
    EmptyName,
    InvalidId(String),
    InvalidPageId(String),
    DuplicatePageId(String),
}

impl Display for ExtensionModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "extension name must not be empty"),
            Self::InvalidId(value) => write!(f, "extension id is invalid: {value}"),
            Self::InvalidPageId(value) => write!(f, "page id is invalid: {value}"),
            Self::DuplicatePageId(value) => write!(f, "page id is declared twice: {value}"),
        }
    }
}

impl Error for ExtensionModelError {}
