//! Page parameter normalization.
//!
//! # Responsibility
//! - Turn a page's declared parameters into `PageParam` handles bound to the
//!   current location.
//! - Reject malformed declarations at registration time, per page.
//!
//! # Invariants
//! - Normalization runs once per page registration; handles read the
//!   location lazily, so later navigation is observed without re-normalizing.
//! - A query value missing from the location falls back to the declared
//!   default.

use crate::extension::model::{Extension, PageRegistration, ParamValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

static PARAM_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("param name pattern is valid")
});

/// Read access to the current navigable location.
pub trait LocationSource {
    /// Every value of query parameter `name`, in order of appearance.
    fn query_values(&self, name: &str) -> Vec<String>;
}

/// Converts a page's declared parameters into typed inputs.
pub trait PageParamsNormalizer {
    fn normalize(
        &self,
        extension: &Extension,
        registration: &PageRegistration,
    ) -> Result<PageParams, NormalizeError>;
}

/// One page parameter bound to the location.
#[derive(Clone)]
pub struct PageParam {
    name: String,
    default_value: ParamValue,
    location: Rc<dyn LocationSource>,
}

impl PageParam {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &ParamValue {
        &self.default_value
    }

    /// Current value; the declared default when the location omits it.
    pub fn get(&self) -> ParamValue {
        let values = self.location.query_values(&self.name);
        match (&self.default_value, values.first()) {
            (_, None) => self.default_value.clone(),
            (ParamValue::Text(_), Some(first)) => ParamValue::Text(first.clone()),
            (ParamValue::List(_), Some(_)) => ParamValue::List(values),
        }
    }

    pub fn is_default(&self) -> bool {
        self.get() == self.default_value
    }
}

impl Debug for PageParam {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageParam")
            .field("name", &self.name)
            .field("default_value", &self.default_value)
            .finish_non_exhaustive()
    }
}

/// Normalized parameters of one page, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PageParams {
    params: BTreeMap<String, PageParam>,
}

impl PageParams {
    pub fn get(&self, name: &str) -> Option<&PageParam> {
        self.params.get(name)
    }

    /// Current value of `name`, if declared.
    pub fn value(&self, name: &str) -> Option<ParamValue> {
        self.get(name).map(PageParam::get)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Normalizer that binds parameters to query values of a location.
#[derive(Clone)]
pub struct LocationParamsNormalizer {
    location: Rc<dyn LocationSource>,
}

impl LocationParamsNormalizer {
    pub fn new(location: Rc<dyn LocationSource>) -> Self {
        Self { location }
    }
}

impl PageParamsNormalizer for LocationParamsNormalizer {
    fn normalize(
        &self,
        _extension: &Extension,
        registration: &PageRegistration,
    ) -> Result<PageParams, NormalizeError> {
        let mut params = BTreeMap::new();
        for declaration in &registration.params {
            if !PARAM_NAME_PATTERN.is_match(&declaration.name) {
                return Err(NormalizeError::InvalidParamName {
                    page_id: registration.id.clone(),
                    name: declaration.name.clone(),
                });
            }
            let param = PageParam {
                name: declaration.name.clone(),
                default_value: declaration.default_value.clone(),
                location: Rc::clone(&self.location),
            };
            if params.insert(declaration.name.clone(), param).is_some() {
                return Err(NormalizeError::DuplicateParam {
                    page_id: registration.id.clone(),
                    name: declaration.name.clone(),
                });
            }
        }
        Ok(PageParams { params })
    }
}

/// Per-page normalization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    InvalidParamName { page_id: String, name: String },
    DuplicateParam { page_id: String, name: String },
}

impl Display for NormalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParamName { page_id, name } => {
                write!(f, "page `{page_id}` declares invalid param name `{name}`")
            }
            Self::DuplicateParam { page_id, name } => {
                write!(f, "page `{page_id}` declares param `{name}` twice")
            }
        }
    }
}

impl Error for NormalizeError {}
