//! Typed injection registry.
//!
//! # Responsibility
//! - Map unique identifiers to producers and resolve values on demand.
//! - Group producers under collection tokens and resolve them as one
//!   ordered list.
//! - Remove every entry owned by one extension on request.
//!
//! # Invariants
//! - Identifiers are unique; registering a taken identifier fails and leaves
//!   the registry untouched.
//! - A producer runs at most once per identifier; its value is cached.
//! - Token lists preserve registration order.
//! - Existing entries are never replaced in place.

use once_cell::unsync::OnceCell;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;

/// Named collection point for values of type `T`.
pub struct InjectionToken<T> {
    id: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> InjectionToken<T> {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<T> Clone for InjectionToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InjectionToken<T> {}

impl<T> Debug for InjectionToken<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "InjectionToken({})", self.id)
    }
}

type Producer<T> = Box<dyn Fn(&Registry) -> Result<T, RegistryError>>;
type ErasedProducer = Box<dyn Fn(&Registry) -> Result<Rc<dyn Any>, RegistryError>>;

/// Registration unit: identifier, optional token, optional owner and a
/// producer.
pub struct Injectable<T> {
    id: String,
    token: Option<InjectionToken<T>>,
    owner: Option<String>,
    instantiate: Producer<T>,
}

impl<T: 'static> Injectable<T> {
    pub fn new(
        id: impl Into<String>,
        instantiate: impl Fn(&Registry) -> Result<T, RegistryError> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            token: None,
            owner: None,
            instantiate: Box::new(instantiate),
        }
    }

    /// Adds the injectable to a collection token.
    pub fn with_token(mut self, token: InjectionToken<T>) -> Self {
        self.token = Some(token);
        self
    }

    /// Tags the injectable with an owner id, used by [`Registry::purge_owner`].
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> Debug for Injectable<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injectable")
            .field("id", &self.id)
            .field("token", &self.token.map(|token| token.id))
            .field("owner", &self.owner)
            .finish()
    }
}

struct Entry {
    token: Option<&'static str>,
    owner: Option<String>,
    type_name: &'static str,
    producer: ErasedProducer,
    cached: OnceCell<Rc<dyn Any>>,
}

/// Process-wide registry instance, owned explicitly by the host.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, Entry>,
    token_index: BTreeMap<&'static str, Vec<String>>,
    resolving: RefCell<Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one injectable.
    pub fn register<T: 'static>(&mut self, injectable: Injectable<T>) -> Result<(), RegistryError> {
        let Injectable {
            id,
            token,
            owner,
            instantiate,
        } = injectable;

        if id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.entries.contains_key(id.as_str()) {
            return Err(RegistryError::DuplicateId(id));
        }

        let token = token.map(|token| token.id);
        if let Some(token) = token {
            self.token_index.entry(token).or_default().push(id.clone());
        }
        self.entries.insert(
            id,
            Entry {
                token,
                owner,
                type_name: type_name::<T>(),
                producer: Box::new(move |registry: &Registry| {
                    instantiate(registry).map(|value| Rc::new(value) as Rc<dyn Any>)
                }),
                cached: OnceCell::new(),
            },
        );
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves one identifier, instantiating and caching on first use.
    pub fn inject<T: 'static>(&self, id: &str) -> Result<Rc<T>, RegistryError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| RegistryError::NotRegistered(id.to_string()))?;

        let value = match entry.cached.get() {
            Some(value) => Rc::clone(value),
            None => {
                let value = self.instantiate(id, entry)?;
                Rc::clone(entry.cached.get_or_init(|| value))
            }
        };

        value
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                id: id.to_string(),
                registered: entry.type_name,
                requested: type_name::<T>(),
            })
    }

    /// Resolves every injectable registered under `token`, in registration
    /// order.
    pub fn inject_all<T: 'static>(
        &self,
        token: &InjectionToken<T>,
    ) -> Result<Vec<Rc<T>>, RegistryError> {
        self.ids_for_token(token.id)
            .into_iter()
            .map(|id| self.inject::<T>(id))
            .collect()
    }

    /// Identifiers registered under one token id, in registration order.
    pub fn ids_for_token(&self, token: &str) -> Vec<&str> {
        self.token_index
            .get(token)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Identifiers tagged with `owner`, sorted.
    pub fn ids_owned_by(&self, owner: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.owner.as_deref() == Some(owner))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Removes one entry and its token membership. Returns false when `id`
    /// was not registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        if let Some(token) = entry.token {
            if let Some(ids) = self.token_index.get_mut(token) {
                ids.retain(|candidate| candidate != id);
                if ids.is_empty() {
                    self.token_index.remove(token);
                }
            }
        }
        true
    }

    /// Removes every entry tagged with `owner` and returns how many were
    /// removed.
    pub fn purge_owner(&mut self, owner: &str) -> usize {
        let doomed: Vec<String> = self
            .ids_owned_by(owner)
            .into_iter()
            .map(str::to_string)
            .collect();

        for id in &doomed {
            self.unregister(id);
        }

        if !doomed.is_empty() {
            log::info!(
                "event=registry_purge module=registry status=ok owner={} removed={}",
                owner,
                doomed.len()
            );
        }
        doomed.len()
    }

    fn instantiate(&self, id: &str, entry: &Entry) -> Result<Rc<dyn Any>, RegistryError> {
        {
            let mut resolving = self.resolving.borrow_mut();
            if let Some(start) = resolving.iter().position(|pending| pending == id) {
                let mut chain = resolving[start..].to_vec();
                chain.push(id.to_string());
                return Err(RegistryError::CyclicResolution(chain));
            }
            resolving.push(id.to_string());
        }

        let result = (entry.producer)(self);
        self.resolving.borrow_mut().pop();
        result
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .field("tokens", &self.token_index)
            .finish()
    }
}

/// Registry registration/resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    EmptyId,
    DuplicateId(String),
    NotRegistered(String),
    TypeMismatch {
        id: String,
        registered: &'static str,
        requested: &'static str,
    },
    CyclicResolution(Vec<String>),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "injectable id must not be empty"),
            Self::DuplicateId(value) => write!(f, "injectable id already registered: {value}"),
            Self::NotRegistered(value) => write!(f, "injectable not registered: {value}"),
            Self::TypeMismatch {
                id,
                registered,
                requested,
            } => write!(
                f,
                "injectable `{id}` produces {registered}, not {requested}"
            ),
            Self::CyclicResolution(chain) => {
                write!(f, "cyclic injection: {}", chain.join(" -> "))
            }
        }
    }
}

impl Error for RegistryError {}
