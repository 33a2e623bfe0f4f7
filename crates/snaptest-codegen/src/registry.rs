//! Adaptor registries
//!
//! Both backends dispatch through an [`AdaptorRegistry`]: additional
//! adaptors first, then the defaults, every adaptor before the parent it
//! specializes. Values no adaptor accepts go to the backend's reflective
//! fallback unless it is disabled.

use snaptest_values::{OverrideChain, Overridable, RegistryError};
use std::fmt;
use std::sync::Arc;

/// Override-ordered adaptors of one backend
pub struct AdaptorRegistry<A: ?Sized> {
    chain: OverrideChain<Arc<A>>,
    reflective_fallback: bool,
}

impl<A: ?Sized> Clone for AdaptorRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            reflective_fallback: self.reflective_fallback,
        }
    }
}

impl<A: Overridable + ?Sized> fmt::Debug for AdaptorRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptorRegistry")
            .field("adaptors", &self.chain.names())
            .field("reflective_fallback", &self.reflective_fallback)
            .finish()
    }
}

impl<A: Overridable + ?Sized> AdaptorRegistry<A> {
    /// Build from `additional` adaptors followed by `defaults`
    ///
    /// # Errors
    /// Returns [`RegistryError`] for duplicate names, unknown parents and
    /// parent cycles.
    pub fn build(additional: Vec<Arc<A>>, defaults: Vec<Arc<A>>) -> Result<Self, RegistryError> {
        let mut entries = additional;
        entries.extend(defaults);
        Ok(Self {
            chain: OverrideChain::build(entries)?,
            reflective_fallback: true,
        })
    }

    /// Enable or disable the reflective fallback
    #[must_use]
    pub fn with_reflective_fallback(mut self, enabled: bool) -> Self {
        self.reflective_fallback = enabled;
        self
    }

    /// Check if unclaimed values fall back to reflection
    #[inline]
    #[must_use]
    pub fn reflective_fallback(&self) -> bool {
        self.reflective_fallback
    }

    /// First adaptor in override order accepted by `accepts`
    pub fn select(&self, accepts: impl FnMut(&Arc<A>) -> bool) -> Option<Arc<A>> {
        self.chain.select(accepts).cloned()
    }

    /// Adaptor by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<A>> {
        self.chain.get(name).cloned()
    }

    /// Names in override order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.chain.names()
    }

    /// Number of adaptors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Check for a registry without adaptors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}
