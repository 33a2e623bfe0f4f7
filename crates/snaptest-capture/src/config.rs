//! Capture configuration
//!
//! [`CaptureConfig`] is read from TOML; every key is optional. Adaptor names
//! resolve through an [`AdaptorCatalog`] the embedding application fills
//! with its own serializers and code generation adaptors.

use crate::error::ConfigError;
use crate::serialize::{serializers, Serializer, Serializers};
use serde::{Deserialize, Serialize};
use snaptest_codegen::{MatcherAdaptor, MatcherAdaptors, SetupAdaptor, SetupAdaptors};
use snaptest_values::{GlobalRef, Overridable};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Capture session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Population budget per phase in milliseconds
    pub timeout_ms: u64,
    /// Fall back to reflective field walking for unclaimed values
    pub reflective_fallback: bool,
    /// Extra serializers, highest priority first
    pub serializers: Vec<String>,
    /// Extra reconstruction adaptors, highest priority first
    pub setup_adaptors: Vec<String>,
    /// Extra verification adaptors, highest priority first
    pub matcher_adaptors: Vec<String>,
    /// Class-level fields captured in both phases
    pub globals: Vec<GlobalRef>,
}

impl CaptureConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed input and
    /// [`ConfigError::ZeroTimeout`] for a zero budget.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise see
    /// [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// With population budget
    #[inline]
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// With reflective fallback enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_reflective_fallback(mut self, enabled: bool) -> Self {
        self.reflective_fallback = enabled;
        self
    }

    /// With a captured global
    #[must_use]
    pub fn with_global(mut self, global: GlobalRef) -> Self {
        self.globals.push(global);
        self
    }

    /// With an extra serializer name
    #[must_use]
    pub fn with_serializer(mut self, name: impl Into<String>) -> Self {
        self.serializers.push(name.into());
        self
    }

    /// Population budget
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check invariants not expressible in the schema
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroTimeout`] for a zero budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            reflective_fallback: true,
            serializers: Vec::new(),
            setup_adaptors: Vec::new(),
            matcher_adaptors: Vec::new(),
            globals: Vec::new(),
        }
    }
}

/// Named adaptors available to configuration
#[derive(Clone, Default)]
pub struct AdaptorCatalog {
    serializers: HashMap<String, Arc<dyn Serializer>>,
    setup: HashMap<String, Arc<dyn SetupAdaptor>>,
    matchers: HashMap<String, Arc<dyn MatcherAdaptor>>,
}

impl fmt::Debug for AdaptorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptorCatalog")
            .field("serializers", &self.serializers.keys().collect::<Vec<_>>())
            .field("setup", &self.setup.keys().collect::<Vec<_>>())
            .field("matchers", &self.matchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AdaptorCatalog {
    /// Empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a serializer available under its name
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializers.insert(serializer.name().to_string(), serializer);
        self
    }

    /// Make a reconstruction adaptor available under its name
    #[must_use]
    pub fn with_setup_adaptor(mut self, adaptor: Arc<dyn SetupAdaptor>) -> Self {
        self.setup.insert(adaptor.name().to_string(), adaptor);
        self
    }

    /// Make a verification adaptor available under its name
    #[must_use]
    pub fn with_matcher_adaptor(mut self, adaptor: Arc<dyn MatcherAdaptor>) -> Self {
        self.matchers.insert(adaptor.name().to_string(), adaptor);
        self
    }

    /// Build the registries `config` asks for
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownAdaptor`] for names missing from the
    /// catalog and [`ConfigError::Registry`] for broken override chains.
    pub fn resolve(&self, config: &CaptureConfig) -> Result<Registries, ConfigError> {
        let fallback = config.reflective_fallback;
        let registries = Registries {
            serializers: serializers(lookup(&self.serializers, &config.serializers, "serializer")?)
                .map_err(registration_failed)?
                .with_reflective_fallback(fallback),
            setup: SetupAdaptors::with_additional(lookup(&self.setup, &config.setup_adaptors, "setup")?)
                .map_err(registration_failed)?
                .with_reflective_fallback(fallback),
            matchers: MatcherAdaptors::with_additional(lookup(
                &self.matchers,
                &config.matcher_adaptors,
                "matcher",
            )?)
            .map_err(registration_failed)?
            .with_reflective_fallback(fallback),
        };
        tracing::debug!(
            serializers = ?registries.serializers.names(),
            setup = ?registries.setup.names(),
            matchers = ?registries.matchers.names(),
            "resolved adaptor registries"
        );
        Ok(registries)
    }
}

fn lookup<A: ?Sized>(
    available: &HashMap<String, Arc<A>>,
    names: &[String],
    kind: &'static str,
) -> Result<Vec<Arc<A>>, ConfigError> {
    names
        .iter()
        .map(|name| {
            available.get(name).cloned().ok_or_else(|| {
                tracing::error!(kind, name = %name, "configured adaptor is not registered");
                ConfigError::UnknownAdaptor {
                    kind,
                    name: name.clone(),
                }
            })
        })
        .collect()
}

fn registration_failed(err: snaptest_values::RegistryError) -> ConfigError {
    tracing::error!(error = %err, "invalid adaptor registration");
    err.into()
}

/// Resolved registries of one session
#[derive(Debug, Clone)]
pub struct Registries {
    /// Live value to IR
    pub serializers: Serializers,
    /// IR to reconstruction code
    pub setup: SetupAdaptors,
    /// IR to verification code
    pub matchers: MatcherAdaptors,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::ListSerializer;
    use snaptest_values::{ObjRef, TypeRef, TypeRegistry, ValueId};

    #[derive(Debug)]
    struct Sorted;

    impl Overridable for Sorted {
        fn name(&self) -> &str {
            "sorted-list"
        }

        fn parent(&self) -> Option<&str> {
            Some("list")
        }
    }

    impl Serializer for Sorted {
        fn accepts(&self, obj: &ObjRef, _types: &TypeRegistry) -> bool {
            obj.class().raw_name() == Some("demo::SortedList")
        }

        fn serialize(
            &self,
            obj: &ObjRef,
            declared: &TypeRef,
            facade: &mut crate::serialize::SerializerFacade<'_>,
        ) -> Result<ValueId, crate::CaptureError> {
            ListSerializer.serialize(obj, declared, facade)
        }
    }

    #[test]
    fn defaults_apply_to_empty_input() {
        let config = CaptureConfig::from_toml_str("").unwrap();
        assert_eq!(config, CaptureConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert!(config.reflective_fallback);
    }

    #[test]
    fn parses_every_key() {
        let config = CaptureConfig::from_toml_str(
            r#"
            timeout_ms = 250
            reflective_fallback = false
            serializers = ["sorted-list"]

            [[globals]]
            owner = "demo::Counter"
            name = "COUNT"
            type = "int"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert!(!config.reflective_fallback);
        assert_eq!(config.serializers, vec!["sorted-list"]);
        assert_eq!(
            config.globals,
            vec![GlobalRef::new(
                "demo::Counter",
                "COUNT",
                TypeRef::primitive(snaptest_values::Primitive::Int)
            )]
        );
    }

    #[test]
    fn rejects_zero_timeout_and_bad_syntax() {
        assert!(matches!(
            CaptureConfig::from_toml_str("timeout_ms = 0"),
            Err(ConfigError::ZeroTimeout)
        ));
        assert!(matches!(
            CaptureConfig::from_toml_str("timeout_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn catalog_resolves_names_in_order() {
        let catalog = AdaptorCatalog::new().with_serializer(Arc::new(Sorted));
        let config = CaptureConfig::new().with_serializer("sorted-list");
        let registries = catalog.resolve(&config).unwrap();
        let names = registries.serializers.names();
        let sorted = names.iter().position(|n| *n == "sorted-list").unwrap();
        let list = names.iter().position(|n| *n == "list").unwrap();
        assert!(sorted < list);
        assert!(registries.serializers.reflective_fallback());
    }

    #[test]
    fn unknown_names_are_reported() {
        let config = CaptureConfig::new().with_serializer("missing");
        let err = AdaptorCatalog::new().resolve(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownAdaptor { kind: "serializer", ref name } if name == "missing"
        ));
    }

    #[test]
    fn fallback_setting_reaches_every_registry() {
        let config = CaptureConfig::new().with_reflective_fallback(false);
        let registries = AdaptorCatalog::new().resolve(&config).unwrap();
        assert!(!registries.serializers.reflective_fallback());
        assert!(!registries.setup.reflective_fallback());
        assert!(!registries.matchers.reflective_fallback());
    }
}
