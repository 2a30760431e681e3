//! Field injection: descriptors, binding slots, and the injection pass.
//!
//! A [`SecretTarget`] enumerates its secret-bearing fields as bindings;
//! [`ResolutionChain::inject`] resolves each binding's key through the
//! chain and writes the result back. Targets built by composing other
//! targets contribute the embedded targets' bindings too, so a field
//! declared on a base structure and again on a wrapping one is a distinct
//! binding at each level and is injected independently.
//!
//! # Example
//!
//! ```rust,ignore
//! use secretchain::{SecretDescriptor, SecretField, SecretTarget};
//!
//! #[derive(Default)]
//! struct BaseConfig {
//!     api_token: String,
//! }
//!
//! impl SecretTarget for BaseConfig {
//!     fn secret_fields(&mut self) -> Vec<SecretField<'_>> {
//!         vec![SecretField::text(
//!             "api_token",
//!             SecretDescriptor::new("API_TOKEN"),
//!             &mut self.api_token,
//!         )]
//!     }
//! }
//!
//! #[derive(Default)]
//! struct ServiceConfig {
//!     base: BaseConfig,
//!     db_password: String,
//! }
//!
//! impl SecretTarget for ServiceConfig {
//!     fn secret_fields(&mut self) -> Vec<SecretField<'_>> {
//!         let mut fields = self.base.secret_fields();
//!         fields.push(SecretField::text(
//!             "db_password",
//!             SecretDescriptor::new("DB_PASSWORD"),
//!             &mut self.db_password,
//!         ));
//!         fields
//!     }
//! }
//! ```

use crate::chain::ResolutionChain;
use crate::error::{InjectError, ResolveError};

/// Per-field secret declaration: which key to resolve, whether the field
/// is required, and the fallback value.
///
/// Immutable once built. `required` defaults to true and the default
/// value to empty; an empty default counts as "no default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretDescriptor {
    key: String,
    required: bool,
    default_value: String,
}

impl SecretDescriptor {
    /// Declare a required secret with no default.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), required: true, default_value: String::new() }
    }

    /// Mark the secret as optional: absence falls back to the default
    /// value (empty unless set).
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the fallback value used when the key cannot be resolved.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }
}

/// Where a resolved value lands.
pub enum SecretSlot<'a> {
    /// Plain string field; the resolved value (or default) is stored as-is.
    Text(&'a mut String),
    /// Optional string field; an empty resolved value stores `None`.
    OptionalText(&'a mut Option<String>),
    /// Fallible store, for fields that parse or validate the value. A
    /// rejected write fails injection for this binding.
    Apply(Box<dyn FnMut(String) -> Result<(), String> + Send + 'a>),
}

impl std::fmt::Debug for SecretSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(_) => f.write_str("Text"),
            Self::OptionalText(_) => f.write_str("OptionalText"),
            Self::Apply(_) => f.write_str("Apply"),
        }
    }
}

/// One secret-bearing field binding: a name (for diagnostics), its
/// descriptor, and the slot the value is written into.
#[derive(Debug)]
pub struct SecretField<'a> {
    pub name: &'static str,
    pub descriptor: SecretDescriptor,
    pub slot: SecretSlot<'a>,
}

impl<'a> SecretField<'a> {
    /// Bind a plain string field.
    pub fn text(name: &'static str, descriptor: SecretDescriptor, slot: &'a mut String) -> Self {
        Self { name, descriptor, slot: SecretSlot::Text(slot) }
    }

    /// Bind an optional string field.
    pub fn optional_text(
        name: &'static str,
        descriptor: SecretDescriptor,
        slot: &'a mut Option<String>,
    ) -> Self {
        Self { name, descriptor, slot: SecretSlot::OptionalText(slot) }
    }

    /// Bind a field through a fallible apply function.
    pub fn apply(
        name: &'static str,
        descriptor: SecretDescriptor,
        apply: impl FnMut(String) -> Result<(), String> + Send + 'a,
    ) -> Self {
        Self { name, descriptor, slot: SecretSlot::Apply(Box::new(apply)) }
    }
}

/// A structure whose fields can be populated from resolved secrets.
///
/// `secret_fields` enumerates every binding exactly once, in the order
/// they should be injected. Only mutable, per-instance storage is
/// reachable through a binding, so constants and shared state cannot be
/// injection targets by construction.
pub trait SecretTarget {
    fn secret_fields(&mut self) -> Vec<SecretField<'_>>;
}

impl ResolutionChain {
    /// Populate every secret binding of `target`.
    ///
    /// Bindings are processed in enumeration order. The first failure
    /// aborts the remainder of the pass; fields already written stay
    /// written; injection is not transactional.
    pub async fn inject<T>(&self, target: &mut T) -> Result<(), InjectError>
    where
        T: SecretTarget + ?Sized,
    {
        for field in target.secret_fields() {
            let SecretField { name, descriptor, slot } = field;
            let value = self.binding_value(name, &descriptor).await?;
            write_slot(name, slot, value)?;
            tracing::debug!(field = %name, key = %descriptor.key(), "injected secret field");
        }
        Ok(())
    }

    /// Resolve one binding: the chain value if present, otherwise the
    /// descriptor's default, otherwise a missing-secret failure for
    /// required bindings.
    async fn binding_value(
        &self,
        field: &str,
        descriptor: &SecretDescriptor,
    ) -> Result<String, InjectError> {
        match self.resolve(descriptor.key()).await {
            Ok(value) => Ok(value),
            Err(ResolveError::NotFound { .. }) => {
                if descriptor.required() && descriptor.default_value().is_empty() {
                    Err(InjectError::MissingSecret {
                        field: field.to_string(),
                        key: descriptor.key().to_string(),
                    })
                } else {
                    Ok(descriptor.default_value().to_string())
                }
            }
            Err(err) => Err(InjectError::Resolution(err)),
        }
    }
}

fn write_slot(field: &str, slot: SecretSlot<'_>, value: String) -> Result<(), InjectError> {
    match slot {
        SecretSlot::Text(slot) => {
            *slot = value;
            Ok(())
        }
        SecretSlot::OptionalText(slot) => {
            *slot = if value.is_empty() { None } else { Some(value) };
            Ok(())
        }
        SecretSlot::Apply(mut apply) => apply(value)
            .map_err(|reason| InjectError::FieldWrite { field: field.to_string(), reason }),
    }
}
