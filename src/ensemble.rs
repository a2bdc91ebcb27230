//! Ensemble members addressed by composite keys
//!
//! A member key such as `MPI-ESM1-2-LR.r1i1p1f1.gn` is a dot-separated list of
//! values. A [`KeyTemplate`] like `source_id.member_id.grid_label` gives every
//! position a field name.

use crate::errors::{CodeBaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Separator between the elements of keys and templates
pub const KEY_SEPARATOR: char = '.';

/// Field names of a dot-separated member key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyTemplate {
    fields: Vec<String>,
}

impl KeyTemplate {
    /// # Errors
    ///
    /// Returns an error if the template has no `.` separator or uses `member`
    /// as a field name.
    pub fn new(template: &str) -> Result<Self> {
        if !template.contains(KEY_SEPARATOR) {
            return Err(CodeBaseError::EnsembleError(
                "Elements must be divided by a dot (.).".to_string(),
            ));
        }
        let fields: Vec<String> = template.split(KEY_SEPARATOR).map(str::to_string).collect();
        if fields.iter().any(|f| f == "member") {
            return Err(CodeBaseError::EnsembleError(
                "key_template must not contain 'member'! Please choose a different identifier."
                    .to_string(),
            ));
        }
        Ok(Self { fields })
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Split a member key into its named fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of elements differs from the template.
    pub fn parse(&self, key: &str) -> Result<MemberKey> {
        let values: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if values.len() != self.fields.len() {
            return Err(CodeBaseError::EnsembleError(format!(
                "Key '{}' has {} elements but the template '{}' expects {}",
                key,
                values.len(),
                self,
                self.fields.len()
            )));
        }
        Ok(MemberKey {
            key: key.to_string(),
            fields: self
                .fields
                .iter()
                .cloned()
                .zip(values.into_iter().map(str::to_string))
                .collect(),
        })
    }
}

impl FromStr for KeyTemplate {
    type Err = CodeBaseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for KeyTemplate {
    type Error = CodeBaseError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<KeyTemplate> for String {
    fn from(template: KeyTemplate) -> Self {
        template.to_string()
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join("."))
    }
}

/// A member key split into its named fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberKey {
    key: String,
    fields: BTreeMap<String, String>,
}

impl MemberKey {
    /// The full key as given
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        self.get("source_id")
    }

    #[must_use]
    pub fn member_id(&self) -> Option<&str> {
        self.get("member_id")
    }

    #[must_use]
    pub fn grid_label(&self) -> Option<&str> {
        self.get("grid_label")
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// Members stored under composite keys
#[derive(Debug, Clone)]
pub struct Ensemble<T> {
    members: BTreeMap<String, T>,
    key_template: Option<KeyTemplate>,
}

impl<T> Default for Ensemble<T> {
    fn default() -> Self {
        Self {
            members: BTreeMap::new(),
            key_template: None,
        }
    }
}

impl<T> Ensemble<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member, returning the member previously stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, member: T) -> Option<T> {
        self.members.insert(key.into(), member)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.members.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// # Errors
    ///
    /// Returns an error if no template has been set yet.
    pub fn key_template(&self) -> Result<&KeyTemplate> {
        self.key_template.as_ref().ok_or_else(|| {
            CodeBaseError::EnsembleError(
                "key_template not set. Make sure the attributes of the 'member' coordinate \
                 comprise a 'key_template' value. You can set this via \
                 ensemble.set_key_template(\"your.template\")."
                    .to_string(),
            )
        })
    }

    /// # Errors
    ///
    /// See [`KeyTemplate::new`].
    pub fn set_key_template(&mut self, template: &str) -> Result<()> {
        self.key_template = Some(KeyTemplate::new(template)?);
        Ok(())
    }

    /// Fields of a member key according to the key template.
    ///
    /// # Errors
    ///
    /// Returns an error if no template is set or the key does not fit it.
    pub fn fields(&self, key: &str) -> Result<MemberKey> {
        self.key_template()?.parse(key)
    }

    /// Members whose `field` equals `value`
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not part of the template or a key
    /// does not fit it.
    pub fn select(&self, field: &str, value: &str) -> Result<Vec<(&str, &T)>> {
        self.check_field(field)?;
        let mut selected = Vec::new();
        for (key, member) in &self.members {
            if self.fields(key)?.get(field) == Some(value) {
                selected.push((key.as_str(), member));
            }
        }
        Ok(selected)
    }

    /// Distinct values of `field` across all members, sorted.
    ///
    /// # Errors
    ///
    /// See [`Ensemble::select`].
    pub fn unique(&self, field: &str) -> Result<Vec<String>> {
        self.check_field(field)?;
        let mut values = Vec::new();
        for key in self.members.keys() {
            if let Some(value) = self.fields(key)?.get(field) {
                values.push(value.to_string());
            }
        }
        values.sort();
        values.dedup();
        Ok(values)
    }

    fn check_field(&self, field: &str) -> Result<()> {
        let template = self.key_template()?;
        if template.fields().iter().any(|f| f == field) {
            Ok(())
        } else {
            Err(CodeBaseError::EnsembleError(format!(
                "Field '{field}' is not part of the key template '{template}'"
            )))
        }
    }
}

impl<T> FromIterator<(String, T)> for Ensemble<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
            key_template: None,
        }
    }
}
