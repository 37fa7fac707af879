use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::neutral::NeutralType;
use super::rule::{Target, TargetKind};
use crate::schema::SchemaError;

/// One column of a model or view, with its neutral type and a stable
/// ordinal. Ordinals follow declaration order and do not change across
/// recompilation of unchanged input; downstream generators rely on that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NeutralType,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub ordinal: usize,
}

/// A compiled base table. Exposes all declared fields to rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(skip)]
    pub domain: String,
    pub source_table: String,
    pub fields: Vec<Field>,
}

/// A compiled view. Its field set contains only the projected (selected)
/// columns; columns used solely in WHERE/JOIN clauses are not present and
/// therefore not visible to rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    #[serde(skip)]
    pub domain: String,
    pub source_view: String,
    pub fields: Vec<Field>,
}

/// The models and views compiled for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainIr {
    pub models: Vec<Model>,
    pub views: Vec<View>,
}

/// A resolved rule target: either a model or a view entry in the IR.
#[derive(Debug, Clone, Copy)]
pub enum TargetEntry<'a> {
    Model(&'a Model),
    View(&'a View),
}

impl<'a> TargetEntry<'a> {
    /// The fields a rule may reference on this target.
    #[must_use]
    pub fn fields(&self) -> &'a [Field] {
        match self {
            TargetEntry::Model(m) => &m.fields,
            TargetEntry::View(v) => &v.fields,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'a Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        match self {
            TargetEntry::Model(m) => &m.name,
            TargetEntry::View(v) => &v.name,
        }
    }
}

/// The compiled, neutral-typed schema: per-domain models and views.
///
/// Built once per compilation run and immutable thereafter; a source change
/// rebuilds the whole IR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelIr {
    domains: BTreeMap<String, DomainIr>,
}

impl ModelIr {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate domains in name order.
    pub fn domains(&self) -> impl Iterator<Item = (&str, &DomainIr)> {
        self.domains.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn domain(&self, name: &str) -> Option<&DomainIr> {
        self.domains.get(name)
    }

    #[must_use]
    pub fn model(&self, domain: &str, name: &str) -> Option<&Model> {
        self.domains
            .get(domain)?
            .models
            .iter()
            .find(|m| m.name == name)
    }

    #[must_use]
    pub fn view(&self, domain: &str, name: &str) -> Option<&View> {
        self.domains
            .get(domain)?
            .views
            .iter()
            .find(|v| v.name == name)
    }

    /// Resolve a rule target to its model or view entry.
    #[must_use]
    pub fn resolve(&self, target: &Target) -> Option<TargetEntry<'_>> {
        match target.kind {
            TargetKind::Model => self
                .model(&target.domain, &target.name)
                .map(TargetEntry::Model),
            TargetKind::View => self
                .view(&target.domain, &target.name)
                .map(TargetEntry::View),
        }
    }

    /// Number of models and views across all domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains
            .values()
            .map(|d| d.models.len() + d.views.len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a model, rejecting a name already taken in its domain.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Duplicate`] if the domain already holds a
    /// model or view with this name.
    pub fn add_model(&mut self, model: Model) -> Result<(), SchemaError> {
        self.check_free(&model.domain, &model.name)?;
        self.domains
            .entry(model.domain.clone())
            .or_default()
            .models
            .push(model);
        Ok(())
    }

    /// Add a view, rejecting a name already taken in its domain.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Duplicate`] if the domain already holds a
    /// model or view with this name.
    pub fn add_view(&mut self, view: View) -> Result<(), SchemaError> {
        self.check_free(&view.domain, &view.name)?;
        self.domains
            .entry(view.domain.clone())
            .or_default()
            .views
            .push(view);
        Ok(())
    }

    /// Merge another Model IR into this one. Schema files parse
    /// independently; merging joins them before cross-reference validation.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Duplicate`] on any name collision within a
    /// domain.
    pub fn merge(mut self, other: ModelIr) -> Result<Self, SchemaError> {
        for (_, domain) in other.domains {
            for model in domain.models {
                self.add_model(model)?;
            }
            for view in domain.views {
                self.add_view(view)?;
            }
        }
        Ok(self)
    }

    fn check_free(&self, domain: &str, name: &str) -> Result<(), SchemaError> {
        if let Some(d) = self.domains.get(domain) {
            let taken = d.models.iter().any(|m| m.name == name)
                || d.views.iter().any(|v| v.name == name);
            if taken {
                return Err(SchemaError::Duplicate {
                    domain: domain.to_owned(),
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Serialize to the JSON wire form (domain name to `{models, views}`).
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from the JSON wire form, restoring each entry's domain
    /// from its map key.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error on malformed input.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        let mut ir: ModelIr = serde_json::from_str(input)?;
        for (domain, d) in &mut ir.domains {
            for m in &mut d.models {
                m.domain.clone_from(domain);
            }
            for v in &mut d.views {
                v.domain.clone_from(domain);
            }
        }
        Ok(ir)
    }
}

impl fmt::Display for ModelIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let models: usize = self.domains.values().map(|d| d.models.len()).sum();
        let views: usize = self.domains.values().map(|d| d.views.len()).sum();
        write!(
            f,
            "ModelIr({} domains, {models} models, {views} views)",
            self.domains.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: NeutralType, ordinal: usize) -> Field {
        Field {
            name: name.to_owned(),
            ty,
            nullable: false,
            is_primary_key: false,
            ordinal,
        }
    }

    fn users_model(domain: &str) -> Model {
        Model {
            name: "users".into(),
            domain: domain.to_owned(),
            source_table: "users".into(),
            fields: vec![
                field("id", NeutralType::Int64, 0),
                field("is_active", NeutralType::Bool, 1),
            ],
        }
    }

    #[test]
    fn add_and_resolve_model() {
        let mut ir = ModelIr::new();
        ir.add_model(users_model("core")).unwrap();

        let target = Target {
            kind: TargetKind::Model,
            name: "users".into(),
            domain: "core".into(),
        };
        let entry = ir.resolve(&target).unwrap();
        assert_eq!(entry.name(), "users");
        assert_eq!(entry.field("is_active").unwrap().ty, NeutralType::Bool);
        assert!(entry.field("missing").is_none());
    }

    #[test]
    fn duplicate_name_in_domain_rejected() {
        let mut ir = ModelIr::new();
        ir.add_model(users_model("core")).unwrap();
        let err = ir.add_model(users_model("core")).unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
    }

    #[test]
    fn same_name_in_other_domain_allowed() {
        let mut ir = ModelIr::new();
        ir.add_model(users_model("core")).unwrap();
        ir.add_model(users_model("billing")).unwrap();
        assert_eq!(ir.len(), 2);
    }

    #[test]
    fn resolve_kind_mismatch_fails() {
        let mut ir = ModelIr::new();
        ir.add_model(users_model("core")).unwrap();
        let target = Target {
            kind: TargetKind::View,
            name: "users".into(),
            domain: "core".into(),
        };
        assert!(ir.resolve(&target).is_none());
    }

    #[test]
    fn merge_joins_domains() {
        let mut a = ModelIr::new();
        a.add_model(users_model("core")).unwrap();
        let mut b = ModelIr::new();
        b.add_model(users_model("billing")).unwrap();

        let merged = a.merge(b).unwrap();
        assert!(merged.model("core", "users").is_some());
        assert!(merged.model("billing", "users").is_some());
    }

    #[test]
    fn merge_detects_collisions() {
        let mut a = ModelIr::new();
        a.add_model(users_model("core")).unwrap();
        let mut b = ModelIr::new();
        b.add_model(users_model("core")).unwrap();
        assert!(matches!(a.merge(b), Err(SchemaError::Duplicate { .. })));
    }

    #[test]
    fn json_roundtrip_restores_domains() {
        let mut ir = ModelIr::new();
        ir.add_model(users_model("core")).unwrap();
        let json = ir.to_json().unwrap();
        let back = ModelIr::from_json(&json).unwrap();
        assert_eq!(back.model("core", "users").unwrap().domain, "core");
        assert_eq!(back, ir);
    }
}
