//! Deployment templates
//!
//! A template is a list of [`ResourceDefinition`]s plus the `variables` map
//! the provider substitutes into them. Cross-resource references stay
//! symbolic (`[variables('X')]`, `[resourceId(...)]`); the provider resolves
//! them at deployment time. [`DeploymentTemplate::validate`] guarantees that
//! every reference can be resolved before the template leaves the process.

use crate::error::TemplateError;
use crate::resources::ResourceProperties;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

pub const DEPLOYMENT_TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#";
pub const CONTENT_VERSION: &str = "1.0.0.0";

static VARIABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"variables\('([^']+)'\)").expect("valid regex"));

static RESOURCE_ID_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"resourceId\('([^']+)',\s*variables\('([^']+)'\)\)").expect("valid regex")
});

static REFERENCE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"reference\(variables\('([^']+)'\)").expect("valid regex"));

static NAME_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[variables\('([^']+)'\)\]$").expect("valid regex"));

static CONCAT_DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[concat\('([^']+)/',\s*variables\('([^']+)'\)\)\]$").expect("valid regex")
});

/// Symbolic expression builders
pub mod expr {
    /// `[variables('name')]`
    pub fn variable(name: &str) -> String {
        format!("[variables('{}')]", name)
    }

    /// `[resourceId('type',variables('name'))]`
    pub fn resource_id(resource_type: &str, variable: &str) -> String {
        format!("[resourceId('{}',variables('{}'))]", resource_type, variable)
    }

    /// `dependsOn` entry naming a resource by its type and name variable
    pub fn depends_on(resource_type: &str, variable: &str) -> String {
        format!("[concat('{}/', variables('{}'))]", resource_type, variable)
    }

    /// `[concat(...)]` over already-quoted or expression parts
    pub fn concat<S: AsRef<str>>(parts: &[S]) -> String {
        let parts: Vec<&str> = parts.iter().map(AsRef::as_ref).collect();
        format!("[concat({})]", parts.join(","))
    }

    /// Quote a literal for use inside an expression
    pub fn literal(value: &str) -> String {
        format!("'{}'", value)
    }

    /// Bare `variables('name')` for use inside an expression
    pub fn var(name: &str) -> String {
        format!("variables('{}')", name)
    }
}

/// One resource in a deployment template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    pub location: String,

    pub api_version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceProperties>,
}

impl ResourceDefinition {
    /// Create a resource whose type is taken from its properties payload
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        api_version: impl Into<String>,
        properties: ResourceProperties,
    ) -> Self {
        Self {
            name: name.into(),
            resource_type: properties.resource_type().to_string(),
            location: location.into(),
            api_version: api_version.into(),
            depends_on: Vec::new(),
            tags: BTreeMap::new(),
            properties: Some(properties),
        }
    }

    pub fn with_depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// `type/name` key, used to find a resource among its siblings
    pub fn key(&self) -> String {
        format!("{}/{}", self.resource_type, self.name)
    }

    /// `(type, variable)` pairs named by the `dependsOn` edges, or the
    /// first entry that is not in a recognised form
    fn dependency_targets(&self) -> Result<Vec<(String, String)>, String> {
        self.depends_on
            .iter()
            .map(|dep| {
                if let Some(caps) = CONCAT_DEPENDENCY.captures(dep) {
                    return Ok((caps[1].to_string(), caps[2].to_string()));
                }
                let trimmed = dep.trim_start_matches('[').trim_end_matches(']');
                match RESOURCE_ID_REF.captures(trimmed) {
                    Some(caps) if caps.get(0).map(|m| m.as_str()) == Some(trimmed) => {
                        Ok((caps[1].to_string(), caps[2].to_string()))
                    }
                    _ => Err(dep.clone()),
                }
            })
            .collect()
    }

    /// Every string in the resource outside of `dependsOn`
    fn strings(&self) -> Vec<String> {
        let mut out = vec![self.name.clone(), self.location.clone()];
        out.extend(self.tags.values().cloned());
        if let Some(properties) = &self.properties
            && let Ok(value) = serde_json::to_value(properties)
        {
            collect_strings(&value, &mut out);
        }
        out
    }

    fn property_strings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(properties) = &self.properties
            && let Ok(value) = serde_json::to_value(properties)
        {
            collect_strings(&value, &mut out);
        }
        out
    }
}

fn collect_strings(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

/// Variable names referenced by `s`
pub fn referenced_variables(s: &str) -> Vec<String> {
    VARIABLE_REF
        .captures_iter(s)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// `(type, variable)` pairs of every `resourceId(...)` in `s`
pub fn referenced_resource_ids(s: &str) -> Vec<(String, String)> {
    RESOURCE_ID_REF
        .captures_iter(s)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Variable names passed to `reference(...)` in `s`
pub fn referenced_resource_states(s: &str) -> Vec<String> {
    REFERENCE_REF
        .captures_iter(s)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// A complete deployment template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTemplate {
    #[serde(rename = "$schema")]
    pub schema: String,

    #[serde(rename = "contentVersion")]
    pub content_version: String,

    pub parameters: serde_json::Map<String, serde_json::Value>,

    pub variables: BTreeMap<String, String>,

    pub resources: Vec<ResourceDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<serde_json::Map<String, serde_json::Value>>,
}

impl DeploymentTemplate {
    /// Assemble a template and check that all of its references resolve
    pub fn assemble(
        resources: Vec<ResourceDefinition>,
        variables: BTreeMap<String, String>,
    ) -> Result<Self, TemplateError> {
        let template = Self {
            schema: DEPLOYMENT_TEMPLATE_SCHEMA.to_string(),
            content_version: CONTENT_VERSION.to_string(),
            parameters: serde_json::Map::new(),
            variables,
            resources,
            outputs: None,
        };
        template.validate()?;
        tracing::debug!(
            resources = template.resources.len(),
            variables = template.variables.len(),
            "Assembled deployment template"
        );
        Ok(template)
    }

    /// Referential-completeness check
    ///
    /// - every `variables('X')` in a resource or variable value names a declared variable
    /// - every `dependsOn` edge names a sibling resource by type and name
    /// - every sibling resource reachable from a resource's properties,
    ///   directly or through variables, is covered by a `dependsOn` edge
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut declared = HashSet::new();
        for resource in &self.resources {
            if !declared.insert(resource.key()) {
                return Err(TemplateError::DuplicateResource(resource.key()));
            }
            if let Some(properties) = &resource.properties
                && properties.resource_type() != resource.resource_type
            {
                return Err(TemplateError::PropertiesMismatch {
                    resource: resource.name.clone(),
                    declared: resource.resource_type.clone(),
                    actual: properties.resource_type().to_string(),
                });
            }
        }

        for (name, value) in &self.variables {
            if let Some(missing) = referenced_variables(value)
                .into_iter()
                .find(|v| !self.variables.contains_key(v))
            {
                return Err(TemplateError::UnresolvedNestedVariable {
                    variable: name.clone(),
                    missing,
                });
            }
        }

        let backed = self.resource_backed_variables();
        for resource in &self.resources {
            self.validate_resource(resource, &declared, &backed)?;
        }
        Ok(())
    }

    fn validate_resource(
        &self,
        resource: &ResourceDefinition,
        declared: &HashSet<String>,
        backed: &BTreeMap<String, String>,
    ) -> Result<(), TemplateError> {
        for s in resource.strings().iter().chain(resource.depends_on.iter()) {
            if let Some(variable) = referenced_variables(s)
                .into_iter()
                .find(|v| !self.variables.contains_key(v))
            {
                return Err(TemplateError::UnresolvedVariable {
                    resource: resource.name.clone(),
                    variable,
                });
            }
        }

        let targets = resource.dependency_targets().map_err(|dependency| {
            TemplateError::UnresolvedDependency {
                resource: resource.name.clone(),
                dependency,
            }
        })?;
        for (resource_type, variable) in &targets {
            let key = format!("{}/{}", resource_type, expr::variable(variable));
            if !declared.contains(&key) {
                return Err(TemplateError::UnresolvedDependency {
                    resource: resource.name.clone(),
                    dependency: expr::depends_on(resource_type, variable),
                });
            }
        }

        let own_variables: BTreeSet<String> = referenced_variables(&resource.name).into_iter().collect();
        let referenced = self
            .referenced_resources(resource, backed)
            .map_err(|variable| TemplateError::UnresolvedReference {
                resource: resource.name.clone(),
                variable,
            })?;
        for (resource_type, variable) in referenced {
            let is_self =
                resource_type == resource.resource_type && own_variables.contains(&variable);
            if is_self {
                continue;
            }
            if !targets
                .iter()
                .any(|(t, v)| *t == resource_type && *v == variable)
            {
                return Err(TemplateError::MissingDependsOn {
                    resource: resource.name.clone(),
                    target: expr::resource_id(&resource_type, &variable),
                });
            }
        }
        Ok(())
    }

    /// Name variable → type, for resources named `[variables('X')]`
    fn resource_backed_variables(&self) -> BTreeMap<String, String> {
        self.resources
            .iter()
            .filter_map(|r| {
                NAME_VARIABLE
                    .captures(&r.name)
                    .map(|caps| (caps[1].to_string(), r.resource_type.clone()))
            })
            .collect()
    }

    /// Sibling resources a resource's properties point at, following variables
    ///
    /// A resource is referenced through `resourceId(...)`, through
    /// `reference(variables('X'))`, or through any use of its name variable.
    /// A `reference(...)` to a variable that names no sibling is returned as
    /// the error.
    fn referenced_resources(
        &self,
        resource: &ResourceDefinition,
        backed: &BTreeMap<String, String>,
    ) -> Result<BTreeSet<(String, String)>, String> {
        let mut found = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut pending: Vec<String> = resource.property_strings();

        while let Some(s) = pending.pop() {
            found.extend(referenced_resource_ids(&s));
            for variable in referenced_resource_states(&s) {
                match backed.get(&variable) {
                    Some(resource_type) => {
                        found.insert((resource_type.clone(), variable));
                    }
                    None => return Err(variable),
                }
            }
            for variable in referenced_variables(&s) {
                if let Some(resource_type) = backed.get(&variable) {
                    found.insert((resource_type.clone(), variable.clone()));
                }
                if visited.insert(variable.clone())
                    && let Some(value) = self.variables.get(&variable)
                {
                    pending.push(value.clone());
                }
            }
        }
        Ok(found)
    }
}

/// How the provider applies a template to the resource group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentMode {
    /// Leave resources not in the template untouched
    #[default]
    Incremental,
    /// Delete resources not in the template
    Complete,
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Incremental => write!(f, "Incremental"),
            DeploymentMode::Complete => write!(f, "Complete"),
        }
    }
}

/// Request body for creating a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentBody {
    pub properties: DeploymentRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub template: DeploymentTemplate,
    pub mode: DeploymentMode,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl DeploymentBody {
    pub fn new(template: DeploymentTemplate, mode: DeploymentMode) -> Self {
        Self {
            properties: DeploymentRequest {
                template,
                mode,
                parameters: serde_json::Map::new(),
            },
        }
    }

    pub fn template(&self) -> &DeploymentTemplate {
        &self.properties.template
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
