//! Template - Synthesize a stack into a CloudFormation template
//!
//! Model attribute names are snake_case. Top-level attributes are renamed to
//! the schema's provider name (falling back to PascalCase); nested map keys
//! are written as given, so nested structures are declared in template casing.

use heck::ToPascalCase;
use log::debug;
use serde_json::{Map, Value as Json, json};

use crate::provider::Provider;
use crate::resource::{REF_ATTRIBUTE, Value};
use crate::stack::{Environment, Stack, StackError};

/// Template format version understood by the engine
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Synthesis error
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("Stack '{stack}' is invalid:\n{}", format_errors(errors))]
    Invalid {
        stack: String,
        errors: Vec<StackError>,
    },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_errors(errors: &[StackError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A stack rendered as a template, ready to hand to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedStack {
    pub name: String,
    pub env: Environment,
    pub template: Json,
}

impl SynthesizedStack {
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.name)
    }

    /// Pretty-printed template with a trailing newline
    pub fn to_json_pretty(&self) -> Result<String, SynthError> {
        let mut text = serde_json::to_string_pretty(&self.template)?;
        text.push('\n');
        Ok(text)
    }

    /// Logical IDs of all resources of a template type (e.g. "AWS::EC2::Instance")
    pub fn logical_ids_of_type(&self, template_type: &str) -> Vec<&str> {
        self.template["Resources"]
            .as_object()
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, r)| r["Type"] == template_type)
                    .map(|(id, _)| id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Validate and render a stack
pub fn synthesize(stack: &Stack, provider: &dyn Provider) -> Result<SynthesizedStack, SynthError> {
    stack.validate(provider).map_err(|errors| SynthError::Invalid {
        stack: stack.name().to_string(),
        errors,
    })?;

    let mut resources = Map::new();
    for resource in stack.resources() {
        // validate() has already rejected unknown types
        let Some(resource_type) = provider.resource_type(&resource.id.resource_type) else {
            continue;
        };
        let schema = resource_type.schema();

        let mut keys: Vec<_> = resource.attributes.keys().collect();
        keys.sort();

        let mut properties = Map::new();
        for key in keys {
            let value = &resource.attributes[key];
            let property = schema
                .provider_name(key)
                .map(str::to_string)
                .unwrap_or_else(|| key.to_pascal_case());

            let rendered = if key == "tags" && resource_type.has_tags() {
                render_tags(value)
            } else {
                render_value(value)
            };
            properties.insert(property, rendered);
        }

        let mut body = Map::new();
        body.insert("Type".to_string(), json!(resource_type.template_type()));
        if !resource.depends_on.is_empty() {
            body.insert("DependsOn".to_string(), json!(resource.depends_on));
        }
        if !properties.is_empty() {
            body.insert("Properties".to_string(), Json::Object(properties));
        }
        resources.insert(resource.id.name.clone(), Json::Object(body));
    }

    let mut outputs = Map::new();
    for output in stack.outputs() {
        outputs.insert(
            output.name.clone(),
            json!({
                "Description": output.description,
                "Value": render_value(&output.value),
            }),
        );
    }

    let mut template = Map::new();
    template.insert(
        "AWSTemplateFormatVersion".to_string(),
        json!(TEMPLATE_FORMAT_VERSION),
    );
    if let Some(description) = stack.description() {
        template.insert("Description".to_string(), json!(description));
    }
    template.insert("Resources".to_string(), Json::Object(resources));
    if !outputs.is_empty() {
        template.insert("Outputs".to_string(), Json::Object(outputs));
    }

    debug!(
        "synthesized {} ({} resources, {} outputs)",
        stack.name(),
        stack.resources().len(),
        stack.outputs().len()
    );

    Ok(SynthesizedStack {
        name: stack.name().to_string(),
        env: stack.env().clone(),
        template: Json::Object(template),
    })
}

/// Render a model value as template JSON
pub fn render_value(value: &Value) -> Json {
    match value {
        Value::String(s) => json!(s),
        Value::Int(n) => json!(n),
        Value::Bool(b) => json!(b),
        Value::List(items) => Json::Array(items.iter().map(render_value).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v)))
                .collect(),
        ),
        Value::ResourceRef(target, attribute) if attribute == REF_ATTRIBUTE => {
            json!({ "Ref": target })
        }
        Value::ResourceRef(target, attribute) => json!({ "Fn::GetAtt": [target, attribute] }),
        Value::Join { delimiter, parts } => {
            let parts: Vec<Json> = parts.iter().map(render_value).collect();
            json!({ "Fn::Join": [delimiter, parts] })
        }
        Value::Base64(inner) => json!({ "Fn::Base64": render_value(inner) }),
    }
}

/// Tag maps become a Key/Value list sorted by key
fn render_tags(value: &Value) -> Json {
    match value {
        Value::Map(tags) => {
            let mut keys: Vec<_> = tags.keys().collect();
            keys.sort();
            Json::Array(
                keys.into_iter()
                    .map(|k| json!({ "Key": k, "Value": render_value(&tags[k]) }))
                    .collect(),
            )
        }
        other => render_value(other),
    }
}
