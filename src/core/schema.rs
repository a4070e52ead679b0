//! Schema-checked decoding of configuration bodies.
//!
//! Serde stops at the first problem it meets. Operators want every missing
//! or misspelled attribute at once, so bodies are first checked against a
//! declared [`BodySchema`] that accumulates diagnostics, and only a body that
//! passes is handed to serde for the typed decode.

use serde::de::DeserializeOwned;
use toml::Value;

use crate::core::eval::EvalContext;
use crate::util::diagnostic::{Diagnostic, Diagnostics};

/// A declared attribute of a body.
#[derive(Debug, Clone, Copy)]
pub struct Attribute {
    pub name: &'static str,
    pub required: bool,
}

impl Attribute {
    pub const fn required(name: &'static str) -> Self {
        Attribute {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Attribute {
            name,
            required: false,
        }
    }
}

/// A declared nested block type. Zero or more instances may appear.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    pub name: &'static str,
    pub schema: &'static BodySchema,
}

/// The attributes and nested blocks a body may contain.
#[derive(Debug, Clone, Copy)]
pub struct BodySchema {
    pub attributes: &'static [Attribute],
    pub blocks: &'static [Block],
}

impl BodySchema {
    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Check `body` against this schema, appending findings to `diags`.
    ///
    /// Single-table blocks are normalized into one-element arrays in place so
    /// the typed decode sees a uniform shape.
    fn check(&self, body: &mut toml::Table, path: &str, diags: &mut Diagnostics) {
        for attribute in self.attributes.iter().filter(|a| a.required) {
            match body.get(attribute.name) {
                None => diags.push(
                    Diagnostic::error("Missing required argument")
                        .with_detail(format!(
                            "The argument `{}` is required, but no definition was found.",
                            attribute.name
                        ))
                        .with_subject(join(path, attribute.name)),
                ),
                Some(value) if is_empty(value) => diags.push(
                    Diagnostic::error("Invalid value")
                        .with_detail(format!(
                            "The argument `{}` is required and must not be empty.",
                            attribute.name
                        ))
                        .with_subject(join(path, attribute.name)),
                ),
                Some(_) => {}
            }
        }

        for (key, value) in body.iter_mut() {
            if self.attribute(key).is_some() {
                continue;
            }

            let Some(block) = self.block(key) else {
                diags.push(
                    Diagnostic::error("Unsupported argument")
                        .with_detail(format!(
                            "An argument named `{}` is not expected here.",
                            key
                        ))
                        .with_subject(join(path, key)),
                );
                continue;
            };

            if let Value::Table(table) = value {
                *value = Value::Array(vec![Value::Table(std::mem::take(table))]);
            }

            match value {
                Value::Array(items) => {
                    for (i, item) in items.iter_mut().enumerate() {
                        let item_path = format!("{}[{}]", join(path, key), i);
                        match item {
                            Value::Table(table) => block.schema.check(table, &item_path, diags),
                            _ => diags.push(invalid_block(key, &item_path)),
                        }
                    }
                }
                _ => diags.push(invalid_block(key, &join(path, key))),
            }
        }
    }
}

fn invalid_block(name: &str, subject: &str) -> Diagnostic {
    Diagnostic::error("Invalid block")
        .with_detail(format!("`{}` must be a table or an array of tables.", name))
        .with_subject(subject)
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Decode an optional configuration body.
///
/// Returns `Ok(None)` when the body is absent: callers keep their
/// constructed defaults. Otherwise the body is evaluated, schema-checked and
/// decoded; any error-severity finding aborts with the full list.
pub fn decode_body<T>(
    body: Option<&Value>,
    ctx: &EvalContext,
    schema: &BodySchema,
) -> Result<Option<T>, Diagnostics>
where
    T: DeserializeOwned,
{
    let Some(body) = body else {
        tracing::debug!("configuration body absent, keeping defaults");
        return Ok(None);
    };

    let evaluated = ctx.evaluate(body)?;
    let Value::Table(mut table) = evaluated else {
        return Err(Diagnostic::error("Invalid configuration body")
            .with_detail(format!(
                "expected a table of attributes, found a {}",
                body.type_str()
            ))
            .into());
    };

    let mut diags = Diagnostics::new();
    schema.check(&mut table, "", &mut diags);
    if diags.has_errors() {
        return Err(diags);
    }

    T::deserialize(Value::Table(table))
        .map(Some)
        .map_err(|e| {
            Diagnostic::error("Incorrect attribute value type")
                .with_detail(e.message().trim().to_string())
                .into()
        })
}

/// Decode `body` over `target`, returning the decode diagnostics.
///
/// `target` is replaced only when decoding succeeds.
pub fn decode_into<T>(
    target: &mut T,
    body: Option<&Value>,
    ctx: &EvalContext,
    schema: &BodySchema,
) -> Diagnostics
where
    T: DeserializeOwned,
{
    match decode_body(body, ctx, schema) {
        Ok(Some(decoded)) => {
            *target = decoded;
            Diagnostics::new()
        }
        Ok(None) => Diagnostics::new(),
        Err(diags) => diags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    static POOL: BodySchema = BodySchema {
        attributes: &[Attribute::required("name"), Attribute::required("count")],
        blocks: &[],
    };

    static CLUSTER: BodySchema = BodySchema {
        attributes: &[
            Attribute::required("cluster_name"),
            Attribute::required("ssh_pubkeys"),
            Attribute::optional("region"),
        ],
        blocks: &[Block {
            name: "worker_pool",
            schema: &POOL,
        }],
    };

    #[derive(Debug, Deserialize)]
    #[serde(default)]
    struct Cluster {
        cluster_name: String,
        ssh_pubkeys: Vec<String>,
        region: String,
        worker_pool: Vec<Pool>,
    }

    impl Default for Cluster {
        fn default() -> Self {
            Cluster {
                cluster_name: String::new(),
                ssh_pubkeys: Vec::new(),
                region: "eu-central-1".to_string(),
                worker_pool: Vec::new(),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    struct Pool {
        name: String,
        count: u32,
    }

    fn body(src: &str) -> Value {
        Value::Table(toml::from_str(src).unwrap())
    }

    #[test]
    fn test_absent_body_keeps_defaults() {
        let decoded: Option<Cluster> =
            decode_body(None, &EvalContext::new(), &CLUSTER).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_applies_defaults() {
        let cluster: Cluster = decode_body(
            Some(&body(
                "cluster_name = \"demo\"\nssh_pubkeys = [\"k\"]\n[[worker_pool]]\nname = \"a\"\ncount = 2",
            )),
            &EvalContext::new(),
            &CLUSTER,
        )
        .unwrap()
        .unwrap();

        assert_eq!(cluster.cluster_name, "demo");
        assert_eq!(cluster.region, "eu-central-1");
        assert_eq!(cluster.worker_pool.len(), 1);
        assert_eq!(cluster.worker_pool[0].name, "a");
        assert_eq!(cluster.worker_pool[0].count, 2);
    }

    #[test]
    fn test_single_table_block_is_normalized() {
        let cluster: Cluster = decode_body(
            Some(&body(
                "cluster_name = \"demo\"\nssh_pubkeys = [\"k\"]\n[worker_pool]\nname = \"a\"\ncount = 1",
            )),
            &EvalContext::new(),
            &CLUSTER,
        )
        .unwrap()
        .unwrap();

        assert_eq!(cluster.worker_pool.len(), 1);
    }

    #[test]
    fn test_all_schema_problems_reported() {
        let diags = decode_body::<Cluster>(
            Some(&body(
                "ssh_pubkeys = []\nregoin = \"x\"\n[[worker_pool]]\nname = \"a\"",
            )),
            &EvalContext::new(),
            &CLUSTER,
        )
        .unwrap_err();

        let found: Vec<_> = diags
            .iter()
            .map(|d| (d.summary.as_str(), d.subject.clone().unwrap_or_default()))
            .collect();

        assert_eq!(
            found,
            vec![
                ("Missing required argument", "cluster_name".to_string()),
                ("Invalid value", "ssh_pubkeys".to_string()),
                ("Unsupported argument", "regoin".to_string()),
                ("Missing required argument", "worker_pool[0].count".to_string()),
            ]
        );
    }

    #[test]
    fn test_type_mismatch_is_a_diagnostic() {
        let diags = decode_body::<Cluster>(
            Some(&body(
                "cluster_name = \"demo\"\nssh_pubkeys = [\"k\"]\n[[worker_pool]]\nname = \"a\"\ncount = \"two\"",
            )),
            &EvalContext::new(),
            &CLUSTER,
        )
        .unwrap_err();

        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().unwrap().summary,
            "Incorrect attribute value type"
        );
    }

    #[test]
    fn test_variables_are_evaluated_before_checks() {
        let ctx = EvalContext::new().with_variable("name", "");
        let diags = decode_body::<Cluster>(
            Some(&body("cluster_name = \"${var.name}\"\nssh_pubkeys = [\"k\"]")),
            &ctx,
            &CLUSTER,
        )
        .unwrap_err();

        assert_eq!(diags.iter().next().unwrap().summary, "Invalid value");
    }
}
