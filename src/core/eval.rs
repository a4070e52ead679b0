//! Variable evaluation for configuration bodies.
//!
//! String values may reference variables as `${var.NAME}`. A string made of
//! exactly one reference takes the variable's native type, so
//! `count = "${var.workers}"` decodes as an integer. References embedded in
//! longer strings are replaced by the scalar's text form. `$${` renders a
//! literal `${`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use toml::Value;

use crate::util::diagnostic::{Diagnostic, Diagnostics};

static WHOLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{\s*var\.([A-Za-z_][A-Za-z0-9_-]*)\s*\}$").expect("pattern is valid")
});

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$\{|\$\{([^}]*)\}").expect("pattern is valid"));

static VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("pattern is valid"));

/// Named variables available to configuration bodies.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    variables: BTreeMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext::default()
    }

    /// Builder-style variant of [`EvalContext::set`].
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Define or override a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Override variables with every entry of `table`.
    pub fn merge_table(&mut self, table: &toml::Table) {
        for (name, value) in table {
            self.variables.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Evaluate every string inside `value`.
    ///
    /// All unresolvable references are reported, not just the first.
    pub fn evaluate(&self, value: &Value) -> Result<Value, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let evaluated = self.evaluate_value(value, "", &mut diagnostics);

        if diagnostics.has_errors() {
            Err(diagnostics)
        } else {
            Ok(evaluated)
        }
    }

    fn evaluate_value(&self, value: &Value, path: &str, diags: &mut Diagnostics) -> Value {
        match value {
            Value::String(s) => self.evaluate_string(s, path, diags),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.evaluate_value(item, &format!("{}[{}]", path, i), diags)
                    })
                    .collect(),
            ),
            Value::Table(table) => Value::Table(
                table
                    .iter()
                    .map(|(key, item)| {
                        let child = if path.is_empty() {
                            key.clone()
                        } else {
                            format!("{}.{}", path, key)
                        };
                        (key.clone(), self.evaluate_value(item, &child, diags))
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn evaluate_string(&self, s: &str, path: &str, diags: &mut Diagnostics) -> Value {
        if let Some(caps) = WHOLE_REFERENCE.captures(s) {
            let name = &caps[1];
            return match self.variables.get(name) {
                Some(value) => value.clone(),
                None => {
                    diags.push(unknown_variable(name, path));
                    Value::String(s.to_string())
                }
            };
        }

        let mut output = String::with_capacity(s.len());
        let mut last = 0;

        for caps in REFERENCE.captures_iter(s) {
            let Some(m) = caps.get(0) else { continue };
            output.push_str(&s[last..m.start()]);
            last = m.end();

            if m.as_str() == "$${" {
                output.push_str("${");
                continue;
            }

            let expression = caps.get(1).map(|e| e.as_str().trim()).unwrap_or_default();
            let name = match expression.strip_prefix("var.") {
                Some(name) if VARIABLE_NAME.is_match(name) => name,
                _ => {
                    diags.push(
                        Diagnostic::error("Unsupported expression")
                            .with_detail(format!(
                                "`${{{}}}` is not a variable reference; only `${{var.NAME}}` is supported",
                                expression
                            ))
                            .with_subject(path),
                    );
                    continue;
                }
            };

            match self.variables.get(name) {
                Some(value) => match scalar_text(value) {
                    Some(text) => output.push_str(&text),
                    None => diags.push(
                        Diagnostic::error("Invalid template interpolation value")
                            .with_detail(format!(
                                "variable `{}` is a {}, which cannot be embedded in a string",
                                name,
                                value.type_str()
                            ))
                            .with_subject(path),
                    ),
                },
                None => diags.push(unknown_variable(name, path)),
            }
        }

        output.push_str(&s[last..]);
        Value::String(output)
    }
}

fn unknown_variable(name: &str, path: &str) -> Diagnostic {
    Diagnostic::error("Unknown variable")
        .with_detail(format!("There is no variable named `{}`", name))
        .with_subject(path)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(src: &str) -> Value {
        Value::Table(toml::from_str(src).unwrap())
    }

    #[test]
    fn test_whole_reference_keeps_type() {
        let ctx = EvalContext::new()
            .with_variable("workers", 3)
            .with_variable("keys", vec!["ssh-ed25519 AAAA"]);

        let out = ctx
            .evaluate(&body("count = \"${var.workers}\"\nssh_pubkeys = \"${ var.keys }\""))
            .unwrap();

        assert_eq!(out["count"], Value::Integer(3));
        assert_eq!(
            out["ssh_pubkeys"],
            Value::Array(vec![Value::String("ssh-ed25519 AAAA".into())])
        );
    }

    #[test]
    fn test_embedded_reference_and_escape() {
        let ctx = EvalContext::new().with_variable("name", "demo");

        let out = ctx
            .evaluate(&body(r#"asset_dir = "~/clusters/${var.name}/$${literal}""#))
            .unwrap();

        assert_eq!(
            out["asset_dir"],
            Value::String("~/clusters/demo/${literal}".into())
        );
    }

    #[test]
    fn test_all_unknown_variables_are_reported() {
        let ctx = EvalContext::new();

        let diags = ctx
            .evaluate(&body(
                "cluster_name = \"${var.missing}\"\n[[worker_pool]]\nname = \"pool-${var.other}\"",
            ))
            .unwrap_err();

        assert_eq!(diags.error_count(), 2);
        let subjects: Vec<_> = diags.iter().filter_map(|d| d.subject.clone()).collect();
        assert_eq!(subjects, vec!["cluster_name", "worker_pool[0].name"]);
    }

    #[test]
    fn test_non_scalar_cannot_be_embedded() {
        let ctx = EvalContext::new().with_variable("keys", vec!["a", "b"]);

        let diags = ctx
            .evaluate(&body(r#"note = "keys: ${var.keys}""#))
            .unwrap_err();

        assert_eq!(diags.error_count(), 1);
        assert!(diags.iter().next().unwrap().summary.contains("interpolation"));
    }

    #[test]
    fn test_unsupported_expression() {
        let diags = EvalContext::new()
            .evaluate(&body(r#"region = "${env.REGION}""#))
            .unwrap_err();

        assert_eq!(diags.iter().next().unwrap().summary, "Unsupported expression");
    }

    #[test]
    fn test_merge_table_overrides() {
        let mut ctx = EvalContext::new().with_variable("region", "eu-central-1");
        ctx.merge_table(&toml::from_str("region = \"us-east-1\"").unwrap());

        assert_eq!(ctx.get("region"), Some(&Value::String("us-east-1".into())));
    }
}
