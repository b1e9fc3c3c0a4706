//! Go-template interpolation backed by `gtmpl`.
//!
//! Before rendering, every top-level field reference (`{{.Name}}`) is checked
//! against the context so that an undefined placeholder is always an error
//! rather than an empty substitution.

use gtmpl_value::Value;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use std::collections::{BTreeMap, HashMap};

/// Interpolation context: placeholder name to value.
pub type TemplateContext = BTreeMap<String, String>;

/// Render `template` against `context`.
///
/// # Errors
///
/// [`ProvisionError::Template`] on an undefined placeholder or a malformed
/// template.
pub fn render(template: &str, context: &TemplateContext) -> ProvisionResult<String> {
    for name in referenced_fields(template)? {
        if !context.contains_key(&name) {
            return Err(ProvisionError::Template(format!(
                "undefined placeholder '.{}' in template '{}'",
                name, template
            )));
        }
    }

    if !template.contains("{{") {
        return Ok(template.to_string());
    }

    let object: HashMap<String, Value> = context
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v.clone())))
        .collect();

    gtmpl::template(template, Value::Object(object))
        .map_err(|e| ProvisionError::Template(format!("{}: {}", template, e)))
}

/// Names of the top-level fields referenced by the template's actions.
fn referenced_fields(template: &str) -> ProvisionResult<Vec<String>> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            ProvisionError::Template(format!("unclosed action in template '{}'", template))
        })?;
        let action = after[..end].trim_matches(|c: char| c == '-' || c.is_whitespace());
        if !action.starts_with("/*") {
            collect_fields(action, &mut names);
        }
        rest = &after[end + 2..];
    }

    Ok(names)
}

fn collect_fields(action: &str, names: &mut Vec<String>) {
    let chars: Vec<char> = action.chars().collect();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == '\\' && q == '"' {
                i += 1;
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '`' => quote = Some(c),
            '.' => {
                let chained = i > 0
                    && (chars[i - 1].is_alphanumeric()
                        || matches!(chars[i - 1], '_' | ')' | '$'));
                if !chained {
                    let ident: String = chars[i + 1..]
                        .iter()
                        .take_while(|c| c.is_alphanumeric() || **c == '_')
                        .collect();
                    if !ident.is_empty() && !ident.starts_with(|c: char| c.is_ascii_digit()) {
                        i += ident.chars().count();
                        names.push(ident);
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> TemplateContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_path_and_vars() {
        let ctx = context(&[("Path", "/tmp/a.ps1"), ("Vars", "/tmp/v.ps1")]);
        let out = render(". '{{.Vars}}'; & '{{ .Path }}'", &ctx).unwrap();
        assert_eq!(out, ". '/tmp/v.ps1'; & '/tmp/a.ps1'");
    }

    #[test]
    fn test_undefined_placeholder_is_error() {
        let ctx = context(&[("Path", "/tmp/a.ps1")]);
        let err = render("run {{.Missing}}", &ctx).unwrap_err();
        assert!(matches!(err, ProvisionError::Template(ref m) if m.contains("Missing")));
    }

    #[test]
    fn test_unclosed_action_is_error() {
        let ctx = context(&[("Path", "/tmp/a.ps1")]);
        assert!(matches!(
            render("run {{.Path", &ctx),
            Err(ProvisionError::Template(_))
        ));
    }

    #[test]
    fn test_plain_text_passes_through() {
        let cmd = r#"FOR /F "tokens=* USEBACKQ" %F IN (`where pwsh`) DO ("%F" -Command "if ($x) { exit 1; }")"#;
        assert_eq!(render(cmd, &TemplateContext::new()).unwrap(), cmd);
    }

    #[test]
    fn test_braces_outside_actions_are_literal() {
        let ctx = context(&[("Path", "C:/Windows/Temp/s.ps1")]);
        let out = render("if (1) { & '{{.Path}}'; }", &ctx).unwrap();
        assert_eq!(out, "if (1) { & 'C:/Windows/Temp/s.ps1'; }");
    }

    #[test]
    fn test_referenced_fields() {
        let fields = referenced_fields(r#"{{.A}} {{- .B -}} {{ "x.Y" }} {{/* .C */}} {{$v.D}}"#)
            .unwrap();
        assert_eq!(fields, vec!["A".to_string(), "B".to_string()]);
    }
}
