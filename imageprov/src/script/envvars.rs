//! Environment variable file staged on the target.
//!
//! Each variable becomes one line produced from a printf-style format with
//! two `%s` slots: the key, then the PowerShell-escaped value. Templates
//! dot-source the uploaded file through `{{.Vars}}`.

use super::source::write_inline_script;
use crate::types::EnvVar;
use imageprov_shared::errors::ProvisionResult;
use tempfile::TempPath;

/// Escape a value for a double-quoted PowerShell string.
pub fn escape_pwsh(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '`' | '"' | '$' => {
                escaped.push('`');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Substitute `key` and `value` into the first two `%s` slots of `format`.
///
/// `%%` yields a literal `%`. Missing slots are left empty.
pub fn format_env_var(format: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(format.len() + key.len() + value.len());
    let mut args = [key, value].into_iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                out.push_str(args.next().unwrap_or_default());
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }
    out
}

/// Render the file lines for `vars` (already sorted by key).
pub fn render_env_lines(format: &str, vars: &[EnvVar]) -> Vec<String> {
    vars.iter()
        .map(|var| format_env_var(format, &var.key, &escape_pwsh(&var.value)))
        .collect()
}

/// Materialize the environment variable file as a temporary script.
pub fn write_env_file(format: &str, vars: &[EnvVar]) -> ProvisionResult<TempPath> {
    write_inline_script(&render_env_lines(format, vars))
}
