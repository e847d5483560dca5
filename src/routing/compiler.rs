//! Path template compilation.
//!
//! # Responsibilities
//! - Turn `/pets/{petId}` style templates into anchored patterns
//! - Reject malformed templates before they reach the route table
//!
//! # Design Decisions
//! - `{name}` binds exactly one non-empty segment (no `/`)
//! - `{name+}` binds the rest of the path and must be the last segment
//! - Everything else is literal; the candidate must match end to end
//! - Trailing slashes are the caller's business (see router.rs)

use regex::Regex;

/// Template compilation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path template {template:?}: {reason}")]
pub struct TemplateError {
    pub template: String,
    pub reason: String,
}

impl TemplateError {
    fn new(template: &str, reason: impl Into<String>) -> Self {
        Self {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

/// A path template compiled into a matchable pattern.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    template: String,
    pattern: Regex,
    params: Vec<String>,
}

impl CompiledTemplate {
    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The anchored regular expression.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Placeholder names in template order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns true if `path` matches the whole template.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// Bind placeholder values for a matching `path`.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.pattern.captures(path)?;
        Some(
            self.params
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, value)| value.map(|v| (name.clone(), v.as_str().to_string())))
                .collect(),
        )
    }
}

struct Placeholder<'a> {
    name: &'a str,
    greedy: bool,
}

fn placeholder(segment: &str) -> Option<Placeholder<'_>> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    Some(match inner.strip_suffix('+') {
        Some(name) => Placeholder { name, greedy: true },
        None => Placeholder { name: inner, greedy: false },
    })
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Compile a path template.
pub fn compile(template: &str) -> Result<CompiledTemplate, TemplateError> {
    let rest = template
        .strip_prefix('/')
        .ok_or_else(|| TemplateError::new(template, "must start with '/'"))?;

    let segments: Vec<&str> = rest.split('/').collect();
    let mut pattern = String::with_capacity(template.len() * 2);
    let mut params: Vec<String> = Vec::new();
    pattern.push('^');

    for (index, segment) in segments.iter().enumerate() {
        pattern.push('/');

        match placeholder(segment) {
            Some(Placeholder { name, greedy }) => {
                if !valid_name(name) {
                    return Err(TemplateError::new(
                        template,
                        format!("bad placeholder name in segment {segment:?}"),
                    ));
                }
                if greedy && index + 1 != segments.len() {
                    return Err(TemplateError::new(
                        template,
                        format!("greedy placeholder {segment:?} must be the last segment"),
                    ));
                }
                if params.iter().any(|p| p == name) {
                    return Err(TemplateError::new(
                        template,
                        format!("placeholder {name:?} used more than once"),
                    ));
                }
                pattern.push_str(if greedy { "(.+)" } else { "([^/]+)" });
                params.push(name.to_string());
            }
            None if segment.contains(['{', '}']) => {
                return Err(TemplateError::new(
                    template,
                    format!("braces must wrap a whole segment, got {segment:?}"),
                ));
            }
            None => pattern.push_str(&regex::escape(segment)),
        }
    }

    pattern.push('$');

    let pattern = Regex::new(&pattern).map_err(|e| TemplateError::new(template, e.to_string()))?;

    Ok(CompiledTemplate {
        template: template.to_string(),
        pattern,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_matches_single_segment() {
        let compiled = compile("/pets/{petId}").unwrap();

        assert!(compiled.matches("/pets/42"));
        assert!(compiled.matches("/pets/abc"));
        assert!(compiled.matches("/pets/with%20space"));

        assert!(!compiled.matches("/pets/"));
        assert!(!compiled.matches("/pets"));
        assert!(!compiled.matches("/pets/42/toys"));
        assert!(!compiled.matches("/api/pets/42"));
    }

    #[test]
    fn literal_segments_are_escaped() {
        let compiled = compile("/v1.0/items+new").unwrap();

        assert!(compiled.matches("/v1.0/items+new"));
        assert!(!compiled.matches("/v1x0/items+new"));
        assert!(!compiled.matches("/v1.0/itemsssnew"));
    }

    #[test]
    fn root_matches_only_root() {
        let compiled = compile("/").unwrap();
        assert!(compiled.matches("/"));
        assert!(!compiled.matches("/a"));
        assert!(!compiled.matches(""));
    }

    #[test]
    fn captures_bind_in_order() {
        let compiled = compile("/users/{userId}/orders/{order-id}").unwrap();
        assert_eq!(compiled.params(), ["userId", "order-id"]);

        let caps = compiled.captures("/users/7/orders/x9").unwrap();
        assert_eq!(
            caps,
            vec![
                ("userId".to_string(), "7".to_string()),
                ("order-id".to_string(), "x9".to_string()),
            ]
        );
        assert!(compiled.captures("/users/7").is_none());
    }

    #[test]
    fn greedy_param_spans_segments() {
        let compiled = compile("/files/{proxy+}").unwrap();
        assert!(compiled.matches("/files/a"));
        assert!(compiled.matches("/files/a/b/c"));
        assert!(!compiled.matches("/files/"));
        assert_eq!(
            compiled.captures("/files/a/b").unwrap(),
            vec![("proxy".to_string(), "a/b".to_string())]
        );
    }

    #[test]
    fn malformed_templates_rejected() {
        for template in [
            "pets",
            "/pets/{}",
            "/pets/{id",
            "/pets/id}",
            "/pets/x{id}",
            "/pets/{a b}",
            "/{proxy+}/tail",
            "/{id}/{id}",
        ] {
            assert!(compile(template).is_err(), "{template} should be rejected");
        }
    }

    #[test]
    fn error_names_template() {
        let err = compile("/pets/{}").unwrap_err();
        assert_eq!(err.template, "/pets/{}");
        assert!(err.to_string().contains("/pets/{}"));
    }
}
