/// Substitute `${VAR}` placeholders in raw config text with environment
/// values. Unknown variables are left untouched so the parse error (if any)
/// points at the original placeholder.
pub fn substitute_env(raw: &str) -> String {
    substitute_with(raw, |name| std::env::var(name).ok())
}

/// Placeholder substitution with an injectable lookup.
pub fn substitute_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + end];
        out.push_str(&rest[..start]);
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..=start + end]),
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        (name == "SECRET").then(|| "hunter2".to_string())
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_with("api_key = \"${SECRET}\"", lookup),
            "api_key = \"hunter2\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(substitute_with("${NOPE}", lookup), "${NOPE}");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_with("plain text", lookup), "plain text");
    }

    #[test]
    fn unterminated_placeholder_left_alone() {
        assert_eq!(substitute_with("x = ${SECRET", lookup), "x = ${SECRET");
    }
}
