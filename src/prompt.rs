use crate::env::Environment;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"))
}

/// Replaces every `$NAME` in a prompt template with the variable's current value.
pub fn render(template: &str, env: &Environment) -> String {
    variable_pattern()
        .replace_all(template, |caps: &Captures| env.get(&caps[1]).to_string())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_variables() {
        let mut env = Environment::default();
        env.set("NAME", "turtle").unwrap();
        assert_eq!(render("[$NAME]> ", &env), "[turtle]> ");
    }

    #[test]
    fn unknown_variables_become_empty() {
        let env = Environment::default();
        assert_eq!(render("a$NOPE_NOT_SET b", &env), "a b");
    }

    #[test]
    fn computed_variables_are_live() {
        let env = Environment::default();
        let rendered = render("$OS $ ", &env);
        assert_eq!(rendered, format!("{} $ ", std::env::consts::OS));
    }
}
