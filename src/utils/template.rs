//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const PLUGIN: &'static str = "plugin";
    pub const SOURCE_NAME: &'static str = "source_name";
    pub const BUILD_NAME: &'static str = "build_name";
    pub const PREVIOUS_BUILD_NAME: &'static str = "previous_build_name";
    pub const RELEASE_NAME: &'static str = "release_name";
    pub const INDEXER_ENV: &'static str = "indexer_env";
    pub const SNAPSHOT_ENV: &'static str = "snapshot_env";
    pub const PUBLISHER_ENV: &'static str = "publisher_env";

    pub const ALL: [&'static str; 8] = [
        Self::PLUGIN,
        Self::SOURCE_NAME,
        Self::BUILD_NAME,
        Self::PREVIOUS_BUILD_NAME,
        Self::RELEASE_NAME,
        Self::INDEXER_ENV,
        Self::SNAPSHOT_ENV,
        Self::PUBLISHER_ENV,
    ];
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Placeholders still present after rendering, e.g. a misspelled variable.
pub fn unresolved(rendered: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = rendered;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                found.push(after[..end].to_string());
                rest = &after[end + 2..];
            }
            None => break,
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render("{{a}}-{{b}}-{{a}}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x-y-x");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        assert_eq!(render("{{nope}}", &[("a", "x")]), "{{nope}}");
    }

    #[test]
    fn unresolved_lists_leftovers() {
        assert_eq!(unresolved("dump(src='{{sorce}}') {{x}}"), vec!["sorce", "x"]);
        assert!(unresolved("dump(src='pdb')").is_empty());
        assert!(unresolved("broken {{open").is_empty());
    }
}
