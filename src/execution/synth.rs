//! Wrap a snippet into a single named entry point

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::template::{code_only, regions, Region};

/// Modules every synthesized unit imports
pub const BASELINE_IMPORTS: &[&str] = &["scene", "editor", "console"];

/// Result of a snippet that never returns explicitly
pub const DEFAULT_RESULT: &str = "Execution completed successfully";

/// Name of the entry point's only parameter
pub const CONTEXT_PARAM: &str = "parameters";

const ENTRY_PREFIX: &str = "mcp_invoke_";

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^import\s+"([^"]+)"\s+as\s+(\w+)\s*;$"#).expect("import pattern is valid")
});

static RETURN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\breturn\b").expect("return pattern is valid"));

/// Leading keyword of a body that cannot be an expression
static STATEMENT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(let|const|if|for|while|loop|do|fn|throw|import|switch)\b")
        .expect("statement pattern is valid")
});

/// An `import "<module>" as <alias>;` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub alias: String,
}

impl Import {
    pub fn new(module: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            alias: alias.into(),
        }
    }

    pub fn directive(&self) -> String {
        format!("import \"{}\" as {};", self.module, self.alias)
    }
}

/// How a snippet body produces its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Contains an explicit `return`
    Returns,
    /// A single bare expression
    Expression,
    /// Statements without a result
    Statements,
}

/// Synthesized source, ready for a backend
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Unique per invocation; never shown to callers
    pub entry_point: String,
    /// Merged imports, in emission order
    pub imports: Vec<Import>,
    pub source: String,
}

impl SourceUnit {
    /// 1-based line of the `index`th import in `source`
    pub fn import_line(&self, index: usize) -> usize {
        index + 2
    }
}

/// Separate leading import directives from the rest of the snippet
pub fn split_imports(snippet: &str) -> (Vec<Import>, String) {
    let trimmed = snippet.trim();
    let mut imports = Vec::new();
    let mut lines = trimmed.lines().peekable();

    while let Some(line) = lines.peek() {
        let line = line.trim();
        if line.is_empty() {
            lines.next();
            continue;
        }
        match IMPORT.captures(line) {
            Some(caps) => {
                imports.push(Import::new(&caps[1], &caps[2]));
                lines.next();
            }
            None => break,
        }
    }

    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (imports, body)
}

/// Decide how a body yields its result. Literals and comments are ignored.
pub fn classify(body: &str) -> BodyKind {
    let code = code_only(body);
    let code = code.trim();
    if RETURN.is_match(code) {
        BodyKind::Returns
    } else if !code.is_empty()
        && !code.contains(';')
        && !code.contains('{')
        && !STATEMENT_START.is_match(code)
    {
        BodyKind::Expression
    } else {
        BodyKind::Statements
    }
}

/// Baseline first, then caller imports not already present
pub fn merge_imports(baseline: &[&str], caller: Vec<Import>) -> Vec<Import> {
    let mut merged: Vec<Import> = baseline.iter().map(|m| Import::new(*m, *m)).collect();
    for import in caller {
        if !merged.contains(&import) {
            merged.push(import);
        }
    }
    merged
}

/// `;` for `body`, moved to its own line when a trailing comment would swallow it
fn terminator(body: &str) -> &'static str {
    match regions(body).last() {
        Some(Region::Comment) => "\n;",
        _ => ";",
    }
}

/// Build the unit for one invocation
pub fn synthesize(snippet: &str, baseline: &[&str]) -> SourceUnit {
    let (caller_imports, body) = split_imports(snippet);
    let imports = merge_imports(baseline, caller_imports);
    let entry_point = format!("{}{}", ENTRY_PREFIX, Uuid::new_v4().simple());

    let body = match classify(&body) {
        BodyKind::Returns => body,
        BodyKind::Expression => format!("return {}{}", body, terminator(&body)),
        BodyKind::Statements => {
            // Rhai accepts `;` after a block statement too
            let separator = if body.is_empty() || body.ends_with(';') {
                String::new()
            } else {
                terminator(&body).to_string()
            };
            format!("{}{}\nreturn \"{}\";", body, separator, DEFAULT_RESULT)
        }
    };

    let mut source = format!("fn {}({}) {{\n", entry_point, CONTEXT_PARAM);
    for import in &imports {
        source.push_str(&import.directive());
        source.push('\n');
    }
    source.push_str(&body);
    source.push_str("\n}\n");

    SourceUnit {
        entry_point,
        imports,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_leading_imports_only() {
        let (imports, body) = split_imports(
            "import \"fs\" as fs;\n\nimport \"tools\" as t;\nlet x = 1;\nimport \"late\" as l;",
        );
        assert_eq!(imports, vec![Import::new("fs", "fs"), Import::new("tools", "t")]);
        assert_eq!(body, "let x = 1;\nimport \"late\" as l;");
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify("return 1;"), BodyKind::Returns);
        assert_eq!(classify("scene::count()"), BodyKind::Expression);
        assert_eq!(classify("let a = 1; a"), BodyKind::Statements);
        assert_eq!(classify("if x { 1 } else { 2 }"), BodyKind::Statements);
        assert_eq!(classify(""), BodyKind::Statements);
        // identifiers containing the word do not count
        assert_eq!(classify("returned_value"), BodyKind::Expression);
    }

    #[test]
    fn test_statement_keywords_are_not_expressions() {
        for body in ["let a = 1", "const B = 2", "throw \"x\"", "while false {}", "fn f() {}"] {
            assert_eq!(classify(body), BodyKind::Statements, "{}", body);
        }
        assert_eq!(classify("letter"), BodyKind::Expression);
    }

    #[test]
    fn test_return_inside_literals_and_comments_is_ignored() {
        assert_eq!(
            classify("scene::create(\"return_pad\", \"Cube\", 0, 0, 0);"),
            BodyKind::Statements
        );
        assert_eq!(classify("let a = 1; // return a"), BodyKind::Statements);
        assert_eq!(classify("\"return to base\""), BodyKind::Expression);
        assert_eq!(classify("\"a;b\""), BodyKind::Expression);
    }

    #[test]
    fn test_merge_deduplicates() {
        let merged = merge_imports(
            &["scene", "console"],
            vec![Import::new("scene", "scene"), Import::new("scene", "s")],
        );
        assert_eq!(
            merged,
            vec![
                Import::new("scene", "scene"),
                Import::new("console", "console"),
                Import::new("scene", "s"),
            ]
        );
    }

    #[test]
    fn test_expression_is_wrapped() {
        let unit = synthesize("scene::count()", &["scene"]);
        assert!(unit.source.contains("return scene::count();"));
        assert!(unit.source.starts_with(&format!("fn {}(parameters) {{", unit.entry_point)));
    }

    #[test]
    fn test_statements_get_default_result() {
        let unit = synthesize("let a = 1", &[]);
        assert!(unit.source.contains("let a = 1;\nreturn \"Execution completed successfully\";"));

        let unit = synthesize("let a = 1;", &[]);
        assert!(unit.source.contains("let a = 1;\nreturn \"Execution completed successfully\";"));
    }

    #[test]
    fn test_trailing_brace_still_gets_separator() {
        let unit = synthesize("let m = #{a: 1}", &[]);
        assert!(unit.source.contains("let m = #{a: 1};\nreturn"));

        let unit = synthesize("let f = |x| { x }", &[]);
        assert!(unit.source.contains("let f = |x| { x };\nreturn"));

        let unit = synthesize("if true { 1 }", &[]);
        assert!(unit.source.contains("if true { 1 };\nreturn"));
    }

    #[test]
    fn test_trailing_comment_does_not_swallow_terminator() {
        let unit = synthesize("scene::count() // objects", &[]);
        assert!(unit.source.contains("return scene::count() // objects\n;"));

        let unit = synthesize("let a = 1 // one", &[]);
        assert!(unit.source.contains("let a = 1 // one\n;\nreturn"));
    }

    #[test]
    fn test_entry_points_are_unique() {
        let a = synthesize("1", &[]);
        let b = synthesize("1", &[]);
        assert_ne!(a.entry_point, b.entry_point);
        assert!(a.entry_point.starts_with("mcp_invoke_"));
    }

    #[test]
    fn test_import_lines() {
        let unit = synthesize("import \"fs\" as fs;\nfs::exists(\"/\")", &["scene"]);
        let lines: Vec<&str> = unit.source.lines().collect();
        assert_eq!(lines[unit.import_line(0) - 1], "import \"scene\" as scene;");
        assert_eq!(lines[unit.import_line(1) - 1], "import \"fs\" as fs;");
    }
}
