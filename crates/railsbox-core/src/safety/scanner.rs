//! Forbidden-construct rule engine.
//!
//! Evaluates script text against an ordered set of compiled regex rules and
//! reports the first one that matches. Rules are grouped by category and the
//! categories are checked in [`ConstructCategory::ALL`] order.

use regex::Regex;
use tracing::debug;

use super::ConstructCategory;
use crate::error::SecurityError;

/// A compiled forbidden-construct rule.
pub struct ForbiddenConstruct {
    /// Category reported on match.
    pub category: ConstructCategory,
    /// Short description of what the rule catches.
    pub description: String,
    pattern: Regex,
}

/// The first rule that matched a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenMatch {
    /// Category of the matching rule.
    pub category: ConstructCategory,
    /// Description of the matching rule.
    pub description: String,
}

impl From<ForbiddenMatch> for SecurityError {
    fn from(m: ForbiddenMatch) -> Self {
        SecurityError::ForbiddenConstruct {
            category: m.category.label().to_string(),
            description: m.description,
        }
    }
}

/// Scanner that checks script text against forbidden-construct rules.
pub struct ForbiddenConstructScanner {
    constructs: Vec<ForbiddenConstruct>,
}

impl ForbiddenConstructScanner {
    /// Create a scanner with the given rules, checked in order.
    pub fn new(constructs: Vec<ForbiddenConstruct>) -> Self {
        Self { constructs }
    }

    /// Create a rule from components. Panics if the regex is invalid.
    pub fn construct(
        category: ConstructCategory,
        description: impl Into<String>,
        pattern: &str,
    ) -> ForbiddenConstruct {
        ForbiddenConstruct {
            category,
            description: description.into(),
            pattern: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("Invalid regex for construct: {}", e)),
        }
    }

    /// Return the first matching rule, or `None` if the text is clean.
    pub fn scan(&self, text: &str) -> Option<ForbiddenMatch> {
        let found = self
            .constructs
            .iter()
            .find(|c| c.pattern.is_match(text))
            .map(|c| ForbiddenMatch {
                category: c.category,
                description: c.description.clone(),
            });

        if let Some(m) = &found {
            debug!(category = %m.category, rule = %m.description, "Forbidden construct found");
        }
        found
    }

    /// Scan and turn a match into an error.
    pub fn check(&self, text: &str) -> Result<(), SecurityError> {
        match self.scan(text) {
            Some(m) => Err(m.into()),
            None => Ok(()),
        }
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.constructs.len()
    }

    /// Whether the scanner has no rules.
    pub fn is_empty(&self) -> bool {
        self.constructs.is_empty()
    }
}

impl Default for ForbiddenConstructScanner {
    fn default() -> Self {
        use ConstructCategory::*;

        let constructs = vec![
            // 1. File and directory mutation
            Self::construct(
                Write,
                "file mutation",
                r"File\s*(?:\.|::)\s*(?:write|delete|unlink|rename|chmod|chown|truncate|symlink|link)\b",
            ),
            Self::construct(
                Write,
                "open for writing",
                r#"(?:File\s*(?:\.|::)\s*(?:open|new)|\bopen)\s*\([^,)]*,\s*["'][rwab]*[wa+]"#,
            ),
            Self::construct(Write, "FileUtils", r"\bFileUtils\b"),
            Self::construct(
                Write,
                "IO write or pipe",
                r"\bIO\s*(?:\.|::)\s*(?:write|syswrite|popen|pipe)\b",
            ),
            Self::construct(Write, "write call", r"\.(?:write|syswrite)\s*\("),
            Self::construct(
                Write,
                "directory mutation",
                r"\bDir\s*(?:\.|::)\s*(?:mkdir|rmdir|delete|unlink|chdir)\b",
            ),
            Self::construct(
                Write,
                "write helper",
                r"\b(?:write_file|delete_file|remove_file|rename_file|mkdir|rmdir)\s*\(",
            ),
            // 2. Process spawning and shell escapes
            Self::construct(ProcessExec, "backtick command substitution", r"`[^`]+`"),
            Self::construct(ProcessExec, "%x command literal", r"%x[{(\[]"),
            Self::construct(ProcessExec, "shell command substitution", r"\$\("),
            Self::construct(ProcessExec, "Kernel call", r"\bKernel\s*(?:\.|::)"),
            Self::construct(ProcessExec, "Open3", r"\bOpen3\b"),
            Self::construct(
                ProcessExec,
                "process control",
                r"\bProcess\s*(?:\.|::)\s*(?:spawn|exec|fork|kill)\b",
            ),
            Self::construct(
                ProcessExec,
                "process call",
                r"\b(?:system|exec|spawn|fork|popen|shell)\s*\(",
            ),
            Self::construct(ProcessExec, "Shellwords", r"\bShellwords\b"),
            // 3. Network clients
            Self::construct(Network, "Net client", r"\bNet::(?:HTTP|FTP|SMTP)\b"),
            Self::construct(Network, "URI fetch", r"\bURI\s*(?:\.|::)\s*(?:open|parse)\b"),
            Self::construct(
                Network,
                "HTTP client library",
                r"\b(?:HTTParty|Faraday|RestClient)\b|open-uri",
            ),
            Self::construct(Network, "socket", r"(?:TCP|UDP)?Socket\b"),
            Self::construct(Network, "HTTP call", r"\bhttp_(?:get|post|request)\s*\("),
            // 4. Dynamic evaluation and metaprogramming
            Self::construct(DynamicEval, "eval", r"\beval\s*\("),
            Self::construct(DynamicEval, "function pointer", r"\bFn\s*\("),
            Self::construct(DynamicEval, "dynamic call", r"\b(?:call|curry|call_fn)\s*\("),
            Self::construct(
                DynamicEval,
                "metaprogramming",
                r"\b(?:instance_eval|class_eval|module_eval|instance_exec|define_method|__send__|public_send)\b|\bsend\s*\(",
            ),
            Self::construct(
                DynamicEval,
                "runtime introspection",
                r"\b(?:ObjectSpace|Binding|set_trace_func|TracePoint)\b",
            ),
            // 5. Environment and credential stores
            Self::construct(CredentialAccess, "ENV access", r"\bENV\s*[\[.]"),
            Self::construct(CredentialAccess, "environment lookup", r"\b(?:env|getenv)\s*\("),
            Self::construct(
                CredentialAccess,
                "credential store",
                r"\bapplication\s*\.\s*(?:credentials|secrets)\b",
            ),
            // 6. Loading code from a non-literal source
            Self::construct(
                UnsafeLoad,
                "require with non-literal argument",
                r#"\b(?:require|require_relative)\b\s*\(?\s*[^"'\s(]"#,
            ),
            Self::construct(UnsafeLoad, "load with non-literal argument", r#"\bload\s*\(\s*[^"'\s)]"#),
            Self::construct(UnsafeLoad, "import with non-literal argument", r#"\bimport\b\s*[^"\s]"#),
        ];

        Self::new(constructs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(text: &str) -> Option<ConstructCategory> {
        ForbiddenConstructScanner::default().scan(text).map(|m| m.category)
    }

    #[test]
    fn test_write_constructs() {
        use ConstructCategory::Write;

        assert_eq!(category(r#"File.write("x.rb", "boom")"#), Some(Write));
        assert_eq!(category(r#"File::delete("Gemfile")"#), Some(Write));
        assert_eq!(category(r#"File.open("x", "w")"#), Some(Write));
        assert_eq!(category(r#"open("log.txt", "a")"#), Some(Write));
        assert_eq!(category(r#"open("db.yml", 'r+')"#), Some(Write));
        assert_eq!(category("FileUtils.rm_rf('app')"), Some(Write));
        assert_eq!(category("IO::popen(x)"), Some(Write));
        assert_eq!(category("f.write(data)"), Some(Write));
        assert_eq!(category("Dir.mkdir('tmp/x')"), Some(Write));
        assert_eq!(category(r#"write_file("a.txt", "b")"#), Some(Write));
        assert_eq!(category(r#"rmdir("app")"#), Some(Write));
    }

    #[test]
    fn test_read_only_open_modes_pass() {
        assert_eq!(category(r#"open("Gemfile")"#), None);
        assert_eq!(category(r#"open("Gemfile", "r")"#), None);
        assert_eq!(category(r#"File::open("Gemfile", "rb")"#), None);
    }

    #[test]
    fn test_process_constructs() {
        use ConstructCategory::ProcessExec;

        assert_eq!(category("`whoami`"), Some(ProcessExec));
        assert_eq!(category("let x = `ls -la`;"), Some(ProcessExec));
        assert_eq!(category("%x(ls)"), Some(ProcessExec));
        assert_eq!(category("print($(id))"), Some(ProcessExec));
        assert_eq!(category("Kernel.exec('sh')"), Some(ProcessExec));
        assert_eq!(category("Open3.capture2('ls')"), Some(ProcessExec));
        assert_eq!(category("Process::spawn('ls')"), Some(ProcessExec));
        assert_eq!(category(r#"system("rm -rf /")"#), Some(ProcessExec));
        assert_eq!(category(r#"exec ("sh")"#), Some(ProcessExec));
        assert_eq!(category("Shellwords.escape(x)"), Some(ProcessExec));
    }

    #[test]
    fn test_network_constructs() {
        use ConstructCategory::Network;

        assert_eq!(category("Net::HTTP.get(uri)"), Some(Network));
        assert_eq!(category("URI.open('http://x')"), Some(Network));
        assert_eq!(category("HTTParty.get(url)"), Some(Network));
        assert_eq!(category("require 'open-uri'"), Some(Network));
        assert_eq!(category("TCPSocket.new('h', 1)"), Some(Network));
        assert_eq!(category("http_get(url)"), Some(Network));
    }

    #[test]
    fn test_dynamic_eval_constructs() {
        use ConstructCategory::DynamicEval;

        assert_eq!(category(r#"eval("1 + 1")"#), Some(DynamicEval));
        assert_eq!(category(r#"let f = Fn("read_file"); f.call("x")"#), Some(DynamicEval));
        assert_eq!(category("x.curry(1)"), Some(DynamicEval));
        assert_eq!(category("obj.instance_eval { }"), Some(DynamicEval));
        assert_eq!(category("obj.send(:system)"), Some(DynamicEval));
        assert_eq!(category("ObjectSpace.each_object"), Some(DynamicEval));
    }

    #[test]
    fn test_credential_constructs() {
        use ConstructCategory::CredentialAccess;

        assert_eq!(category(r#"ENV["SECRET_KEY_BASE"]"#), Some(CredentialAccess));
        assert_eq!(category("ENV.fetch('X')"), Some(CredentialAccess));
        assert_eq!(category(r#"getenv("HOME")"#), Some(CredentialAccess));
        assert_eq!(
            category("Rails.application.credentials.secret_key_base"),
            Some(CredentialAccess)
        );
    }

    #[test]
    fn test_unsafe_load_constructs() {
        use ConstructCategory::UnsafeLoad;

        assert_eq!(category("require name"), Some(UnsafeLoad));
        assert_eq!(category("require(path)"), Some(UnsafeLoad));
        assert_eq!(category("load(path)"), Some(UnsafeLoad));
        assert_eq!(category("import name;"), Some(UnsafeLoad));
        assert_eq!(category(r#"require "json""#), None);
    }

    #[test]
    fn test_first_category_wins() {
        // Write rules are checked before process rules.
        let text = r#"File.write("a", `id`)"#;
        assert_eq!(category(text), Some(ConstructCategory::Write));
    }

    #[test]
    fn test_clean_read_scripts_pass() {
        let scripts = [
            r#"print(read_file("config/routes.rb"));"#,
            r#"for f in list_files("app/models/**/*.rb") { print(f); }"#,
            r#"let lines = open("Gemfile").lines(); print(lines.len());"#,
            r#"if file_exists("config/database.yml") { print("yes"); }"#,
            r#"print(entries("app"));"#,
            r#"let routes = read_file("config/routes.rb"); print(routes.len());"#,
            "// download_count and load_order are plain identifiers\nlet load_order = 1;",
            "print(\"important\");",
        ];
        for script in scripts {
            assert_eq!(category(script), None, "false positive on {:?}", script);
        }
    }

    #[test]
    fn test_check_returns_security_error() {
        let scanner = ForbiddenConstructScanner::default();
        match scanner.check("`id`") {
            Err(SecurityError::ForbiddenConstruct { category, description }) => {
                assert_eq!(category, "process-exec");
                assert_eq!(description, "backtick command substitution");
            }
            other => panic!("Expected ForbiddenConstruct, got: {:?}", other),
        }
        assert!(scanner.check("print(1);").is_ok());
    }

    #[test]
    fn test_custom_scanner() {
        let scanner = ForbiddenConstructScanner::new(vec![ForbiddenConstructScanner::construct(
            ConstructCategory::Network,
            "custom",
            r"forbidden_word",
        )]);

        let found = scanner.scan("This contains forbidden_word here").unwrap();
        assert_eq!(found.category, ConstructCategory::Network);
        assert_eq!(found.description, "custom");
        assert_eq!(scanner.len(), 1);
    }
}
