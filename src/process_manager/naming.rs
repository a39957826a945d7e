/// One entry of the name inference table.
///
/// Matches when every `all` keyword appears in the lowercased command and, if
/// `any` is non-empty, at least one `any` keyword does too.
struct NameRule {
    all: &'static [&'static str],
    any: &'static [&'static str],
    name: &'static str,
}

const NAME_RULES: &[NameRule] = &[
    NameRule { all: &["dev", "backend"], any: &[], name: "backend-dev" },
    NameRule { all: &["dev", "frontend"], any: &[], name: "frontend-dev" },
    NameRule { all: &["dev", "api"], any: &[], name: "api-dev" },
    NameRule { all: &[], any: &["pnpm dev", "npm run dev", "yarn dev"], name: "dev-server" },
    NameRule { all: &["vite"], any: &[], name: "vite-dev" },
    NameRule { all: &["next dev"], any: &[], name: "next-dev" },
    NameRule { all: &["build"], any: &[], name: "build" },
    NameRule { all: &["compile"], any: &[], name: "compile" },
    NameRule { all: &[], any: &["test", "jest", "vitest"], name: "tests" },
    NameRule { all: &["watch"], any: &[], name: "watcher" },
    NameRule { all: &["tail"], any: &[], name: "log-tail" },
    NameRule { all: &[], any: &["docker-compose", "docker compose"], name: "docker" },
    NameRule { all: &[], any: &["postgres", "mysql", "mongo"], name: "database" },
];

const MAX_FALLBACK_NAME_CHARS: usize = 20;
const SCRIPT_EXTENSIONS: &[&str] = &[".sh", ".js", ".ts", ".py"];

impl NameRule {
    fn matches(&self, command: &str) -> bool {
        self.all.iter().all(|keyword| command.contains(keyword))
            && (self.any.is_empty() || self.any.iter().any(|keyword| command.contains(keyword)))
    }
}

/// Derives a display name for `command` when the caller did not supply one.
pub fn infer_name(command: &str) -> String {
    let lowered = command.to_lowercase();
    if let Some(rule) = NAME_RULES.iter().find(|rule| rule.matches(&lowered)) {
        return rule.name.to_owned();
    }

    let first = command.split_whitespace().next().unwrap_or_default();
    let first = first.strip_prefix("./").unwrap_or(first);
    let first = SCRIPT_EXTENSIONS
        .iter()
        .find_map(|ext| first.strip_suffix(ext))
        .unwrap_or(first);
    let name = first.chars().take(MAX_FALLBACK_NAME_CHARS).collect::<String>();
    if name.is_empty() {
        "process".to_owned()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::infer_name;

    #[test]
    fn keyword_rules_apply_in_table_order() {
        assert_eq!(infer_name("pnpm dev --filter backend"), "backend-dev");
        assert_eq!(infer_name("npm run dev"), "dev-server");
        assert_eq!(infer_name("npx vite"), "vite-dev");
        assert_eq!(infer_name("cargo build --release"), "build");
        assert_eq!(infer_name("cargo test"), "tests");
        assert_eq!(infer_name("cargo watch -x check"), "watcher");
        assert_eq!(infer_name("tail -f /var/log/syslog"), "log-tail");
        assert_eq!(infer_name("docker compose up"), "docker");
        assert_eq!(infer_name("postgres -D data"), "database");
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(infer_name("NPM RUN BUILD"), "build");
    }

    #[test]
    fn earlier_rules_shadow_later_ones() {
        // "build" is checked before "test".
        assert_eq!(infer_name("make build-tests"), "build");
    }

    #[test]
    fn falls_back_to_first_word_without_script_suffix() {
        assert_eq!(infer_name("./serve.sh --port 8080"), "serve");
        assert_eq!(infer_name("python3 -m http.server"), "python3");
        assert_eq!(infer_name("sleep 5"), "sleep");
    }

    #[test]
    fn fallback_is_capped_and_never_empty() {
        assert_eq!(
            infer_name("abcdefghijklmnopqrstuvwxyz --flag"),
            "abcdefghijklmnopqrst"
        );
        assert_eq!(infer_name("   "), "process");
    }
}
