//! Inclusion policy for files and directories
//!
//! Pure name-based predicates, no filesystem access.

/// Extensions eligible for the corpus (matched case-sensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "py",
    "txt",
    "js",
    "tsx",
    "ts",
    "md",
    "cjs",
    "html",
    "json",
    "ipynb",
    "h",
    "localhost",
    "sh",
    "yaml",
    "example",
    "cs",
];

/// Manifests, lock files and tool configs that add noise without content
pub const EXCLUDED_FILE_NAMES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "tsconfig.json",
    "jsconfig.json",
    "composer.lock",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
];

/// Generated type-declaration suffix
const DECLARATION_SUFFIX: &str = ".d.ts";

/// Directories never descended into
pub const EXCLUDED_DIR_NAMES: &[&str] = &[
    // version control
    ".git",
    ".svn",
    ".hg",
    // dependencies
    "node_modules",
    "bower_components",
    "vendor",
    "venv",
    ".venv",
    "env",
    // build output
    "dist",
    "build",
    "out",
    "target",
    ".next",
    // caches
    "__pycache__",
    ".cache",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    "coverage",
    // test fixtures
    "fixtures",
    "__fixtures__",
    "__snapshots__",
];

/// Is a file name eligible for inclusion in the corpus?
pub fn is_eligible_file(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    if EXCLUDED_FILE_NAMES.contains(&name) || name.ends_with(DECLARATION_SUFFIX) {
        return false;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ALLOWED_EXTENSIONS.contains(&ext),
        _ => false,
    }
}

/// Is a directory name eligible for descent?
pub fn is_eligible_dir(name: &str) -> bool {
    !EXCLUDED_DIR_NAMES.contains(&name)
}
