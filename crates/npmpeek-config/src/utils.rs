/// File-name globs a bundled fetch includes.
pub fn default_include_patterns() -> Vec<String> {
    [
        "*.{js,mjs,cjs,jsx,ts,mts,cts,tsx}",
        "*.{json,md,markdown,txt}",
        "*.{css,scss,less,html,vue,svelte}",
        "*.{yml,yaml,toml,graphql,sh}",
        "{LICENSE,LICENCE,README,CHANGELOG,NOTICE}*",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// File-name globs removed again after the include pass.
pub fn default_exclude_patterns() -> Vec<String> {
    ["*.map", "*.min.js", "*.min.css"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Directory names that are never descended into for bundled fetches.
pub fn default_exclude_dirs() -> Vec<String> {
    [
        "node_modules",
        ".git",
        ".github",
        ".cache",
        "coverage",
        ".nyc_output",
        "__snapshots__",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
