use std::env;

/// Runs `f` with each variable set (`Some`) or removed (`None`), then puts
/// the previous environment back. Callers must be `#[serial]`.
pub fn with_env<F>(vars: &[(&str, Option<&str>)], f: F)
where
    F: FnOnce(),
{
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), env::var(key).ok()))
        .collect();

    for (key, value) in vars {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }

    f();

    for (key, value) in saved {
        match value {
            Some(value) => env::set_var(&key, value),
            None => env::remove_var(&key),
        }
    }
}
