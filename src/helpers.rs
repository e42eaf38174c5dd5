use log::trace;

/// Resolves a possibly relative or tilde-prefixed path against a home
/// and a current directory. A missing path resolves to the current
/// directory. Used for both remote and local names; the session picks
/// the directory pair.
pub fn abspath(relpath: Option<&str>, homedir: &str, curdir: &str) -> String {
    let resolved = match relpath {
        // No path given: the current working directory
        None => curdir.to_string(),
        Some("~") => homedir.to_string(),
        Some(p) if p.starts_with("~/") => format!("{}{}", homedir, &p[1..]),
        // A tilde not followed by '/' is passed through untouched;
        // the server will almost certainly reject it
        Some(p) if p.starts_with('~') => p.to_string(),
        Some(p) if p.starts_with("./") => format!("{}{}", curdir, &p[1..]),
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("{}/{}", curdir, p),
    };
    trace!("{:?} -> {}", relpath, resolved);
    resolved
}

/// The final component of a slash-separated path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
