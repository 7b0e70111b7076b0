//! Route classification for the session guard.

/// Landing page; public for everyone, never redirected.
pub const ROOT: &str = "/";
pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
/// Default view after authentication.
pub const DASHBOARD: &str = "/dashboard";
pub const AUDITS: &str = "/audits";
pub const NEW_AUDIT: &str = "/audits/new";
pub const SETTINGS: &str = "/settings";
pub const PRICING: &str = "/pricing";

const PUBLIC_PATHS: &[&str] = &[ROOT, LOGIN, REGISTER];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Public,
    Protected,
}

/// Classifies a path against the public allow-list. Anything else is protected.
pub fn classify(path: &str) -> RouteKind {
    if PUBLIC_PATHS.contains(&normalize(path)) {
        RouteKind::Public
    } else {
        RouteKind::Protected
    }
}

/// Login and register: public pages an authenticated user has no reason to see.
pub fn is_entry_route(path: &str) -> bool {
    let path = normalize(path);
    classify(path) == RouteKind::Public && path != ROOT
}

/// Where the guard sends a navigation to `path`, if anywhere.
pub fn redirect_for(path: &str, authenticated: bool) -> Option<&'static str> {
    match (authenticated, classify(path)) {
        (false, RouteKind::Protected) => Some(LOGIN),
        (true, RouteKind::Public) if is_entry_route(path) => Some(DASHBOARD),
        _ => None,
    }
}

pub fn audit_detail(id: &str) -> String {
    format!("{AUDITS}/{id}")
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => ROOT,
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("/"), RouteKind::Public);
        assert_eq!(classify("/login"), RouteKind::Public);
        assert_eq!(classify("/register?ref=abc"), RouteKind::Public);
        assert_eq!(classify("/dashboard"), RouteKind::Protected);
        assert_eq!(classify("/audits/a1"), RouteKind::Protected);
        assert_eq!(classify("/pricing"), RouteKind::Protected);
    }

    #[test]
    fn test_anonymous_protected_goes_to_login() {
        assert_eq!(redirect_for("/dashboard", false), Some(LOGIN));
        assert_eq!(redirect_for("/audits/new", false), Some(LOGIN));
        assert_eq!(redirect_for("/login", false), None);
        assert_eq!(redirect_for("/", false), None);
    }

    #[test]
    fn test_authenticated_entry_goes_to_dashboard() {
        assert_eq!(redirect_for("/login", true), Some(DASHBOARD));
        assert_eq!(redirect_for("/register/", true), Some(DASHBOARD));
        assert_eq!(redirect_for("/", true), None);
        assert_eq!(redirect_for("/settings", true), None);
    }

    #[test]
    fn test_audit_detail_path() {
        assert_eq!(audit_detail("a1"), "/audits/a1");
    }
}
