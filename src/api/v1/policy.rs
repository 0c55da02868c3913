use crate::domain_model::Role;
use warp::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Minimum role; satisfied by anything at or above it in the hierarchy.
    Role(Role),
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    method: Option<Method>,
    pattern: String,
    access: Access,
}

impl RouteRule {
    pub fn new(method: Option<Method>, pattern: impl Into<String>, access: Access) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            access,
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        if let Some(required) = &self.method {
            if required != method {
                return false;
            }
        }
        pattern_matches(&self.pattern, path)
    }
}

/// Segment-wise path match: `*` matches one segment, a trailing `**` matches
/// any remainder (including none).
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.trim_matches('/').split('/');
    let mut path_segments = path.trim_matches('/').split('/').peekable();

    loop {
        match pattern_segments.next() {
            Some("**") => return true,
            Some(expected) => match path_segments.next() {
                Some(actual) if expected == "*" || expected == actual => continue,
                _ => return false,
            },
            None => return path_segments.peek().is_none(),
        }
    }
}

/// Ordered route-level access rules; the first matching rule wins. Stateless:
/// decisions depend only on the per-request principal, never on any
/// server-side session.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<RouteRule>,
}

impl RoutePolicy {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    pub fn decide(&self, method: &Method, path: &str) -> Access {
        for rule in &self.rules {
            if rule.matches(method, path) {
                return rule.access;
            }
        }
        // Unlisted routes require authentication.
        Access::Role(Role::Member)
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new(vec![
            RouteRule::new(Some(Method::POST), "/auth/login", Access::Public),
            RouteRule::new(Some(Method::POST), "/auth/reissue", Access::Public),
            RouteRule::new(Some(Method::GET), "/members", Access::Role(Role::Admin)),
            RouteRule::new(None, "/members/**", Access::Public),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let policy = RoutePolicy::new(vec![
            RouteRule::new(Some(Method::GET), "/members", Access::Role(Role::Admin)),
            RouteRule::new(None, "/members/**", Access::Public),
        ]);
        assert_eq!(
            policy.decide(&Method::GET, "/members"),
            Access::Role(Role::Admin)
        );
        assert_eq!(policy.decide(&Method::GET, "/members/alice"), Access::Public);
        // Method mismatch falls through to the wildcard rule.
        assert_eq!(policy.decide(&Method::POST, "/members"), Access::Public);
    }

    #[test]
    fn unlisted_routes_require_authentication() {
        let policy = RoutePolicy::default();
        assert_eq!(
            policy.decide(&Method::DELETE, "/auth/logout"),
            Access::Role(Role::Member)
        );
        assert_eq!(
            policy.decide(&Method::GET, "/teams/7"),
            Access::Role(Role::Member)
        );
    }

    #[test]
    fn pattern_segments() {
        assert!(pattern_matches("/members/**", "/members"));
        assert!(pattern_matches("/members/**", "/members/alice/avatar"));
        assert!(pattern_matches("/members/*", "/members/alice"));
        assert!(!pattern_matches("/members/*", "/members/alice/avatar"));
        assert!(!pattern_matches("/members", "/auth/login"));
    }
}
