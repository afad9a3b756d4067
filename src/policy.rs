//! Declarative transaction policy for routes.
//!
//! Instead of discovering per-endpoint metadata at request time, routes that
//! want the middleware-managed scope are recorded in a [`RoutePolicies`] map
//! built right next to the `Router::route` calls. The middleware consults it
//! once per request with a direct path lookup.

use std::collections::HashSet;

/// What the global middleware does with a request to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxPolicy {
    /// Invoke the inner service directly; zero scope operations.
    #[default]
    Passthrough,
    /// Wrap the whole downstream invocation in an ambient transaction scope.
    Wrap,
}

/// The route-to-policy map, built at route-registration time.
///
/// Presence of a path is the whole signal: marked routes are wrapped,
/// everything else passes through.
#[derive(Debug, Clone, Default)]
pub struct RoutePolicies {
    marked: HashSet<String>,
}

impl RoutePolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` for transaction wrapping.
    pub fn wrap(mut self, path: &str) -> Self {
        self.marked.insert(path.to_owned());
        self
    }

    /// The policy for a request path. Unknown paths pass through.
    pub fn policy_for(&self, path: &str) -> TxPolicy {
        if self.marked.contains(path) {
            TxPolicy::Wrap
        } else {
            TxPolicy::Passthrough
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RoutePolicies, TxPolicy};

    #[test]
    fn presence_of_the_mark_is_the_signal() {
        let policies = RoutePolicies::new().wrap("/two").wrap("/twoerr");

        assert_eq!(policies.policy_for("/two"), TxPolicy::Wrap);
        assert_eq!(policies.policy_for("/twoerr"), TxPolicy::Wrap);
        assert_eq!(policies.policy_for("/"), TxPolicy::Passthrough);
        assert_eq!(policies.policy_for("/three"), TxPolicy::Passthrough);
        assert_eq!(policies.policy_for("/nope"), TxPolicy::Passthrough);
    }
}
