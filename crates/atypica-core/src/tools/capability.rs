//! Runtime services a tool may depend on.
//!
//! The runtime advertises what it can provide; tools whose requirements are
//! not met are left out of the schemas sent to the model.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u64 {
        /// Access to the interview store.
        const STORE = 1 << 0;

        /// Ability to call a model directly, outside the turn loop.
        const MODEL_CALLER = 1 << 1;

        /// Outbound HTTP to the content search service.
        const NETWORK = 1 << 2;
    }
}

const LABELS: [(Capabilities, &str); 3] = [
    (Capabilities::STORE, "store"),
    (Capabilities::MODEL_CALLER, "model_caller"),
    (Capabilities::NETWORK, "network"),
];

impl Capabilities {
    pub fn satisfies(&self, required: Capabilities) -> bool {
        self.contains(required)
    }

    /// The part of `required` this set lacks.
    pub fn missing(&self, required: Capabilities) -> Capabilities {
        required.difference(*self)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::empty()
    }
}

impl std::fmt::Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let labels: Vec<&str> = LABELS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, label)| *label)
            .collect();
        f.write_str(&labels.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superset_satisfies() {
        let available = Capabilities::STORE | Capabilities::NETWORK;
        assert!(available.satisfies(Capabilities::STORE));
        assert!(!available.satisfies(Capabilities::STORE | Capabilities::MODEL_CALLER));
    }

    #[test]
    fn missing_lists_only_the_gap() {
        let available = Capabilities::STORE;
        let missing = available.missing(Capabilities::STORE | Capabilities::MODEL_CALLER);
        assert_eq!(missing, Capabilities::MODEL_CALLER);
        assert_eq!(missing.to_string(), "model_caller");
        assert_eq!(Capabilities::empty().to_string(), "(none)");
        assert_eq!(Capabilities::all().to_string(), "store, model_caller, network");
    }
}
