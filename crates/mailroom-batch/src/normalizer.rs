//! Resolves the wrapper shape of a per-email result fragment.
//!
//! The extraction service does not commit to one envelope. Observed shapes
//! include `{"MAIL_1": {...}}`, `{"data": {...}}`, a bare result object and
//! a one-element list. The normalizer tries an ordered list of named
//! strategies and returns the payload of the first match. When nothing
//! matches the fragment is passed through unchanged and marked
//! [`Resolution::Unrecognized`], so validation rejects it and the email is
//! retried.

use serde_json::Value as JsonValue;

use mailroom_core::schema::EMAIL_RESULT_FIELDS;

/// Primary wrapper key.
pub const PRIMARY_WRAPPER: &str = "MAIL_1";

/// Alternate wrapper keys, in priority order.
pub const ALTERNATE_WRAPPERS: [&str; 5] = ["MAIL_0", "EMAIL_1", "EMAIL_0", "data", "content"];

/// Fields whose presence marks a fragment as already canonical.
const CANONICAL_MARKERS: [&str; 4] = [
    EMAIL_RESULT_FIELDS[0],
    EMAIL_RESULT_FIELDS[1],
    EMAIL_RESULT_FIELDS[2],
    "files",
];

/// How a strategy recognizes and unwraps a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Object containing this key; the payload is the key's value.
    Wrapper(&'static str),
    /// Object containing at least one canonical result field; used as is.
    CanonicalFields,
    /// Non-empty array; the payload is the first element.
    FirstElement,
}

impl Matcher {
    /// Payload of `fragment` if this matcher applies.
    pub fn extract<'a>(&self, fragment: &'a JsonValue) -> Option<&'a JsonValue> {
        match self {
            Matcher::Wrapper(key) => fragment.as_object()?.get(*key),
            Matcher::CanonicalFields => {
                let map = fragment.as_object()?;
                CANONICAL_MARKERS
                    .iter()
                    .any(|field| map.contains_key(*field))
                    .then_some(fragment)
            }
            Matcher::FirstElement => fragment.as_array()?.first(),
        }
    }
}

/// A named matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub matcher: Matcher,
}

impl Strategy {
    pub const fn new(name: &'static str, matcher: Matcher) -> Self {
        Self { name, matcher }
    }

    pub const fn wrapper(key: &'static str) -> Self {
        Self::new(key, Matcher::Wrapper(key))
    }
}

/// How a fragment was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Name of the strategy that matched.
    Matched(&'static str),
    /// No strategy matched; the payload is the fragment itself.
    Unrecognized,
}

impl Resolution {
    pub fn strategy(&self) -> Option<&'static str> {
        match self {
            Resolution::Matched(name) => Some(*name),
            Resolution::Unrecognized => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }
}

/// Result of normalizing one fragment. Borrows from the response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized<'a> {
    pub payload: &'a JsonValue,
    pub resolution: Resolution,
}

/// Ordered strategy list. First match wins.
#[derive(Debug, Clone)]
pub struct Normalizer {
    strategies: Vec<Strategy>,
}

impl Normalizer {
    /// Normalizer with the given strategies, tried in order.
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// The resolution order used in production:
    /// `MAIL_1`, then the alternate wrappers, then canonical fields, then
    /// the first list element.
    pub fn standard() -> Self {
        let mut strategies = vec![Strategy::wrapper(PRIMARY_WRAPPER)];
        strategies.extend(ALTERNATE_WRAPPERS.into_iter().map(Strategy::wrapper));
        strategies.push(Strategy::new("canonical", Matcher::CanonicalFields));
        strategies.push(Strategy::new("first_element", Matcher::FirstElement));
        Self::new(strategies)
    }

    /// Append a strategy after the existing ones.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn normalize<'a>(&self, fragment: &'a JsonValue) -> Normalized<'a> {
        for strategy in &self.strategies {
            if let Some(payload) = strategy.matcher.extract(fragment) {
                return Normalized {
                    payload,
                    resolution: Resolution::Matched(strategy.name),
                };
            }
        }
        Normalized {
            payload: fragment,
            resolution: Resolution::Unrecognized,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> JsonValue {
        json!({"Summary": "s", "ActionItems": ["a"], "Urgency": "Medium"})
    }

    #[test]
    fn test_every_known_envelope_unwraps_to_canonical() {
        let normalizer = Normalizer::standard();
        for key in std::iter::once(PRIMARY_WRAPPER).chain(ALTERNATE_WRAPPERS) {
            let mut envelope = serde_json::Map::new();
            envelope.insert(key.to_string(), canonical());
            let wrapped = JsonValue::Object(envelope);
            let normalized = normalizer.normalize(&wrapped);
            assert_eq!(normalized.payload, &canonical(), "envelope {key}");
            assert_eq!(normalized.resolution, Resolution::Matched(key));
        }
    }

    #[test]
    fn test_primary_wrapper_wins_over_alternates() {
        let fragment = json!({
            "data": {"Summary": "from data"},
            "MAIL_1": {"Summary": "from MAIL_1"}
        });
        let normalized = Normalizer::standard().normalize(&fragment);
        assert_eq!(normalized.payload["Summary"], json!("from MAIL_1"));
    }

    #[test]
    fn test_alternate_priority_order() {
        let fragment = json!({
            "content": {"Summary": "content"},
            "EMAIL_0": {"Summary": "EMAIL_0"}
        });
        let normalized = Normalizer::standard().normalize(&fragment);
        assert_eq!(normalized.resolution, Resolution::Matched("EMAIL_0"));
    }

    #[test]
    fn test_bare_result_is_canonical() {
        let fragment = canonical();
        let normalized = Normalizer::standard().normalize(&fragment);
        assert_eq!(normalized.resolution, Resolution::Matched("canonical"));
        assert_eq!(normalized.payload, &fragment);
    }

    #[test]
    fn test_unknown_envelope_with_top_level_summary_is_canonical() {
        let fragment = json!({"RESULT_X": {"Summary": "nested"}, "Summary": "top"});
        let normalized = Normalizer::standard().normalize(&fragment);
        assert_eq!(normalized.resolution, Resolution::Matched("canonical"));
        assert_eq!(normalized.payload["Summary"], json!("top"));
    }

    #[test]
    fn test_files_alone_marks_canonical() {
        let fragment = json!({"files": {}});
        let normalized = Normalizer::standard().normalize(&fragment);
        assert_eq!(normalized.resolution.strategy(), Some("canonical"));
    }

    #[test]
    fn test_list_takes_first_element() {
        let fragment = json!([canonical(), {"Summary": "second"}]);
        let normalized = Normalizer::standard().normalize(&fragment);
        assert_eq!(normalized.resolution, Resolution::Matched("first_element"));
        assert_eq!(normalized.payload, &canonical());
    }

    #[test]
    fn test_unrecognized_passes_through() {
        for fragment in [json!({"RESULT_X": canonical()}), json!([]), json!("text"), json!(null)] {
            let normalized = Normalizer::standard().normalize(&fragment);
            assert_eq!(normalized.resolution, Resolution::Unrecognized);
            assert!(!normalized.resolution.is_recognized());
            assert_eq!(normalized.payload, &fragment);
        }
    }

    #[test]
    fn test_unwraps_only_one_level() {
        let fragment = json!({"MAIL_1": {"data": canonical()}});
        let normalized = Normalizer::standard().normalize(&fragment);
        assert_eq!(normalized.payload, &json!({"data": canonical()}));
    }

    #[test]
    fn test_custom_strategy_appended() {
        let normalizer = Normalizer::standard().with_strategy(Strategy::wrapper("RESULT_X"));
        let fragment = json!({"RESULT_X": canonical()});
        let normalized = normalizer.normalize(&fragment);
        assert_eq!(normalized.resolution, Resolution::Matched("RESULT_X"));
        assert_eq!(normalizer.strategies().len(), 9);
    }
}
