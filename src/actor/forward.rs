// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use regex::Regex;

// Layer 3: Internal module imports
use super::reference::ActorRef;

/// A single forward-list entry: a topic matcher paired with the actor
/// the matching topic is redirected to (§4.1 Dispatch, §4.8 Forwarding).
pub struct ForwardEntry {
    matcher: Matcher,
    target: ActorRef,
}

/// `forwardList` matchers compare either by string equality or by regex
/// test against the topic, per §3's data model.
pub enum Matcher {
    Exact(String),
    Regex(Regex),
}

impl Matcher {
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Matcher::Exact(s) => s == topic,
            Matcher::Regex(re) => re.is_match(topic),
        }
    }
}

/// Ordered forward-list plus the single `forwardAllUnknown` slot, exactly
/// as described in §3/§4.8: a list of `(matcher, target)` pairs tried in
/// insertion order, and one optional catch-all reference.
#[derive(Default)]
pub struct ForwardList {
    entries: Vec<ForwardEntry>,
    forward_all_unknown: Option<ActorRef>,
}

impl ForwardList {
    pub fn new() -> Self {
        Self::default()
    }

    /// `forwardToParent(topics…)` / `forwardToChild(child, topics…)` both
    /// reduce to appending `(topic, target)` pairs here.
    pub fn add_exact(&mut self, topic: impl Into<String>, target: ActorRef) {
        self.entries.push(ForwardEntry {
            matcher: Matcher::Exact(topic.into()),
            target,
        });
    }

    pub fn add_regex(&mut self, pattern: Regex, target: ActorRef) {
        self.entries.push(ForwardEntry {
            matcher: Matcher::Regex(pattern),
            target,
        });
    }

    /// `forwardToParent(true)` — the sentinel that sets `forwardAllUnknown`.
    pub fn set_forward_all_unknown(&mut self, target: ActorRef) {
        self.forward_all_unknown = Some(target);
    }

    pub fn clear_forward_all_unknown(&mut self) {
        self.forward_all_unknown = None;
    }

    /// First-match lookup in insertion order, as §4.1 requires.
    pub fn resolve(&self, topic: &str) -> Option<&ActorRef> {
        self.entries
            .iter()
            .find(|entry| entry.matcher.matches(topic))
            .map(|entry| &entry.target)
    }

    pub fn forward_all_unknown(&self) -> Option<&ActorRef> {
        self.forward_all_unknown.as_ref()
    }
}
