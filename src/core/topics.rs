//! Topic index - Find instances by the usage label callers attach to them

use std::collections::HashSet;

use super::instance::Instance;

/// Distinct non-empty topics in first-seen order
pub fn list_topics(instances: &[Instance]) -> Vec<String> {
    let mut seen = HashSet::new();
    instances
        .iter()
        .filter_map(Instance::usage_label)
        .filter(|topic| !topic.is_empty() && seen.insert(*topic))
        .map(str::to_string)
        .collect()
}

/// First instance serving `topic`
pub fn find_by_topic<'a>(instances: &'a [Instance], topic: &str) -> Option<&'a Instance> {
    instances.iter().find(|i| i.usage_label() == Some(topic))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(label: &str, topic: Option<&str>) -> Instance {
        let mut instance = Instance::new("test", label);
        instance.mark_in_use(1234, topic.map(str::to_string));
        instance
    }

    fn fixture() -> Vec<Instance> {
        vec![
            Instance::new("test", "test-1"),
            held("test-2", Some("test-usage")),
            held("test-3", None),
            held("test-4", Some("")),
            held("test-5", Some("mail")),
            held("test-6", Some("test-usage")),
        ]
    }

    #[test]
    fn topics_are_distinct_in_first_seen_order() {
        assert_eq!(list_topics(&fixture()), vec!["test-usage", "mail"]);
        assert!(list_topics(&[]).is_empty());
    }

    #[test]
    fn finds_first_instance_with_topic() {
        let instances = fixture();
        assert_eq!(find_by_topic(&instances, "test-usage"), Some(&instances[1]));
        assert_eq!(find_by_topic(&instances, "mail"), Some(&instances[4]));
        assert_eq!(find_by_topic(&instances, "unused-topic-label"), None);
    }
}
