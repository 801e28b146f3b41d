//! Instance selection - Reuse the oldest free instance, otherwise name a new one

use std::collections::HashSet;

use super::instance::Instance;
use super::profile::ProfileDefinition;

/// Pick the instance a caller should use for `profile`.
///
/// `instances` must already have usage resolved against live processes. Only
/// instances of `profile` are considered. The oldest free one is returned; if
/// there is none, a new, unmaterialized instance labeled `<profile>-<N>` is
/// returned, where N is the smallest positive number not yet taken.
pub fn select_best(profile: &ProfileDefinition, instances: &[Instance]) -> Instance {
    let own: Vec<&Instance> = instances
        .iter()
        .filter(|i| i.profile_label == profile.label)
        .collect();

    // min_by_key keeps the first of equal elements
    if let Some(free) = own
        .iter()
        .filter(|i| !i.is_in_use())
        .min_by_key(|i| i.created)
    {
        return (*free).clone();
    }

    Instance::new(
        profile.label.clone(),
        next_instance_label(&profile.label, own.iter().copied()),
    )
}

/// Smallest unused `<profile>-<N>` label, reusing gaps left by deleted instances
pub fn next_instance_label<'a>(
    profile_label: &str,
    instances: impl IntoIterator<Item = &'a Instance>,
) -> String {
    let taken: HashSet<u64> = instances
        .into_iter()
        .filter_map(|i| label_number(profile_label, &i.instance_label))
        .collect();

    let mut n = 1;
    while taken.contains(&n) {
        n += 1;
    }
    format!("{}-{}", profile_label, n)
}

/// The N of a canonical `<profile>-<N>` label
fn label_number(profile_label: &str, instance_label: &str) -> Option<u64> {
    let suffix = instance_label
        .strip_prefix(profile_label)?
        .strip_prefix('-')?;
    let canonical = !suffix.is_empty()
        && !suffix.starts_with('0')
        && suffix.bytes().all(|b| b.is_ascii_digit());
    if !canonical {
        return None;
    }
    suffix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn profile() -> ProfileDefinition {
        ProfileDefinition::new("test")
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 10, day, 18, 12, 1).unwrap()
    }

    fn free(profile: &str, label: &str, day: u32) -> Instance {
        let mut instance = Instance::new(profile, label);
        instance.mark_created(at(day));
        instance
    }

    fn busy(profile: &str, label: &str, day: u32) -> Instance {
        let mut instance = free(profile, label, day);
        instance.mark_in_use(1234, Some("test-usage".into()));
        instance
    }

    fn fixture() -> Vec<Instance> {
        vec![free("test", "test-1", 24), busy("test", "test-2", 25)]
    }

    #[test]
    fn chooses_only_free_instance() {
        assert_eq!(select_best(&profile(), &fixture()), fixture()[0]);
    }

    #[test]
    fn chooses_oldest_free_instance() {
        let oldest = free("test", "oldest-instance", 1);
        let mut instances = fixture();
        instances.push(oldest.clone());
        assert_eq!(select_best(&profile(), &instances), oldest);
    }

    #[test]
    fn ties_go_to_first_encountered() {
        let instances = vec![free("test", "test-b", 3), free("test", "test-a", 3)];
        assert_eq!(select_best(&profile(), &instances).instance_label, "test-b");
    }

    #[test]
    fn creates_first_instance() {
        let selected = select_best(&profile(), &[]);
        assert_eq!(selected, Instance::new("test", "test-1"));
        assert!(!selected.is_materialized());
    }

    #[test]
    fn reuses_lowest_gap() {
        let instances = vec![busy("test", "test-2", 1), busy("test", "test-3", 2)];
        assert_eq!(
            select_best(&profile(), &instances),
            Instance::new("test", "test-1")
        );
    }

    #[test]
    fn increments_past_busy_instances() {
        let instances = vec![
            busy("test", "test-1", 1),
            busy("test", "test-2", 2),
            busy("test", "test-4", 3),
        ];
        assert_eq!(select_best(&profile(), &instances).instance_label, "test-3");
    }

    #[test]
    fn skips_instances_of_other_profiles() {
        let mut instances = fixture();
        instances.push(free("test-other", "oldest-instance", 1));
        assert_eq!(select_best(&profile(), &instances), fixture()[0]);

        // Another profile's labels never block numbering either
        let instances = vec![busy("test-other", "test-1", 1)];
        assert_eq!(select_best(&profile(), &instances).instance_label, "test-1");
    }

    #[test]
    fn tolerates_unconventional_labels() {
        let instances = vec![
            busy("test", "hand-made", 1),
            busy("test", "test-", 2),
            busy("test", "test-01", 3),
            busy("test", "test-x1", 4),
            busy("test", "test-1", 5),
        ];
        assert_eq!(select_best(&profile(), &instances).instance_label, "test-2");
    }

    #[test]
    fn label_numbers() {
        assert_eq!(label_number("test", "test-7"), Some(7));
        assert_eq!(label_number("test", "test-0"), None);
        assert_eq!(label_number("test", "test-+1"), None);
        assert_eq!(label_number("test", "test-other-1"), None);
        assert_eq!(label_number("test", "testing-1"), None);
    }
}
