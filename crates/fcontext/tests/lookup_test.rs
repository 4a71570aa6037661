// Lookup engine behavior over text-loaded rule sets: precedence, stem
// narrowing, mode filtering, canonicalization and the none sentinel.

use fcontext::{mode, Error, FileContexts};
use std::fs;
use tempfile::TempDir;

fn open_rules(contents: &str) -> (TempDir, FileContexts) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file_contexts");
    fs::write(&path, contents).unwrap();
    let fc = FileContexts::from(&path).open().unwrap();
    (dir, fc)
}

fn label_of(fc: &FileContexts, key: &str, file_mode: u32) -> Option<String> {
    fc.lookup(key, file_mode)
        .unwrap()
        .map(|label| label.raw.clone())
}

#[test]
fn basic_match_prefers_later_more_specific_rule() {
    let (_dir, fc) = open_rules(
        "/.*            system_u:object_r:default_t\n\
         /etc(/.*)?     system_u:object_r:etc_t\n",
    );

    assert_eq!(
        label_of(&fc, "/etc/passwd", mode::REGULAR).unwrap(),
        "system_u:object_r:etc_t"
    );
    assert_eq!(
        label_of(&fc, "/opt/x", mode::REGULAR).unwrap(),
        "system_u:object_r:default_t"
    );
}

#[test]
fn stem_narrowing_routes_keys_by_first_segment() {
    let (_dir, fc) = open_rules(
        "/.*               default_t\n\
         /usr/sbin(/.*)?   sbin_t\n\
         /usr/bin(/.*)?    bin_t\n\
         /etc(/.*)?        etc_t\n",
    );

    assert_eq!(label_of(&fc, "/usr/bin/ls", mode::REGULAR).unwrap(), "bin_t");
    assert_eq!(
        label_of(&fc, "/usr/sbin/init", mode::REGULAR).unwrap(),
        "sbin_t"
    );
    assert_eq!(label_of(&fc, "/etc/passwd", mode::REGULAR).unwrap(), "etc_t");
}

#[test]
fn mode_filter_skips_rules_for_other_file_types() {
    let (_dir, fc) = open_rules(
        "/.*        default_t\n\
         /tmp/.* -- tmp_t\n",
    );

    assert_eq!(label_of(&fc, "/tmp/x", mode::REGULAR).unwrap(), "tmp_t");
    assert_eq!(label_of(&fc, "/tmp/x", mode::DIRECTORY).unwrap(), "default_t");
    // An unrestricted lookup may use the restricted rule.
    assert_eq!(label_of(&fc, "/tmp/x", 0).unwrap(), "tmp_t");
}

#[test]
fn none_sentinel_is_not_found_without_error() {
    let (_dir, fc) = open_rules(
        "/.*          default_t\n\
         /proc/kcore  <<none>>\n",
    );

    assert_eq!(label_of(&fc, "/proc/kcore", mode::REGULAR), None);
    assert_eq!(label_of(&fc, "/proc/cpuinfo", mode::REGULAR).unwrap(), "default_t");
}

#[test]
fn last_matching_rule_wins() {
    let (_dir, fc) = open_rules(
        "/var/.*  a_t\n\
         /var/.*  b_t\n",
    );

    assert_eq!(label_of(&fc, "/var/x", mode::REGULAR).unwrap(), "b_t");
}

#[test]
fn literal_rule_beats_regex_regardless_of_order() {
    let (_dir, fc) = open_rules(
        "/opt/app    app_exact_t\n\
         /opt/app.*  app_regex_t\n",
    );

    // The regex rule is later in the file, but the literal still wins.
    assert_eq!(
        label_of(&fc, "/opt/app", mode::REGULAR).unwrap(),
        "app_exact_t"
    );
    assert_eq!(
        label_of(&fc, "/opt/apple", mode::REGULAR).unwrap(),
        "app_regex_t"
    );
}

#[test]
fn duplicate_slashes_collapse_before_matching() {
    let (_dir, fc) = open_rules(
        "/.*            default_t\n\
         /etc(/.*)?     etc_t\n",
    );

    for key in ["/etc//passwd", "/etc///passwd", "//etc/passwd"] {
        assert_eq!(
            label_of(&fc, key, mode::REGULAR),
            label_of(&fc, "/etc/passwd", mode::REGULAR),
            "key {:?} should canonicalize",
            key
        );
    }
}

#[test]
fn partial_match_reports_viable_directory_prefixes() {
    let (_dir, fc) = open_rules("/var/log/.*  log_t\n");

    assert!(fc.partial_match("/var/log").unwrap());
    assert!(fc.partial_match("/var/log/messages").unwrap());
    assert!(!fc.partial_match("/usr/lib").unwrap());
}

#[test]
fn empty_rule_set_finds_nothing() {
    let (_dir, fc) = open_rules("# only a comment\n");
    assert_eq!(label_of(&fc, "/etc/passwd", mode::REGULAR), None);
    assert!(!fc.partial_match("/etc").unwrap());
}

#[test]
fn best_match_prefers_longest_fixed_prefix() {
    let (_dir, fc) = open_rules(
        "/home(/.*)?          home_t\n\
         /export/home(/.*)?   export_home_t\n",
    );

    // The alias's rule has the longer fixed prefix.
    let label = fc
        .best_match("/home/alice", &["/export/home/alice"], mode::REGULAR)
        .unwrap()
        .unwrap();
    assert_eq!(label.raw, "export_home_t");

    // Without aliases this is a plain lookup.
    let label = fc
        .best_match("/home/alice", &[], mode::REGULAR)
        .unwrap()
        .unwrap();
    assert_eq!(label.raw, "home_t");
}

#[test]
fn best_match_ties_resolve_to_the_key() {
    let (_dir, fc) = open_rules(
        "/data(/.*)?  data_t\n\
         /srvx(/.*)?  srvx_t\n",
    );

    // Both rules have the same fixed prefix length; the key wins.
    let label = fc
        .best_match("/data/f", &["/srvx/f"], mode::REGULAR)
        .unwrap()
        .unwrap();
    assert_eq!(label.raw, "data_t");
}

#[test]
fn best_match_exact_rule_wins_immediately() {
    let (_dir, fc) = open_rules(
        "/home(/.*)?  home_t\n\
         /mnt/disk    disk_t\n",
    );

    // The alias hits a literal rule; it beats the key's longer-running
    // regex candidate.
    let label = fc
        .best_match("/home/x", &["/mnt/disk"], mode::REGULAR)
        .unwrap()
        .unwrap();
    assert_eq!(label.raw, "disk_t");
}

#[test]
fn best_match_misses_when_nothing_matches() {
    let (_dir, fc) = open_rules("/home(/.*)?  home_t\n");
    assert!(fc
        .best_match("/nope", &["/also/nope"], mode::REGULAR)
        .unwrap()
        .is_none());
}

#[test]
fn validating_open_rejects_duplicate_rules() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file_contexts");
    fs::write(
        &path,
        "/x/.*  a_t\n\
         /x/.*  b_t\n",
    )
    .unwrap();

    let err = FileContexts::from(&path).validate(true).open().unwrap_err();
    assert!(matches!(err, Error::DuplicateSpec { count: 1, .. }));

    // The same file loads fine without validation.
    let fc = FileContexts::from(&path).open().unwrap();
    assert_eq!(fc.rule_count(), 2);
}

#[test]
fn match_counters_feed_stats() {
    let (_dir, fc) = open_rules(
        "/.*        default_t\n\
         /never/x   never_t\n",
    );

    fc.lookup("/etc/passwd", mode::REGULAR).unwrap();
    // Emits a warning for the unmatched literal rule; must not panic.
    fc.stats();

    drop(fc);
}
