use super::{default_policy, load_policy, load_policy_or_none};
use crate::paths::ProjectPaths;
use crate::policy::{PolicyMode, DEFAULT_BATCH_FILE_THRESHOLD, DEFAULT_EXPIRE_HOURS_BLOCK};

fn write_policy(paths: &ProjectPaths, contents: &str) {
    let path = paths.policy_path();
    std::fs::create_dir_all(path.parent().expect("policy parent")).expect("create policy dir");
    std::fs::write(&path, contents).expect("write policy");
}

#[test]
fn missing_policy_is_none_not_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = ProjectPaths::new(dir.path().to_path_buf());
    assert!(load_policy(&paths).expect("load missing policy").is_none());
}

#[test]
fn partial_policy_fills_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = ProjectPaths::new(dir.path().to_path_buf());
    write_policy(
        &paths,
        r#"{
  "policyMode": "strict",
  "autoplan": { "expireHoursWarn": 12 },
  "domainsMap": [{ "glob": "src/billing/**", "domain": "PAY" }]
}"#,
    );

    let policy = load_policy(&paths)
        .expect("load policy")
        .expect("policy present");
    assert_eq!(policy.policy_mode, PolicyMode::Strict);
    assert_eq!(policy.autoplan.expire_hours_warn, 12);
    assert_eq!(policy.autoplan.expire_hours_block, DEFAULT_EXPIRE_HOURS_BLOCK);
    assert!(policy.autoplan.reserve_on_code_first);
    assert_eq!(
        policy.batch_guard.file_threshold,
        DEFAULT_BATCH_FILE_THRESHOLD
    );
    assert_eq!(policy.domains_map.len(), 1);
    assert_eq!(policy.topline_rules, default_policy().topline_rules);
}

#[test]
fn malformed_policy_collapses_to_none() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = ProjectPaths::new(dir.path().to_path_buf());
    write_policy(&paths, "{ not json");

    assert!(load_policy(&paths).is_err());
    assert!(load_policy_or_none(&paths).is_none());
}

#[test]
fn comment_pairs_drop_unpaired_tail() {
    let mut rules = default_policy().topline_rules;
    rules.block_comment_pairs = vec!["/*".into(), "*/".into(), "<!--".into()];
    assert_eq!(
        rules.comment_pairs(),
        vec![("/*".to_string(), "*/".to_string())]
    );
}
