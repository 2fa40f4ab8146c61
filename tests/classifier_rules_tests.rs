use gitpush::classifier::render_fix_command;
use gitpush::classifier::rules::{Remedy, RULES};
use gitpush::{classify, ErrorContext, ErrorKind};

/// One representative git message per rule, in table order.
const SAMPLES: &[(ErrorKind, &str)] = &[
    (
        ErrorKind::NotARepo,
        "fatal: not a git repository (or any of the parent directories): .git",
    ),
    (
        ErrorKind::DubiousOwnership,
        "fatal: detected dubious ownership in repository at '/srv/project'",
    ),
    (
        ErrorKind::RemoteExists,
        "error: remote origin already exists.",
    ),
    (
        ErrorKind::NoUpstream,
        "fatal: The current branch feature/login has no upstream branch.",
    ),
    (
        ErrorKind::FailedToPushRefs,
        "error: failed to push some refs to 'https://github.com/o/r.git'",
    ),
    (
        ErrorKind::UnrelatedHistories,
        "fatal: refusing to merge unrelated histories",
    ),
    (
        ErrorKind::AuthFailed,
        "fatal: Authentication failed for 'https://github.com/o/r.git/'",
    ),
    (
        ErrorKind::RepoNotFound,
        "remote: Repository not found.\nfatal: repository 'https://github.com/o/missing.git/' not found",
    ),
    (
        ErrorKind::NetworkError,
        "fatal: unable to access 'https://github.com/o/r.git/': Could not resolve host: github.com",
    ),
    (
        ErrorKind::PathspecNotMatch,
        "fatal: pathspec 'missing.txt' did not match any files",
    ),
    (
        ErrorKind::NothingToCommit,
        "On branch main\nnothing to commit, working tree clean",
    ),
    (
        ErrorKind::DetachedHead,
        "Note: switching to 'abc123'.\n\nYou are in 'detached HEAD' state. You can look around",
    ),
    (
        ErrorKind::MergeConflict,
        "CONFLICT (content): Merge conflict in a.txt\nAutomatic merge failed; fix conflicts and then commit the result.",
    ),
    (
        ErrorKind::LfsNotInstalled,
        "git: 'lfs' is not a git command. See 'git --help'.\ngit-lfs: command not found",
    ),
];

#[test]
fn test_every_rule_has_a_sample_in_order() {
    let rule_kinds: Vec<ErrorKind> = RULES.iter().map(|r| r.kind).collect();
    let sample_kinds: Vec<ErrorKind> = SAMPLES.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(rule_kinds, sample_kinds);
}

#[test]
fn test_each_sample_classifies_as_its_rule() {
    for (kind, text) in SAMPLES {
        let err = classify(text, None).unwrap_or_else(|| panic!("no match for {kind}"));
        assert_eq!(err.kind, *kind, "sample: {text}");
        assert!(err.detected);
    }
}

#[test]
fn test_first_match_wins() {
    // Matches both NOT_A_REPO and NOTHING_TO_COMMIT; the earlier rule wins.
    let text = "nothing to commit, working tree clean\nfatal: not a git repository";
    assert_eq!(classify(text, None).unwrap().kind, ErrorKind::NotARepo);

    // Push rejection text that also mentions auth: table order decides.
    let text = "fatal: Authentication failed for 'x'\nerror: failed to push some refs to 'x'";
    assert_eq!(classify(text, None).unwrap().kind, ErrorKind::FailedToPushRefs);
}

#[test]
fn test_remediation_flags_are_exclusive() {
    for (_, text) in SAMPLES {
        let err = classify(text, None).unwrap();
        assert!(
            !(err.safe_fix_available && err.requires_user_decision),
            "{} sets both flags",
            err.kind
        );
        assert_eq!(err.fix_command.is_some(), err.safe_fix_available, "{}", err.kind);
    }
}

#[test]
fn test_flags_follow_remedy() {
    for rule in RULES.iter() {
        let (_, text) = SAMPLES.iter().find(|(kind, _)| *kind == rule.kind).unwrap();
        let err = classify(text, None).unwrap();
        match rule.remedy {
            Remedy::SafeFix(_) => assert!(err.safe_fix_available),
            Remedy::UserDecision => assert!(err.requires_user_decision),
            Remedy::Informational => {
                assert!(!err.safe_fix_available);
                assert!(!err.requires_user_decision);
            }
        }
        assert_eq!(err.message, rule.message);
    }
}

#[test]
fn test_captured_values_replace_dollar_one() {
    let err = classify(SAMPLES[1].1, None).unwrap();
    assert_eq!(
        err.fix_command.as_deref(),
        Some(r#"git config --global --add safe.directory "/srv/project""#)
    );

    let err = classify(SAMPLES[3].1, None).unwrap();
    assert_eq!(
        err.fix_command.as_deref(),
        Some("git push --set-upstream origin feature/login")
    );
}

#[test]
fn test_empty_capture_leaves_placeholder() {
    let err = classify("dubious ownership in repository at ''", None).unwrap();
    assert!(err.fix_command.unwrap().contains("$1"));
}

#[test]
fn test_remote_exists_uses_url_hint() {
    let context = ErrorContext::new().with_url("git@github.com:o/r.git");
    let err = classify(SAMPLES[2].1, Some(&context)).unwrap();
    assert_eq!(
        err.fix_command.as_deref(),
        Some("git remote set-url origin git@github.com:o/r.git")
    );
}

#[test]
fn test_empty_hint_values_are_not_substituted() {
    let context = ErrorContext::new().with_remote("").with_branch("main");
    let rendered = render_fix_command("git pull {remote} {branch}", None, Some(&context));
    assert_eq!(rendered, "git pull {remote} main");
}

#[test]
fn test_classification_is_pure() {
    let context = ErrorContext::new().with_remote("origin").with_branch("dev");
    for (_, text) in SAMPLES {
        assert_eq!(classify(text, Some(&context)), classify(text, Some(&context)));
    }
}

#[test]
fn test_unrelated_text_has_no_match() {
    for text in ["", "Already up to date.", "Switched to branch 'main'", "warning: LF will be replaced by CRLF"] {
        assert!(classify(text, None).is_none(), "unexpected match for {text:?}");
    }
}

#[test]
fn test_pathspec_wordings_from_add_and_checkout() {
    for text in [
        "fatal: pathspec 'gone.txt' did not match any files",
        "error: pathspec 'gone.txt' did not match any file(s) known to git",
    ] {
        let err = classify(text, None).unwrap();
        assert_eq!(err.kind, ErrorKind::PathspecNotMatch, "{text}");
        assert!(!err.safe_fix_available);
    }
}
