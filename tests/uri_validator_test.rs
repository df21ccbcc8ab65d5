use code_structure_service::core::error::PipelineError;
use code_structure_service::core::uri::{is_git_uri, validate_uri, INVALID_URI_REASON};

#[test]
fn accepts_git_locations() {
    for uri in [
        "git@example.com:u/r.git",
        "https://github.com/zohaib194/CodebaseVisualizer3D.git",
        "ssh://git@host:2222/team/repo.git",
        "/var/mirrors/repo.git",
        "my repo.git",
        ".git",
    ] {
        assert!(is_git_uri(uri), "{uri}");
    }
}

#[test]
fn rejects_everything_else() {
    for uri in ["", "not-a-repo", "https://example.com/r.git/", "repo.git ", "r.gitx", "repo.GIT"] {
        assert!(!is_git_uri(uri), "{uri:?}");
    }
}

#[test]
fn rejection_carries_the_fixed_reason() {
    let err = validate_uri("not-a-repo").unwrap_err();
    match err {
        PipelineError::Validation(reason) => assert_eq!(reason, INVALID_URI_REASON),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(validate_uri("git@example.com:u/r.git").unwrap(), "git@example.com:u/r.git");
}
