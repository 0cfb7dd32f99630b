use docker_step::{assemble, Context, OsFamily};

fn ctx(vars: &[(&str, &str)]) -> Context {
    let mut all = vec![
        ("BUILDKITE_PLUGIN_DOCKER_IMAGE", "alpine:3"),
        ("BUILDKITE_PLUGIN_DOCKER_MOUNT_BUILDKITE_AGENT", "false"),
    ];
    all.extend_from_slice(vars);
    Context::new(all, "/work", OsFamily::Other)
}

fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
    args.windows(2).any(|w| w[0] == flag && w[1] == value)
}

#[test]
fn explicit_user_is_passed_through() {
    let args = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_USER", "ci:ci")]))
        .unwrap()
        .args;
    assert!(has_pair(&args, "-u", "ci:ci"));
}

#[test]
fn no_user_flag_by_default() {
    let args = assemble(&ctx(&[])).unwrap().args;
    assert!(!args.iter().any(|a| a == "-u"));
}

#[cfg(unix)]
#[test]
fn propagated_ids_use_the_real_host_uid_gid() {
    use nix::unistd::{getgid, getuid};
    let args = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_PROPAGATE_UID_GID", "true")]))
        .unwrap()
        .args;
    let expected = format!("{}:{}", u32::from(getuid()), u32::from(getgid()));
    assert!(has_pair(&args, "-u", &expected));
}

#[test]
fn user_and_propagation_are_mutually_exclusive() {
    let err = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_USER", "ci"),
        ("BUILDKITE_PLUGIN_DOCKER_PROPAGATE_UID_GID", "true"),
    ]))
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("mutually exclusive"), "unexpected message: {msg}");
}
