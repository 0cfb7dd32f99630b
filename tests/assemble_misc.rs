use docker_step::{assemble, Context, OsFamily, Pull};

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
fn tmpfs_entries_are_normalized() {
    let args = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_TMPFS_0", "./scratch")]))
        .unwrap()
        .args;
    assert!(has_pair(&args, "--tmpfs", "/work/scratch"));
}

#[test]
fn volumes_and_mounts_merge_and_normalize() {
    let args = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_VOLUMES_0", ".:/app"),
        ("BUILDKITE_PLUGIN_DOCKER_MOUNTS_0", "/data:/data"),
    ]))
    .unwrap()
    .args;
    assert!(has_pair(&args, "--volume", "/work:/app"));
    assert!(has_pair(&args, "--volume", "/data:/data"));
    let new_pos = args.iter().position(|a| a == "/work:/app").unwrap();
    let legacy_pos = args.iter().position(|a| a == "/data:/data").unwrap();
    assert!(new_pos < legacy_pos);
}

#[test]
fn devices_sysctls_and_publish_pass_verbatim() {
    let args = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_DEVICES_0", "/dev/kvm"),
        ("BUILDKITE_PLUGIN_DOCKER_SYSCTLS_0", "net.ipv4.ip_forward=1"),
        ("BUILDKITE_PLUGIN_DOCKER_PUBLISH_0", "8080:80"),
    ]))
    .unwrap()
    .args;
    assert!(has_pair(&args, "--device", "/dev/kvm"));
    assert!(has_pair(&args, "--sysctl", "net.ipv4.ip_forward=1"));
    assert!(has_pair(&args, "--publish", "8080:80"));
}

#[test]
fn tty_and_init_can_be_switched_off() {
    let args = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_TTY", "false"),
        ("BUILDKITE_PLUGIN_DOCKER_INIT", "false"),
    ]))
    .unwrap()
    .args;
    assert!(args.iter().any(|a| a == "-i"));
    assert!(!args.iter().any(|a| a == "-it"));
    assert!(!args.iter().any(|a| a == "--init"));
}

#[test]
fn disabling_checkout_drops_volume_and_workdir() {
    let args = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_MOUNT_CHECKOUT", "false")]))
        .unwrap()
        .args;
    assert!(!args.iter().any(|a| a == "--workdir"));
    assert!(!args.iter().any(|a| a.starts_with("/work:")));
}

#[test]
fn explicit_workdir_applies_to_checkout_and_workdir_flag() {
    let args = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_WORKDIR", "/custom")]))
        .unwrap()
        .args;
    assert!(has_pair(&args, "--volume", "/work:/custom"));
    assert!(has_pair(&args, "--workdir", "/custom"));
}

#[test]
fn explicit_workdir_without_checkout_keeps_the_flag_only() {
    let args = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_WORKDIR", "/custom"),
        ("BUILDKITE_PLUGIN_DOCKER_MOUNT_CHECKOUT", "false"),
    ]))
    .unwrap()
    .args;
    assert!(has_pair(&args, "--workdir", "/custom"));
    assert!(!has_pair(&args, "--volume", "/work:/custom"));
}

#[test]
fn privileged_forces_the_host_user_namespace() {
    let args = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_USERNS", "remapped"),
        ("BUILDKITE_PLUGIN_DOCKER_PRIVILEGED", "true"),
    ]))
    .unwrap()
    .args;
    assert!(has_pair(&args, "--userns", "host"));
    assert!(args.iter().any(|a| a == "--privileged"));
}

#[test]
fn userns_passes_through_when_not_privileged() {
    let args = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_USERNS", "remapped")]))
        .unwrap()
        .args;
    assert!(has_pair(&args, "--userns", "remapped"));
    assert!(!args.iter().any(|a| a == "--privileged"));
}

#[test]
fn runtime_ipc_shm_and_cpus_emit_only_when_configured() {
    let plain = assemble(&ctx(&[])).unwrap().args;
    assert!(!plain.iter().any(|a| a == "--runtime" || a == "--ipc" || a == "--shm-size"));
    assert!(!plain.iter().any(|a| a.starts_with("--cpus")));

    let args = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_RUNTIME", "nvidia"),
        ("BUILDKITE_PLUGIN_DOCKER_IPC", "host"),
        ("BUILDKITE_PLUGIN_DOCKER_SHM_SIZE", "2g"),
        ("BUILDKITE_PLUGIN_DOCKER_CPUS", "1.5"),
    ]))
    .unwrap()
    .args;
    assert!(has_pair(&args, "--runtime", "nvidia"));
    assert!(has_pair(&args, "--ipc", "host"));
    assert!(has_pair(&args, "--shm-size", "2g"));
    assert!(args.iter().any(|a| a == "--cpus=1.5"));
}

#[test]
fn network_lands_in_both_plan_and_args() {
    let plan = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_NETWORK", "ci-net")])).unwrap();
    assert_eq!(plan.network.as_deref(), Some("ci-net"));
    assert!(has_pair(&plan.args, "--network", "ci-net"));
}

#[test]
fn always_pull_defaults_to_three_retries() {
    let plan = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_ALWAYS_PULL", "true")])).unwrap();
    assert_eq!(plan.pull, Some(Pull { retries: 3 }));
}

#[test]
fn pull_retries_can_be_overridden() {
    let plan = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_ALWAYS_PULL", "true"),
        ("BUILDKITE_PLUGIN_DOCKER_PULL_RETRIES", "5"),
    ]))
    .unwrap();
    assert_eq!(plan.pull, Some(Pull { retries: 5 }));
}

#[test]
fn non_numeric_pull_retries_is_fatal() {
    let err = assemble(&ctx(&[
        ("BUILDKITE_PLUGIN_DOCKER_ALWAYS_PULL", "true"),
        ("BUILDKITE_PLUGIN_DOCKER_PULL_RETRIES", "lots"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("pull-retries"));
}

#[test]
fn no_pull_when_always_pull_is_off() {
    let plan = assemble(&ctx(&[("BUILDKITE_PLUGIN_DOCKER_PULL_RETRIES", "5")])).unwrap();
    assert!(plan.pull.is_none());
}
