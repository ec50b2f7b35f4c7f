//! Tests for launch strategies.

use super::*;
use crate::error::ExecError;
use std::path::Path;

fn argv(plan: &LaunchPlan) -> Vec<String> {
    plan.command.to_argv()
}

#[test]
fn family_selects_variant() {
    assert!(matches!(
        Launcher::for_family(OsFamily::Unix),
        Launcher::Direct(_)
    ));
    match Launcher::for_family(OsFamily::Windows) {
        Launcher::ShellWrapping(shell) => assert_eq!(shell.shell(), "cmd"),
        other => panic!("expected shell-wrapping launcher, got {:?}", other),
    }
}

#[test]
fn shell_wrapping_without_working_dir_is_unchanged() {
    let launcher = Launcher::for_family(OsFamily::Windows);
    let cmd = CommandSpec::new("test.bat");

    let plan = launcher.prepare(&cmd, None);

    assert_eq!(argv(&plan), ["test.bat"]);
    assert_eq!(plan.working_dir, None);
}

#[test]
fn shell_wrapping_with_working_dir_rewrites_argv() {
    let launcher = Launcher::for_family(OsFamily::Windows);
    let cmd = CommandSpec::new("test.bat");
    let dir = Path::new("/");

    let plan = launcher.prepare(&cmd, Some(dir));
    let expected_dir = std::path::absolute(dir).unwrap();
    let expected_dir = expected_dir.to_string_lossy().into_owned();

    let argv = argv(&plan);
    assert_eq!(argv.len(), 7);
    assert_eq!(
        argv,
        [
            "cmd",
            "/c",
            "cd",
            "/d",
            expected_dir.as_str(),
            "&&",
            "test.bat"
        ]
    );
    assert_eq!(plan.working_dir, None);
}

#[test]
fn shell_wrapping_keeps_argument_boundaries() {
    let launcher = Launcher::ShellWrapping(ShellWrappingLauncher::new("cmd.exe"));
    let cmd = CommandSpec::new("build.bat").args(["--out", "two words", ""]);

    let plan = launcher.prepare(&cmd, Some(Path::new("/")));
    let argv = argv(&plan);

    assert_eq!(argv[0], "cmd.exe");
    assert_eq!(&argv[6..], ["build.bat", "--out", "two words", ""]);
}

#[test]
fn direct_prefers_executable_in_working_dir() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("local-tool"), "#!/bin/sh\n").unwrap();

    let launcher = Launcher::for_family(OsFamily::Unix);
    let plan = launcher.prepare(&CommandSpec::new("local-tool"), Some(temp.path()));

    let expected = std::path::absolute(temp.path().join("local-tool")).unwrap();
    assert_eq!(plan.command.executable(), expected.to_string_lossy());
    assert_eq!(plan.working_dir.as_deref(), Some(temp.path()));
}

#[test]
fn direct_leaves_unknown_names_for_search_path() {
    let temp = tempfile::TempDir::new().unwrap();
    let launcher = Launcher::for_family(OsFamily::Unix);

    let plan = launcher.prepare(&CommandSpec::new("sh").arg("-c"), Some(temp.path()));

    assert_eq!(argv(&plan), ["sh", "-c"]);
}

#[test]
fn direct_leaves_explicit_files_alone() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("tool"), "").unwrap();
    let launcher = Launcher::for_family(OsFamily::Unix);

    let plan = launcher.prepare(&CommandSpec::from_path("tool"), Some(temp.path()));
    assert_eq!(plan.command.executable(), "tool");

    let plan = launcher.prepare(&CommandSpec::new("./tool"), Some(temp.path()));
    assert_eq!(plan.command.executable(), "./tool");
}

#[cfg(unix)]
mod spawn {
    use super::*;
    use serial_test::serial;
    use std::io::Read;
    use std::os::unix::fs::PermissionsExt;

    fn read_stdout(child: &mut std::process::Child) -> String {
        let mut out = String::new();
        child
            .stdout
            .take()
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    #[serial]
    fn launches_cwd_local_executable() {
        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("hello-local");
        std::fs::write(&script, "#!/bin/sh\necho local-wins\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let launcher = Launcher::for_family(OsFamily::Unix);
        let mut child = launcher
            .launch(&CommandSpec::new("hello-local"), None, Some(temp.path()))
            .unwrap();

        drop(child.stdin.take());
        let out = read_stdout(&mut child);
        assert!(child.wait().unwrap().success());
        assert_eq!(out.trim(), "local-wins");
    }

    #[test]
    #[serial]
    fn environment_replaces_inherited_one() {
        let mut env = Environment::new();
        env.insert("RUNEXEC_TEST_VAR".to_string(), "value-42".to_string());

        let launcher = Launcher::for_family(OsFamily::Unix);
        let cmd = CommandSpec::from_path("/bin/sh")
            .arg("-c")
            .arg("echo \"$RUNEXEC_TEST_VAR:${HOME:-unset}\"");
        let mut child = launcher.launch(&cmd, Some(&env), None).unwrap();

        drop(child.stdin.take());
        let out = read_stdout(&mut child);
        child.wait().unwrap();
        assert_eq!(out.trim(), "value-42:unset");
    }

    #[test]
    #[serial]
    fn missing_executable_is_launch_failure() {
        let launcher = Launcher::for_family(OsFamily::Unix);
        let err = launcher
            .launch(&CommandSpec::new("runexec-no-such-binary-xyz"), None, None)
            .unwrap_err();

        match err {
            ExecError::Launch { program, .. } => assert_eq!(program, "runexec-no-such-binary-xyz"),
            other => panic!("expected launch failure, got {:?}", other),
        }
    }
}
