use std::fs;
use std::path::Path;

use actionman::build_type::BuildType;
use actionman::error::ActionError;
use actionman::manager::{BuildManager, Command, Options, Outcome};
use actionman::runner::{RecordingRunner, Reply};
use actionman::toolchain::{Generator, Toolchain};

fn toolchain() -> Toolchain {
    Toolchain::new("cmake", "ctest", Generator::Ninja)
}

fn project(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("CMakeLists.txt"),
        format!("cmake_minimum_required(VERSION 3.16)\nproject({name})\nadd_executable({name} main.cpp)\n"),
    )
    .unwrap();
    dir
}

fn manager(dir: &Path, runner: RecordingRunner) -> BuildManager<RecordingRunner> {
    BuildManager::new(dir, runner, toolchain()).unwrap()
}

fn with_type(token: &str) -> Options {
    Options {
        build_type: Some(token.to_string()),
        ..Options::default()
    }
}

#[test]
fn test_build_all_reports_broken_profile_and_keeps_going() {
    let dir = project("Fabric");
    let runner = RecordingRunner::new().on(
        |inv| inv.argv.iter().any(|a| a == "-DCMAKE_BUILD_TYPE=RelWithDebInfo"),
        Reply::exit(1),
    );
    let mgr = manager(dir.path(), runner);

    let outcome = mgr.dispatch(Command::Build, with_type("all")).unwrap();
    let Outcome::Batch(report) = &outcome else {
        panic!("expected a batch report, got {outcome:?}");
    };

    assert_eq!(report.failed_types(), vec![BuildType::Profile]);
    assert!(report.outcome(BuildType::Debug).unwrap().passed);
    assert!(report.outcome(BuildType::Release).unwrap().passed);
    assert_ne!(outcome.exit_code(), 0);

    let release_dir = BuildType::Release.build_dir(mgr.working_dir());
    let release_calls = mgr
        .runner()
        .calls_with(release_dir.to_string_lossy().as_ref());
    assert_eq!(release_calls.len(), 2);
}

#[test]
fn test_bad_build_type_fails_before_any_command() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new());

    for command in [Command::Build, Command::Test, Command::Run, Command::Install] {
        let err = mgr.dispatch(command, with_type("bogus")).unwrap_err();
        assert!(matches!(err, ActionError::InvalidBuildType(ref t) if t == "bogus"));
        assert_eq!(err.exit_code(), 2);
    }
    assert!(mgr.runner().calls().is_empty());
}

#[test]
fn test_run_and_install_reject_all() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new());

    for command in [Command::Run, Command::Install] {
        let err = mgr.dispatch(command, with_type("all")).unwrap_err();
        assert!(err.is_usage_error());
    }
    assert!(mgr.runner().calls().is_empty());
}

#[test]
fn test_missing_working_dir_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = BuildManager::new(&missing, RecordingRunner::new(), toolchain())
        .err()
        .unwrap();
    assert!(matches!(err, ActionError::InvalidWorkingDir(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_build_defaults_to_debug_and_forwards_flags() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new());

    let options = Options {
        flags: vec!["-DENABLE_LOGS=ON".to_string()],
        jobs: Some(3),
        ..Options::default()
    };
    let outcome = mgr.dispatch(Command::Build, options).unwrap();
    assert!(matches!(outcome, Outcome::Built(BuildType::Debug)));

    let calls = mgr.runner().calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].argv.contains(&"-DCMAKE_BUILD_TYPE=Debug".to_string()));
    assert!(calls[0].argv.contains(&"-DENABLE_LOGS=ON".to_string()));
    assert_eq!(calls[1].argv[calls[1].argv.len() - 2..], ["-j", "3"]);
}

#[test]
fn test_single_build_failure_propagates_tool_exit_code() {
    let dir = project("Fabric");
    let runner = RecordingRunner::new()
        .on(|inv| inv.argv.contains(&"--build".to_string()), Reply::exit(4));
    let mgr = manager(dir.path(), runner);

    let err = mgr.dispatch(Command::Build, with_type("release")).unwrap_err();
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_run_returns_program_exit_code() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new().on(
        |inv| inv.program().ends_with("Fabric"),
        Reply::exit(7),
    ));

    let exe = BuildType::Debug
        .build_dir(mgr.working_dir())
        .join(format!("Fabric{}", std::env::consts::EXE_SUFFIX));
    fs::create_dir_all(exe.parent().unwrap()).unwrap();
    fs::write(&exe, "#!/bin/sh\nexit 7\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    }

    let options = Options {
        args: vec!["--answer".to_string(), "42".to_string()],
        ..Options::default()
    };
    let outcome = mgr.dispatch(Command::Run, options).unwrap();
    assert_eq!(outcome.exit_code(), 7);

    let calls = mgr.runner().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].argv[1..], ["--answer", "42"]);
}

#[test]
fn test_test_failure_carries_ctest_code() {
    let dir = project("Fabric");
    let runner = RecordingRunner::new().on(
        |inv| inv.program() == "ctest",
        Reply::stdout(8, "50% tests passed, 1 tests failed out of 2\n"),
    );
    let mgr = manager(dir.path(), runner);

    let options = Options {
        filter: Some("math".to_string()),
        ..with_type("release")
    };
    let err = mgr.dispatch(Command::Test, options).unwrap_err();
    assert!(matches!(
        err,
        ActionError::TestFailure {
            build_type: BuildType::Release,
            code: 8
        }
    ));

    // The release tree was missing, so configure and build ran first.
    let programs: Vec<String> = mgr
        .runner()
        .calls()
        .iter()
        .map(|c| c.program().to_string())
        .collect();
    assert_eq!(programs, ["cmake", "cmake", "ctest"]);
    assert!(mgr.runner().calls_with("-R").len() == 1);
}

#[test]
fn test_install_resolves_relative_prefix() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new());
    fs::create_dir_all(BuildType::Release.build_dir(mgr.working_dir())).unwrap();

    let options = Options {
        prefix: Some("dist".into()),
        ..with_type("release")
    };
    let outcome = mgr.dispatch(Command::Install, options).unwrap();
    assert!(matches!(outcome, Outcome::Installed(BuildType::Release)));

    let calls = mgr.runner().calls();
    assert_eq!(calls.len(), 1);
    let expected = mgr.working_dir().join("dist");
    assert_eq!(calls[0].argv.last().unwrap(), &expected.to_string_lossy());
}

#[test]
fn test_clean_removes_every_variant() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new());
    for bt in BuildType::ALL {
        fs::create_dir_all(bt.build_dir(mgr.working_dir())).unwrap();
    }

    let outcome = mgr.dispatch(Command::Clean, Options::default()).unwrap();
    assert!(matches!(outcome, Outcome::Cleaned(true)));
    assert!(!mgr.working_dir().join("build").exists());
    assert!(mgr.working_dir().join("CMakeLists.txt").exists());
    assert!(mgr.runner().calls().is_empty());
}

#[test]
fn test_build_with_leading_flag_defaults_to_debug() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new());

    let options = Options {
        flags: vec!["-DBAR=1".to_string()],
        ..with_type("-DFOO=ON")
    };
    let outcome = mgr.dispatch(Command::Build, options).unwrap();
    assert!(matches!(outcome, Outcome::Built(BuildType::Debug)));

    let configure = &mgr.runner().calls()[0];
    let tail = &configure.argv[configure.argv.len() - 3..];
    assert_eq!(tail, ["-DCMAKE_BUILD_TYPE=Debug", "-DFOO=ON", "-DBAR=1"]);
}

#[test]
fn test_command_names_route_through_dispatch() {
    let dir = project("Fabric");
    let mgr = manager(dir.path(), RecordingRunner::new());

    let help: Command = "help".parse().unwrap();
    let outcome = mgr.dispatch(help, Options::default()).unwrap();
    assert!(matches!(outcome, Outcome::Help));
    assert_eq!(outcome.exit_code(), 0);

    let err = "deploy".parse::<Command>().unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(mgr.runner().calls().is_empty());
}
