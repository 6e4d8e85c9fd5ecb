#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn cli() -> Command {
        let mut cmd = Command::cargo_bin("appimage2rpm").unwrap();
        // Keep profile lookups away from the developer's own config
        cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("appimage2rpm-cli-tests"));
        cmd
    }

    #[test]
    fn test_help_lists_subcommands() {
        cli()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("convert"))
            .stdout(predicate::str::contains("repo-config"));
    }

    #[test]
    fn test_profiles_lists_builtin_targets() {
        cli()
            .arg("profiles")
            .assert()
            .success()
            .stdout(predicate::str::contains("fedora41"))
            .stdout(predicate::str::contains("rhel9"));
    }

    #[test]
    fn test_detect_prints_a_profile_id() {
        cli()
            .arg("detect")
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }

    #[test]
    fn test_repo_config_for_copr() {
        cli()
            .args(["repo-config", "--kind", "copr", "--name", "someone/demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[copr:someone/demo]"))
            .stdout(predicate::str::contains("results/someone/demo/"));
    }

    #[test]
    fn test_repo_config_rejects_unknown_kind() {
        cli()
            .args(["repo-config", "--kind", "ftp", "--name", "demo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown repository profile"));
    }

    #[test]
    fn test_convert_missing_input_fails() {
        let tmp = tempfile::tempdir().unwrap();
        cli()
            .args(["convert", "--distro", "fedora41", "--no-auto-deps"])
            .arg(tmp.path().join("Missing-1.0.0-x86_64.AppImage"))
            .env("TMPDIR", tmp.path())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("input not found"));
    }

    #[test]
    fn test_convert_directory_flag_rejects_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("app.AppImage");
        std::fs::write(&file, "#!/bin/sh\n").unwrap();
        cli()
            .args(["convert", "--directory"])
            .arg(&file)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("--directory"));
    }
}
