//! Integration tests for gopt

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn gopt() -> Command {
        cargo_bin_cmd!("gopt")
    }

    /// Isolated config: stub go binary, private cache dir
    fn sandbox() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let go = temp.path().join("go");
        fs::write(&go, "").unwrap();
        let config = temp.path().join("config.toml");
        fs::write(
            &config,
            format!(
                "[install]\ngo = {:?}\n\n[resolver]\ncache_dir = {:?}\nproxy = \"http://127.0.0.1:9\"\n",
                go.display().to_string(),
                temp.path().join("cache").display().to_string()
            ),
        )
        .unwrap();
        (temp, config)
    }

    fn push_varint(out: &mut Vec<u8>, mut value: usize) {
        while value >= 0x80 {
            out.push((value as u8) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
    }

    /// Minimal ELF file carrying Go 1.18+ build info
    fn write_go_binary(path: &Path, package: &str, version: &str) {
        let modinfo = format!("path\t{package}\nmod\t{package}\t{version}\th1:abc=\nbuild\tCGO_ENABLED=0\n");
        let mut wrapped = vec![b'<'; 16];
        wrapped.extend_from_slice(modinfo.as_bytes());
        wrapped.extend_from_slice(&[b'>'; 16]);

        let mut out = b"\x7fELF\x02\x01\x01\x00".to_vec();
        out.resize(64, 0);
        out.extend_from_slice(b"\xff Go buildinf:");
        out.push(8);
        out.push(0x2);
        out.resize(64 + 32, 0);
        push_varint(&mut out, 8);
        out.extend_from_slice(b"go1.22.1");
        push_varint(&mut out, wrapped.len());
        out.extend_from_slice(&wrapped);
        fs::write(path, out).unwrap();
    }

    #[test]
    fn help_displays() {
        gopt()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("up to date"));
    }

    #[test]
    fn version_displays() {
        gopt()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gopt"));
    }

    #[test]
    fn config_path() {
        let (_temp, config) = sandbox();
        gopt()
            .arg("--config")
            .arg(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let (_temp, config) = sandbox();
        gopt()
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[resolver]"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("nested").join("config.toml");
        gopt()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(fs::read_to_string(&config).unwrap().contains("[update]"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        fs::write(&config, "[scan\n").unwrap();
        gopt()
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn update_unknown_name_is_not_found() {
        let (temp, config) = sandbox();
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        write_go_binary(&bin.join("tool"), "github.com/example/tool", "v1.0.0");

        gopt()
            .arg("--config")
            .arg(&config)
            .args(["update", "nonexistent-binary", "--dir"])
            .arg(&bin)
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found \"nonexistent-binary\""));
    }

    #[test]
    fn list_without_lookups() {
        let (temp, config) = sandbox();
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        write_go_binary(&bin.join("tool"), "github.com/example/tool", "v1.0.0");
        fs::write(bin.join("README"), "not a binary").unwrap();

        gopt()
            .arg("--config")
            .arg(&config)
            .args(["list", "--no-latest", "--format", "json", "--dir"])
            .arg(&bin)
            .assert()
            .success()
            .stdout(predicate::str::contains("github.com/example/tool"))
            .stdout(predicate::str::contains("go1.22.1"))
            .stdout(predicate::str::contains("README").not());
    }

    #[test]
    fn list_dev_filter() {
        let (temp, config) = sandbox();
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        write_go_binary(&bin.join("released"), "github.com/example/released", "v1.0.0");
        write_go_binary(&bin.join("local"), "github.com/example/local", "(devel)");

        gopt()
            .arg("--config")
            .arg(&config)
            .args(["list", "--no-latest", "--dev", "yes", "--format", "plain", "--dir"])
            .arg(&bin)
            .assert()
            .success()
            .stdout(predicate::str::contains("local"))
            .stdout(predicate::str::contains("released").not());
    }

    #[test]
    fn list_missing_dir_fails() {
        let (temp, config) = sandbox();
        gopt()
            .arg("--config")
            .arg(&config)
            .args(["list", "--no-latest", "--dir"])
            .arg(temp.path().join("absent"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to scan"));
    }

    #[test]
    fn install_unknown_app_fails() {
        let (_temp, config) = sandbox();
        gopt()
            .arg("--config")
            .arg(&config)
            .args(["install", "no-such-app"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn cache_path_and_clear() {
        let (temp, config) = sandbox();
        gopt()
            .arg("--config")
            .arg(&config)
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache"));

        gopt()
            .arg("--config")
            .arg(&config)
            .args(["cache", "clear"])
            .assert()
            .success();
        assert!(temp.path().join("cache").is_dir());
    }

    #[test]
    fn status_runs() {
        let (_temp, config) = sandbox();
        gopt()
            .arg("--config")
            .arg(&config)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("proxy"));
    }
}
