//! Integration tests for shellcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
  "resources": {
    "/": "r1",
    "index.html": "r1",
    "main.js": "m1",
    "logo.png": "l1"
  },
  "core": ["index.html", "main.js"]
}"#;

    /// Unreachable origin; every fetch fails fast with connection refused
    const OFFLINE_ORIGIN: &str = "http://127.0.0.1:9";

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new(origin: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let stores = dir.path().join("stores");
            let manifest = dir.path().join("manifest.json");
            std::fs::write(&manifest, MANIFEST).unwrap();
            std::fs::write(
                dir.path().join("config.toml"),
                format!(
                    "[general]\naudit_log = false\n\n[app]\norigin = \"{}\"\nmanifest = \"{}\"\n\n[storage]\ndir = \"{}\"\n",
                    origin,
                    escape(&manifest),
                    escape(&stores)
                ),
            )
            .unwrap();
            Self { dir }
        }

        fn config(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn store(&self, name: &str) -> PathBuf {
            self.dir.path().join("stores").join(name)
        }

        fn cmd(&self) -> Command {
            let mut cmd = shellcache();
            cmd.env("SHELLCACHE_CONFIG", self.config());
            cmd.env_remove("SHELLCACHE_MANIFEST");
            cmd
        }
    }

    fn escape(path: &Path) -> String {
        path.display().to_string().replace('\\', "\\\\")
    }

    fn shellcache() -> Command {
        cargo_bin_cmd!("shellcache")
    }

    /// Serve fixed bodies over HTTP/1.1 on a background thread
    fn serve(routes: HashMap<&'static str, &'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = match routes.get(path.as_str()) {
                    Some(body) => ("200 OK", *body),
                    None => ("404 Not Found", "not found"),
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        origin
    }

    #[test]
    fn help_displays() {
        shellcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline cache manager"));
    }

    #[test]
    fn version_displays() {
        shellcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("shellcache"));
    }

    #[test]
    fn config_path_honors_flag() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        shellcache()
            .args(["config", "path", "--config"])
            .arg(ws.config())
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_applies_overrides() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .args(["config", "show", "--origin", "https://app.example.com"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("[stores]")
                    .and(predicate::str::contains("shellcache-content"))
                    .and(predicate::str::contains("https://app.example.com")),
            );
    }

    #[test]
    fn config_init_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        shellcache()
            .args(["config", "init", "--config"])
            .arg(&path)
            .assert()
            .success();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[network]"));
    }

    #[test]
    fn missing_manifest_reports_hint() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[general]\naudit_log = false\n").unwrap();

        shellcache()
            .env("SHELLCACHE_CONFIG", &config)
            .env_remove("SHELLCACHE_MANIFEST")
            .arg("install")
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("No manifest configured")
                    .and(predicate::str::contains("Hint:")),
            );
    }

    #[test]
    fn invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[general\n").unwrap();

        shellcache()
            .env("SHELLCACHE_CONFIG", &config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn status_on_empty_cache() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(
                predicate::str::contains("missing")
                    .and(predicate::str::contains("absent"))
                    .and(predicate::str::contains("Total: 0 cached, 4 missing")),
            );

        assert!(!ws.store("shellcache-content").exists());
    }

    #[test]
    fn status_json() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        let output = ws.cmd().args(["status", "--format", "json"]).output().unwrap();
        assert!(output.status.success());

        let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(status["record"], "absent");
        assert_eq!(status["missing"].as_array().unwrap().len(), 4);
        assert!(status["cached"].as_array().unwrap().is_empty());
    }

    #[test]
    fn fetch_outside_manifest_passes_through() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .args(["fetch", "http://127.0.0.1:9/api/users"])
            .assert()
            .success()
            .stdout(predicate::str::contains("passthrough"));
    }

    #[test]
    fn fetch_root_offline_without_cache_fails() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .args(["fetch", "http://127.0.0.1:9/"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Fetch failed"));
    }

    #[test]
    fn install_offline_fails() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Fetch failed"));

        assert!(!ws.store("shellcache-content").exists());
    }

    #[test]
    fn activate_without_install_fails() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .arg("activate")
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("no completed install")
                    .and(predicate::str::contains("Hint:")),
            );

        assert!(!ws.store("shellcache-manifest").exists());
    }

    #[test]
    fn install_and_activate_in_separate_runs() {
        let origin = serve(HashMap::from([
            ("/index.html", "<html>index</html>"),
            ("/main.js", "console.log(1)"),
        ]));
        let ws = Workspace::new(&origin);

        ws.cmd().arg("install").assert().success();
        ws.cmd()
            .arg("activate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cold start, cached 2 core resources"));
        assert!(!ws.store("shellcache-staging").exists());
    }

    #[test]
    fn unknown_message_ignored() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .args(["message", "hello"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ignored message"));
    }

    #[test]
    fn clear_with_nothing_stored() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        ws.cmd()
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to clear"));
    }

    #[test]
    fn clear_removes_stores() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        std::fs::create_dir_all(ws.store("shellcache-content")).unwrap();
        std::fs::create_dir_all(ws.store("shellcache-manifest")).unwrap();
        std::fs::create_dir_all(ws.store("unrelated")).unwrap();

        ws.cmd()
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache cleared"));

        assert!(!ws.store("shellcache-content").exists());
        assert!(!ws.store("shellcache-manifest").exists());
        assert!(ws.store("unrelated").exists());
    }

    #[test]
    fn clear_without_yes_keeps_stores() {
        let ws = Workspace::new(OFFLINE_ORIGIN);
        std::fs::create_dir_all(ws.store("shellcache-content")).unwrap();

        ws.cmd()
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not cleared"));

        assert!(ws.store("shellcache-content").exists());
    }

    #[test]
    fn deploy_then_serve_from_cache() {
        let origin = serve(HashMap::from([
            ("/", "<html>root</html>"),
            ("/index.html", "<html>index</html>"),
            ("/main.js", "console.log(1)"),
            ("/logo.png", "png"),
        ]));
        let ws = Workspace::new(&origin);

        ws.cmd()
            .arg("deploy")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cold start, cached 2 core resources"));
        assert!(!ws.store("shellcache-staging").exists());

        let output = ws.cmd().args(["status", "--format", "json"]).output().unwrap();
        let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(status["record"], "current");
        assert_eq!(status["cached"], serde_json::json!(["index.html", "main.js"]));

        let body = ws.dir.path().join("main.js");
        ws.cmd()
            .args(["fetch", &format!("{}/main.js", origin), "--output"])
            .arg(&body)
            .assert()
            .success()
            .stdout(predicate::str::contains("source: cache"));
        assert_eq!(std::fs::read_to_string(&body).unwrap(), "console.log(1)");

        ws.cmd()
            .args(["fetch", &format!("{}/logo.png", origin)])
            .assert()
            .success()
            .stdout("png");

        ws.cmd()
            .arg("download-offline")
            .assert()
            .success()
            .stdout(predicate::str::contains("Downloaded 1 resources"));

        ws.cmd()
            .arg("download-offline")
            .assert()
            .success()
            .stdout(predicate::str::contains("All resources already cached"));

        // Second deploy of the same manifest keeps everything
        ws.cmd()
            .arg("deploy")
            .assert()
            .success()
            .stdout(predicate::str::contains("Kept 4, evicted 0"));
    }
}
