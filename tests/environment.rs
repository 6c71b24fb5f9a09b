//! End-to-end runs through `run_hook`, which reads its configuration from the
//! process environment. Kept in its own test binary, as a single test, so no
//! other test observes the mutated environment.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::thread;

use codeb_hook::config::{Config, SOCKET_PATH_ENV};
use codeb_hook::eval::context::PROJECT_ENV;

fn set_var(key: &str, value: &Path) {
    // SAFETY: this binary runs a single test; nothing else reads the env concurrently.
    unsafe {
        std::env::set_var(key, value);
    }
}

fn envelope(command: &str) -> String {
    serde_json::json!({ "tool_name": "Bash", "tool_input": { "command": command } }).to_string()
}

fn decision_of(output: &str) -> serde_json::Value {
    let value: serde_json::Value = serde_json::from_str(output).unwrap();
    value["hookSpecificOutput"].clone()
}

#[test]
fn run_hook_reads_configuration_from_environment() {
    let home = tempfile::tempdir().unwrap();
    let socket = home.path().join("run/protection.sock");
    std::fs::create_dir_all(home.path().join("run")).unwrap();

    // User overlay points elsewhere; the environment override wins.
    let overlay_dir = home.path().join(".config/codeb-hook");
    std::fs::create_dir_all(&overlay_dir).unwrap();
    std::fs::write(
        overlay_dir.join("config.toml"),
        "[settings]\nsocket_path = \"/nonexistent/overlay.sock\"\nsocket_timeout_ms = 750\n",
    )
    .unwrap();

    set_var("HOME", home.path());
    set_var(SOCKET_PATH_ENV, &socket);
    set_var(PROJECT_ENV, Path::new("shop"));

    // ── Config::load ──

    let config = Config::load();
    assert_eq!(Path::new(&config.settings.socket_path), socket.as_path());
    assert_eq!(config.settings.socket_timeout_ms, 750);
    assert!(config.settings.audit_log_path().starts_with(home.path()));

    // ── No service at the overridden path: Safe Mode ──

    assert_eq!(codeb_hook::run_hook(&envelope("make deploy")), None);

    let out = codeb_hook::run_hook(&envelope("podman volume rm pgdata")).unwrap();
    let hso = decision_of(&out);
    assert_eq!(hso["permissionDecision"], "deny");
    assert!(
        hso["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .starts_with("direct volume removal is forbidden")
    );

    // Project from the environment drives isolation.
    let out = codeb_hook::run_hook(&envelope("podman stop codeb-billing-web")).unwrap();
    assert_eq!(decision_of(&out)["permissionDecision"], "deny");
    assert_eq!(codeb_hook::run_hook(&envelope("podman stop codeb-shop-web")), None);

    let audit = std::fs::read_to_string(home.path().join(".codeb/hook-audit.log")).unwrap();
    assert_eq!(audit.lines().count(), 2);

    // ── Service listening at the overridden path decides ──

    let listener = UnixListener::bind(&socket).unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut request = String::new();
        BufReader::new(stream.try_clone().unwrap())
            .read_line(&mut request)
            .unwrap();
        let mut stream = stream;
        stream
            .write_all(b"{\"allowed\": false, \"reason\": \"deploy freeze\"}\n")
            .unwrap();
        request
    });

    let out = codeb_hook::run_hook(&envelope("make deploy")).unwrap();
    let request: serde_json::Value = serde_json::from_str(server.join().unwrap().trim()).unwrap();
    let hso = decision_of(&out);
    assert_eq!(hso["permissionDecision"], "deny");
    assert_eq!(hso["permissionDecisionReason"], "deploy freeze");
    assert_eq!(request["context"]["projectName"], "shop");
}
