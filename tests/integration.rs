use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::process::Output;

use serde_json::{json, Value};

use magik::request::Params;
use magik::{Action, Command, Credentials, Dispatcher, Flags, HttpTransport, MagikError, Mode, Outcome, Transport};

/// Replays canned replies in order and records every call.
#[derive(Default)]
struct ScriptedTransport {
    replies: RefCell<VecDeque<magik::Result<Value>>>,
    calls: RefCell<Vec<(String, Params, Mode)>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<magik::Result<Value>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::default(),
        }
    }

    fn calls(&self) -> Vec<(String, Params, Mode)> {
        self.calls.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, url: &str, params: &Params, mode: Mode) -> magik::Result<Value> {
        self.calls.borrow_mut().push((url.to_string(), params.clone(), mode));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(MagikError::MalformedResponse("no scripted reply left".into())))
    }
}

fn csrf(token: &str) -> magik::Result<Value> {
    Ok(json!({"batchcomplete": "", "query": {"tokens": {"csrftoken": token}}}))
}

fn block_command() -> Command {
    Command::new(Action::Block)
        .target("1.2.3.4")
        .project("enwiki")
        .duration("31hours")
        .reason("spam")
}

#[test]
fn test_block_fetches_token_then_posts() {
    let transport = ScriptedTransport::new(vec![
        csrf("tok1+\\"),
        Ok(json!({"block": {"user": "1.2.3.4", "expiry": "2030-01-01T07:00:00Z", "reason": "Cross-wiki spam"}})),
    ]);

    let report = Dispatcher::new(&transport).run(&block_command()).unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.targets[0].outcome,
        Outcome::Success("1.2.3.4 was blocked until 2030-01-01T07:00:00Z with reason: Cross-wiki spam".into())
    );

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);

    let (url, params, mode) = &calls[0];
    assert_eq!(url, "https://en.wikipedia.org/w/api.php");
    assert_eq!(*mode, Mode::AuthenticatedGet);
    assert_eq!(params.get("type"), Some("csrf"));

    let (url, params, mode) = &calls[1];
    assert_eq!(url, "https://en.wikipedia.org/w/api.php");
    assert_eq!(*mode, Mode::Post);
    assert_eq!(params.get("action"), Some("block"));
    assert_eq!(params.get("token"), Some("tok1+\\"));
    assert_eq!(params.get("reason"), Some("Cross-wiki spam"));
}

#[test]
fn test_each_target_gets_a_fresh_token() {
    let transport = ScriptedTransport::new(vec![
        csrf("first"),
        Ok(json!({"globalblock": {"user": "1.1.1.1", "blocked": "", "expiry": "infinite"}})),
        csrf("second"),
        Ok(json!({"globalblock": {"user": "2.2.2.2", "blocked": "", "expiry": "infinite"}})),
    ]);
    let cmd = Command::new(Action::GBlock)
        .target("1.1.1.1")
        .target("2.2.2.2")
        .duration("forever")
        .reason("proxy");

    let report = Dispatcher::new(&transport).run(&cmd).unwrap();
    assert!(report.is_success());

    let tokens: Vec<String> = transport
        .calls()
        .iter()
        .filter(|(_, _, mode)| *mode == Mode::Post)
        .map(|(_, p, _)| p.get("token").unwrap_or_default().to_string())
        .collect();
    assert_eq!(tokens, vec!["first", "second"]);
    assert!(transport
        .calls()
        .iter()
        .all(|(url, _, _)| url == "https://meta.wikimedia.org/w/api.php"));
}

#[test]
fn test_dry_run_never_touches_transport() {
    let transport = ScriptedTransport::new(vec![]);
    let cmd = block_command().flags(Flags {
        test: true,
        softblock: true,
        ..Flags::default()
    });

    let report = Dispatcher::new(&transport).run(&cmd).unwrap();
    assert!(transport.calls().is_empty());
    assert!(report.is_success());

    let Outcome::Preview(text) = &report.targets[0].outcome else {
        panic!("expected a preview, got {:?}", report.targets[0].outcome);
    };
    assert!(text.starts_with("https://en.wikipedia.org/w/api.php"));
    for needle in ["action", "block", "1.2.3.4", "31hours", "Cross-wiki spam", "allowusertalk", "nocreate"] {
        assert!(text.contains(needle), "missing {needle}");
    }
    assert!(!text.contains("autoblock"));
}

#[test]
fn test_failing_target_does_not_abort_batch() {
    let lock_token = |t: &str| -> magik::Result<Value> {
        Ok(json!({"query": {"tokens": {"setglobalaccountstatustoken": t}}}))
    };
    let transport = ScriptedTransport::new(vec![
        lock_token("t1"),
        Ok(json!({"setglobalaccountstatus": {"user": "One", "locked": "locked"}})),
        Ok(json!({"error": {"code": "mwoauth-invalid-authorization", "info": "Nonce already used"}})),
        lock_token("t3"),
        Ok(json!({"setglobalaccountstatus": {"user": "Three", "locked": "locked"}})),
    ]);
    let cmd = Command::new(Action::Lock)
        .target("One")
        .target("Two")
        .target("Three")
        .reason("lta");

    let report = Dispatcher::new(&transport).run(&cmd).unwrap();
    assert_eq!(report.targets.len(), 3);
    assert_eq!(report.targets[0].outcome, Outcome::Success("One locked.".into()));
    assert!(report.targets[1].outcome.is_failure());
    assert!(report.targets[1].outcome.message().contains("Nonce already used"));
    assert_eq!(report.targets[2].outcome, Outcome::Success("Three locked.".into()));
    assert_eq!(report.failures(), 1);
    assert!(!report.is_success());
    // Two never reached the mutating call.
    assert_eq!(transport.calls().iter().filter(|(_, _, m)| *m == Mode::Post).count(), 2);
}

#[test]
fn test_transport_error_is_isolated() {
    let transport = ScriptedTransport::new(vec![
        csrf("t1"),
        Ok(json!({"unblock": {"user": "A", "reason": "ok"}})),
        Err(MagikError::HttpStatus { status: 503, url: "https://en.wikipedia.org/w/api.php".into() }),
        csrf("t3"),
        Ok(json!({"unblock": {"user": "C", "reason": "ok"}})),
    ]);
    let cmd = Command::new(Action::Unblock)
        .target("A")
        .target("B")
        .target("C")
        .project("enwiki")
        .reason("ok");

    let report = Dispatcher::new(&transport).run(&cmd).unwrap();
    let failed: Vec<&str> = report
        .targets
        .iter()
        .filter(|t| t.outcome.is_failure())
        .map(|t| t.target.as_str())
        .collect();
    assert_eq!(failed, vec!["B"]);
    assert!(report.targets[1].outcome.message().contains("503"));
}

#[test]
fn test_unresolvable_project_fails_targets_without_network() {
    let transport = ScriptedTransport::new(vec![]);
    let cmd = Command::new(Action::Block)
        .target("A")
        .target("B")
        .project("bogus")
        .duration("1day")
        .reason("spam");

    let report = Dispatcher::new(&transport).run(&cmd).unwrap();
    assert_eq!(report.failures(), 2);
    assert!(report.targets[0].outcome.message().contains("Error processing bogus"));
    assert!(transport.calls().is_empty());
}

#[test]
fn test_stale_token_is_retried_once() {
    let transport = ScriptedTransport::new(vec![
        csrf("stale"),
        Ok(json!({"error": {"code": "badtoken", "info": "Invalid CSRF token."}})),
        csrf("fresh"),
        Ok(json!({"block": {"user": "1.2.3.4", "expiry": "infinite", "reason": "Cross-wiki spam"}})),
    ]);

    let report = Dispatcher::new(&transport).run(&block_command()).unwrap();
    assert!(report.is_success());

    let calls = transport.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[3].1.get("token"), Some("fresh"));
}

#[test]
fn test_stale_token_gives_up_after_one_retry() {
    let transport = ScriptedTransport::new(vec![
        csrf("stale"),
        Ok(json!({"error": {"code": "badtoken"}})),
        csrf("also-stale"),
        Ok(json!({"error": {"code": "badtoken"}})),
    ]);

    let report = Dispatcher::new(&transport).run(&block_command()).unwrap();
    assert_eq!(transport.calls().len(), 4);
    let outcome = &report.targets[0].outcome;
    assert!(outcome.is_failure());
    assert!(outcome.message().contains("Try again"));
}

#[test]
fn test_lock_uses_account_status_token_on_meta() {
    let transport = ScriptedTransport::new(vec![
        Ok(json!({"query": {"tokens": {"setglobalaccountstatustoken": "lock+\\"}}})),
        Ok(json!({"setglobalaccountstatus": {"user": "Vandal", "locked": "locked", "hidden": "suppressed"}})),
    ]);
    let cmd = Command::new(Action::Lock)
        .target("Vandal")
        .reason("lta")
        .flags(Flags { hide: true, suppress: true, ..Flags::default() });

    let report = Dispatcher::new(&transport).run(&cmd).unwrap();
    assert_eq!(report.targets[0].outcome, Outcome::Success("Vandal locked.".into()));

    let calls = transport.calls();
    assert_eq!(calls[0].1.get("type"), Some("setglobalaccountstatus"));
    assert_eq!(calls[1].0, "https://meta.wikimedia.org/w/api.php");
    assert_eq!(calls[1].1.get("hidden"), Some("suppressed"));
    assert_eq!(calls[1].1.get("locked"), Some("lock"));
}

#[test]
fn test_invalid_commands_fail_before_network() {
    let transport = ScriptedTransport::new(vec![]);

    let missing = Command::new(Action::Block).target("1.2.3.4").reason("spam");
    let err = Dispatcher::new(&transport).run(&missing).unwrap_err();
    match err {
        MagikError::MissingFields { required, missing, .. } => {
            assert_eq!(required, "target, reason, project, and duration");
            assert_eq!(missing, "project, duration");
        }
        other => panic!("unexpected error: {other}"),
    }

    let mass = Command::new(Action::Mass).target("list.txt");
    let err = Dispatcher::new(&transport).run(&mass).unwrap_err();
    assert!(err.to_string().contains("one target at a time"));

    assert!(transport.calls().is_empty());
}

#[test]
fn test_api_error_translation_through_dispatcher() {
    let transport = ScriptedTransport::new(vec![
        csrf("t"),
        Ok(json!({"error": {"code": "zzz-unknown", "info": "x"}})),
    ]);
    let report = Dispatcher::new(&transport).run(&block_command()).unwrap();
    assert_eq!(
        report.targets[0].outcome,
        Outcome::Failure("Unhandled error: zzz-unknown x".into())
    );
}

fn credentials() -> Credentials {
    Credentials::new("ckey", "csecret", "atoken", "asecret")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_transport_signs_post() {
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/w/api.php"))
        .and(header_exists("authorization"))
        .and(body_string_contains("action=block"))
        .and(body_string_contains("user=1.2.3.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"block": {"user": "1.2.3.4"}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/w/api.php", mock_server.uri());
    let body = tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new(credentials(), "magik-test").unwrap();
        let params = Params::from([("action", "block"), ("user", "1.2.3.4"), ("format", "json")]);
        transport.send(&url, &params, Mode::Post)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(body["block"]["user"], "1.2.3.4");

    let requests = mock_server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap().to_string();
    assert!(auth.starts_with("OAuth "));
    assert!(auth.contains("oauth_consumer_key=\"ckey\""));
    assert!(auth.contains("oauth_signature_method=\"HMAC-SHA1\""));
    assert!(!auth.contains("csecret"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_transport_token_query_is_signed_get() {
    use wiremock::matchers::{header_exists, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "query"))
        .and(query_param("meta", "tokens"))
        .and(query_param("type", "csrf"))
        .and(header_exists("authorization"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"query": {"tokens": {"csrftoken": "abc+\\"}}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = magik::Endpoint::new(format!("{}/w/api.php", mock_server.uri()));
    let token = tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new(credentials(), "magik-test").unwrap();
        magik::token::fetch(&transport, &endpoint, magik::token::TokenType::Csrf)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(token.as_str(), "abc+\\");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_transport_anonymous_get_is_unsigned() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"batchcomplete": ""})))
        .mount(&mock_server)
        .await;

    let url = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new(credentials(), "magik-test").unwrap();
        transport.send(&url, &Params::from([("action", "query")]), Mode::AnonymousGet)
    })
    .await
    .unwrap()
    .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(
        requests[0].headers.get("user-agent").unwrap().to_str().unwrap(),
        "magik-test"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_transport_error_status_is_not_parsed() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("{\"error\": {\"code\": \"x\"}}"))
        .mount(&mock_server)
        .await;

    let url = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new(credentials(), "magik-test").unwrap();
        transport.send(&url, &Params::from([("action", "block")]), Mode::Post)
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(MagikError::HttpStatus { status: 500, .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_transport_rejects_non_json_body() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let url = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let transport = HttpTransport::new(credentials(), "magik-test").unwrap();
        transport.send(&url, &Params::new(), Mode::AuthenticatedGet)
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(MagikError::Json(_))));
}

#[test]
fn test_http_transport_connection_refused() {
    let transport = HttpTransport::new(credentials(), "magik-test").unwrap();
    let result = transport.send("http://127.0.0.1:1/w/api.php", &Params::new(), Mode::Post);
    assert!(matches!(result, Err(MagikError::Transport(_))));
}

fn write_config(dir: &Path, values: [&str; 4]) -> std::path::PathBuf {
    let path = dir.join("magik.toml");
    let content = format!(
        "[consumer]\nconsumer_key = \"{}\"\nconsumer_secret = \"{}\"\naccess_token = \"{}\"\naccess_secret = \"{}\"\n",
        values[0], values[1], values[2], values[3]
    );
    fs::write(&path, content).unwrap();
    path
}

fn magik_command(args: &[&str]) -> std::process::Command {
    let mut command = std::process::Command::new(env!("CARGO_BIN_EXE_magik"));
    command
        .args(args)
        .env_remove("MAGIK_CONFIG")
        .env_remove("MAGIK_CONSUMER_KEY")
        .env_remove("MAGIK_CONSUMER_SECRET")
        .env_remove("MAGIK_ACCESS_TOKEN")
        .env_remove("MAGIK_ACCESS_SECRET");
    command
}

fn run_magik(args: &[&str]) -> Output {
    magik_command(args).output().expect("Failed to run magik")
}

#[test]
fn test_cli_unknown_action() {
    let output = magik_command(&["smite", "-t", "Someone"])
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("Failed to run magik");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim_end(), "Error: I don't know how to 'smite'");
    assert!(!stderr.to_lowercase().contains("backtrace"));
}

#[test]
fn test_cli_mass_is_rejected() {
    let output = run_magik(&["mass", "-t", "list.txt", "-r", "spam"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("one target at a time"));
}

#[test]
fn test_cli_test_action_needs_no_config() {
    let output = run_magik(&["test", "-t", "alice,bob", "-r", "spam", "--config", "/nonexistent/magik.toml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("alice: Cross-wiki spam"));
    assert!(stdout.contains("bob: Cross-wiki spam"));
}

#[test]
fn test_cli_placeholder_credentials_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ["a", "b", "c", "d"]);

    let output = run_magik(&[
        "block", "-t", "1.2.3.4", "-p", "enwiki", "-d", "1day", "-r", "spam", "--test",
        "--config", config.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OAuthConsumerRegistration"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_missing_fields_reported() {
    let output = run_magik(&["block", "-t", "1.2.3.4", "-r", "spam"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Blocks require target, reason, project, and duration"));
}

#[test]
fn test_cli_dry_run_prints_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ["key", "secret", "token", "tokensecret"]);

    let output = run_magik(&[
        "block", "-t", "1.2.3.4", "-p", "enwiki", "-d", "forever", "-r", "spam", "--softblock",
        "--dryrun", "--config", config.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("https://en.wikipedia.org/w/api.php"));
    assert!(stdout.contains("indefinite"));
    assert!(stdout.contains("Cross-wiki spam"));
    assert!(stdout.contains("nocreate"));
    assert!(!stdout.contains("autoblock"));
}

#[test]
fn test_cli_dry_run_bad_project_exits_nonzero_per_target() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ["key", "secret", "token", "tokensecret"]);

    let output = run_magik(&[
        "unblock", "-t", "A", "-t", "B", "-p", "bogus", "-r", "done", "--test",
        "--config", config.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("A: Error processing bogus"));
    assert!(stderr.contains("B: Error processing bogus"));
}
