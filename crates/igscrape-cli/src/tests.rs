use super::*;

#[test]
fn parses_profile_command_with_defaults() {
    let cli = Cli::try_parse_from(["igscrape-cli", "profile", "alice", "@bob"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::Profile {
            usernames,
            concurrency,
            retries,
            backoff_secs,
        } => {
            assert_eq!(usernames, vec!["alice".to_string(), "@bob".to_string()]);
            assert_eq!(concurrency, None);
            assert_eq!(retries, None);
            assert_eq!(backoff_secs, None);
        }
        Commands::Extract { .. } => panic!("expected profile command"),
    }
}

#[test]
fn parses_profile_command_with_overrides() {
    let cli = Cli::try_parse_from([
        "igscrape-cli",
        "profile",
        "alice",
        "--concurrency",
        "3",
        "--retries",
        "2",
        "--backoff-secs",
        "1",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Profile {
            concurrency: Some(3),
            retries: Some(2),
            backoff_secs: Some(1),
            ..
        }
    ));
}

#[test]
fn profile_command_requires_a_username() {
    assert!(Cli::try_parse_from(["igscrape-cli", "profile"]).is_err());
}

#[test]
fn parses_extract_command() {
    let cli = Cli::try_parse_from(["igscrape-cli", "extract", "page.html"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Extract { ref file } if file == &PathBuf::from("page.html")
    ));
}

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["igscrape-cli"]).is_err());
}

#[test]
fn extract_record_reads_saved_page() {
    let html = r#"<script>window._sharedData = {"entry_data":{"ProfilePage":[{"graphql":{"user":{"username":"alice","is_private":true}}}]}};</script>"#;
    let record = profile::extract_record(html).expect("expected a record");
    assert_eq!(record.username.as_deref(), Some("alice"));
    assert!(record.is_private);
}

#[test]
fn failure_line_serializes_kind_and_status() {
    let err = igscrape_scraper::ClassifiedError::not_found("Profile does not exist");
    let line = profile::FailureLine::new("ghost", &err);
    let json = serde_json::to_value(&line).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "username": "ghost",
            "error": "Profile does not exist",
            "kind": "not_found",
            "status": 404
        })
    );
}

fn mock_client(server: &wiremock::MockServer) -> igscrape_scraper::ProfileClient {
    igscrape_scraper::ProfileClient::new(igscrape_scraper::ClientConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        jitter: igscrape_scraper::JitterRange::NONE,
        session: igscrape_scraper::Session::Anonymous,
    })
    .expect("client")
}

#[tokio::test]
async fn fetch_all_prints_every_username_and_fails_if_any_failed() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<script>window._sharedData = {"entry_data":{"ProfilePage":[{"graphql":{"user":{"username":"alice","edge_followed_by":{"count":42}}}}]}};</script>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ghost/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let usernames = vec!["alice".to_string(), "ghost".to_string()];
    let options = profile::FetchOptions {
        concurrency: 2,
        retries: 0,
        backoff_secs: 0,
    };
    let mut out = Vec::new();
    let result = profile::fetch_all(&mock_client(&server), &usernames, options, &mut out).await;

    let err = result.expect_err("one username failed");
    assert_eq!(err.to_string(), "1 of 2 profiles failed");

    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    let alice = lines
        .iter()
        .find(|line| line["username"] == "alice")
        .expect("alice line");
    assert_eq!(alice["follower_count"], 42);

    let ghost = lines
        .iter()
        .find(|line| line["username"] == "ghost")
        .expect("ghost line");
    assert_eq!(ghost["kind"], "not_found");
    assert_eq!(ghost["status"], 404);
}

#[tokio::test]
async fn fetch_all_succeeds_when_every_username_resolves() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<script>window._sharedData = {"entry_data":{"ProfilePage":[{"graphql":{"user":{"username":"bob"}}}]}};</script>"#,
        ))
        .mount(&server)
        .await;

    let options = profile::FetchOptions {
        concurrency: 1,
        retries: 0,
        backoff_secs: 0,
    };
    let mut out = Vec::new();
    profile::fetch_all(&mock_client(&server), &["bob".to_string()], options, &mut out)
        .await
        .expect("all fetched");
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
}
