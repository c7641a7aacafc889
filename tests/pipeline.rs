//! End-to-end runs against mocked provider and issue APIs.
//!
//! Each test gets its own temp directory for the automation output and feed
//! files, and its own `MockServer`.

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tourwatch::{App, Config, NotifyOutcome, Provider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 20, 9, 0, 0).unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tourwatch_pipeline_{name}"));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config(server: &MockServer, dir: &Path) -> Config {
    Config {
        api_key: Some("test-key".to_string()),
        events_base_url: Some(server.uri()),
        output_path: Some(dir.join("github_output")),
        feed_path: dir.join("concerts.xml"),
        feed_base_url: Some("https://feeds.example.com".to_string()),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

fn tm_body(events: &[(&str, &str, &str)]) -> String {
    let events: Vec<_> = events
        .iter()
        .map(|(date, venue, url)| {
            serde_json::json!({
                "url": url,
                "dates": {"start": {"localDate": date}},
                "_embedded": {"venues": [{
                    "name": venue,
                    "city": {"name": "Y"},
                    "country": {"countryCode": "Z"}
                }]}
            })
        })
        .collect();
    serde_json::json!({"_embedded": {"events": events}}).to_string()
}

async fn mount_artist(server: &MockServer, artist: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/events.json"))
        .and(query_param("keyword", artist))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn artists(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_no_artists_gives_nothing_found_and_empty_feed() {
    let server = MockServer::start().await;
    let dir = temp_dir("empty");

    let app = App::new(config(&server, &dir)).unwrap();
    let report = app.run(&[], now()).await.unwrap();

    assert_eq!(
        report.digest,
        "No upcoming concerts in Europe found for your followed artists this week."
    );
    assert_eq!(report.title, "Weekly Concert Alert (Europe): 2024-04-20");
    assert!(report.feed_written);

    let xml = std::fs::read_to_string(dir.join("concerts.xml")).unwrap();
    let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
    assert!(feed.entries.is_empty());

    let output = std::fs::read_to_string(dir.join("github_output")).unwrap();
    assert_eq!(
        output,
        "issue_title=Weekly Concert Alert (Europe): 2024-04-20\n\
issue_body<<EOF\n\
No upcoming concerts in Europe found for your followed artists this week.\n\
EOF\n"
    );
}

#[tokio::test]
async fn test_failure_for_one_artist_does_not_hide_others() {
    let server = MockServer::start().await;
    let dir = temp_dir("partial");

    mount_artist(&server, "Broken", 500, String::new()).await;
    mount_artist(&server, "Quiet", 200, r#"{"page": {}}"#.to_string()).await;
    mount_artist(
        &server,
        "Loud",
        200,
        tm_body(&[
            ("2024-09-01", "Late Hall", "http://late"),
            ("2024-05-01", "X", "http://t"),
        ]),
    )
    .await;

    let app = App::new(config(&server, &dir)).unwrap();
    let report = app
        .run(&artists(&["Broken", "Quiet", "Loud"]), now())
        .await
        .unwrap();

    assert_eq!(report.failed_artists, vec!["Broken".to_string()]);
    assert!(report.concerts.get("Broken").is_none());
    assert_eq!(report.concerts.get("Quiet"), Some(&[][..]));

    // Digest keeps provider order within an artist
    assert_eq!(
        report.digest,
        "Here are the upcoming shows in Europe for your followed bands:\n\n\
## Loud\n\
- **2024-09-01** - Late Hall in Y, Z ([See Tickets](http://late))\n\
- **2024-05-01** - X in Y, Z ([See Tickets](http://t))\n\n"
    );

    // Feed is sorted by date
    let xml = std::fs::read_to_string(dir.join("concerts.xml")).unwrap();
    let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
    let links: Vec<_> = feed
        .entries
        .iter()
        .map(|e| e.links[0].href.as_str())
        .collect();
    assert_eq!(links, vec!["http://t", "http://late"]);
    assert!(matches!(report.notification, NotifyOutcome::Disabled));
}

#[tokio::test]
async fn test_notification_uses_country_pass() {
    let server = MockServer::start().await;
    let dir = temp_dir("notify");

    // Region-wide pass
    Mock::given(method("GET"))
        .and(path("/events.json"))
        .and(query_param("countryCode", "DE,NL"))
        .respond_with(ResponseTemplate::new(200).set_body_string(tm_body(&[
            ("2024-05-01", "Berlin Arena", "http://de"),
            ("2024-05-03", "Ziggo Dome", "http://nl"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    // Country-only pass for the issue
    Mock::given(method("GET"))
        .and(path("/events.json"))
        .and(query_param("countryCode", "NL"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(tm_body(&[("2024-05-03", "Ziggo Dome", "http://nl")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/concerts/issues"))
        .and(wiremock::matchers::body_partial_json(serde_json::json!({
            "title": "Weekly Concert Alert (NL): 2024-04-20"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "number": 12,
            "html_url": "https://github.com/octo/concerts/issues/12"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        country_filter: Some(vec!["NL".to_string(), "DE".to_string()]),
        notify_token: Some("ghp_test".to_string()),
        notify_target: Some("octo/concerts".to_string()),
        notify_country: Some("nl".to_string()),
        notify_api_url: server.uri(),
        ..config(&server, &dir)
    };

    let app = App::new(config).unwrap();
    let report = app.run(&artists(&["Band"]), now()).await.unwrap();

    assert_eq!(report.concerts.total_events(), 2);
    match report.notification {
        NotifyOutcome::Created(issue) => assert_eq!(issue.number, 12),
        other => panic!("Expected Created, got {:?}", other),
    }
}

#[tokio::test]
async fn test_notification_failure_keeps_outputs() {
    let server = MockServer::start().await;
    let dir = temp_dir("notify_fail");

    mount_artist(&server, "Band", 200, tm_body(&[("2024-05-01", "X", "http://t")])).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;

    let config = Config {
        notify_token: Some("bad".to_string()),
        notify_target: Some("octo/concerts".to_string()),
        notify_api_url: server.uri(),
        ..config(&server, &dir)
    };

    let app = App::new(config).unwrap();
    let report = app.run(&artists(&["Band"]), now()).await.unwrap();

    assert!(matches!(report.notification, NotifyOutcome::Failed(_)));
    assert!(report.feed_written);
    assert!(dir.join("github_output").exists());
}

#[tokio::test]
async fn test_without_notifications_skips_post() {
    let server = MockServer::start().await;
    let dir = temp_dir("no_notify");

    mount_artist(&server, "Band", 200, tm_body(&[])).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        notify_token: Some("t".to_string()),
        notify_target: Some("octo/concerts".to_string()),
        notify_api_url: server.uri(),
        ..config(&server, &dir)
    };

    let app = App::new(config).unwrap().without_notifications();
    let report = app.run(&artists(&["Band"]), now()).await.unwrap();
    assert!(matches!(report.notification, NotifyOutcome::Disabled));
}

#[tokio::test]
async fn test_bandsintown_default_config_is_worldwide() {
    let server = MockServer::start().await;
    let dir = temp_dir("bandsintown");

    Mock::given(method("GET"))
        .and(path("/artists/Aurora/events"))
        .and(query_param("app_id", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"datetime": "2024-05-01T19:00:00", "url": "http://us",
                 "venue": {"name": "MSG", "city": "New York", "country": "United States"}}]"#,
        ))
        .mount(&server)
        .await;

    let config = Config {
        provider: Provider::Bandsintown,
        output_path: None,
        ..config(&server, &dir)
    };

    let app = App::new(config).unwrap();
    let report = app.run(&artists(&["Aurora"]), now()).await.unwrap();

    assert_eq!(report.title, "Weekly Concert Alert: 2024-04-20");
    assert_eq!(
        report.digest,
        "Here are the upcoming shows for your followed bands:\n\n\
## Aurora\n\
- **2024-05-01** - MSG in New York, United States ([See Tickets](http://us))\n\n"
    );
}

#[test]
fn test_bandsintown_with_country_filter_is_rejected() {
    let config = Config {
        provider: Provider::Bandsintown,
        api_key: Some("test-key".to_string()),
        country_filter: Some(vec!["DE".to_string()]),
        ..Config::default()
    };
    let err = App::new(config).err().unwrap();
    assert!(err.to_string().contains("country_filter"));
}

#[test]
fn test_missing_credential_is_fatal_before_network() {
    let err = App::new(Config::default()).err().unwrap();
    assert!(err.to_string().contains("TICKETMASTER_API_KEY"));
}
