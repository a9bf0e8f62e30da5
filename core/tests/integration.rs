//! Full posting lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through a ureq-backed `Transport`. Validates that
//! request binding, auth resolution and response parsing agree with an
//! actual server.

use chrono::{TimeZone, Utc};
use mock_server::{DEMO_HOSTNAME, DEMO_PASSWORD, DEMO_SITE_ID, DEMO_USERNAME};
use posterous_core::{
    ApiError, Args, ClientConfig, HttpMethod, HttpRequest, HttpResponse, PosterousClient,
    Transport, TransportError,
};

/// Executes requests with ureq.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the client
/// handle status interpretation.
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match req.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&req.url);
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&req.url);
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&req.url);
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(req.body.as_deref().unwrap_or_default().as_bytes())
            }
        };
        let mut response = result.map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client_for(config: ClientConfig) -> PosterousClient<UreqTransport> {
    PosterousClient::new(config, UreqTransport::new())
}

#[test]
fn posting_lifecycle() {
    let host = start_server();
    let client = client_for(
        ClientConfig::new()
            .host(&host)
            .credentials(DEMO_USERNAME, DEMO_PASSWORD),
    );

    // Step 1: sites need a token, which is fetched once and cached.
    assert!(client.cached_token().is_none());
    let sites = client.get_sites().unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].id, DEMO_SITE_ID);
    assert_eq!(sites[0].full_hostname, DEMO_HOSTNAME);
    let token = client.cached_token().expect("token cached after get_sites");
    client.get_sites().unwrap();
    assert_eq!(client.cached_token(), Some(token));

    // Step 2: create a post with two media entries, tags and a date.
    let date = Utc.with_ymd_and_hms(2010, 3, 7, 9, 5, 2).unwrap();
    let created = client
        .new_post(
            Args::new()
                .arg(DEMO_SITE_ID)
                .arg("Hello")
                .arg("World")
                .kw("media", vec!["a.jpg", "b.jpg"])
                .kw("tags", "rust, api")
                .kw("date", date),
        )
        .unwrap();
    assert_eq!(created.title, "Hello");
    assert_eq!(created.body_full, "World");
    assert_eq!(created.site_id, Some(DEMO_SITE_ID));
    assert_eq!(created.media, vec!["a.jpg", "b.jpg"]);
    assert_eq!(
        created.display_date.as_deref(),
        Some("Sun, 07 Mar 2010 09:05:02 +0000")
    );
    assert_eq!(
        created.tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        vec!["rust", "api"]
    );

    // Step 3: read it back anonymously, by hostname and filtered by tag.
    let posts = client
        .read_posts(Args::new().kw("hostname", DEMO_HOSTNAME).kw("tag", "api"))
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, created.id);

    let short_code = created.full_url.rsplit('/').next().unwrap();
    let fetched = client.get_post(Args::new().arg(short_code)).unwrap();
    assert_eq!(fetched.id, created.id);

    let tags = client.get_tags(Args::new().arg(DEMO_SITE_ID)).unwrap();
    assert_eq!(tags.len(), 2);

    // Step 4: update the title only.
    let updated = client
        .update_post(Args::new().arg(created.id).kw("title", "Changed"))
        .unwrap();
    assert_eq!(updated.title, "Changed");
    assert_eq!(updated.body_full, "World");

    // Step 5: comment with an explicit timestamp.
    let comment = client
        .new_comment(
            Args::new()
                .arg(created.id)
                .arg("Nice")
                .kw("date", date),
        )
        .unwrap();
    assert_eq!(comment.post_id, Some(created.id));
    assert_eq!(comment.body, "Nice");
    assert_eq!(
        comment.created_at.as_deref(),
        Some("Sun, 07 Mar 2010 09:05:02 +0000")
    );

    // Step 6: delete through the token-authenticated path.
    let receipt = client
        .delete_post(Args::new().kw("site_id", DEMO_SITE_ID).kw("post_id", created.id))
        .unwrap();
    assert_eq!(receipt["deleted"], serde_json::json!(true));

    // Step 7: the post is gone.
    let err = client.get_post(Args::new().arg(short_code)).unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[test]
fn twitter_upload_and_post() {
    let host = start_server();
    let client = client_for(ClientConfig::new().host(&host));

    let receipt = client
        .twitter_upload_and_post(
            Args::new()
                .kw("username", "tweeter")
                .kw("password", "hunter2")
                .kw("media", "photo.jpg")
                .kw("message", "look at this"),
        )
        .unwrap();
    assert_eq!(receipt["media"], serde_json::json!(["photo.jpg"]));
    assert_eq!(receipt["tweeted"], serde_json::json!("look at this"));

    let err = client
        .twitter_upload(Args::new().kw("message", "no credentials"))
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[test]
fn wrong_password_surfaces_the_status() {
    let host = start_server();
    let client = client_for(ClientConfig::new().host(&host).credentials(DEMO_USERNAME, "nope"));

    let err = client.get_sites().unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(client.cached_token().is_none());

    let err = client
        .new_post(Args::new().arg(DEMO_SITE_ID).arg("x"))
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[test]
fn missing_credentials_fail_before_sending() {
    let host = start_server();
    let client = client_for(ClientConfig::new().host(&host));

    let err = client.get_sites().unwrap_err();
    assert!(matches!(err, ApiError::Authentication { .. }), "{err}");

    let err = client.new_post(Args::new().arg(DEMO_SITE_ID)).unwrap_err();
    assert!(matches!(err, ApiError::Authentication { .. }), "{err}");
}
