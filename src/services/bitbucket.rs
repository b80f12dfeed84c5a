use async_trait::async_trait;
use futures::{stream, Stream, TryStreamExt};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Config;
use crate::data::{Comment, MergeOptions, Paged, PullRequest, PullRequestKey};
use crate::error::{Error, Result};

/// Remote operations on a single pull request.
#[async_trait]
pub trait BitbucketApi: Send + Sync {
    async fn get_pull_request(&self, key: &PullRequestKey) -> Result<PullRequest>;

    /// One page of comments. `page` is the `next` link of the previous page,
    /// or `None` for the first page.
    async fn list_comments(&self, key: &PullRequestKey, page: Option<&str>)
        -> Result<Paged<Comment>>;

    async fn decline(&self, key: &PullRequestKey) -> Result<PullRequest>;

    async fn merge(&self, key: &PullRequestKey, options: &MergeOptions) -> Result<PullRequest>;

    async fn approve(&self, key: &PullRequestKey) -> Result<()>;

    async fn unapprove(&self, key: &PullRequestKey) -> Result<()>;

    /// Post a comment and return the id Bitbucket assigned to it.
    async fn add_comment(&self, key: &PullRequestKey, text: &str) -> Result<u64>;

    async fn get_comment(&self, key: &PullRequestKey, comment_id: u64) -> Result<Comment>;
}

// Upper bound on followed `next` links, against servers that never stop paging.
const MAX_PAGES: usize = 50;

/// Every page of a pull request's comments, in server order.
pub fn comment_pages<'a>(
    api: &'a dyn BitbucketApi,
    key: &'a PullRequestKey,
) -> impl Stream<Item = Result<Paged<Comment>>> + Send + 'a {
    // State: (next link, pages fetched, finished)
    stream::try_unfold((None::<String>, 0usize, false), move |(next, fetched, done)| async move {
        if done {
            return Ok(None);
        }
        if fetched >= MAX_PAGES {
            tracing::warn!(%key, "stopped paging comments after {} pages", MAX_PAGES);
            return Ok(None);
        }
        let page = api.list_comments(key, next.as_deref()).await?;
        let following = page.next.clone();
        let finished = following.is_none();
        Ok(Some((page, (following, fetched + 1, finished))))
    })
}

/// All comments of a pull request across every page.
pub async fn fetch_all_comments(
    api: &dyn BitbucketApi,
    key: &PullRequestKey,
) -> Result<Vec<Comment>> {
    comment_pages(api, key)
        .try_fold(Vec::new(), |mut all, page| async move {
            all.extend(page.values);
            Ok(all)
        })
        .await
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    id: u64,
}

/// Bitbucket Cloud 2.0 REST client.
pub struct HttpBitbucketClient {
    http: reqwest::Client,
    api_url: String,
    credentials: Option<(String, String)>,
}

impl HttpBitbucketClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bucketpr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let credentials = match (&config.username, &config.app_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn pull_request_url(&self, key: &PullRequestKey) -> String {
        format!(
            "{}/repositories/{}/{}/pullrequests/{}",
            self.api_url,
            urlencoding::encode(&key.owner),
            urlencoding::encode(&key.repo),
            key.id
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!(%method, url, "bitbucket request");
        let builder = self.http.request(method, url);
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                url: url.to_string(),
            });
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .and_then(|detail| detail.message);
        Err(Error::Api {
            status: status.as_u16(),
            url: url.to_string(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, url: &str) -> Result<T> {
        let response = self.send(self.request(method, url), url).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl BitbucketApi for HttpBitbucketClient {
    async fn get_pull_request(&self, key: &PullRequestKey) -> Result<PullRequest> {
        self.fetch(Method::GET, &self.pull_request_url(key)).await
    }

    async fn list_comments(
        &self,
        key: &PullRequestKey,
        page: Option<&str>,
    ) -> Result<Paged<Comment>> {
        let url = match page {
            Some(next) => next.to_string(),
            None => format!("{}/comments?pagelen=100", self.pull_request_url(key)),
        };
        self.fetch(Method::GET, &url).await
    }

    async fn decline(&self, key: &PullRequestKey) -> Result<PullRequest> {
        let url = format!("{}/decline", self.pull_request_url(key));
        self.fetch(Method::POST, &url).await
    }

    async fn merge(&self, key: &PullRequestKey, options: &MergeOptions) -> Result<PullRequest> {
        let url = format!("{}/merge", self.pull_request_url(key));
        let response = self
            .send(self.request(Method::POST, &url).json(options), &url)
            .await?;
        decode(response).await
    }

    async fn approve(&self, key: &PullRequestKey) -> Result<()> {
        let url = format!("{}/approve", self.pull_request_url(key));
        self.send(self.request(Method::POST, &url), &url).await?;
        Ok(())
    }

    async fn unapprove(&self, key: &PullRequestKey) -> Result<()> {
        let url = format!("{}/approve", self.pull_request_url(key));
        self.send(self.request(Method::DELETE, &url), &url).await?;
        Ok(())
    }

    async fn add_comment(&self, key: &PullRequestKey, text: &str) -> Result<u64> {
        let url = format!("{}/comments", self.pull_request_url(key));
        let body = serde_json::json!({ "content": { "raw": text } });
        let response = self
            .send(self.request(Method::POST, &url).json(&body), &url)
            .await?;
        let created: CreatedComment = decode(response).await?;
        Ok(created.id)
    }

    async fn get_comment(&self, key: &PullRequestKey, comment_id: u64) -> Result<Comment> {
        let url = format!("{}/comments/{}", self.pull_request_url(key), comment_id);
        self.fetch(Method::GET, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Recorded {
        calls: Arc<Mutex<Vec<String>>>,
        base: Arc<Mutex<String>>,
    }

    impl Recorded {
        fn push(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    async fn serve() -> (String, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .route(
                "/repositories/:owner/:repo/pullrequests/:id",
                get(
                    |Path((owner, repo, id)): Path<(String, String, u64)>,
                     headers: HeaderMap,
                     State(rec): State<Recorded>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        rec.push(format!("GET {owner}/{repo}/{id} {auth}"));
                        if id == 404 {
                            return Err(AxumStatus::NOT_FOUND);
                        }
                        Ok(Json(json!({"id": id, "title": "T", "state": "OPEN"})))
                    },
                ),
            )
            .route(
                "/repositories/:owner/:repo/pullrequests/:id/comments",
                get(
                    |Query(q): Query<HashMap<String, String>>,
                     State(rec): State<Recorded>| async move {
                        let page = q.get("page").cloned().unwrap_or_else(|| "1".into());
                        rec.push(format!("COMMENTS page={page}"));
                        let base = rec.base.lock().unwrap().clone();
                        if page == "1" {
                            Json(json!({
                                "values": [{"id": 1, "content": {"raw": "a"}, "created_on": "2020-01-01T00:00:00Z"}],
                                "next": format!("{base}/repositories/team/app/pullrequests/5/comments?page=2")
                            }))
                        } else {
                            Json(json!({
                                "values": [{"id": 2, "content": {"raw": "b"}, "created_on": "2020-01-02T00:00:00Z"}]
                            }))
                        }
                    },
                )
                .post(
                    |State(rec): State<Recorded>, Json(body): Json<Value>| async move {
                        rec.push(format!("POST comment {}", body["content"]["raw"]));
                        Json(json!({"id": 99, "content": body["content"], "created_on": "2020-01-03T00:00:00Z"}))
                    },
                ),
            )
            .route(
                "/repositories/:owner/:repo/pullrequests/:id/approve",
                post(|State(rec): State<Recorded>| async move {
                    rec.push("POST approve");
                    Json(json!({"approved": true}))
                })
                .delete(|State(rec): State<Recorded>| async move {
                    rec.push("DELETE approve");
                    AxumStatus::NO_CONTENT
                }),
            )
            .route(
                "/repositories/:owner/:repo/pullrequests/:id/decline",
                post(|State(rec): State<Recorded>| async move {
                    rec.push("POST decline");
                    (
                        AxumStatus::BAD_REQUEST,
                        Json(json!({"type": "error", "error": {"message": "already declined"}})),
                    )
                }),
            )
            .route(
                "/repositories/:owner/:repo/pullrequests/:id/merge",
                post(
                    |State(rec): State<Recorded>, Json(body): Json<Value>| async move {
                        rec.push(format!("POST merge {body}"));
                        Json(json!({"id": 5, "state": "MERGED"}))
                    },
                ),
            )
            .with_state(recorded.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        *recorded.base.lock().unwrap() = base.clone();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (base, recorded)
    }

    fn client(base: &str) -> HttpBitbucketClient {
        let config = Config {
            api_url: base.to_string(),
            username: Some("alice".into()),
            app_password: Some("secret".into()),
            ..Config::default()
        };
        HttpBitbucketClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn fetches_pull_request_with_basic_auth() {
        let (base, recorded) = serve().await;
        let pr = client(&base)
            .get_pull_request(&PullRequestKey::new("team", "app", 5))
            .await
            .unwrap();
        assert_eq!(pr.id, 5);
        assert_eq!(pr.state.as_deref(), Some("OPEN"));
        let calls = recorded.calls.lock().unwrap().clone();
        // "alice:secret" in base64
        assert_eq!(calls, vec!["GET team/app/5 Basic YWxpY2U6c2VjcmV0"]);
    }

    #[tokio::test]
    async fn missing_pull_request_is_not_found() {
        let (base, _) = serve().await;
        let err = client(&base)
            .get_pull_request(&PullRequestKey::new("team", "app", 404))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn follows_next_links_across_pages() {
        let (base, recorded) = serve().await;
        let api = client(&base);
        let comments = fetch_all_comments(&api, &PullRequestKey::new("team", "app", 5))
            .await
            .unwrap();
        let ids: Vec<u64> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            recorded.calls.lock().unwrap().clone(),
            vec!["COMMENTS page=1", "COMMENTS page=2"]
        );
    }

    #[tokio::test]
    async fn api_errors_carry_server_message() {
        let (base, _) = serve().await;
        let err = client(&base)
            .decline(&PullRequestKey::new("team", "app", 5))
            .await
            .unwrap_err();
        match err {
            Error::Api {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message.as_deref(), Some("already declined"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn approval_and_comment_round_trip() {
        let (base, recorded) = serve().await;
        let api = client(&base);
        let key = PullRequestKey::new("team", "app", 5);

        api.approve(&key).await.unwrap();
        api.unapprove(&key).await.unwrap();
        let id = api.add_comment(&key, "looks good").await.unwrap();
        assert_eq!(id, 99);

        let merged = api
            .merge(
                &key,
                &MergeOptions {
                    close_source_branch: Some(true),
                    ..MergeOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(merged.state.as_deref(), Some("MERGED"));

        assert_eq!(
            recorded.calls.lock().unwrap().clone(),
            vec![
                "POST approve".to_string(),
                "DELETE approve".to_string(),
                "POST comment \"looks good\"".to_string(),
                "POST merge {\"close_source_branch\":true}".to_string(),
            ]
        );
    }
}
