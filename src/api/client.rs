//! HTTP client for the Shortcut REST API (v3)

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::requests::{
    DocSearch, DocUpdate, IterationUpdate, NewDoc, NewEpic, NewIteration, NewStory, StoryUpdate,
};
use super::{ApiError, SearchPage, Tracker};
use crate::domain::{
    Comment, Doc, DocSummary, Epic, Group, Iteration, Label, Member, Project, Story, StoryTask,
    Workflow,
};

/// Default API root
pub const DEFAULT_API_URL: &str = "https://api.app.shortcut.com/api/v3";

const TOKEN_HEADER: &str = "Shortcut-Token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SEARCH_PAGE_SIZE: &str = "25";

/// The authenticated member and the workspace the token belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentMember {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub mention_name: String,
    pub workspace2: WorkspaceInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceInfo {
    pub url_slug: String,
}

#[derive(Serialize)]
struct TextBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct TaskBody<'a> {
    description: &'a str,
}

#[derive(Serialize)]
struct TaskCompletion {
    complete: bool,
}

/// Authenticated API client
#[derive(Debug, Clone)]
pub struct ShortcutClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ShortcutClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("short-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|_| ApiError::InvalidUrl(raw.clone()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Sends one request and returns the raw response body
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<String, ApiError> {
        let url = self.url(path, query)?;
        tracing::debug!(%method, path, "request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(TOKEN_HEADER, &self.token)
            .headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |source| ApiError::Transport {
            path: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        tracing::debug!(%method, path, status = status.as_u16(), "response");

        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let text = self
            .send(method, path, query, body.as_ref(), HeaderMap::new())
            .await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(Method::GET, path, &[], None).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.call(Method::POST, path, &[], Some(to_body(path, body)?))
            .await
    }

    async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.call(Method::PUT, path, &[], Some(to_body(path, body)?))
            .await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, &[], None, HeaderMap::new())
            .await
            .map(|_| ())
    }

    pub async fn current_member(&self) -> Result<CurrentMember, ApiError> {
        self.get("/member").await
    }

    // Stories

    pub async fn get_story(&self, id: u64) -> Result<Story, ApiError> {
        self.get(&format!("/stories/{}", id)).await
    }

    pub async fn create_story(&self, story: &NewStory) -> Result<Story, ApiError> {
        self.post("/stories", story).await
    }

    pub async fn update_story(&self, id: u64, update: &StoryUpdate) -> Result<Story, ApiError> {
        self.put(&format!("/stories/{}", id), update).await
    }

    pub async fn create_comment(&self, story_id: u64, text: &str) -> Result<Comment, ApiError> {
        self.post(&format!("/stories/{}/comments", story_id), &TextBody { text })
            .await
    }

    pub async fn create_task(
        &self,
        story_id: u64,
        description: &str,
    ) -> Result<StoryTask, ApiError> {
        self.post(&format!("/stories/{}/tasks", story_id), &TaskBody { description })
            .await
    }

    pub async fn update_task(
        &self,
        story_id: u64,
        task_id: u64,
        complete: bool,
    ) -> Result<StoryTask, ApiError> {
        self.put(
            &format!("/stories/{}/tasks/{}", story_id, task_id),
            &TaskCompletion { complete },
        )
        .await
    }

    /// Downloads an attached file
    /// Uploaded-file URLs take the token as a `token` query parameter
    fn file_url(&self, url: &str) -> Result<Url, ApiError> {
        let mut file_url = Url::parse(url).map_err(|_| ApiError::InvalidUrl(url.to_string()))?;
        file_url.query_pairs_mut().append_pair("token", &self.token);
        Ok(file_url)
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let transport = |source| ApiError::Transport {
            path: url.to_string(),
            source,
        };
        let response = self
            .http
            .get(self.file_url(url)?)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                method: Method::GET.to_string(),
                path: url.to_string(),
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(response.bytes().await.map_err(transport)?.to_vec())
    }

    // Epics

    pub async fn get_epic(&self, id: u64) -> Result<Epic, ApiError> {
        self.get(&format!("/epics/{}", id)).await
    }

    pub async fn create_epic(&self, epic: &NewEpic) -> Result<Epic, ApiError> {
        self.post("/epics", epic).await
    }

    // Iterations

    pub async fn get_iteration(&self, id: u64) -> Result<Iteration, ApiError> {
        self.get(&format!("/iterations/{}", id)).await
    }

    pub async fn create_iteration(&self, iteration: &NewIteration) -> Result<Iteration, ApiError> {
        self.post("/iterations", iteration).await
    }

    pub async fn update_iteration(
        &self,
        id: u64,
        update: &IterationUpdate,
    ) -> Result<Iteration, ApiError> {
        self.put(&format!("/iterations/{}", id), update).await
    }

    pub async fn delete_iteration(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/iterations/{}", id)).await
    }

    pub async fn list_iteration_stories(&self, id: u64) -> Result<Vec<Story>, ApiError> {
        self.get(&format!("/iterations/{}/stories", id)).await
    }

    // Docs

    pub async fn list_docs(&self) -> Result<Vec<DocSummary>, ApiError> {
        self.get("/documents").await
    }

    pub async fn search_docs(&self, search: &DocSearch) -> Result<Vec<DocSummary>, ApiError> {
        let page: SearchPage<DocSummary> = self
            .call(Method::GET, "/search/documents", &search.query_pairs(), None)
            .await?;
        Ok(page.data)
    }

    pub async fn get_doc(&self, id: &str, html: bool) -> Result<Doc, ApiError> {
        let query = if html {
            vec![("content_format", "html".to_string())]
        } else {
            Vec::new()
        };
        self.call(Method::GET, &format!("/documents/{}", id), &query, None)
            .await
    }

    pub async fn create_doc(&self, doc: &NewDoc) -> Result<DocSummary, ApiError> {
        self.post("/documents", doc).await
    }

    pub async fn update_doc(&self, id: &str, update: &DocUpdate) -> Result<Doc, ApiError> {
        self.put(&format!("/documents/{}", id), update).await
    }

    pub async fn delete_doc(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/documents/{}", id)).await
    }

    /// Arbitrary request below the API root; fields go in the JSON body for
    /// POST, PUT and PATCH and in the query string otherwise
    pub async fn raw(
        &self,
        method: Method,
        path: &str,
        headers: &[(String, String)],
        fields: &[(String, String)],
    ) -> Result<Value, ApiError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|_| ApiError::InvalidUrl(format!("header name '{}'", name)))?;
            let value = HeaderValue::from_str(value.trim())
                .map_err(|_| ApiError::InvalidUrl(format!("header value '{}'", value)))?;
            header_map.insert(name, value);
        }

        let sends_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);
        let pairs: Vec<(&str, String)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();

        let (query, body) = if sends_body {
            let body: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            (Vec::new(), Some(Value::Object(body)))
        } else {
            (pairs, None)
        };

        let text = self
            .send(method, path, &query, body.as_ref(), header_map)
            .await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn to_body<B: Serialize>(path: &str, body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

impl Tracker for ShortcutClient {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("/projects").await
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, ApiError> {
        self.get("/workflows").await
    }

    async fn list_members(&self) -> Result<Vec<Member>, ApiError> {
        self.get("/members").await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        self.get("/groups").await
    }

    async fn list_epics(&self) -> Result<Vec<Epic>, ApiError> {
        self.get("/epics").await
    }

    async fn list_iterations(&self) -> Result<Vec<Iteration>, ApiError> {
        self.get("/iterations").await
    }

    async fn list_labels(&self) -> Result<Vec<Label>, ApiError> {
        self.get("/labels").await
    }

    async fn list_project_stories(&self, project_id: u64) -> Result<Vec<Story>, ApiError> {
        self.get(&format!("/projects/{}/stories", project_id)).await
    }

    async fn search_stories(
        &self,
        query: &str,
        next: Option<&str>,
    ) -> Result<SearchPage<Story>, ApiError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("page_size", SEARCH_PAGE_SIZE.to_string()),
        ];
        if let Some(cursor) = next {
            params.push(("next", cursor.to_string()));
        }
        self.call(Method::GET, "/search/stories", &params, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ShortcutClient {
        ShortcutClient::new("https://api.example.test/api/v3/", "tok").unwrap()
    }

    #[test]
    fn file_urls_carry_the_token() {
        let url = client()
            .file_url("https://media.example.test/files/abc/report.pdf")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://media.example.test/files/abc/report.pdf?token=tok"
        );

        let with_query = client().file_url("https://media.example.test/f?v=2").unwrap();
        assert_eq!(with_query.as_str(), "https://media.example.test/f?v=2&token=tok");

        assert!(matches!(
            client().file_url("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn urls_are_joined_below_the_api_root() {
        let url = client().url("/stories/12", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.test/api/v3/stories/12");

        let url = client().url("search/stories", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.test/api/v3/search/stories");
    }

    #[test]
    fn query_pairs_are_encoded() {
        let url = client()
            .url("/search/stories", &[("query", "owner:alice state:\"In Progress\"".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/api/v3/search/stories");
        let (_, value) = url.query_pairs().next().unwrap();
        assert_eq!(value, "owner:alice state:\"In Progress\"");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let client = ShortcutClient::new("not a url", "tok").unwrap();
        assert!(matches!(client.url("/x", &[]), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn current_member_decodes_workspace_slug() {
        let member: CurrentMember = serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "name": "Alice Doe",
            "mention_name": "alice",
            "workspace2": {"url_slug": "acme", "estimate_scale": [0, 1, 2]}
        }))
        .unwrap();
        assert_eq!(member.mention_name, "alice");
        assert_eq!(member.workspace2.url_slug, "acme");
    }
}
