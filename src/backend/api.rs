use image::DynamicImage;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::io::Cursor;

use super::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://www.sankavollerei.com/comic";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "image", default)]
    pub image_url: String,
    #[serde(rename = "link", default)]
    pub detail_link: String,
    #[serde(rename = "chapter", default)]
    pub latest_chapter: Option<String>,
}

impl CatalogEntry {
    /// Comic slug encoded in the detail link, without the `manga/` segment.
    pub fn slug(&self) -> String {
        self.detail_link
            .replacen("manga/", "", 1)
            .trim_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestPage {
    pub entries: Vec<CatalogEntry>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Genre {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChapterRef {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "chapter", default)]
    pub chapter_number: Option<String>,
}

impl ChapterRef {
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.chapter_number.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicDetail {
    pub title: String,
    pub image_url: String,
    pub synopsis: String,
    pub status: String,
    pub author: String,
    pub kind: String,
    pub genres: Vec<Genre>,
    pub chapters: Vec<ChapterRef>,
}

impl ComicDetail {
    /// Chapters are delivered oldest first; the list view shows them reversed.
    pub fn chapters_newest_first(&self) -> impl Iterator<Item = &ChapterRef> {
        self.chapters.iter().rev()
    }

    pub fn latest_chapter(&self) -> Option<&ChapterRef> {
        self.chapters.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChapterNavigation {
    pub previous_chapter_slug: Option<String>,
    pub next_chapter_slug: Option<String>,
    pub has_chapter_list: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub comic_title: String,
    pub chapter_title: String,
    pub images: Vec<String>,
    pub navigation: ChapterNavigation,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "thumbnail", default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LatestResponse {
    Bare(Vec<CatalogEntry>),
    Paged {
        #[serde(alias = "entries", default)]
        comics: Vec<CatalogEntry>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    has_more: bool,
}

impl From<LatestResponse> for LatestPage {
    fn from(response: LatestResponse) -> Self {
        match response {
            LatestResponse::Bare(entries) => LatestPage {
                entries,
                has_more: false,
            },
            LatestResponse::Paged { comics, pagination } => LatestPage {
                entries: comics,
                has_more: pagination.map(|p| p.has_more).unwrap_or(false),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    synopsis: String,
    #[serde(default)]
    metadata: DetailMetadata,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    chapters: Vec<ChapterRef>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailMetadata {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl From<DetailResponse> for ComicDetail {
    fn from(d: DetailResponse) -> Self {
        ComicDetail {
            title: d.title,
            image_url: d.image,
            synopsis: d.synopsis,
            status: d.metadata.status.unwrap_or_default(),
            author: d.metadata.author.unwrap_or_default(),
            kind: d.metadata.kind.unwrap_or_default(),
            genres: d.genres,
            chapters: d.chapters,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChapterResponse {
    #[serde(default)]
    manga_title: String,
    #[serde(default)]
    chapter_title: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    navigation: Option<NavigationResponse>,
}

#[derive(Debug, Deserialize)]
struct NavigationResponse {
    #[serde(rename = "previousChapter", default)]
    previous_chapter: Option<String>,
    #[serde(rename = "nextChapter", default)]
    next_chapter: Option<String>,
    #[serde(rename = "chapterList", default)]
    chapter_list: serde_json::Value,
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

impl From<ChapterResponse> for ChapterContent {
    fn from(c: ChapterResponse) -> Self {
        let navigation = c
            .navigation
            .map(|n| ChapterNavigation {
                previous_chapter_slug: n.previous_chapter.filter(|s| !s.is_empty()),
                next_chapter_slug: n.next_chapter.filter(|s| !s.is_empty()),
                has_chapter_list: is_truthy(&n.chapter_list),
            })
            .unwrap_or_default();

        ChapterContent {
            comic_title: c.manga_title,
            chapter_title: c.chapter_title,
            images: c.images,
            navigation,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<SearchResult>>,
}

/// The four catalog endpoints, as seen by controllers and views.
pub trait Catalog {
    fn fetch_latest(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<LatestPage, ApiError>> + Send;

    fn fetch_detail(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<ComicDetail, ApiError>> + Send;

    fn fetch_chapter(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<ChapterContent, ApiError>> + Send;

    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchResult>, ApiError>> + Send;
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent(concat!("Komik-TUI/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::transport(&base_url, e))?;

        Ok(Self { http, base_url })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::status(url, status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        log::debug!("GET {}", url);
        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::parse(url, e))
    }

    /// Downloads a page or cover image and decodes it for drawing.
    pub async fn fetch_image(&self, url: &str) -> Result<DynamicImage, ApiError> {
        let bytes = self.get_bytes(url).await?;

        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ApiError::parse(url, e))?
            .decode()
            .map_err(|e| ApiError::parse(url, e))
    }
}

impl Catalog for CatalogClient {
    async fn fetch_latest(&self, page: u32, per_page: u32) -> Result<LatestPage, ApiError> {
        let url = format!(
            "{}/terbaru?page={}&per_page={}",
            self.base_url, page, per_page
        );
        let response: LatestResponse = self.get_json(&url).await?;
        Ok(response.into())
    }

    async fn fetch_detail(&self, slug: &str) -> Result<ComicDetail, ApiError> {
        let url = format!("{}/comic/{}", self.base_url, slug);
        let response: Option<DetailResponse> = self.get_json(&url).await?;
        response
            .map(ComicDetail::from)
            .ok_or_else(|| ApiError::not_found(format!("comic '{slug}'")))
    }

    async fn fetch_chapter(&self, slug: &str) -> Result<ChapterContent, ApiError> {
        // Multi-segment slugs keep their '/' separators.
        let url = format!("{}/chapter/{}", self.base_url, slug);
        let response: Option<ChapterResponse> = self.get_json(&url).await?;
        response
            .map(ChapterContent::from)
            .ok_or_else(|| ApiError::not_found(format!("chapter '{slug}'")))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        );
        let response: SearchResponse = self.get_json(&url).await?;
        Ok(response.data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::error::NetworkCause;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    struct StubServer {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
        shutdown_tx: mpsc::Sender<()>,
        handle: thread::JoinHandle<()>,
    }

    impl StubServer {
        /// Serves `(path prefix, status, body)` routes; first matching prefix wins.
        fn spawn(routes: Vec<(&'static str, u16, &'static str)>) -> Self {
            let server = tiny_http::Server::http("127.0.0.1:0").expect("start stub server");
            let base_url = format!("http://{}", server.server_addr());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);
            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

            let handle = thread::spawn(move || {
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }
                    let request = match server.recv_timeout(Duration::from_millis(50)) {
                        Ok(Some(req)) => req,
                        Ok(None) => continue,
                        Err(_) => break,
                    };

                    let url = request.url().to_string();
                    seen.lock().unwrap().push(url.clone());

                    let (status, body) = routes
                        .iter()
                        .find(|(prefix, _, _)| url.starts_with(prefix))
                        .map(|(_, status, body)| (*status, *body))
                        .unwrap_or((404, "not found"));

                    let mut resp =
                        tiny_http::Response::from_string(body).with_status_code(status);
                    let header = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"application/json"[..],
                    )
                    .expect("content-type header");
                    resp.add_header(header);
                    let _ = request.respond(resp);
                }
            });

            Self {
                base_url,
                requests,
                shutdown_tx,
                handle,
            }
        }

        fn client(&self) -> CatalogClient {
            CatalogClient::new(&self.base_url).unwrap()
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn stop(self) {
            let _ = self.shutdown_tx.send(());
            let _ = self.handle.join();
        }
    }

    #[tokio::test]
    async fn bare_array_listing_is_a_single_final_page() {
        let stub = StubServer::spawn(vec![(
            "/terbaru",
            200,
            r#"[{"title":"A","image":"a.jpg","link":"manga/a/","chapter":"Chapter 3"},
                {"title":"B","image":"b.jpg","link":"manga/b/"}]"#,
        )]);

        let page = stub.client().fetch_latest(1, 20).await.unwrap();
        assert!(!page.has_more);
        let titles: Vec<_> = page.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
        assert_eq!(page.entries[0].latest_chapter.as_deref(), Some("Chapter 3"));
        assert_eq!(page.entries[1].latest_chapter, None);
        assert_eq!(stub.requests(), ["/terbaru?page=1&per_page=20"]);

        stub.stop();
    }

    #[tokio::test]
    async fn paged_listing_reports_has_more_and_keeps_order() {
        let stub = StubServer::spawn(vec![(
            "/terbaru",
            200,
            r#"{"comics":[{"title":"Z","link":"manga/z"},{"title":"Y","link":"manga/y"}],
                "pagination":{"has_more":true}}"#,
        )]);

        let page = stub.client().fetch_latest(2, 10).await.unwrap();
        assert!(page.has_more);
        let titles: Vec<_> = page.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Z", "Y"]);
        assert_eq!(stub.requests(), ["/terbaru?page=2&per_page=10"]);

        stub.stop();
    }

    #[tokio::test]
    async fn entries_key_and_missing_pagination_are_accepted() {
        let stub = StubServer::spawn(vec![(
            "/terbaru",
            200,
            r#"{"entries":[{"title":"Only"}]}"#,
        )]);

        let page = stub.client().fetch_latest(1, 20).await.unwrap();
        assert!(!page.has_more);
        assert_eq!(page.entries.len(), 1);

        stub.stop();
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let stub = StubServer::spawn(vec![("/terbaru", 500, "boom")]);

        let err = stub.client().fetch_latest(1, 20).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Network {
                cause: NetworkCause::Status(500),
                ..
            }
        ));

        stub.stop();
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let stub = StubServer::spawn(vec![("/comic/", 200, "{not json")]);

        let err = stub.client().fetch_detail("x").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));

        stub.stop();
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let client = CatalogClient::new("http://127.0.0.1:1").unwrap();
        let err = client.fetch_latest(1, 20).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Network {
                cause: NetworkCause::Transport(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn detail_is_normalized_and_null_is_not_found() {
        let stub = StubServer::spawn(vec![
            ("/comic/missing", 200, "null"),
            (
                "/comic/solo",
                200,
                r#"{"title":"Solo","image":"s.jpg","synopsis":"...",
                    "metadata":{"status":"Ongoing","author":"Chu","type":"Manhwa"},
                    "genres":[{"name":"Action"},{"name":"Fantasy"}],
                    "chapters":[{"slug":"solo-chapter-1","chapter":"1"},
                                {"slug":"solo-chapter-2","title":"Chapter 2"}]}"#,
            ),
        ]);
        let client = stub.client();

        let detail = client.fetch_detail("solo").await.unwrap();
        assert_eq!(detail.status, "Ongoing");
        assert_eq!(detail.author, "Chu");
        assert_eq!(detail.kind, "Manhwa");
        assert_eq!(detail.genres.len(), 2);
        assert_eq!(detail.chapters[0].label(), "1");
        assert_eq!(detail.latest_chapter().unwrap().slug, "solo-chapter-2");

        let newest: Vec<_> = detail.chapters_newest_first().map(|c| &c.slug).collect();
        assert_eq!(newest, ["solo-chapter-2", "solo-chapter-1"]);
        assert_eq!(detail.chapters[0].slug, "solo-chapter-1");

        let err = client.fetch_detail("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));

        stub.stop();
    }

    #[tokio::test]
    async fn multi_segment_chapter_slug_is_forwarded_intact() {
        let stub = StubServer::spawn(vec![(
            "/chapter/",
            200,
            r#"{"manga_title":"Solo","chapter_title":"Chapter 7",
                "images":["1.jpg","2.jpg"],
                "navigation":{"previousChapter":"solo-chapter-6","nextChapter":"","chapterList":"/comic/solo"}}"#,
        )]);

        let content = stub
            .client()
            .fetch_chapter("solo/solo-chapter-7")
            .await
            .unwrap();
        assert_eq!(stub.requests(), ["/chapter/solo/solo-chapter-7"]);
        assert_eq!(content.images, ["1.jpg", "2.jpg"]);
        assert_eq!(
            content.navigation.previous_chapter_slug.as_deref(),
            Some("solo-chapter-6")
        );
        assert_eq!(content.navigation.next_chapter_slug, None);
        assert!(content.navigation.has_chapter_list);

        stub.stop();
    }

    #[tokio::test]
    async fn empty_search_skips_the_network() {
        let stub = StubServer::spawn(vec![("/search", 200, r#"{"data":[]}"#)]);

        let results = stub.client().search("").await.unwrap();
        assert!(results.is_empty());
        let results = stub.client().search("   ").await.unwrap();
        assert!(results.is_empty());
        assert!(stub.requests().is_empty());

        stub.stop();
    }

    #[tokio::test]
    async fn search_unwraps_data_and_encodes_query() {
        let stub = StubServer::spawn(vec![(
            "/search",
            200,
            r#"{"data":[{"slug":"solo","title":"Solo","thumbnail":"t.jpg","description":"d"}]}"#,
        )]);

        let results = stub.client().search("solo leveling").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].thumbnail_url, "t.jpg");
        assert_eq!(stub.requests(), ["/search?q=solo%20leveling"]);

        stub.stop();
    }

    #[tokio::test]
    async fn search_forwards_the_query_untrimmed() {
        let stub = StubServer::spawn(vec![("/search", 200, r#"{"data":[]}"#)]);

        let results = stub.client().search("  solo ").await.unwrap();
        assert!(results.is_empty());
        assert_eq!(stub.requests(), ["/search?q=%20%20solo%20"]);

        stub.stop();
    }

    #[test]
    fn entry_slug_drops_manga_prefix() {
        let entry = CatalogEntry {
            title: "A".into(),
            image_url: String::new(),
            detail_link: "manga/some-title/".into(),
            latest_chapter: None,
        };
        assert_eq!(entry.slug(), "some-title");
    }
}
