use once_cell::sync::Lazy;
use regex::Regex;

static CHAPTER_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-chapter-\d+.*$").expect("valid chapter suffix regex"));

/// Derives the parent comic slug from a chapter slug by cutting everything
/// from the first `-chapter-<digits>` onwards.
///
/// This is a lexical guess. Slugs that do not follow the
/// `<comic>-chapter-<n>` convention come back unchanged, and a comic whose own
/// slug contains `-chapter-<digits>` yields a truncated parent.
pub fn comic_slug_for_chapter(chapter_slug: &str) -> String {
    CHAPTER_SUFFIX_RE.replacen(chapter_slug, 1, "").into_owned()
}

/// Navigable locations in the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Comic(String),
    /// Chapter slug path; may span several `/`-separated segments.
    Read(String),
    Search(String),
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        let path = path.trim_end_matches('/');

        if path.is_empty() {
            return Some(Route::Home);
        }
        if path == "/search" {
            let q = query
                .into_iter()
                .flat_map(|q| q.split('&'))
                .find_map(|pair| pair.strip_prefix("q="))
                .unwrap_or("");
            let q = urlencoding::decode(&q.replace('+', " "))
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| q.to_string());
            return Some(Route::Search(q));
        }
        if let Some(slug) = path.strip_prefix("/comic/") {
            if !slug.is_empty() && !slug.contains('/') {
                return Some(Route::Comic(slug.to_string()));
            }
            return None;
        }
        if let Some(rest) = path.strip_prefix("/read/") {
            let rest = rest.trim_start_matches('/');
            if !rest.is_empty() {
                return Some(Route::Read(rest.to_string()));
            }
        }
        None
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Comic(slug) => format!("/comic/{slug}"),
            Route::Read(slug) => format!("/read/{slug}"),
            Route::Search(q) => format!("/search?q={}", urlencoding::encode(q)),
        }
    }
}
