//! Genre resolution from the page's preloaded client state.
//!
//! Article pages embed their rendering state as
//! `window.__PRELOADED_STATE__ = {...};` inside a script. The object's shape
//! differs between page templates, so it is handled as an untyped
//! [`serde_json::Value`] and a list of strategies is tried in order. The
//! first one that yields a non-empty category wins.
//!
//! | Order | Path | Shape |
//! |-------|------|-------|
//! | 1 | `articleDetail.categoryShortName` / `articleDetail.subCategory` | both strings present |
//! | 2 | `pageData.pageParam.cat_path` | `"category,subcategory"` or `"category"` |
//! | 3 | `articleDetail.categoryShortName` | category alone |

use crate::utils::capitalize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static STATE_ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.__PRELOADED_STATE__\s*=\s*").expect("static regex"));

/// A resolved category with an optional subcategory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPath {
    pub category: String,
    pub subcategory: Option<String>,
}

impl CategoryPath {
    /// `"Category"` or `"Category/Subcategory"`, each segment capitalized.
    pub fn to_genre(&self) -> String {
        match &self.subcategory {
            Some(sub) => format!("{}/{}", capitalize(&self.category), capitalize(sub)),
            None => capitalize(&self.category),
        }
    }
}

/// Why no genre could be read from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreMiss {
    /// No `__PRELOADED_STATE__` assignment in the markup.
    NoState,
    /// The assignment was found but did not start with valid JSON.
    Unparseable(String),
    /// The state parsed, but no strategy found a category.
    NoCategory,
}

impl std::fmt::Display for GenreMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenreMiss::NoState => f.write_str("no __PRELOADED_STATE__ in page"),
            GenreMiss::Unparseable(e) => write!(f, "__PRELOADED_STATE__ is not valid JSON: {e}"),
            GenreMiss::NoCategory => f.write_str("__PRELOADED_STATE__ has no category"),
        }
    }
}

type Strategy = fn(&Value) -> Option<CategoryPath>;

/// Strategies in precedence order.
const STRATEGIES: [(&str, Strategy); 3] = [
    ("articleDetail", from_article_detail),
    ("pageData.pageParam.cat_path", from_cat_path),
    ("articleDetail.categoryShortName", from_article_category),
];

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn from_article_detail(state: &Value) -> Option<CategoryPath> {
    let detail = state.get("articleDetail")?;
    Some(CategoryPath {
        category: non_empty_str(detail.get("categoryShortName"))?,
        subcategory: Some(non_empty_str(detail.get("subCategory"))?),
    })
}

/// `"a,b"` and `"a"` resolve; an empty leading or second segment does not.
fn from_cat_path(state: &Value) -> Option<CategoryPath> {
    let cat_path = state
        .get("pageData")?
        .get("pageParam")?
        .get("cat_path")?
        .as_str()?;
    let parts: Vec<&str> = cat_path.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [category] if !category.is_empty() => Some(CategoryPath {
            category: category.to_string(),
            subcategory: None,
        }),
        [category, subcategory, ..] if !category.is_empty() && !subcategory.is_empty() => {
            Some(CategoryPath {
                category: category.to_string(),
                subcategory: Some(subcategory.to_string()),
            })
        }
        _ => None,
    }
}

fn from_article_category(state: &Value) -> Option<CategoryPath> {
    let category = non_empty_str(state.get("articleDetail")?.get("categoryShortName"))?;
    Some(CategoryPath {
        category,
        subcategory: None,
    })
}

/// Pull the preloaded state object out of raw page markup.
///
/// Reads exactly one JSON value after the `=`, so whatever script follows the
/// object is ignored.
pub fn preloaded_state(html: &str) -> Result<Value, GenreMiss> {
    let assignment = STATE_ASSIGNMENT.find(html).ok_or(GenreMiss::NoState)?;
    let rest = &html[assignment.end()..];
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(GenreMiss::Unparseable(e.to_string())),
        None => Err(GenreMiss::Unparseable("empty assignment".to_string())),
    }
}

/// Run the strategies over an already parsed state.
pub fn resolve_category(state: &Value) -> Option<CategoryPath> {
    STRATEGIES.iter().find_map(|&(name, strategy)| {
        let found = strategy(state);
        if let Some(path) = &found {
            debug!(strategy = name, ?path, "Resolved category");
        }
        found
    })
}

/// Genre string for a page, or the reason none could be found.
pub fn resolve_genre(html: &str) -> Result<String, GenreMiss> {
    let state = preloaded_state(html)?;
    resolve_category(&state)
        .map(|path| path.to_genre())
        .ok_or(GenreMiss::NoCategory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_with_state(state: &str) -> String {
        format!(
            "<html><head><script>window.__PRELOADED_STATE__ = {state};\nwindow.__CONFIG__ = {{}};</script></head></html>"
        )
    }

    #[test]
    fn test_article_detail_takes_precedence() {
        let state = json!({
            "articleDetail": { "categoryShortName": "domestic", "subCategory": "politics" },
            "pageData": { "pageParam": { "cat_path": "sports,baseball" } }
        });
        let path = resolve_category(&state).unwrap();
        assert_eq!(path.to_genre(), "Domestic/Politics");
    }

    #[test]
    fn test_cat_path_fallback() {
        let state = json!({ "pageData": { "pageParam": { "cat_path": "Sports,Baseball" } } });
        assert_eq!(resolve_category(&state).unwrap().to_genre(), "Sports/Baseball");
    }

    #[test]
    fn test_cat_path_single_segment() {
        let state = json!({ "pageData": { "pageParam": { "cat_path": "world" } } });
        assert_eq!(resolve_category(&state).unwrap().to_genre(), "World");
    }

    #[test]
    fn test_article_detail_without_subcategory() {
        let state = json!({ "articleDetail": { "categoryShortName": "it" } });
        assert_eq!(resolve_category(&state).unwrap().to_genre(), "It");
    }

    #[test]
    fn test_cat_path_beats_lone_article_category() {
        let state = json!({
            "articleDetail": { "categoryShortName": "domestic" },
            "pageData": { "pageParam": { "cat_path": "sports,baseball" } }
        });
        assert_eq!(resolve_category(&state).unwrap().to_genre(), "Sports/Baseball");
    }

    #[test]
    fn test_lone_article_category_when_cat_path_is_unusable() {
        let state = json!({
            "articleDetail": { "categoryShortName": "domestic" },
            "pageData": { "pageParam": { "cat_path": "a,,b" } }
        });
        assert_eq!(resolve_category(&state).unwrap().to_genre(), "Domestic");
    }

    #[test]
    fn test_cat_path_with_empty_segment_is_no_category() {
        for cat_path in ["a,,b", "a,", ",b"] {
            let state = json!({ "pageData": { "pageParam": { "cat_path": cat_path } } });
            assert!(resolve_category(&state).is_none(), "{cat_path}");
        }
        let html = page_with_state(r#"{"pageData":{"pageParam":{"cat_path":"a,,b"}}}"#);
        assert_eq!(resolve_genre(&html), Err(GenreMiss::NoCategory));
    }

    #[test]
    fn test_wrongly_typed_fields_are_skipped() {
        let state = json!({
            "articleDetail": { "categoryShortName": 42, "subCategory": null },
            "pageData": { "pageParam": ["not", "an", "object"] }
        });
        assert!(resolve_category(&state).is_none());
    }

    #[test]
    fn test_empty_category_falls_through() {
        let state = json!({
            "articleDetail": { "categoryShortName": "", "subCategory": "x" },
            "pageData": { "pageParam": { "cat_path": "life,health" } }
        });
        assert_eq!(resolve_category(&state).unwrap().to_genre(), "Life/Health");
    }

    #[test]
    fn test_resolve_genre_from_markup() {
        let html = page_with_state(
            r#"{"pageData":{"pageParam":{"cat_path":"economy,market"}},"note":"};inside string"}"#,
        );
        assert_eq!(resolve_genre(&html).unwrap(), "Economy/Market");
    }

    #[test]
    fn test_resolve_genre_misses() {
        assert_eq!(
            resolve_genre("<html><script>var x = 1;</script></html>"),
            Err(GenreMiss::NoState)
        );
        assert!(matches!(
            resolve_genre(&page_with_state("{broken")),
            Err(GenreMiss::Unparseable(_))
        ));
        assert_eq!(
            resolve_genre(&page_with_state(r#"{"other":true}"#)),
            Err(GenreMiss::NoCategory)
        );
    }
}
