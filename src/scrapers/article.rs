//! Article pages: body text, categories, tags and view count.
//!
//! Rendering goes through [`RetryRender`], so a timeout or transport error is
//! retried with jittered backoff. Once the budget is spent the result is
//! [`Extraction::Failed`], which the pipeline records as the sentinel content
//! and picks up again on the next run.

use super::{compact_text, element_text};
use crate::config::Pacing;
use crate::models::{ArticleContent, Extraction};
use crate::render::{PageRenderer, RenderRequest, RetryRender};
use crate::utils::random_delay;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

/// Paragraphs starting with this are "see also" link lists, not body text.
const SEE_ALSO_MARKER: &str = "อ่านประกอบ";

static CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.desc-content.field_text").unwrap());
static BLOCKS: Lazy<Selector> = Lazy::new(|| Selector::parse("p, blockquote").unwrap());
static CATEGORY_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.flexi.value.field_categories a").unwrap());
static TAG_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.flexi.value.field_tags a").unwrap());
static HITS: Lazy<Selector> = Lazy::new(|| Selector::parse("div.flexi.value.field_hits").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

fn is_see_also(text: &str) -> bool {
    text.starts_with(SEE_ALSO_MARKER)
        || (text.contains(SEE_ALSO_MARKER) && text.replace(SEE_ALSO_MARKER, "").trim().is_empty())
}

/// Parse an article page.
///
/// A page without the body container yields empty content; missing metadata
/// blocks yield empty lists and no view count.
pub fn parse_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let paragraphs: Vec<String> = document
        .select(&CONTENT)
        .next()
        .map(|container| {
            container
                .select(&BLOCKS)
                .map(element_text)
                .filter(|text| !text.is_empty() && !is_see_also(text))
                .collect()
        })
        .unwrap_or_default();

    let content = paragraphs
        .join("\n\n")
        .lines()
        .filter(|line| !line.trim().starts_with(SEE_ALSO_MARKER))
        .join("\n");

    // the first category link is the static breadcrumb label
    let categories = document
        .select(&CATEGORY_LINKS)
        .skip(1)
        .map(compact_text)
        .filter(|c| !c.is_empty())
        .collect();

    let tags = document
        .select(&TAG_LINKS)
        .map(compact_text)
        .filter(|t| !t.is_empty())
        .collect();

    let views = document.select(&HITS).next().and_then(|hits| {
        let raw = compact_text(hits).replace(',', "");
        DIGITS.find(&raw).map(|m| m.as_str().to_string())
    });

    ArticleContent {
        content,
        categories,
        tags,
        views,
    }
}

/// Renders article pages with retry and parses them.
#[derive(Debug)]
pub struct ContentExtractor<R> {
    renderer: RetryRender<R>,
    pacing: Pacing,
}

impl<R: PageRenderer> ContentExtractor<R> {
    pub fn new(renderer: R, pacing: Pacing) -> Self {
        Self {
            renderer: RetryRender::new(renderer, pacing.retry),
            pacing,
        }
    }

    /// Extract `url`, never failing: exhausted retries become [`Extraction::Failed`].
    #[instrument(level = "info", skip(self))]
    pub async fn extract(&self, url: &str) -> Extraction {
        let request = RenderRequest {
            url,
            timeout: self.pacing.navigation_timeout,
            settle: random_delay(&self.pacing.article_settle),
        };

        match self.renderer.render(&request).await {
            Ok(html) => {
                let found = parse_article(&html);
                if found.content.is_empty() {
                    warn!(%url, "Article page has no body text");
                } else {
                    debug!(%url, bytes = found.content.len(), "Parsed article");
                }
                info!(
                    %url,
                    categories = found.categories.len(),
                    tags = found.tags.len(),
                    views = found.views.as_deref().unwrap_or(""),
                    "Extracted article"
                );
                Extraction::Extracted(found)
            }
            Err(e) => Extraction::Failed {
                attempts: self.renderer.max_attempts(),
                error: e.to_string(),
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::article_html;
    use super::*;
    use crate::render::testing::FakeRenderer;

    #[test]
    fn test_parse_article_body_and_metadata() {
        let html = article_html(
            &["ย่อหน้าแรก", "ย่อหน้าที่ <b>สอง</b>"],
            &["การเมือง", "ภาคใต้"],
            &["เลือกตั้ง", "กกต."],
            "อ่าน 12,345 ครั้ง",
        );
        let found = parse_article(&html);
        assert_eq!(found.content, "ย่อหน้าแรก\n\nย่อหน้าที่ สอง");
        assert_eq!(found.categories, vec!["การเมือง", "ภาคใต้"]);
        assert_eq!(found.tags, vec!["เลือกตั้ง", "กกต."]);
        assert_eq!(found.views.as_deref(), Some("12345"));
    }

    #[test]
    fn test_see_also_paragraphs_dropped() {
        let html = article_html(
            &[
                "เนื้อข่าว",
                "อ่านประกอบ: ข่าวเก่า 1",
                "  อ่านประกอบ  ",
                "",
                "ย่อหน้าสุดท้าย",
            ],
            &[],
            &[],
            "",
        );
        let found = parse_article(&html);
        assert_eq!(found.content, "เนื้อข่าว\n\nย่อหน้าสุดท้าย");
    }

    #[test]
    fn test_see_also_lines_inside_paragraph_dropped() {
        let html = article_html(&["บรรทัดหนึ่ง\nอ่านประกอบ: ลิงก์\nบรรทัดสาม"], &[], &[], "");
        let found = parse_article(&html);
        assert_eq!(found.content, "บรรทัดหนึ่ง\nบรรทัดสาม");
    }

    #[test]
    fn test_images_and_quotes() {
        let html = r#"<div class="desc-content field_text">
                        <p><img src="a.jpg"></p>
                        <blockquote>คำพูด</blockquote>
                        <p>ภาพ <img src="b.jpg"> ประกอบ</p>
                      </div>"#;
        let found = parse_article(html);
        assert_eq!(found.content, "คำพูด\n\nภาพ ประกอบ");
    }

    #[test]
    fn test_missing_container_yields_empty_fields() {
        let found = parse_article("<html><body><h1>404</h1></body></html>");
        assert_eq!(found, ArticleContent::default());
    }

    #[test]
    fn test_hits_split_across_spans() {
        let html = article_html(
            &["x"],
            &["<span>ภาค</span><span>ใต้</span>"],
            &[],
            "<span>1</span>,<span>520</span> views",
        );
        let found = parse_article(&html);
        assert_eq!(found.views.as_deref(), Some("1520"));
        assert_eq!(found.categories, vec!["ภาคใต้"]);
    }

    #[test]
    fn test_hits_without_digits() {
        let html = article_html(&["x"], &[], &[], "ไม่ทราบ");
        assert_eq!(parse_article(&html).views, None);
    }

    #[tokio::test]
    async fn test_extract_missing_container_is_not_failure() {
        let url = "https://www.isranews.org/article/x.html";
        let fake = FakeRenderer::new().page(url, "<html><body></body></html>");
        let extractor = ContentExtractor::new(&fake, Pacing::none());
        match extractor.extract(url).await {
            Extraction::Extracted(found) => {
                assert!(found.content.is_empty());
                assert!(found.categories.is_empty());
                assert!(found.tags.is_empty());
                assert!(found.views.is_none());
            }
            other => panic!("expected extraction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_retries_then_succeeds() {
        let url = "https://www.isranews.org/article/y.html";
        let fake = FakeRenderer::new()
            .timeout(url)
            .page(url, article_html(&["ok"], &[], &[], "5"));
        let extractor = ContentExtractor::new(&fake, Pacing::none());
        let result = extractor.extract(url).await;
        assert!(matches!(result, Extraction::Extracted(ref c) if c.content == "ok"));
        assert_eq!(fake.calls_to(url), 2);
    }

    #[tokio::test]
    async fn test_extract_exhausted_budget_is_failed() {
        let url = "https://www.isranews.org/article/z.html";
        let fake = FakeRenderer::new().timeout(url);
        let extractor = ContentExtractor::new(&fake, Pacing::none());
        let result = extractor.extract(url).await;
        assert!(matches!(result, Extraction::Failed { attempts: 2, .. }));
        assert_eq!(fake.calls_to(url), 2);
    }
}
