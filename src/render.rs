//! HTML rendering: stage 5 of the build pipeline.
//!
//! Turns every resolved document of one locale into a final HTML page, plus
//! the generated listing pages. Rendering is pure: it reads the resolved
//! tree, the navigation forest and the site context and returns
//! [`Page`]s. Nothing touches the filesystem here.
//!
//! ## Page Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Site title          Docs  Blog  Tags     [search] [en ▾]  │  header
//! ├──────────────┬─────────────────────────────┬──────────────┤
//! │ Introduction │  (untranslated notice)      │ On this page │
//! │ Routing      │  # Routing                  │  Path params │
//! │ User Guide   │  ...                        │  Wildcards   │
//! │   Setup      │                             │              │
//! │   Advanced   │  ← Introduction   Guide →   │              │
//! └──────────────┴─────────────────────────────┴──────────────┘
//!    sidebar            article + prev/next          toc
//! ```
//!
//! ## Generated Pages
//!
//! - **Documents** (`<slug>/index.html`): one per resolved document
//! - **Blog index** (`blog/index.html`): posts newest first
//! - **Tag index** (`tags/index.html`) and **tag pages** (`tags/<tag>/index.html`)
//!
//! An authored document whose slug collides with a generated page wins; the
//! listing is skipped with a warning.
//!
//! ## Links
//!
//! Internal links are rewritten to absolute URLs of the final site
//! (`/pt-BR/guide/setup/#install`) through the same [`LinkResolver`] the
//! validator uses, and heading ids come from [`anchors::extract_headings`],
//! so every anchor the validator accepted exists on the rendered page.
//!
//! Uses [maud](https://maud.lambda.xyz/) for HTML templating. Interpolated
//! text is escaped; only the Markdown output is inserted pre-escaped.

use crate::anchors::{self, Heading};
use crate::config::{self, SiteConfig};
use crate::links::{self, LinkResolver, Resolved};
use crate::locale::{ResolvedDoc, ResolvedTree, TAGS_SLUG, TagGroup, tag_slug};
use crate::nav::{self, NavNode};
use crate::scan::BLOG_SLUG;
use crate::types::{DocKind, Document, slug_url_path};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{CowStr, Event, Parser, Tag, html as md_html};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

const CSS_STATIC: &str = include_str!("../static/style.css");
pub const SEARCH_JS: &str = include_str!("../static/search.js");

/// Deepest heading level listed in the table of contents.
const TOC_MAX_LEVEL: u8 = 3;

/// A rendered page, relative to its locale root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Slug the page is served at.
    pub slug: String,
    /// Output file relative to the locale root (`guide/setup/index.html`).
    pub path: String,
    pub html: String,
}

/// One entry of the language switcher.
#[derive(Debug, Clone)]
pub struct LocaleLink {
    pub code: String,
    pub label: String,
    pub base_path: String,
    /// Slugs the locale serves, so the switcher can fall back to the locale
    /// root for pages that only exist elsewhere.
    pub slugs: Arc<BTreeSet<String>>,
}

impl LocaleLink {
    /// Where switching to this locale from `slug` lands.
    pub fn href(&self, slug: &str) -> String {
        if self.slugs.contains(slug) {
            format!("{}{}", self.base_path, slug_url_path(slug))
        } else {
            self.base_path.clone()
        }
    }
}

/// Site-wide values every page of one locale needs.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub site_title: String,
    /// Site root, where static assets are served from.
    pub site_base: String,
    pub locale: String,
    /// Root URL of this locale (`/` or `/pt-BR/`).
    pub base_path: String,
    /// Label of the default locale, named by the untranslated notice.
    pub default_label: String,
    /// Every declared locale, default first.
    pub locales: Vec<LocaleLink>,
}

impl SiteContext {
    pub fn new(config: &SiteConfig, locale: &str, locales: Vec<LocaleLink>) -> Self {
        let default_label = config
            .ordered_locales()
            .first()
            .map(|l| l.display_label().to_string())
            .unwrap_or_else(|| config.default_locale.clone());
        Self {
            site_title: config.title.clone(),
            site_base: config.base_path.clone(),
            locale: locale.to_string(),
            base_path: config.locale_base_path(locale),
            default_label,
            locales,
        }
    }

    /// Absolute URL of a page of this locale.
    pub fn page_url(&self, slug: &str) -> String {
        format!("{}{}", self.base_path, slug_url_path(slug))
    }

    fn asset_url(&self, path: &str) -> String {
        format!("{}{}", self.site_base, path)
    }
}

/// Every slug a resolved tree serves, generated listings included.
pub fn served_slugs(tree: &ResolvedTree) -> BTreeSet<String> {
    tree.documents
        .keys()
        .cloned()
        .chain(tree.listing_slugs())
        .collect()
}

/// The stylesheet written at each locale root: color variables from the
/// config followed by the embedded base styles.
pub fn stylesheet(config: &SiteConfig) -> String {
    format!("{}\n\n{}", config::generate_color_css(&config.colors), CSS_STATIC)
}

/// Renders pages of one locale.
pub struct Renderer<'a> {
    ctx: &'a SiteContext,
    tree: &'a ResolvedTree,
    nav: &'a [NavNode],
    resolver: LinkResolver<'a>,
}

impl<'a> Renderer<'a> {
    pub fn new(
        ctx: &'a SiteContext,
        tree: &'a ResolvedTree,
        nav: &'a [NavNode],
        assets: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            ctx,
            tree,
            nav,
            resolver: LinkResolver::new(tree, assets),
        }
    }

    /// Every page of the locale: documents in slug order, then listings.
    pub fn render_all(&self) -> Vec<Page> {
        let mut pages: Vec<Page> = self
            .tree
            .documents
            .values()
            .map(|doc| self.render_document(doc))
            .collect();

        let tags = self.tree.tags();
        let listings = self
            .render_blog_index()
            .into_iter()
            .chain((!tags.is_empty()).then(|| self.render_tag_index()))
            .chain(tags.iter().map(|(slug, group)| self.render_tag_page(slug, group)));
        for page in listings {
            if self.tree.contains(&page.slug) {
                warn!(
                    locale = %self.ctx.locale,
                    slug = %page.slug,
                    "Authored page replaces generated listing"
                );
                continue;
            }
            pages.push(page);
        }
        debug!(locale = %self.ctx.locale, pages = pages.len(), "Rendered locale");
        pages
    }

    /// Render one document with layout, sidebar, table of contents and
    /// prev/next links.
    pub fn render_document(&self, resolved: &ResolvedDoc) -> Page {
        let doc = &resolved.doc;
        let headings = anchors::extract_headings(&doc.body);
        let body = self.markdown_to_html(doc, &headings);

        let order = nav::reading_order(self.nav);
        let position = order.iter().position(|slug| *slug == doc.slug);
        let prev = position
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| order.get(i));
        let next = position.and_then(|i| order.get(i + 1));

        let content = html! {
            @if resolved.is_untranslated() {
                div.untranslated-notice role="note" {
                    "This page has not been translated yet and is shown in "
                    (self.ctx.default_label) "."
                }
            }
            article.doc-content {
                @if doc.kind == DocKind::Post {
                    (post_meta(doc, self.ctx))
                }
                (PreEscaped(body))
            }
            @if prev.is_some() || next.is_some() {
                nav.pagination {
                    @if let Some(slug) = prev {
                        a.prev href=(self.ctx.page_url(slug)) rel="prev" {
                            "← " (self.label_for(slug))
                        }
                    }
                    @if let Some(slug) = next {
                        a.next href=(self.ctx.page_url(slug)) rel="next" {
                            (self.label_for(slug)) " →"
                        }
                    }
                }
            }
        };
        let toc = table_of_contents(&headings);
        let html = self.layout(
            &doc.title,
            doc.description.as_deref(),
            &doc.slug,
            content,
            toc,
        );
        Page {
            slug: doc.slug.clone(),
            path: doc.output_path().to_string_lossy().replace('\\', "/"),
            html: html.into_string(),
        }
    }

    /// The blog index, newest first. `None` when the locale has no posts.
    pub fn render_blog_index(&self) -> Option<Page> {
        let posts = self.tree.posts();
        if posts.is_empty() {
            return None;
        }
        let content = html! {
            article.listing {
                h1 { "Blog" }
                ul.post-list {
                    @for post in &posts {
                        li {
                            a href=(self.ctx.page_url(&post.doc.slug)) { (post.doc.title) }
                            (post_meta(&post.doc, self.ctx))
                            @if let Some(description) = &post.doc.description {
                                p.description { (description) }
                            }
                        }
                    }
                }
            }
        };
        Some(self.listing_page(BLOG_SLUG, "Blog", content))
    }

    /// Every tag with its document count.
    pub fn render_tag_index(&self) -> Page {
        let tags = self.tree.tags();
        let content = html! {
            article.listing {
                h1 { "Tags" }
                ul.tag-list {
                    @for (slug, group) in &tags {
                        li {
                            a href=(self.ctx.page_url(slug)) { (group.label) }
                            " (" (group.docs.len()) ")"
                        }
                    }
                }
            }
        };
        self.listing_page(TAGS_SLUG, "Tags", content)
    }

    /// Documents carrying one tag, in slug order.
    pub fn render_tag_page(&self, slug: &str, group: &TagGroup<'_>) -> Page {
        let title = format!("Tagged “{}”", group.label);
        let content = html! {
            article.listing {
                h1 { (title) }
                ul.doc-list {
                    @for resolved in &group.docs {
                        li {
                            a href=(self.ctx.page_url(&resolved.doc.slug)) { (resolved.doc.title) }
                            @if let Some(description) = &resolved.doc.description {
                                p.description { (description) }
                            }
                        }
                    }
                }
                p { a href=(self.ctx.page_url(TAGS_SLUG)) { "All tags" } }
            }
        };
        self.listing_page(slug, &title, content)
    }

    fn listing_page(&self, slug: &str, title: &str, content: Markup) -> Page {
        let html = self.layout(title, None, slug, content, html! {});
        Page {
            slug: slug.to_string(),
            path: format!("{}index.html", slug_url_path(slug)),
            html: html.into_string(),
        }
    }

    fn label_for<'s>(&'s self, slug: &'s str) -> &'s str {
        self.tree
            .get(slug)
            .map(|d| d.doc.nav_label())
            .unwrap_or(slug)
    }

    /// Markdown to HTML with unique heading ids and rewritten links.
    fn markdown_to_html(&self, doc: &Document, headings: &[Heading]) -> String {
        let mut ids = headings.iter().map(|h| h.id.clone());
        let events = Parser::new_ext(&doc.body, anchors::markdown_options()).map(|event| {
            match event {
                Event::Start(Tag::Heading {
                    level,
                    classes,
                    attrs,
                    ..
                }) => Event::Start(Tag::Heading {
                    level,
                    id: ids.next().map(CowStr::from),
                    classes,
                    attrs,
                }),
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => Event::Start(Tag::Link {
                    link_type,
                    dest_url: self.rewrite_url(doc, dest_url),
                    title,
                    id,
                }),
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => Event::Start(Tag::Image {
                    link_type,
                    dest_url: self.rewrite_url(doc, dest_url),
                    title,
                    id,
                }),
                other => other,
            }
        });
        let mut out = String::new();
        md_html::push_html(&mut out, events);
        out
    }

    fn rewrite_url<'e>(&self, doc: &Document, url: CowStr<'e>) -> CowStr<'e> {
        if url.is_empty() || links::is_external(&url) {
            return url;
        }
        match self.resolver.resolve(doc, &url) {
            Ok(Resolved::Page { slug, anchor }) => {
                let mut href = self.ctx.page_url(&slug);
                if let Some(anchor) = anchor {
                    href.push('#');
                    href.push_str(&anchor);
                }
                CowStr::from(href)
            }
            Ok(Resolved::Asset { path }) => CowStr::from(self.ctx.asset_url(&path)),
            Err(_) => url,
        }
    }

    fn layout(
        &self,
        title: &str,
        description: Option<&str>,
        slug: &str,
        content: Markup,
        toc: Markup,
    ) -> Markup {
        let ctx = self.ctx;
        let page_title = if title == ctx.site_title {
            title.to_string()
        } else {
            format!("{title} · {}", ctx.site_title)
        };
        let has_blog = self.tree.documents.values().any(|d| d.doc.kind == DocKind::Post);
        let has_tags = self.tree.documents.values().any(|d| !d.doc.tags.is_empty());

        html! {
            (DOCTYPE)
            html lang=(ctx.locale) {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (page_title) }
                    @if let Some(description) = description {
                        meta name="description" content=(description);
                    }
                    @for locale in &ctx.locales {
                        @if locale.slugs.contains(slug) {
                            link rel="alternate" hreflang=(locale.code) href=(locale.href(slug));
                        }
                    }
                    link rel="stylesheet" href={ (ctx.base_path) "style.css" };
                }
                body {
                    header.site-header {
                        a.site-title href=(ctx.base_path) { (ctx.site_title) }
                        nav.site-links {
                            @if has_blog {
                                a href=(ctx.page_url(BLOG_SLUG)) { "Blog" }
                            }
                            @if has_tags {
                                a href=(ctx.page_url(TAGS_SLUG)) { "Tags" }
                            }
                        }
                        div.search {
                            input #search-input type="search" placeholder="Search" aria-label="Search";
                            ul #search-results {}
                        }
                        (language_switcher(ctx, slug))
                    }
                    div.layout {
                        nav.sidebar aria-label="Documentation" {
                            (render_nav(self.nav, slug, ctx))
                        }
                        main.content {
                            (content)
                        }
                        aside.toc {
                            (toc)
                        }
                    }
                    script src={ (ctx.base_path) "search.js" }
                        data-index={ (ctx.base_path) "search-index.json" } {}
                }
            }
        }
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the sidebar forest, marking the current page and opening the
/// groups that contain it.
pub fn render_nav(nodes: &[NavNode], current: &str, ctx: &SiteContext) -> Markup {
    html! {
        ul {
            @for node in nodes {
                (render_nav_node(node, current, ctx))
            }
        }
    }
}

fn render_nav_node(node: &NavNode, current: &str, ctx: &SiteContext) -> Markup {
    let is_current = node.slug.as_deref() == Some(current);
    let class = match (is_current, node.untranslated) {
        (true, true) => Some("current untranslated"),
        (true, false) => Some("current"),
        (false, true) => Some("untranslated"),
        (false, false) => None,
    };
    let link = html! {
        @match &node.slug {
            Some(slug) => {
                a href=(ctx.page_url(slug)) aria-current=[is_current.then_some("page")] {
                    (node.label)
                }
            }
            None => {
                span.nav-group { (node.label) }
            }
        }
    };

    html! {
        li class=[class] {
            @if node.children.is_empty() {
                (link)
            } @else {
                details open[node.contains(current)] {
                    summary { (link) }
                    (render_nav(&node.children, current, ctx))
                }
            }
        }
    }
}

fn language_switcher(ctx: &SiteContext, slug: &str) -> Markup {
    html! {
        nav.language-switcher aria-label="Language" {
            ul {
                @for locale in &ctx.locales {
                    @let is_current = locale.code == ctx.locale;
                    li class=[is_current.then_some("current")] {
                        a href=(locale.href(slug)) hreflang=(locale.code) lang=(locale.code)
                            aria-current=[is_current.then_some("true")] {
                            (locale.label)
                        }
                    }
                }
            }
        }
    }
}

/// Level 2 and 3 headings. Empty when the page has none.
fn table_of_contents(headings: &[Heading]) -> Markup {
    let entries: Vec<&Heading> = headings
        .iter()
        .filter(|h| (2..=TOC_MAX_LEVEL).contains(&h.level))
        .collect();
    html! {
        @if !entries.is_empty() {
            h2 { "On this page" }
            ul {
                @for heading in entries {
                    li class={ "toc-level-" (heading.level) } {
                        a href={ "#" (heading.id) } { (heading.text) }
                    }
                }
            }
        }
    }
}

fn post_meta(doc: &Document, ctx: &SiteContext) -> Markup {
    html! {
        @if doc.date.is_some() || !doc.tags.is_empty() {
            p.post-meta {
                @if let Some(date) = &doc.date {
                    time datetime=(date) { (date) }
                }
                @for tag in &doc.tags {
                    " "
                    a.tag href=(ctx.page_url(&tag_slug(tag))) { "#" (tag) }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::resolve_tree;
    use crate::nav::build_navigation;
    use crate::test_helpers::*;
    use crate::types::LocaleTree;

    fn context(config: &SiteConfig, locale: &str, trees: &[&ResolvedTree]) -> SiteContext {
        let locales = trees
            .iter()
            .map(|tree| LocaleLink {
                code: tree.locale.clone(),
                label: tree.locale.to_uppercase(),
                base_path: config.locale_base_path(&tree.locale),
                slugs: Arc::new(served_slugs(tree)),
            })
            .collect();
        SiteContext::new(config, locale, locales)
    }

    fn two_locale_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.locales.push(crate::config::LocaleConfig {
            code: "pt-BR".into(),
            label: Some("Português".into()),
        });
        config
    }

    fn scenario() -> (LocaleTree, LocaleTree) {
        let mut en = tree("en", &[("intro", "Intro"), ("routing", "Routing"), ("api", "API")]);
        let mut intro = (**en.documents.get("intro").unwrap()).clone();
        intro.position = Some(1);
        intro.body = "# Intro\n\nSee [routing](./routing.md#params).\n\n## Install\n\n## Setup\n\n## Setup!!\n".into();
        en.documents.insert("intro".into(), Arc::new(intro));
        let mut routing = (**en.documents.get("routing").unwrap()).clone();
        routing.position = Some(2);
        routing.body = "# Routing\n\n## Params\n\n![logo](/img/logo.svg)\n".into();
        en.documents.insert("routing".into(), Arc::new(routing));

        let mut pt = tree("pt-BR", &[("intro", "Introdução")]);
        let mut intro_pt = (**pt.documents.get("intro").unwrap()).clone();
        intro_pt.body = "# Introdução\n\nVeja [rotas](./routing).\n".into();
        pt.documents.insert("intro".into(), Arc::new(intro_pt));
        (en, pt)
    }

    fn render(locale: &str, slug: &str) -> String {
        let (en, pt) = scenario();
        let config = two_locale_config();
        let en_resolved = resolve_tree(&en, &en);
        let pt_resolved = resolve_tree(&en, &pt);
        let ctx = context(&config, locale, &[&en_resolved, &pt_resolved]);
        let tree = if locale == "en" { &en_resolved } else { &pt_resolved };
        let nav = build_navigation(tree);
        let assets: BTreeSet<String> = ["img/logo.svg".to_string()].into();
        let renderer = Renderer::new(&ctx, tree, &nav, &assets);
        renderer.render_document(tree.get(slug).unwrap()).html
    }

    #[test]
    fn heading_ids_are_injected() {
        let html = render("en", "intro");
        assert!(html.contains(r#"<h2 id="install">"#), "{html}");
        assert!(html.contains(r#"<h2 id="setup">"#));
        assert!(html.contains(r#"<h2 id="setup-2">"#));
    }

    #[test]
    fn internal_links_are_rewritten() {
        let html = render("en", "intro");
        assert!(html.contains(r#"href="/routing/#params""#), "{html}");
        let html = render("pt-BR", "intro");
        assert!(html.contains(r#"href="/pt-BR/routing/""#), "{html}");
    }

    #[test]
    fn static_assets_are_served_from_the_site_root() {
        let html = render("pt-BR", "routing");
        assert!(html.contains(r#"src="/img/logo.svg""#), "{html}");
    }

    #[test]
    fn fallback_pages_carry_the_untranslated_notice() {
        assert!(render("pt-BR", "routing").contains("untranslated-notice"));
        assert!(!render("pt-BR", "intro").contains("untranslated-notice"));
        assert!(!render("en", "routing").contains("untranslated-notice"));
    }

    #[test]
    fn sidebar_marks_current_page() {
        let html = render("en", "routing");
        assert!(
            html.contains(r#"<li class="current"><a href="/routing/" aria-current="page">"#),
            "{html}"
        );
    }

    #[test]
    fn language_switcher_lists_every_locale() {
        let html = render("en", "intro");
        assert!(html.contains(r#"href="/intro/" hreflang="en""#), "{html}");
        assert!(html.contains(r#"href="/pt-BR/intro/" hreflang="pt-BR""#), "{html}");
    }

    #[test]
    fn toc_and_pagination() {
        let html = render("en", "routing");
        assert!(html.contains("On this page"));
        assert!(html.contains(r##"href="#params""##));
        assert!(html.contains(r#"rel="prev""#));
        assert!(html.contains("← Intro"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render("pt-BR", "intro"), render("pt-BR", "intro"));
        assert_eq!(render("en", "routing"), render("en", "routing"));
    }

    #[test]
    fn text_is_escaped() {
        let mut en = LocaleTree::empty("en");
        en.documents.insert(
            "x".into(),
            Arc::new(doc("en", "x", "<script>alert('xss')</script>")),
        );
        let config = SiteConfig::default();
        let resolved = resolve_tree(&en, &en);
        let ctx = context(&config, "en", &[&resolved]);
        let nav = build_navigation(&resolved);
        let assets = BTreeSet::new();
        let html = Renderer::new(&ctx, &resolved, &nav, &assets)
            .render_document(resolved.get("x").unwrap())
            .html;
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn listing_pages() {
        let mut en = LocaleTree::empty("en");
        for (slug, date, tags) in [
            ("blog/first", "2024-01-15", &["Release"][..]),
            ("blog/second", "2024-03-01", &["Release", "Routing"][..]),
        ] {
            let mut post = doc("en", slug, slug);
            post.kind = DocKind::Post;
            post.date = Some(date.into());
            post.tags = tags.iter().map(|t| t.to_string()).collect();
            en.documents.insert(slug.into(), Arc::new(post));
        }
        let config = SiteConfig::default();
        let resolved = resolve_tree(&en, &en);
        let ctx = context(&config, "en", &[&resolved]);
        let nav = build_navigation(&resolved);
        let assets = BTreeSet::new();
        let pages = Renderer::new(&ctx, &resolved, &nav, &assets).render_all();

        let paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "blog/first/index.html",
                "blog/second/index.html",
                "blog/index.html",
                "tags/index.html",
                "tags/release/index.html",
                "tags/routing/index.html",
            ]
        );
        let blog = &pages[2].html;
        let second = blog.find("/blog/second/").unwrap();
        let first = blog.find("/blog/first/").unwrap();
        assert!(second < first, "newest post first");
        assert!(pages[3].html.contains("Release</a> (2)"));
    }

    #[test]
    fn authored_page_replaces_listing() {
        let mut en = LocaleTree::empty("en");
        let mut post = doc("en", "blog/only", "Only");
        post.kind = DocKind::Post;
        en.documents.insert("blog/only".into(), Arc::new(post));
        en.documents
            .insert("blog".into(), Arc::new(doc("en", "blog", "Our Blog")));
        let config = SiteConfig::default();
        let resolved = resolve_tree(&en, &en);
        let ctx = context(&config, "en", &[&resolved]);
        let nav = build_navigation(&resolved);
        let assets = BTreeSet::new();
        let pages = Renderer::new(&ctx, &resolved, &nav, &assets).render_all();
        let blog: Vec<&Page> = pages.iter().filter(|p| p.slug == "blog").collect();
        assert_eq!(blog.len(), 1);
        assert!(blog[0].html.contains("Our Blog"));
    }
}
