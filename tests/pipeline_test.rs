use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kindling::{
    ContentBlock, DomainRule, DomainRules, Error, ExternalExtractor, ExtractionCandidate, Pipeline,
    PipelineConfig, RawDocument, Source, StrategyKind,
};
use url::Url;

const MINIMAL: &str = "<html><head><title>T</title></head><body><article>\
    <p>Hello world, this is a sufficiently long paragraph of text.</p>\
    </article></body></html>";

const NEWS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Rivers are rising | Daily Example</title>
  <meta name="author" content="Jo Rivera">
  <meta property="article:published_time" content="2024-03-05T08:00:00Z">
</head>
<body>
  <header><nav><a href="/">Home</a> <a href="/world">World</a> <a href="/sport">Sport</a></nav></header>
  <div class="sidebar"><a href="/popular">Most popular story one</a><a href="/x">Another link</a></div>
  <main>
    <article>
      <h1>Rivers are rising</h1>
      <p>Heavy rain across the valley pushed the river above its banks on Monday night,
         flooding low-lying streets and closing two bridges.</p>
      <p>Officials said the water level would peak by Wednesday, and urged residents near
         the embankment to move valuables to upper floors.</p>
      <img src="/images/flood.jpg" alt="Flooded street">
      <h2>What comes next</h2>
      <p>Engineers will inspect the bridges once the water recedes, a process expected to take
         at least a week.</p>
      <div class="share-buttons"><a href="/share">Share this article</a></div>
    </article>
  </main>
  <footer>Copyright 2024 Daily Example. All rights reserved.</footer>
  <script>trackPageView();</script>
</body>
</html>"#;

fn web(url: &str) -> Source {
    Source::web(url).unwrap()
}

fn raw(html: &str, url: &str) -> RawDocument {
    RawDocument::parse(html, url).unwrap()
}

#[test]
fn test_minimal_article_end_to_end() {
    let source = web("https://example.com/post");
    let ebook = Pipeline::default()
        .extract(&source, &raw(MINIMAL, "https://example.com/post"))
        .unwrap();

    assert_eq!(ebook.metadata.title, "T");
    assert_eq!(ebook.chapters.len(), 1);
    assert_eq!(ebook.spine.len(), 1);

    let extracted = Pipeline::default()
        .process(&source, &raw(MINIMAL, "https://example.com/post"))
        .unwrap();
    assert_eq!(
        extracted.article.blocks,
        vec![ContentBlock::Paragraph {
            text: "Hello world, this is a sufficiently long paragraph of text.".into()
        }]
    );
    assert_eq!(extracted.strategy, StrategyKind::Generic);
    assert!(extracted.confidence > 0.0);
}

#[test]
fn test_news_page_keeps_article_only() {
    let url = "https://www.dailyexample.com/news/rivers";
    let extracted = Pipeline::default()
        .process(&web(url), &raw(NEWS_PAGE, url))
        .unwrap();
    let article = extracted.article;

    assert_eq!(article.title.as_deref(), Some("Rivers are rising"));
    assert_eq!(article.author.as_deref(), Some("Jo Rivera"));
    assert!(article.published.is_some());
    assert_eq!(article.source_url.as_ref().map(Url::as_str), Some(url));

    let text = article.to_text();
    assert!(text.contains("Heavy rain across the valley"));
    assert!(text.contains("What comes next"));
    for chrome in ["Home", "Most popular", "Share this article", "Copyright", "trackPageView"] {
        assert!(!text.contains(chrome), "{chrome} leaked into {text}");
    }

    // The h1 repeats the title and is dropped; the image resolves against the page.
    assert!(matches!(&article.blocks[0], ContentBlock::Paragraph { .. }));
    assert!(article.blocks.contains(&ContentBlock::Image {
        src: "https://www.dailyexample.com/images/flood.jpg".into(),
        alt: "Flooded street".into(),
    }));
}

#[test]
fn test_images_without_bytes_are_not_hot_linked() {
    let url = "https://www.dailyexample.com/news/rivers";
    let ebook = Pipeline::default()
        .extract(&web(url), &raw(NEWS_PAGE, url))
        .unwrap();
    assert!(ebook.resources.is_empty());
    assert!(!ebook.chapters[0].body.contains("flood.jpg"));
    assert_eq!(ebook.metadata.author, "Jo Rivera");
}

#[test]
fn test_domain_rule_beats_generic() {
    let html = "<html><body>\
        <div class='story'><p>Short but chosen by the site rule, which knows best.</p></div>\
        <div class='other'><p>A much longer block of text that the generic heuristic would \
        probably prefer over the story container because it simply has more words in it, \
        many more words, sentence after sentence.</p></div></body></html>";
    let rules = DomainRules::new().with_rule(
        DomainRule::new("example.org")
            .with_content_selector("div.story")
            .unwrap(),
    );
    let pipeline = Pipeline::default().with_rules(rules);
    let extracted = pipeline
        .process(&web("https://example.org/a"), &raw(html, "https://example.org/a"))
        .unwrap();

    assert_eq!(extracted.strategy, StrategyKind::DomainSpecific);
    assert!((extracted.confidence - 0.9).abs() < f32::EPSILON);
    assert_eq!(extracted.article.blocks.len(), 1);
    assert!(extracted.article.to_text().contains("chosen by the site rule"));
}

struct CountingExtractor {
    calls: AtomicUsize,
}

impl ExternalExtractor for CountingExtractor {
    fn extract(&self, _html: &str, _base_url: &Url) -> Option<ExtractionCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(ExtractionCandidate::from_html(
            "<p>External extractor text that is long enough to count.</p>",
            0.99,
            StrategyKind::External,
        ))
    }
}

#[test]
fn test_external_only_consulted_below_threshold() {
    let external = Arc::new(CountingExtractor {
        calls: AtomicUsize::new(0),
    });
    let html = "<div class='story'><p>Site rule text that is long enough to be kept.</p></div>";
    let rules = DomainRules::new().with_rule(
        DomainRule::new("example.org")
            .with_content_selector("div.story")
            .unwrap(),
    );
    let pipeline = Pipeline::default()
        .with_rules(rules)
        .with_external(external.clone());

    let extracted = pipeline
        .process(&web("https://example.org/a"), &raw(html, "https://example.org/a"))
        .unwrap();
    assert_eq!(extracted.strategy, StrategyKind::DomainSpecific);
    assert_eq!(external.calls.load(Ordering::SeqCst), 0);

    // No rule for this host, and the generic score stays under a strict threshold.
    let strict = Pipeline::new(PipelineConfig::default().with_acceptance_threshold(1.0))
        .with_external(external.clone());
    let extracted = strict
        .process(&web("https://example.net/b"), &raw(html, "https://example.net/b"))
        .unwrap();
    assert_eq!(external.calls.load(Ordering::SeqCst), 1);
    assert_eq!(extracted.strategy, StrategyKind::External);
}

#[test]
fn test_navigation_only_page_fails() {
    let html = "<html><body><nav><a href='/'>Home</a> <a href='/about'>About us</a></nav>\
                <footer>Copyright 2024 Example Corp. All rights reserved.</footer></body></html>";
    let err = Pipeline::default()
        .extract(&web("https://example.com/"), &raw(html, "https://example.com/"))
        .unwrap_err();
    assert!(matches!(err, Error::ExtractionFailed));
    assert!(err.is_recoverable());
}

#[test]
fn test_split_chapters_from_config() {
    let html = "<article><h2>Part one</h2><p>The first part of the story is told here.</p>\
                <h2>Part two</h2><p>The second part of the story follows on.</p></article>";
    let pipeline = Pipeline::new(PipelineConfig::default().with_split_chapters(true));
    let ebook = pipeline
        .extract(&web("https://example.com/s"), &raw(html, "https://example.com/s"))
        .unwrap();
    assert_eq!(ebook.chapters.len(), 2);
    let titles: Vec<&str> = ebook.toc.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Part one", "Part two"]);
}

#[test]
fn test_article_inside_sidebar_layout() {
    let url = "https://example.com/layout";
    for wrapper in ["layout has-sidebar", "post-content social-share-enabled"] {
        let html = format!(
            "<html><head><title>Budget vote</title></head><body>\
             <div class='{wrapper}'><article>\
             <p>The council met on Tuesday to discuss the new budget for the coming year.</p>\
             <p>Members debated for several hours before reaching a compromise on roads.</p>\
             <p>The final vote is expected next month after a public consultation.</p>\
             </article><aside><a href='/popular'>Most popular</a></aside></div></body></html>"
        );
        let extracted = Pipeline::default()
            .process(&web(url), &raw(&html, url))
            .unwrap_or_else(|e| panic!("{wrapper}: {e}"));
        assert_eq!(extracted.strategy, StrategyKind::Generic);
        assert!(extracted.confidence > 0.0);
        assert_eq!(extracted.article.blocks.len(), 3, "{wrapper}");
        assert!(!extracted.article.to_text().contains("Most popular"));
    }
}

#[test]
fn test_short_article_keeps_image_heading_and_list() {
    let url = "https://example.com/report";
    let html = "<html><head><title>Annual report</title></head><body><article>\
                <h2>Highlights</h2>\
                <p>The chart below shows the numbers for the whole of last year.</p>\
                <img src='/img/chart.png' alt='Chart'>\
                <ul><li>Revenue grew again</li><li>Costs fell slightly</li></ul>\
                </article></body></html>";
    let extracted = Pipeline::default()
        .process(&web(url), &raw(html, url))
        .unwrap();
    assert_eq!(
        extracted.article.blocks,
        vec![
            ContentBlock::Heading {
                level: 1,
                text: "Highlights".into()
            },
            ContentBlock::Paragraph {
                text: "The chart below shows the numbers for the whole of last year.".into()
            },
            ContentBlock::Image {
                src: "https://example.com/img/chart.png".into(),
                alt: "Chart".into()
            },
            ContentBlock::List {
                ordered: false,
                items: vec!["Revenue grew again".into(), "Costs fell slightly".into()]
            },
        ]
    );
}
