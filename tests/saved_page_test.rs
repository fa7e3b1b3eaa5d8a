use std::fs;
use std::sync::Arc;

use kindling::{
    ContentBlock, Error, FileFetcher, FileImages, Fetcher, Pipeline, Source, StrategyKind, inspect_epub,
    to_epub_bytes,
};
use url::Url;

const CENITAL_PAGE: &str = r#"<html>
<head><title>La inflación de marzo | Cenital</title></head>
<body>
  <header><a href="/">Cenital</a><a href="/newsletters">Newsletters</a></header>
  <div class="article-content">
    <h1>La inflación de marzo</h1>
    <p>El índice de precios al consumidor subió menos de lo esperado durante el mes pasado.</p>
    <script>window.dataLayer = [];</script>
    <p>Los analistas atribuyen la baja a la caída del consumo y a la estabilidad cambiaria.</p>
    <p>¿Por qué pagar por algo que puedo leer gratis? En Cenital entendemos al periodismo como un servicio público. Por eso nuestras notas siempre estarán accesibles para todos. Pero investigar es caro y la parte más ardua del trabajo periodístico no se ve. Por eso le pedimos a quienes puedan que se sumen a nuestro círculo de Mejores amigos y nos permitan seguir creciendo. Si te gusta lo que hacemos, sumate vos también. Sumate</p>
    <h3>Otras lecturas</h3>
    <p>Una nota vieja que no forma parte del artículo y que no debería aparecer.</p>
  </div>
  <footer>Cenital 2024</footer>
</body>
</html>"#;

#[test]
fn test_cenital_saved_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inflacion.html");
    fs::write(&path, CENITAL_PAGE).unwrap();

    let origin = Url::parse("https://www.cenital.com/la-inflacion-de-marzo/").unwrap();
    let source = Source::file(&path).with_origin(origin.clone());
    let raw = FileFetcher.fetch(&source).unwrap();
    let extracted = Pipeline::default().process(&source, &raw).unwrap();

    assert_eq!(extracted.strategy, StrategyKind::DomainSpecific);
    let article = extracted.article;
    assert_eq!(article.title.as_deref(), Some("La inflación de marzo"));
    assert_eq!(article.source_url, Some(origin));
    assert_eq!(
        article.blocks,
        vec![
            ContentBlock::Paragraph {
                text: "El índice de precios al consumidor subió menos de lo esperado durante el mes pasado."
                    .into()
            },
            ContentBlock::Paragraph {
                text: "Los analistas atribuyen la baja a la caída del consumo y a la estabilidad cambiaria."
                    .into()
            },
        ]
    );
}

#[test]
fn test_substack_web_rejected_but_saved_copy_accepted() {
    let url = "https://writer.substack.com/p/some-post";
    let pipeline = Pipeline::default();

    let err = pipeline
        .convert(&Source::web(url).unwrap(), &FileFetcher)
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported { ref host, .. } if host == "substack.com"));
    assert!(err.to_string().contains("JavaScript"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("post.html");
    fs::write(
        &path,
        "<html><head><title>Some post</title></head><body><article>\
         <p>The rendered text of the post, saved from the browser after scripts ran.</p>\
         </article></body></html>",
    )
    .unwrap();
    let saved = Source::file(&path).with_origin(Url::parse(url).unwrap());
    let ebook = pipeline.convert(&saved, &FileFetcher).unwrap();
    assert_eq!(ebook.metadata.title, "Some post");
}

#[test]
fn test_saved_page_images_are_embedded() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("page_files")).unwrap();
    fs::write(
        dir.path().join("page_files").join("chart.png"),
        b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR",
    )
    .unwrap();
    let path = dir.path().join("page.html");
    fs::write(
        &path,
        "<html><head><title>Charts</title></head><body><article>\
         <p>The chart below shows the numbers for the whole of last year.</p>\
         <img src=\"page_files/chart.png\" alt=\"Chart\">\
         <img src=\"page_files/missing.png\" alt=\"Gone\">\
         </article></body></html>",
    )
    .unwrap();

    let ebook = Pipeline::default()
        .with_images(Arc::new(FileImages))
        .convert(&Source::file(&path), &FileFetcher)
        .unwrap();

    assert_eq!(ebook.resources.len(), 1);
    assert_eq!(ebook.resources[0].media_type, "image/png");
    assert!(ebook.chapters[0].body.contains("images/img_1.png"));
    assert!(!ebook.chapters[0].body.contains("missing.png"));
    // Local files have no web address to credit.
    assert_eq!(ebook.metadata.source, None);

    let summary = inspect_epub(&to_epub_bytes(&ebook).unwrap()).unwrap();
    assert!(summary.problems().is_empty());
}

#[test]
fn test_missing_file_is_unavailable() {
    let err = Pipeline::default()
        .convert(&Source::file("/no/such/page.html"), &FileFetcher)
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
    assert!(!err.is_recoverable());
}
