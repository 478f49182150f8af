//! Display decoration for feed items.
//!
//! Each article gets a color from the palette, cycling back to the first color
//! after the last one. Decoration works on copies; the service's buffers are
//! never touched.

use crate::blog::{Article, BlogService};
use futures::stream::{Stream, StreamExt};

/// Assign `palette[i % palette.len()]` to the `i`-th article.
///
/// An empty palette leaves every `color` as `None`.
pub fn decorate(articles: &[Article], palette: &[String]) -> Vec<Article> {
    articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            let mut article = article.clone();
            article.color = palette.get(i.checked_rem(palette.len()).unwrap_or(0)).cloned();
            article
        })
        .collect()
}

/// The service's active feed, decorated each time it changes.
pub fn decorated_feed(
    service: &BlogService,
    palette: Vec<String>,
) -> impl Stream<Item = Vec<Article>> + Send + 'static {
    service
        .feed()
        .stream()
        .map(move |articles| decorate(&articles, &palette))
}
