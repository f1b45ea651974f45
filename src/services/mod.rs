mod article_resolver;
mod classifier;
mod url_extractor;

pub use article_resolver::ArticleResolver;
pub use classifier::MessageClassifier;
pub use url_extractor::extract_urls;
