//! Tokenizer adapter - jieba segmentation plus an ignore-set filter / 分词适配
//!
//! Messages and queries go through the same `Tokenizer`, so a message is
//! findable by exactly the tokens that survive this pipeline.

use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// External word segmentation / 分词接口
pub trait Segmenter: Send + Sync {
    /// Order-preserving, duplicates allowed
    fn cut(&self, text: &str) -> Vec<String>;
}

/// Default segmenter (jieba, HMM enabled) / 默认分词器
#[derive(Debug, Clone, Copy, Default)]
pub struct JiebaSegmenter;

impl Segmenter for JiebaSegmenter {
    fn cut(&self, text: &str) -> Vec<String> {
        JIEBA.cut(text, true).into_iter().map(str::to_string).collect()
    }
}

/// Segmenter + ignore-set / 分词 + 过滤
#[derive(Clone)]
pub struct Tokenizer {
    segmenter: Arc<dyn Segmenter>,
    ignore: HashSet<String>,
}

impl Tokenizer {
    /// Every character of `ignore_chars` becomes one ignore entry
    pub fn new(ignore_chars: &str) -> Self {
        Self::with_segmenter(Arc::new(JiebaSegmenter), ignore_chars)
    }

    pub fn with_segmenter(segmenter: Arc<dyn Segmenter>, ignore_chars: &str) -> Self {
        let ignore = ignore_chars.chars().map(String::from).collect();
        Self { segmenter, ignore }
    }

    /// Extra multi-character entries, e.g. stopwords / 停用词
    pub fn ignore_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn is_ignored(&self, token: &str) -> bool {
        token.is_empty() || self.ignore.contains(token)
    }

    /// Tokenize text / 对文本进行分词
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.segmenter
            .cut(text)
            .into_iter()
            .filter(|token| !self.is_ignored(token))
            .collect()
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("ignore_entries", &self.ignore.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DEFAULT_IGNORE_CHARS;

    /// Splits on whitespace, keeping the whitespace runs as tokens like jieba does
    pub(crate) struct SpaceSegmenter;

    impl Segmenter for SpaceSegmenter {
        fn cut(&self, text: &str) -> Vec<String> {
            let mut out = Vec::new();
            let mut current = String::new();
            for c in text.chars() {
                if c.is_whitespace() {
                    if !current.is_empty() {
                        out.push(std::mem::take(&mut current));
                    }
                    out.push(c.to_string());
                } else {
                    current.push(c);
                }
            }
            if !current.is_empty() {
                out.push(current);
            }
            out
        }
    }

    #[test]
    fn test_tokenize_english() {
        let tokenizer = Tokenizer::new(DEFAULT_IGNORE_CHARS);
        assert_eq!(tokenizer.tokenize("hello world"), vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_chinese() {
        let tokenizer = Tokenizer::new(DEFAULT_IGNORE_CHARS);
        let tokens = tokenizer.tokenize("我们明天开会，好吗？");
        assert!(!tokens.is_empty());
        assert!(!tokens.iter().any(|t| t == "，" || t == "？"));
        assert_eq!(tokens.concat(), "我们明天开会好吗");
    }

    #[test]
    fn test_only_ignorable_text_yields_nothing() {
        let tokenizer = Tokenizer::new(DEFAULT_IGNORE_CHARS);
        assert!(tokenizer.tokenize("，。！？ ").is_empty());
        assert!(tokenizer.tokenize("").is_empty());
    }

    #[test]
    fn test_duplicates_and_order_kept() {
        let tokenizer = Tokenizer::with_segmenter(Arc::new(SpaceSegmenter), " ");
        assert_eq!(tokenizer.tokenize("b a b"), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_custom_ignore_set() {
        let tokenizer =
            Tokenizer::with_segmenter(Arc::new(SpaceSegmenter), " x").ignore_words(["the"]);
        assert_eq!(tokenizer.tokenize("the x marks the spot"), vec!["marks", "spot"]);
    }
}
