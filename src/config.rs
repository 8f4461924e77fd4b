//! Full-text search configuration / 全文搜索配置
//!
//! Loaded from JSON (camelCase keys) or assembled with the builder setters.
//! `account` and `appKey` are required; everything else has a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FtsError, Result};
use crate::logger::{DiagLog, LogSink};

/// Prefix of every index store name / 索引库名前缀
pub const STORE_NAME_PREFIX: &str = "NIM-FULLTEXT-SEARCHDB-";

/// Default ignore-set: whitespace plus CJK/Latin punctuation, Greek letters,
/// numbering glyphs, math symbols and box drawing / 默认忽略字符
pub const DEFAULT_IGNORE_CHARS: &str = " \t\r\n~!@#$%^&*()_+-=【】、{}|;':\"，。、《》？αβγδεζηθικλμνξοπρστυφχψωΑΒΓΔΕΖΗΘΙΚΛΜΝΞΟΠΡΣΤΥΦΧΨΩ。，、；：？！…—·ˉ¨‘’“”々～‖∶＂＇｀｜〃〔〕〈〉《》「」『』．〖〗【】（）［］｛｝ⅠⅡⅢⅣⅤⅥⅦⅧⅨⅩⅪⅫ⒈⒉⒊⒋⒌⒍⒎⒏⒐⒑⒒⒓⒔⒕⒖⒗⒘⒙⒚⒛㈠㈡㈢㈣㈤㈥㈦㈧㈨㈩①②③④⑤⑥⑦⑧⑨⑩⑴⑵⑶⑷⑸⑹⑺⑻⑼⑽⑾⑿⒀⒁⒂⒃⒄⒅⒆⒇≈≡≠＝≤≥＜＞≮≯∷±＋－×÷／∫∮∝∞∧∨∑∏∪∩∈∵∴⊥∥∠⌒⊙≌∽√§№☆★○●◎◇◆□℃‰€■△▲※→←↑↓〓¤°＃＆＠＼︿＿￣―♂♀┌┍┎┐┑┒┓─┄┈├┝┞┟┠┡┢┣│┆┊┬┭┮┯┰┱┲┳┼┽┾┿╀╁╂╃└┕┖┗┘┙┚┛━┅┉┤┥┦┧┨┩┪┫┃┇┋┴┵┶┷┸┹┺┻╋╊╉╈╇╆╅╄";

/// Full-text search configuration / 全文搜索配置
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTextConfig {
    /// IM account / 账号
    pub account: String,
    /// App key / 应用 key
    pub app_key: String,
    /// Override of the ignore-set, one entry per character / 覆盖默认忽略字符
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_chars: Option<String>,
    /// Override of the derived store name / 索引库名
    #[serde(default, rename = "searchDBName", skip_serializing_if = "Option::is_none")]
    pub search_db_name: Option<String>,
    /// Directory the store lives under / 索引库目录
    #[serde(default, rename = "searchDBPath", skip_serializing_if = "Option::is_none")]
    pub search_db_path: Option<String>,
    /// Enables the diagnostic log channel / 调试日志
    #[serde(default)]
    pub debug: bool,
    /// Custom sink for diagnostic lines, only consulted when `debug` is set
    #[serde(skip)]
    pub log_func: Option<LogSink>,
}

impl FullTextConfig {
    pub fn new(account: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            app_key: app_key.into(),
            ..Default::default()
        }
    }

    pub fn with_ignore_chars(mut self, chars: impl Into<String>) -> Self {
        self.ignore_chars = Some(chars.into());
        self
    }

    pub fn with_db_name(mut self, name: impl Into<String>) -> Self {
        self.search_db_name = Some(name.into());
        self
    }

    pub fn with_db_path(mut self, path: impl Into<String>) -> Self {
        self.search_db_path = Some(path.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_log_func(mut self, sink: LogSink) -> Self {
        self.log_func = Some(sink);
        self
    }

    /// Parse configuration from JSON / 从 JSON 解析配置
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: FullTextConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file / 从文件加载配置
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        tracing::info!("Loaded full-text configuration from {:?}", path);
        Ok(config)
    }

    /// Both identity fields are required / 账号与 appKey 必填
    pub fn validate(&self) -> Result<()> {
        if self.account.is_empty() || self.app_key.is_empty() {
            return Err(FtsError::InvalidConfig("invalid init params!".to_string()));
        }
        Ok(())
    }

    /// Effective ignore-set source / 实际使用的忽略字符
    pub fn ignore_chars(&self) -> &str {
        match self.ignore_chars.as_deref() {
            Some(chars) if !chars.is_empty() => chars,
            _ => DEFAULT_IGNORE_CHARS,
        }
    }

    /// `searchDBName`, or `<account>-<appKey>` when not overridden
    pub fn db_name(&self) -> String {
        match self.search_db_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}-{}", self.account, self.app_key),
        }
    }

    pub fn store_name(&self) -> String {
        format!("{}{}", STORE_NAME_PREFIX, self.db_name())
    }

    /// Store name, placed under `searchDBPath` when one is set / 索引库位置
    pub fn store_location(&self) -> PathBuf {
        match self.search_db_path.as_deref() {
            Some(dir) if !dir.is_empty() => Path::new(dir).join(self.store_name()),
            _ => PathBuf::from(self.store_name()),
        }
    }

    pub fn diag_log(&self) -> DiagLog {
        DiagLog::new(self.debug, self.log_func.clone())
    }
}

impl fmt::Debug for FullTextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullTextConfig")
            .field("account", &self.account)
            .field("app_key", &self.app_key)
            .field("ignore_chars", &self.ignore_chars.as_ref().map(|c| c.chars().count()))
            .field("search_db_name", &self.search_db_name)
            .field("search_db_path", &self.search_db_path)
            .field("debug", &self.debug)
            .field("log_func", &self.log_func.is_some())
            .finish()
    }
}
