//! Test Entry Model
//!
//! A plugin's `tests` list mixes plain URLs, feed/page sources and skip
//! declarations. Each element is parsed into a [`TestEntry`].

use serde_json::{Map, Value};

/// Where a test takes its input pages from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestInput {
    /// A single page URL
    Url(String),
    /// A feed whose item links are tested
    Feed(String),
    /// A page whose matching anchors are tested
    Page { page: String, selector: Option<String> },
}

impl TestInput {
    pub fn describe(&self) -> String {
        match self {
            TestInput::Url(url) => format!("url {}", url),
            TestInput::Feed(feed) => format!("feed {}", feed),
            TestInput::Page { page, selector: Some(sel) } => format!("page {} (selector '{}')", page, sel),
            TestInput::Page { page, selector: None } => format!("page {}", page),
        }
    }
}

/// One element of a plugin's `tests` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestEntry {
    pub input: Option<TestInput>,
    /// The plugin declares it has no feed to sample from
    pub no_feeds: bool,
    pub skip_mixins: Vec<String>,
    pub skip_methods: Vec<String>,
}

impl TestEntry {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            input: Some(TestInput::Url(url.into())),
            ..Default::default()
        }
    }

    pub fn skip_methods<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_methods: methods.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn skip_mixins<I, S>(mixins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_mixins: mixins.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Parse one raw `tests` element. Returns the reason on failure.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(url) => Ok(Self::url(url.clone())),
            Value::Object(obj) => Self::from_object(obj),
            other => Err(format!("test entry must be a string or an object, found {}", other)),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Result<Self, String> {
        let mut entry = TestEntry {
            skip_mixins: string_list(obj, "skipMixins")?,
            skip_methods: string_list(obj, "skipMethods")?,
            no_feeds: obj.get("noFeeds").map(truthy).unwrap_or(false),
            input: None,
        };

        if let Some(feed) = obj.get("feed") {
            entry.input = Some(TestInput::Feed(string_field(feed, "feed")?));
        } else if let Some(page) = obj.get("page") {
            let selector = obj
                .get("selector")
                .map(|s| string_field(s, "selector"))
                .transpose()?;
            entry.input = Some(TestInput::Page {
                page: string_field(page, "page")?,
                selector,
            });
        }

        let recognized = entry.input.is_some()
            || entry.no_feeds
            || obj.contains_key("skipMixins")
            || obj.contains_key("skipMethods");
        if !recognized {
            let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
            return Err(format!("unrecognized test entry with keys {:?}", keys));
        }

        Ok(entry)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn string_field(value: &Value, key: &str) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("'{}' must be a string", key))
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Result<Vec<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| string_field(v, key))
            .collect(),
        Some(_) => Err(format!("'{}' must be a list of strings", key)),
    }
}
