use serde::Serialize;

/// One normalized event row.
///
/// Double quotes are stripped from every field on construction, so a record
/// can always be dropped into an attribute value or element body without
/// breaking the surrounding markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    date: String,
    title: String,
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

impl Record {
    pub fn new(
        date: impl AsRef<str>,
        title: impl AsRef<str>,
        location: impl AsRef<str>,
        link: Option<&str>,
    ) -> Self {
        Self {
            date: strip_quotes(date.as_ref()),
            title: strip_quotes(title.as_ref()),
            location: strip_quotes(location.as_ref()),
            link: link.map(strip_quotes),
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Hyperlink target of the title cell, if it had one
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }
}

fn strip_quotes(value: &str) -> String {
    value.replace('"', "")
}
