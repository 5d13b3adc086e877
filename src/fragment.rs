//! Rendering of records into the HTML block that the events page expects.
//!
//! The block layout is consumed by the live page's stylesheet, so the tag
//! strings, class names and whitespace below are a fixed format. Change them
//! only together with the page.

use crate::record::Record;
use std::fmt::Write;

pub const BLOCK_OPEN: &str = "<div>";
pub const BLOCK_CLOSE: &str = "</div>";
pub const TITLE_OPEN: &str =
    r#"<h3 class="sl1-text mt-25 font-poppins" style="font-size:22px">"#;
pub const DETAILS_OPEN: &str =
    r#"<h3 class="sl1-text mt-5 font-poppins" style="font-size:14px; line-height:25px">"#;
pub const HEADING_CLOSE: &str = "</h3>";
pub const LOCATION_PREFIX: &str = "<br> Location: ";
pub const INDENT: &str = "\t";

/// Tag strings used to render a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentLayout {
    pub block_open: &'static str,
    pub block_close: &'static str,
    pub title_open: &'static str,
    pub details_open: &'static str,
    pub heading_close: &'static str,
    pub location_prefix: &'static str,
    pub indent: &'static str,
}

impl Default for FragmentLayout {
    fn default() -> Self {
        Self {
            block_open: BLOCK_OPEN,
            block_close: BLOCK_CLOSE,
            title_open: TITLE_OPEN,
            details_open: DETAILS_OPEN,
            heading_close: HEADING_CLOSE,
            location_prefix: LOCATION_PREFIX,
            indent: INDENT,
        }
    }
}

impl FragmentLayout {
    /// Renders one record as a self-contained block, terminated by a blank
    /// line.
    pub fn format(&self, record: &Record) -> String {
        let i1 = self.indent;
        let i2 = self.indent.repeat(2);
        let href = record.link().unwrap_or_default();

        let mut out = String::with_capacity(320);
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{open}\n\
             {i1}{title_open}\n\
             {i2}<a href=\"{href}\">{title}</a>\n\
             {i1}{close}\n\
             \n\
             {i1}{details_open}\n\
             {i2}{date}\n\
             {i2}{location_prefix}{location}\n\
             {i1}{close}\n\
             {block_close}\n\
             \n",
            open = self.block_open,
            title_open = self.title_open,
            title = record.title(),
            close = self.heading_close,
            details_open = self.details_open,
            date = record.date(),
            location_prefix = self.location_prefix,
            location = record.location(),
            block_close = self.block_close,
        );
        out
    }
}

/// Renders a record with the default layout.
pub fn format(record: &Record) -> String {
    FragmentLayout::default().format(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_layout_is_exact() {
        let record = Record::new("March 4, 2024", "Conf A", "City X", Some("http://a.example"));
        let expected = concat!(
            "<div>\n",
            "\t<h3 class=\"sl1-text mt-25 font-poppins\" style=\"font-size:22px\">\n",
            "\t\t<a href=\"http://a.example\">Conf A</a>\n",
            "\t</h3>\n",
            "\n",
            "\t<h3 class=\"sl1-text mt-5 font-poppins\" style=\"font-size:14px; line-height:25px\">\n",
            "\t\tMarch 4, 2024\n",
            "\t\t<br> Location: City X\n",
            "\t</h3>\n",
            "</div>\n",
            "\n",
        );
        assert_eq!(format(&record), expected);
    }

    #[test]
    fn test_missing_link_renders_empty_href() {
        let record = Record::new("June 1, 2024", "No Link", "Online", None);
        let fragment = format(&record);
        assert!(fragment.contains("\t\t<a href=\"\">No Link</a>\n"));
    }

    #[test]
    fn test_format_is_deterministic() {
        let record = Record::new("June 1, 2024", "Same", "Place", Some("http://x"));
        assert_eq!(format(&record), format(&record));
    }

    #[test]
    fn test_custom_indent() {
        let layout = FragmentLayout {
            indent: "  ",
            ..FragmentLayout::default()
        };
        let record = Record::new("d", "t", "l", None);
        let fragment = layout.format(&record);
        assert!(fragment.contains("\n    <a href=\"\">t</a>\n"));
        assert!(fragment.contains("\n  </h3>\n"));
    }
}
