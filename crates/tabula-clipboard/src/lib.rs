//! Pure clipboard parsers.
//!
//! Browsers put two useful flavors on the clipboard for tabular content:
//! `text/html` with a `<table>` fragment (spans preserved) and `text/plain`
//! TSV. Both parsers are pure: they read a string and produce a normalized
//! structure for the paste engine in `tabula-model`; nothing here touches a
//! model or the event bus.

mod html;
mod tsv;

pub use html::{parse_html_table, HtmlTableError};
pub use tsv::parse_tsv;
