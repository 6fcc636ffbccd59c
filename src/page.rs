use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::display::{provenance, summary_line, validity_label};
use crate::error::QueryError;
use crate::model::QueryResponse;
use crate::request::QueryForm;

/// What the query page shows: the submitted form values plus either a result
/// or an error message, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage {
    pub form: QueryForm,
    pub result: Option<QueryResponse>,
    pub error_message: Option<String>,
}

impl QueryPage {
    pub fn blank(form: QueryForm) -> Self {
        Self {
            form,
            result: None,
            error_message: None,
        }
    }

    pub fn from_outcome(form: QueryForm, outcome: Result<QueryResponse, QueryError>) -> Self {
        match outcome {
            Ok(r) => Self {
                form,
                result: Some(r),
                error_message: None,
            },
            Err(e) => Self {
                form,
                result: None,
                error_message: Some(e.to_string()),
            },
        }
    }
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; padding: 0 1rem; }
nav a { margin-right: 1rem; }
form { display: flex; gap: .5rem; align-items: end; flex-wrap: wrap; margin-bottom: 1.5rem; }
label { display: flex; flex-direction: column; font-size: .9rem; }
input[name=query] { width: 32rem; }
.error { background: #fde8e8; border: 1px solid #e0a0a0; padding: .75rem; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #ddd; padding: .4rem; text-align: left; vertical-align: top; }
.valid { color: #0a6b2d; } .unverified { color: #8a6d00; }
"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - Medical Coding Assistant</title>
<style>{STYLE}</style>
</head>
<body>
<nav><a href="/">Search</a><a href="/about">About</a></nav>
{body}
</body>
</html>
"#,
        title = text(title),
    )
}

pub fn render_index(page: &QueryPage) -> String {
    let mut body = String::from("<h1>Medical Coding Assistant</h1>\n");
    body.push_str(&format!(
        r#"<form method="post" action="/">
<label>Clinical description <input name="query" value="{query}" required></label>
<label>Max results <input name="maxSqlResults" type="number" min="1" value="{max}"></label>
<button type="submit">Search</button>
</form>
"#,
        query = attr(&page.form.query),
        max = attr(page.form.max_results.as_deref().unwrap_or_default()),
    ));

    if let Some(msg) = &page.error_message {
        body.push_str(&format!(
            "<div class=\"error\" role=\"alert\">{}</div>\n",
            text(msg)
        ));
    }
    if let Some(result) = &page.result {
        body.push_str(&render_result(result));
    }

    layout("Search", &body)
}

fn render_result(resp: &QueryResponse) -> String {
    let mut out = format!("<p class=\"summary\">{}</p>\n", text(&summary_line(resp)));
    if let Some(p) = provenance(resp) {
        out.push_str(&format!("<p class=\"provenance\">{}</p>\n", text(&p)));
    }
    if resp.candidates.is_empty() {
        out.push_str("<p>No candidate codes returned.</p>\n");
        return out;
    }

    out.push_str(
        "<table>\n<thead><tr><th>Rank</th><th>Code</th><th>Description</th>\
         <th>Confidence</th><th>Source</th><th>Validity</th><th>Reason</th></tr></thead>\n<tbody>\n",
    );
    for c in &resp.candidates {
        let validity = validity_label(c);
        out.push_str(&format!(
            "<tr><td>{}</td><td><code>{}</code></td><td>{}</td><td>{}</td><td>{}</td>\
             <td class=\"{validity}\">{validity}</td><td>{}</td></tr>\n",
            c.rank,
            text(&c.code),
            text(&c.description),
            c.confidence,
            text(&c.source),
            text(&c.reason),
        ));
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

pub fn render_about() -> String {
    layout(
        "About",
        "<h1>About</h1>\n\
         <p>Enter a clinical description and the assistant returns a ranked list of \
         candidate medical codes, each with the reason it matched and a confidence score.</p>\n\
         <p>Codes marked <em>valid</em> were found in the configured reference code set; \
         <em>unverified</em> codes were not checked or not found.</p>\n",
    )
}
