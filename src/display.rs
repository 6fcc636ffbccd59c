use crate::model::{Candidate, QueryResponse};

/// "Found 12 matches, showing 3." plus a fallback note when relevant.
pub fn summary_line(resp: &QueryResponse) -> String {
    let mut line = format!(
        "Found {} {}, showing {}.",
        resp.total_match_count,
        if resp.total_match_count == 1 { "match" } else { "matches" },
        resp.candidates.len()
    );
    if resp.used_free_text_fallback {
        line.push_str(" No structured code match; results come from free-text search.");
    }
    line
}

/// Model provenance, or `None` when the API variant reports none of it.
pub fn provenance(resp: &QueryResponse) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(m) = resp.model.as_deref().filter(|s| !s.is_empty()) {
        parts.push(m.to_string());
    }
    if let Some(v) = resp.model_version.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("version {v}"));
    }
    if let Some(t) = resp.model_temperature {
        parts.push(format!("temperature {t}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("Model: {}", parts.join(", ")))
    }
}

pub fn validity_label(c: &Candidate) -> &'static str {
    if c.is_valid { "valid" } else { "unverified" }
}

/// Plain-text rendering for the terminal, one block per candidate in server
/// order.
pub fn render_text(resp: &QueryResponse) -> String {
    let mut out = summary_line(resp);
    out.push('\n');
    if let Some(p) = provenance(resp) {
        out.push_str(&p);
        out.push('\n');
    }
    if resp.candidates.is_empty() {
        out.push_str("No candidate codes returned.\n");
        return out;
    }
    for c in &resp.candidates {
        out.push('\n');
        out.push_str(&format!(
            "#{:<3} {:<10} {}\n",
            c.rank, c.code, c.description
        ));
        out.push_str(&format!(
            "     confidence {} | source {} | {}\n",
            c.confidence,
            if c.source.is_empty() { "-" } else { c.source.as_str() },
            validity_label(c)
        ));
        if !c.reason.is_empty() {
            out.push_str(&format!("     {}\n", c.reason));
        }
    }
    out
}
