//! HTML pages for the input form, the constraints table and the result.

use std::collections::HashMap;
use std::fmt::Write;

use crate::fields::{FieldDef, FieldKind, FieldRegistry};
use crate::predictor::{PredictionOutcome, ScoreConvention};

pub const TITLE: &str = "Satellite and Space Object Collision Prediction";

pub const SCORE_CAPTION: &str = "This score represents the estimated risk or severity of a potential \
satellite collision. Higher values indicate a higher risk or more severe potential collision event.";

pub const FAILURE_MESSAGE: &str = "Prediction failed. The model could not score this input.";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn bound_text(f: &FieldDef, v: f64) -> String {
    match f.kind {
        FieldKind::Integer => format!("{}", v as i64),
        FieldKind::Float => format!("{:?}", v),
    }
}

fn page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{t}</title></head>\n\
         <body>\n<h1>{t}</h1>\n{body}</body></html>\n",
        t = TITLE,
        body = body
    )
}

pub fn constraints_table(registry: &FieldRegistry) -> String {
    let mut out = String::from(
        "<table class=\"constraints\">\n<tr><th>Attribute</th><th>Description</th><th>Min</th><th>Max</th></tr>\n",
    );
    for row in registry.constraints() {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{:?}</td><td>{:?}</td></tr>",
            escape(row.attribute),
            escape(row.description),
            row.min,
            row.max
        );
    }
    out.push_str("</table>\n");
    out
}

fn field_input(f: &FieldDef, current: Option<&str>) -> String {
    let range_text = f
        .range
        .map(|r| format!(" (Allowed range: {} to {})", bound_text(f, r.min), bound_text(f, r.max)))
        .unwrap_or_default();
    let value = current
        .map(str::to_string)
        .unwrap_or_else(|| f.input_value(f.default_value));

    let mut attrs = String::new();
    if let Some(r) = f.range {
        let _ = write!(attrs, " min=\"{}\" max=\"{}\"", bound_text(f, r.min), bound_text(f, r.max));
    }
    let step = match (f.kind, f.range.and_then(|r| r.step)) {
        (_, Some(s)) => format!("{}", s),
        (FieldKind::Integer, None) => "1".to_string(),
        (FieldKind::Float, None) => "any".to_string(),
    };

    format!(
        "<div class=\"field\">\n<p><strong>{label}</strong>: {desc}{range}</p>\n\
         <label>{label} <input type=\"number\" name=\"{name}\" value=\"{value}\" step=\"{step}\"{attrs}></label>\n</div>\n",
        label = escape(&f.label()),
        desc = escape(&f.description),
        range = escape(&range_text),
        name = escape(&f.name),
        value = escape(&value),
        step = step,
        attrs = attrs
    )
}

/// The input page. `submitted` carries the values of a rejected submission
/// so the user can correct them; `error` is shown above the form.
pub fn render_form(
    registry: &FieldRegistry,
    submitted: Option<&HashMap<String, String>>,
    show_constraints: bool,
    error: Option<&str>,
) -> String {
    let mut body = String::new();
    body.push_str("<p>Fill the following fields or use preloaded values:</p>\n");
    let _ = writeln!(
        body,
        "<form method=\"get\" action=\"/\"><label><input type=\"checkbox\" name=\"show_constraints\"{}> \
         Show Input Constraints</label> <button type=\"submit\">Apply</button></form>",
        if show_constraints { " checked" } else { "" }
    );
    if show_constraints {
        body.push_str(&constraints_table(registry));
    }
    if let Some(msg) = error {
        let _ = writeln!(body, "<div class=\"error\">{}</div>", escape(msg));
    }
    body.push_str("<form method=\"post\" action=\"/predict\">\n");
    for f in registry.iter() {
        let current = submitted.and_then(|m| m.get(&f.name)).map(String::as_str);
        body.push_str(&field_input(f, current));
    }
    body.push_str("<button type=\"submit\">Predict</button>\n</form>\n");
    page(&body)
}

pub fn record_table(registry: &FieldRegistry, outcome: &PredictionOutcome) -> String {
    let mut out = String::from("<table class=\"record\">\n<tr>");
    for e in outcome.record.iter() {
        let _ = write!(out, "<th>{}</th>", escape(&e.name));
    }
    out.push_str("</tr>\n<tr>");
    for e in outcome.record.iter() {
        let text = registry
            .field(&e.name)
            .map(|f| f.format_value(e.value))
            .unwrap_or_else(|_| e.value.to_string());
        let _ = write!(out, "<td>{}</td>", text);
    }
    out.push_str("</tr>\n</table>\n");
    out
}

pub fn render_result(registry: &FieldRegistry, outcome: &PredictionOutcome) -> String {
    let mut body = String::new();
    body.push_str("<p>Input record for prediction:</p>\n");
    body.push_str(&record_table(registry, outcome));
    match outcome.convention {
        ScoreConvention::NonNegative => {
            let _ = writeln!(
                body,
                "<div class=\"success\">Predicted Collision Risk Score: {:.4}</div>",
                outcome.score
            );
            let _ = writeln!(body, "<div class=\"info\">{}</div>", escape(SCORE_CAPTION));
        }
        ScoreConvention::Signed => {
            let _ = writeln!(body, "<div class=\"success\">Prediction: {}</div>", outcome.score);
        }
    }
    body.push_str("<p><a href=\"/\">New prediction</a></p>\n");
    page(&body)
}

pub fn render_failure() -> String {
    page(&format!(
        "<div class=\"error\">{}</div>\n<p><a href=\"/\">Back</a></p>\n",
        escape(FAILURE_MESSAGE)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_lists_every_field_with_defaults() {
        let reg = FieldRegistry::canonical();
        let html = render_form(&reg, None, false, None);
        for name in reg.names() {
            assert!(html.contains(&format!("name=\"{}\"", name)), "{name}");
        }
        assert!(html.contains("name=\"event_id\" value=\"0\" step=\"1\" min=\"0\" max=\"1000000\""));
        assert!(html.contains("name=\"relative_speed\" value=\"13792\""));
        assert!(html.contains("name=\"t_j2k_ecc\" value=\"0.003996555165\""));
        assert!(html.contains("(Allowed range: 0.0 to 30000.0)"));
        assert!(!html.contains("class=\"constraints\""));
    }

    #[test]
    fn constraints_table_only_when_toggled() {
        let reg = FieldRegistry::canonical();
        let html = render_form(&reg, None, true, None);
        assert!(html.contains("class=\"constraints\""));
        assert!(html.contains("<tr><td>azimuth</td><td>Azimuthal angle at the event time (degrees).</td><td>-180.0</td><td>180.0</td></tr>"));
        assert!(html.contains("show_constraints\" checked"));
    }

    #[test]
    fn rejected_values_are_kept_and_error_escaped() {
        let reg = FieldRegistry::canonical();
        let mut sub = HashMap::new();
        sub.insert("azimuth".to_string(), "999".to_string());
        let html = render_form(&reg, Some(&sub), false, Some("bad <value>"));
        assert!(html.contains("name=\"azimuth\" value=\"999\""));
        assert!(html.contains("bad &lt;value&gt;"));
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
