// HTML views - index page and visualization report
// Markup is assembled with format! and inline styles; images embed as base64

use crate::pipeline::AnalysisReport;
use crate::summary::DatasetSummary;
use std::fmt::Write;

const STYLE: &str = "\
body{font-family:sans-serif;margin:0;background:#f5f7fa;color:#1f2430}\
header{background:#2a3f66;color:#fff;padding:18px 32px}\
main{max-width:1280px;margin:0 auto;padding:24px 32px}\
h2{border-bottom:2px solid #d8dee9;padding-bottom:6px}\
table{border-collapse:collapse;margin:12px 0;background:#fff}\
th,td{border:1px solid #d8dee9;padding:6px 12px;text-align:right}\
th:first-child,td:first-child{text-align:left}\
form{background:#fff;border:1px solid #d8dee9;padding:16px;margin:16px 0}\
figure{background:#fff;border:1px solid #d8dee9;padding:12px;margin:24px 0}\
figure img{max-width:100%;height:auto}\
figcaption{padding:8px 4px;color:#41506b}\
.note{background:#fff6e0;border:1px solid #e8d49a;padding:12px;margin:24px 0}";

/// Landing page: the empty summary shape plus the upload form.
pub fn render_index() -> String {
    page(
        "Enrollment Insights",
        &format!(
            "{}{}",
            upload_form(),
            summary_section(&DatasetSummary::empty())
        ),
    )
}

/// Visualization page: summary, then the ordered (image, insight) pairs.
pub fn render_report(file_name: &str, report: &AnalysisReport) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<p>Dataset: <strong>{}</strong></p>",
        escape(file_name)
    );
    body.push_str(&summary_section(&report.summary));

    body.push_str("<h2>Charts &amp; Insights</h2>");
    for artifact in &report.artifacts {
        match &artifact.image {
            Some(image) => {
                let _ = write!(
                    body,
                    "<figure><img src=\"data:image/png;base64,{}\" alt=\"{}\">\
                     <figcaption>{}</figcaption></figure>",
                    image,
                    escape(&artifact.title),
                    escape(&artifact.insight)
                );
            }
            None => {
                let _ = write!(body, "<div class=\"note\">{}</div>", escape(&artifact.insight));
            }
        }
    }

    page("Enrollment Insights", &body)
}

fn upload_form() -> String {
    "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\
     <label for=\"file\">Upload a CSV dataset:</label> \
     <input type=\"file\" id=\"file\" name=\"file\" accept=\".csv\"> \
     <button type=\"submit\">Visualize</button></form>"
        .to_string()
}

fn summary_section(summary: &DatasetSummary) -> String {
    let mut out = String::new();
    out.push_str("<h2>Dataset Summary</h2>");
    let _ = write!(
        out,
        "<p>Number of Rows: <strong>{}</strong> &middot; Number of Columns: <strong>{}</strong> \
         &middot; Columns: {}</p>",
        summary.row_count,
        summary.column_count,
        if summary.columns.is_empty() {
            "&mdash;".to_string()
        } else {
            escape(&summary.columns.join(", "))
        }
    );

    if !summary.numeric.is_empty() {
        out.push_str(
            "<h3>Numerical Summary</h3><table><tr><th>Column</th><th>count</th><th>mean</th>\
             <th>std</th><th>min</th><th>25%</th><th>50%</th><th>75%</th><th>max</th></tr>",
        );
        for stat in &summary.numeric {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&stat.name),
                stat.count,
                fmt_stat(stat.mean),
                fmt_stat(stat.std),
                fmt_stat(stat.min),
                fmt_stat(stat.q25),
                fmt_stat(stat.median),
                fmt_stat(stat.q75),
                fmt_stat(stat.max)
            );
        }
        out.push_str("</table>");
    }

    if !summary.categorical.is_empty() {
        out.push_str(
            "<h3>Categorical Summary</h3><table><tr><th>Column</th><th>count</th>\
             <th>unique</th><th>top</th><th>freq</th></tr>",
        );
        for stat in &summary.categorical {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&stat.name),
                stat.count,
                stat.unique,
                escape(&stat.top),
                stat.freq
            );
        }
        out.push_str("</table>");
    }

    if !summary.missing.is_empty() {
        out.push_str("<h3>Missing Values</h3><table><tr><th>Column</th><th>missing</th></tr>");
        for (name, count) in &summary.missing {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(name),
                count
            );
        }
        out.push_str("</table>");
    }

    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title><style>{}</style></head>\
         <body><header><h1>{}</h1></header><main>{}</main></body></html>",
        escape(title),
        STYLE,
        escape(title),
        body
    )
}

fn fmt_stat(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze_bytes;
    use crate::render::RenderConfig;

    const SAMPLE: &str = "\
Year,Number_of_Students,Branch,Category,Gender
2019,120,CSE,General,Male
2020,150,ECE,OBC,Female
";

    #[test]
    fn test_index_page_has_empty_summary_and_form() {
        let html = render_index();
        assert!(html.contains("<form action=\"/upload\""));
        assert!(html.contains("Number of Rows: <strong>0</strong>"));
        assert!(!html.contains("<figure>"));
    }

    #[test]
    fn test_report_page_pairs_images_with_insights() {
        let report = analyze_bytes(SAMPLE.as_bytes(), &RenderConfig::detect()).unwrap();
        let html = render_report("students.csv", &report);

        assert!(html.contains("Dataset: <strong>students.csv</strong>"));
        assert_eq!(
            html.matches("data:image/png;base64,").count(),
            report.artifacts.iter().filter(|a| a.image.is_some()).count()
        );
        for artifact in &report.artifacts {
            assert!(html.contains(&escape(&artifact.insight)));
        }
    }

    #[test]
    fn test_report_includes_summary_tables() {
        let report = analyze_bytes(SAMPLE.as_bytes(), &RenderConfig::detect()).unwrap();
        let html = render_report("students.csv", &report);
        assert!(html.contains("Numerical Summary"));
        assert!(html.contains("Categorical Summary"));
        assert!(html.contains("Missing Values"));
        assert!(html.contains("Number_of_Students"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_filename_is_escaped() {
        let report = analyze_bytes(SAMPLE.as_bytes(), &RenderConfig::detect()).unwrap();
        let html = render_report("<script>.csv", &report);
        assert!(!html.contains("<script>.csv"));
        assert!(html.contains("&lt;script&gt;.csv"));
    }
}
