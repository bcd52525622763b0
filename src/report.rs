use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::request::processing::ProcessingRequest;

/// Rendering context for a request summary
#[derive(Serialize)]
struct StatusContext {
    identifier: String,
    language: String,
    file_name: String,
    state: String,
    creation_date: String,
    last_update: String,
    has_result: bool,
    result: String,
}

/// Render a request summary using TinyTemplate
pub fn render_status(request: &ProcessingRequest) -> Result<String, tinytemplate::error::Error> {
    /// included status template
    static STATUS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/status.txt"));
    let mut tt = TinyTemplate::new();
    // results are compiler and scheduler output, not HTML
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("status", STATUS)?;

    let context = StatusContext {
        identifier: request.identifier.clone(),
        language: request.language.clone(),
        file_name: request.file_name.clone(),
        state: request.state.to_string(),
        creation_date: request.creation_date.to_rfc3339(),
        last_update: request.last_update.map(|date| date.to_rfc3339()).unwrap_or_else(|| "-".to_string()),
        has_result: !request.result.trim().is_empty(),
        result: request.result.trim_end().to_string(),
    };
    tt.render("status", &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::output::Output;
    use crate::request::state::ProcessState;

    #[test]
    fn summary_without_result() {
        let request = ProcessingRequest::new("r-1", "python", vec![], "a.py", "/jobs/1/", None);
        let rendered = render_status(&request).unwrap();
        assert!(rendered.starts_with("Request r-1 (python, a.py)"));
        assert!(rendered.contains("state:        CREATED"));
        assert!(rendered.contains("last update:  -"));
        assert!(!rendered.contains("result:"));
    }

    #[test]
    fn result_is_not_escaped() {
        let mut request = ProcessingRequest::new("r-2", "java", vec![], "Main.java", "/jobs/2/", None);
        request.transition(ProcessState::Processing).unwrap();
        request.apply(Output::failed("Main.java:3: error: ';' expected <here>\n")).unwrap();

        let rendered = render_status(&request).unwrap();
        assert!(rendered.contains("FINISHED_WITH_ERRORS"));
        assert!(rendered.contains("Main.java:3: error: ';' expected <here>"));
    }
}
