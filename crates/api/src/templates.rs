//! Tera templates.
//!
//! The built-in templates are compiled into the binary. Setting
//! `templates.dir` replaces them with `{dir}/**/*.html` loaded at startup.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use polls_common::{AppError, AppResult, config::TemplateConfig};
use tera::{Context, Tera};

const BUILTIN: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("polls/index.html", include_str!("../templates/polls/index.html")),
    ("polls/detail.html", include_str!("../templates/polls/detail.html")),
    ("polls/results.html", include_str!("../templates/polls/results.html")),
    ("polls/graph.html", include_str!("../templates/polls/graph.html")),
    (
        "registration/login.html",
        include_str!("../templates/registration/login.html"),
    ),
];

/// Compiled template set.
#[derive(Clone)]
pub struct Templates {
    tera: Arc<Tera>,
}

impl Templates {
    /// Templates compiled into the binary.
    pub fn builtin() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN.iter().copied())
            .map_err(|e| AppError::Template(e.to_string()))?;
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    /// Templates loaded from `dir`.
    pub fn from_dir(dir: &str) -> AppResult<Self> {
        let tera = Tera::new(&format!("{}/**/*.html", dir.trim_end_matches('/')))
            .map_err(|e| AppError::Template(e.to_string()))?;
        tracing::info!(dir, templates = tera.get_template_names().count(), "Loaded templates");
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    /// Templates selected by the configuration.
    pub fn load(config: &TemplateConfig) -> AppResult<Self> {
        match config.dir.as_deref() {
            Some(dir) => Self::from_dir(dir),
            None => Self::builtin(),
        }
    }

    /// Render a template to a string.
    pub fn render(&self, name: &str, context: &Context) -> AppResult<String> {
        self.tera.render(name, context).map_err(|e| {
            // The top-level message hides the cause.
            let cause = std::error::Error::source(&e).map(ToString::to_string);
            AppError::Template(match cause {
                Some(cause) => format!("{e}: {cause}"),
                None => e.to_string(),
            })
        })
    }

    /// Render a template into an HTML response with `status`.
    pub fn page(&self, status: StatusCode, name: &str, context: &Context) -> AppResult<Response> {
        let html = self.render(name, context)?;
        Ok((status, Html(html)).into_response())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_compile() {
        let templates = Templates::builtin().unwrap();
        let names: Vec<_> = templates.tera.get_template_names().collect();

        for (name, _) in BUILTIN {
            assert!(names.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_empty_index_message() {
        let templates = Templates::builtin().unwrap();
        let mut context = Context::new();
        context.insert("latest_question_list", &Vec::<serde_json::Value>::new());

        let html = templates.render("polls/index.html", &context).unwrap();
        assert!(html.contains("No polls are available."));
    }

    #[test]
    fn test_output_is_escaped() {
        let templates = Templates::builtin().unwrap();
        let mut context = Context::new();
        context.insert(
            "question",
            &serde_json::json!({"id": 1, "question_text": "<b>bold</b>"}),
        );
        context.insert("choices", &Vec::<serde_json::Value>::new());

        let html = templates.render("polls/results.html", &context).unwrap();
        assert!(html.contains("&lt;b&gt;bold"));
        assert!(!html.contains("<b>bold"));
    }

    #[test]
    fn test_missing_template_is_error() {
        let templates = Templates::builtin().unwrap();
        assert!(matches!(
            templates.render("polls/missing.html", &Context::new()),
            Err(AppError::Template(_))
        ));
    }
}
