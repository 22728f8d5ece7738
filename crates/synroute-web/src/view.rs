//! Page model and the mapping from action outcomes to what the user sees.
//!
//! Rendering is a pure function of [`PageView`]; handlers build a fresh view
//! for every request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use minijinja::Environment;
use serde::Serialize;
use synroute_config::PageConfig;
use synroute_molecules::{ActionOutcome, DepictError, RouteError, RouteImage, SmilesError};

pub const ROUTE_CAPTION: &str = "Synthetic route from RXNMapper";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
}

/// A message shown in place of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: Level::Warning, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageBlock {
    pub src: String,
    pub alt: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub title: String,
    pub caption: String,
    pub smiles: String,
    pub formula: Option<String>,
    pub structure: Option<ImageBlock>,
    pub route: Option<ImageBlock>,
    pub notices: Vec<Notice>,
}

impl PageView {
    /// The initial page: default input, no output.
    pub fn blank(page: &PageConfig) -> Self {
        Self::with_input(page, page.default_smiles.clone())
    }

    pub fn with_input(page: &PageConfig, smiles: String) -> Self {
        Self {
            title: page.title.clone(),
            caption: page.caption.clone(),
            smiles,
            formula: None,
            structure: None,
            route: None,
            notices: Vec::new(),
        }
    }

    /// Fill the output area from a finished action.
    pub fn show_outcome(mut self, outcome: &ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::InvalidInput(e) => self.notices.push(invalid_input_notice(e)),
            ActionOutcome::RenderFailed(e) => self.notices.push(render_failed_notice(e)),
            ActionOutcome::Completed { structure, route } => {
                self.formula = Some(structure.formula().to_string());
                self.structure = Some(ImageBlock {
                    src: data_uri("image/png", &structure.depiction().png),
                    alt: structure.smiles().to_string(),
                    caption: None,
                });
                match route {
                    Ok(image) => self.route = Some(route_block(image)),
                    Err(e) => self.notices.push(route_notice(e)),
                }
            }
        }
        self
    }

    /// Show a failure that escaped the action itself.
    pub fn show_failure(mut self, description: &str) -> Self {
        self.notices.push(failure_notice(description));
        self
    }
}

pub fn invalid_input_notice(err: &SmilesError) -> Notice {
    Notice::error(format!("Invalid SMILES string: {}", err))
}

pub fn render_failed_notice(err: &DepictError) -> Notice {
    Notice::error(format!("Failed to draw the molecule structure: {}", err))
}

pub fn failure_notice(description: &str) -> Notice {
    Notice::error(format!("Processing error: {}", description))
}

/// The message for a route prediction that produced no image.
pub fn route_notice(err: &RouteError) -> Notice {
    match err {
        RouteError::RemoteStatus(_) => Notice::warning("Error calling the route prediction service"),
        RouteError::MissingImageLocator => Notice::warning("The response does not contain a route image"),
        RouteError::ImageFetch(_) => Notice::warning("Failed to load the result image"),
        other => Notice::error(format!("Error calling the route prediction service: {}", other)),
    }
}

fn route_block(image: &RouteImage) -> ImageBlock {
    ImageBlock {
        src: data_uri(image.format.mime(), &image.bytes),
        alt: image.locator.clone(),
        caption: Some(ROUTE_CAPTION.to_string()),
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

pub fn render_page(templates: &Environment<'_>, view: &PageView) -> Result<String, minijinja::Error> {
    templates.get_template("page.html")?.render(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synroute_molecules::{Depicter, ImageFormat, SynthesisPlanner};

    fn page() -> PageConfig {
        PageConfig::default()
    }

    fn templates() -> Environment<'static> {
        let mut env = Environment::new();
        env.add_template("page.html", include_str!("../templates/page.html")).unwrap();
        env
    }

    #[test]
    fn test_route_notice_levels() {
        assert_eq!(route_notice(&RouteError::RemoteStatus(500)).level, Level::Warning);
        assert_eq!(route_notice(&RouteError::MissingImageLocator).level, Level::Warning);
        assert_eq!(
            route_notice(&RouteError::ImageFetch(404)),
            Notice::warning("Failed to load the result image")
        );

        let transport = route_notice(&RouteError::Transport("connection refused".into()));
        assert_eq!(transport.level, Level::Error);
        assert_eq!(transport.message, "Error calling the route prediction service: connection refused");
        assert_eq!(route_notice(&RouteError::UndecodableImage).level, Level::Error);
    }

    #[test]
    fn test_blank_page_prefills_default() {
        let html = render_page(&templates(), &PageView::blank(&page())).unwrap();
        assert!(html.contains(r#"value="CC(=O)Oc1ccccc1C(=O)O""#));
        assert!(html.contains("Synthesis route planning for biomedical compounds"));
        assert!(html.contains("© 2025"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_input_is_escaped() {
        let view = PageView::with_input(&page(), r#""><script>alert(1)</script>"#.to_string());
        let html = render_page(&templates(), &view).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn test_invalid_input_shows_only_error() {
        let outcome = ActionOutcome::InvalidInput(synroute_molecules::SmilesError::EmptyInput);
        let view = PageView::with_input(&page(), String::new()).show_outcome(&outcome);
        assert!(view.structure.is_none());
        assert_eq!(view.notices.len(), 1);
        assert!(view.notices[0].message.starts_with("Invalid SMILES string"));

        let html = render_page(&templates(), &view).unwrap();
        assert!(html.contains("Invalid SMILES string"));
        assert!(!html.contains("Molecule structure"));
    }

    #[test]
    fn test_completed_outcome_shows_both_images() {
        struct Never;
        #[async_trait::async_trait]
        impl synroute_molecules::RoutePredictor for Never {
            async fn predict(&self, _: &str) -> Result<RouteImage, RouteError> {
                Err(RouteError::Transport("unused".into()))
            }
        }

        let planner = SynthesisPlanner::new(Depicter::new(120), std::sync::Arc::new(Never));
        let structure = planner.prepare("CCO").unwrap();
        let outcome = ActionOutcome::Completed {
            structure,
            route: Ok(RouteImage {
                locator: "http://stub/route.gif".into(),
                format: ImageFormat::Gif,
                bytes: b"GIF89a".to_vec(),
            }),
        };
        let view = PageView::blank(&page()).show_outcome(&outcome);
        assert_eq!(view.formula.as_deref(), Some("C2H6O"));
        assert!(view.notices.is_empty());
        assert!(view.route.as_ref().unwrap().src.starts_with("data:image/gif;base64,"));

        let html = render_page(&templates(), &view).unwrap();
        assert!(html.contains("Molecule structure"));
        assert!(html.contains("Predicted synthesis route (RXNMapper API)"));
        assert!(html.contains(ROUTE_CAPTION));
        assert_eq!(html.matches("<img").count(), 2);
    }

    #[test]
    fn test_failure_message() {
        let view = PageView::blank(&page()).show_failure("task panicked");
        assert_eq!(view.notices, vec![Notice::error("Processing error: task panicked")]);
    }
}
