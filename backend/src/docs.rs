use std::path::PathBuf;

use pulldown_cmark::{html, Options, Parser};

use crate::error::{ApiError, Result};

/// The README served as the index page.
#[derive(Debug, Clone)]
pub struct Docs {
    path: PathBuf,
}

impl Docs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn render(&self) -> Result<String> {
        let markdown = match tokio::fs::read_to_string(&self.path).await {
            Ok(markdown) => markdown,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApiError::NotFound)
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("cannot read {}", self.path.display()))
                    .into())
            }
        };

        Ok(markdown_to_html(&markdown))
    }
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, Options::empty()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_code() {
        let out = markdown_to_html("# API\n\n`GET /devices`\n");

        assert!(out.contains("<h1>API</h1>"));
        assert!(out.contains("<code>GET /devices</code>"));
    }

    #[actix_web::test]
    async fn missing_readme_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let docs = Docs::new(dir.path().join("README.md"));

        assert!(matches!(docs.render().await, Err(ApiError::NotFound)));
    }
}
