//! Initialize a new blog

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# blogatin configuration

# Site
title: blogatin
language: pt-BR
timezone: America/Sao_Paulo
logo: /images/codeVector.svg
root: /

# Directory
public_dir: public
static_dir: static

# Content store
prismic:
  endpoint: ''
  document_type: posts
  page_size: 20
# Remove to read posts from prismic.endpoint instead
fixtures: posts.json

# Post pages rendered ahead of time; leave empty to render every post
static_paths: []

# Rendering
reading:
  words_per_minute: 200
nav_title_length: 20
date_format: dd MMM yyyy
edited_format: "'*editado em 'dd MMM yyyy 'ás' HH:mm"

# Revalidation (seconds)
revalidate:
  listing: 86400
  detail: 86400
  fallback: 10

# utterances
comments:
  repo: ''
  issue_term: pathname
  theme: github-dark
"#;

const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="25" viewBox="0 0 40 25"><path d="M12 2 2 12.5 12 23M28 2l10 10.5L28 23" fill="none" stroke="#ff57b2" stroke-width="3"/></svg>
"##;

const POSTS: &str = r#"[
  {
    "id": "YFdHdhIAACMAnVxg",
    "uid": "como-utilizar-hooks",
    "type": "posts",
    "first_publication_date": "2021-03-15T19:25:28+0000",
    "last_publication_date": "2021-03-15T19:25:28+0000",
    "data": {
      "title": "Como utilizar Hooks",
      "subtitle": "Pensando em sincronização em vez de ciclos de vida",
      "author": "Joseph Oliveira",
      "banner": {"url": null},
      "content": [
        {
          "heading": "Proin et varius",
          "body": [
            {"type": "paragraph", "text": "Nullam dolor sapien, vulputate eu diam at, condimentum hendrerit tellus.", "spans": []}
          ]
        }
      ]
    }
  }
]
"#;

/// Initialize a new blog in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    if target_dir.join("_config.yml").exists() {
        bail!("{:?} already contains a _config.yml", target_dir);
    }

    fs::create_dir_all(target_dir.join("static/images"))?;
    fs::create_dir_all(target_dir.join("languages"))?;

    fs::write(target_dir.join("_config.yml"), CONFIG)?;
    fs::write(target_dir.join("static/images/codeVector.svg"), LOGO)?;
    fs::write(target_dir.join("posts.json"), POSTS)?;

    tracing::info!("Initialized blog in {:?}", target_dir);
    Ok(())
}
