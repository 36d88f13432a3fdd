//! Discovers and compiles the theme templates. A theme directory holds base
//! templates (`*.html`, typically `{{define}}` blocks shared by every page)
//! and page templates (`pages/*.html`). Each page template is compiled
//! together with all of the base templates.

use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    iter,
    path::{Path, PathBuf},
};

use gtmpl::Template;

/// The page template used for post pages.
pub const POST_TEMPLATE: &str = "post.html";

/// The page template used for the index page.
pub const INDEX_TEMPLATE: &str = "index.html";

/// The compiled page templates of a theme, keyed by file name.
pub struct Theme {
    templates: HashMap<String, Template>,
}

impl Theme {
    /// Loads the theme in `dir`. The theme must provide [`POST_TEMPLATE`] and
    /// [`INDEX_TEMPLATE`] page templates.
    pub fn load(dir: &Path) -> Result<Theme> {
        let base_files = html_files(dir)?;
        let mut templates = HashMap::new();
        for page_file in html_files(&dir.join("pages"))? {
            let name = match page_file.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_owned(),
                None => continue,
            };
            let files = base_files.iter().chain(iter::once(&page_file));
            let template = parse_template(files)?;
            templates.insert(name, template);
        }

        for required in &[POST_TEMPLATE, INDEX_TEMPLATE] {
            if !templates.contains_key(*required) {
                return Err(Error::MissingTemplate {
                    theme: dir.to_owned(),
                    name: (*required).to_owned(),
                });
            }
        }

        Ok(Theme { templates })
    }

    /// The compiled [`POST_TEMPLATE`].
    pub fn post(&self) -> &Template {
        // presence is checked in `load`
        &self.templates[POST_TEMPLATE]
    }

    /// The compiled [`INDEX_TEMPLATE`].
    pub fn index(&self) -> &Template {
        &self.templates[INDEX_TEMPLATE]
    }
}

// Lists the `.html` files directly inside `dir`, sorted by name so that
// templates are always concatenated in the same order. A missing directory
// has no files.
fn html_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Vec::new())
        }
        Err(err) => {
            return Err(Error::Io {
                path: dir.to_owned(),
                err,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| Error::Io {
            path: dir.to_owned(),
            err,
        })?;
        let path = entry.path();
        let is_html = path.extension().map_or(false, |ext| ext == "html");
        if path.is_file() && is_html {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// Loads the template file contents, appends them to one another, and parses
// the result into a template.
fn parse_template<P: AsRef<Path>>(
    template_files: impl Iterator<Item = P>,
) -> Result<Template> {
    let mut contents = String::new();
    let mut last = PathBuf::new();
    for template_file in template_files {
        let template_file = template_file.as_ref();
        File::open(template_file)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|err| Error::Io {
                path: template_file.to_owned(),
                err,
            })?;
        contents.push(' ');
        last = template_file.to_owned();
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(|err| Error::Parse {
        path: last,
        err: err.to_string(),
    })?;
    Ok(template)
}

/// Represents the result of loading a [`Theme`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for I/O problems while reading template files.
    #[error("reading template `{}`: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for errors parsing template files.
    #[error("parsing template `{}`: {err}", path.display())]
    Parse { path: PathBuf, err: String },

    #[error("theme `{}` has no `pages/{name}` template", theme.display())]
    MissingTemplate { theme: PathBuf, name: String },
}
