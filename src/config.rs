//! Loads the JSON site configuration. Every field is optional; relative
//! directories are resolved against the directory containing the config
//! file.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use url::Url;

/// The file name looked up when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "oven.json";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Project {
    source_dir: PathBuf,
    pub_dir: PathBuf,
    theme_dir: PathBuf,
    base_url: Url,
    title: String,
    owner: String,
    date_format: String,
    extensions: Vec<String>,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            source_dir: PathBuf::from("./posts"),
            pub_dir: PathBuf::from("./public"),
            theme_dir: PathBuf::from("./theme"),
            // a literal; it always parses
            base_url: Url::parse("http://www.example.com/").unwrap(),
            title: String::from("An oven baked site"),
            owner: String::from("you <you@example.com>"),
            date_format: String::from("%Y-%m-%d"),
            extensions: vec![
                "md".to_owned(),
                "markdown".to_owned(),
                "txt".to_owned(),
            ],
        }
    }
}

/// The resolved site configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory containing the post sources.
    pub source_directory: PathBuf,

    /// Directory the site is written to.
    pub output_directory: PathBuf,

    /// Directory containing the theme templates.
    pub theme_directory: PathBuf,

    /// URL the output directory is published at. Always ends in `/`.
    pub base_url: Url,

    pub title: String,

    /// The site owner as `name <email>`; used as the feed author.
    pub owner: String,

    /// strftime pattern used for dates in templates.
    pub date_format: String,

    /// Extensions (without the dot) of files treated as posts. Empty means
    /// every file is a post.
    pub extensions: Vec<String>,
}

impl Config {
    /// Loads the config at `path`.
    pub fn from_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| Error::Deserialize {
                path: path.to_owned(),
                err,
            })?;
        let root = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_owned(),
            None => return Err(Error::NoParent(path.to_owned())),
        };
        Ok(Config::from_project(&root, project))
    }

    /// Searches `dir` and its ancestors for [`DEFAULT_CONFIG_FILE`] and loads
    /// the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let path = dir.join(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                return Config::from_file(&path);
            }
            current = dir.parent();
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    fn from_project(root: &Path, project: Project) -> Config {
        let mut base_url = project.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Config {
            source_directory: root.join(project.source_dir),
            output_directory: root.join(project.pub_dir),
            theme_directory: root.join(project.theme_dir),
            base_url,
            title: project.title,
            owner: project.owner,
            date_format: project.date_format,
            extensions: project.extensions,
        }
    }

    /// Returns true if `path` has one of the configured post extensions.
    pub fn is_post_file(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.extensions.iter().any(|want| {
                want.trim_start_matches('.').eq_ignore_ascii_case(ext)
            }),
            None => false,
        }
    }
}

/// Represents the result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("opening config file `{}`: {err}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("reading config file `{}`: {err}", path.display())]
    Deserialize {
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },

    #[error("can't get parent directory for config file `{}`", .0.display())]
    NoParent(PathBuf),

    #[error(
        "could not find `{}` in `{}` or any parent directory",
        DEFAULT_CONFIG_FILE,
        .0.display()
    )]
    NotFound(PathBuf),
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        File::create(&path)
            .unwrap()
            .write_all(contents.as_bytes())
            .unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{}");
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.source_directory, dir.path().join("./posts"));
        assert_eq!(config.output_directory, dir.path().join("./public"));
        assert_eq!(config.theme_directory, dir.path().join("./theme"));
        assert_eq!(config.base_url.as_str(), "http://www.example.com/");
        assert_eq!(config.title, "An oven baked site");
        assert_eq!(config.date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{
                "sourceDir": "content",
                "pubDir": "/srv/www",
                "baseUrl": "https://blog.example.org/notes",
                "title": "Notes",
                "owner": "Jane <jane@example.org>",
                "dateFormat": "%d.%m.%Y",
                "extensions": ["md"],
                "unknownKey": true
            }"#,
        );
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.source_directory, dir.path().join("content"));
        assert_eq!(config.output_directory, PathBuf::from("/srv/www"));
        assert_eq!(config.base_url.as_str(), "https://blog.example.org/notes/");
        assert_eq!(config.title, "Notes");
        assert_eq!(config.date_format, "%d.%m.%Y");
        assert!(config.is_post_file(Path::new("a/b.MD")));
        assert!(!config.is_post_file(Path::new("a/b.txt")));
        assert!(!config.is_post_file(Path::new("README")));
    }

    #[test]
    fn test_from_directory_searches_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), r#"{"title": "Found"}"#);
        let nested = dir.path().join("posts").join("drafts");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(Config::from_directory(&nested).unwrap().title, "Found");
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{ not json");
        assert!(matches!(
            Config::from_file(&path),
            Err(Error::Deserialize { .. })
        ));
    }

    #[test]
    fn test_empty_extensions_accepts_everything() {
        let config = Config::from_project(
            Path::new("."),
            Project {
                extensions: Vec::new(),
                ..Project::default()
            },
        );
        assert!(config.is_post_file(Path::new("README")));
    }
}
