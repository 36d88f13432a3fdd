//! Templates and writes the HTML pages for a linked [`Pages`] sequence: one
//! page per post plus the index page.

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use gtmpl::{Template, Value};
use tracing::{debug, warn};
use url::Url;

use crate::{
    collection::{PageLink, Pages},
    date::Timestamp,
    post::{self, Post},
    slug::Slugifier,
    theme::Theme,
};

/// The output file name of the index page.
pub const INDEX_FILE: &str = "index.html";

/// Picks an output file name for every page, by position. A page's name is
/// its slug plus `.html`; an empty slug falls back to `post-{n}` (`n` is the
/// 1-based position) and a name already taken gets a `-2`, `-3`, ... suffix.
/// Names are compared case-insensitively so that no two pages (or a page and
/// the index) share a file on a case-insensitive filesystem.
pub fn file_names(pages: &Pages, slugifier: &Slugifier) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    taken.insert("index".to_owned());
    pages
        .iter()
        .map(|link| {
            let mut stem = link.post.slug(slugifier);
            if stem.is_empty() {
                stem = format!("post-{}", link.index() + 1);
                warn!(
                    "{}: title {:?} has no slug; writing it as `{}.html`",
                    link.post.path.display(),
                    link.post.title,
                    stem
                );
            }
            let mut candidate = stem.clone();
            let mut n = 2;
            while !taken.insert(candidate.to_lowercase()) {
                candidate = format!("{}-{}", stem, n);
                n += 1;
            }
            format!("{}.html", candidate)
        })
        .collect()
}

/// Site-wide values made available to every template as `site`.
pub struct Site<'a> {
    pub title: &'a str,
    pub base_url: &'a Url,
    pub owner: &'a str,
    pub date_format: &'a str,
}

impl Site<'_> {
    fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.to_owned()));
        m.insert(
            "base_url".to_owned(),
            Value::String(self.base_url.to_string()),
        );
        m.insert("owner".to_owned(), Value::String(self.owner.to_owned()));
        Value::Object(m)
    }

    fn format_date(&self, ts: &Timestamp) -> Result<String> {
        use std::fmt::Write as _;
        let mut out = String::new();
        write!(out, "{}", ts.format(self.date_format))
            .map_err(|_| Error::DateFormat(self.date_format.to_owned()))?;
        Ok(out)
    }

    fn url(&self, file_name: &str) -> Result<Url> {
        Ok(self.base_url.join(file_name)?)
    }
}

/// Responsible for templating and writing HTML pages to disk.
pub struct Writer<'a> {
    pub theme: &'a Theme,
    pub site: Site<'a>,

    /// The directory in which the HTML files are written.
    pub output_directory: &'a Path,
}

/// The outcome of [`Writer::write_pages`].
#[derive(Debug, Default)]
pub struct Written {
    /// Every file written, post pages first.
    pub files: Vec<PathBuf>,

    /// Posts whose body couldn't be read. Their pages are not written but
    /// still appear in the index and in their neighbors' links.
    pub failed: Vec<post::Error>,
}

impl Writer<'_> {
    /// Writes one page per post and the index page. `file_names` holds the
    /// output file name for each page, by position (see [`file_names`]).
    pub fn write_pages(
        &self,
        pages: &Pages,
        file_names: &[String],
    ) -> Result<Written> {
        std::fs::create_dir_all(self.output_directory).map_err(|err| {
            Error::Io {
                path: self.output_directory.to_owned(),
                err,
            }
        })?;

        let mut written = Written::default();
        for link in pages {
            let file_name = &file_names[link.index()];
            let body = match link.post.render_body() {
                Ok(body) => body,
                Err(err) => {
                    warn!("skipping page for {}", err);
                    written.failed.push(err);
                    continue;
                }
            };
            let value = self.post_value(pages, link, file_names, body)?;
            let path = self.output_directory.join(file_name);
            self.write_page(self.theme.post(), value, &path)?;
            written.files.push(path);
        }

        let value = self.index_value(pages, file_names)?;
        let path = self.output_directory.join(INDEX_FILE);
        self.write_page(self.theme.index(), value, &path)?;
        written.files.push(path);
        Ok(written)
    }

    fn write_page(
        &self,
        template: &Template,
        value: Value,
        path: &Path,
    ) -> Result<()> {
        debug!("writing {}", path.display());
        let context = gtmpl::Context::from(value).map_err(Error::Template)?;
        let io_err = |err| Error::Io {
            path: path.to_owned(),
            err,
        };
        let mut w = BufWriter::new(File::create(path).map_err(io_err)?);
        template.execute(&mut w, &context).map_err(Error::Template)?;
        w.flush().map_err(io_err)
    }

    fn post_value(
        &self,
        pages: &Pages,
        link: &PageLink,
        file_names: &[String],
        body: String,
    ) -> Result<Value> {
        let post = &link.post;
        let url = self.site.url(&file_names[link.index()])?;
        let mut item = self.summary(post, &url)?;
        item.insert("slug".to_owned(), {
            let name = &file_names[link.index()];
            Value::String(name.trim_end_matches(".html").to_owned())
        });
        item.insert(
            "created_rfc3339".to_owned(),
            Value::String(post.created_at.to_rfc3339()),
        );
        item.insert(
            "headers".to_owned(),
            Value::Object(
                post.headers
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );
        item.insert("body".to_owned(), Value::String(body));

        let neighbor = |other: Option<&PageLink>| -> Result<Value> {
            match other {
                None => Ok(Value::Nil),
                Some(other) => {
                    let mut m: HashMap<String, Value> = HashMap::new();
                    let url = self.site.url(&file_names[other.index()])?;
                    let title = other.post.title.clone();
                    m.insert("title".to_owned(), Value::String(title));
                    m.insert("url".to_owned(), Value::String(url.to_string()));
                    Ok(Value::Object(m))
                }
            }
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("site".to_owned(), self.site.to_value());
        m.insert("title".to_owned(), Value::String(post.title.clone()));
        m.insert("url".to_owned(), Value::String(url.to_string()));
        m.insert("post".to_owned(), Value::Object(item));
        m.insert("prev".to_owned(), neighbor(pages.prev(link))?);
        m.insert("next".to_owned(), neighbor(pages.next(link))?);
        Ok(Value::Object(m))
    }

    fn index_value(
        &self,
        pages: &Pages,
        file_names: &[String],
    ) -> Result<Value> {
        let summaries = pages
            .iter()
            .map(|link| {
                let url = self.site.url(&file_names[link.index()])?;
                self.summary(&link.post, &url).map(Value::Object)
            })
            .collect::<Result<Vec<Value>>>()?;

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("site".to_owned(), self.site.to_value());
        m.insert("title".to_owned(), Value::String("Posts".to_owned()));
        m.insert(
            "url".to_owned(),
            Value::String(self.site.url(INDEX_FILE)?.to_string()),
        );
        m.insert("pages".to_owned(), Value::Array(summaries));
        Ok(Value::Object(m))
    }

    fn summary(
        &self,
        post: &Post,
        url: &Url,
    ) -> Result<HashMap<String, Value>> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(post.title.clone()));
        m.insert("url".to_owned(), Value::String(url.to_string()));
        m.insert(
            "created".to_owned(),
            Value::String(self.site.format_date(&post.created_at)?),
        );
        m.insert(
            "author".to_owned(),
            match &post.author {
                Some(author) => Value::String(author.clone()),
                None => Value::Nil,
            },
        );
        Ok(m)
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error during templating.
    #[error("templating: {0}")]
    Template(String),

    /// An error writing the output files.
    #[error("writing `{}`: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when a page URL can't be built from the base URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// Returned when the configured date format is not a valid strftime
    /// pattern.
    #[error("invalid date format {0:?}")]
    DateFormat(String),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::collection::PostCollection;
    use chrono::{TimeZone, Utc};

    fn pages(titles: &[&str]) -> Pages {
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| Post {
                path: PathBuf::from(format!("{}.md", i)),
                headers: HashMap::new(),
                title: title.to_string(),
                author: None,
                created_at: Utc
                    .with_ymd_and_hms(2021, 5, 1 + i as u32, 0, 0, 0)
                    .unwrap()
                    .into(),
                body_offset: 0,
            })
            .collect::<PostCollection>()
            .build()
    }

    #[test]
    fn test_file_names() {
        let pages = pages(&[
            "Hello, World!",
            "",
            "Hello World",
            "index",
            "Hello World",
        ]);
        assert_eq!(
            file_names(&pages, &Slugifier::new()),
            vec![
                "Hello-World.html",
                "post-2.html",
                "Hello-World-2.html",
                "index-2.html",
                "Hello-World-3.html",
            ]
        );
    }

    #[test]
    fn test_file_names_ignore_case() {
        let pages =
            pages(&["Index", "Hello World", "hello world", "HELLO-WORLD"]);
        assert_eq!(
            file_names(&pages, &Slugifier::new()),
            vec![
                "Index-2.html",
                "Hello-World.html",
                "hello-world-2.html",
                "HELLO-WORLD-3.html",
            ]
        );
    }

    #[test]
    fn test_format_date() {
        let base_url = Url::parse("https://example.com/blog/").unwrap();
        let site = Site {
            title: "t",
            base_url: &base_url,
            owner: "o",
            date_format: "%d.%m.%Y",
        };
        let ts: Timestamp =
            Utc.with_ymd_and_hms(2021, 5, 3, 0, 0, 0).unwrap().into();
        assert_eq!(site.format_date(&ts).unwrap(), "03.05.2021");
        assert_eq!(
            site.url("a.html").unwrap().as_str(),
            "https://example.com/blog/a.html"
        );

        let bad = Site {
            date_format: "%Q",
            ..site
        };
        assert!(matches!(bad.format_date(&ts), Err(Error::DateFormat(_))));
    }
}
