//! Defines the [`Post`] type, the parsed representation of one source file.
//! A post holds its metadata eagerly and reads its body lazily from the
//! backing file, starting at [`Post::body_offset`].

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{
    date::{self, Timestamp},
    markdown,
    parser::{self, Parsed, PostParser},
    slug::Slugifier,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The source file backing the post.
    pub path: PathBuf,

    /// Header values keyed by lower-cased header name.
    pub headers: HashMap<String, String>,

    /// The display title. May be empty.
    pub title: String,

    /// The `author` header, if any.
    pub author: Option<String>,

    /// The `created` header if it resolved, else the file's modification
    /// time.
    pub created_at: Timestamp,

    /// Byte offset of the body in the source file. Zero means the whole file
    /// is body.
    pub body_offset: usize,
}

impl Post {
    /// Builds a post from the fields the parser extracted. `modified` is used
    /// when there is no resolvable `created` header.
    pub fn from_parsed(
        path: PathBuf,
        modified: Timestamp,
        parsed: Parsed,
    ) -> Post {
        if parsed.created.is_none() {
            if let Some(raw) = parsed.headers.get("created") {
                warn!(
                    "{}: unrecognized `created` date {:?}; \
                     using modification time",
                    path.display(),
                    raw
                );
            }
        }
        Post {
            created_at: parsed.created.unwrap_or(modified),
            path,
            headers: parsed.headers,
            title: parsed.title,
            author: parsed.author,
            body_offset: parsed.body_offset,
        }
    }

    /// Parses a post from `reader`, which holds the contents of `path`.
    pub fn from_reader<R: io::BufRead>(
        parser: &PostParser,
        path: PathBuf,
        modified: Timestamp,
        reader: R,
    ) -> parser::Result<Post> {
        let parsed = parser.parse(reader)?;
        Ok(Post::from_parsed(path, modified, parsed))
    }

    /// Opens and parses the post at `path`.
    pub fn open(parser: &PostParser, path: &Path) -> Result<Post> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let modified = file
            .metadata()
            .and_then(|metadata| metadata.modified())
            .map_err(|err| Error::Open {
                path: path.to_owned(),
                err,
            })?;
        Post::from_reader(
            parser,
            path.to_owned(),
            date::from_system_time(modified),
            BufReader::new(file),
        )
        .map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })
    }

    /// Returns the body portion of `source`, the full contents the post was
    /// parsed from.
    pub fn body_of<'s>(&self, source: &'s [u8]) -> Option<&'s [u8]> {
        source.get(self.body_offset..)
    }

    /// Reads the post body from the backing file.
    pub fn body(&self) -> Result<Vec<u8>> {
        let source = std::fs::read(&self.path).map_err(|err| Error::Open {
            path: self.path.clone(),
            err,
        })?;
        match self.body_of(&source) {
            Some(body) => Ok(body.to_vec()),
            None => Err(Error::BodyOutOfRange {
                path: self.path.clone(),
                offset: self.body_offset,
                len: source.len(),
            }),
        }
    }

    /// Reads the body and renders it from Markdown into HTML.
    pub fn render_body(&self) -> Result<String> {
        let body = self.body()?;
        Ok(markdown::to_html(&String::from_utf8_lossy(&body)))
    }

    /// Returns the slugified title. May be empty; see [`Slugifier::slugify`].
    pub fn slug(&self, slugifier: &Slugifier) -> String {
        slugifier.slugify(&self.title)
    }
}

/// Represents the result of a [`Post`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error opening, parsing or reading a [`Post`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the source file can't be opened or read.
    #[error("opening post `{}`: {err}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when the source stream fails partway through parsing.
    #[error("parsing post `{}`: {err}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: parser::Error,
    },

    /// Returned when the source file has shrunk since it was parsed.
    #[error(
        "post `{}` is {len} bytes but its body starts at {offset}",
        path.display()
    )]
    BodyOutOfRange {
        path: PathBuf,
        offset: usize,
        len: usize,
    },
}

impl Error {
    /// The source file the error concerns.
    pub fn path(&self) -> &Path {
        match self {
            Error::Open { path, .. } => path,
            Error::Parse { path, .. } => path,
            Error::BodyOutOfRange { path, .. } => path,
        }
    }
}
