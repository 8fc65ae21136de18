//! Static files with conditional and byte range requests.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use ferry_http::handler::Handler;
use ferry_http::protocol::body::ReqBody;
use ferry_http::range::{ByteRange, RangeReader};
use http::header::{ACCEPT_RANGES, ALLOW, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED, LOCATION};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use percent_encoding::percent_decode_str;
use tokio::fs::{self, File};
use tracing::{debug, info};

use crate::body::{BoxError, ResponseBody};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Serves the files below a content root for GET and HEAD requests.
///
/// Directories are answered with their `index.html` or `index.htm`; there are no
/// directory listings.
#[derive(Debug, Clone)]
pub struct FileHandler {
    root: PathBuf,
}

impl FileHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path onto the file system below the root.
    ///
    /// The query and fragment are dropped and the path is percent-decoded. `..`
    /// never climbs above the root and `.` segments are skipped.
    pub fn translate_path(&self, path: &str) -> PathBuf {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let decoded = percent_decode_str(path).decode_utf8_lossy();

        let mut words: Vec<&str> = Vec::new();
        for word in decoded.split('/') {
            match word {
                "" | "." => {}
                ".." => {
                    words.pop();
                }
                word => words.push(word),
            }
        }

        let mut translated = self.root.clone();
        for word in words {
            // a decoded word may still hold separators or a drive prefix, keep only plain names
            for component in Path::new(word).components() {
                if let Component::Normal(name) = component {
                    translated.push(name);
                }
            }
        }
        translated
    }

    async fn serve(&self, uri: &Uri, headers: &HeaderMap) -> Result<Response<ResponseBody>, BoxError> {
        let mut path = self.translate_path(uri.path());

        let Ok(metadata) = fs::metadata(&path).await else {
            return status_response(StatusCode::NOT_FOUND);
        };

        if metadata.is_dir() {
            if !uri.path().ends_with('/') {
                let location = match uri.query() {
                    Some(query) => format!("{}/?{query}", uri.path()),
                    None => format!("{}/", uri.path()),
                };
                debug!(location = %location, "redirect directory");
                return Ok(Response::builder().status(StatusCode::MOVED_PERMANENTLY).header(LOCATION, location).body(ResponseBody::empty())?);
            }

            match find_index(&path).await {
                Some(index) => path = index,
                None => return status_response(StatusCode::NOT_FOUND),
            }
        }

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), cause = %e, "can't open file");
                return status_response(StatusCode::NOT_FOUND);
            }
        };

        let metadata = file.metadata().await?;
        let length = metadata.len();
        let last_modified = metadata.modified().ok().map(httpdate::fmt_http_date);
        let content_type = mime_guess::from_path(&path).first_or_octet_stream();

        let mut builder = Response::builder().header(CONTENT_TYPE, content_type.as_ref()).header(ACCEPT_RANGES, "bytes");
        if let Some(last_modified) = &last_modified {
            builder = builder.header(LAST_MODIFIED, last_modified);
        }

        let Some(range) = ByteRange::from_headers(headers) else {
            if let Some(last_modified) = &last_modified
                && headers.get(IF_MODIFIED_SINCE).is_some_and(|since| since.as_bytes() == last_modified.as_bytes())
            {
                return status_response(StatusCode::NOT_MODIFIED);
            }

            let reader = RangeReader::new(file, 0, length.checked_sub(1));
            return Ok(builder.status(StatusCode::OK).header(CONTENT_LENGTH, length).body(file_body(reader))?);
        };

        match range.resolve(length) {
            Ok(resolved) => {
                info!(path = %path.display(), range = %resolved.content_range(), "serve partial content");
                let reader = RangeReader::for_range(file, &resolved);
                Ok(builder
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(CONTENT_RANGE, resolved.content_range())
                    .header(CONTENT_LENGTH, resolved.len())
                    .body(file_body(reader))?)
            }
            Err(e) => {
                debug!(path = %path.display(), cause = %e, "range not satisfiable");
                let mut response = status_response(StatusCode::RANGE_NOT_SATISFIABLE)?;
                if let Some(content_range) = e.content_range() {
                    response.headers_mut().insert(CONTENT_RANGE, content_range.try_into()?);
                }
                Ok(response)
            }
        }
    }
}

#[async_trait]
impl Handler<ReqBody> for FileHandler {
    type RespBody = ResponseBody;
    type Error = BoxError;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        match *req.method() {
            // HEAD gets the same head, the connection drops the body
            Method::GET | Method::HEAD => self.serve(req.uri(), req.headers()).await,
            _ => {
                let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED)?;
                response.headers_mut().insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
                Ok(response)
            }
        }
    }
}

async fn find_index(dir: &Path) -> Option<PathBuf> {
    for name in INDEX_FILES {
        let index = dir.join(name);
        if fs::metadata(&index).await.is_ok_and(|metadata| metadata.is_file()) {
            return Some(index);
        }
    }
    None
}

fn file_body(reader: RangeReader<File>) -> ResponseBody {
    let stream = futures::stream::try_unfold(reader, |mut reader| async move {
        let bytes = reader.read(READ_CHUNK_SIZE).await?;
        if bytes.is_empty() { Ok::<_, std::io::Error>(None) } else { Ok(Some((bytes, reader))) }
    });
    ResponseBody::from_stream(stream)
}

/// A plain text response naming the status, or an empty one where no body is allowed.
pub(crate) fn status_response(status: StatusCode) -> Result<Response<ResponseBody>, BoxError> {
    let builder = Response::builder().status(status);
    if status == StatusCode::NOT_MODIFIED {
        return Ok(builder.body(ResponseBody::empty())?);
    }

    let text = format!("{} {}\n", status.as_str(), status.canonical_reason().unwrap_or_default());
    Ok(builder.header(CONTENT_TYPE, "text/plain; charset=utf-8").body(ResponseBody::from(text))?)
}
