//! Blocking HTTP page fetcher (libcurl).
//!
//! Streams one response body into `<dest>.part` and renames it onto `dest`
//! on a 2xx status. Redirects are followed here rather than by libcurl so
//! the `Cookie` header is recomputed for every hop.

mod cookies;

pub use cookies::{host_matches, CookieScope};

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use curl::easy::{Easy, List};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{PdmError, Result};
use crate::storage;

const MAX_REDIRECTS: u32 = 10;

/// Parse a page or redirect URL. Only http(s) reaches libcurl.
fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| PdmError::Validation(format!("invalid url {raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PdmError::Validation(format!("unsupported scheme {other} in {raw}"))),
    }
}

fn default_user_agent() -> String {
    format!("pdm/{}", env!("CARGO_PKG_VERSION"))
}

/// Per-job fetcher: HTTP options plus the job's cookie scope.
#[derive(Debug, Clone)]
pub struct Fetcher {
    opts: HttpConfig,
    cookies: CookieScope,
}

impl Fetcher {
    pub fn new(opts: HttpConfig, cookies: CookieScope) -> Self {
        Self { opts, cookies }
    }

    fn transport(url: &Url, source: curl::Error) -> PdmError {
        PdmError::Transport {
            url: url.to_string(),
            source,
        }
    }

    fn configure(&self, easy: &mut Easy, url: &Url) -> Result<()> {
        let t = |e| Self::transport(url, e);
        easy.follow_location(false).map_err(t)?;
        easy.connect_timeout(self.opts.connect_timeout()).map_err(t)?;
        easy.low_speed_limit(1).map_err(t)?;
        easy.low_speed_time(self.opts.low_speed_time()).map_err(t)?;
        easy.timeout(self.opts.timeout()).map_err(t)?;
        let ua = self
            .opts
            .user_agent
            .clone()
            .unwrap_or_else(default_user_agent);
        easy.useragent(&ua).map_err(t)?;
        if !self.opts.resolve.is_empty() {
            let mut list = List::new();
            for entry in &self.opts.resolve {
                list.append(entry).map_err(t)?;
            }
            easy.resolve(list).map_err(t)?;
        }
        Ok(())
    }

    /// Fetch `url` into `dest`. Returns the number of bytes written.
    /// On any failure the `.part` file is removed and `dest` is untouched.
    pub fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        let start = parse_http_url(url)?;
        let tmp = storage::temp_path(dest);
        let result = self.fetch_following_redirects(&start, &tmp);
        match result {
            Ok(written) => {
                storage::finalize(&tmp, dest)?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn fetch_following_redirects(&self, start: &Url, tmp: &Path) -> Result<u64> {
        let mut easy = Easy::new();
        self.configure(&mut easy, start)?;

        let mut current = start.clone();
        for _ in 0..=MAX_REDIRECTS {
            let t = |e| Self::transport(&current, e);
            easy.url(current.as_str()).map_err(t)?;

            // Cookies are decided per hop: a redirect to another host gets none.
            let mut headers = List::new();
            if let Some(cookie) = self.cookies.header_for(&current) {
                headers.append(&format!("Cookie: {cookie}")).map_err(t)?;
            }
            easy.http_headers(headers).map_err(t)?;

            let written = self.perform_into(&mut easy, &current, tmp)?;
            let code = easy.response_code().map_err(t)?;

            if (300..400).contains(&code) {
                let next = easy.redirect_url().map_err(t)?.map(str::to_owned);
                if let Some(next) = next {
                    let next = parse_http_url(&next)?;
                    tracing::debug!(from = %current, to = %next, code, "following redirect");
                    current = next;
                    continue;
                }
            }
            if !(200..300).contains(&code) {
                return Err(PdmError::HttpStatus {
                    url: current.to_string(),
                    status: code,
                });
            }
            return Ok(written);
        }
        Err(PdmError::TooManyRedirects {
            url: start.to_string(),
        })
    }

    /// Run one transfer, truncating `tmp` first so only the final hop's body remains.
    fn perform_into(&self, easy: &mut Easy, url: &Url, tmp: &Path) -> Result<u64> {
        let mut file =
            File::create(tmp).map_err(|e| PdmError::fs(format!("create {}", tmp.display()), e))?;
        let mut written: u64 = 0;
        let mut write_err: Option<std::io::Error> = None;

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match file.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        write_err = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(|e| Self::transport(url, e))?;
            transfer.perform()
        };

        if let Some(e) = write_err {
            return Err(PdmError::fs(format!("write {}", tmp.display()), e));
        }
        performed.map_err(|e| Self::transport(url, e))?;
        file.sync_all()
            .map_err(|e| PdmError::fs(format!("sync {}", tmp.display()), e))?;
        Ok(written)
    }
}
