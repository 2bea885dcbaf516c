//! libcurl-backed transport (one Easy handle per request).

use std::time::Duration;

use super::Transport;
use crate::encoder::EncodedForm;
use crate::error::{response_prefix, UploadError};

/// Connection settings for [`CurlTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub url: String,
    pub user_agent: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub verify_tls: bool,
    pub follow_redirects: bool,
}

impl TransportOptions {
    pub fn from_config(cfg: &crate::config::UplConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            user_agent: cfg.user_agent.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            verify_tls: cfg.verify_tls,
            follow_redirects: cfg.follow_redirects,
        }
    }
}

/// POSTs multipart bodies with libcurl.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    opts: TransportOptions,
}

impl CurlTransport {
    pub fn new(opts: TransportOptions) -> Self {
        Self { opts }
    }

    pub fn url(&self) -> &str {
        &self.opts.url
    }
}

impl Transport for CurlTransport {
    fn post(&self, form: &EncodedForm) -> Result<String, UploadError> {
        let mut response: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&self.opts.url)?;
        easy.post(true)?;
        easy.post_field_size(form.body.len() as u64)?;
        easy.post_fields_copy(&form.body)?;
        easy.useragent(&self.opts.user_agent)?;
        easy.timeout(self.opts.timeout)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.ssl_verify_peer(self.opts.verify_tls)?;
        easy.ssl_verify_host(self.opts.verify_tls)?;
        easy.follow_location(self.opts.follow_redirects)?;
        if self.opts.follow_redirects {
            easy.max_redirections(10)?;
        }

        let mut list = curl::easy::List::new();
        list.append(&format!("Content-Type: {}", form.content_type()))?;
        // Send the body immediately instead of waiting on 100-continue.
        list.append("Expect:")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        let body = String::from_utf8_lossy(&response).into_owned();
        if !(200..300).contains(&code) {
            return Err(UploadError::Http {
                status: code,
                body: response_prefix(&body).to_string(),
            });
        }
        tracing::trace!(status = code, bytes = form.body.len(), "POST {}", self.opts.url);
        Ok(body)
    }
}
