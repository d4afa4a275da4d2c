//! Dataset metadata catalog (DAS).

use serde::Deserialize;

use crate::error::{GridError, GridResult};
use crate::retry::retry;

/// Reply of a catalog query. Only the fields needed for parent lookups are
/// decoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogResponse {
    pub status: String,
    #[serde(default)]
    pub data: Vec<CatalogRecord>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub parent: Vec<ParentEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParentEntry {
    pub name: String,
}

impl CatalogResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

pub trait DatasetCatalog {
    fn query(&self, query: &str) -> GridResult<CatalogResponse>;
}

impl<C: DatasetCatalog + ?Sized> DatasetCatalog for &C {
    fn query(&self, query: &str) -> GridResult<CatalogResponse> {
        (**self).query(query)
    }
}

impl<C: DatasetCatalog + ?Sized> DatasetCatalog for Box<C> {
    fn query(&self, query: &str) -> GridResult<CatalogResponse> {
        (**self).query(query)
    }
}

pub fn parent_query(dataset: &str) -> String {
    format!("parent dataset={}", dataset)
}

/// Look up the unique parent of `dataset`.
///
/// The query and its status check are retried up to `attempts` times. The
/// answer must hold exactly one record with exactly one parent; anything
/// else fails at once without another query.
pub fn resolve_parent<C>(catalog: &C, dataset: &str, attempts: u32) -> GridResult<String>
where
    C: DatasetCatalog + ?Sized,
{
    let query = parent_query(dataset);
    let response = retry(attempts, |attempt| {
        log::debug!("DAS query '{}' (attempt {})", query, attempt);
        let response = catalog.query(&query)?;
        if !response.is_ok() {
            let details = response.reason.clone().unwrap_or_else(|| format!("{:?}", response));
            return Err(GridError::catalog_status(&query, &response.status, details));
        }
        Ok(response)
    })?;

    let mut records = response.data;
    if records.len() != 1 {
        return Err(GridError::CatalogCardinality {
            dataset: dataset.to_string(),
            what: "records",
            found: records.len(),
        });
    }
    let mut parents = records.remove(0).parent;
    if parents.len() != 1 {
        return Err(GridError::CatalogCardinality {
            dataset: dataset.to_string(),
            what: "parents",
            found: parents.len(),
        });
    }
    Ok(parents.remove(0).name)
}

#[cfg(feature = "das")]
pub use client::DasClient;

#[cfg(feature = "das")]
mod client {
    use std::fs;
    use std::thread;
    use std::time::Duration;

    use reqwest::blocking::Client;
    use reqwest::header::ACCEPT;

    use super::{CatalogResponse, DatasetCatalog};
    use crate::error::{GridError, GridResult};
    use crate::settings::CatalogSettings;

    /// Blocking client for the DAS web cache.
    ///
    /// DAS answers long queries with a bare job id instead of JSON; the
    /// client then polls with `pid=<id>` until the result is ready.
    pub struct DasClient {
        http: Client,
        url: String,
        poll_interval: Duration,
        max_polls: u32,
    }

    impl DasClient {
        pub fn new(settings: &CatalogSettings) -> GridResult<Self> {
            let mut builder = Client::builder()
                .user_agent(concat!("nanogrid/", env!("CARGO_PKG_VERSION")))
                .timeout(settings.timeout());

            if let Some(proxy) = settings.proxy_path() {
                match fs::read(&proxy) {
                    Ok(pem) => {
                        let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                            GridError::Settings {
                                path: proxy.clone(),
                                message: format!("invalid grid proxy: {}", e),
                            }
                        })?;
                        builder = builder.identity(identity);
                        log::debug!("Using grid proxy {}", proxy.display());
                    }
                    Err(e) if settings.proxy.is_some() => return Err(GridError::io(&proxy, e)),
                    Err(e) => {
                        log::warn!("Grid proxy {} unreadable ({}), querying DAS without it", proxy.display(), e);
                    }
                }
            }

            let http = builder
                .build()
                .map_err(|e| GridError::catalog_transport("<client setup>", e))?;
            Ok(Self {
                http,
                url: settings.url.trim_end_matches('/').to_string(),
                poll_interval: settings.poll_interval(),
                max_polls: settings.max_polls,
            })
        }

        fn fetch(&self, query: &str, pid: Option<&str>) -> GridResult<String> {
            let mut params = vec![("input", query), ("idx", "0"), ("limit", "0")];
            if let Some(pid) = pid {
                params.push(("pid", pid));
            }
            self.http
                .get(format!("{}/das/cache", self.url))
                .query(&params)
                .header(ACCEPT, "application/json")
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.text())
                .map_err(|e| GridError::catalog_transport(query, e))
        }
    }

    impl DatasetCatalog for DasClient {
        fn query(&self, query: &str) -> GridResult<CatalogResponse> {
            let mut body = self.fetch(query, None)?;
            let mut polls = 0;
            loop {
                let parse_error = match serde_json::from_str::<CatalogResponse>(&body) {
                    Ok(response) => return Ok(response),
                    Err(e) => e,
                };
                let pid = body.trim().to_string();
                if !looks_like_pid(&pid) {
                    return Err(GridError::catalog_transport(
                        query,
                        format!("unexpected response: {}", parse_error),
                    ));
                }
                if polls >= self.max_polls {
                    return Err(GridError::catalog_transport(
                        query,
                        format!("job {} still pending after {} polls", pid, polls),
                    ));
                }
                polls += 1;
                log::debug!("DAS job {} pending, poll {}", pid, polls);
                thread::sleep(self.poll_interval);
                body = self.fetch(query, Some(&pid))?;
            }
        }
    }

    /// Length of the job ids DAS hands out for pending queries.
    const PID_LEN: usize = 32;

    pub(super) fn looks_like_pid(body: &str) -> bool {
        body.len() == PID_LEN && body.chars().all(|c| c.is_ascii_alphanumeric())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        const QUERY: &str = "parent dataset=/TT/x/NANOAODSIM";
        const PID: &str = "0f3c5b2a61d07e9ca94c1e0b9f7d4d4e";
        const REPLY: &str =
            r#"{"status": "ok", "data": [{"parent": [{"name": "/TT/x/MINIAODSIM"}]}]}"#;

        /// Answers one connection per canned reply and hands back the
        /// request lines it saw.
        fn serve(replies: Vec<(u16, &'static str)>) -> (String, thread::JoinHandle<Vec<String>>) {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let handle = thread::spawn(move || {
                let mut seen = Vec::new();
                for (status, body) in replies {
                    let (mut stream, _) = listener.accept().unwrap();
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    seen.push(line.trim_end().to_string());
                    loop {
                        let mut header = String::new();
                        if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                            break;
                        }
                    }
                    let reason = if status == 200 { "OK" } else { "Error" };
                    write!(
                        stream,
                        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason,
                        body.len(),
                        body
                    )
                    .unwrap();
                    stream.flush().unwrap();
                }
                seen
            });
            (url, handle)
        }

        fn client(url: &str, max_polls: u32) -> DasClient {
            DasClient::new(&CatalogSettings {
                url: format!("{}/", url),
                timeout_secs: Some(10),
                poll_interval_secs: 0,
                max_polls,
                ..CatalogSettings::default()
            })
            .unwrap()
        }

        #[test]
        fn test_decodes_direct_reply() {
            let (url, server) = serve(vec![(200, REPLY)]);
            let response = client(&url, 3).query(QUERY).unwrap();
            assert!(response.is_ok());
            assert_eq!(response.data[0].parent[0].name, "/TT/x/MINIAODSIM");

            let seen = server.join().unwrap();
            assert_eq!(seen.len(), 1);
            assert!(seen[0].starts_with("GET /das/cache?input=parent+dataset%3D%2FTT%2Fx%2FNANOAODSIM"));
            assert!(seen[0].contains("&idx=0&limit=0"));
            assert!(!seen[0].contains("pid="));
        }

        #[test]
        fn test_follows_pending_job() {
            let (url, server) = serve(vec![(200, PID), (200, REPLY)]);
            let response = client(&url, 3).query(QUERY).unwrap();
            assert_eq!(response.data.len(), 1);

            let seen = server.join().unwrap();
            assert_eq!(seen.len(), 2);
            assert!(seen[1].contains(&format!("&pid={}", PID)));
        }

        #[test]
        fn test_gives_up_after_max_polls() {
            let (url, server) = serve(vec![(200, PID), (200, PID), (200, PID)]);
            let err = client(&url, 2).query(QUERY).unwrap_err();
            match err {
                GridError::CatalogTransport { message, .. } => {
                    assert_eq!(message, format!("job {} still pending after 2 polls", PID))
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(server.join().unwrap().len(), 3);
        }

        #[test]
        fn test_error_status_and_garbage_fail_at_once() {
            let (url, server) = serve(vec![(500, "boom"), (200, "null")]);
            let das = client(&url, 150);
            assert!(matches!(das.query(QUERY).unwrap_err(), GridError::CatalogTransport { .. }));
            assert!(matches!(das.query(QUERY).unwrap_err(), GridError::CatalogTransport { .. }));
            assert_eq!(server.join().unwrap().len(), 2);
        }
    }
}
