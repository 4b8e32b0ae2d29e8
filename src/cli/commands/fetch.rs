//! Fetch command - serve one request through the cache

use super::open_driver;
use crate::cli::args::FetchArgs;
use crate::config::{Config, StatePaths};
use crate::error::{PrecacheError, PrecacheResult};
use crate::resource::{ResourceRequest, ResponseSource};
use console::style;
use std::io::Write;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config, paths: &StatePaths) -> PrecacheResult<()> {
    let driver = open_driver(config, paths).await?;
    let mut request = ResourceRequest::with_method(&args.method, args.path);
    for (name, value) in &args.headers {
        request = request.with_header(name, value.as_str());
    }
    if let Some(data) = args.data {
        request = request.with_body(data);
    }

    let served = driver.fetch(&request).await?;

    let source = match served.source {
        ResponseSource::Cache => style(served.source.to_string()).green(),
        ResponseSource::Network => style(served.source.to_string()).yellow(),
    };
    eprintln!("{} {} ({})", request, served.response.status, source);
    if let Some(content_type) = served.response.content_type() {
        eprintln!("content-type: {}", content_type);
    }

    match args.output {
        Some(path) => {
            fs::write(&path, &served.response.body)
                .await
                .map_err(|e| PrecacheError::io(format!("writing {}", path.display()), e))?;
            eprintln!("{} bytes written to {}", served.response.body.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&served.response.body)
                .and_then(|()| stdout.flush())
                .map_err(|e| PrecacheError::io("writing response body", e))?;
        }
    }

    Ok(())
}
