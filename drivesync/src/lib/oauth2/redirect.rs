//! Bare minimum HTTP/1.1 to receive the OAuth2 redirection

use chrono::Utc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};

/// Reads the request head and returns its target (path and query).
/// The body, if any, is ignored.
pub async fn read_request_target<R>(reader: R) -> dsync::Result<String>
where
    R: io::AsyncBufRead,
{
    tokio::pin!(reader);

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let target = parse_request_line(&line)?.to_string();

    loop {
        line.clear();
        let sz = reader.read_line(&mut line).await?;
        if sz == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }
    Ok(target)
}

fn parse_request_line(line: &str) -> dsync::Result<&str> {
    let mut parts = line.trim_end().split(' ');
    let (Some(method), Some(target), Some(protocol)) = (parts.next(), parts.next(), parts.next())
    else {
        dsync::auth_bail!("Invalid HTTP request line: {line:?}");
    };
    if method != "GET" {
        dsync::auth_bail!("Unexpected method in redirection: {method}");
    }
    if !protocol.starts_with("HTTP/1.") {
        dsync::auth_bail!("Unsupported HTTP protocol: {protocol}");
    }
    Ok(target)
}

pub async fn write_response<W>(writer: W, status: u16, body: &str) -> dsync::Result<()>
where
    W: io::AsyncWrite,
{
    let resp = http::Response::builder()
        .status(status)
        .header("Date", Utc::now().to_rfc2822())
        .header("Server", "drivesync")
        .header("Connection", "close")
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", body.len())
        .body(body)
        .map_err(crate::error::auth)?;

    let (parts, body) = resp.into_parts();

    tokio::pin!(writer);
    writer
        .write_all(format!("{:?} {}\r\n", parts.version, parts.status).as_bytes())
        .await?;
    for (name, value) in parts.headers.iter() {
        writer.write_all(format!("{name}: ").as_bytes()).await?;
        writer.write_all(value.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
    }
    writer.write_all(b"\r\n").await?;
    writer.write_all(body.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
