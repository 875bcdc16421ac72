//! Newline-delimited JSON framing

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::IpcResult;

/// One message as a line, terminator included
pub(crate) fn encode_line<T: Serialize>(message: &T) -> IpcResult<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Read the next non-blank line into `buf`. `Ok(false)` at EOF.
pub(crate) async fn next_line<R>(reader: &mut R, buf: &mut String) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        buf.clear();
        if reader.read_line(buf).await? == 0 {
            return Ok(false);
        }
        if !buf.trim().is_empty() {
            return Ok(true);
        }
    }
}

/// Read and decode the next message; `Ok(None)` at EOF
pub(crate) async fn read_message<T, R>(reader: &mut R) -> IpcResult<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncBufRead + Unpin,
{
    let mut buf = String::new();
    if !next_line(reader, &mut buf).await? {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(buf.trim())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_api::{Command, Request};
    use tokio::io::BufReader;

    #[test]
    fn lines_are_terminated() {
        let line = encode_line(&Request::new(7, Command::Ping)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let input = format!("\n  \n{}", encode_line(&Request::new(3, Command::GetState)).unwrap());
        let mut reader = BufReader::new(input.as_bytes());

        let request: Request = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(request.request_id, 3);
        assert!(read_message::<Request, _>(&mut reader).await.unwrap().is_none());
    }
}
