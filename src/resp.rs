use std::future::Future;
use std::io::{self, ErrorKind};
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use bytes::Bytes;

/// Largest bulk string accepted from a client (Redis `proto-max-bulk-len`).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;
/// Largest element count accepted for an array.
pub const MAX_ARRAY_LEN: i64 = i32::MAX as i64;
// Declared lengths are untrusted; buffers start at most this big and grow as data arrives.
const PREALLOC_LIMIT: usize = 4096;

#[derive(Clone, Debug, PartialEq)]
pub enum Resp {
    SimpleString(Bytes),
    Error(String),
    Integer(i64),
    BulkString(Option<Bytes>),
    Array(Option<Vec<Resp>>),
}

impl Resp {
    pub fn ok() -> Resp {
        Resp::SimpleString(Bytes::from_static(b"OK"))
    }

    pub fn bulk(data: impl Into<Bytes>) -> Resp {
        Resp::BulkString(Some(data.into()))
    }

    pub fn null() -> Resp {
        Resp::BulkString(None)
    }

    pub fn array(items: Vec<Resp>) -> Resp {
        Resp::Array(Some(items))
    }

    /// Array of bulk strings.
    pub fn bulk_array<I>(items: I) -> Resp
    where
        I: IntoIterator<Item = Bytes>,
    {
        Resp::Array(Some(items.into_iter().map(|b| Resp::BulkString(Some(b))).collect()))
    }
}

async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    if line.ends_with("\r\n") {
        line.truncate(line.len() - 2);
    } else if line.ends_with('\n') {
        line.pop();
    }
    Ok(Some(line))
}

async fn read_integer_line<R>(reader: &mut R) -> io::Result<Option<i64>>
where
    R: AsyncBufReadExt + Unpin,
{
    let line = match read_line(reader).await? {
        Some(l) => l,
        None => return Ok(None),
    };
    let value = line.parse::<i64>().map_err(|_| io::Error::new(ErrorKind::InvalidData, "invalid integer"))?;
    Ok(Some(value))
}

async fn read_bulk_string<R>(reader: &mut R) -> io::Result<Option<Resp>>
where
    R: AsyncBufReadExt + AsyncReadExt + Unpin,
{
    let len = match read_integer_line(reader).await? {
        Some(l) => l,
        None => return Ok(None),
    };
    if len == -1 {
        return Ok(Some(Resp::BulkString(None)));
    }
    if len < 0 {
        return Err(io::Error::new(ErrorKind::InvalidData, "negative bulk string length"));
    }
    if len > MAX_BULK_LEN {
        return Err(io::Error::new(ErrorKind::InvalidData, "invalid bulk length"));
    }
    let len = len as usize;
    let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    (&mut *reader).take(len as u64).read_to_end(&mut buf).await?;
    if buf.len() != len {
        return Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated bulk string"));
    }
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).await?;
    if &crlf != b"\r\n" {
        return Err(io::Error::new(ErrorKind::InvalidData, "invalid bulk string terminator"));
    }
    Ok(Some(Resp::BulkString(Some(Bytes::from(buf)))))
}

async fn read_array<R>(reader: &mut R) -> io::Result<Option<Resp>>
where
    R: AsyncBufReadExt + AsyncReadExt + Unpin + Send,
{
    let len = match read_integer_line(reader).await? {
        Some(l) => l,
        None => return Ok(None),
    };
    if len == -1 {
        return Ok(Some(Resp::Array(None)));
    }
    if len < 0 {
        return Err(io::Error::new(ErrorKind::InvalidData, "negative array length"));
    }
    if len > MAX_ARRAY_LEN {
        return Err(io::Error::new(ErrorKind::InvalidData, "invalid multibulk length"));
    }
    let mut items = Vec::with_capacity((len as usize).min(PREALLOC_LIMIT));
    for _ in 0..len {
        let frame = match read_frame(reader).await? {
            Some(f) => f,
            None => return Ok(None),
        };
        items.push(frame);
    }
    Ok(Some(Resp::Array(Some(items))))
}

pub fn read_frame<'a, R>(reader: &'a mut R) -> Pin<Box<dyn Future<Output = io::Result<Option<Resp>>> + Send + 'a>>
where
    R: AsyncBufReadExt + AsyncReadExt + Unpin + Send,
{
    Box::pin(async move {
        let mut prefix = [0u8; 1];
        let n = match reader.read_exact(&mut prefix).await {
            Ok(_) => 1,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(e),
        };
        if n == 0 {
            return Ok(None);
        }
        match prefix[0] {
            b'+' => {
                let line = match read_line(reader).await? {
                    Some(l) => l,
                    None => return Ok(None),
                };
                let bytes = Bytes::copy_from_slice(line.as_bytes());
                Ok(Some(Resp::SimpleString(bytes)))
            }
            b'-' => {
                let line = match read_line(reader).await? {
                    Some(l) => l,
                    None => return Ok(None),
                };
                Ok(Some(Resp::Error(line)))
            }
            b':' => {
                let value = match read_integer_line(reader).await? {
                    Some(v) => v,
                    None => return Ok(None),
                };
                Ok(Some(Resp::Integer(value)))
            }
            b'$' => read_bulk_string(reader).await,
            b'*' => read_array(reader).await,
            _ => Err(io::Error::new(ErrorKind::InvalidData, "unknown RESP type")),
        }
    })
}

pub fn write_frame<'a, W>(writer: &'a mut W, frame: &'a Resp) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>
where
    W: AsyncWrite + Unpin + Send,
{
    Box::pin(async move {
        match frame {
            Resp::SimpleString(s) => {
                writer.write_all(b"+").await?;
                writer.write_all(s.as_ref()).await?;
                writer.write_all(b"\r\n").await?;
            }
            Resp::Error(s) => {
                writer.write_all(b"-").await?;
                writer.write_all(s.as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
            }
            Resp::Integer(i) => {
                writer.write_all(b":").await?;
                writer.write_all(i.to_string().as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
            }
            Resp::BulkString(None) => {
                writer.write_all(b"$-1\r\n").await?;
            }
            Resp::BulkString(Some(data)) => {
                writer.write_all(b"$").await?;
                writer.write_all(data.len().to_string().as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
                writer.write_all(data.as_ref()).await?;
                writer.write_all(b"\r\n").await?;
            }
            Resp::Array(None) => {
                writer.write_all(b"*-1\r\n").await?;
            }
            Resp::Array(Some(items)) => {
                writer.write_all(b"*").await?;
                writer.write_all(items.len().to_string().as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
                for item in items {
                    write_frame(writer, item).await?;
                }
            }
        }
        Ok(())
    })
}
