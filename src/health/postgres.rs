//! Postgres readiness probe.
//!
//! Speaks just enough of the v3 frontend/backend protocol to complete an
//! authenticated session start:
//!
//! ```text
//! StartupMessage(user, database)
//!     → 'R' CleartextPassword        → 'p' PasswordMessage(password)
//!     → 'R' MD5Password(salt)        → 'p' PasswordMessage(md5 hash)
//!     → 'R' SASL(SCRAM-SHA-256)      → client-first / client-final exchange
//!     → 'R' AuthenticationOk         → wait for 'Z' ReadyForQuery → ready
//!     → 'E' ErrorResponse            → not ready (57P03 starting up,
//!                                      28P01 bad password, 3D000 no database)
//! ```
//!
//! Only a server that authenticates the configured credentials and reaches
//! ReadyForQuery counts as ready.

use async_trait::async_trait;
use postgres_protocol::authentication::md5_hash;
use postgres_protocol::authentication::sasl::{ChannelBinding, ScramSha256, SCRAM_SHA_256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ProbeKind;
use crate::health::probe::{Credentials, Probe, ProbeError, ProbeTarget};

const PROTOCOL_VERSION: i32 = 196_608;
const MAX_MESSAGE_LEN: usize = 64 * 1024;
const APPLICATION_NAME: &str = "readiness-gate";

const AUTH_OK: i32 = 0;
const AUTH_CLEARTEXT: i32 = 3;
const AUTH_MD5: i32 = 5;
const AUTH_SASL: i32 = 10;
const AUTH_SASL_CONTINUE: i32 = 11;
const AUTH_SASL_FINAL: i32 = 12;

/// Ready when the server authenticates us and reports ReadyForQuery.
pub struct PostgresProbe {
    target: ProbeTarget,
}

impl PostgresProbe {
    pub fn new(target: ProbeTarget) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Probe for PostgresProbe {
    fn name(&self) -> &str {
        self.target.name()
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Postgres
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        let credentials = self.target.credentials();
        let mut stream = TcpStream::connect((self.target.host(), self.target.port()))
            .await
            .map_err(ProbeError::Connect)?;

        send(
            &mut stream,
            &startup_message(&credentials.user, &credentials.database),
        )
        .await?;

        let mut scram: Option<ScramSha256> = None;
        loop {
            let (tag, body) = read_message(&mut stream).await?;
            match tag {
                b'R' => {
                    let data = body.get(4..).unwrap_or(&[]);
                    match read_i32(&body)? {
                        AUTH_OK => continue,
                        AUTH_CLEARTEXT => {
                            let password = require_password(credentials)?;
                            send(&mut stream, &password_message(password)).await?;
                        }
                        AUTH_MD5 => {
                            let password = require_password(credentials)?;
                            let salt: [u8; 4] = data
                                .get(..4)
                                .and_then(|s| s.try_into().ok())
                                .ok_or_else(|| ProbeError::Protocol("truncated MD5 salt".into()))?;
                            let hash =
                                md5_hash(credentials.user.as_bytes(), password.as_bytes(), salt);
                            send(&mut stream, &password_message(&hash)).await?;
                        }
                        AUTH_SASL => {
                            let password = require_password(credentials)?;
                            if !sasl_mechanisms(data).any(|m| m == SCRAM_SHA_256.as_bytes()) {
                                return Err(ProbeError::Protocol(
                                    "server offers no supported SASL mechanism".into(),
                                ));
                            }
                            let client =
                                ScramSha256::new(password.as_bytes(), ChannelBinding::unsupported());
                            send(&mut stream, &sasl_initial_response(client.message())).await?;
                            scram = Some(client);
                        }
                        AUTH_SASL_CONTINUE => {
                            let client = scram.as_mut().ok_or_else(|| {
                                ProbeError::Protocol("SASL continue without a SASL exchange".into())
                            })?;
                            client
                                .update(data)
                                .map_err(|e| ProbeError::Protocol(format!("SCRAM: {e}")))?;
                            send(&mut stream, &tagged(b'p', client.message())).await?;
                        }
                        AUTH_SASL_FINAL => {
                            let client = scram.as_mut().ok_or_else(|| {
                                ProbeError::Protocol("SASL final without a SASL exchange".into())
                            })?;
                            client
                                .finish(data)
                                .map_err(|e| ProbeError::Protocol(format!("SCRAM: {e}")))?;
                        }
                        other => {
                            return Err(ProbeError::Protocol(format!(
                                "unsupported authentication request {other}"
                            )))
                        }
                    }
                }
                b'E' => return Err(parse_error_response(&body)),
                b'Z' => {
                    let _ = stream.write_all(&terminate_message()).await;
                    return Ok(());
                }
                // ParameterStatus, BackendKeyData, NoticeResponse
                b'S' | b'K' | b'N' => continue,
                other => {
                    return Err(ProbeError::Protocol(format!(
                        "unexpected message type {:?}",
                        other as char
                    )))
                }
            }
        }
    }
}

async fn send(stream: &mut TcpStream, message: &[u8]) -> Result<(), ProbeError> {
    stream.write_all(message).await.map_err(ProbeError::Connect)
}

fn require_password(credentials: &Credentials) -> Result<&str, ProbeError> {
    credentials.password.as_deref().ok_or_else(|| {
        ProbeError::Protocol("server requested a password but none is configured".into())
    })
}

/// Mechanism names from an AuthenticationSASL body: C strings ending with an empty one.
fn sasl_mechanisms(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split(|&b| b == 0).take_while(|m| !m.is_empty())
}

fn sasl_initial_response(client_first: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(client_first.len() + 20);
    put_cstr(&mut body, SCRAM_SHA_256);
    body.extend_from_slice(&(client_first.len() as i32).to_be_bytes());
    body.extend_from_slice(client_first);
    tagged(b'p', &body)
}

fn startup_message(user: &str, database: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(64);
    body.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    for (key, value) in [
        ("user", user),
        ("database", database),
        ("application_name", APPLICATION_NAME),
    ] {
        put_cstr(&mut body, key);
        put_cstr(&mut body, value);
    }
    body.push(0);

    let mut message = Vec::with_capacity(body.len() + 4);
    message.extend_from_slice(&((body.len() + 4) as i32).to_be_bytes());
    message.extend_from_slice(&body);
    message
}

fn password_message(password: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(password.len() + 1);
    put_cstr(&mut body, password);
    tagged(b'p', &body)
}

fn terminate_message() -> Vec<u8> {
    tagged(b'X', &[])
}

fn tagged(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(body.len() + 5);
    message.push(tag);
    message.extend_from_slice(&((body.len() + 4) as i32).to_be_bytes());
    message.extend_from_slice(body);
    message
}

fn put_cstr(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
}

async fn read_message(stream: &mut TcpStream) -> Result<(u8, Vec<u8>), ProbeError> {
    let mut header = [0u8; 5];
    stream.read_exact(&mut header).await.map_err(eof_to_protocol)?;

    let tag = header[0];
    let len = i32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    let len = usize::try_from(len)
        .ok()
        .filter(|len| (4..=MAX_MESSAGE_LEN).contains(len))
        .ok_or_else(|| ProbeError::Protocol(format!("invalid message length {len}")))?;

    let mut body = vec![0u8; len - 4];
    stream.read_exact(&mut body).await.map_err(eof_to_protocol)?;
    Ok((tag, body))
}

fn eof_to_protocol(err: std::io::Error) -> ProbeError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ProbeError::Protocol("server closed the connection".into())
    } else {
        ProbeError::Connect(err)
    }
}

fn read_i32(body: &[u8]) -> Result<i32, ProbeError> {
    body.get(..4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| ProbeError::Protocol("truncated authentication message".into()))
}

/// Pull SQLSTATE ('C') and message ('M') out of an ErrorResponse body.
fn parse_error_response(body: &[u8]) -> ProbeError {
    let mut code = String::new();
    let mut message = String::new();

    let mut rest = body;
    while let Some((&field, tail)) = rest.split_first() {
        if field == 0 {
            break;
        }
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        let value = String::from_utf8_lossy(&tail[..end]).into_owned();
        match field {
            b'C' => code = value,
            b'M' => message = value,
            _ => {}
        }
        rest = tail.get(end + 1..).unwrap_or(&[]);
    }

    ProbeError::Rejected { code, message }
}
