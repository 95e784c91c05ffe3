//! Shared utilities for integration tests: fake dependencies on loopback.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use postgres_protocol::authentication::md5_hash;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type HmacSha256 = Hmac<Sha256>;

const SCRAM_SALT: &[u8] = b"readiness-salt";
const SCRAM_ITERATIONS: u32 = 4096;

/// How a fake Postgres server answers a StartupMessage.
#[derive(Debug, Clone)]
pub enum PgBehavior {
    /// AuthenticationOk, a few status messages, then ReadyForQuery.
    Accept,
    /// ErrorResponse with SQLSTATE 57P03 ("the database system is starting up").
    StartingUp,
    /// CleartextPassword; accepts only the given password.
    Cleartext(&'static str),
    /// MD5Password; accepts only the hash of the given password.
    Md5(&'static str),
    /// SCRAM-SHA-256; accepts only the given password.
    Scram(&'static str),
    /// Trust authentication, but only for the named database (3D000 otherwise).
    Database(&'static str),
}

/// Reserve a loopback port with nothing listening on it.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Accept connections and close them immediately.
pub async fn start_tcp_listener() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });
    addr
}

/// Start a programmable HTTP backend; `f` picks the status for each request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = u16> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let path = read_request_path(&mut socket).await;
                let status = f(path).await;
                let status_text = match status {
                    200 => "200 OK",
                    204 => "204 No Content",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {status_text}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });
    addr
}

async fn read_request_path(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf)
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string()
}

/// Start a fake Postgres server answering every connection with `behavior`.
pub async fn start_fake_postgres(behavior: PgBehavior) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let behavior = behavior.clone();
            tokio::spawn(async move {
                let _ = serve_postgres(socket, behavior).await;
            });
        }
    });
    addr
}

async fn serve_postgres(mut socket: TcpStream, behavior: PgBehavior) -> std::io::Result<()> {
    let len = socket.read_i32().await?;
    let mut startup = vec![0u8; (len - 4) as usize];
    socket.read_exact(&mut startup).await?;
    let params = startup_params(&startup);
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();

    match behavior {
        PgBehavior::Accept => {
            socket.write_all(&session_established()).await?;
        }
        PgBehavior::StartingUp => {
            socket
                .write_all(&error_response("57P03", "the database system is starting up"))
                .await?;
        }
        PgBehavior::Cleartext(expected) => {
            socket.write_all(&auth_request(3, &[])).await?;
            let password = read_password(&mut socket).await?;
            let password = password.strip_suffix(&[0]).unwrap_or(&password);
            finish_auth(&mut socket, password == expected.as_bytes()).await?;
        }
        PgBehavior::Md5(expected) => {
            let salt = [1, 2, 3, 4];
            socket.write_all(&auth_request(5, &salt)).await?;
            let hash = read_password(&mut socket).await?;
            let hash = hash.strip_suffix(&[0]).unwrap_or(&hash);
            let wanted = md5_hash(param("user").as_bytes(), expected.as_bytes(), salt);
            finish_auth(&mut socket, hash == wanted.as_bytes()).await?;
        }
        PgBehavior::Scram(expected) => {
            socket
                .write_all(&auth_request(10, b"SCRAM-SHA-256\0\0"))
                .await?;
            match scram_exchange(&mut socket, expected).await? {
                Some(server_final) => {
                    socket.write_all(&auth_request(12, &server_final)).await?;
                    socket.write_all(&session_established()).await?;
                }
                None => finish_auth(&mut socket, false).await?,
            }
        }
        PgBehavior::Database(expected) => {
            if param("database") == expected {
                socket.write_all(&session_established()).await?;
            } else {
                let text = format!("database \"{}\" does not exist", param("database"));
                socket.write_all(&error_response("3D000", &text)).await?;
            }
        }
    }

    // Drain until the client hangs up so it never sees a reset mid-read.
    let mut sink = [0u8; 64];
    while socket.read(&mut sink).await? > 0 {}
    Ok(())
}

fn startup_params(startup: &[u8]) -> HashMap<String, String> {
    let fields: Vec<String> = startup
        .get(4..)
        .unwrap_or(&[])
        .split(|&b| b == 0)
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect();
    fields
        .chunks(2)
        .filter(|pair| pair.len() == 2 && !pair[0].is_empty())
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

/// Read one 'p' message body.
async fn read_password(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let tag = socket.read_u8().await?;
    let len = socket.read_i32().await?;
    let mut body = vec![0u8; (len - 4) as usize];
    socket.read_exact(&mut body).await?;
    if tag != b'p' {
        body.clear();
    }
    Ok(body)
}

async fn finish_auth(socket: &mut TcpStream, accepted: bool) -> std::io::Result<()> {
    if accepted {
        socket.write_all(&session_established()).await
    } else {
        socket
            .write_all(&error_response("28P01", "password authentication failed"))
            .await
    }
}

/// Server side of SCRAM-SHA-256. Returns the server-final message when the
/// client proof matches `password`.
async fn scram_exchange(
    socket: &mut TcpStream,
    password: &str,
) -> std::io::Result<Option<Vec<u8>>> {
    // SASLInitialResponse: mechanism, i32 length, client-first-message.
    let initial = read_password(socket).await?;
    let mechanism_end = initial.iter().position(|&b| b == 0).unwrap_or(0);
    let client_first = String::from_utf8_lossy(initial.get(mechanism_end + 5..).unwrap_or(&[]))
        .into_owned();
    let client_first_bare = client_first.splitn(3, ',').nth(2).unwrap_or("").to_string();
    let client_nonce = attribute(&client_first_bare, 'r');

    let nonce = format!("{client_nonce}fakeserver");
    let server_first = format!(
        "r={nonce},s={},i={SCRAM_ITERATIONS}",
        BASE64.encode(SCRAM_SALT)
    );
    socket
        .write_all(&auth_request(11, server_first.as_bytes()))
        .await?;

    let client_final = String::from_utf8_lossy(&read_password(socket).await?).into_owned();
    let (without_proof, proof) = match client_final.rsplit_once(",p=") {
        Some(parts) => parts,
        None => return Ok(None),
    };
    let proof = BASE64.decode(proof).unwrap_or_default();
    let auth_message = format!("{client_first_bare},{server_first},{without_proof}");

    let salted = hi(password.as_bytes(), SCRAM_SALT, SCRAM_ITERATIONS);
    let client_key = hmac_sha256(&salted, b"Client Key");
    let stored_key = Sha256::digest(&client_key).to_vec();
    let signature = hmac_sha256(&stored_key, auth_message.as_bytes());
    if proof.len() != signature.len() || attribute(without_proof, 'r') != nonce {
        return Ok(None);
    }
    let recovered: Vec<u8> = proof.iter().zip(&signature).map(|(p, s)| p ^ s).collect();
    if Sha256::digest(&recovered).to_vec() != stored_key {
        return Ok(None);
    }

    let server_key = hmac_sha256(&salted, b"Server Key");
    let server_signature = hmac_sha256(&server_key, auth_message.as_bytes());
    Ok(Some(format!("v={}", BASE64.encode(server_signature)).into_bytes()))
}

fn attribute(message: &str, name: char) -> String {
    message
        .split(',')
        .find_map(|part| part.strip_prefix(name)?.strip_prefix('='))
        .unwrap_or("")
        .to_string()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// PBKDF2-HMAC-SHA256 with a single output block.
fn hi(password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut block = salt.to_vec();
    block.extend_from_slice(&1u32.to_be_bytes());
    let mut u = hmac_sha256(password, &block);
    let mut out = u.clone();
    for _ in 1..iterations {
        u = hmac_sha256(password, &u);
        for (o, b) in out.iter_mut().zip(&u) {
            *o ^= b;
        }
    }
    out
}

fn session_established() -> Vec<u8> {
    let mut out = auth_request(0, &[]);
    out.extend(message(b'S', b"server_version\x0016.2\x00"));
    out.extend(message(b'K', &[0, 0, 0, 42, 0, 0, 0, 7]));
    out.extend(message(b'Z', b"I"));
    out
}

fn auth_request(code: i32, data: &[u8]) -> Vec<u8> {
    let mut body = code.to_be_bytes().to_vec();
    body.extend_from_slice(data);
    message(b'R', &body)
}

fn error_response(code: &str, text: &str) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, value) in [(b'S', "FATAL"), (b'C', code), (b'M', text)] {
        body.push(field);
        body.extend_from_slice(value.as_bytes());
        body.push(0);
    }
    body.push(0);
    message(b'E', &body)
}

fn message(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend_from_slice(&((body.len() + 4) as i32).to_be_bytes());
    out.extend_from_slice(body);
    out
}
