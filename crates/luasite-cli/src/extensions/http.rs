// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP client module for Lua.
//!
//! Provides `api.http.get` and `api.http.post` for making HTTP requests
//! from route scripts and modules.
//!
//! # Example
//!
//! ```lua
//! local res = api.http.get("example.com", "/status")
//! if res then
//!     print(res.status, res.body)
//! end
//!
//! -- Form-encoded unless headers are given
//! local res, err = api.http.post("localhost:9000", "/hook", "a=1&b=2")
//! ```
//!
//! `host` may include a scheme (`https://api.example.com`); without one,
//! plain `http://` is used. Transport failures return `nil, message`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use luasite::extensions::{api_table, recover};
use luasite::mlua::{Lua, Result as LuaResult, Table};
use luasite::SetupHook;

/// Timeout applied to every outbound request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Register `api.http` on the given Lua instance.
pub fn register_http_module(lua: &Lua) -> LuaResult<()> {
    let http_module = lua.create_table()?;

    let get_fn = lua.create_function(
        |lua, (host, path, headers): (String, String, Option<Table>)| {
            let headers = header_map(headers)?;
            recover(lua, make_request(lua, "GET", &host, &path, None, headers))
        },
    )?;
    http_module.set("get", get_fn)?;

    let post_fn = lua.create_function(
        |lua, (host, path, body, headers): (String, String, Option<String>, Option<Table>)| {
            let headers = match headers {
                Some(table) => header_map(Some(table))?,
                None => HashMap::from([(
                    "Content-Type".to_string(),
                    FORM_CONTENT_TYPE.to_string(),
                )]),
            };
            recover(lua, make_request(lua, "POST", &host, &path, body, headers))
        },
    )?;
    http_module.set("post", post_fn)?;

    api_table(lua)?.set("http", http_module)?;
    Ok(())
}

/// A setup hook that installs `api.http` on every interpreter.
pub fn http_hook() -> SetupHook {
    Arc::new(|lua: &Lua| register_http_module(lua))
}

fn header_map(headers: Option<Table>) -> LuaResult<HashMap<String, String>> {
    let mut map = HashMap::new();
    if let Some(table) = headers {
        for pair in table.pairs::<String, String>() {
            let (key, value) = pair?;
            map.insert(key, value);
        }
    }
    Ok(map)
}

/// Joins `host` and `path` into an absolute URL.
pub fn request_url(host: &str, path: &str) -> String {
    let base = if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    };
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Make an HTTP request and return the response as a Lua table.
fn make_request(
    lua: &Lua,
    method: &str,
    host: &str,
    path: &str,
    body: Option<String>,
    headers: HashMap<String, String>,
) -> Result<Table, String> {
    let url = request_url(host, path);

    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

    let mut request_builder = match method {
        "POST" => client.post(&url),
        _ => client.get(&url),
    };

    for (key, value) in headers {
        request_builder = request_builder.header(&key, &value);
    }

    if let Some(body) = body {
        request_builder = request_builder.body(body);
    }

    let response = request_builder
        .send()
        .map_err(|e| format!("HTTP request failed: {}", e))?;

    let status = response.status().as_u16();
    let body_text = response
        .text()
        .map_err(|e| format!("Failed to read response body: {}", e))?;

    let build = || -> LuaResult<Table> {
        let result = lua.create_table()?;
        result.set("status", status)?;
        result.set("body", body_text.as_str())?;
        result.set("data", body_text.as_str())?;
        Ok(result)
    };
    build().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves one canned response and returns the raw request it received.
    fn one_shot_server(reply: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&received) {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            stream.write_all(reply.as_bytes()).unwrap();
            String::from_utf8_lossy(&received).to_string()
        });
        (addr, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    const OK_REPLY: &str =
        "HTTP/1.1 201 Created\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello";

    #[test]
    fn test_http_module_registration() {
        let lua = Lua::new();
        register_http_module(&lua).expect("Failed to register http module");

        let result: bool = lua
            .load("return type(api.http.get) == 'function' and type(api.http.post) == 'function'")
            .eval()
            .unwrap();
        assert!(result);
    }

    #[test]
    fn test_request_url() {
        assert_eq!(request_url("example.com", "/a"), "http://example.com/a");
        assert_eq!(request_url("example.com/", "a"), "http://example.com/a");
        assert_eq!(
            request_url("https://example.com", "/a?b=1"),
            "https://example.com/a?b=1"
        );
    }

    #[test]
    fn test_get_returns_status_and_body() {
        let (addr, server) = one_shot_server(OK_REPLY);
        let lua = Lua::new();
        register_http_module(&lua).unwrap();
        lua.globals().set("addr", addr).unwrap();

        let (status, body, data): (u16, String, String) = lua
            .load("local r = api.http.get(addr, '/ping', { ['X-Test'] = 'yes' }) return r.status, r.body, r.data")
            .eval()
            .unwrap();
        assert_eq!(status, 201);
        assert_eq!(body, "hello");
        assert_eq!(data, "hello");

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /ping HTTP/1.1"));
        assert!(request.to_lowercase().contains("x-test: yes"));
    }

    #[test]
    fn test_post_defaults_to_form_encoding() {
        let (addr, server) = one_shot_server(OK_REPLY);
        let lua = Lua::new();
        register_http_module(&lua).unwrap();
        lua.globals().set("addr", addr).unwrap();

        let status: u16 = lua
            .load("return api.http.post(addr, '/submit', 'a=1').status")
            .eval()
            .unwrap();
        assert_eq!(status, 201);

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /submit HTTP/1.1"));
        assert!(request
            .to_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(request.ends_with("a=1"));
    }

    #[test]
    fn test_connection_failure_is_error_shaped() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let lua = Lua::new();
        register_http_module(&lua).unwrap();
        lua.globals().set("addr", addr).unwrap();

        let (value, message): (Option<Table>, String) = lua
            .load("return api.http.get(addr, '/')")
            .eval()
            .unwrap();
        assert!(value.is_none());
        assert!(message.contains("HTTP request failed"));
    }
}
