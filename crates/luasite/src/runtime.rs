// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Route script execution.
//!
//! A route script is a chunk that evaluates to a one-argument function. The
//! function receives the request table and returns either
//!
//! - `{ response = body, type = "text/html", code = 200, headers = {...} }`
//!   (`type`, `code` and `headers` optional), or
//! - `{ _redirect = "/somewhere" }`.
//!
//! Each run gets a fresh environment table that inherits from globals, so
//! top-level assignments in one script do not leak into the next request
//! served by the same interpreter.

use std::collections::HashMap;

use mlua::{Function, Lua, Result as LuaResult, Table, Value};
use thiserror::Error;

use crate::extensions::display_value;
use crate::request::ScriptRequest;

/// Why a script did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The script raised an error while loading or running.
    #[error("{0}")]
    Raised(String),
    /// The script ran but returned something other than a response.
    #[error("Invalid script result: {0}")]
    Malformed(String),
}

/// Outcome of running a route script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptResult {
    /// Content to send back.
    Response {
        /// Response body.
        body: Vec<u8>,
        /// HTTP status (default 200).
        status: u16,
        /// Content type (default `text/plain`).
        content_type: String,
        /// Extra response headers.
        headers: HashMap<String, String>,
    },
    /// Redirect to another location.
    Redirect {
        /// Target URL.
        location: String,
    },
    /// The script failed.
    Error(ScriptError),
}

/// Runs a route script against a request.
///
/// Never returns a Lua error: every failure is folded into
/// [`ScriptResult::Error`].
pub fn run_script(lua: &Lua, name: &str, source: &[u8], request: &ScriptRequest) -> ScriptResult {
    let handler = match load_handler(lua, name, source) {
        Ok(Some(handler)) => handler,
        Ok(None) => {
            return ScriptResult::Error(ScriptError::Malformed(
                "script did not evaluate to a function".to_string(),
            ))
        }
        Err(e) => return ScriptResult::Error(ScriptError::Raised(error_detail(&e))),
    };

    let value = request_table(lua, request).and_then(|table| handler.call::<Value>(table));
    match value {
        Ok(value) => decode_result(lua, value),
        Err(e) => ScriptResult::Error(ScriptError::Raised(error_detail(&e))),
    }
}

fn load_handler(lua: &Lua, name: &str, source: &[u8]) -> LuaResult<Option<Function>> {
    let env = fresh_environment(lua)?;
    let value: Value = lua
        .load(source)
        .set_name(format!("@{}", name))
        .set_environment(env)
        .eval()?;
    match value {
        Value::Function(handler) => Ok(Some(handler)),
        _ => Ok(None),
    }
}

/// Creates an empty environment table whose lookups fall back to globals.
pub(crate) fn fresh_environment(lua: &Lua) -> LuaResult<Table> {
    let env = lua.create_table()?;
    let mt = lua.create_table()?;
    mt.set("__index", lua.globals())?;
    env.set_metatable(Some(mt));
    Ok(env)
}

/// Builds the table handed to a route script.
///
/// Fields: `method`, `path`, `urlArguments` (last value wins),
/// `urlArgumentsAll` (every value, in order), `headers`, and when present
/// `body` and `form`. Header lookups ignore case, so `headers["User-Agent"]`
/// and `headers["user-agent"]` give the same value.
pub fn request_table(lua: &Lua, request: &ScriptRequest) -> LuaResult<Table> {
    let table = lua.create_table()?;
    table.set("method", request.method.as_str())?;
    table.set("path", request.path.as_str())?;
    table.set("urlArguments", lua.create_table_from(request.query.clone())?)?;

    let all = lua.create_table()?;
    for (key, values) in &request.query_all {
        all.set(key.as_str(), lua.create_sequence_from(values.iter().map(String::as_str))?)?;
    }
    table.set("urlArgumentsAll", all)?;

    table.set("headers", headers_table(lua, &request.headers)?)?;

    if let Some(body) = &request.body {
        table.set("body", lua.create_string(body)?)?;
    }
    if let Some(form) = request.form() {
        table.set("form", lua.create_table_from(form)?)?;
    }
    Ok(table)
}

fn headers_table(lua: &Lua, headers: &HashMap<String, String>) -> LuaResult<Table> {
    let table = lua.create_table_from(headers.clone())?;
    let folded: HashMap<String, String> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect();

    let index = lua.create_function(move |_, (_, key): (Table, Value)| match key {
        Value::String(name) => Ok(folded.get(&name.to_str()?.to_ascii_lowercase()).cloned()),
        _ => Ok(None),
    })?;
    let mt = lua.create_table()?;
    mt.set("__index", index)?;
    table.set_metatable(Some(mt));
    Ok(table)
}

/// Interprets the value a route handler returned.
pub fn decode_result(lua: &Lua, value: Value) -> ScriptResult {
    match try_decode(lua, value) {
        Ok(result) => result,
        Err(e) => ScriptResult::Error(ScriptError::Malformed(error_detail(&e))),
    }
}

fn try_decode(lua: &Lua, value: Value) -> LuaResult<ScriptResult> {
    let table = match value {
        Value::Table(table) => table,
        other => {
            return Ok(malformed(format!(
                "expected a table, got {}",
                other.type_name()
            )))
        }
    };

    let body = match table.get::<Value>("response")? {
        Value::Nil => None,
        Value::String(s) => Some(s.as_bytes().to_vec()),
        number @ (Value::Integer(_) | Value::Number(_)) => {
            Some(display_value(lua, &number)?.into_bytes())
        }
        other => {
            return Ok(malformed(format!(
                "`response` must be a string, got {}",
                other.type_name()
            )))
        }
    };

    let Some(body) = body else {
        return match table.get::<Value>("_redirect")? {
            Value::String(location) => Ok(ScriptResult::Redirect {
                location: location.to_str()?.to_string(),
            }),
            Value::Nil => Ok(malformed(
                "table has neither `response` nor `_redirect`".to_string(),
            )),
            other => Ok(malformed(format!(
                "`_redirect` must be a string, got {}",
                other.type_name()
            ))),
        };
    };

    let status = match table.get::<Option<i64>>("code") {
        Ok(None) => 200,
        Ok(Some(code)) => match u16::try_from(code) {
            Ok(code) if (100..=999).contains(&code) => code,
            _ => return Ok(malformed(format!("`code` {} is not a status code", code))),
        },
        Err(_) => return Ok(malformed("`code` must be an integer".to_string())),
    };

    let content_type = match table.get::<Option<String>>("type") {
        Ok(content_type) => content_type.unwrap_or_else(|| "text/plain".to_string()),
        Err(_) => return Ok(malformed("`type` must be a string".to_string())),
    };

    let mut headers = HashMap::new();
    match table.get::<Value>("headers")? {
        Value::Nil => {}
        Value::Table(raw) => {
            for pair in raw.pairs::<Value, Value>() {
                let (key, value) = pair?;
                headers.insert(display_value(lua, &key)?, display_value(lua, &value)?);
            }
        }
        other => {
            return Ok(malformed(format!(
                "`headers` must be a table, got {}",
                other.type_name()
            )))
        }
    }

    Ok(ScriptResult::Response {
        body,
        status,
        content_type,
        headers,
    })
}

fn malformed(description: String) -> ScriptResult {
    ScriptResult::Error(ScriptError::Malformed(description))
}

/// The message of a Lua error without callback wrapping.
pub(crate) fn error_detail(error: &mlua::Error) -> String {
    match error {
        mlua::Error::CallbackError { cause, .. } => error_detail(cause),
        mlua::Error::RuntimeError(message) | mlua::Error::SyntaxError { message, .. } => message
            .split("\nstack traceback:")
            .next()
            .unwrap_or(message)
            .to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, request: &ScriptRequest) -> ScriptResult {
        let lua = Lua::new();
        run_script(&lua, "test.lua", source.as_bytes(), request)
    }

    #[test]
    fn test_response_defaults() {
        let result = run(
            r#"return function(req) return { response = "hi" } end"#,
            &ScriptRequest::new("/", "GET"),
        );
        assert_eq!(
            result,
            ScriptResult::Response {
                body: b"hi".to_vec(),
                status: 200,
                content_type: "text/plain".to_string(),
                headers: HashMap::new(),
            }
        );
    }

    #[test]
    fn test_full_response() {
        let result = run(
            r#"
            return function(req)
                return {
                    response = "<b>" .. req.method .. "</b>",
                    type = "text/html",
                    code = 201,
                    headers = { ["X-Test"] = "yes" },
                }
            end
            "#,
            &ScriptRequest::new("/", "POST"),
        );
        match result {
            ScriptResult::Response {
                body,
                status,
                content_type,
                headers,
            } => {
                assert_eq!(body, b"<b>POST</b>");
                assert_eq!(status, 201);
                assert_eq!(content_type, "text/html");
                assert_eq!(headers.get("X-Test").map(String::as_str), Some("yes"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_redirect() {
        let result = run(
            r#"return function() return { _redirect = "/login" } end"#,
            &ScriptRequest::new("/", "GET"),
        );
        assert_eq!(
            result,
            ScriptResult::Redirect {
                location: "/login".to_string()
            }
        );
    }

    #[test]
    fn test_raised_error_carries_message() {
        let result = run(
            r#"return function() error("kaput", 0) end"#,
            &ScriptRequest::new("/", "GET"),
        );
        assert_eq!(result, ScriptResult::Error(ScriptError::Raised("kaput".to_string())));
    }

    #[test]
    fn test_syntax_error_is_raised() {
        let result = run("return function(", &ScriptRequest::new("/", "GET"));
        assert!(matches!(result, ScriptResult::Error(ScriptError::Raised(_))));
    }

    #[test]
    fn test_malformed_results() {
        let request = ScriptRequest::new("/", "GET");
        for source in [
            "return 42",
            "return function() return nil end",
            "return function() return { other = 1 } end",
            r#"return function() return { response = "x", code = "abc" } end"#,
            r#"return function() return { response = {} } end"#,
        ] {
            let result = run(source, &request);
            assert!(
                matches!(result, ScriptResult::Error(ScriptError::Malformed(_))),
                "{} gave {:?}",
                source,
                result
            );
        }
    }

    #[test]
    fn test_request_table_fields() {
        let request = ScriptRequest::new("/search", "POST")
            .with_query_string("q=one&q=two&page=3")
            .with_headers(HashMap::from([(
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )]))
            .with_body(b"name=Ada".to_vec());

        let result = run(
            r#"
            return function(req)
                return {
                    response = table.concat({
                        req.method,
                        req.path,
                        req.urlArguments.q,
                        req.urlArgumentsAll.q[1],
                        req.urlArguments.page,
                        req.body,
                        req.form.name,
                    }, ",")
                }
            end
            "#,
            &request,
        );
        match result {
            ScriptResult::Response { body, .. } => {
                assert_eq!(
                    String::from_utf8(body).unwrap(),
                    "POST,/search,two,one,3,name=Ada,Ada"
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let request = ScriptRequest::new("/", "GET").with_headers(HashMap::from([
            ("user-agent".to_string(), "curl/8".to_string()),
            ("X-Token".to_string(), "abc".to_string()),
        ]));

        let result = run(
            r#"
            return function(req)
                return {
                    response = table.concat({
                        req.headers["User-Agent"],
                        req.headers["user-agent"],
                        req.headers["x-token"],
                        tostring(req.headers["Accept"]),
                    }, ",")
                }
            end
            "#,
            &request,
        );
        match result {
            ScriptResult::Response { body, .. } => {
                assert_eq!(String::from_utf8(body).unwrap(), "curl/8,curl/8,abc,nil");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_globals_do_not_leak_between_runs() {
        let lua = Lua::new();
        let request = ScriptRequest::new("/", "GET");
        run_script(
            &lua,
            "a.lua",
            br#"leaked = "yes"; return function() return { response = "a" } end"#,
            &request,
        );
        let result = run_script(
            &lua,
            "b.lua",
            br#"return function() return { response = tostring(leaked) } end"#,
            &request,
        );
        assert!(matches!(
            result,
            ScriptResult::Response { ref body, .. } if body == b"nil"
        ));
    }
}
